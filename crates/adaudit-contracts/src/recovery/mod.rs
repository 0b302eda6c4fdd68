//! Turns raw model completions into comparison results.
//!
//! Stages run in order: locate a JSON object in the text, parse it loosely,
//! and when that fails salvage complete `campos` elements from a truncated
//! document. Every entry point returns something renderable.

mod completion;
mod locator;
mod loose_json;
mod partial;
mod pipeline;

use thiserror::Error;

pub use completion::extract_completion_text;
pub use locator::{clean_model_text, locate_json_candidate, parse_json_from_model_output};
pub use loose_json::parse_loose_json;
pub use partial::{recover_partial_result, RECOVERED_SUMMARY, TRUNCATION_ALERT};
pub use pipeline::{normalize_completion, reconcile_result};

#[derive(Debug, Error)]
#[error("loose JSON parse failed: {source}")]
pub struct ParseError {
    #[from]
    source: serde_json::Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NoJsonFoundError {
    #[error("model output contains no usable text")]
    EmptyText,
    #[error("model output contains no JSON object")]
    NoBraces,
    #[error("JSON object in model output could not be parsed")]
    Unparsable,
}
