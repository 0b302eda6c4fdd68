//! Screenshot audit against the Anthropic Messages API: prompt assembly,
//! model fallback and the caller envelope.

pub mod auditor;
pub mod candidates;
pub mod config;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod response;

pub use auditor::{new_audit_id, AuditEngine, AuditImage, AuditRequest};
pub use config::AuditConfig;
pub use error::AuditError;
pub use provider::{AnthropicClient, MessagesTransport};
pub use response::AuditResponse;
