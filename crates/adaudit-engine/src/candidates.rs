use indexmap::IndexSet;

use crate::error::AuditError;

pub const FALLBACK_MODELS: &[&str] = &[
    "claude-3-5-sonnet-latest",
    "claude-3-5-haiku-latest",
    "claude-3-5-sonnet-20241022",
    "claude-3-haiku-20240307",
];

const RETRYABLE_ERROR_KINDS: &[&str] = &["not_found_error", "invalid_request_error"];

/// Ordered, de-duplicated models to try: the configured one, the static
/// fallbacks, then whatever discovery found.
pub fn model_candidates(configured: &str, discovered: &[String]) -> Vec<String> {
    let mut candidates = IndexSet::new();
    let configured = configured.trim();
    if !configured.is_empty() {
        candidates.insert(configured.to_string());
    }
    for model in FALLBACK_MODELS {
        candidates.insert((*model).to_string());
    }
    for model in discovered {
        let model = model.trim();
        if !model.is_empty() {
            candidates.insert(model.to_string());
        }
    }
    candidates.into_iter().collect()
}

/// Whether a provider rejection looks like "this model is unavailable".
///
/// Heuristic: any message mentioning "model" qualifies, as do the
/// `not_found_error` and `invalid_request_error` kinds. This can misfire on
/// unrelated errors whose text happens to mention a model.
pub fn is_retryable_provider_error(error: &AuditError) -> bool {
    match error {
        AuditError::Provider { kind, message, .. } => {
            message.to_lowercase().contains("model")
                || kind
                    .as_deref()
                    .is_some_and(|kind| RETRYABLE_ERROR_KINDS.contains(&kind))
        }
        _ => false,
    }
}

/// Transport failures and retryable rejections move on to the next model.
pub fn should_try_next_candidate(error: &AuditError) -> bool {
    matches!(error, AuditError::Network { .. }) || is_retryable_provider_error(error)
}
