use adaudit_contracts::comparison::ComparisonResult;
use serde_json::{json, Map, Value};

use crate::error::{AuditError, AUDIT_FAILURE_MESSAGE};

/// Caller-facing envelope: `{ok: true, resultado}` or
/// `{ok: false, error, detalle?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditResponse {
    Success(ComparisonResult),
    Failure {
        status: u16,
        error: String,
        detail: Option<String>,
    },
}

impl AuditResponse {
    pub fn from_outcome(outcome: Result<ComparisonResult, AuditError>) -> Self {
        match outcome {
            Ok(result) => Self::Success(result),
            Err(err) => Self::from_error(&err),
        }
    }

    pub fn from_error(err: &AuditError) -> Self {
        let status = err.http_status();
        match err {
            AuditError::Configuration | AuditError::MissingImages { .. } => Self::Failure {
                status,
                error: err.to_string(),
                detail: None,
            },
            _ => Self::Failure {
                status,
                error: AUDIT_FAILURE_MESSAGE.to_string(),
                detail: Some(err.to_string()),
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::Success(_) => 200,
            Self::Failure { status, .. } => *status,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Success(result) => json!({"ok": true, "resultado": result.to_value()}),
            Self::Failure { error, detail, .. } => {
                let mut body = Map::new();
                body.insert("ok".to_string(), Value::Bool(false));
                body.insert("error".to_string(), Value::String(error.clone()));
                if let Some(detail) = detail {
                    body.insert("detalle".to_string(), Value::String(detail.clone()));
                }
                Value::Object(body)
            }
        }
    }
}
