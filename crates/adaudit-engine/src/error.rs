use thiserror::Error;

pub const AUDIT_FAILURE_MESSAGE: &str = "Error al auditar imágenes con IA";
const NO_USABLE_MODEL: &str = "No se pudo usar ninguno de los modelos configurados";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    #[error("ANTHROPIC_API_KEY no es valida o no esta configurada en .env")]
    Configuration,
    #[error("Debes cargar ambas imágenes para auditar")]
    MissingImages { missing: Vec<&'static str> },
    #[error("No se pudo conectar con Anthropic ({code}): {message}")]
    Network { code: String, message: String },
    #[error("{message}")]
    Provider {
        status: u16,
        kind: Option<String>,
        message: String,
    },
    #[error("Anthropic devolvio una respuesta no JSON ({status}): {message}")]
    InvalidPayload { status: u16, message: String },
    #[error("{}", exhausted_message(.last_error, .attempts))]
    CandidatesExhausted {
        last_error: Option<String>,
        attempts: Vec<String>,
    },
}

impl AuditError {
    /// Status the failure maps to at an HTTP boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MissingImages { .. } => 400,
            _ => 500,
        }
    }
}

fn exhausted_message(last_error: &Option<String>, attempts: &[String]) -> String {
    let mut message = last_error
        .clone()
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| NO_USABLE_MODEL.to_string());
    if !attempts.is_empty() {
        message.push_str(" | Intentos: ");
        message.push_str(&attempts.join(" || "));
    }
    message
}
