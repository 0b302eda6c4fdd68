use std::cell::RefCell;

use adaudit_contracts::comparison::{ComparisonResult, NormalizeMode};
use adaudit_contracts::events::{
    EventLog, EventPayload, AUDIT_FAILED, AUDIT_STARTED, COMPLETION_RECEIVED, MODEL_ATTEMPT,
    MODEL_ATTEMPT_FAILED, MODEL_CANDIDATES, RESULT_NORMALIZED,
};
use adaudit_contracts::history::UNSPECIFIED_PLATFORM;
use adaudit_contracts::recovery::{extract_completion_text, normalize_completion};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::candidates::{model_candidates, should_try_next_candidate};
use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::prompt::build_messages_body;
use crate::provider::{AnthropicClient, MessagesTransport};

const SOURCE_OF_TRUTH_INPUT: &str = "happyFox";
const PLATFORM_INPUT: &str = "plataforma";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl AuditImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditRequest {
    pub source_of_truth: Option<AuditImage>,
    pub platform: Option<AuditImage>,
    pub platform_name: Option<String>,
}

impl AuditRequest {
    pub fn platform_label(&self) -> String {
        self.platform_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNSPECIFIED_PLATFORM)
            .to_string()
    }

    fn images(&self) -> Result<(&AuditImage, &AuditImage), AuditError> {
        let source = self
            .source_of_truth
            .as_ref()
            .filter(|image| !image.bytes.is_empty());
        let platform = self.platform.as_ref().filter(|image| !image.bytes.is_empty());
        match (source, platform) {
            (Some(source), Some(platform)) => Ok((source, platform)),
            _ => {
                let mut missing = Vec::new();
                if source.is_none() {
                    missing.push(SOURCE_OF_TRUTH_INPUT);
                }
                if platform.is_none() {
                    missing.push(PLATFORM_INPUT);
                }
                Err(AuditError::MissingImages { missing })
            }
        }
    }
}

pub fn new_audit_id() -> String {
    format!("audit-{}", Uuid::new_v4().simple())
}

/// Runs one screenshot comparison against the provider, walking the model
/// candidates until one answers.
pub struct AuditEngine<T: MessagesTransport> {
    config: AuditConfig,
    transport: T,
    events: EventLog,
    event_failure: RefCell<Option<String>>,
}

impl AuditEngine<AnthropicClient> {
    pub fn from_config(config: AuditConfig, events: EventLog) -> Self {
        let transport = AnthropicClient::new(
            &config.api_base,
            config.api_key.clone().unwrap_or_default(),
            config.timeout,
        );
        Self::with_transport(config, transport, events)
    }
}

impl<T: MessagesTransport> AuditEngine<T> {
    pub fn with_transport(config: AuditConfig, transport: T, events: EventLog) -> Self {
        Self {
            config,
            transport,
            events,
            event_failure: RefCell::new(None),
        }
    }

    /// First event-log write error, if any. Audits carry on without events.
    pub fn event_failure(&self) -> Option<String> {
        self.event_failure.borrow().clone()
    }

    pub fn candidates(&self) -> Vec<String> {
        let discovered = if self.config.discover_models {
            self.transport.list_models()
        } else {
            Vec::new()
        };
        model_candidates(&self.config.model, &discovered)
    }

    pub fn audit(&self, request: &AuditRequest) -> Result<ComparisonResult, AuditError> {
        let outcome = self.run(request);
        if let Err(err) = &outcome {
            self.emit(
                AUDIT_FAILED,
                json!({"error": err.to_string(), "status": err.http_status()}),
            );
        }
        outcome
    }

    fn run(&self, request: &AuditRequest) -> Result<ComparisonResult, AuditError> {
        self.config.require_api_key()?;
        let (source, platform) = request.images()?;
        let platform_label = request.platform_label();
        self.emit(
            AUDIT_STARTED,
            json!({
                "platform": platform_label,
                "source_bytes": source.bytes.len(),
                "platform_bytes": platform.bytes.len(),
            }),
        );

        let candidates = self.candidates();
        self.emit(MODEL_CANDIDATES, json!({"models": candidates}));

        let mut attempts = Vec::new();
        let mut last_error = None;
        let mut answered = None;
        for model in &candidates {
            self.emit(MODEL_ATTEMPT, json!({"model": model}));
            let body = build_messages_body(
                model,
                self.config.max_tokens,
                &platform_label,
                source,
                platform,
            );
            match self.transport.create_message(&body) {
                Ok(payload) => {
                    answered = Some((model.clone(), payload));
                    break;
                }
                Err(err) => {
                    let retry = should_try_next_candidate(&err);
                    self.emit(
                        MODEL_ATTEMPT_FAILED,
                        json!({"model": model, "error": err.to_string(), "retry": retry}),
                    );
                    if !retry {
                        return Err(err);
                    }
                    attempts.push(format!("{model}: {err}"));
                    last_error = Some(err);
                }
            }
        }
        let Some((model, payload)) = answered else {
            return Err(AuditError::CandidatesExhausted {
                last_error: last_error.map(|err| err.to_string()),
                attempts,
            });
        };

        let text = extract_completion_text(payload.get("content").unwrap_or(&Value::Null));
        self.emit(
            COMPLETION_RECEIVED,
            json!({"model": model, "chars": text.chars().count()}),
        );
        let result = normalize_completion(&text, NormalizeMode::Server)
            .with_platform_name(Some(platform_label));
        let tally = result.tally();
        self.emit(
            RESULT_NORMALIZED,
            json!({
                "model": model,
                "approved": result.approved,
                "fields": result.fields.len(),
                "differences": tally.difference,
                "not_visible": tally.not_visible,
                "alerts": result.alerts.len(),
            }),
        );
        Ok(result)
    }

    fn emit(&self, event_type: &str, payload: Value) {
        let payload: EventPayload = match payload {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let Err(err) = self.events.emit(event_type, payload) else {
            return;
        };
        let mut failure = self.event_failure.borrow_mut();
        if failure.is_none() {
            let message = format!("{err:#}");
            eprintln!("adaudit warning: event log write failed ({message})");
            *failure = Some(message);
        }
    }
}
