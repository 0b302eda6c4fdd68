use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

pub const AUDIT_STARTED: &str = "audit_started";
pub const MODEL_CANDIDATES: &str = "model_candidates";
pub const MODEL_ATTEMPT: &str = "model_attempt";
pub const MODEL_ATTEMPT_FAILED: &str = "model_attempt_failed";
pub const COMPLETION_RECEIVED: &str = "completion_received";
pub const RESULT_NORMALIZED: &str = "result_normalized";
pub const AUDIT_FAILED: &str = "audit_failed";

/// Structured audit log, one compact JSON object per line.
///
/// Every event carries `type`, `audit_id` and `ts`; the caller payload is
/// merged last. A log without a sink still builds events so callers can
/// inspect them, it just writes nothing.
#[derive(Debug, Clone)]
pub struct EventLog {
    inner: Arc<EventLogInner>,
}

#[derive(Debug)]
struct EventLogInner {
    sink: Option<PathBuf>,
    audit_id: String,
    lock: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, audit_id: impl Into<String>) -> Self {
        Self::build(Some(path.into()), audit_id.into())
    }

    pub fn disabled(audit_id: impl Into<String>) -> Self {
        Self::build(None, audit_id.into())
    }

    fn build(sink: Option<PathBuf>, audit_id: String) -> Self {
        Self {
            inner: Arc::new(EventLogInner {
                sink,
                audit_id,
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.sink.as_deref()
    }

    pub fn audit_id(&self) -> &str {
        &self.inner.audit_id
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(event_type.to_string()));
        event.insert(
            "audit_id".to_string(),
            Value::String(self.inner.audit_id.clone()),
        );
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        event.extend(payload);

        let Some(path) = self.inner.sink.as_deref() else {
            return Ok(Value::Object(event));
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&event)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(event))
    }
}

pub(crate) fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
