use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response as HttpResponse};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;

use crate::config::{ANTHROPIC_VERSION, DISCOVERY_TIMEOUT};
use crate::error::AuditError;

const GENERIC_PROVIDER_MESSAGE: &str = "Error Anthropic API";

/// The two Messages API calls an audit needs.
pub trait MessagesTransport {
    fn create_message(&self, body: &Value) -> Result<Value, AuditError>;

    /// Model ids advertised by the provider. Discovery is best-effort, so
    /// failures read as an empty list.
    fn list_models(&self) -> Vec<String>;
}

pub struct AnthropicClient {
    http: HttpClient,
    api_base: String,
    api_key: String,
    timeout: Duration,
}

impl AnthropicClient {
    pub fn new(api_base: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: HttpClient::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header(CONTENT_TYPE, "application/json")
    }
}

impl MessagesTransport for AnthropicClient {
    fn create_message(&self, body: &Value) -> Result<Value, AuditError> {
        let endpoint = format!("{}/messages", self.api_base);
        let response = self
            .authorized(self.http.post(&endpoint))
            .timeout(self.timeout)
            .json(body)
            .send()
            .map_err(network_error)?;
        response_json_or_error(response)
    }

    fn list_models(&self) -> Vec<String> {
        let endpoint = format!("{}/models", self.api_base);
        let response = match self
            .authorized(self.http.get(&endpoint))
            .timeout(DISCOVERY_TIMEOUT)
            .send()
        {
            Ok(response) if response.status().is_success() => response,
            _ => return Vec::new(),
        };
        response
            .json::<Value>()
            .map(|payload| discovered_model_ids(&payload))
            .unwrap_or_default()
    }
}

fn response_json_or_error(response: HttpResponse) -> Result<Value, AuditError> {
    let status = response.status().as_u16();
    let success = response.status().is_success();
    let body = response.text().map_err(network_error)?;
    let payload: Value = match serde_json::from_str(&body) {
        Ok(payload) => payload,
        Err(err) => {
            return Err(AuditError::InvalidPayload {
                status,
                message: err.to_string(),
            })
        }
    };
    if !success {
        return Err(provider_error_from_payload(status, &payload));
    }
    Ok(payload)
}

fn network_error(err: reqwest::Error) -> AuditError {
    AuditError::Network {
        code: transport_error_code(&err).to_string(),
        message: err.to_string(),
    }
}

fn transport_error_code(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "TIMEOUT"
    } else if err.is_connect() {
        "CONNECT"
    } else if err.is_request() {
        "REQUEST"
    } else {
        "NETWORK_ERROR"
    }
}

/// Maps a non-2xx payload to a provider error, preferring the nested
/// `error.message`, then `error.type`.
pub fn provider_error_from_payload(status: u16, payload: &Value) -> AuditError {
    let error = payload.get("error");
    let kind = error
        .and_then(|error| error.get("type"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|kind| !kind.is_empty())
        .map(str::to_string);
    let message = error
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
        .or_else(|| kind.clone())
        .unwrap_or_else(|| GENERIC_PROVIDER_MESSAGE.to_string());
    AuditError::Provider {
        status,
        kind,
        message,
    }
}

pub fn discovered_model_ids(payload: &Value) -> Vec<String> {
    let Some(rows) = payload.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| row.get("id").and_then(Value::as_str))
        .map(str::trim)
        .filter(|id| id.to_ascii_lowercase().contains("claude"))
        .map(str::to_string)
        .collect()
}
