use std::env;
use std::time::Duration;

use crate::error::AuditError;

pub const API_KEY_PLACEHOLDER: &str = "tu_claude_api_key_aqui";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
pub const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u64 = 4096;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
    pub max_tokens: u64,
    pub timeout: Duration,
    pub discover_models: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
            discover_models: true,
        }
    }
}

impl AuditConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(non_empty_env)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            api_key: lookup("ANTHROPIC_API_KEY"),
            api_base: lookup("ANTHROPIC_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(defaults.api_base),
            model: lookup("ANTHROPIC_MODEL").unwrap_or(defaults.model),
            max_tokens: lookup("ADAUDIT_MAX_TOKENS")
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|value| *value > 0)
                .unwrap_or(defaults.max_tokens),
            timeout: lookup("ADAUDIT_TIMEOUT_SECS")
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|value| *value > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            discover_models: defaults.discover_models,
        }
    }

    /// The key, unless it is missing or still the sample placeholder.
    pub fn require_api_key(&self) -> Result<&str, AuditError> {
        self.api_key
            .as_deref()
            .filter(|key| *key != API_KEY_PLACEHOLDER)
            .ok_or(AuditError::Configuration)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{AuditConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
    use crate::error::AuditError;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = AuditConfig::from_lookup(lookup(&[]));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.require_api_key(), Err(AuditError::Configuration));
    }

    #[test]
    fn env_values_override_defaults() {
        let config = AuditConfig::from_lookup(lookup(&[
            ("ANTHROPIC_API_KEY", "sk-test"),
            ("ANTHROPIC_API_BASE", "http://localhost:9000/v1/"),
            ("ANTHROPIC_MODEL", "claude-3-haiku-20240307"),
            ("ADAUDIT_TIMEOUT_SECS", "30"),
            ("ADAUDIT_MAX_TOKENS", "not-a-number"),
        ]));
        assert_eq!(config.require_api_key(), Ok("sk-test"));
        assert_eq!(config.api_base, "http://localhost:9000/v1");
        assert_eq!(config.model, "claude-3-haiku-20240307");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_tokens, 4096);
    }

    #[test]
    fn placeholder_key_is_rejected() {
        let config = AuditConfig::from_lookup(lookup(&[(
            "ANTHROPIC_API_KEY",
            "tu_claude_api_key_aqui",
        )]));
        assert_eq!(config.require_api_key(), Err(AuditError::Configuration));
    }
}
