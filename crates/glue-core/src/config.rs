//! Registry configuration
//!
//! Values can come from a YAML document, with environment overrides applied
//! on top:
//!
//! ```yaml
//! default_timeout_ms: 10000
//! max_attachment_stream_bytes: 1048576
//! world_parameters:
//!   base_url: http://localhost:8080
//! ```
use crate::error::{GlueError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Environment variable overriding `default_timeout_ms`
pub const DEFAULT_TIMEOUT_ENV: &str = "GLUE_DEFAULT_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlueConfig {
    /// Timeout applied to definitions that do not declare their own
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Upper bound for buffered stream attachments (unbounded when absent)
    #[serde(default)]
    pub max_attachment_stream_bytes: Option<usize>,

    /// Handed to every World as its `parameters`
    #[serde(default = "empty_object")]
    pub world_parameters: Value,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl Default for GlueConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            max_attachment_stream_bytes: None,
            world_parameters: empty_object(),
        }
    }
}

impl GlueConfig {
    /// Load and parse a YAML config file
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GlueError::Configuration(format!("failed to read {}: {}", path, e)))?;
        tracing::debug!(path, "loading registry config");
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| GlueError::Configuration(format!("failed to parse config YAML: {}", e)))
    }

    /// Apply `GLUE_DEFAULT_TIMEOUT_MS` when set
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(DEFAULT_TIMEOUT_ENV) {
            self.default_timeout_ms = raw.trim().parse().map_err(|_| {
                GlueError::Configuration(format!(
                    "{} must be a number of milliseconds, got {:?}",
                    DEFAULT_TIMEOUT_ENV, raw
                ))
            })?;
            tracing::debug!(
                default_timeout_ms = self.default_timeout_ms,
                "default timeout overridden from {}",
                DEFAULT_TIMEOUT_ENV
            );
        }
        Ok(self)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GlueConfig::default();
        assert_eq!(config.default_timeout(), Duration::from_millis(5000));
        assert_eq!(config.max_attachment_stream_bytes, None);
        assert!(config.world_parameters.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = GlueConfig::from_yaml("max_attachment_stream_bytes: 1024\n").unwrap();
        assert_eq!(config.default_timeout_ms, 5000);
        assert_eq!(config.max_attachment_stream_bytes, Some(1024));
    }

    #[test]
    fn test_world_parameters_from_yaml() {
        let config = GlueConfig::from_yaml(
            r#"
default_timeout_ms: 250
world_parameters:
  base_url: http://localhost:8080
"#,
        )
        .unwrap();
        assert_eq!(config.default_timeout_ms, 250);
        assert_eq!(config.world_parameters["base_url"], "http://localhost:8080");
    }

    #[test]
    fn test_invalid_yaml() {
        let err = GlueConfig::from_yaml("default_timeout_ms: [").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_timeout_override() {
        let config = GlueConfig::default()
            .with_overrides(|key| (key == DEFAULT_TIMEOUT_ENV).then(|| "750".to_string()))
            .unwrap();
        assert_eq!(config.default_timeout_ms, 750);

        let err = GlueConfig::default()
            .with_overrides(|_| Some("soon".to_string()))
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
