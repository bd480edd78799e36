//! Configuration loading and management

use crate::core::error::ConfigError;
use crate::core::query::PageSize;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`ClientConfig::api_url`]
pub const ENV_API_URL: &str = "TRACEX_API_URL";
/// Environment variable overriding [`ClientConfig::search_debounce_ms`]
pub const ENV_SEARCH_DEBOUNCE_MS: &str = "TRACEX_SEARCH_DEBOUNCE_MS";

/// How a multi-select delete reaches the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkDeleteStrategy {
    /// One `DELETE /expenses/{id}` per id, in order; partial failure is reported
    #[default]
    Sequential,
    /// A single `DELETE /expenses/bulk` returning the deleted count
    Batch,
}

/// Client configuration
///
/// ```yaml
/// api_url: https://api.tracex.app
/// search_debounce_ms: 300
/// default_page_size: 20
/// bulk_delete: sequential
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the API, without the `/api/v1` prefix
    pub api_url: String,

    /// Idle time before typed search text is committed
    pub search_debounce_ms: u64,

    /// Page size a new list controller starts with
    pub default_page_size: PageSize,

    /// Upper bound on items per bulk create request
    pub max_bulk_batch: usize,

    pub bulk_delete: BulkDeleteStrategy,

    pub request_timeout_secs: u64,

    /// Buffer size of the client event bus
    pub event_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            search_debounce_ms: 300,
            default_page_size: PageSize::Twenty,
            max_bulk_batch: 100,
            bulk_delete: BulkDeleteStrategy::Sequential,
            request_timeout_secs: 30,
            event_capacity: 1024,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            ConfigError::ParseError { message, .. } => ConfigError::ParseError {
                file: Some(path.display().to_string()),
                message,
            },
            other => other,
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(raw) = lookup(ENV_SEARCH_DEBOUNCE_MS) {
            self.search_debounce_ms =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        field: "search_debounce_ms".to_string(),
                        value: raw.clone(),
                        message: "expected milliseconds".to_string(),
                    })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api_url".to_string(),
                value: self.api_url.clone(),
                message: "must start with http:// or https://".to_string(),
            });
        }
        if self.max_bulk_batch == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_bulk_batch".to_string(),
                value: "0".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "event_capacity".to_string(),
                value: "0".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// `api_url` without a trailing slash
    pub fn base_url(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.search_debounce(), Duration::from_millis(300));
        assert_eq!(config.default_page_size, PageSize::Twenty);
        assert_eq!(config.max_bulk_batch, 100);
        assert_eq!(config.bulk_delete, BulkDeleteStrategy::Sequential);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ClientConfig::from_yaml_str(
            "api_url: https://api.example.com/\nbulk_delete: batch\ndefault_page_size: 50\n",
        )
        .unwrap();
        assert_eq!(config.base_url(), "https://api.example.com");
        assert_eq!(config.bulk_delete, BulkDeleteStrategy::Batch);
        assert_eq!(config.default_page_size, PageSize::Fifty);
        assert_eq!(config.search_debounce_ms, 300);
    }

    #[test]
    fn test_invalid_page_size_is_rejected() {
        let err = ClientConfig::from_yaml_str("default_page_size: 25\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = ClientConfig::from_yaml_str("api_url: ftp://nope\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "api_url"));
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::default()
            .with_overrides(|key| match key {
                ENV_API_URL => Some("https://staging.example.com".to_string()),
                ENV_SEARCH_DEBOUNCE_MS => Some("150".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.api_url, "https://staging.example.com");
        assert_eq!(config.search_debounce_ms, 150);

        let err = ClientConfig::default()
            .with_overrides(|key| (key == ENV_SEARCH_DEBOUNCE_MS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("search_debounce_ms"));
    }
}
