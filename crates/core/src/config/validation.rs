//! Configuration validation rules.
//!
//! This module provides validation logic for `HintsConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::HintsConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl HintsConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `size_limit` is 0
    /// - `cache_duration` is 0
    /// - `base_path` is empty
    /// - `max_body_bytes` is 0
    /// - a `default_headers` entry does not start with `<`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size_limit == 0 {
            return Err(ConfigError::Invalid { field: "size_limit".into(), reason: "must be at least 1 byte".into() });
        }

        if self.cache_duration == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_duration".into(),
                reason: "must be greater than 0 seconds".into(),
            });
        }

        if self.base_path.is_empty() {
            return Err(ConfigError::Invalid { field: "base_path".into(), reason: "must not be empty".into() });
        }

        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_body_bytes".into(), reason: "must be greater than 0".into() });
        }

        if let Some(header) = self.default_headers.iter().find(|h| !h.trim_start().starts_with('<')) {
            return Err(ConfigError::Invalid {
                field: "default_headers".into(),
                reason: format!("expected `<uri>; rel=\"...\"`, got `{header}`"),
            });
        }

        if self.send_103 && !self.generate_during_request {
            tracing::warn!(
                "send_103 is enabled while generate_during_request is disabled; \
                 hints are only sent once a page has been generated after a previous request"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = HintsConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_size_limit_zero() {
        let config = HintsConfig { size_limit: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "size_limit"));
    }

    #[test]
    fn test_validate_cache_duration_zero() {
        let config = HintsConfig { cache_duration: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_duration"));
    }

    #[test]
    fn test_validate_empty_base_path() {
        let config = HintsConfig { base_path: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "base_path"));
    }

    #[test]
    fn test_validate_max_body_bytes_zero() {
        let config = HintsConfig { max_body_bytes: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_body_bytes"));
    }

    #[test]
    fn test_validate_malformed_default_header() {
        let config = HintsConfig { default_headers: vec!["rel=preload".into()], ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "default_headers"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = HintsConfig { size_limit: 1, cache_duration: 1, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_send_103_without_generation_is_allowed() {
        let config = HintsConfig { send_103: true, generate_during_request: false, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
