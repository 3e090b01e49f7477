//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `ttl_secs` is 0
    /// - `redis_url`, `api_key_param`, `user_agent` or `cache_file` is empty
    /// - `upstream_url` is not an http(s) URL
    /// - `listen_addr` is not a socket address
    /// - `timeout_ms` or `connect_timeout_ms` is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl_secs == 0 {
            return Err(ConfigError::Invalid { field: "ttl_secs".into(), reason: "must be greater than 0".into() });
        }

        if self.redis_url.is_empty() {
            return Err(ConfigError::Invalid { field: "redis_url".into(), reason: "must not be empty".into() });
        }

        if self.cache_file.as_os_str().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_file".into(), reason: "must not be empty".into() });
        }

        match url::Url::parse(&self.upstream_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::Invalid {
                    field: "upstream_url".into(),
                    reason: format!("unsupported scheme: {}", url.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "upstream_url".into(), reason: e.to_string() }),
        }

        if self.api_key_param.is_empty() {
            return Err(ConfigError::Invalid { field: "api_key_param".into(), reason: "must not be empty".into() });
        }

        self.socket_addr()?;

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.connect_timeout_ms < 100 || self.connect_timeout_ms > 60_000 {
            return Err(ConfigError::Invalid {
                field: "connect_timeout_ms".into(),
                reason: "must be between 100ms and 60000ms".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.api_key.is_none() {
            tracing::warn!("api_key is not set; upstream requests will be sent without credentials");
        }

        Ok(())
    }
}
