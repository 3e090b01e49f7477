//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (STASH_*)
//! 2. TOML config file (if STASH_CONFIG_FILE set)
//! 3. Built-in defaults

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (STASH_*)
/// 2. TOML config file (if STASH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Seconds a cached response stays fresh.
    ///
    /// Set via STASH_TTL_SECS environment variable.
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Connection URL of the networked cache.
    ///
    /// Set via STASH_REDIS_URL environment variable.
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Prefix applied to every key written to the networked cache.
    #[serde(default = "default_redis_key_prefix")]
    pub redis_key_prefix: String,

    /// How long to wait for the networked cache at startup, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Snapshot file used when the networked cache is unavailable.
    ///
    /// Set via STASH_CACHE_FILE environment variable.
    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,

    /// Base URL of the upstream API.
    ///
    /// Set via STASH_UPSTREAM_URL environment variable.
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,

    /// Credential appended to every upstream request.
    ///
    /// Set via STASH_API_KEY environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Query parameter carrying the credential. Stripped from cache keys.
    #[serde(default = "default_api_key_param")]
    pub api_key_param: String,

    /// Address the proxy listens on.
    ///
    /// Set via STASH_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Upstream request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// User-Agent string for upstream requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_ttl_secs() -> u64 {
    1800
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".into()
}

fn default_redis_key_prefix() -> String {
    "stash:".into()
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("./stash-cache.json")
}

fn default_upstream_url() -> String {
    "https://api.spoonacular.com".into()
}

fn default_api_key_param() -> String {
    "apiKey".into()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_user_agent() -> String {
    "stash/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            redis_url: default_redis_url(),
            redis_key_prefix: default_redis_key_prefix(),
            connect_timeout_ms: default_connect_timeout_ms(),
            cache_file: default_cache_file(),
            upstream_url: default_upstream_url(),
            api_key: None,
            api_key_param: default_api_key_param(),
            listen_addr: default_listen_addr(),
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Freshness window as Duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Networked cache connect timeout as Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Upstream timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Query parameters that must never appear in a cache key.
    pub fn secret_params(&self) -> Vec<String> {
        vec![self.api_key_param.clone()]
    }

    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `listen_addr` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen_addr.parse().map_err(|e| ConfigError::Invalid {
            field: "listen_addr".into(),
            reason: format!("{e}"),
        })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `STASH_`
    /// 2. TOML file from `STASH_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("STASH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("STASH_")
                .ignore(&["CONFIG_FILE", "TEST_REDIS_URL"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
