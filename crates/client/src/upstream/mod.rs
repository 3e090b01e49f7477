//! HTTP client for the single upstream REST API.
//!
//! ### Request shaping
//! - Paths are resolved against the configured base URL.
//! - The configured credential is attached as a query parameter, replacing
//!   any the caller supplied.
//!
//! ### Response handling
//! - Every upstream status is passed through, including 4xx/5xx.
//! - JSON bodies become a cache `Payload`; empty or non-JSON bodies become
//!   `None` so the entry records "no usable body".
//! - Bodies larger than `max_bytes` are rejected.

pub mod error;
pub mod url;

pub use error::ClientError;
pub use url::upstream_url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method};
use stash_core::Payload;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "stash/0.1";

/// Configuration for the upstream client.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL of the upstream API.
    pub base_url: String,
    /// Credential attached to every request.
    pub api_key: Option<String>,
    /// Query parameter carrying the credential (default: "apiKey").
    pub api_key_param: String,
    /// Request timeout (default: 20s).
    pub timeout: Duration,
    /// User agent string (default: "stash/0.1").
    pub user_agent: String,
    /// Maximum response body size in bytes (default: 5MB).
    pub max_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.spoonacular.com".to_string(),
            api_key: None,
            api_key_param: "apiKey".to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

impl From<&stash_core::AppConfig> for UpstreamConfig {
    fn from(config: &stash_core::AppConfig) -> Self {
        Self {
            base_url: config.upstream_url.clone(),
            api_key: config.api_key.clone(),
            api_key_param: config.api_key_param.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
            ..Default::default()
        }
    }
}

/// Response from the upstream API, shaped for caching.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    /// HTTP status code
    pub status: u16,
    /// JSON body, if the upstream returned one
    pub data: Option<Payload>,
}

impl UpstreamResponse {
    /// Build a response from a status and raw body bytes.
    pub fn from_body(status: u16, body: &Bytes) -> Self {
        let data = std::str::from_utf8(body)
            .ok()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .and_then(|text| Payload::from_json(text).ok());
        Self { status, data }
    }
}

/// Something that can answer proxied requests.
///
/// Lets the server's request handler run against a stub in tests.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Forward `method` and `path_and_query` to the upstream API.
    async fn forward(&self, method: &str, path_and_query: &str) -> Result<UpstreamResponse, ClientError>;
}

/// reqwest-based upstream client.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: Client,
    base: ::url::Url,
    config: UpstreamConfig,
}

impl UpstreamClient {
    /// Create a new upstream client with the given configuration.
    pub fn new(config: UpstreamConfig) -> Result<Self, ClientError> {
        let base = ::url::Url::parse(&config.base_url).map_err(|e| ClientError::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?;

        Ok(Self { http, base, config })
    }
}

#[async_trait]
impl Upstream for UpstreamClient {
    async fn forward(&self, method: &str, path_and_query: &str) -> Result<UpstreamResponse, ClientError> {
        let start = Instant::now();
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ClientError::InvalidMethod(method.into()))?;
        let url = upstream_url(&self.base, path_and_query, &self.config.api_key_param, self.config.api_key.as_deref())?;

        let response = self
            .http
            .request(method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(ClientError::TooLarge { size: len as usize, limit: self.config.max_bytes });
        }

        let body = response.bytes().await?;
        if body.len() > self.config.max_bytes {
            return Err(ClientError::TooLarge { size: body.len(), limit: self.config.max_bytes });
        }

        tracing::debug!(
            %method,
            path = path_and_query,
            status,
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "upstream responded"
        );

        Ok(UpstreamResponse::from_body(status, &body))
    }
}
