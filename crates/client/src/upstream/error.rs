//! Upstream client error types.

use std::sync::Arc;

/// Errors from calling the upstream API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Base URL or request path could not form a valid URL.
    #[error("invalid upstream url: {0}")]
    InvalidUrl(String),

    /// HTTP method is not a valid token.
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    /// Request timeout.
    #[error("upstream request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response exceeded the size limit.
    #[error("upstream response too large: {size} bytes exceeds {limit}")]
    TooLarge { size: usize, limit: usize },
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ClientError::Timeout } else { ClientError::Network(Arc::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClientError::Timeout;
        assert!(err.to_string().contains("timeout"));

        let err = ClientError::InvalidUrl("relative URL without a base".to_string());
        assert!(err.to_string().contains("invalid upstream url"));

        let err = ClientError::TooLarge { size: 10, limit: 5 };
        assert!(err.to_string().contains("10 bytes exceeds 5"));
    }
}
