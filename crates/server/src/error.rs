//! Structured errors for the proxy server.
//!
//! Each error maps to an HTTP status and a JSON body of the form
//! `{"error": "<CODE>", "message": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use stash_client::ClientError;

/// Structured errors for the proxy server.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Only GET requests are proxied.
    #[error("METHOD_NOT_ALLOWED: {0}")]
    MethodNotAllowed(String),

    /// The upstream API could not be reached or answered badly.
    #[error("UPSTREAM_ERROR: {0}")]
    Upstream(#[from] ClientError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ProxyError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            ProxyError::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED"),
            ProxyError::Upstream(ClientError::Timeout) => (StatusCode::GATEWAY_TIMEOUT, "UPSTREAM_TIMEOUT"),
            ProxyError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        let message = match &self {
            ProxyError::MethodNotAllowed(method) => format!("{method} is not supported"),
            ProxyError::Upstream(e) => e.to_string(),
        };

        (status, Json(ErrorBody { error: code, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProxyError::MethodNotAllowed("POST".to_string());
        assert!(err.to_string().contains("METHOD_NOT_ALLOWED"));
        assert!(err.to_string().contains("POST"));
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ProxyError::Upstream(ClientError::Timeout).into_response().status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ProxyError::Upstream(ClientError::InvalidUrl("x".into())).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ProxyError::MethodNotAllowed("DELETE".into()).into_response().status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
