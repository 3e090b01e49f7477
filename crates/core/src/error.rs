//! Unified error types for the stash cache core.
//!
//! Backend operations surface these to the request handler, which decides
//! whether to fall through to the upstream API.

use std::path::PathBuf;

/// Unified error types for cache backends and their selection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading or writing the persisted cache file failed.
    #[error("CACHE_IO: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An entry or the cache file could not be serialized.
    #[error("CACHE_ENCODE: {0}")]
    Encode(#[source] serde_json::Error),

    /// A stored value exists but is not a valid cache entry.
    #[error("CACHE_DECODE: value for key {key:?} is not a cache entry: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A networked store operation failed.
    #[error("CACHE_BACKEND: {0}")]
    Redis(#[from] redis::RedisError),

    /// The networked store could not be reached during construction.
    #[error("CACHE_CONNECT: {0}")]
    Connect(String),

    /// A payload handed to the cache is not a JSON document.
    #[error("INVALID_PAYLOAD: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// The process-wide cache handle was installed twice.
    #[error("CACHE_ALREADY_INITIALIZED")]
    AlreadyInitialized,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io { path: path.into(), source }
    }

    /// Whether this error means a stored value is corrupt rather than unreachable.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Connect("connection refused".to_string());
        assert!(err.to_string().contains("CACHE_CONNECT"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_decode_error_names_key() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = Error::Decode { key: "GET /recipes".to_string(), source };
        assert!(err.is_decode());
        assert!(err.to_string().contains("GET /recipes"));
    }

    #[test]
    fn test_io_error_includes_path() {
        let err = Error::io("/tmp/stash.json", std::io::Error::other("disk full"));
        assert!(!err.is_decode());
        assert!(err.to_string().contains("/tmp/stash.json"));
    }
}
