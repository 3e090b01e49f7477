//! One-shot startup choice between the networked and file backends.
//!
//! The networked backend is preferred. If its factory fails the file backend
//! is opened instead, and that choice holds for the rest of the process.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use super::{CacheBackend, FileBackend, RedisBackend};
use crate::Error;
use crate::config::AppConfig;

/// Await `networked`, falling back to a [`FileBackend`] at `file_path`.
///
/// Yields exactly one backend. The only error is the fallback itself failing
/// to open, which leaves the process with no usable cache.
pub async fn select_with<N, F>(networked: F, file_path: &Path) -> Result<Arc<dyn CacheBackend>, Error>
where
    N: CacheBackend + 'static,
    F: Future<Output = Result<N, Error>>,
{
    match networked.await {
        Ok(backend) => Ok(Arc::new(backend)),
        Err(e) => {
            tracing::warn!(error = %e, path = %file_path.display(), "networked cache unavailable, using file cache");
            let backend = FileBackend::open(file_path).await?;
            Ok(Arc::new(backend))
        }
    }
}

/// Select the process-wide backend from configuration.
pub async fn select_backend(config: &AppConfig) -> Result<Arc<dyn CacheBackend>, Error> {
    let networked =
        RedisBackend::connect(&config.redis_url, config.redis_key_prefix.clone(), config.ttl(), config.connect_timeout());
    select_with(networked, &config.cache_file).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BackendKind, CacheEntry};
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Stand-in for a reachable networked store.
    struct FakeNetworked;

    #[async_trait]
    impl CacheBackend for FakeNetworked {
        async fn contains(&self, _key: &str) -> Result<bool, Error> {
            Ok(false)
        }

        async fn delete(&self, _key: &str) -> Result<bool, Error> {
            Ok(false)
        }

        async fn get(&self, _key: &str) -> Result<Option<CacheEntry>, Error> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _entry: CacheEntry) -> Result<(), Error> {
            Ok(())
        }

        async fn persist(&self) -> Result<(), Error> {
            Ok(())
        }

        fn kind(&self) -> BackendKind {
            BackendKind::Networked
        }
    }

    #[tokio::test]
    async fn test_prefers_networked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let backend = select_with(async { Ok::<_, Error>(FakeNetworked) }, &path).await.unwrap();
        assert_eq!(backend.kind(), BackendKind::Networked);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_falls_back_to_file() {
        let dir = TempDir::new().unwrap();
        let failing = async { Err::<FakeNetworked, _>(Error::Connect("refused".to_string())) };

        let backend = select_with(failing, &dir.path().join("cache.json")).await.unwrap();
        assert_eq!(backend.kind(), BackendKind::File);
    }

    #[tokio::test]
    async fn test_both_unavailable_is_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, "file").await.unwrap();
        let failing = async { Err::<FakeNetworked, _>(Error::Connect("refused".to_string())) };

        let result = select_with(failing, &blocker.join("cache.json")).await;
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[tokio::test]
    async fn test_select_backend_without_redis() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig {
            redis_url: "redis://127.0.0.1:1".to_string(),
            connect_timeout_ms: 200,
            cache_file: dir.path().join("cache.json"),
            ..Default::default()
        };

        let backend = select_backend(&config).await.unwrap();
        assert_eq!(backend.kind(), BackendKind::File);
    }
}
