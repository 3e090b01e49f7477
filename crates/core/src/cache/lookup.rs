//! Freshness-aware reads and write-backs on top of any backend.

use std::time::Duration;

use super::{CacheBackend, CacheEntry};
use crate::Error;

/// Read `key`, treating stale entries as misses.
///
/// A stale entry is deleted before the miss is reported, unless another
/// request has replaced it in the meantime. Backends with native expiry never
/// return stale entries, so the check only bites for the file backend.
pub async fn lookup(backend: &dyn CacheBackend, key: &str, ttl: Duration) -> Result<Option<CacheEntry>, Error> {
    let Some(entry) = backend.get(key).await? else {
        return Ok(None);
    };

    if entry.is_fresh(ttl) {
        return Ok(Some(entry));
    }

    tracing::debug!(key, time_stored = entry.time_stored, "evicting stale entry");
    backend.delete_if_stored_at(key, entry.time_stored).await?;
    Ok(None)
}

/// Write an upstream response back to the cache.
pub async fn store(backend: &dyn CacheBackend, key: &str, entry: CacheEntry) -> Result<(), Error> {
    backend.set(key, entry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BackendKind, FileBackend, Payload, now_millis};
    use async_trait::async_trait;
    use tempfile::TempDir;

    const TTL: Duration = Duration::from_secs(1800);

    async fn backend() -> (FileBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::open(dir.path().join("cache.json")).await.unwrap();
        (backend, dir)
    }

    #[tokio::test]
    async fn test_fresh_hit() {
        let (backend, _dir) = backend().await;
        let key = "GET /recipes?query=pasta";
        let entry = CacheEntry::new(Some(Payload::from_json(r#"{"id":1}"#).unwrap()), 200);

        store(&backend, key, entry.clone()).await.unwrap();
        assert_eq!(lookup(&backend, key, TTL).await.unwrap(), Some(entry));
    }

    #[tokio::test]
    async fn test_miss() {
        let (backend, _dir) = backend().await;
        assert!(lookup(&backend, "GET /nothing", TTL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_entry_is_deleted() {
        let (backend, _dir) = backend().await;
        let key = "GET /recipes?query=pasta";
        let stored_long_ago = now_millis() - (TTL.as_millis() as i64) - 1;
        let entry = CacheEntry {
            data: Some(Payload::from_json(r#"{"id":1}"#).unwrap()),
            time_stored: stored_long_ago,
            status: 200,
        };

        store(&backend, key, entry).await.unwrap();
        assert!(lookup(&backend, key, TTL).await.unwrap().is_none());
        assert!(!backend.contains(key).await.unwrap());
    }

    /// Wraps a file backend and lands a fresh write-back right after every read.
    struct RacingBackend {
        inner: FileBackend,
        fresh: CacheEntry,
    }

    #[async_trait]
    impl CacheBackend for RacingBackend {
        async fn contains(&self, key: &str) -> Result<bool, Error> {
            self.inner.contains(key).await
        }

        async fn delete(&self, key: &str) -> Result<bool, Error> {
            self.inner.delete(key).await
        }

        async fn delete_if_stored_at(&self, key: &str, time_stored: i64) -> Result<bool, Error> {
            self.inner.delete_if_stored_at(key, time_stored).await
        }

        async fn get(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
            let seen = self.inner.get(key).await?;
            self.inner.set(key, self.fresh.clone()).await?;
            Ok(seen)
        }

        async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), Error> {
            self.inner.set(key, entry).await
        }

        async fn persist(&self) -> Result<(), Error> {
            self.inner.persist().await
        }

        fn kind(&self) -> BackendKind {
            BackendKind::File
        }
    }

    #[tokio::test]
    async fn test_stale_eviction_keeps_concurrent_write() {
        let (inner, _dir) = backend().await;
        let key = "GET /recipes?query=pasta";
        let stale = CacheEntry { data: None, time_stored: now_millis() - (TTL.as_millis() as i64) - 1, status: 200 };
        let fresh = CacheEntry::new(Some(Payload::from_json(r#"{"id":2}"#).unwrap()), 200);
        inner.set(key, stale).await.unwrap();

        let racing = RacingBackend { inner, fresh: fresh.clone() };
        assert!(lookup(&racing, key, TTL).await.unwrap().is_none());
        assert_eq!(racing.inner.get(key).await.unwrap(), Some(fresh));
    }
}
