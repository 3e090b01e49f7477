//! Initialize-once handle to the active backend.
//!
//! Backend selection runs asynchronously after the server starts accepting
//! requests. Until a backend is installed every lookup is a forced miss and
//! every write-back is skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use super::{BackendKind, CacheBackend, CacheEntry, lookup, store};
use crate::Error;

/// Cloneable handle shared by all request handlers.
#[derive(Clone)]
pub struct CacheHandle {
    backend: Arc<OnceCell<Arc<dyn CacheBackend>>>,
    ttl: Duration,
}

impl CacheHandle {
    /// Create an empty handle; entries older than `ttl` are misses.
    pub fn new(ttl: Duration) -> Self {
        Self { backend: Arc::new(OnceCell::new()), ttl }
    }

    /// Install the selected backend. Only the first call succeeds.
    pub fn install(&self, backend: Arc<dyn CacheBackend>) -> Result<(), Error> {
        let kind = backend.kind();
        self.backend.set(backend).map_err(|_| Error::AlreadyInitialized)?;
        tracing::info!(backend = %kind, "cache backend ready");
        Ok(())
    }

    /// The active backend, if selection has finished.
    pub fn backend(&self) -> Option<&Arc<dyn CacheBackend>> {
        self.backend.get()
    }

    pub fn kind(&self) -> Option<BackendKind> {
        self.backend().map(|b| b.kind())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh entry for `key`. Always a miss before installation.
    pub async fn lookup(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        match self.backend() {
            Some(backend) => lookup(backend.as_ref(), key, self.ttl).await,
            None => {
                tracing::debug!(key, "cache not ready, forcing miss");
                Ok(None)
            }
        }
    }

    /// Store `entry` under `key`, or drop it if no backend is installed yet.
    pub async fn store(&self, key: &str, entry: CacheEntry) -> Result<(), Error> {
        match self.backend() {
            Some(backend) => store(backend.as_ref(), key, entry).await,
            None => {
                tracing::debug!(key, "cache not ready, skipping write-back");
                Ok(())
            }
        }
    }

    /// Persist the active backend. A no-op before installation.
    pub async fn persist(&self) -> Result<(), Error> {
        match self.backend() {
            Some(backend) => backend.persist().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for CacheHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheHandle")
            .field("backend", &self.kind())
            .field("ttl", &self.ttl)
            .finish()
    }
}
