//! Response cache with interchangeable storage backends.
//!
//! This module provides:
//!
//! - `CacheEntry`, the stored unit, and request-derived cache keys
//! - The `CacheBackend` trait every store implements
//! - A file-persisted in-memory backend and a Redis backend with native expiry
//! - Startup selection between the two and the initialize-once `CacheHandle`

pub mod entry;
pub mod file;
pub mod handle;
pub mod key;
pub mod lookup;
pub mod networked;
pub mod selector;

use std::fmt;

use async_trait::async_trait;

pub use crate::Error;

pub use entry::{CacheEntry, Payload, now_millis};
pub use file::FileBackend;
pub use handle::CacheHandle;
pub use key::cache_key;
pub use lookup::{lookup, store};
pub use networked::RedisBackend;
pub use selector::{select_backend, select_with};

/// Which storage implementation is serving the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-memory map persisted to a local JSON file.
    File,
    /// Remote key-value store with per-key expiry.
    Networked,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::File => f.write_str("file"),
            BackendKind::Networked => f.write_str("networked"),
        }
    }
}

/// Contract shared by every cache store.
///
/// `get` returns entries verbatim; freshness is checked by the caller for
/// stores without native expiry. A failed `set` leaves the previous value (or
/// absence) in place.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Whether an entry, possibly stale, exists for `key`.
    async fn contains(&self, key: &str) -> Result<bool, Error>;

    /// Remove the entry for `key`, reporting whether one was removed.
    async fn delete(&self, key: &str) -> Result<bool, Error>;

    /// Remove the entry for `key` only while it is still the one stored at
    /// `time_stored`, so a newer write for the same key survives.
    ///
    /// The default reads then deletes and is not atomic. Stores that can
    /// check and remove in one step override it.
    async fn delete_if_stored_at(&self, key: &str, time_stored: i64) -> Result<bool, Error> {
        match self.get(key).await? {
            Some(entry) if entry.time_stored == time_stored => self.delete(key).await,
            _ => Ok(false),
        }
    }

    /// Fetch the stored entry for `key`.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, Error>;

    /// Insert or overwrite the entry for `key`.
    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), Error>;

    /// Flush buffered state to durable storage.
    async fn persist(&self) -> Result<(), Error>;

    fn kind(&self) -> BackendKind;
}
