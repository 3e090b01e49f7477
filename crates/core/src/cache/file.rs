//! In-memory cache persisted to a single JSON file.
//!
//! The map is the source of truth while the process runs. The file is read
//! once in [`FileBackend::open`] and rewritten only by `persist`, so entries
//! set since the last persist are lost if the process dies first.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{BackendKind, CacheBackend, CacheEntry};
use crate::Error;

/// Discriminant marking the document as a serialized map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum DataType {
    Map,
}

/// On-disk layout: `{"dataType":"Map","value":[[key, entry], ...]}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaggedMap {
    data_type: DataType,
    value: Vec<(String, CacheEntry)>,
}

/// Encode a map in the tagged pair-list format, pairs sorted by key.
pub fn encode_map(entries: &HashMap<String, CacheEntry>) -> Result<Vec<u8>, Error> {
    let mut value: Vec<(String, CacheEntry)> = entries.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    value.sort_by(|a, b| a.0.cmp(&b.0));
    serde_json::to_vec(&TaggedMap { data_type: DataType::Map, value }).map_err(Error::Encode)
}

/// Decode the tagged pair-list format. Duplicate keys resolve last-wins.
pub fn decode_map(bytes: &[u8]) -> Result<HashMap<String, CacheEntry>, serde_json::Error> {
    let tagged: TaggedMap = serde_json::from_slice(bytes)?;
    Ok(tagged.value.into_iter().collect())
}

/// Cache backend holding entries in memory with file snapshots.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl FileBackend {
    /// Open the backend, loading any snapshot at `path`.
    ///
    /// A missing, unreadable or malformed file yields an empty cache. The only
    /// error is failing to create the directory the file lives in, since the
    /// cache could then never be persisted.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => decode_map(&bytes).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "cache file is malformed, starting empty");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no cache file, starting empty");
                HashMap::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cache file is unreadable, starting empty");
                HashMap::new()
            }
        };

        tracing::info!(path = %path.display(), entries = entries.len(), "loaded file cache");

        Ok(Self { path, entries: RwLock::new(entries) })
    }

    /// Number of entries currently held, stale ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Write `bytes` to a uniquely named sibling of `path`, sync it, then rename
/// it over `path`. Concurrent writers never share a temp file.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let prefix = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();

    let mut tmp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| Error::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| Error::io(tmp.path(), e))?;
    tmp.as_file().sync_all().map_err(|e| Error::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

#[async_trait]
impl CacheBackend for FileBackend {
    async fn contains(&self, key: &str) -> Result<bool, Error> {
        Ok(self.entries.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn delete_if_stored_at(&self, key: &str, time_stored: i64) -> Result<bool, Error> {
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.time_stored == time_stored) {
            entries.remove(key);
            return Ok(true);
        }
        Ok(false)
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), Error> {
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    /// Atomically replace the snapshot file with the current map.
    async fn persist(&self) -> Result<(), Error> {
        let (bytes, count) = {
            let entries = self.entries.read().await;
            (encode_map(&entries)?, entries.len())
        };

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|e| Error::io(&self.path, std::io::Error::other(e)))??;

        tracing::info!(path = %self.path.display(), entries = count, "persisted file cache");
        Ok(())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::File
    }
}
