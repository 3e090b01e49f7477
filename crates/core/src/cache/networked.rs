//! Redis-backed cache with native per-key expiry.
//!
//! Entries are stored as JSON strings under `<prefix><key>` with `EX` set to
//! the configured TTL, so the store itself drops stale entries. Every network
//! failure is returned to the caller; nothing here turns an error into a miss.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{ConnectionLike, MultiplexedConnection};

use super::{BackendKind, CacheBackend, CacheEntry};
use crate::Error;

/// Cache backend talking to a Redis server.
///
/// Generic over the connection so any [`ConnectionLike`] transport can carry
/// the commands; production code always uses a multiplexed connection.
#[derive(Clone)]
pub struct RedisBackend<C = MultiplexedConnection> {
    conn: C,
    prefix: String,
    ttl: Duration,
}

impl<C> std::fmt::Debug for RedisBackend<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("prefix", &self.prefix)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl<C> RedisBackend<C> {
    fn new(conn: C, prefix: String, ttl: Duration) -> Self {
        Self { conn, prefix, ttl }
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }
}

impl RedisBackend {
    /// Connect to `url` and return a backend once the server answers `PING`.
    ///
    /// Fails with [`Error::Connect`] if the URL is invalid, the connection
    /// cannot be opened within `connect_timeout`, or the server does not reply.
    pub async fn connect(
        url: &str, prefix: impl Into<String>, ttl: Duration, connect_timeout: Duration,
    ) -> Result<Self, Error> {
        let client = redis::Client::open(url).map_err(|e| Error::Connect(format!("invalid url: {e}")))?;

        let mut conn = tokio::time::timeout(connect_timeout, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| Error::Connect(format!("timed out after {}ms", connect_timeout.as_millis())))?
            .map_err(|e| Error::Connect(e.to_string()))?;

        let _: String = tokio::time::timeout(connect_timeout, redis::cmd("PING").query_async(&mut conn))
            .await
            .map_err(|_| Error::Connect("PING timed out".to_string()))?
            .map_err(|e| Error::Connect(e.to_string()))?;

        tracing::info!(ttl_secs = ttl.as_secs(), "connected to redis cache");

        Ok(Self::new(conn, prefix.into(), ttl))
    }
}

#[async_trait]
impl<C> CacheBackend for RedisBackend<C>
where
    C: ConnectionLike + Clone + Send + Sync + 'static,
{
    async fn contains(&self, key: &str) -> Result<bool, Error> {
        let mut conn = self.conn.clone();
        let count: i64 = conn.exists(self.storage_key(key)).await?;
        Ok(count > 0)
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(self.storage_key(key)).await?;
        Ok(removed == 1)
    }

    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.storage_key(key)).await?;

        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|source| Error::Decode { key: key.to_string(), source })
        })
        .transpose()
    }

    async fn set(&self, key: &str, entry: CacheEntry) -> Result<(), Error> {
        let json = serde_json::to_string(&entry).map_err(Error::Encode)?;
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(self.storage_key(key), json, self.ttl_secs()).await?;
        Ok(())
    }

    /// Ask the server for a background snapshot. Best effort.
    async fn persist(&self) -> Result<(), Error> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("BGSAVE").query_async(&mut conn).await?;
        tracing::info!("requested redis background save");
        Ok(())
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Networked
    }
}
