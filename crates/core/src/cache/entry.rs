//! The unit of storage shared by every backend.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::Error;

/// An upstream response body kept as already-serialized JSON.
///
/// The cache never looks inside the payload; it only moves the raw text
/// between the upstream client, the backends and the response writer.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Box<RawValue>);

impl Payload {
    /// Wrap a JSON document, rejecting text that is not valid JSON.
    pub fn from_json(json: impl Into<String>) -> Result<Self, Error> {
        RawValue::from_string(json.into())
            .map(Payload)
            .map_err(Error::InvalidPayload)
    }

    /// The raw JSON text.
    pub fn as_str(&self) -> &str {
        self.0.get()
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Payload {}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload").field(&self.as_str()).finish()
    }
}

/// A cached upstream response.
///
/// Serialized as `{"data": <any|null>, "timeStored": <ms>, "status": <int>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Response body, `None` when the upstream call produced no usable body.
    pub data: Option<Payload>,
    /// Milliseconds since the Unix epoch at which the entry was written.
    pub time_stored: i64,
    /// Status code of the cached response.
    pub status: u16,
}

impl CacheEntry {
    /// Create an entry stamped with the current time.
    pub fn new(data: Option<Payload>, status: u16) -> Self {
        Self { data, time_stored: now_millis(), status }
    }

    /// Whether the entry is younger than `ttl` at `now_ms`.
    pub fn is_fresh_at(&self, ttl: Duration, now_ms: i64) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.time_stored) < ttl_ms
    }

    /// Whether the entry is younger than `ttl` right now.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(ttl, now_millis())
    }
}

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
