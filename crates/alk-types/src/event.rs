use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Version token attached to every repository change notification.
///
/// Two tokens are compared by value: a cache that has already applied a
/// token ignores any notification carrying an equal one. The ordering
/// (`updated_at_ms` then `sequence`) is informational; caches only ever test
/// equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheUpdateEvent {
    /// Wall-clock milliseconds since UNIX epoch when the data was refreshed.
    pub updated_at_ms: u64,
    /// Monotonic refresh counter within the producing repository.
    pub sequence: u64,
}

impl CacheUpdateEvent {
    /// Create a token with explicit values.
    pub fn new(updated_at_ms: u64, sequence: u64) -> Self {
        Self {
            updated_at_ms,
            sequence,
        }
    }

    /// Create a token stamped with the current wall-clock time.
    pub fn now(sequence: u64) -> Self {
        let updated_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            updated_at_ms,
            sequence,
        }
    }
}

impl fmt::Debug for CacheUpdateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheUpdateEvent({}ms#{})", self.updated_at_ms, self.sequence)
    }
}

impl fmt::Display for CacheUpdateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.updated_at_ms, self.sequence)
    }
}
