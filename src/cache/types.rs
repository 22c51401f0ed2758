//! Cache types

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A stored value with the time it was written
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// Cache key
    pub key: String,
    /// Stored payload
    pub value: V,
    /// Time the value was stored
    pub stored_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// Age of the entry at `now`
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.stored_at
    }

    /// Whether the entry is still inside its TTL at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) <= ttl
    }
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    /// Entry is inside its TTL
    Fresh(V),
    /// Entry is past its TTL but held valid by a grace deadline
    Stale(V),
    /// Entry was past its TTL and has been purged by this read
    Evicted(CacheEntry<V>),
    /// No entry for the key
    Absent,
}

impl<V> Lookup<V> {
    /// Whether the lookup counts as a cache hit
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Fresh(_) | Lookup::Stale(_))
    }
}

/// Running cache counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads served inside the TTL
    pub hits: u64,
    /// Reads served past the TTL under a grace deadline
    pub stale_hits: u64,
    /// Reads that found nothing usable
    pub misses: u64,
    /// Entries removed on read or to make room
    pub evictions: u64,
    /// Entries currently held
    pub entries: usize,
}
