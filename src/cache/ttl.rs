//! TTL-bounded key/value store with read-time eviction

use super::types::{CacheEntry, CacheStats, Lookup};
use crate::clock::SharedClock;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Default entry time-to-live
pub const DEFAULT_TTL_SECS: i64 = 30;

/// Default maximum number of entries
pub const DEFAULT_MAX_ENTRIES: usize = 500;

/// Key/value store whose entries expire `ttl` after they were written.
///
/// Expired entries are removed lazily, on the read that finds them expired.
/// There is no background reaper.
pub struct TtlCache<V> {
    ttl: Duration,
    max_entries: usize,
    entries: HashMap<String, CacheEntry<V>>,
    stats: CacheStats,
    clock: SharedClock,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache with the given TTL and the default capacity
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
            entries: HashMap::new(),
            stats: CacheStats::default(),
            clock,
        }
    }

    /// Set the maximum number of entries (at least one)
    pub fn with_capacity(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    /// Configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of entries currently held, expired ones included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the cache counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            ..self.stats
        }
    }

    /// Store `value` under `key`, replacing any previous entry
    pub fn put(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = self.clock.now();

        // storedAt never moves backwards for a key, even if the clock does
        let stored_at = match self.entries.get(&key) {
            Some(existing) if existing.stored_at > now => existing.stored_at,
            Some(_) => now,
            None => {
                self.make_room();
                now
            }
        };

        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value,
                stored_at,
            },
        );
    }

    /// Return the value for `key` if it is inside its TTL.
    ///
    /// An expired entry is purged and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.lookup(key, None) {
            Lookup::Fresh(value) => Some(value),
            _ => None,
        }
    }

    /// Look up `key`, optionally treating an expired entry as valid until
    /// `grace_until`.
    pub fn lookup(&mut self, key: &str, grace_until: Option<DateTime<Utc>>) -> Lookup<V> {
        let now = self.clock.now();

        let Some(entry) = self.entries.get(key) else {
            self.stats.misses += 1;
            return Lookup::Absent;
        };

        if entry.is_fresh(now, self.ttl) {
            self.stats.hits += 1;
            return Lookup::Fresh(entry.value.clone());
        }

        if grace_until.is_some_and(|deadline| now < deadline) {
            self.stats.stale_hits += 1;
            return Lookup::Stale(entry.value.clone());
        }

        self.stats.misses += 1;
        self.stats.evictions += 1;
        match self.entries.remove(key) {
            Some(entry) => Lookup::Evicted(entry),
            None => Lookup::Absent,
        }
    }

    /// Reinstate an entry previously handed out by [`Lookup::Evicted`].
    ///
    /// Returns false, leaving the cache untouched, when a newer entry has
    /// been stored for the same key since.
    pub fn restore(&mut self, entry: CacheEntry<V>) -> bool {
        match self.entries.get(&entry.key) {
            Some(existing) if existing.stored_at >= entry.stored_at => false,
            Some(_) => {
                self.entries.insert(entry.key.clone(), entry);
                true
            }
            None => {
                self.make_room();
                self.entries.insert(entry.key.clone(), entry);
                true
            }
        }
    }

    /// Evict the oldest entry when inserting a new key would exceed capacity
    fn make_room(&mut self) {
        if self.entries.len() < self.max_entries {
            return;
        }

        let oldest = self
            .entries
            .values()
            .min_by_key(|e| e.stored_at)
            .map(|e| e.key.clone());

        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.stats.evictions += 1;
            tracing::debug!(key = %key, "Cache full, evicted oldest entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use serde_json::json;
    use std::sync::Arc;

    fn cache_with_clock() -> (TtlCache<serde_json::Value>, ManualClock) {
        let clock = ManualClock::default();
        let cache = TtlCache::new(Duration::seconds(DEFAULT_TTL_SECS), Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn test_get_after_put_returns_value() {
        let (mut cache, _clock) = cache_with_clock();
        cache.put("market_BTCUSDT", json!({"price": 45000}));

        assert_eq!(cache.get("market_BTCUSDT"), Some(json!({"price": 45000})));
    }

    #[test]
    fn test_get_after_ttl_is_absent_and_stays_absent() {
        let (mut cache, clock) = cache_with_clock();
        cache.put("market_BTCUSDT", json!({"price": 45000}));

        clock.advance(Duration::seconds(31));
        assert_eq!(cache.get("market_BTCUSDT"), None);
        assert_eq!(cache.get("market_BTCUSDT"), None);
        assert!(cache.is_empty());

        let stats = cache.stats();
        assert_eq!(stats.evictions, 1);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn test_ttl_boundary_is_inclusive() {
        let (mut cache, clock) = cache_with_clock();
        cache.put("k", json!(1));

        clock.advance(Duration::seconds(30));
        assert_eq!(cache.get("k"), Some(json!(1)));
    }

    #[test]
    fn test_put_overwrites_and_refreshes() {
        let (mut cache, clock) = cache_with_clock();
        cache.put("k", json!(1));
        clock.advance(Duration::seconds(20));
        cache.put("k", json!(2));
        clock.advance(Duration::seconds(20));

        assert_eq!(cache.get("k"), Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stored_at_never_moves_backwards() {
        let (mut cache, clock) = cache_with_clock();
        cache.put("k", json!(1));
        let first = clock.now();

        clock.advance(Duration::seconds(-10));
        cache.put("k", json!(2));

        match cache.lookup("k", None) {
            Lookup::Fresh(v) => assert_eq!(v, json!(2)),
            other => panic!("expected fresh entry, got {:?}", other),
        }
        assert_eq!(cache.entries["k"].stored_at, first);
    }

    #[test]
    fn test_grace_deadline_keeps_expired_entry() {
        let (mut cache, clock) = cache_with_clock();
        cache.put("k", json!("old"));
        clock.advance(Duration::seconds(45));

        let grace = clock.now() + Duration::minutes(30);
        assert_eq!(cache.lookup("k", Some(grace)), Lookup::Stale(json!("old")));
        assert_eq!(cache.len(), 1);

        // Without grace the same read evicts
        match cache.lookup("k", None) {
            Lookup::Evicted(entry) => assert_eq!(entry.value, json!("old")),
            other => panic!("expected eviction, got {:?}", other),
        }
        assert_eq!(cache.lookup("k", None), Lookup::Absent);
    }

    #[test]
    fn test_elapsed_grace_deadline_evicts() {
        let (mut cache, clock) = cache_with_clock();
        cache.put("k", json!(1));
        clock.advance(Duration::seconds(45));

        let grace = clock.now() - Duration::seconds(1);
        assert!(matches!(cache.lookup("k", Some(grace)), Lookup::Evicted(_)));
    }

    #[test]
    fn test_restore_reinstates_evicted_entry() {
        let (mut cache, clock) = cache_with_clock();
        cache.put("k", json!(1));
        clock.advance(Duration::seconds(45));

        let Lookup::Evicted(entry) = cache.lookup("k", None) else {
            panic!("expected eviction");
        };
        assert!(cache.restore(entry));

        let grace = clock.now() + Duration::seconds(5);
        assert_eq!(cache.lookup("k", Some(grace)), Lookup::Stale(json!(1)));
    }

    #[test]
    fn test_restore_does_not_clobber_newer_entry() {
        let (mut cache, clock) = cache_with_clock();
        cache.put("k", json!("old"));
        clock.advance(Duration::seconds(45));

        let Lookup::Evicted(entry) = cache.lookup("k", None) else {
            panic!("expected eviction");
        };
        cache.put("k", json!("new"));

        assert!(!cache.restore(entry));
        assert_eq!(cache.get("k"), Some(json!("new")));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let (cache, clock) = cache_with_clock();
        let mut cache = cache.with_capacity(2);

        cache.put("a", json!(1));
        clock.advance(Duration::seconds(1));
        cache.put("b", json!(2));
        clock.advance(Duration::seconds(1));
        cache.put("c", json!(3));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(json!(2)));
        assert_eq!(cache.get("c"), Some(json!(3)));
    }

    #[test]
    fn test_overwrite_at_capacity_does_not_evict() {
        let (cache, _clock) = cache_with_clock();
        let mut cache = cache.with_capacity(2);

        cache.put("a", json!(1));
        cache.put("b", json!(2));
        cache.put("a", json!(3));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_opaque_keys_accepted() {
        let (mut cache, _clock) = cache_with_clock();
        cache.put("", json!(null));
        cache.put("weird key/with:chars", json!([1, 2]));

        assert_eq!(cache.get(""), Some(json!(null)));
        assert_eq!(cache.get("weird key/with:chars"), Some(json!([1, 2])));
    }
}
