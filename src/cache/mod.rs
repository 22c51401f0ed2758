//! Market-data cache module
//!
//! TTL-bounded key/value storage with lazy, read-time eviction

mod ttl;
mod types;

pub use ttl::{TtlCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECS};
pub use types::{CacheEntry, CacheStats, Lookup};
