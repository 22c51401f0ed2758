//! Fetch orchestrator types

use crate::cache::DEFAULT_MAX_ENTRIES;
use crate::guard::GuardPolicy;
use crate::upstream::{MarketSnapshot, UpstreamError};
use chrono::Duration;
use std::sync::Arc;
use thiserror::Error;

/// What a snapshot request produced
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    /// Served from the cache inside its TTL or fetched just now
    Fresh(Arc<MarketSnapshot>),
    /// Last known value, served because the upstream is unavailable
    Stale(Arc<MarketSnapshot>),
    /// Nothing cached and the upstream could not be asked
    NoData,
}

impl SnapshotOutcome {
    /// The snapshot, fresh or stale
    pub fn snapshot(&self) -> Option<&Arc<MarketSnapshot>> {
        match self {
            SnapshotOutcome::Fresh(s) | SnapshotOutcome::Stale(s) => Some(s),
            SnapshotOutcome::NoData => None,
        }
    }

    /// Whether the data is fresh
    pub fn is_fresh(&self) -> bool {
        matches!(self, SnapshotOutcome::Fresh(_))
    }

    /// Whether the data is stale
    pub fn is_stale(&self) -> bool {
        matches!(self, SnapshotOutcome::Stale(_))
    }

    /// Whether no data was available
    pub fn is_empty(&self) -> bool {
        matches!(self, SnapshotOutcome::NoData)
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            SnapshotOutcome::Fresh(_) => "fresh",
            SnapshotOutcome::Stale(_) => "stale",
            SnapshotOutcome::NoData => "no_data",
        }
    }
}

/// Retryable snapshot failures.
///
/// Rate-limit violations never surface here; they are absorbed by the guard.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Upstream failed for a reason other than rate limiting
    #[error("Transient upstream failure: {0}")]
    Transient(UpstreamError),
    /// The background fetch task died before reporting
    #[error("Fetch task failed: {0}")]
    TaskFailed(String),
}

impl FetchError {
    /// Whether the caller may retry
    pub fn is_retryable(&self) -> bool {
        true
    }
}

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Cache time-to-live
    pub ttl: Duration,
    /// Maximum cached snapshots
    pub max_entries: usize,
    /// Rate-limit cooldown policy
    pub guard: GuardPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(crate::cache::DEFAULT_TTL_SECS),
            max_entries: DEFAULT_MAX_ENTRIES,
            guard: GuardPolicy::default(),
        }
    }
}
