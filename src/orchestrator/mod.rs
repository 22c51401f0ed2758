//! Fetch orchestrator module
//!
//! Cache-first market snapshots with single-flight upstream calls and
//! rate-limit backoff

mod fetch;
mod single_flight;
mod types;

pub use fetch::SnapshotOrchestrator;
pub use single_flight::{Flight, FlightMap};
pub use types::{FetchError, OrchestratorConfig, SnapshotOutcome};
