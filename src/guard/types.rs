//! Rate-limit guard types

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Default cooldown after a violation (30 minutes)
pub const DEFAULT_COOLDOWN_SECS: i64 = 30 * 60;

/// Violation count above which the escalated cooldown applies
pub const DEFAULT_ESCALATION_THRESHOLD: u32 = 2;

/// Mutable backoff state for one upstream resource class
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitState {
    /// Violations recorded since the last reset
    pub violation_count: u32,
    /// Upstream calls are suppressed until this instant
    pub forced_valid_until: Option<DateTime<Utc>>,
}

/// Observable guard state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardState {
    /// No outstanding violations
    Normal,
    /// Upstream calls suppressed until the cooldown elapses
    Cooling,
    /// Cooldown elapsed but violations not yet cleared by a success
    Probation,
}

/// Cooldown policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Cooldown applied to the first `escalation_threshold` violations
    pub cooldown: Duration,
    /// Violation count above which `escalated_cooldown` is used
    pub escalation_threshold: u32,
    /// Cooldown applied once the threshold is exceeded
    pub escalated_cooldown: Duration,
    /// Leave Cooling automatically once the cooldown has elapsed
    pub auto_recover: bool,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::seconds(DEFAULT_COOLDOWN_SECS),
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            escalated_cooldown: Duration::seconds(DEFAULT_COOLDOWN_SECS),
            auto_recover: true,
        }
    }
}

impl GuardPolicy {
    /// Cooldown window for the given violation count
    pub fn window_for(&self, violation_count: u32) -> Duration {
        if violation_count > self.escalation_threshold {
            self.escalated_cooldown
        } else {
            self.cooldown
        }
    }
}

/// Point-in-time view of a guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardStatus {
    /// Upstream resource class the guard protects
    pub resource_class: String,
    /// Derived state
    pub state: GuardState,
    /// Violations since the last reset
    pub violation_count: u32,
    /// End of the current or most recent cooldown
    pub forced_valid_until: Option<DateTime<Utc>>,
}
