//! Violation tracking and cooldown for an upstream resource class

use super::types::{GuardPolicy, GuardState, GuardStatus, RateLimitState};
use crate::clock::SharedClock;
use chrono::{DateTime, Utc};

/// Decides whether an upstream call is permitted.
///
/// A violation (HTTP 418/429 class response) moves the guard into Cooling
/// for the policy's window. While Cooling every call is suppressed.
pub struct RateLimitGuard {
    resource_class: String,
    policy: GuardPolicy,
    state: RateLimitState,
    clock: SharedClock,
}

impl RateLimitGuard {
    /// Create a guard in the Normal state
    pub fn new(resource_class: impl Into<String>, policy: GuardPolicy, clock: SharedClock) -> Self {
        Self {
            resource_class: resource_class.into(),
            policy,
            state: RateLimitState::default(),
            clock,
        }
    }

    /// Resource class this guard protects
    pub fn resource_class(&self) -> &str {
        &self.resource_class
    }

    /// Raw backoff state
    pub fn raw_state(&self) -> &RateLimitState {
        &self.state
    }

    /// Whether calls are currently suppressed
    pub fn is_cooling(&self) -> bool {
        match self.state.forced_valid_until {
            Some(until) if self.policy.auto_recover => self.clock.now() < until,
            Some(_) => true,
            None => false,
        }
    }

    /// Whether the next upstream call must be skipped
    pub fn should_suppress_call(&self) -> bool {
        self.is_cooling()
    }

    /// Deadline until which cached data stays valid, only while Cooling.
    ///
    /// Without auto-recovery the cooldown only ends on [`reset`](Self::reset),
    /// so cached data is held indefinitely.
    pub fn forced_valid_until(&self) -> Option<DateTime<Utc>> {
        if !self.is_cooling() {
            return None;
        }
        if self.policy.auto_recover {
            self.state.forced_valid_until
        } else {
            Some(DateTime::<Utc>::MAX_UTC)
        }
    }

    /// Derived state
    pub fn state(&self) -> GuardState {
        if self.is_cooling() {
            GuardState::Cooling
        } else if self.state.violation_count > 0 {
            GuardState::Probation
        } else {
            GuardState::Normal
        }
    }

    /// Snapshot for reporting
    pub fn status(&self) -> GuardStatus {
        GuardStatus {
            resource_class: self.resource_class.clone(),
            state: self.state(),
            violation_count: self.state.violation_count,
            forced_valid_until: self.state.forced_valid_until,
        }
    }

    /// Record a rate-limit violation and start (or extend) the cooldown
    pub fn record_violation(&mut self) {
        let now = self.clock.now();
        self.state.violation_count = self.state.violation_count.saturating_add(1);

        let window = self.policy.window_for(self.state.violation_count);
        let until = now
            .checked_add_signed(window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.state.forced_valid_until = Some(until);

        tracing::warn!(
            resource_class = %self.resource_class,
            violations = self.state.violation_count,
            cooldown_secs = window.num_seconds(),
            until = %until,
            "Upstream rate limit hit, cooling down"
        );
    }

    /// Record a successful upstream call.
    ///
    /// Clears violations unless the guard is still Cooling. Returns whether
    /// the state was reset.
    pub fn record_success(&mut self) -> bool {
        if self.is_cooling() {
            tracing::debug!(
                resource_class = %self.resource_class,
                "Success recorded while cooling, keeping violations"
            );
            return false;
        }

        if self.state.violation_count > 0 {
            tracing::info!(
                resource_class = %self.resource_class,
                cleared = self.state.violation_count,
                "Upstream recovered, clearing violations"
            );
        }
        self.state = RateLimitState::default();
        true
    }

    /// Operator reset back to Normal, regardless of cooldown
    pub fn reset(&mut self) {
        tracing::info!(
            resource_class = %self.resource_class,
            violations = self.state.violation_count,
            "Rate-limit guard reset"
        );
        self.state = RateLimitState::default();
    }
}
