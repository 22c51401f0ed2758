//! Rate-limit guard module
//!
//! Tracks upstream rate-limit violations and suppresses calls during cooldown

mod rate_limit;
mod types;

pub use rate_limit::RateLimitGuard;
pub use types::{
    GuardPolicy, GuardState, GuardStatus, RateLimitState, DEFAULT_COOLDOWN_SECS,
    DEFAULT_ESCALATION_THRESHOLD,
};
