//! tickguard: rate-limit aware market-data cache and parallel symbol scoring
//!
//! This library provides the core components for:
//! - TTL-bounded snapshot caching with an injectable clock
//! - Rate-limit violation tracking with cooldown and stale-data fallback
//! - Single-flight upstream fetches from the Binance futures ticker API
//! - A supervised worker pool for deterministic ensemble scoring
//! - Structured logging and Prometheus metrics

pub mod cache;
pub mod cli;
pub mod clock;
pub mod config;
pub mod guard;
pub mod orchestrator;
pub mod scoring;
pub mod telemetry;
pub mod upstream;
