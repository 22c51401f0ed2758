//! Configuration types for tickguard

use crate::guard::{GuardPolicy, DEFAULT_COOLDOWN_SECS, DEFAULT_ESCALATION_THRESHOLD};
use crate::orchestrator::OrchestratorConfig;
use crate::scoring::{
    default_worker_count, PoolConfig, Weights, DEFAULT_FREQUENCY_PARAM, DEFAULT_VECTOR_LENGTH,
    NEUTRAL_SCORE,
};
use crate::telemetry::LogFormat;
use crate::upstream::{BinanceConfig, BINANCE_FUTURES_URL, TICKER_24H_PATH};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors. Fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// File is not valid TOML for this schema
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of range
    #[error("Invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Upstream market-data configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// REST base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Ticker endpoint path
    #[serde(default = "default_ticker_path")]
    pub ticker_path: String,
    /// Request timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Rate-limit bucket name
    #[serde(default = "default_resource_class")]
    pub resource_class: String,
}

fn default_base_url() -> String {
    BINANCE_FUTURES_URL.to_string()
}
fn default_ticker_path() -> String {
    TICKER_24H_PATH.to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_resource_class() -> String {
    "futures-ticker".to_string()
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ticker_path: default_ticker_path(),
            timeout_secs: default_timeout_secs(),
            resource_class: default_resource_class(),
        }
    }
}

/// Snapshot cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Entry time-to-live (seconds)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    /// Maximum cached snapshots
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_ttl_secs() -> u64 {
    30
}
fn default_max_entries() -> usize {
    crate::cache::DEFAULT_MAX_ENTRIES
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

/// Rate-limit guard configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    /// Cooldown after a violation (seconds)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Violation count above which the escalated cooldown applies
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: u32,
    /// Cooldown once the threshold is exceeded (seconds)
    #[serde(default = "default_cooldown_secs")]
    pub escalated_cooldown_secs: u64,
    /// Leave the cooldown automatically when it elapses
    #[serde(default = "default_true")]
    pub auto_recover: bool,
}

fn default_cooldown_secs() -> u64 {
    DEFAULT_COOLDOWN_SECS as u64
}
fn default_escalation_threshold() -> u32 {
    DEFAULT_ESCALATION_THRESHOLD
}
fn default_true() -> bool {
    true
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            escalation_threshold: default_escalation_threshold(),
            escalated_cooldown_secs: default_cooldown_secs(),
            auto_recover: true,
        }
    }
}

/// Scoring pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Worker count; one per core minus one when unset
    #[serde(default)]
    pub workers: Option<usize>,
    /// Job queue depth
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    /// Factors per symbol
    #[serde(default = "default_vector_length")]
    pub vector_length: usize,
    /// Frequency parameter
    #[serde(default = "default_frequency_param")]
    pub frequency_param: f64,
    /// Weight of the structural core score
    #[serde(default = "default_core_weight")]
    pub core_weight: f64,
    /// Weight of the AI signal
    #[serde(default = "default_signal_weight")]
    pub ai_weight: f64,
    /// Weight of the secondary-strategy signal
    #[serde(default = "default_signal_weight")]
    pub vigo_weight: f64,
    /// Score substituted for failed symbols
    #[serde(default = "default_neutral_score")]
    pub neutral_score: f64,
}

fn default_queue_depth() -> usize {
    64
}
fn default_vector_length() -> usize {
    DEFAULT_VECTOR_LENGTH
}
fn default_frequency_param() -> f64 {
    DEFAULT_FREQUENCY_PARAM
}
fn default_core_weight() -> f64 {
    0.50
}
fn default_signal_weight() -> f64 {
    0.25
}
fn default_neutral_score() -> f64 {
    NEUTRAL_SCORE
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            workers: None,
            queue_depth: default_queue_depth(),
            vector_length: default_vector_length(),
            frequency_param: default_frequency_param(),
            core_weight: default_core_weight(),
            ai_weight: default_signal_weight(),
            vigo_weight: default_signal_weight(),
            neutral_score: default_neutral_score(),
        }
    }
}

impl ScoringConfig {
    /// Ensemble weights
    pub fn weights(&self) -> Weights {
        Weights {
            core_weight: self.core_weight,
            ai_weight: self.ai_weight,
            vigo_weight: self.vigo_weight,
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Prometheus listener port; 0 disables the exporter
    #[serde(default)]
    pub metrics_port: u16,
    /// Log level filter
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_port: 0,
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
        }
    }
}

/// Longest accepted TTL or cooldown: one year
pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

fn check_window(field: &'static str, secs: u64) -> Result<(), ConfigError> {
    if secs == 0 {
        return Err(ConfigError::invalid(field, "must be positive"));
    }
    if secs > MAX_WINDOW_SECS {
        return Err(ConfigError::invalid(
            field,
            format!("must be at most {} seconds, got {}", MAX_WINDOW_SECS, secs),
        ));
    }
    Ok(())
}

fn window(field: &'static str, secs: u64) -> Result<chrono::Duration, ConfigError> {
    check_window(field, secs)?;
    i64::try_from(secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| ConfigError::invalid(field, "out of range"))
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the system cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("upstream.base_url", "must not be empty"));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::invalid("upstream.timeout_secs", "must be positive"));
        }
        check_window("cache.ttl_secs", self.cache.ttl_secs)?;
        if self.cache.max_entries == 0 {
            return Err(ConfigError::invalid("cache.max_entries", "must be positive"));
        }
        check_window("guard.cooldown_secs", self.guard.cooldown_secs)?;
        check_window(
            "guard.escalated_cooldown_secs",
            self.guard.escalated_cooldown_secs,
        )?;
        if self.scoring.workers == Some(0) {
            return Err(ConfigError::invalid("scoring.workers", "must be positive"));
        }
        if self.scoring.queue_depth == 0 {
            return Err(ConfigError::invalid("scoring.queue_depth", "must be positive"));
        }
        if self.scoring.vector_length == 0 {
            return Err(ConfigError::invalid("scoring.vector_length", "must be positive"));
        }
        if !self.scoring.frequency_param.is_finite() || self.scoring.frequency_param <= 1.0 {
            return Err(ConfigError::invalid(
                "scoring.frequency_param",
                format!("must be finite and > 1, got {}", self.scoring.frequency_param),
            ));
        }
        self.scoring
            .weights()
            .validate()
            .map_err(|e| ConfigError::invalid("scoring.weights", e.to_string()))?;
        if !(0.0..=1.0).contains(&self.scoring.neutral_score) {
            return Err(ConfigError::invalid("scoring.neutral_score", "must be in [0, 1]"));
        }
        Ok(())
    }

    /// Settings for the Binance client
    pub fn binance(&self) -> BinanceConfig {
        BinanceConfig {
            base_url: self.upstream.base_url.clone(),
            ticker_path: self.upstream.ticker_path.clone(),
            timeout: Duration::from_secs(self.upstream.timeout_secs),
            resource_class: self.upstream.resource_class.clone(),
        }
    }

    /// Settings for the snapshot orchestrator
    pub fn orchestrator(&self) -> Result<OrchestratorConfig, ConfigError> {
        Ok(OrchestratorConfig {
            ttl: window("cache.ttl_secs", self.cache.ttl_secs)?,
            max_entries: self.cache.max_entries,
            guard: GuardPolicy {
                cooldown: window("guard.cooldown_secs", self.guard.cooldown_secs)?,
                escalation_threshold: self.guard.escalation_threshold,
                escalated_cooldown: window(
                    "guard.escalated_cooldown_secs",
                    self.guard.escalated_cooldown_secs,
                )?,
                auto_recover: self.guard.auto_recover,
            },
        })
    }

    /// Settings for the scoring pool
    pub fn pool(&self) -> PoolConfig {
        PoolConfig {
            workers: self.scoring.workers.unwrap_or_else(default_worker_count),
            queue_depth: self.scoring.queue_depth,
            neutral_score: self.scoring.neutral_score,
        }
    }
}
