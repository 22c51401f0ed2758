//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMetric {
    /// Snapshot served from a fresh cache entry
    CacheHit,
    /// Snapshot served from an expired entry during cooldown
    CacheStaleHit,
    /// No usable cache entry
    CacheMiss,
    /// Upstream call issued
    UpstreamRequest,
    /// Upstream answered with a rate-limit status
    RateLimitViolation,
    /// Upstream failed for a non rate-limit reason
    UpstreamTransientFailure,
    /// Upstream call skipped because the guard is cooling
    SuppressedCall,
    /// Caller joined an in-flight fetch
    SingleFlightJoin,
    /// Symbol scored with the neutral fallback
    ScoringSymbolFailure,
    /// Scoring worker restarted by the supervisor
    WorkerRestart,
}

impl CounterMetric {
    /// Prometheus metric name
    pub fn name(self) -> &'static str {
        match self {
            CounterMetric::CacheHit => "tickguard_cache_hits_total",
            CounterMetric::CacheStaleHit => "tickguard_cache_stale_hits_total",
            CounterMetric::CacheMiss => "tickguard_cache_misses_total",
            CounterMetric::UpstreamRequest => "tickguard_upstream_requests_total",
            CounterMetric::RateLimitViolation => "tickguard_rate_limit_violations_total",
            CounterMetric::UpstreamTransientFailure => {
                "tickguard_upstream_transient_failures_total"
            }
            CounterMetric::SuppressedCall => "tickguard_suppressed_calls_total",
            CounterMetric::SingleFlightJoin => "tickguard_single_flight_joins_total",
            CounterMetric::ScoringSymbolFailure => "tickguard_scoring_symbol_failures_total",
            CounterMetric::WorkerRestart => "tickguard_worker_restarts_total",
        }
    }
}

/// Latency metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyMetric {
    /// Upstream ticker fetch
    UpstreamFetch,
    /// Whole scoring batch
    ScoringBatch,
}

impl LatencyMetric {
    /// Prometheus metric name
    pub fn name(self) -> &'static str {
        match self {
            LatencyMetric::UpstreamFetch => "tickguard_upstream_fetch_latency_ms",
            LatencyMetric::ScoringBatch => "tickguard_scoring_batch_latency_ms",
        }
    }
}

/// Gauge metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeMetric {
    /// 1 while the rate-limit guard is cooling
    GuardCooling,
    /// Recorded violations
    GuardViolations,
    /// Entries held by the cache
    CacheEntries,
    /// Live scoring workers
    ActiveWorkers,
}

impl GaugeMetric {
    /// Prometheus metric name
    pub fn name(self) -> &'static str {
        match self {
            GaugeMetric::GuardCooling => "tickguard_guard_cooling",
            GaugeMetric::GuardViolations => "tickguard_guard_violations",
            GaugeMetric::CacheEntries => "tickguard_cache_entries",
            GaugeMetric::ActiveWorkers => "tickguard_active_workers",
        }
    }
}

/// Increment a counter by one
pub fn increment(metric: CounterMetric) {
    increment_by(metric, 1);
}

/// Increment a counter
pub fn increment_by(metric: CounterMetric, value: u64) {
    ::metrics::counter!(metric.name()).increment(value);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    ::metrics::histogram!(metric.name()).record(duration.as_secs_f64() * 1000.0);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    ::metrics::gauge!(metric.name()).set(value);
}

/// Install the Prometheus exporter with an HTTP listener on `port`
pub fn install_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics exporter: {}", e))?;

    tracing::info!(%addr, "Prometheus metrics exporter listening");
    Ok(())
}
