//! Single-flight snapshot orchestrator

use super::single_flight::{Flight, FlightMap};
use super::types::{FetchError, OrchestratorConfig, SnapshotOutcome};
use crate::cache::{CacheEntry, CacheStats, Lookup, TtlCache};
use crate::clock::SharedClock;
use crate::guard::{GuardStatus, RateLimitGuard};
use crate::telemetry::{self, CounterMetric, GaugeMetric, LatencyMetric};
use crate::upstream::{MarketDataSource, MarketSnapshot, SymbolSet};
use futures_util::FutureExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

type FlightResult = Result<SnapshotOutcome, FetchError>;
type StaleEntry = CacheEntry<Arc<MarketSnapshot>>;

/// Shared state behind an orchestrator handle
struct Inner {
    source: Arc<dyn MarketDataSource>,
    cache: Mutex<TtlCache<Arc<MarketSnapshot>>>,
    guard: Mutex<RateLimitGuard>,
    flights: Mutex<FlightMap<FlightResult>>,
}

/// Entry point for market snapshots.
///
/// Owns the cache and the rate-limit guard; nothing else writes to either.
/// `flights` is taken first. `guard` and `cache` are each locked on their
/// own beneath it and never held at the same time.
#[derive(Clone)]
pub struct SnapshotOrchestrator {
    inner: Arc<Inner>,
}

impl SnapshotOrchestrator {
    /// Create an orchestrator around a market-data source
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        config: OrchestratorConfig,
        clock: SharedClock,
    ) -> Self {
        let cache = TtlCache::new(config.ttl, clock.clone()).with_capacity(config.max_entries);
        let guard = RateLimitGuard::new(source.resource_class(), config.guard, clock);

        Self {
            inner: Arc::new(Inner {
                source,
                cache: Mutex::new(cache),
                guard: Mutex::new(guard),
                flights: Mutex::new(FlightMap::new()),
            }),
        }
    }

    /// Return a snapshot for `symbols`: fresh, stale, or explicitly empty.
    ///
    /// Concurrent calls for the same symbol set share one upstream request.
    /// Never waits on a rate-limit cooldown.
    pub async fn get_market_snapshot(&self, symbols: &SymbolSet) -> FlightResult {
        let key = symbols.cache_key();

        let flight = {
            let mut flights = self.inner.flights.lock().await;

            if let Some(flight) = flights.get(&key) {
                telemetry::increment(CounterMetric::SingleFlightJoin);
                tracing::debug!(key = %key, "Joining in-flight fetch");
                flight
            } else {
                let grace = self.inner.guard.lock().await.forced_valid_until();
                let lookup = self.inner.cache.lock().await.lookup(&key, grace);

                let stale = match lookup {
                    Lookup::Fresh(snapshot) => {
                        telemetry::increment(CounterMetric::CacheHit);
                        tracing::debug!(key = %key, "Cache hit");
                        return Ok(SnapshotOutcome::Fresh(snapshot));
                    }
                    Lookup::Stale(snapshot) => {
                        telemetry::increment(CounterMetric::CacheStaleHit);
                        tracing::debug!(key = %key, "Guard cooling, serving stale entry");
                        return Ok(SnapshotOutcome::Stale(snapshot));
                    }
                    Lookup::Evicted(entry) => Some(entry),
                    Lookup::Absent => None,
                };
                telemetry::increment(CounterMetric::CacheMiss);

                if grace.is_some() {
                    telemetry::increment(CounterMetric::SuppressedCall);
                    tracing::debug!(key = %key, "Guard cooling and nothing cached");
                    return Ok(SnapshotOutcome::NoData);
                }

                self.start_flight(&mut flights, key.clone(), symbols.clone(), stale)
            }
        };

        flight.await
    }

    /// Spawn the upstream fetch and register it as the flight for `key`.
    ///
    /// The fetch runs on its own task so it completes and updates the cache
    /// even if every caller stops waiting.
    fn start_flight(
        &self,
        flights: &mut FlightMap<FlightResult>,
        key: String,
        symbols: SymbolSet,
        stale: Option<StaleEntry>,
    ) -> Flight<FlightResult> {
        let id = flights.next_id();

        let inner = self.inner.clone();
        let task_key = key.clone();
        let handle =
            tokio::spawn(async move { inner.run_fetch(task_key, id, symbols, stale).await });

        let inner = self.inner.clone();
        let wait_key = key.clone();
        let fut = async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(key = %wait_key, error = %e, "Fetch task failed");
                    inner.flights.lock().await.complete(&wait_key, id);
                    Err(FetchError::TaskFailed(e.to_string()))
                }
            }
        }
        .boxed();

        flights.insert(key, id, fut)
    }

    /// Resource class of the wrapped source
    pub fn resource_class(&self) -> &str {
        self.inner.source.resource_class()
    }

    /// Current guard status
    pub async fn guard_status(&self) -> GuardStatus {
        self.inner.guard.lock().await.status()
    }

    /// Current cache counters
    pub async fn cache_stats(&self) -> CacheStats {
        self.inner.cache.lock().await.stats()
    }

    /// Number of fetches currently in flight
    pub async fn in_flight(&self) -> usize {
        self.inner.flights.lock().await.len()
    }

    /// Operator reset of the rate-limit guard
    pub async fn reset_guard(&self) {
        let mut guard = self.inner.guard.lock().await;
        guard.reset();
        Inner::publish_guard(&guard);
    }
}

impl Inner {
    /// Perform one upstream call and apply its result to cache and guard
    async fn run_fetch(
        self: Arc<Self>,
        key: String,
        id: u64,
        symbols: SymbolSet,
        stale: Option<StaleEntry>,
    ) -> FlightResult {
        telemetry::increment(CounterMetric::UpstreamRequest);
        let started = Instant::now();
        let result = self.source.fetch(&symbols).await;
        telemetry::record_latency(LatencyMetric::UpstreamFetch, started.elapsed());

        let outcome = match result {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                {
                    let mut cache = self.cache.lock().await;
                    cache.put(key.clone(), snapshot.clone());
                    telemetry::set_gauge(GaugeMetric::CacheEntries, cache.len() as f64);
                }
                {
                    let mut guard = self.guard.lock().await;
                    guard.record_success();
                    Self::publish_guard(&guard);
                }
                tracing::info!(
                    key = %key,
                    tickers = snapshot.len(),
                    "Fetched fresh snapshot"
                );
                Ok(SnapshotOutcome::Fresh(snapshot))
            }
            Err(e) if e.is_violation() => {
                telemetry::increment(CounterMetric::RateLimitViolation);
                {
                    let mut guard = self.guard.lock().await;
                    guard.record_violation();
                    Self::publish_guard(&guard);
                }
                match stale {
                    Some(entry) => {
                        let snapshot = entry.value.clone();
                        // Keep the last known value reachable for the cooldown
                        self.cache.lock().await.restore(entry);
                        tracing::warn!(key = %key, error = %e, "Rate limited, serving stale snapshot");
                        Ok(SnapshotOutcome::Stale(snapshot))
                    }
                    None => {
                        tracing::warn!(key = %key, error = %e, "Rate limited, no cached snapshot");
                        Ok(SnapshotOutcome::NoData)
                    }
                }
            }
            Err(e) => {
                telemetry::increment(CounterMetric::UpstreamTransientFailure);
                tracing::warn!(key = %key, error = %e, "Upstream fetch failed");
                Err(FetchError::Transient(e))
            }
        };

        self.flights.lock().await.complete(&key, id);
        outcome
    }

    fn publish_guard(guard: &RateLimitGuard) {
        let cooling = if guard.is_cooling() { 1.0 } else { 0.0 };
        telemetry::set_gauge(GaugeMetric::GuardCooling, cooling);
        telemetry::set_gauge(
            GaugeMetric::GuardViolations,
            guard.raw_state().violation_count as f64,
        );
    }
}
