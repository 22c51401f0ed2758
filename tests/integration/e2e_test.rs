//! End-to-end tests: HTTP client, cache and guard together

use crate::common::serve_script;
use chrono::Duration;
use rust_decimal_macros::dec;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tickguard::clock::ManualClock;
use tickguard::guard::GuardState;
use tickguard::orchestrator::{FetchError, OrchestratorConfig, SnapshotOrchestrator};
use tickguard::upstream::{BinanceConfig, BinanceFuturesClient, SymbolSet, UpstreamError};

const TICKERS: &str = r#"[
    {"symbol":"BTCUSDT","lastPrice":"45000.00","volume":"100.5","priceChangePercent":"2.10"},
    {"symbol":"ETHUSDT","lastPrice":"2500.50","volume":"900","priceChangePercent":"-0.40"}
]"#;

fn orchestrator_for(base_url: String) -> (SnapshotOrchestrator, ManualClock) {
    let client = BinanceFuturesClient::with_config(BinanceConfig {
        base_url,
        timeout: std::time::Duration::from_secs(5),
        ..Default::default()
    })
    .unwrap();
    let clock = ManualClock::default();
    let orch = SnapshotOrchestrator::new(
        Arc::new(client),
        OrchestratorConfig::default(),
        Arc::new(clock.clone()),
    );
    (orch, clock)
}

#[tokio::test]
async fn test_ban_after_fresh_fetch_serves_stale() {
    let (base, hits) = serve_script(vec![("200 OK", TICKERS), ("429 Too Many Requests", "")]).await;
    let (orch, clock) = orchestrator_for(base);
    let symbols = SymbolSet::new(["btcusdt"]);

    let first = orch.get_market_snapshot(&symbols).await.unwrap();
    assert!(first.is_fresh());
    assert_eq!(first.snapshot().unwrap().len(), 1);

    assert!(orch.get_market_snapshot(&symbols).await.unwrap().is_fresh());
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    clock.advance(Duration::seconds(31));
    let banned = orch.get_market_snapshot(&symbols).await.unwrap();
    assert!(banned.is_stale());
    assert_eq!(
        banned.snapshot().unwrap().ticker("BTCUSDT").unwrap().last_price,
        dec!(45000.00)
    );
    assert_eq!(orch.guard_status().await.state, GuardState::Cooling);

    let held = orch.get_market_snapshot(&symbols).await.unwrap();
    assert!(held.is_stale());
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    let stats = orch.cache_stats().await;
    assert_eq!(stats.hits, 1);
    assert!(stats.stale_hits >= 1);
}

#[tokio::test]
async fn test_teapot_without_cache_is_no_data() {
    let (base, hits) = serve_script(vec![("418 I'm a teapot", "")]).await;
    let (orch, _clock) = orchestrator_for(base);

    let outcome = orch.get_market_snapshot(&SymbolSet::all()).await.unwrap();
    assert!(outcome.is_empty());
    assert!(orch.get_market_snapshot(&SymbolSet::all()).await.unwrap().is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (base, _hits) = serve_script(vec![("500 Internal Server Error", "oops")]).await;
    let (orch, _clock) = orchestrator_for(base);

    let err = orch
        .get_market_snapshot(&SymbolSet::new(["ETHUSDT"]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FetchError::Transient(UpstreamError::Status { status: 500, .. })
    ));
    assert_eq!(orch.guard_status().await.violation_count, 0);
}
