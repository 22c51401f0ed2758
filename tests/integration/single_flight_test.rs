//! Single-flight behaviour under concurrent load

use crate::common::{btc, orchestrator, wait_idle, GatedSource};
use std::sync::Arc;
use std::time::Duration;
use tickguard::upstream::SymbolSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_upstream_call() {
    let source = GatedSource::new();
    let (orch, _clock) = orchestrator(source.clone());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let orch = orch.clone();
        handles.push(tokio::spawn(
            async move { orch.get_market_snapshot(&btc()).await },
        ));
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.calls(), 1);
    source.release();

    let mut snapshots = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert!(outcome.is_fresh());
        snapshots.push(outcome.snapshot().unwrap().clone());
    }

    assert_eq!(source.calls(), 1);
    assert!(snapshots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(orch.in_flight().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_distinct_keys_fetch_independently() {
    let source = GatedSource::new();
    let (orch, _clock) = orchestrator(source.clone());

    let a = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.get_market_snapshot(&SymbolSet::new(["BTCUSDT"])).await })
    };
    let b = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.get_market_snapshot(&SymbolSet::new(["ETHUSDT"])).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(orch.in_flight().await, 2);
    source.release();

    assert!(a.await.unwrap().unwrap().is_fresh());
    assert!(b.await.unwrap().unwrap().is_fresh());
    assert_eq!(source.calls(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abandoned_fetch_still_fills_cache() {
    let source = GatedSource::new();
    let (orch, _clock) = orchestrator(source.clone());

    let caller = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.get_market_snapshot(&btc()).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    caller.abort();

    source.release();
    wait_idle(&orch).await;

    let outcome = orch.get_market_snapshot(&btc()).await.unwrap();
    assert!(outcome.is_fresh());
    assert_eq!(source.calls(), 1);
    assert_eq!(orch.cache_stats().await.entries, 1);
}
