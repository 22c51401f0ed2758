//! Rate-limit backoff through the orchestrator

use crate::common::{btc, orchestrator, ScriptedSource};
use chrono::Duration;
use rust_decimal::Decimal;
use tickguard::guard::GuardState;
use tickguard::upstream::UpstreamError;

fn limited() -> Result<i64, UpstreamError> {
    Err(UpstreamError::RateLimited { status: 429 })
}

#[tokio::test]
async fn test_three_violations_cool_and_serve_stale_without_io() {
    let source = ScriptedSource::new(vec![Ok(45000), limited(), limited(), limited()]);
    let (orch, clock) = orchestrator(source.clone());

    assert!(orch.get_market_snapshot(&btc()).await.unwrap().is_fresh());

    // Each violation lands once the previous cooldown has run out
    for expected in 1..=3u32 {
        clock.advance(Duration::minutes(31));
        let outcome = orch.get_market_snapshot(&btc()).await.unwrap();
        assert!(outcome.is_stale());
        assert_eq!(orch.guard_status().await.violation_count, expected);
    }
    assert_eq!(source.calls(), 4);

    let status = orch.guard_status().await;
    assert_eq!(status.state, GuardState::Cooling);

    clock.advance(Duration::minutes(5));
    let outcome = orch.get_market_snapshot(&btc()).await.unwrap();
    assert!(outcome.is_stale());
    assert_eq!(
        outcome.snapshot().unwrap().tickers[0].last_price,
        Decimal::from(45000)
    );
    assert_eq!(source.calls(), 4);
}

#[tokio::test]
async fn test_operator_reset_resumes_fetching() {
    let source = ScriptedSource::new(vec![limited(), Ok(50000)]);
    let (orch, _clock) = orchestrator(source.clone());

    assert!(orch.get_market_snapshot(&btc()).await.unwrap().is_empty());
    assert!(orch.get_market_snapshot(&btc()).await.unwrap().is_empty());
    assert_eq!(source.calls(), 1);

    orch.reset_guard().await;
    assert_eq!(orch.guard_status().await.state, GuardState::Normal);

    let outcome = orch.get_market_snapshot(&btc()).await.unwrap();
    assert!(outcome.is_fresh());
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn test_transient_errors_do_not_cool() {
    let source = ScriptedSource::new(vec![Err(UpstreamError::Timeout), Ok(1)]);
    let (orch, _clock) = orchestrator(source.clone());

    let err = orch.get_market_snapshot(&btc()).await.unwrap_err();
    assert!(err.is_retryable());

    let outcome = tokio_test::assert_ok!(orch.get_market_snapshot(&btc()).await);
    assert!(outcome.is_fresh());
    assert_eq!(orch.guard_status().await.state, GuardState::Normal);
}
