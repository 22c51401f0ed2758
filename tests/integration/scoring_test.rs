//! Scoring pool integration tests

use std::collections::HashMap;
use tickguard::scoring::{score_symbol, PoolConfig, ScoreRequest, ScoringPool, Weights};

fn pool(workers: usize) -> ScoringPool {
    ScoringPool::new(PoolConfig {
        workers,
        ..Default::default()
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_core_only_batch_is_bounded_and_repeatable() {
    let pool = pool(2);
    let request = ScoreRequest::new(["BTC", "ETH"]).with_weights(Weights::core_only());

    let first = pool.score(request.clone()).await.unwrap();
    let second = pool.score(request).await.unwrap();

    assert_eq!(first.results.len(), 2);
    for r in &first.results {
        assert!((0.0..=1.0).contains(&r.score), "{} = {}", r.symbol, r.score);
    }
    for (a, b) in first.results.iter().zip(&second.results) {
        assert_eq!(a.symbol, b.symbol);
        assert_eq!(a.score.to_bits(), b.score.to_bits());
    }
    assert_ne!(first.batch_id, second.batch_id);

    pool.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_matches_single_threaded_engine() {
    let symbols: Vec<String> = (0..50).map(|i| format!("SYM{}USDT", i)).collect();
    let ai: HashMap<String, f64> = symbols
        .iter()
        .enumerate()
        .map(|(i, s)| (s.clone(), (i % 10) as f64 / 10.0))
        .collect();
    let request = ScoreRequest::new(symbols.clone()).with_ai_scores(ai);

    let report = pool(4).score(request.clone()).await.unwrap();

    assert_eq!(report.failures(), 0);
    for (symbol, result) in symbols.iter().zip(&report.results) {
        assert_eq!(&result.symbol, symbol);
        assert_eq!(result.score, score_symbol(symbol, &request).unwrap());
    }
}

#[tokio::test]
async fn test_bad_symbol_does_not_sink_batch() {
    let mut vigo = HashMap::new();
    vigo.insert("ETH".to_string(), f64::INFINITY);
    let request = ScoreRequest::new(["BTC", "ETH", "SOL"]).with_vigo_scores(vigo);

    let report = pool(2).score(request).await.unwrap();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.score("ETH"), Some(0.5));
    assert_eq!(report.failed_symbols, vec!["ETH"]);
    assert!(report.score("BTC").is_some());
}
