//! Configuration loading tests

use tickguard::config::Config;
use tickguard::guard::GuardPolicy;
use tickguard::scoring::Weights;

#[test]
fn test_example_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = tokio_test::assert_ok!(Config::load(path));

    assert_eq!(config.cache.ttl_secs, 30);
    assert_eq!(config.cache.max_entries, 500);
    assert_eq!(config.scoring.weights(), Weights::default());
    assert_eq!(config.orchestrator().unwrap().guard, GuardPolicy::default());
    assert!(config.scoring.workers.is_none());
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = Config::from_toml(
        r#"
        [cache]
        ttl_secs = 5
        "#,
    )
    .unwrap();

    assert_eq!(config.cache.ttl_secs, 5);
    assert_eq!(config.guard.cooldown_secs, 1800);
    assert!(config.pool().workers >= 2);
}
