//! Snapshot command implementation

use crate::clock::SystemClock;
use crate::config::Config;
use crate::orchestrator::{SnapshotOrchestrator, SnapshotOutcome};
use crate::upstream::{BinanceFuturesClient, SymbolSet};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Comma-separated symbols; all symbols when omitted
    #[arg(short, long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Number of consecutive requests
    #[arg(short, long, default_value_t = 1)]
    pub repeat: u32,

    /// Pause between requests (milliseconds)
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,
}

impl SnapshotArgs {
    /// Requested symbols as a normalized set
    pub fn symbol_set(&self) -> SymbolSet {
        SymbolSet::new(&self.symbols)
    }

    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let client = BinanceFuturesClient::with_config(config.binance())?;
        let orchestrator = SnapshotOrchestrator::new(
            Arc::new(client),
            config.orchestrator()?,
            Arc::new(SystemClock),
        );
        let symbols = self.symbol_set();

        tracing::info!(symbols = %symbols, repeat = self.repeat, "Fetching snapshots");

        for i in 0..self.repeat {
            if i > 0 {
                tokio::time::sleep(Duration::from_millis(self.interval_ms)).await;
            }

            match orchestrator.get_market_snapshot(&symbols).await {
                Ok(outcome) => print_outcome(i + 1, &outcome),
                Err(e) => {
                    tracing::warn!(error = %e, "Snapshot request failed");
                    println!("#{} error: {}", i + 1, e);
                }
            }
        }

        let status = orchestrator.guard_status().await;
        let stats = orchestrator.cache_stats().await;
        println!("Guard: {}", serde_json::to_string(&status)?);
        println!("Cache: {}", serde_json::to_string(&stats)?);
        Ok(())
    }
}

fn print_outcome(n: u32, outcome: &SnapshotOutcome) {
    match outcome.snapshot() {
        Some(snapshot) => {
            println!(
                "#{} {} ({} tickers, fetched {})",
                n,
                outcome.label(),
                snapshot.len(),
                snapshot.fetched_at
            );
            for t in snapshot.tickers.iter().take(10) {
                println!(
                    "  {:<14} {:>14} {:>8}%",
                    t.symbol, t.last_price, t.price_change_percent
                );
            }
        }
        None => println!("#{} {}", n, outcome.label()),
    }
}
