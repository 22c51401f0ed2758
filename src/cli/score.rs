//! Score command implementation

use super::parse_signal;
use crate::config::Config;
use crate::scoring::{ScoreRequest, ScoringPool, Weights};
use clap::Args;

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Comma-separated symbols to score
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    /// AI signal per symbol (SYMBOL=value, repeatable)
    #[arg(long, value_parser = parse_signal)]
    pub ai: Vec<(String, f64)>,

    /// Secondary-strategy signal per symbol (SYMBOL=value, repeatable)
    #[arg(long, value_parser = parse_signal)]
    pub vigo: Vec<(String, f64)>,

    /// Ignore the external signals and use the core score only
    #[arg(long)]
    pub core_only: bool,
}

impl ScoreArgs {
    /// Build the batch request from arguments and configuration
    pub fn request(&self, config: &Config) -> ScoreRequest {
        let weights = if self.core_only {
            Weights::core_only()
        } else {
            config.scoring.weights()
        };
        let symbols = self.symbols.iter().map(|s| s.trim().to_uppercase());

        ScoreRequest::new(symbols)
            .with_weights(weights)
            .with_ai_scores(self.ai.iter().cloned().collect())
            .with_vigo_scores(self.vigo.iter().cloned().collect())
            .with_frequency_param(config.scoring.frequency_param)
            .with_vector_length(config.scoring.vector_length)
    }

    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let pool = ScoringPool::new(config.pool());
        tracing::info!(
            symbols = self.symbols.len(),
            workers = pool.workers(),
            "Scoring batch"
        );

        let report = pool.score(self.request(config)).await?;
        pool.shutdown().await;

        println!("Batch {}", report.batch_id);
        for r in &report.results {
            let marker = if report.failed_symbols.contains(&r.symbol) {
                " (neutral)"
            } else {
                ""
            };
            println!("  {:<14} {:.6}{}", r.symbol, r.score, marker);
        }
        if report.failures() > 0 {
            tracing::warn!(failed = report.failures(), "Some symbols fell back to neutral");
        }
        Ok(())
    }
}
