//! CLI interface for tickguard
//!
//! Provides subcommands for:
//! - `snapshot`: Fetch market snapshots through the cache and guard
//! - `score`: Score a symbol batch on the worker pool
//! - `config`: Show the effective configuration

mod score;
mod snapshot;

pub use score::ScoreArgs;
pub use snapshot::SnapshotArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tickguard")]
#[command(about = "Rate-limit aware market-data cache and parallel symbol scoring")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch market snapshots
    Snapshot(SnapshotArgs),
    /// Score a batch of symbols
    Score(ScoreArgs),
    /// Show the effective configuration
    Config,
}

/// Parse a `SYMBOL=value` pair
pub fn parse_signal(s: &str) -> Result<(String, f64), String> {
    let (symbol, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected SYMBOL=value, got `{}`", s))?;
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(format!("missing symbol in `{}`", s));
    }
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value in `{}`: {}", s, e))?;
    Ok((symbol, value))
}
