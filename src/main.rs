use clap::Parser;
use std::path::Path;
use tickguard::cli::{Cli, Commands};
use tickguard::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // A missing file means defaults; a broken one is fatal
    let config = if Path::new(&cli.config).exists() {
        Config::load(&cli.config)?
    } else {
        eprintln!("Config {} not found, using defaults", cli.config);
        let config = Config::default();
        config.validate()?;
        config
    };

    let _telemetry = tickguard::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Snapshot(args) => {
            tracing::info!("Starting snapshot requests");
            args.execute(&config).await?;
        }
        Commands::Score(args) => {
            tracing::info!("Starting scoring batch");
            args.execute(&config).await?;
        }
        Commands::Config => {
            println!("Current configuration:");
            println!(
                "  Upstream: {}{} (timeout {}s, class {})",
                config.upstream.base_url,
                config.upstream.ticker_path,
                config.upstream.timeout_secs,
                config.upstream.resource_class
            );
            println!(
                "  Cache: ttl={}s, max_entries={}",
                config.cache.ttl_secs, config.cache.max_entries
            );
            println!(
                "  Guard: cooldown={}s, escalation>{} -> {}s, auto_recover={}",
                config.guard.cooldown_secs,
                config.guard.escalation_threshold,
                config.guard.escalated_cooldown_secs,
                config.guard.auto_recover
            );
            let pool = config.pool();
            println!(
                "  Scoring: workers={}, vector_length={}, frequency={}, weights={:?}",
                pool.workers,
                config.scoring.vector_length,
                config.scoring.frequency_param,
                config.scoring.weights()
            );
        }
    }

    Ok(())
}
