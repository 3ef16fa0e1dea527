use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use pulse_worker::{Config, Orchestrator};

/// Health monitor worker: probes due monitors and reports the results
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the config file (defaults to ~/.config/pulse/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single check cycle, print its stats and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    logger::init_tracing_with_level(&config.logging.level);
    info!("{}", config);

    let orchestrator = Orchestrator::new(config).await?;

    if cli.once {
        let stats = orchestrator.run_once().await;
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    let scheduler = orchestrator.start().await;
    info!("Worker service started successfully");

    tokio::signal::ctrl_c().await?;

    info!("Shutting down Health Monitor Worker Service...");
    scheduler.stop().await?;
    info!("Worker service stopped");

    Ok(())
}
