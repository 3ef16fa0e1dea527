#![warn(clippy::all, clippy::pedantic)]

use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::{App, HttpServer, web};
use clap::Parser;
use tracing::{info, warn};

mod error;
mod routes;

use error::AppError;
use logger::init_tracing_with_level;
use pulse_worker::{Config, Orchestrator, SchedulerHandle};

/// Health monitor worker with its HTTP control surface
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Path to the config file (defaults to ~/.config/pulse/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    init_tracing_with_level(&config.logging.level);
    info!("{config}");

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    let scheduler = web::Data::new(Orchestrator::new(config).await?.start().await);
    info!("Worker service started successfully");

    let served = run_server(addr, scheduler.clone()).await;

    info!("Shutting down Health Monitor Worker Service...");
    if let Err(e) = scheduler.stop().await {
        warn!("Scheduler shutdown skipped: {e}");
    }
    info!("Worker service stopped");

    served
}

async fn run_server(addr: SocketAddr, scheduler: web::Data<SchedulerHandle>) -> Result<(), AppError> {
    info!("Control surface listening on {addr}");

    HttpServer::new(move || App::new().app_data(scheduler.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await?;

    Ok(())
}
