/// Orchestrator module - wires the worker together
///
/// The orchestrator owns startup: it validates configuration, connects to
/// the registry (failing fast when it is unreachable), builds the shared
/// HTTP client and assembles the cycle coordinator that the scheduler
/// drives.


use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::database::{DatabaseImpl, initialize_database};
use crate::monitoring::{
    CycleCoordinator, CycleStats, DueSetResolver, HttpChecker, HttpReporter, Scheduler,
    SchedulerHandle, build_http_client,
};
use crate::pool;

/// Main orchestrator for the worker service
pub struct Orchestrator {
    config: Arc<Config>,
    coordinator: Arc<CycleCoordinator>,
}

impl Orchestrator {
    /// Build every shared resource. Any failure here is fatal for startup.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        info!("Starting Health Monitor Worker Service...");
        info!("Registry: {}", config.registry.url);
        info!("Backend URL: {}", config.ingestion.backend_url);
        info!("Check Interval: {} seconds", config.scheduler.check_interval_seconds);

        let pool = pool::connect(
            &config.registry.url,
            config.registry.auth_token.as_deref(),
            config.registry.pool_size,
        )
        .await?;

        {
            let conn = pool.get().await.context("Registry is unreachable")?;
            info!("Initializing registry schema...");
            initialize_database(&conn).await?;
        }

        let registry = Arc::new(DatabaseImpl::new_from_pool(pool, config.default_timeout()));

        let client = build_http_client(config.default_timeout())
            .context("Failed to build HTTP client")?;
        let checker = Arc::new(HttpChecker::new(client.clone()));
        let reporter =
            Arc::new(HttpReporter::new(client, config.report_endpoint()?, config.report_timeout()));

        let coordinator = Arc::new(CycleCoordinator::new(
            DueSetResolver::new(registry, config.check_interval()),
            checker,
            reporter,
            config.scheduler.max_workers,
        ));

        Ok(Self { config, coordinator })
    }

    /// Start the scheduler. The first cycle runs before this returns.
    pub async fn start(self) -> SchedulerHandle {
        Scheduler::new(self.coordinator, self.config.check_interval()).start().await
    }

    /// Run a single cycle and release resources, for one-shot runs
    pub async fn run_once(self) -> CycleStats {
        let stats = self.coordinator.run_cycle().await;
        self.coordinator.close().await;
        stats
    }
}
