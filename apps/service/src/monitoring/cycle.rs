use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use super::checker::Checker;
use super::due::DueSetResolver;
use super::reporter::Reporter;

/// Outcome counts for one cycle.
///
/// Counts track delivery to the ingestion backend, not monitor health: a
/// down result that was reported counts as delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Runs polling cycles: resolve due monitors, probe and report each one
/// with bounded concurrency.
pub struct CycleCoordinator {
    resolver: DueSetResolver,
    checker: Arc<dyn Checker>,
    reporter: Arc<dyn Reporter>,
    /// Worker slots, shared by overlapping cycles
    permits: Arc<Semaphore>,
    pool_size: usize,
}

impl CycleCoordinator {
    pub fn new(
        resolver: DueSetResolver,
        checker: Arc<dyn Checker>,
        reporter: Arc<dyn Reporter>,
        pool_size: usize,
    ) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            resolver,
            checker,
            reporter,
            permits: Arc::new(Semaphore::new(pool_size)),
            pool_size,
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn resolver(&self) -> &DueSetResolver {
        &self.resolver
    }

    /// Run one full cycle. Returns once every dispatched probe and report
    /// has finished.
    pub async fn run_cycle(&self) -> CycleStats {
        info!("Starting health check cycle...");

        let monitors = self.resolver.fetch_due().await;
        if monitors.is_empty() {
            info!("No monitors to check");
            return CycleStats::default();
        }

        let mut tasks = JoinSet::new();
        for monitor in monitors {
            let checker = Arc::clone(&self.checker);
            let reporter = Arc::clone(&self.reporter);
            let permits = Arc::clone(&self.permits);

            tasks.spawn(async move {
                // The semaphore is never closed, so this only fails if that changes
                let Ok(_permit) = permits.acquire_owned().await else {
                    error!(monitor_id = %monitor.id, "Worker pool closed, skipping check");
                    return false;
                };

                let result = checker.check(&monitor).await;
                reporter.report(&result).await
            });
        }

        let mut stats = CycleStats { attempted: tasks.len(), ..CycleStats::default() };

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => stats.delivered += 1,
                Ok(false) => stats.failed += 1,
                Err(e) => {
                    error!("Error in monitor check: {}", e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Health check cycle complete: {} successful, {} failed",
            stats.delivered, stats.failed
        );

        stats
    }

    /// Release the registry connections
    pub async fn close(&self) {
        self.resolver.close().await;
    }
}
