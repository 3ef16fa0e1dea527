use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info};

use super::cycle::{CycleCoordinator, CycleStats};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("Scheduler is not running")]
    NotRunning,

    #[error("Scheduler stopped before the triggered cycle finished")]
    Interrupted,
}

/// Snapshot exposed to the control surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub active_monitors: usize,
    pub check_interval: u64,
    pub max_workers: usize,
    pub scheduler_running: bool,
}

type TriggerReply = oneshot::Sender<CycleStats>;

/// Drives cycles on a fixed interval
pub struct Scheduler {
    coordinator: Arc<CycleCoordinator>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(coordinator: Arc<CycleCoordinator>, interval: Duration) -> Self {
        // tokio intervals panic on a zero period
        let interval = interval.max(Duration::from_millis(1));
        Self { coordinator, interval }
    }

    /// Run the first cycle inline, then start the periodic loop.
    ///
    /// Ticks are anchored to the moment `start` was called, so the first
    /// cycle's duration does not shift the schedule.
    pub async fn start(self) -> SchedulerHandle {
        let started_at = Instant::now();

        info!("Running initial health check...");
        self.coordinator.run_cycle().await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (trigger_tx, trigger_rx) = mpsc::channel::<TriggerReply>(16);

        let task = tokio::spawn(run_loop(
            Arc::clone(&self.coordinator),
            started_at + self.interval,
            self.interval,
            trigger_rx,
            shutdown_rx,
        ));

        info!("Scheduler started - checking every {} seconds", self.interval.as_secs());

        SchedulerHandle {
            coordinator: self.coordinator,
            interval: self.interval,
            running: AtomicBool::new(true),
            shutdown_tx,
            trigger_tx,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Owned handle to a running scheduler
pub struct SchedulerHandle {
    coordinator: Arc<CycleCoordinator>,
    interval: Duration,
    running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    trigger_tx: mpsc::Sender<TriggerReply>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run an out-of-band cycle and wait for its stats. The periodic
    /// schedule is unaffected.
    pub async fn trigger(&self) -> Result<CycleStats, SchedulerError> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Manual health check triggered");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.trigger_tx.send(reply_tx).await.map_err(|_| SchedulerError::NotRunning)?;
        reply_rx.await.map_err(|_| SchedulerError::Interrupted)
    }

    pub async fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            active_monitors: self.coordinator.resolver().fetch_due().await.len(),
            check_interval: self.interval.as_secs(),
            max_workers: self.coordinator.pool_size(),
            scheduler_running: self.is_running(),
        }
    }

    /// Stop ticking, wait for in-flight cycles, then release the registry.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let task = self.task.lock().await.take().ok_or(SchedulerError::NotRunning)?;

        info!("Stopping scheduler...");
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(true);

        if let Err(e) = task.await {
            error!("Scheduler loop ended abnormally: {}", e);
        }

        self.coordinator.close().await;
        info!("Scheduler stopped");
        Ok(())
    }
}

async fn run_loop(
    coordinator: Arc<CycleCoordinator>,
    first_tick: Instant,
    period: Duration,
    mut triggers: mpsc::Receiver<TriggerReply>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(first_tick, period);
    // One catch-up tick after an overrun, then back on the start-anchored grid
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut cycles = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = shutdown.changed() => break,
            _ = ticker.tick() => {
                let coordinator = Arc::clone(&coordinator);
                cycles.spawn(async move {
                    coordinator.run_cycle().await;
                });
            }
            Some(reply) = triggers.recv() => {
                let coordinator = Arc::clone(&coordinator);
                cycles.spawn(async move {
                    let stats = coordinator.run_cycle().await;
                    let _ = reply.send(stats);
                });
            }
            Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                if let Err(e) = joined {
                    error!("Check cycle task failed: {}", e);
                }
            }
        }
    }

    debug!(in_flight = cycles.len(), "Draining in-flight cycles");
    while let Some(joined) = cycles.join_next().await {
        if let Err(e) = joined {
            error!("Check cycle task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::cycle::tests::{FixedRegistry, RecordingReporter, SlowChecker};
    use crate::monitoring::due::DueSetResolver;

    fn coordinator(
        registry: Arc<FixedRegistry>,
        checker: Arc<SlowChecker>,
        reporter: Arc<RecordingReporter>,
    ) -> Arc<CycleCoordinator> {
        Arc::new(CycleCoordinator::new(
            DueSetResolver::new(registry, Duration::from_secs(30)),
            checker,
            reporter,
            2,
        ))
    }

    #[tokio::test]
    async fn test_start_runs_first_cycle_immediately() {
        let registry = Arc::new(FixedRegistry::with(&["a"]));
        let reporter = Arc::new(RecordingReporter::default());
        let checker = Arc::new(SlowChecker::new(Duration::ZERO));
        let scheduler =
            Scheduler::new(coordinator(registry.clone(), checker, reporter.clone()), Duration::from_secs(3600));

        let handle = scheduler.start().await;

        assert!(handle.is_running());
        assert_eq!(reporter.reported_ids(), vec!["a"]);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_periodic_ticks() {
        let registry = Arc::new(FixedRegistry::with(&["a"]));
        let reporter = Arc::new(RecordingReporter::default());
        let checker = Arc::new(SlowChecker::new(Duration::ZERO));
        let scheduler =
            Scheduler::new(coordinator(registry.clone(), checker, reporter), Duration::from_millis(50));

        let handle = scheduler.start().await;
        tokio::time::sleep(Duration::from_millis(275)).await;
        handle.stop().await.unwrap();

        // Initial cycle plus roughly five ticks
        let queries = registry.queries.load(Ordering::SeqCst);
        assert!(queries >= 4, "only {queries} cycles ran");
    }

    #[tokio::test]
    async fn test_slow_first_cycle_gets_single_catch_up() {
        let registry = Arc::new(FixedRegistry::with(&["a"]));
        let reporter = Arc::new(RecordingReporter::default());
        // First cycle spans three and a half intervals
        let checker = Arc::new(SlowChecker::new(Duration::from_millis(700)));
        let handle =
            Scheduler::new(coordinator(registry.clone(), checker, reporter), Duration::from_millis(200))
                .start()
                .await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        // Inline cycle plus exactly one catch-up, not one per missed tick
        assert_eq!(registry.queries.load(Ordering::SeqCst), 2);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_trigger_returns_cycle_stats() {
        let registry = Arc::new(FixedRegistry::with(&["a", "b", "c"]));
        let reporter = Arc::new(RecordingReporter::rejecting(&["c"]));
        let checker = Arc::new(SlowChecker::new(Duration::from_millis(5)));
        let handle = Scheduler::new(coordinator(registry.clone(), checker, reporter), Duration::from_secs(3600))
            .start()
            .await;

        let stats = handle.trigger().await.unwrap();

        assert_eq!(stats, CycleStats { attempted: 3, delivered: 2, failed: 1 });
        assert_eq!(registry.queries.load(Ordering::SeqCst), 2);
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_drains_in_flight_work() {
        let registry = Arc::new(FixedRegistry::with(&["a", "b"]));
        let reporter = Arc::new(RecordingReporter::default());
        let checker = Arc::new(SlowChecker::new(Duration::from_millis(100)));
        let handle = Arc::new(
            Scheduler::new(coordinator(registry, checker.clone(), reporter.clone()), Duration::from_secs(3600))
                .start()
                .await,
        );

        let trigger = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move { handle.trigger().await })
        };
        // Let the triggered cycle get going before stopping
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.stop().await.unwrap();

        // Initial cycle and the triggered one both reported everything
        assert_eq!(checker.checked.load(Ordering::SeqCst), 4);
        assert_eq!(reporter.reported_ids().len(), 4);
        assert_eq!(trigger.await.unwrap().unwrap().delivered, 2);
    }

    #[tokio::test]
    async fn test_stop_is_once_and_disables_trigger() {
        let registry = Arc::new(FixedRegistry::with(&[]));
        let handle = Scheduler::new(
            coordinator(
                registry,
                Arc::new(SlowChecker::new(Duration::ZERO)),
                Arc::new(RecordingReporter::default()),
            ),
            Duration::from_secs(3600),
        )
        .start()
        .await;

        assert_eq!(handle.stop().await, Ok(()));
        assert!(!handle.is_running());
        assert_eq!(handle.stop().await, Err(SchedulerError::NotRunning));
        assert_eq!(handle.trigger().await, Err(SchedulerError::NotRunning));
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let registry = Arc::new(FixedRegistry::with(&["a", "b"]));
        let handle = Scheduler::new(
            coordinator(
                registry,
                Arc::new(SlowChecker::new(Duration::ZERO)),
                Arc::new(RecordingReporter::default()),
            ),
            Duration::from_secs(30),
        )
        .start()
        .await;

        let stats = handle.stats().await;
        assert_eq!(
            stats,
            SchedulerStats {
                active_monitors: 2,
                check_interval: 30,
                max_workers: 2,
                scheduler_running: true,
            }
        );
        handle.stop().await.unwrap();
    }
}
