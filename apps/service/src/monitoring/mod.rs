pub mod checker;
/// Monitoring engine module - the polling core
///
/// This module is responsible for:
/// - Probing monitors over HTTP and classifying the outcome
/// - Reporting results to the ingestion backend
/// - Resolving which monitors are due
/// - Running bounded-concurrency cycles on a fixed schedule
pub mod cycle;
pub mod due;
pub mod reporter;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use checker::{Checker, HttpChecker, build_http_client};
pub use cycle::{CycleCoordinator, CycleStats};
pub use due::DueSetResolver;
pub use reporter::{HttpReporter, Reporter};
pub use scheduler::{Scheduler, SchedulerError, SchedulerHandle, SchedulerStats};
pub use types::{CheckResult, ProbeFailure, ProbeStatus};
