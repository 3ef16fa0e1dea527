//! HTTP monitor polling worker.
//!
//! Periodically selects due monitors from the registry, probes them with
//! bounded concurrency, and reports each classified result to the
//! ingestion backend.

pub mod config;
pub mod database;
pub mod monitoring;
pub mod orchestrator;
pub mod pool;

#[cfg(test)]
mod test_support;

pub use config::{Config, ConfigError};
pub use monitoring::{CycleStats, SchedulerError, SchedulerHandle, SchedulerStats};
pub use orchestrator::Orchestrator;
