use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{error, info};

use crate::database::{Monitor, MonitorRegistry};

/// Resolves the set of monitors due for a check this cycle.
///
/// Every monitor shares the global check interval; the per-monitor
/// interval stored in the registry does not affect selection.
pub struct DueSetResolver {
    registry: Arc<dyn MonitorRegistry>,
    interval: TimeDelta,
}

impl DueSetResolver {
    pub fn new(registry: Arc<dyn MonitorRegistry>, interval: Duration) -> Self {
        let interval = TimeDelta::from_std(interval).unwrap_or(TimeDelta::MAX);
        Self { registry, interval }
    }

    /// Monitors last checked at or before this instant are due
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.interval).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Fetch due monitors. A registry failure means nothing is due.
    pub async fn fetch_due(&self) -> Vec<Monitor> {
        let cutoff = self.cutoff(Utc::now());

        match self.registry.due_monitors(cutoff).await {
            Ok(monitors) => {
                info!("Found {} active monitors to check", monitors.len());
                monitors
            }
            Err(e) => {
                error!("Error fetching monitors from registry: {e:#}");
                Vec::new()
            }
        }
    }

    pub async fn close(&self) {
        self.registry.close().await;
    }
}
