use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Row, params};
use tracing::error;

use super::models::{HttpMethod, Monitor, MonitorStatus};
use crate::monitoring::validation::validate_monitor_url;
use crate::pool::{LibsqlManager, LibsqlPool};

/// Read side of the monitor registry
#[async_trait]
pub trait MonitorRegistry: Send + Sync {
    /// Enabled monitors never checked or last checked at or before `cutoff`
    async fn due_monitors(&self, cutoff: DateTime<Utc>) -> Result<Vec<Monitor>>;

    /// Release the underlying connections. Called once on shutdown.
    async fn close(&self) {}
}

/// LibSQL-backed registry
pub struct DatabaseImpl {
    pool: LibsqlPool,
    default_timeout: Duration,
}

impl DatabaseImpl {
    /// Create a registry from a pool. Rows without a usable timeout get
    /// `default_timeout`.
    pub fn new_from_pool(pool: LibsqlPool, default_timeout: Duration) -> Self {
        Self { pool, default_timeout }
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>> {
        Ok(self.pool.get().await?)
    }

    fn monitor_from_row(&self, row: &Row) -> Result<Monitor> {
        let id: String = row.get(0)?;
        let url: String = row.get(3)?;
        let method: String = row.get(4)?;
        let timeout_seconds: Option<i64> = row.get(6)?;
        let status: String = row.get(8)?;
        let last_checked: Option<i64> = row.get(9)?;

        let timeout = match timeout_seconds {
            Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
            _ => self.default_timeout,
        };

        Ok(Monitor {
            url: validate_monitor_url(&url)?,
            method: method.parse::<HttpMethod>().map_err(|e| anyhow!(e))?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            interval: Duration::from_secs(row.get::<i64>(5)?.max(0) as u64),
            timeout,
            enabled: row.get::<i64>(7)? != 0,
            current_status: status.parse::<MonitorStatus>().unwrap_or(MonitorStatus::Unknown),
            last_checked: last_checked.and_then(Monitor::i64_to_timestamp),
            id,
        })
    }
}

#[async_trait]
impl MonitorRegistry for DatabaseImpl {
    async fn due_monitors(&self, cutoff: DateTime<Utc>) -> Result<Vec<Monitor>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, user_id, name, url, method, interval_seconds, timeout_seconds, enabled, current_status, last_checked FROM monitors WHERE enabled = 1 AND (last_checked IS NULL OR last_checked <= ?)",
                params![Monitor::timestamp_to_i64(cutoff)],
            )
            .await
            .context("Due monitor query failed")?;

        let mut monitors = Vec::new();

        while let Some(row) = rows.next().await? {
            // A malformed row must not hide the rest of the due set
            match self.monitor_from_row(&row) {
                Ok(monitor) => monitors.push(monitor),
                Err(e) => {
                    let id = row.get::<String>(0).unwrap_or_default();
                    error!(monitor_id = %id, "Skipping invalid monitor row: {e:#}");
                }
            }
        }

        Ok(monitors)
    }

    async fn close(&self) {
        self.pool.close();
    }
}
