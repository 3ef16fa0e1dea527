/// Monitor registry access
///
/// The registry is a libsql database (local file or remote) read through a
/// deadpool-managed connection pool. The worker only ever reads monitors;
/// status changes flow to the ingestion backend as check results.

pub mod migrations;
pub mod models;
pub mod repository;

pub use models::{HttpMethod, Monitor, MonitorStatus};
pub use repository::{DatabaseImpl, MonitorRegistry};

use anyhow::Result;

/// Initialize the registry schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
