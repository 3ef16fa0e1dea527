use anyhow::{Context, Result};
use deadpool::managed::{self, Pool, RecycleResult};
use libsql::{Builder, Connection, Database, Error as LibsqlError};

/// deadpool manager handing out libsql connections to the registry
pub struct LibsqlManager {
    database: Database,
}

impl LibsqlManager {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.database.connect()
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> RecycleResult<Self::Error> {
        // Liveness probe, a dropped remote session fails here and gets replaced
        conn.query("SELECT 1", ()).await?.next().await?;
        Ok(())
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;

/// Open the registry database and wrap it in a connection pool.
///
/// `libsql://`, `http://` and `https://` URLs are opened as remote
/// databases, anything else is treated as a local file path.
pub async fn connect(url: &str, auth_token: Option<&str>, max_size: usize) -> Result<LibsqlPool> {
    let database = if is_remote(url) {
        Builder::new_remote(url.to_string(), auth_token.unwrap_or_default().to_string())
            .build()
            .await
            .with_context(|| format!("Failed to open remote registry {url}"))?
    } else {
        Builder::new_local(url)
            .build()
            .await
            .with_context(|| format!("Failed to open registry database {url}"))?
    };

    let pool = Pool::builder(LibsqlManager::new(database))
        .max_size(max_size.max(1))
        .build()
        .context("Failed to build registry connection pool")?;

    Ok(pool)
}

fn is_remote(url: &str) -> bool {
    ["libsql://", "http://", "https://"].iter().any(|scheme| url.starts_with(scheme))
}
