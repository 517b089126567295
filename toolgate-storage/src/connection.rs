//! Database connection wrapper

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection as SeaConnection};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};
use crate::migrations::Migrator;

/// Database connection wrapper
#[derive(Clone)]
pub struct DatabaseConnection {
    connection: SeaConnection,
    url: String,
}

impl DatabaseConnection {
    /// Connect using the given URL and pool settings
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> StorageResult<Self> {
        info!("Connecting to database: {}", url);

        Self::ensure_sqlite_file_exists(url)?;

        let mut opts = ConnectOptions::new(url);
        opts.max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(connect_timeout)
            .acquire_timeout(connect_timeout)
            .idle_timeout(Duration::from_secs(300))
            .sqlx_logging(false);

        let connection = Database::connect(opts).await?;

        debug!(
            "Database connection established with {} max connections",
            max_connections
        );

        Ok(Self {
            connection,
            url: url.to_string(),
        })
    }

    /// Run all pending migrations
    pub async fn migrate(&self) -> StorageResult<()> {
        Migrator::up(&self.connection, None)
            .await
            .map_err(|e| StorageError::Migration(e.to_string()))
    }

    /// Get the underlying sea-orm connection
    pub fn get_connection(&self) -> &SeaConnection {
        &self.connection
    }

    fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    /// Close the pool. SQLite first gets a best-effort WAL checkpoint
    /// bounded at 500 ms; the close itself is bounded at 1 s.
    pub async fn shutdown(self) {
        if self.is_sqlite() {
            let checkpoint = self
                .connection
                .execute_unprepared("PRAGMA wal_checkpoint(PASSIVE)");
            if tokio::time::timeout(Duration::from_millis(500), checkpoint)
                .await
                .is_err()
            {
                warn!("WAL checkpoint timed out before shutdown");
            }
        }
        match tokio::time::timeout(Duration::from_secs(1), self.connection.close()).await {
            Ok(Ok(())) => debug!("database pool closed"),
            Ok(Err(e)) => warn!("error closing database pool: {}", e),
            Err(_) => warn!("database pool close timed out"),
        }
    }

    /// Ensure the SQLite database directory exists for file-based URLs
    fn ensure_sqlite_file_exists(url: &str) -> StorageResult<()> {
        if !url.starts_with("sqlite:") || url.contains(":memory:") {
            return Ok(());
        }
        let path = url
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Config(format!("cannot create {:?}: {}", parent, e)))?;
            }
        }
        Ok(())
    }
}
