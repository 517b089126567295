//! Test support utilities

use std::time::Duration;

use crate::connection::DatabaseConnection;

/// Fresh in-memory SQLite database with all migrations applied
pub async fn connect_memory() -> DatabaseConnection {
    let conn = DatabaseConnection::new("sqlite::memory:", 5, Duration::from_secs(5))
        .await
        .expect("in-memory database");
    conn.migrate().await.expect("migrations");
    conn
}
