use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub type DbPool = sqlx::SqlitePool;

/// Pool sizing and SQLite busy handling for one engine database.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionSettings {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub busy_timeout_ms: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self { max_connections: 5, acquire_timeout_secs: 30, busy_timeout_ms: 5000 }
    }
}

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, ConnectionSettings::default()).await
}

pub async fn connect_with_settings(
    database_url: &str,
    settings: ConnectionSettings,
) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(settings.busy_timeout_ms));

    SqlitePoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs.max(1)))
        .connect_with(options)
        .await
}
