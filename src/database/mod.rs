//! SQLite database backend for durable backups

pub mod schema;
pub mod sqlite;
pub mod migrations;

use crate::error::{Error, Result};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::time::Duration;

pub use sqlite::SqliteSettingsStorage;

/// Database connection pool type
pub type DatabasePool = Pool<Sqlite>;

const MEMORY_URL: &str = "sqlite::memory:";

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path
    pub database_url: String,
    /// Maximum number of connections in pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connection_timeout: u64,
    /// Enable WAL mode for better concurrency
    pub enable_wal: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:prefsync.db".to_string(),
            max_connections: 4,
            connection_timeout: 30,
            enable_wal: true,
        }
    }
}

impl DatabaseConfig {
    /// Configuration for a database file at `path`
    pub fn file(path: impl AsRef<std::path::Path>) -> Self {
        Self {
            database_url: format!("sqlite:{}", path.as_ref().display()),
            ..Self::default()
        }
    }

    /// Configuration for a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            database_url: MEMORY_URL.to_string(),
            max_connections: 1,
            connection_timeout: 10,
            enable_wal: false,
        }
    }
}

/// Main database manager
pub struct Database {
    pool: DatabasePool,
    config: DatabaseConfig,
}

impl Database {
    /// Create new database instance
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout));

        let pool = if config.database_url == MEMORY_URL {
            // the database lives only as long as its single connection
            options
                .idle_timeout(None)
                .max_lifetime(None)
                .connect(&config.database_url)
                .await
                .map_err(|e| Error::Database(format!("Failed to connect to database: {}", e)))?
        } else {
            options
                .connect_with(
                    sqlx::sqlite::SqliteConnectOptions::new()
                        .filename(config.database_url.trim_start_matches("sqlite:"))
                        .create_if_missing(true)
                        .pragma("journal_mode", if config.enable_wal { "WAL" } else { "DELETE" })
                        .pragma("synchronous", "NORMAL"),
                )
                .await
                .map_err(|e| Error::Database(format!("Failed to connect to database: {}", e)))?
        };

        let database = Self { pool, config };
        migrations::run_migrations(&database.pool).await?;

        Ok(database)
    }

    /// Get database pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Settings storage backed by this database
    pub fn settings_storage(&self) -> SqliteSettingsStorage {
        SqliteSettingsStorage::new(self.pool.clone())
    }

    /// Close database connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
