//! Database migrations for the backup store

use crate::error::{Error, Result};
use super::schema::{SCHEMA_VERSION, CREATE_TABLES, CREATE_TRIGGERS};
use sqlx::SqlitePool;

/// Run all database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_current_version(pool).await?;

    if current_version >= SCHEMA_VERSION {
        tracing::debug!("Database schema is up to date (version {})", current_version);
        return Ok(());
    }

    tracing::info!("Running database migrations from version {} to {}", current_version, SCHEMA_VERSION);

    let mut tx = pool.begin().await
        .map_err(|e| Error::Database(format!("Failed to begin migration transaction: {}", e)))?;

    match current_version {
        0 => migrate_to_v1(&mut tx).await?,
        _ => {
            return Err(Error::Database(format!("Unknown schema version: {}", current_version)));
        }
    }

    sqlx::query("INSERT OR REPLACE INTO schema_version (version) VALUES (?)")
        .bind(SCHEMA_VERSION)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("Failed to update schema version: {}", e)))?;

    tx.commit().await
        .map_err(|e| Error::Database(format!("Failed to commit migration transaction: {}", e)))?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}

/// Get current database schema version
pub(crate) async fn get_current_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'"
    )
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to check schema_version table: {}", e)))?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> = sqlx::query_scalar(
        "SELECT MAX(version) FROM schema_version"
    )
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Database(format!("Failed to get current schema version: {}", e)))?;

    Ok(version.unwrap_or(0))
}

/// Migration to version 1 - initial schema
async fn migrate_to_v1(tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>) -> Result<()> {
    for sql in CREATE_TABLES {
        sqlx::query(sql)
            .execute(&mut **tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to create table: {}", e)))?;
    }

    for sql in CREATE_TRIGGERS {
        sqlx::query(sql)
            .execute(&mut **tx)
            .await
            .map_err(|e| Error::Database(format!("Failed to create trigger: {}", e)))?;
    }

    Ok(())
}
