//! SQLite implementation of durable settings storage

use crate::{
    error::{Error, Result},
    host::SettingsStorage,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;

/// Key-value settings stored as JSON text
pub struct SqliteSettingsStorage {
    pool: SqlitePool,
}

impl SqliteSettingsStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStorage for SqliteSettingsStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT value FROM settings WHERE key = ?"
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get setting: {}", e)))?;

        match value {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| Error::Storage(format!("Setting {:?} is not valid JSON: {}", key, e))),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        let text = serde_json::to_string(value)?;

        sqlx::query(
            r#"
            INSERT INTO settings (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#
        )
        .bind(key)
        .bind(&text)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to set setting: {}", e)))?;

        Ok(())
    }
}
