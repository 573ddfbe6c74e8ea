use crate::{
    error::{Error, Result},
    host::SettingsStorage,
    types::BackupRecord,
};
use serde_json::Value;
use std::sync::Arc;

/// Reads and writes one versioned backup record per key
#[derive(Clone)]
pub struct BackupStore {
    storage: Arc<dyn SettingsStorage>,
}

impl BackupStore {
    pub fn new(storage: Arc<dyn SettingsStorage>) -> Self {
        Self { storage }
    }

    /// Load the record stored under `key`
    ///
    /// A missing record is `Ok(None)`. A value that is not a record envelope
    /// is an error so that it is never silently replaced.
    pub async fn load(&self, key: &str) -> Result<Option<BackupRecord>> {
        match self.storage.get(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => decode_record(key, value).map(Some),
        }
    }

    /// Like [`load`](Self::load), but a bare JSON array is read as the
    /// state of an unversioned record written before envelopes existed
    pub async fn load_or_bare_list(&self, key: &str, schema_version: u32) -> Result<Option<BackupRecord>> {
        match self.storage.get(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(list @ Value::Array(_)) => Ok(Some(BackupRecord {
                schema_version,
                state: list,
                saved_at: None,
            })),
            Some(value) => decode_record(key, value).map(Some),
        }
    }

    /// Overwrite the record stored under `key`
    pub async fn save(&self, key: &str, record: &BackupRecord) -> Result<()> {
        let value = serde_json::to_value(record)?;
        self.storage.set(key, &value).await
    }
}

fn decode_record(key: &str, value: Value) -> Result<BackupRecord> {
    serde_json::from_value(value)
        .map_err(|e| Error::Serialization(format!("Backup under {:?} is not a record: {}", key, e)))
}
