//! Per-category backup and restore
//!
//! Every category shares the same contract: `backup` snapshots live state
//! into a versioned record, `restore` pushes a record back into the live
//! store according to the category's merge policy. A category without a
//! record is backed up instead of restored so that a record always exists
//! after the first pass.

mod emotes;
mod gifs;

use crate::{
    arbiter::{EmoteConflict, Resolution},
    error::{Error, Result},
    host::Host,
    identity::{IdentityPolicy, IdentityWaiter},
    live::LiveState,
    store::BackupStore,
    types::{BackupRecord, Category, MergePolicy},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

/// Result of restoring one category
#[derive(Debug, Clone, PartialEq)]
pub enum RestoreOutcome {
    /// Live state was replaced from the backup
    Restored,
    /// There was no backup; one was written from live state
    BackedUp,
    /// Live and backup diverged; a user decision is required
    Conflict(EmoteConflict),
}

/// Backup/restore engine shared by every category
#[derive(Clone)]
pub struct Reconciler {
    backups: BackupStore,
    live: LiveState,
    identity: IdentityWaiter,
}

impl Reconciler {
    pub fn new(backups: BackupStore, live: LiveState, identity: IdentityWaiter) -> Self {
        Self {
            backups,
            live,
            identity,
        }
    }

    /// Wire a reconciler to the host's collaborators
    pub fn from_host(host: &Host, policy: IdentityPolicy) -> Self {
        Self::new(
            BackupStore::new(host.storage.clone()),
            LiveState::new(host.live_stores.clone(), host.registry.clone()),
            IdentityWaiter::new(host.identity.clone(), policy),
        )
    }

    /// Storage key for `category`, resolving the current user if needed
    pub async fn backup_key(&self, category: Category) -> Result<String> {
        if category.is_per_user() {
            let user_id = self.identity.wait().await?;
            Ok(category.backup_key(Some(&user_id)))
        } else {
            Ok(category.backup_key(None))
        }
    }

    /// Overwrite the backup of `category` with current live state
    pub async fn backup(&self, category: Category) -> Result<()> {
        let key = self.backup_key(category).await?;
        self.backup_to(category, &key).await
    }

    /// Reconcile live state of `category` with its backup
    pub async fn restore(&self, category: Category) -> Result<RestoreOutcome> {
        match category.policy() {
            MergePolicy::Overwrite => self.restore_overwrite(category).await,
            MergePolicy::UnionByUrl => self.restore_gifs().await,
            MergePolicy::ConditionalReplace => self.restore_emotes().await,
        }
    }

    /// Complete a restore that stopped on a conflict
    pub async fn resolve_conflict(&self, conflict: EmoteConflict, resolution: Resolution) -> Result<()> {
        match resolution {
            Resolution::KeepBackup => self.apply_emote_backup(&conflict).await,
            Resolution::KeepLive => self.backup_to(Category::Emotes, &conflict.key).await,
        }
    }

    async fn backup_to(&self, category: Category, key: &str) -> Result<()> {
        let payload = match category {
            Category::Gifs => self.gif_backup_payload().await?,
            _ => self.live.backup_payload(category).await?,
        };

        let record = BackupRecord::new(category.schema_version(), payload);
        self.backups.save(key, &record).await?;

        info!("Successfully backed up your {}!", category.display_name());
        Ok(())
    }

    async fn restore_overwrite(&self, category: Category) -> Result<RestoreOutcome> {
        let key = category.backup_key(None);
        let Some(record) = self.backups.load(&key).await? else {
            self.backup_to(category, &key).await?;
            return Ok(RestoreOutcome::BackedUp);
        };

        self.live.apply(category, record.state).await?;
        info!("Successfully restored your {}!", category.display_name());
        Ok(RestoreOutcome::Restored)
    }
}

/// Decode a category payload; a null snapshot is an empty store
fn decode_state<T: DeserializeOwned + Default>(category: Category, value: Value) -> Result<T> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value)
        .map_err(|e| Error::Serialization(format!("Unexpected {} state: {}", category, e)))
}
