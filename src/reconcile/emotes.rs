use super::{decode_state, Reconciler, RestoreOutcome};
use crate::{
    arbiter::EmoteConflict,
    error::Result,
    types::{Category, EmoteState},
};
use tracing::{debug, info};

impl Reconciler {
    /// Restore emotes only when live state is covered by the backup
    ///
    /// Favourites and usage history only grow under normal use, so a live
    /// state that holds anything the backup lacks means two sessions
    /// diverged. That case is returned as a conflict instead of guessing.
    pub(super) async fn restore_emotes(&self) -> Result<RestoreOutcome> {
        let key = self.backup_key(Category::Emotes).await?;
        let live: EmoteState = decode_state(Category::Emotes, self.live.snapshot(Category::Emotes).await?)?;

        let Some(record) = self.backups.load(&key).await? else {
            self.backup_to(Category::Emotes, &key).await?;
            return Ok(RestoreOutcome::BackedUp);
        };

        let backup: EmoteState = decode_state(Category::Emotes, record.state.clone())?;

        if !live.is_empty() && !live.is_covered_by(&backup) {
            let missing_favorites = live.favorites_missing_from(&backup);
            let missing_usage = live.usage_missing_from(&backup);
            return Ok(RestoreOutcome::Conflict(EmoteConflict {
                key,
                live,
                backup,
                missing_favorites,
                missing_usage,
            }));
        }

        debug!("Live emotes are covered by backup {}", key);
        self.live.apply(Category::Emotes, record.state).await?;
        info!("Successfully restored your emotes!");
        Ok(RestoreOutcome::Restored)
    }

    pub(super) async fn apply_emote_backup(&self, conflict: &EmoteConflict) -> Result<()> {
        let state = serde_json::to_value(&conflict.backup)?;
        self.live.apply(Category::Emotes, state).await?;
        info!("Successfully restored your emotes!");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use crate::{arbiter::Resolution, error::Error, host::CurrentUser, identity::IdentityPolicy};
    use serde_json::{json, Value};

    fn emotes(favorites: &[&str], used: &[&str]) -> Value {
        let usage: serde_json::Map<String, Value> = used
            .iter()
            .map(|id| (id.to_string(), json!({"totalUses": 1})))
            .collect();
        json!({"favorites": favorites, "usageHistory": usage})
    }

    #[tokio::test]
    async fn test_covered_live_state_is_replaced_silently() {
        let fx = Fixture::new();
        let backup = emotes(&["1", "2", "3"], &["1", "4"]);
        fx.seed_backup("emotes-1001", Category::Emotes, backup.clone()).await;
        fx.store(Category::Emotes).replace(emotes(&["2"], &["4"])).await;

        let outcome = fx.reconciler.restore(Category::Emotes).await.unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored);
        assert_eq!(fx.store(Category::Emotes).snapshot().await, backup);
        assert_eq!(fx.registry.get("EmojiStore").await.unwrap().version, 1);
    }

    #[tokio::test]
    async fn test_empty_live_state_skips_comparison() {
        let fx = Fixture::new();
        let backup = emotes(&["1"], &[]);
        fx.seed_backup("emotes-1001", Category::Emotes, backup.clone()).await;
        fx.store(Category::Emotes).replace(emotes(&[], &[])).await;

        let outcome = fx.reconciler.restore(Category::Emotes).await.unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored);
        assert_eq!(fx.store(Category::Emotes).snapshot().await, backup);
    }

    #[tokio::test]
    async fn test_unknown_favorite_is_a_conflict() {
        let fx = Fixture::new();
        fx.seed_backup("emotes-1001", Category::Emotes, emotes(&["1"], &["1"])).await;
        let live = emotes(&["1", "9"], &["1"]);
        fx.store(Category::Emotes).replace(live.clone()).await;

        let conflict = match fx.reconciler.restore(Category::Emotes).await.unwrap() {
            RestoreOutcome::Conflict(conflict) => conflict,
            other => panic!("expected a conflict, got {:?}", other),
        };
        assert_eq!(conflict.key, "emotes-1001");
        assert_eq!(conflict.missing_favorites, vec!["9".to_string()]);
        assert!(conflict.missing_usage.is_empty());

        assert_eq!(fx.store(Category::Emotes).initializations(), 0);
        assert_eq!(fx.store(Category::Emotes).snapshot().await, live);
    }

    #[tokio::test]
    async fn test_unknown_usage_key_is_a_conflict() {
        let fx = Fixture::new();
        fx.seed_backup("emotes-1001", Category::Emotes, emotes(&["1"], &["1"])).await;
        fx.store(Category::Emotes).replace(emotes(&["1"], &["5"])).await;

        let outcome = fx.reconciler.restore(Category::Emotes).await.unwrap();
        match outcome {
            RestoreOutcome::Conflict(conflict) => assert_eq!(conflict.missing_usage, vec!["5".to_string()]),
            other => panic!("expected a conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_keep_backup_resolution() {
        let fx = Fixture::new();
        let backup = emotes(&["1"], &["1"]);
        fx.seed_backup("emotes-1001", Category::Emotes, backup.clone()).await;
        fx.store(Category::Emotes).replace(emotes(&["9"], &[])).await;

        let RestoreOutcome::Conflict(conflict) = fx.reconciler.restore(Category::Emotes).await.unwrap() else {
            panic!("expected a conflict");
        };
        fx.reconciler.resolve_conflict(conflict, Resolution::KeepBackup).await.unwrap();

        assert_eq!(fx.store(Category::Emotes).snapshot().await, backup);
        assert_eq!(fx.stored_state("emotes-1001").await, Some(backup));
    }

    #[tokio::test]
    async fn test_keep_live_resolution() {
        let fx = Fixture::new();
        fx.seed_backup("emotes-1001", Category::Emotes, emotes(&["1"], &["1"])).await;
        let live = emotes(&["9"], &["9"]);
        fx.store(Category::Emotes).replace(live.clone()).await;

        let RestoreOutcome::Conflict(conflict) = fx.reconciler.restore(Category::Emotes).await.unwrap() else {
            panic!("expected a conflict");
        };
        fx.reconciler.resolve_conflict(conflict, Resolution::KeepLive).await.unwrap();

        assert_eq!(fx.stored_state("emotes-1001").await, Some(live.clone()));
        assert_eq!(fx.store(Category::Emotes).snapshot().await, live);
        assert_eq!(fx.store(Category::Emotes).initializations(), 0);
    }

    #[tokio::test]
    async fn test_missing_backup_is_written_per_user() {
        let fx = Fixture::new();
        fx.identity.set_user(Some(CurrentUser { id: "77".to_string() })).await;
        fx.store(Category::Emotes).replace(emotes(&["1"], &[])).await;

        let outcome = fx.reconciler.restore(Category::Emotes).await.unwrap();
        assert_eq!(outcome, RestoreOutcome::BackedUp);
        assert!(fx.stored_state("emotes-77").await.is_some());
        assert_eq!(fx.storage.keys().await, vec!["emotes-77".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_fails_without_identity() {
        let fx = Fixture::new();
        fx.identity.set_user(None).await;
        let reconciler = super::super::Reconciler::new(
            crate::store::BackupStore::new(fx.storage.clone()),
            fx.reconciler.live.clone(),
            crate::identity::IdentityWaiter::new(
                fx.identity.clone(),
                IdentityPolicy {
                    poll_interval: std::time::Duration::from_millis(10),
                    max_attempts: 5,
                },
            ),
        );

        let result = reconciler.restore(Category::Emotes).await;
        assert!(matches!(result, Err(Error::IdentityTimeout { attempts: 5 })));
    }
}
