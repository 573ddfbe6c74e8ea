use crate::{
    error::{Error, Result},
    host::{LiveStore, StoreRegistry},
    types::{Category, VersionedState},
};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

/// Reads and replaces the host's in-memory state per category
#[derive(Clone)]
pub struct LiveState {
    stores: HashMap<Category, Arc<dyn LiveStore>>,
    registry: Arc<dyn StoreRegistry>,
}

impl LiveState {
    pub fn new(stores: HashMap<Category, Arc<dyn LiveStore>>, registry: Arc<dyn StoreRegistry>) -> Self {
        Self { stores, registry }
    }

    fn store(&self, category: Category) -> Result<&Arc<dyn LiveStore>> {
        self.stores
            .get(&category)
            .ok_or_else(|| Error::HostUnavailable(format!("no live store for {}", category.store_name())))
    }

    /// Current live state for `category`
    pub async fn snapshot(&self, category: Category) -> Result<Value> {
        self.store(category)?.get_state().await
    }

    /// The part of the live state that gets backed up
    pub async fn backup_payload(&self, category: Category) -> Result<Value> {
        let state = self.snapshot(category).await?;
        Ok(match category.state_projection() {
            Some(field) => match state {
                Value::Object(mut map) if map.contains_key(field) => map.remove(field).unwrap_or(Value::Null),
                other => other,
            },
            None => state,
        })
    }

    /// Replace live state, tagging the store with the category's schema version
    pub async fn apply(&self, category: Category, state: Value) -> Result<()> {
        let store = self.store(category)?;
        let versioned = VersionedState {
            version: category.schema_version(),
            state,
        };

        self.registry.set(category.store_name(), &versioned).await?;
        store
            .initialize(versioned.state)
            .await
            .map_err(|e| Error::LiveStore(format!("{} rejected restored state: {}", category.store_name(), e)))?;

        debug!("Initialized {} at version {}", category.store_name(), versioned.version);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::{MemoryLiveStore, MemoryStoreRegistry};
    use serde_json::json;

    fn live_state(category: Category, store: Arc<MemoryLiveStore>) -> (LiveState, Arc<MemoryStoreRegistry>) {
        let registry = Arc::new(MemoryStoreRegistry::new());
        let mut stores: HashMap<Category, Arc<dyn LiveStore>> = HashMap::new();
        stores.insert(category, store);
        (LiveState::new(stores, registry.clone()), registry)
    }

    #[tokio::test]
    async fn test_apply_tags_schema_version() {
        let store = Arc::new(MemoryLiveStore::new(json!({})));
        let (live, registry) = live_state(Category::Accessibility, store.clone());

        live.apply(Category::Accessibility, json!({"zoom": 120})).await.unwrap();

        let registered = registry.get("AccessibilityStore").await.unwrap();
        assert_eq!(registered.version, 7);
        assert_eq!(registered.state, json!({"zoom": 120}));
        assert_eq!(store.snapshot().await, json!({"zoom": 120}));
    }

    #[tokio::test]
    async fn test_voice_backup_projects_settings_by_context() {
        let store = Arc::new(MemoryLiveStore::new(json!({
            "settingsByContext": {"default": {"mute": false}},
            "devices": ["mic"]
        })));
        let (live, _) = live_state(Category::Voice, store);

        let payload = live.backup_payload(Category::Voice).await.unwrap();
        assert_eq!(payload, json!({"default": {"mute": false}}));
    }

    #[tokio::test]
    async fn test_missing_store_is_unavailable() {
        let store = Arc::new(MemoryLiveStore::new(json!({})));
        let (live, _) = live_state(Category::Gifs, store);
        assert!(matches!(
            live.snapshot(Category::Keybinds).await,
            Err(Error::HostUnavailable(_))
        ));
    }

    struct ReadOnlyStore;

    #[async_trait::async_trait]
    impl LiveStore for ReadOnlyStore {
        async fn get_state(&self) -> Result<Value> {
            Ok(json!({}))
        }

        async fn initialize(&self, _state: Value) -> Result<()> {
            Err(Error::HostUnavailable("store is frozen".to_string()))
        }
    }

    #[tokio::test]
    async fn test_rejected_initialize_is_a_live_store_error() {
        let mut stores: HashMap<Category, Arc<dyn LiveStore>> = HashMap::new();
        stores.insert(Category::Keybinds, Arc::new(ReadOnlyStore));
        let live = LiveState::new(stores, Arc::new(MemoryStoreRegistry::new()));

        let result = live.apply(Category::Keybinds, json!({})).await;
        assert!(matches!(result, Err(Error::LiveStore(_))));
    }
}
