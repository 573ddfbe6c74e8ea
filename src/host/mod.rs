//! Host collaborator contracts
//!
//! The sync engine never reaches into the chat client directly. Every
//! capability it needs is supplied at construction through the traits in
//! this module:
//! - live state containers, one per category
//! - the current-user identity source
//! - the store registration sink
//! - durable key-value settings storage
//! - the toast surface used for conflict choices
//! - the event bus

pub mod memory;

use crate::{
    arbiter::ChoicePrompt,
    error::{Error, Result},
    types::{Category, HostEvent, VersionedState},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::mpsc;

/// Channel end the event bus forwards subscribed events into
pub type EventSink = mpsc::UnboundedSender<HostEvent>;

/// In-memory state container for one category
#[async_trait]
pub trait LiveStore: Send + Sync {
    /// Current snapshot of the store
    async fn get_state(&self) -> Result<Value>;

    /// Replace the store's state entirely
    async fn initialize(&self, state: Value) -> Result<()>;
}

/// Currently logged in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
}

#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// The current user, if the host has populated it yet
    async fn current_user(&self) -> Option<CurrentUser>;
}

/// Low-level sink that tags live stores with a schema version
#[async_trait]
pub trait StoreRegistry: Send + Sync {
    async fn set(&self, store_name: &str, state: &VersionedState) -> Result<()>;
}

/// Durable key-value storage that survives sessions
#[async_trait]
pub trait SettingsStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: &Value) -> Result<()>;
}

/// User-facing toast surface
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Present a choice; the UI answers through the prompt's resolver
    async fn show_choice(&self, id: &str, prompt: ChoicePrompt) -> Result<()>;
}

#[async_trait]
pub trait EventBus: Send + Sync {
    /// Forward every occurrence of `event` into `sink`
    async fn subscribe(&self, event: &HostEvent, sink: EventSink) -> Result<()>;

    /// Stop forwarding `event` to the sinks registered by this subscriber
    async fn unsubscribe(&self, event: &HostEvent) -> Result<()>;
}

/// Typed bundle of every host capability the engine depends on
#[derive(Clone)]
pub struct Host {
    pub live_stores: HashMap<Category, Arc<dyn LiveStore>>,
    pub identity: Arc<dyn IdentitySource>,
    pub registry: Arc<dyn StoreRegistry>,
    pub storage: Arc<dyn SettingsStorage>,
    pub notifier: Arc<dyn Notifier>,
    pub bus: Arc<dyn EventBus>,
}

impl Host {
    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    /// Fail if any of `categories` has no live store
    pub fn ensure_categories(&self, categories: &[Category]) -> Result<()> {
        for category in categories {
            if !self.live_stores.contains_key(category) {
                return Err(Error::HostUnavailable(format!(
                    "no live store for {}",
                    category.store_name()
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stores: Vec<_> = self.live_stores.keys().collect();
        stores.sort_by_key(|c| c.storage_key());
        f.debug_struct("Host").field("live_stores", &stores).finish_non_exhaustive()
    }
}

/// Builder for [`Host`]
#[derive(Default)]
pub struct HostBuilder {
    live_stores: HashMap<Category, Arc<dyn LiveStore>>,
    identity: Option<Arc<dyn IdentitySource>>,
    registry: Option<Arc<dyn StoreRegistry>>,
    storage: Option<Arc<dyn SettingsStorage>>,
    notifier: Option<Arc<dyn Notifier>>,
    bus: Option<Arc<dyn EventBus>>,
}

impl HostBuilder {
    pub fn live_store(mut self, category: Category, store: Arc<dyn LiveStore>) -> Self {
        self.live_stores.insert(category, store);
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentitySource>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn StoreRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn SettingsStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn bus(mut self, bus: Arc<dyn EventBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn build(self) -> Result<Host> {
        fn require<T>(value: Option<T>, name: &str) -> Result<T> {
            value.ok_or_else(|| Error::HostUnavailable(name.to_string()))
        }

        Ok(Host {
            live_stores: self.live_stores,
            identity: require(self.identity, "identity source")?,
            registry: require(self.registry, "store registry")?,
            storage: require(self.storage, "settings storage")?,
            notifier: require(self.notifier, "notifier")?,
            bus: require(self.bus, "event bus")?,
        })
    }
}
