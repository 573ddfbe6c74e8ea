//! In-process host collaborators
//!
//! Used by the demo binary and the test suites. Each type mirrors the
//! behaviour of the corresponding chat client facility closely enough to
//! drive the engine end to end.

use crate::{
    arbiter::ChoicePrompt,
    error::{Error, Result},
    host::{
        CurrentUser, EventBus, EventSink, IdentitySource, LiveStore, Notifier, SettingsStorage, StoreRegistry,
    },
    types::{HostEvent, VersionedState},
};
use async_trait::async_trait;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};
use tokio::sync::{mpsc, RwLock};

/// Live store holding a JSON snapshot
pub struct MemoryLiveStore {
    state: RwLock<Value>,
    initializations: AtomicUsize,
}

impl MemoryLiveStore {
    pub fn new(state: Value) -> Self {
        Self {
            state: RwLock::new(state),
            initializations: AtomicUsize::new(0),
        }
    }

    /// Mutate the state the way the host would, without going through `initialize`
    pub async fn replace(&self, state: Value) {
        *self.state.write().await = state;
    }

    pub async fn snapshot(&self) -> Value {
        self.state.read().await.clone()
    }

    /// Number of times the engine pushed state into this store
    pub fn initializations(&self) -> usize {
        self.initializations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LiveStore for MemoryLiveStore {
    async fn get_state(&self) -> Result<Value> {
        Ok(self.state.read().await.clone())
    }

    async fn initialize(&self, state: Value) -> Result<()> {
        *self.state.write().await = state;
        self.initializations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Identity source whose user can be set at any time
#[derive(Default)]
pub struct MemoryIdentity {
    user: RwLock<Option<CurrentUser>>,
}

impl MemoryIdentity {
    pub fn new(user: Option<CurrentUser>) -> Self {
        Self {
            user: RwLock::new(user),
        }
    }

    pub fn with_user(id: impl Into<String>) -> Self {
        Self::new(Some(CurrentUser { id: id.into() }))
    }

    pub async fn set_user(&self, user: Option<CurrentUser>) {
        *self.user.write().await = user;
    }
}

#[async_trait]
impl IdentitySource for MemoryIdentity {
    async fn current_user(&self) -> Option<CurrentUser> {
        self.user.read().await.clone()
    }
}

/// Registration sink that remembers the last payload per store
#[derive(Default)]
pub struct MemoryStoreRegistry {
    stores: RwLock<HashMap<String, VersionedState>>,
}

impl MemoryStoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, store_name: &str) -> Option<VersionedState> {
        self.stores.read().await.get(store_name).cloned()
    }
}

#[async_trait]
impl StoreRegistry for MemoryStoreRegistry {
    async fn set(&self, store_name: &str, state: &VersionedState) -> Result<()> {
        self.stores
            .write()
            .await
            .insert(store_name.to_string(), state.clone());
        Ok(())
    }
}

/// Durable settings storage kept in memory
#[derive(Default)]
pub struct MemorySettingsStorage {
    values: RwLock<HashMap<String, Value>>,
    writes: AtomicUsize,
}

impl MemorySettingsStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of `set` calls served
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.values.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl SettingsStorage for MemorySettingsStorage {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> Result<()> {
        self.values.write().await.insert(key.to_string(), value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Notifier that forwards prompts to a channel, one message per toast
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<(String, ChoicePrompt)>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, ChoicePrompt)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn show_choice(&self, id: &str, prompt: ChoicePrompt) -> Result<()> {
        self.tx
            .send((id.to_string(), prompt))
            .map_err(|_| Error::HostUnavailable("toast surface is closed".to_string()))
    }
}

/// Event bus dispatching by event name
#[derive(Default)]
pub struct LocalEventBus {
    subscribers: RwLock<HashMap<String, Vec<EventSink>>>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch `event` to every live subscriber; returns how many received it
    pub async fn publish(&self, event: HostEvent) -> usize {
        let mut subscribers = self.subscribers.write().await;
        let Some(sinks) = subscribers.get_mut(event.name()) else {
            return 0;
        };
        sinks.retain(|sink| !sink.is_closed());
        sinks
            .iter()
            .filter(|sink| sink.send(event.clone()).is_ok())
            .count()
    }

    pub async fn subscriber_count(&self, event: &HostEvent) -> usize {
        self.subscribers
            .read()
            .await
            .get(event.name())
            .map_or(0, |sinks| sinks.len())
    }
}

#[async_trait]
impl EventBus for LocalEventBus {
    async fn subscribe(&self, event: &HostEvent, sink: EventSink) -> Result<()> {
        self.subscribers
            .write()
            .await
            .entry(event.name().to_string())
            .or_default()
            .push(sink);
        Ok(())
    }

    async fn unsubscribe(&self, event: &HostEvent) -> Result<()> {
        self.subscribers.write().await.remove(event.name());
        Ok(())
    }
}
