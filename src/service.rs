//! Activation lifetime of the sync engine
//!
//! [`PersistService`] owns one event loop task. Bus events, the fallback
//! timer and conflict decisions all arrive on that task, so every backup
//! and restore runs serialized with the others.
//!
//! Categories keyed by the current user may have to wait for the identity
//! source. Their jobs run in order on a companion worker task and report
//! back to the loop as commands, so the other categories keep going.

use crate::{
    arbiter::{ConflictArbiter, EmoteConflict, Resolution},
    config::SyncConfig,
    error::{Error, Result},
    host::Host,
    reconcile::{Reconciler, RestoreOutcome},
    trigger::{ChangeTrigger, Reaction, RestoreSource, SessionState, SessionTrigger},
    types::{Category, HostEvent},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::HashSet, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, RwLock},
    task::JoinHandle,
};
use tracing::{debug, info, trace, warn};

/// Counters accumulated over the service lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatistics {
    /// Full restore passes run
    pub restore_passes: u64,
    /// Categories whose live state was replaced from a backup
    pub categories_restored: u64,
    /// Backups written, including backfills and "Override Backup"
    pub backups_written: u64,
    /// Usage events dropped by the sampler
    pub sampled_out: u64,
    pub conflicts_raised: u64,
    pub conflicts_resolved: u64,
    /// Per-category backup or restore failures
    pub category_failures: u64,
}

/// Snapshot returned by [`PersistService::status`]
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub session: SessionState,
    pub restored_by: Option<RestoreSource>,
    /// Toast id of the conflict awaiting a decision
    pub pending_conflict: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub statistics: SyncStatistics,
}

/// State shared between the service handle and its event loop
#[derive(Debug, Default)]
struct Tracker {
    session: SessionTrigger,
    pending_conflict: Option<String>,
    statistics: SyncStatistics,
}

#[derive(Default)]
struct Lifecycle {
    running: bool,
    event_loop: Option<JoinHandle<()>>,
    started_at: Option<DateTime<Utc>>,
}

/// Work fed back into the event loop from outside it
#[derive(Debug)]
enum Command {
    UserRestoreFinished {
        category: Category,
        result: Result<RestoreOutcome>,
    },
    UserBackupFinished {
        category: Category,
        result: Result<()>,
    },
    ConflictResolved {
        conflict: EmoteConflict,
        resolution: Resolution,
    },
    ConflictAbandoned {
        id: String,
        reason: String,
    },
}

/// Work for categories keyed by the current user
#[derive(Debug, Clone, Copy)]
enum UserJob {
    Restore(Category),
    Backup(Category),
}

impl UserJob {
    fn category(&self) -> Category {
        match self {
            UserJob::Restore(category) | UserJob::Backup(category) => *category,
        }
    }
}

/// Backup/restore service bound to one host
pub struct PersistService {
    config: SyncConfig,
    host: Host,
    reconciler: Reconciler,
    arbiter: Arc<ConflictArbiter>,
    tracker: Arc<RwLock<Tracker>>,
    lifecycle: RwLock<Lifecycle>,
}

impl PersistService {
    /// Create a service; every enabled category must have a live store
    pub fn new(host: Host, config: SyncConfig) -> Result<Self> {
        config.validate()?;
        host.ensure_categories(&config.categories)?;

        let reconciler = Reconciler::from_host(&host, config.identity_policy());
        let arbiter = Arc::new(ConflictArbiter::new(host.notifier.clone(), config.plugin_name.clone()));

        Ok(Self {
            config,
            host,
            reconciler,
            arbiter,
            tracker: Arc::new(RwLock::new(Tracker::default())),
            lifecycle: RwLock::new(Lifecycle::default()),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Subscribe to the bus, arm the fallback timer and spawn the event loop
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.write().await;

        if lifecycle.running {
            return Err(Error::Service(format!("{} is already running", self.config.plugin_name)));
        }

        info!("Starting {}", self.config.plugin_name);

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        for event in HostEvent::SUBSCRIBED.iter() {
            if let Err(e) = self.host.bus.subscribe(event, event_tx.clone()).await {
                self.unsubscribe_all().await;
                return Err(e);
            }
        }
        drop(event_tx);

        {
            let mut tracker = self.tracker.write().await;
            tracker.session = SessionTrigger::new();
            tracker.pending_conflict = None;
        }

        let event_loop = EventLoop::new(
            self.reconciler.clone(),
            self.arbiter.clone(),
            self.restore_order(),
            ChangeTrigger::new(self.config.categories.clone(), self.config.usage_sampler()),
            self.tracker.clone(),
            event_rx,
        );

        lifecycle.event_loop = Some(tokio::spawn(event_loop.run(self.config.fallback_delay())));
        lifecycle.running = true;
        lifecycle.started_at = Some(Utc::now());

        info!("{} started", self.config.plugin_name);
        Ok(())
    }

    /// Unsubscribe every event and stop the event loop
    pub async fn stop(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.write().await;

        if !lifecycle.running {
            return Ok(());
        }

        info!("Stopping {}", self.config.plugin_name);

        self.unsubscribe_all().await;
        if let Some(handle) = lifecycle.event_loop.take() {
            handle.abort();
        }
        lifecycle.running = false;

        info!("{} stopped", self.config.plugin_name);
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.lifecycle.read().await.running
    }

    pub async fn status(&self) -> ServiceStatus {
        let lifecycle = self.lifecycle.read().await;
        let tracker = self.tracker.read().await;

        ServiceStatus {
            running: lifecycle.running,
            session: tracker.session.state(),
            restored_by: tracker.session.restored_by(),
            pending_conflict: tracker.pending_conflict.clone(),
            started_at: lifecycle.started_at,
            statistics: tracker.statistics.clone(),
        }
    }

    /// Enabled categories in restore order
    fn restore_order(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| self.config.is_enabled(*c))
            .collect()
    }

    async fn unsubscribe_all(&self) {
        for event in HostEvent::SUBSCRIBED.iter() {
            if let Err(e) = self.host.bus.unsubscribe(event).await {
                warn!("Failed to unsubscribe from {}: {}", event.name(), e);
            }
        }
    }
}

struct EventLoop {
    reconciler: Reconciler,
    arbiter: Arc<ConflictArbiter>,
    categories: Vec<Category>,
    change: ChangeTrigger,
    tracker: Arc<RwLock<Tracker>>,
    events: mpsc::UnboundedReceiver<HostEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    command_tx: mpsc::UnboundedSender<Command>,
    user_jobs: mpsc::UnboundedSender<UserJob>,
    user_worker: JoinHandle<()>,
    /// Per-user categories whose restore is still on the worker
    restoring: HashSet<Category>,
    /// Per-user categories that changed while their restore was running
    deferred_backups: HashSet<Category>,
}

impl EventLoop {
    fn new(
        reconciler: Reconciler,
        arbiter: Arc<ConflictArbiter>,
        categories: Vec<Category>,
        change: ChangeTrigger,
        tracker: Arc<RwLock<Tracker>>,
        events: mpsc::UnboundedReceiver<HostEvent>,
    ) -> Self {
        let (command_tx, commands) = mpsc::unbounded_channel();
        let (user_jobs, jobs) = mpsc::unbounded_channel();
        let user_worker = tokio::spawn(run_user_jobs(reconciler.clone(), jobs, command_tx.clone()));

        Self {
            reconciler,
            arbiter,
            categories,
            change,
            tracker,
            events,
            commands,
            command_tx,
            user_jobs,
            user_worker,
            restoring: HashSet::new(),
            deferred_backups: HashSet::new(),
        }
    }

    async fn run(mut self, fallback_delay: Duration) {
        let fallback = tokio::time::sleep(fallback_delay);
        tokio::pin!(fallback);
        let mut fallback_armed = true;

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                Some(command) = self.commands.recv() => self.handle_command(command).await,
                () = &mut fallback, if fallback_armed => {
                    fallback_armed = false;
                    self.start_session(RestoreSource::FallbackTimer).await;
                }
            }
        }

        debug!("Event bus closed, event loop finished");
    }

    async fn handle_event(&mut self, event: HostEvent) {
        trace!("Received {}", event.name());

        match self.change.react(&event) {
            Reaction::StartSession => self.start_session(RestoreSource::SessionStart).await,
            Reaction::Backup(categories) => {
                for category in categories {
                    self.backup(category).await;
                }
            }
            Reaction::SampledOut => {
                self.tracker.write().await.statistics.sampled_out += 1;
            }
            Reaction::Ignore => debug!("Ignoring {}", event.name()),
        }
    }

    async fn start_session(&mut self, source: RestoreSource) {
        if !self.tracker.write().await.session.fire(source) {
            return;
        }

        info!("Restoring {} categories ({:?})", self.categories.len(), source);
        self.tracker.write().await.statistics.restore_passes += 1;

        for category in self.categories.clone() {
            self.restore(category).await;
        }
    }

    async fn restore(&mut self, category: Category) {
        if category.is_per_user() {
            self.restoring.insert(category);
            self.dispatch(UserJob::Restore(category)).await;
            return;
        }

        let result = self.reconciler.restore(category).await;
        self.record_restore(category, result).await;
    }

    async fn record_restore(&mut self, category: Category, result: Result<RestoreOutcome>) {
        match result {
            Ok(RestoreOutcome::Restored) => {
                self.tracker.write().await.statistics.categories_restored += 1;
            }
            Ok(RestoreOutcome::BackedUp) => {
                self.tracker.write().await.statistics.backups_written += 1;
            }
            Ok(RestoreOutcome::Conflict(conflict)) => self.raise_conflict(conflict).await,
            Err(e) => record_failure(&self.tracker, category, "restore", &e).await,
        }
    }

    async fn backup(&mut self, category: Category) {
        if category == Category::Emotes && self.tracker.read().await.pending_conflict.is_some() {
            debug!("Holding emote backup until the pending conflict is resolved");
            return;
        }

        if category.is_per_user() {
            if self.restoring.contains(&category) {
                debug!("Deferring {} backup until its restore finishes", category.display_name());
                self.deferred_backups.insert(category);
            } else {
                self.dispatch(UserJob::Backup(category)).await;
            }
            return;
        }

        let result = self.reconciler.backup(category).await;
        self.record_backup(category, result).await;
    }

    async fn record_backup(&self, category: Category, result: Result<()>) {
        match result {
            Ok(()) => self.tracker.write().await.statistics.backups_written += 1,
            Err(e) => record_failure(&self.tracker, category, "backup", &e).await,
        }
    }

    async fn dispatch(&mut self, job: UserJob) {
        if self.user_jobs.send(job).is_err() {
            let category = job.category();
            self.restoring.remove(&category);
            let error = Error::Service("identity worker has stopped".to_string());
            record_failure(&self.tracker, category, "schedule", &error).await;
        }
    }

    async fn raise_conflict(&mut self, conflict: EmoteConflict) {
        let pending = match self.arbiter.raise(&conflict).await {
            Ok(pending) => pending,
            Err(e) => {
                record_failure(&self.tracker, Category::Emotes, "conflict prompt", &e).await;
                return;
            }
        };

        {
            let mut tracker = self.tracker.write().await;
            tracker.pending_conflict = Some(pending.id().to_string());
            tracker.statistics.conflicts_raised += 1;
        }

        let commands = self.command_tx.clone();
        tokio::spawn(async move {
            let id = pending.id().to_string();
            let command = match pending.wait().await {
                Ok(resolution) => Command::ConflictResolved { conflict, resolution },
                Err(e) => Command::ConflictAbandoned {
                    id,
                    reason: e.to_string(),
                },
            };
            // the loop may already be gone after stop()
            let _ = commands.send(command);
        });
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::UserRestoreFinished { category, result } => {
                self.restoring.remove(&category);
                let conflicted = matches!(result, Ok(RestoreOutcome::Conflict(_)));
                self.record_restore(category, result).await;

                if self.deferred_backups.remove(&category) {
                    if conflicted {
                        debug!("Dropping deferred {} backup, live state is in conflict", category.display_name());
                    } else {
                        self.dispatch(UserJob::Backup(category)).await;
                    }
                }
            }
            Command::UserBackupFinished { category, result } => self.record_backup(category, result).await,
            Command::ConflictResolved { conflict, resolution } => {
                self.tracker.write().await.pending_conflict = None;
                info!("Emote conflict resolved: {}", resolution.label());

                match self.reconciler.resolve_conflict(conflict, resolution).await {
                    Ok(()) => {
                        let mut tracker = self.tracker.write().await;
                        tracker.statistics.conflicts_resolved += 1;
                        match resolution {
                            Resolution::KeepBackup => tracker.statistics.categories_restored += 1,
                            Resolution::KeepLive => tracker.statistics.backups_written += 1,
                        }
                    }
                    Err(e) => record_failure(&self.tracker, Category::Emotes, "conflict resolution", &e).await,
                }
            }
            Command::ConflictAbandoned { id, reason } => {
                self.tracker.write().await.pending_conflict = None;
                info!("Emote restore abandoned ({}): {}", id, reason);
            }
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.user_worker.abort();
    }
}

/// Runs per-user jobs in order, off the event loop, and reports each result back to it
async fn run_user_jobs(
    reconciler: Reconciler,
    mut jobs: mpsc::UnboundedReceiver<UserJob>,
    commands: mpsc::UnboundedSender<Command>,
) {
    while let Some(job) = jobs.recv().await {
        let command = match job {
            UserJob::Restore(category) => Command::UserRestoreFinished {
                category,
                result: reconciler.restore(category).await,
            },
            UserJob::Backup(category) => Command::UserBackupFinished {
                category,
                result: reconciler.backup(category).await,
            },
        };
        if commands.send(command).is_err() {
            break;
        }
    }
}

async fn record_failure(tracker: &RwLock<Tracker>, category: Category, operation: &str, error: &Error) {
    warn!("Failed to {} {}: {}", operation, category.display_name(), error);
    tracker.write().await.statistics.category_failures += 1;
}
