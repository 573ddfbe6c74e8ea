//! Conflict arbitration for emote backups
//!
//! When live emote state is not covered by its backup the reconciler does
//! not guess. The arbiter presents a two-way choice and hands back a
//! [`PendingDecision`] that completes when the UI resolves the prompt.

use crate::{
    error::{Error, Result},
    host::Notifier,
    types::EmoteState,
};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info};

const CONFLICT_BODY: &str = "Local Emote Data and Backup are in conflict. Please review which one you would like to keep and choose one of the options below.";
const TOAST_PREFIX: &str = "persist-favourites";

/// The user's answer to a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// "Restore Backup": overwrite live state with the backup
    KeepBackup,
    /// "Override Backup": overwrite the backup with live state
    KeepLive,
}

impl Resolution {
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::KeepBackup => "Restore Backup",
            Resolution::KeepLive => "Override Backup",
        }
    }
}

/// Emote state that could not be reconciled automatically
#[derive(Debug, Clone, PartialEq)]
pub struct EmoteConflict {
    /// Storage key of the backup
    pub key: String,
    pub live: EmoteState,
    pub backup: EmoteState,
    /// Live favourites absent from the backup
    pub missing_favorites: Vec<String>,
    /// Live usage history keys absent from the backup
    pub missing_usage: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub label: String,
    pub resolution: Resolution,
}

/// Answers a single conflict prompt
#[derive(Debug)]
pub struct DecisionResolver {
    tx: oneshot::Sender<Resolution>,
}

impl DecisionResolver {
    /// Deliver the decision; fails if the waiting side is gone
    pub fn resolve(self, resolution: Resolution) -> Result<()> {
        self.tx
            .send(resolution)
            .map_err(|_| Error::DecisionAbandoned("no restore is waiting on this decision".to_string()))
    }
}

/// Choice shown to the user
#[derive(Debug)]
pub struct ChoicePrompt {
    pub header: String,
    pub body: String,
    pub options: Vec<ChoiceOption>,
    pub resolver: DecisionResolver,
}

impl ChoicePrompt {
    /// Select the option at `index`
    pub fn choose(self, index: usize) -> Result<Resolution> {
        let resolution = self
            .options
            .get(index)
            .map(|option| option.resolution)
            .ok_or_else(|| Error::DecisionAbandoned(format!("no option at index {}", index)))?;
        self.resolver.resolve(resolution)?;
        Ok(resolution)
    }

    /// Select the option carrying `label`
    pub fn choose_label(self, label: &str) -> Result<Resolution> {
        match self.options.iter().position(|option| option.label == label) {
            Some(index) => self.choose(index),
            None => Err(Error::DecisionAbandoned(format!("no option labelled {:?}", label))),
        }
    }
}

/// A decision that has been requested but not yet made
#[derive(Debug)]
pub struct PendingDecision {
    id: String,
    rx: oneshot::Receiver<Resolution>,
}

impl PendingDecision {
    /// Toast identifier the prompt was shown under
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the user; there is no timeout
    pub async fn wait(self) -> Result<Resolution> {
        self.rx
            .await
            .map_err(|_| Error::DecisionAbandoned(format!("prompt {} was dismissed", self.id)))
    }
}

/// Presents conflicts through the host notifier
pub struct ConflictArbiter {
    notifier: Arc<dyn Notifier>,
    header: String,
}

impl ConflictArbiter {
    pub fn new(notifier: Arc<dyn Notifier>, header: impl Into<String>) -> Self {
        Self {
            notifier,
            header: header.into(),
        }
    }

    /// Show the choice for `conflict` and return the pending answer
    pub async fn raise(&self, conflict: &EmoteConflict) -> Result<PendingDecision> {
        let (tx, rx) = oneshot::channel();
        let id = format!("{}-{}", TOAST_PREFIX, uuid::Uuid::new_v4().simple());

        let prompt = ChoicePrompt {
            header: self.header.clone(),
            body: CONFLICT_BODY.to_string(),
            options: [Resolution::KeepBackup, Resolution::KeepLive]
                .into_iter()
                .map(|resolution| ChoiceOption {
                    label: resolution.label().to_string(),
                    resolution,
                })
                .collect(),
            resolver: DecisionResolver { tx },
        };

        debug!(
            "Emote conflict on {}: {} favourites and {} usage entries missing from backup",
            conflict.key,
            conflict.missing_favorites.len(),
            conflict.missing_usage.len()
        );
        self.notifier.show_choice(&id, prompt).await?;
        info!("Asked user to resolve emote conflict ({})", id);

        Ok(PendingDecision { id, rx })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::ChannelNotifier;

    fn conflict() -> EmoteConflict {
        EmoteConflict {
            key: "emotes-1".to_string(),
            live: EmoteState::default(),
            backup: EmoteState::default(),
            missing_favorites: vec!["9".to_string()],
            missing_usage: vec![],
        }
    }

    #[tokio::test]
    async fn test_raise_presents_two_options() {
        let (notifier, mut prompts) = ChannelNotifier::new();
        let arbiter = ConflictArbiter::new(Arc::new(notifier), "PersistFavourites");

        let pending = arbiter.raise(&conflict()).await.unwrap();
        assert!(pending.id().starts_with("persist-favourites-"));

        let (id, prompt) = prompts.recv().await.unwrap();
        assert_eq!(id, pending.id());
        assert_eq!(prompt.header, "PersistFavourites");
        let labels: Vec<_> = prompt.options.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["Restore Backup", "Override Backup"]);

        assert_eq!(prompt.choose(1).unwrap(), Resolution::KeepLive);
        assert_eq!(pending.wait().await.unwrap(), Resolution::KeepLive);
    }

    #[tokio::test]
    async fn test_choose_by_label() {
        let (notifier, mut prompts) = ChannelNotifier::new();
        let arbiter = ConflictArbiter::new(Arc::new(notifier), "PersistFavourites");

        let pending = arbiter.raise(&conflict()).await.unwrap();
        let (_, prompt) = prompts.recv().await.unwrap();
        prompt.choose_label("Restore Backup").unwrap();
        assert_eq!(pending.wait().await.unwrap(), Resolution::KeepBackup);
    }

    #[tokio::test]
    async fn test_dismissed_prompt_abandons_decision() {
        let (notifier, mut prompts) = ChannelNotifier::new();
        let arbiter = ConflictArbiter::new(Arc::new(notifier), "PersistFavourites");

        let pending = arbiter.raise(&conflict()).await.unwrap();
        drop(prompts.recv().await.unwrap());
        assert!(matches!(pending.wait().await, Err(Error::DecisionAbandoned(_))));
    }
}
