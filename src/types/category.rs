use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Settings categories that are backed up and restored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Favourited GIFs
    Gifs,
    /// Favourited emoji and emoji usage history
    Emotes,
    /// Keybinds
    Keybinds,
    /// Voice & video settings
    Voice,
    /// Accessibility settings
    Accessibility,
    /// Notification settings
    Notifications,
    /// Experiment overrides
    Experiments,
}

/// How a category reconciles live state against its backup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Live state is replaced by the backup without comparison
    Overwrite,
    /// Backup and live sequences are concatenated and deduplicated by url
    UnionByUrl,
    /// Backup replaces live state only when live is covered by the backup
    ConditionalReplace,
}

impl Category {
    /// Every category, in restore order
    pub const ALL: [Category; 7] = [
        Category::Gifs,
        Category::Voice,
        Category::Emotes,
        Category::Keybinds,
        Category::Accessibility,
        Category::Notifications,
        Category::Experiments,
    ];

    /// Categories refreshed by a settings update
    pub const SETTINGS: [Category; 5] = [
        Category::Keybinds,
        Category::Voice,
        Category::Accessibility,
        Category::Notifications,
        Category::Experiments,
    ];

    /// Key (or key prefix, for per-user categories) in durable storage
    pub fn storage_key(&self) -> &'static str {
        match self {
            Category::Gifs => "gifs",
            Category::Emotes => "emotes",
            Category::Keybinds => "keybinds",
            Category::Voice => "voice",
            Category::Accessibility => "accessibility",
            Category::Notifications => "notifications",
            Category::Experiments => "experiments",
        }
    }

    /// Name the host registers the live store under
    pub fn store_name(&self) -> &'static str {
        match self {
            Category::Gifs => "GIFFavoritesStore",
            Category::Emotes => "EmojiStore",
            Category::Keybinds => "keybinds",
            Category::Voice => "MediaEngineStore",
            Category::Accessibility => "AccessibilityStore",
            Category::Notifications => "NotificationSettingsStore",
            Category::Experiments => "ExperimentStore",
        }
    }

    /// Live store compatibility tag written on every restore
    pub fn schema_version(&self) -> u32 {
        match self {
            Category::Gifs => 2,
            Category::Emotes => 1,
            Category::Keybinds => 2,
            Category::Voice => 1,
            Category::Accessibility => 7,
            Category::Notifications => 1,
            Category::Experiments => 1,
        }
    }

    pub fn policy(&self) -> MergePolicy {
        match self {
            Category::Gifs => MergePolicy::UnionByUrl,
            Category::Emotes => MergePolicy::ConditionalReplace,
            _ => MergePolicy::Overwrite,
        }
    }

    /// Field of the live snapshot that is backed up instead of the whole snapshot
    pub fn state_projection(&self) -> Option<&'static str> {
        match self {
            Category::Voice => Some("settingsByContext"),
            _ => None,
        }
    }

    /// Whether the backup is keyed by the current user
    pub fn is_per_user(&self) -> bool {
        matches!(self, Category::Emotes)
    }

    /// Storage key for this category, qualified by user where required
    pub fn backup_key(&self, user_id: Option<&str>) -> String {
        match (self.is_per_user(), user_id) {
            (true, Some(id)) => format!("{}-{}", self.storage_key(), id),
            _ => self.storage_key().to_string(),
        }
    }

    /// Human readable label used in log lines
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Gifs => "gifs",
            Category::Emotes => "emotes",
            Category::Keybinds => "keybinds",
            Category::Voice => "voice & video settings",
            Category::Accessibility => "accessibility settings",
            Category::Notifications => "notification settings",
            Category::Experiments => "experiment overrides",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_key())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.storage_key().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Config(format!("unknown category: {}", s)))
    }
}
