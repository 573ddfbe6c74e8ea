use crate::types::Category;
use std::{fmt, str::FromStr};

/// Events observed on the host event bus
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HostEvent {
    /// Session start
    ConnectionOpen,

    /// GIF favourite events
    GifFavoriteAdd,
    GifFavoriteRemove,

    /// Emoji events
    EmojiFavorite,
    EmojiUnfavorite,
    EmojiTrackUsage,

    /// Keybind events
    KeybindsAddKeybind,
    KeybindsDeleteKeybind,
    KeybindsEnableAllKeybinds,
    KeybindsSetKeybind,

    /// Any change to user settings
    UserSettingsUpdate,

    /// Other events
    Unknown(String),
}

impl HostEvent {
    /// Every event the sync service subscribes to
    pub const SUBSCRIBED: [HostEvent; 11] = [
        HostEvent::ConnectionOpen,
        HostEvent::GifFavoriteAdd,
        HostEvent::GifFavoriteRemove,
        HostEvent::EmojiFavorite,
        HostEvent::EmojiUnfavorite,
        HostEvent::EmojiTrackUsage,
        HostEvent::KeybindsAddKeybind,
        HostEvent::KeybindsDeleteKeybind,
        HostEvent::KeybindsEnableAllKeybinds,
        HostEvent::KeybindsSetKeybind,
        HostEvent::UserSettingsUpdate,
    ];

    /// Bus name of the event
    pub fn name(&self) -> &str {
        match self {
            HostEvent::ConnectionOpen => "CONNECTION_OPEN",
            HostEvent::GifFavoriteAdd => "GIF_FAVORITE_ADD",
            HostEvent::GifFavoriteRemove => "GIF_FAVORITE_REMOVE",
            HostEvent::EmojiFavorite => "EMOJI_FAVORITE",
            HostEvent::EmojiUnfavorite => "EMOJI_UNFAVORITE",
            HostEvent::EmojiTrackUsage => "EMOJI_TRACK_USAGE",
            HostEvent::KeybindsAddKeybind => "KEYBINDS_ADD_KEYBIND",
            HostEvent::KeybindsDeleteKeybind => "KEYBINDS_DELETE_KEYBIND",
            HostEvent::KeybindsEnableAllKeybinds => "KEYBINDS_ENABLE_ALL_KEYBINDS",
            HostEvent::KeybindsSetKeybind => "KEYBINDS_SET_KEYBIND",
            HostEvent::UserSettingsUpdate => "USER_SETTINGS_UPDATE",
            HostEvent::Unknown(name) => name,
        }
    }

    /// Category whose live state this event mutates
    ///
    /// Settings updates touch several categories and are handled separately.
    pub fn owning_category(&self) -> Option<Category> {
        match self {
            HostEvent::GifFavoriteAdd | HostEvent::GifFavoriteRemove => Some(Category::Gifs),
            HostEvent::EmojiFavorite | HostEvent::EmojiUnfavorite | HostEvent::EmojiTrackUsage => {
                Some(Category::Emotes)
            }
            HostEvent::KeybindsAddKeybind
            | HostEvent::KeybindsDeleteKeybind
            | HostEvent::KeybindsEnableAllKeybinds
            | HostEvent::KeybindsSetKeybind => Some(Category::Keybinds),
            _ => None,
        }
    }

    /// High-frequency events whose backups are sampled
    pub fn is_high_frequency(&self) -> bool {
        matches!(self, HostEvent::EmojiTrackUsage)
    }
}

impl fmt::Display for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HostEvent {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(HostEvent::SUBSCRIBED
            .iter()
            .find(|event| event.name() == s)
            .cloned()
            .unwrap_or_else(|| HostEvent::Unknown(s.to_string())))
    }
}
