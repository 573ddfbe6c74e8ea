use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A single favourited GIF
///
/// Only `url` is interpreted; every other field the host attaches is
/// carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GifFavorite {
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GifFavorite {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra: Map::new(),
        }
    }
}

/// Favourite GIF state as held by the live store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GifState {
    #[serde(default)]
    pub favorites: Vec<GifFavorite>,
    #[serde(rename = "timesFavorited", alias = "favoriteCount", default)]
    pub favorite_count: usize,
}

impl GifState {
    pub fn from_favorites(favorites: Vec<GifFavorite>) -> Self {
        let favorite_count = favorites.len();
        Self {
            favorites,
            favorite_count,
        }
    }

    /// Union of `backup` and `live`, deduplicated by url
    ///
    /// First occurrence wins, so backup entries shadow live entries that
    /// share a url.
    pub fn union(backup: &[GifFavorite], live: &[GifFavorite]) -> Self {
        let mut seen = HashSet::new();
        let favorites = backup
            .iter()
            .chain(live.iter())
            .filter(|fav| seen.insert(fav.url.as_str()))
            .cloned()
            .collect();
        Self::from_favorites(favorites)
    }
}

/// Emoji favourites and usage history as held by the live store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EmoteState {
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(rename = "usageHistory", default)]
    pub usage_history: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmoteState {
    /// Live state with nothing to lose
    pub fn is_empty(&self) -> bool {
        self.favorites.is_empty() && self.usage_history.is_empty()
    }

    /// Favourites held here but absent from `backup`
    pub fn favorites_missing_from(&self, backup: &EmoteState) -> Vec<String> {
        self.favorites
            .iter()
            .filter(|id| !backup.favorites.contains(id))
            .cloned()
            .collect()
    }

    /// Usage history keys held here but absent from `backup`
    pub fn usage_missing_from(&self, backup: &EmoteState) -> Vec<String> {
        self.usage_history
            .keys()
            .filter(|key| !backup.usage_history.contains_key(key.as_str()))
            .cloned()
            .collect()
    }

    /// Whether `backup` holds at least everything this state holds
    pub fn is_covered_by(&self, backup: &EmoteState) -> bool {
        backup.favorites.len() >= self.favorites.len()
            && self.favorites_missing_from(backup).is_empty()
            && self.usage_missing_from(backup).is_empty()
    }
}

/// Versioned envelope persisted per category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupRecord {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    pub state: Value,
    #[serde(rename = "savedAt", default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl BackupRecord {
    pub fn new(schema_version: u32, state: Value) -> Self {
        Self {
            schema_version,
            state,
            saved_at: Some(Utc::now()),
        }
    }
}

/// Payload handed to the host's store registration sink
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionedState {
    #[serde(rename = "_version")]
    pub version: u32,
    #[serde(rename = "_state")]
    pub state: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn urls(state: &GifState) -> Vec<&str> {
        state.favorites.iter().map(|f| f.url.as_str()).collect()
    }

    #[test]
    fn test_gif_union_dedupes_by_url() {
        let backup = vec![GifFavorite::new("a"), GifFavorite::new("b")];
        let live = vec![GifFavorite::new("b"), GifFavorite::new("c")];

        let merged = GifState::union(&backup, &live);
        assert_eq!(urls(&merged), vec!["a", "b", "c"]);
        assert_eq!(merged.favorite_count, 3);
    }

    #[test]
    fn test_gif_union_prefers_backup_entry() {
        let mut from_backup = GifFavorite::new("a");
        from_backup.extra.insert("width".to_string(), json!(200));
        let mut from_live = GifFavorite::new("a");
        from_live.extra.insert("width".to_string(), json!(640));

        let merged = GifState::union(&[from_backup.clone()], &[from_live]);
        assert_eq!(merged.favorites, vec![from_backup]);
    }

    #[test]
    fn test_gif_state_keeps_host_fields() {
        let raw = json!({
            "favorites": [{"url": "a", "src": "a.mp4", "format": 2}],
            "timesFavorited": 1
        });
        let state: GifState = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(state.favorites[0].extra["src"], json!("a.mp4"));
        assert_eq!(serde_json::to_value(&state).unwrap(), raw);
    }

    #[test]
    fn test_emote_coverage() {
        let backup: EmoteState = serde_json::from_value(json!({
            "favorites": ["1", "2", "3"],
            "usageHistory": {"1": {"score": 5}, "2": {"score": 1}}
        }))
        .unwrap();
        let live: EmoteState = serde_json::from_value(json!({
            "favorites": ["1", "3"],
            "usageHistory": {"2": {"score": 9}}
        }))
        .unwrap();
        assert!(live.is_covered_by(&backup));

        let diverged: EmoteState = serde_json::from_value(json!({
            "favorites": ["4"],
            "usageHistory": {"7": {}}
        }))
        .unwrap();
        assert!(!diverged.is_covered_by(&backup));
        assert_eq!(diverged.favorites_missing_from(&backup), vec!["4".to_string()]);
        assert_eq!(diverged.usage_missing_from(&backup), vec!["7".to_string()]);
    }

    #[test]
    fn test_emote_coverage_counts_duplicates() {
        let backup = EmoteState {
            favorites: vec!["1".to_string()],
            ..Default::default()
        };
        let live = EmoteState {
            favorites: vec!["1".to_string(), "1".to_string()],
            ..Default::default()
        };
        assert!(!live.is_covered_by(&backup));
    }

    #[test]
    fn test_empty_emote_state() {
        assert!(EmoteState::default().is_empty());
        let state: EmoteState = serde_json::from_value(json!({"usageHistory": {"1": {}}})).unwrap();
        assert!(!state.is_empty());
    }

    #[test]
    fn test_backup_record_envelope() {
        let record = BackupRecord::new(7, json!({"zoom": 110}));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["schemaVersion"], json!(7));
        assert_eq!(value["state"], json!({"zoom": 110}));

        let legacy: BackupRecord =
            serde_json::from_value(json!({"schemaVersion": 2, "state": []})).unwrap();
        assert_eq!(legacy.saved_at, None);
    }
}
