use super::{decode_state, Reconciler, RestoreOutcome};
use crate::{
    error::Result,
    types::{Category, GifFavorite, GifState},
};
use serde_json::Value;
use tracing::{debug, info};

/// Backed up GIF state; early backups stored the bare favourites list
fn decode_gif_backup(value: Value) -> Result<GifState> {
    match value {
        Value::Array(_) => {
            let favorites: Vec<GifFavorite> = decode_state(Category::Gifs, value)?;
            Ok(GifState::from_favorites(favorites))
        }
        other => decode_state(Category::Gifs, other),
    }
}

impl Reconciler {
    pub(super) async fn gif_backup_payload(&self) -> Result<Value> {
        let live: GifState = decode_state(Category::Gifs, self.live.snapshot(Category::Gifs).await?)?;
        Ok(serde_json::to_value(GifState::union(&[], &live.favorites))?)
    }

    pub(super) async fn restore_gifs(&self) -> Result<RestoreOutcome> {
        let key = Category::Gifs.backup_key(None);
        let record = self
            .backups
            .load_or_bare_list(&key, Category::Gifs.schema_version())
            .await?;
        let Some(record) = record else {
            self.backup_to(Category::Gifs, &key).await?;
            return Ok(RestoreOutcome::BackedUp);
        };

        let backup = decode_gif_backup(record.state)?;
        let live: GifState = decode_state(Category::Gifs, self.live.snapshot(Category::Gifs).await?)?;
        let merged = GifState::union(&backup.favorites, &live.favorites);

        debug!(
            "Merged {} backed up and {} live gifs into {}",
            backup.favorites.len(),
            live.favorites.len(),
            merged.favorite_count
        );

        self.live.apply(Category::Gifs, serde_json::to_value(&merged)?).await?;
        info!("Successfully restored your gifs!");
        Ok(RestoreOutcome::Restored)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::Fixture;
    use super::*;
    use serde_json::json;

    fn gifs(urls: &[&str]) -> Value {
        let favorites: Vec<_> = urls.iter().map(|url| json!({"url": url, "src": format!("{}.mp4", url)})).collect();
        json!({"favorites": favorites, "timesFavorited": urls.len()})
    }

    fn live_urls(state: &Value) -> Vec<String> {
        state["favorites"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["url"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_restore_unions_backup_and_live() {
        let fx = Fixture::new();
        fx.seed_backup("gifs", Category::Gifs, gifs(&["a", "b"])).await;
        fx.store(Category::Gifs).replace(gifs(&["b", "c"])).await;

        let outcome = fx.reconciler.restore(Category::Gifs).await.unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored);

        let state = fx.store(Category::Gifs).snapshot().await;
        assert_eq!(live_urls(&state), vec!["a", "b", "c"]);
        assert_eq!(state["timesFavorited"], json!(3));
        assert_eq!(state["favorites"][0]["src"], json!("a.mp4"));

        let registered = fx.registry.get("GIFFavoritesStore").await.unwrap();
        assert_eq!(registered.version, 2);
    }

    #[tokio::test]
    async fn test_restore_writes_even_when_live_is_superset() {
        let fx = Fixture::new();
        fx.seed_backup("gifs", Category::Gifs, gifs(&["a"])).await;
        fx.store(Category::Gifs).replace(gifs(&["a", "b"])).await;

        fx.reconciler.restore(Category::Gifs).await.unwrap();
        fx.reconciler.restore(Category::Gifs).await.unwrap();

        let state = fx.store(Category::Gifs).snapshot().await;
        assert_eq!(live_urls(&state), vec!["a", "b"]);
        assert_eq!(fx.store(Category::Gifs).initializations(), 2);
    }

    #[tokio::test]
    async fn test_legacy_list_backup() {
        use crate::host::SettingsStorage;
        let fx = Fixture::new();
        fx.storage.set("gifs", &json!([{"url": "x"}, {"url": "y"}])).await.unwrap();
        fx.store(Category::Gifs).replace(json!({"favorites": [{"url": "y"}, {"url": "z"}]})).await;

        let outcome = fx.reconciler.restore(Category::Gifs).await.unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored);

        let state = fx.store(Category::Gifs).snapshot().await;
        assert_eq!(live_urls(&state), vec!["x", "y", "z"]);
        assert_eq!(state["timesFavorited"], json!(3));
        assert_eq!(fx.registry.get("GIFFavoritesStore").await.unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_envelope_with_list_state() {
        let fx = Fixture::new();
        fx.seed_backup("gifs", Category::Gifs, json!([{"url": "x"}])).await;
        fx.store(Category::Gifs).replace(json!(null)).await;

        fx.reconciler.restore(Category::Gifs).await.unwrap();
        let state = fx.store(Category::Gifs).snapshot().await;
        assert_eq!(live_urls(&state), vec!["x"]);
        assert_eq!(state["timesFavorited"], json!(1));
    }

    #[tokio::test]
    async fn test_backup_drops_duplicate_urls() {
        let fx = Fixture::new();
        fx.store(Category::Gifs)
            .replace(json!({"favorites": [{"url": "a", "width": 1}, {"url": "a", "width": 2}, {"url": "b"}]}))
            .await;

        fx.reconciler.backup(Category::Gifs).await.unwrap();
        let stored = fx.stored_state("gifs").await.unwrap();
        assert_eq!(live_urls(&stored), vec!["a", "b"]);
        assert_eq!(stored["favorites"][0]["width"], json!(1));
        assert_eq!(stored["timesFavorited"], json!(2));
    }

    #[tokio::test]
    async fn test_backup_recounts_favorites() {
        let fx = Fixture::new();
        fx.store(Category::Gifs)
            .replace(json!({"favorites": [{"url": "a"}, {"url": "b"}], "timesFavorited": 9}))
            .await;

        fx.reconciler.backup(Category::Gifs).await.unwrap();
        let stored = fx.stored_state("gifs").await.unwrap();
        assert_eq!(stored["timesFavorited"], json!(2));
    }

    #[tokio::test]
    async fn test_first_run_backfill() {
        let fx = Fixture::new();
        fx.store(Category::Gifs).replace(gifs(&["a"])).await;

        let outcome = fx.reconciler.restore(Category::Gifs).await.unwrap();
        assert_eq!(outcome, RestoreOutcome::BackedUp);
        assert_eq!(fx.store(Category::Gifs).initializations(), 0);
        assert_eq!(fx.storage.write_count(), 1);
    }
}
