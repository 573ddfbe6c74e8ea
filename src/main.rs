use prefsync::{
    database::{Database, DatabaseConfig},
    host::{
        memory::{ChannelNotifier, LocalEventBus, MemoryIdentity, MemoryLiveStore, MemoryStoreRegistry},
        Host, LiveStore,
    },
    Category, HostEvent, PersistService, SyncConfig,
};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("Starting prefsync demo (v{})", prefsync::VERSION);

    let database = match std::env::args().nth(1) {
        Some(path) => Database::new(DatabaseConfig::file(path)).await?,
        None => Database::new(DatabaseConfig::in_memory()).await?,
    };

    let gifs = Arc::new(MemoryLiveStore::new(json!({
        "favorites": [{"url": "https://media.example/cat.gif", "width": 220, "height": 220}],
        "timesFavorited": 1
    })));
    let emotes = Arc::new(MemoryLiveStore::new(json!({
        "favorites": ["1034567890"],
        "usageHistory": {"1034567890": {"totalUses": 3}}
    })));

    let (notifier, mut prompts) = ChannelNotifier::new();
    let bus = Arc::new(LocalEventBus::new());

    let mut builder = Host::builder()
        .identity(Arc::new(MemoryIdentity::with_user("80351110224678912")))
        .registry(Arc::new(MemoryStoreRegistry::new()))
        .storage(Arc::new(database.settings_storage()))
        .notifier(Arc::new(notifier))
        .bus(bus.clone())
        .live_store(Category::Gifs, gifs.clone())
        .live_store(Category::Emotes, emotes.clone());
    for category in Category::SETTINGS {
        let store: Arc<dyn LiveStore> = Arc::new(MemoryLiveStore::new(json!({})));
        builder = builder.live_store(category, store);
    }

    let service = PersistService::new(builder.build()?, SyncConfig::default())?;
    service.start().await?;

    // A conflict in the demo is settled in favour of the live client
    tokio::spawn(async move {
        while let Some((id, prompt)) = prompts.recv().await {
            info!("{}: {}", id, prompt.body);
            if let Err(e) = prompt.choose_label("Override Backup") {
                info!("Could not answer {}: {}", id, e);
            }
        }
    });

    bus.publish(HostEvent::ConnectionOpen).await;

    gifs.replace(json!({
        "favorites": [
            {"url": "https://media.example/cat.gif"},
            {"url": "https://media.example/dog.gif"}
        ],
        "timesFavorited": 2
    }))
    .await;
    bus.publish(HostEvent::GifFavoriteAdd).await;
    bus.publish(HostEvent::UserSettingsUpdate).await;
    for _ in 0..20 {
        bus.publish(HostEvent::EmojiTrackUsage).await;
    }

    tokio::time::sleep(Duration::from_millis(200)).await;

    let status = service.status().await;
    info!("Session: {:?} ({:?})", status.session, status.restored_by);
    println!("{}", serde_json::to_string_pretty(&status)?);

    service.stop().await?;
    database.close().await;

    info!("Demo completed");
    Ok(())
}
