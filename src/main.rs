//! Memory Match Server
//!
//! Authoritative session engine for the memory card game.
//! Seeds an in-memory store, runs the timeout sweeper, and plays a
//! demo session through the engine.

use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use memory_match::{
    GameLevel, MatchEngine, MatchStatus, MemoryStore, SessionStore, TimeoutSweeper,
    WebhookConfig, WebhookNotifier, SWEEP_INTERVAL_SECS, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("Memory Match Server v{}", VERSION);
    info!("Timeout sweep interval: {}s", SWEEP_INTERVAL_SECS);

    // Seed the in-memory store
    let store = Arc::new(MemoryStore::new());
    let level = store
        .insert_level(GameLevel {
            id: 0,
            name: "Level 1".to_string(),
            pair_count: 8,
            time_limit: Some(120),
            points_reward: 10,
            points_penalty: 5,
            is_active: true,
        })
        .await;
    info!(
        "Seeded level '{}' ({} pairs, {:?}s limit)",
        level.name, level.pair_count, level.time_limit
    );

    // Webhook destination from the environment, if configured
    let webhook = WebhookConfig {
        url: std::env::var("WEBHOOK_URL").ok(),
        secret: std::env::var("WEBHOOK_SECRET").ok(),
    };
    if webhook.url.is_some() {
        info!("Webhook delivery enabled");
    } else {
        info!("No WEBHOOK_URL configured; results will not be reported");
    }
    store.set_webhook_config(webhook).await;

    let notifier = Arc::new(WebhookNotifier::new());
    let engine = Arc::new(MatchEngine::new(
        store.clone() as Arc<dyn SessionStore>,
        notifier.clone(),
    ));

    // Lifecycle-owned timeout enforcement
    let sweeper = TimeoutSweeper::new(
        store.clone() as Arc<dyn SessionStore>,
        engine.clone(),
        notifier,
    )
    .spawn();

    demo_session(&store, &engine, level.id).await?;

    sweeper.shutdown().await;
    Ok(())
}

/// Play one full session through the engine, matching pairs by reading
/// the authoritative deck from the store.
async fn demo_session(
    store: &MemoryStore,
    engine: &MatchEngine,
    level_id: u64,
) -> anyhow::Result<()> {
    info!("=== Starting Demo Session ===");

    let player = "demo@example.com";
    let view = engine.start(player, level_id).await?;
    info!(
        "Game {} started: {} cards, flip duration {}s, time remaining {:?}s",
        view.id,
        view.cards.len(),
        view.flip_duration,
        view.time_remaining
    );

    // The server knows the deck; pair up positions by value.
    let session = store
        .get_session(view.id)
        .await?
        .expect("demo session exists");
    let mut pairs: std::collections::BTreeMap<String, Vec<usize>> = std::collections::BTreeMap::new();
    for (pos, card) in session.deck.iter().enumerate() {
        pairs.entry(card.value.clone()).or_default().push(pos);
    }

    for positions in pairs.values() {
        let resp = engine.flip(view.id, positions[0], positions[1]).await?;
        info!(
            "Flip ({}, {}): {} (score {}, moves {})",
            positions[0], positions[1], resp.message, resp.game.score, resp.game.moves
        );
        if resp.game.status != MatchStatus::Playing {
            break;
        }
    }

    let final_session = store
        .get_session(view.id)
        .await?
        .expect("demo session exists");
    info!("=== Session Results ===");
    info!(
        "Game {}: {:?}, score {}, {} moves, {:.2}s, points change {:?}",
        final_session.id,
        final_session.status,
        final_session.score,
        final_session.moves,
        final_session.time_taken,
        final_session.points_change
    );

    Ok(())
}
