//! Timeout Sweep
//!
//! Periodic background task enforcing level time limits on sessions
//! the player has stopped touching. Each tick loads the playing
//! sessions, applies the shared timeout transition to every session
//! past its limit, and only then attempts one webhook delivery per
//! terminated session. At most one tick runs at a time; ticks that
//! would overlap an in-flight one are skipped.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, instrument, warn};

use crate::error::GameError;
use crate::game::engine::{ExpireOutcome, MatchEngine};
use crate::store::SessionStore;
use crate::webhook::{GameResult, WebhookNotifier};
use crate::SWEEP_INTERVAL_SECS;

/// The timeout enforcement task.
///
/// Owned by the application context via [`SweeperHandle`]; there is no
/// global scheduler state.
pub struct TimeoutSweeper {
    store: Arc<dyn SessionStore>,
    engine: Arc<MatchEngine>,
    notifier: Arc<WebhookNotifier>,
    period: Duration,
}

impl TimeoutSweeper {
    /// Create a sweeper with the standard period.
    pub fn new(
        store: Arc<dyn SessionStore>,
        engine: Arc<MatchEngine>,
        notifier: Arc<WebhookNotifier>,
    ) -> Self {
        Self {
            store,
            engine,
            notifier,
            period: Duration::from_secs(SWEEP_INTERVAL_SECS),
        }
    }

    /// Override the sweep period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Spawn the background loop, handing ownership of the task to the
    /// returned handle.
    pub fn spawn(self) -> SweeperHandle {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let period = self.period;
        let task = tokio::spawn(self.run(shutdown_rx));
        info!(
            "Game timeout sweeper started (checking every {} seconds)",
            period.as_secs()
        );
        SweeperHandle { shutdown_tx, task }
    }

    #[instrument(name = "timeout_sweep", skip_all)]
    async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = interval(self.period);
        // Sweeps run inside the loop body, so a slow sweep can never
        // overlap the next one; backed-up ticks are dropped.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        error!("Error in timeout sweep: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Game timeout sweeper stopped");
                    break;
                }
            }
        }
    }

    /// Run a single sweep pass. Returns how many sessions were
    /// terminated.
    ///
    /// All terminal transitions are committed before any webhook is
    /// attempted, and one session's failure never aborts the rest of
    /// the batch.
    pub async fn sweep_once(&self) -> Result<usize, GameError> {
        let now = Utc::now();
        let active = self.store.list_active_sessions().await?;
        let mut terminated: Vec<GameResult> = Vec::new();

        for session in active {
            let level = match self.store.get_level(session.level_id).await {
                Ok(Some(level)) => level,
                Ok(None) => {
                    warn!("Game {} references missing level {}", session.id, session.level_id);
                    continue;
                }
                Err(e) => {
                    warn!("Failed to load level for game {}: {}", session.id, e);
                    continue;
                }
            };
            if !session.time_exceeded(&level, now) {
                continue;
            }

            let game_id = session.id;
            match self.engine.expire_session(session, &level).await {
                Ok(ExpireOutcome::Expired(expired, result)) => {
                    info!(
                        "Auto-failed game {} for {} (timeout after {:.2}s)",
                        expired.id, expired.player, expired.time_taken
                    );
                    terminated.push(result);
                }
                Ok(ExpireOutcome::AlreadyTerminal(_)) => {}
                Err(e) => {
                    warn!("Failed to expire game {}: {}", game_id, e);
                }
            }
        }

        if !terminated.is_empty() {
            match self.store.webhook_config().await {
                Ok(config) => {
                    for result in &terminated {
                        // Delivery failures are logged inside the
                        // notifier and do not touch committed state.
                        self.notifier.send_game_result(&config, result).await;
                    }
                }
                Err(e) => {
                    warn!("Failed to load webhook config, skipping timeout webhooks: {}", e);
                }
            }
        }

        Ok(terminated.len())
    }
}

/// Handle owning the running sweep task.
pub struct SweeperHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep loop and wait for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::level::GameLevel;
    use crate::game::session::MatchStatus;
    use crate::store::{MemoryStore, NewSession, SessionStore};

    async fn setup(time_limit: Option<u64>) -> (Arc<MemoryStore>, Arc<MatchEngine>, TimeoutSweeper, GameLevel) {
        let store = Arc::new(MemoryStore::new());
        let level = store
            .insert_level(GameLevel {
                id: 0,
                name: "Timed".to_string(),
                pair_count: 2,
                time_limit,
                points_reward: 10,
                points_penalty: 5,
                is_active: true,
            })
            .await;
        let notifier = Arc::new(WebhookNotifier::new());
        let engine = Arc::new(MatchEngine::new(
            store.clone() as Arc<dyn SessionStore>,
            notifier.clone(),
        ));
        let sweeper = TimeoutSweeper::new(
            store.clone() as Arc<dyn SessionStore>,
            engine.clone(),
            notifier,
        );
        (store, engine, sweeper, level)
    }

    #[tokio::test]
    async fn sweep_fails_expired_sessions() {
        let (store, engine, sweeper, level) = setup(Some(0)).await;
        let view = engine.start("a@x", level.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let terminated = sweeper.sweep_once().await.unwrap();
        assert_eq!(terminated, 1);

        let session = store.get_session(view.id).await.unwrap().unwrap();
        assert_eq!(session.status, MatchStatus::Lose);
        assert_eq!(session.points_change, Some(-5));
        assert!(session.completed_at.is_some());
        assert!(session.time_taken > 0.0);

        // A second sweep finds nothing left to terminate.
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sweep_skips_unlimited_and_fresh_sessions() {
        let (store, engine, sweeper, unlimited) = setup(None).await;
        let fresh = store
            .insert_level(GameLevel {
                id: 0,
                name: "Generous".to_string(),
                pair_count: 2,
                time_limit: Some(3600),
                points_reward: 10,
                points_penalty: 5,
                is_active: true,
            })
            .await;

        engine.start("a@x", unlimited.id).await.unwrap();
        engine.start("a@x", fresh.id).await.unwrap();

        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
        let active = store.list_active_sessions().await.unwrap();
        assert_eq!(active.len(), 2);
    }

    #[tokio::test]
    async fn sweep_survives_session_with_missing_level() {
        let (store, engine, sweeper, level) = setup(Some(0)).await;
        let expired = engine.start("a@x", level.id).await.unwrap();
        // A session pointing at a level that no longer exists sits
        // alongside the expired one in the same batch.
        let dangling = store
            .create_session(NewSession {
                player: "b@x".to_string(),
                level_id: 999,
                deck: Vec::new(),
                flip_duration: 0.6,
                wins_at_start: 0,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let terminated = sweeper.sweep_once().await.unwrap();
        assert_eq!(terminated, 1);

        let session = store.get_session(expired.id).await.unwrap().unwrap();
        assert_eq!(session.status, MatchStatus::Lose);
        // The unresolvable session was skipped, not failed.
        let stranded = store.get_session(dangling.id).await.unwrap().unwrap();
        assert_eq!(stranded.status, MatchStatus::Playing);
    }

    #[tokio::test]
    async fn sweep_races_flip_to_a_single_termination() {
        let (store, engine, sweeper, level) = setup(Some(0)).await;
        let view = engine.start("a@x", level.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        // One interactive flip and one sweep tick race on the same
        // expired session.
        let flip = engine.flip(view.id, 0, 1);
        let sweep = sweeper.sweep_once();
        let (flip_resp, swept) = tokio::join!(flip, sweep);

        let resp = flip_resp.unwrap();
        assert_eq!(resp.message, "Time's up!");
        assert_eq!(resp.game.status, MatchStatus::Lose);

        let session = store.get_session(view.id).await.unwrap().unwrap();
        assert_eq!(session.status, MatchStatus::Lose);
        // The transition happened exactly once: whichever side lost the
        // race observed the terminal state instead of re-terminating.
        assert!(swept.unwrap() <= 1);
        assert_eq!(session.points_change, Some(-5));
    }

    #[tokio::test]
    async fn handle_stops_the_loop() {
        let (_, _, sweeper, _) = setup(None).await;
        let handle = sweeper.with_period(Duration::from_millis(10)).spawn();
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn spawned_sweeper_terminates_sessions() {
        let (store, engine, sweeper, level) = setup(Some(0)).await;
        let view = engine.start("a@x", level.id).await.unwrap();

        let handle = sweeper.with_period(Duration::from_millis(10)).spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;

        let session = store.get_session(view.id).await.unwrap().unwrap();
        assert_eq!(session.status, MatchStatus::Lose);
    }
}
