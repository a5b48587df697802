//! Match State Machine
//!
//! Owns the session lifecycle: start, flip, give-up, and the timeout
//! transition shared with the background sweep. Every terminal
//! transition is committed as a single guarded write expecting the
//! `Playing` status, so a racing flip and sweep cannot double-fire.
//! Webhook notification is dispatched off the critical path after the
//! state change is committed.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::error::GameError;
use crate::game::deck::generate_deck;
use crate::game::difficulty::{effective_wins, flip_duration, score_multiplier};
use crate::game::level::GameLevel;
use crate::game::session::{MatchSession, MatchStatus};
use crate::protocol::{FlipResponse, GameConfig, MatchView};
use crate::store::{NewSession, SessionStore, StoreError};
use crate::webhook::{GameResult, WebhookNotifier};

/// Points added to the running score per matched pair (before the
/// multiplier).
const MATCH_SCORE: u32 = 10;

/// Points removed from the running score per mismatch (before the
/// multiplier). The score never drops below zero.
const MISMATCH_PENALTY: u32 = 2;

/// Result of attempting the timeout transition on a session.
#[derive(Debug)]
pub enum ExpireOutcome {
    /// This caller won the race and terminated the session. Carries
    /// the committed session and the result to report downstream.
    Expired(MatchSession, GameResult),
    /// Another path already terminated the session; carries the
    /// observed terminal state.
    AlreadyTerminal(MatchSession),
}

/// The session state machine.
pub struct MatchEngine {
    store: Arc<dyn SessionStore>,
    notifier: Arc<WebhookNotifier>,
}

impl MatchEngine {
    /// Create an engine over a store and notifier.
    pub fn new(store: Arc<dyn SessionStore>, notifier: Arc<WebhookNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Active levels and images for clients.
    pub async fn game_config(&self) -> Result<GameConfig, GameError> {
        Ok(GameConfig {
            levels: self.store.list_active_levels().await?,
            images: self.store.list_active_images().await?,
        })
    }

    /// Start a new session for a player on a level.
    ///
    /// Derives the difficulty snapshot from the player's history on
    /// this level, generates the deck, and persists the session in the
    /// `Playing` state.
    pub async fn start(&self, player: &str, level_id: u64) -> Result<MatchView, GameError> {
        let level = self
            .store
            .get_level(level_id)
            .await?
            .filter(|l| l.is_active)
            .ok_or(GameError::LevelNotFound)?;

        if level.pair_count == 0 {
            return Err(GameError::InvalidRequest("Level has no card pairs"));
        }

        let history = self.store.list_history(player, level.id).await?;
        let statuses: Vec<MatchStatus> = history.iter().map(|s| s.status).collect();
        let wins = effective_wins(&statuses);
        let duration = flip_duration(wins);

        let images = self.store.list_active_images().await?;
        let deck = generate_deck(level.pair_count, &images);

        let session = self
            .store
            .create_session(NewSession {
                player: player.to_string(),
                level_id: level.id,
                deck,
                flip_duration: duration,
                wins_at_start: wins,
                created_at: Utc::now(),
            })
            .await?;

        info!(
            "Started game {} for {} on level '{}' (effective wins: {}, flip duration: {}s)",
            session.id, player, level.name, wins, duration
        );
        Ok(MatchView::new(&session, &level, Utc::now()))
    }

    /// Flip two card positions.
    ///
    /// If the session has already outlived its time limit the timeout
    /// transition runs instead of the flip and its result is returned
    /// with the "Time's up!" message.
    pub async fn flip(
        &self,
        session_id: u64,
        pos_a: usize,
        pos_b: usize,
    ) -> Result<FlipResponse, GameError> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(GameError::MatchNotFound)?;
        if session.status != MatchStatus::Playing {
            return Err(GameError::InvalidState);
        }

        let level = self
            .store
            .get_level(session.level_id)
            .await?
            .ok_or(GameError::LevelNotFound)?;

        // Time limit first: an expired session loses instead of
        // processing the flip.
        if session.time_exceeded(&level, Utc::now()) {
            let updated = match self.expire_session(session, &level).await? {
                ExpireOutcome::Expired(updated, result) => {
                    self.dispatch_result(result);
                    updated
                }
                ExpireOutcome::AlreadyTerminal(current) => current,
            };
            return Ok(FlipResponse {
                game: MatchView::new(&updated, &level, Utc::now()),
                is_match: false,
                message: "Time's up!".to_string(),
            });
        }

        let deck_len = session.deck.len();
        if pos_a >= deck_len || pos_b >= deck_len {
            return Err(GameError::InvalidRequest("Invalid card indices"));
        }
        if pos_a == pos_b {
            return Err(GameError::InvalidRequest("Cannot flip the same card twice"));
        }
        if session.deck[pos_a].matched || session.deck[pos_b].matched {
            return Err(GameError::InvalidRequest("Card already matched"));
        }

        let multiplier = score_multiplier(session.wins_at_start);
        let mut updated = session;
        updated.moves += 1;

        let is_match = updated.deck[pos_a].value == updated.deck[pos_b].value;
        let mut message;
        let mut win_result = None;

        if is_match {
            for pos in [pos_a, pos_b] {
                updated.deck[pos].matched = true;
                updated.deck[pos].face_up = true;
            }
            updated.score += MATCH_SCORE * multiplier;
            message = "Match found!";

            if updated.all_matched() {
                let now = Utc::now();
                updated.status = MatchStatus::Win;
                updated.completed_at = Some(now);
                updated.time_taken = updated.elapsed_seconds(now);
                updated.points_change = Some(level.points_reward * multiplier as i64);
                message = "You Won!";
                win_result = Some(GameResult {
                    game_id: updated.id,
                    player_email: updated.player.clone(),
                    won: true,
                    score: updated.score,
                    moves: updated.moves,
                    time_taken: updated.time_taken,
                    matches_found: updated.matches_found(),
                    level_name: level.name.clone(),
                    points_change: level.points_reward * multiplier as i64,
                });
            }
        } else {
            for pos in [pos_a, pos_b] {
                updated.deck[pos].face_up = false;
            }
            updated.score = updated.score.saturating_sub(MISMATCH_PENALTY * multiplier);
            message = "No match";
        }

        self.save_playing(&updated).await?;

        if let Some(result) = win_result {
            info!(
                "Game {} won by {} ({} moves, {:.2}s)",
                updated.id, updated.player, updated.moves, updated.time_taken
            );
            self.dispatch_result(result);
        }

        Ok(FlipResponse {
            game: MatchView::new(&updated, &level, Utc::now()),
            is_match,
            message: message.to_string(),
        })
    }

    /// Abandon a session.
    ///
    /// Terminal sessions cannot be abandoned again; that would
    /// overwrite a prior outcome's completion data.
    pub async fn give_up(&self, session_id: u64) -> Result<MatchView, GameError> {
        let session = self
            .store
            .get_session(session_id)
            .await?
            .ok_or(GameError::MatchNotFound)?;
        if session.status != MatchStatus::Playing {
            return Err(GameError::InvalidState);
        }

        let level = self
            .store
            .get_level(session.level_id)
            .await?
            .ok_or(GameError::LevelNotFound)?;

        let multiplier = score_multiplier(session.wins_at_start);
        let penalty = level.points_penalty * multiplier as i64;

        let mut updated = session;
        updated.status = MatchStatus::Abandoned;
        updated.completed_at = Some(Utc::now());
        updated.points_change = Some(-penalty);

        self.save_playing(&updated).await?;

        info!("Game {} abandoned by {}", updated.id, updated.player);
        self.dispatch_result(GameResult {
            game_id: updated.id,
            player_email: updated.player.clone(),
            won: false,
            score: updated.score,
            moves: updated.moves,
            time_taken: 0.0,
            matches_found: 0,
            level_name: level.name.clone(),
            points_change: -penalty,
        });

        Ok(MatchView::new(&updated, &level, Utc::now()))
    }

    /// The timeout transition, shared by the interactive flip path and
    /// the background sweep.
    ///
    /// Commits `Playing -> Lose` under the status guard. The losing
    /// racer gets back the already-terminal state and must not notify.
    pub async fn expire_session(
        &self,
        session: MatchSession,
        level: &GameLevel,
    ) -> Result<ExpireOutcome, GameError> {
        let now = Utc::now();
        let multiplier = score_multiplier(session.wins_at_start);
        let penalty = level.points_penalty * multiplier as i64;

        let mut expired = session;
        expired.status = MatchStatus::Lose;
        expired.completed_at = Some(now);
        expired.time_taken = expired.elapsed_seconds(now);
        expired.points_change = Some(-penalty);

        match self
            .store
            .save_session(&expired, MatchStatus::Playing)
            .await
        {
            Ok(()) => {
                info!(
                    "Game {} timed out for {} after {:.2}s",
                    expired.id, expired.player, expired.time_taken
                );
                let result = GameResult {
                    game_id: expired.id,
                    player_email: expired.player.clone(),
                    won: false,
                    score: expired.score,
                    moves: expired.moves,
                    time_taken: expired.time_taken,
                    matches_found: 0,
                    level_name: level.name.clone(),
                    points_change: -penalty,
                };
                Ok(ExpireOutcome::Expired(expired, result))
            }
            Err(StoreError::StatusConflict { .. }) => {
                let current = self
                    .store
                    .get_session(expired.id)
                    .await?
                    .ok_or(GameError::MatchNotFound)?;
                Ok(ExpireOutcome::AlreadyTerminal(current))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Fire-and-forget notification dispatch. Runs after the state
    /// transition has committed; a slow or unreachable endpoint never
    /// delays the caller.
    fn dispatch_result(&self, result: GameResult) {
        let store = Arc::clone(&self.store);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let config = match store.webhook_config().await {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to load webhook config for game {}: {}", result.game_id, e);
                    return;
                }
            };
            notifier.send_game_result(&config, &result).await;
        });
    }

    /// Guarded write expecting a `Playing` session. A status conflict
    /// means another path terminated the session first.
    async fn save_playing(&self, session: &MatchSession) -> Result<(), GameError> {
        match self
            .store
            .save_session(session, MatchStatus::Playing)
            .await
        {
            Ok(()) => Ok(()),
            Err(StoreError::StatusConflict { .. }) => Err(GameError::InvalidState),
            Err(e) => Err(e.into()),
        }
    }
}
