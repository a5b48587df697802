//! Client-Facing Views
//!
//! Request and response shapes produced by the engine for a client.
//! Transport wiring (HTTP routes, CORS) lives outside the core; these
//! types only fix the JSON surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::level::{CardImage, GameLevel};
use crate::game::session::{Card, MatchSession, MatchStatus};

/// Request to start a new game session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartGameRequest {
    /// Player identity.
    pub player_email: String,
    /// Level to play.
    pub level_id: u64,
}

/// Request to flip two card positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FlipRequest {
    /// First deck position.
    pub card_index_1: usize,
    /// Second deck position.
    pub card_index_2: usize,
}

/// Snapshot of a session as seen by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchView {
    /// Session id.
    pub id: u64,
    /// Player identity.
    pub player_email: String,
    /// Level id.
    pub level_id: u64,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Running score.
    pub score: u32,
    /// Flip moves taken.
    pub moves: u32,
    /// Elapsed seconds at termination; zero while playing.
    pub time_taken: f64,
    /// Seconds left before timeout. Absent without a limit or once the
    /// session is terminal.
    pub time_remaining: Option<u64>,
    /// Card flip-back duration for this session.
    pub flip_duration: f64,
    /// Effective win count snapshot taken at start.
    pub consecutive_wins: u32,
    /// Points awarded or deducted; absent while playing.
    pub points_change: Option<i64>,
    /// The deck.
    pub cards: Vec<Card>,
    /// Session start time.
    pub created_at: DateTime<Utc>,
    /// Termination time; absent while playing.
    pub completed_at: Option<DateTime<Utc>>,
}

impl MatchView {
    /// Build a view of a session, deriving the remaining time from the
    /// level's limit.
    pub fn new(session: &MatchSession, level: &GameLevel, now: DateTime<Utc>) -> Self {
        Self {
            id: session.id,
            player_email: session.player.clone(),
            level_id: session.level_id,
            status: session.status,
            score: session.score,
            moves: session.moves,
            time_taken: session.time_taken,
            time_remaining: session.time_remaining(level, now),
            flip_duration: session.flip_duration,
            consecutive_wins: session.wins_at_start,
            points_change: session.points_change,
            cards: session.deck.clone(),
            created_at: session.created_at,
            completed_at: session.completed_at,
        }
    }
}

/// Response to a flip request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlipResponse {
    /// Updated session view.
    #[serde(rename = "match")]
    pub game: MatchView,
    /// Whether the two cards matched.
    pub is_match: bool,
    /// Short result message.
    pub message: String,
}

/// Active configuration handed to clients: playable levels and the
/// card image pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Active levels.
    pub levels: Vec<GameLevel>,
    /// Active card images.
    pub images: Vec<CardImage>,
}
