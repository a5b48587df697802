//! Match Session State
//!
//! The authoritative record of one game session. Sessions are never
//! deleted: terminal sessions form the append-only history that feeds
//! difficulty derivation for future sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::level::GameLevel;

/// A single card in the deck.
///
/// Cards are identified by their position in the deck (0-based); the
/// position carries no ordering guarantee and is unrelated to pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    /// Pair value: an icon or image URL. Occurs exactly twice per deck.
    pub value: String,
    /// Permanently revealed once its pair has been found.
    pub matched: bool,
    /// Currently face-up. Matched cards stay face-up.
    pub face_up: bool,
}

impl Card {
    /// Create a new face-down, unmatched card.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            matched: false,
            face_up: false,
        }
    }
}

/// Session lifecycle status.
///
/// Transitions are monotonic and one-way: `Playing` is the only
/// non-terminal state, and a terminal session never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    /// Session in progress, accepting flips.
    Playing,
    /// All pairs found before the time limit.
    Win,
    /// Time limit exceeded.
    Lose,
    /// Player gave up.
    Abandoned,
}

impl MatchStatus {
    /// Whether this is a terminal state.
    pub fn is_terminal(self) -> bool {
        match self {
            MatchStatus::Playing => false,
            MatchStatus::Win | MatchStatus::Lose | MatchStatus::Abandoned => true,
        }
    }
}

/// One game session.
///
/// `flip_duration` and `wins_at_start` are snapshots taken when the
/// session is created and never recomputed. `points_change` and
/// `completed_at` are written exactly once, at the terminal transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSession {
    /// Record identifier (also the webhook `game_id`).
    pub id: u64,
    /// Player identity (email).
    pub player: String,
    /// Level this session plays.
    pub level_id: u64,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Running display score. Never negative.
    pub score: u32,
    /// Number of flip moves taken.
    pub moves: u32,
    /// Elapsed seconds at termination. Zero while playing.
    pub time_taken: f64,
    /// Card flip-back duration snapshot (hidden difficulty).
    pub flip_duration: f64,
    /// Effective win count snapshot taken at session start.
    pub wins_at_start: u32,
    /// Points awarded or deducted. `None` while playing; set exactly
    /// once on termination.
    pub points_change: Option<i64>,
    /// The deck. Length is always `2 * pair_count`.
    pub deck: Vec<Card>,
    /// Session start time.
    pub created_at: DateTime<Utc>,
    /// Termination time. `None` while playing.
    pub completed_at: Option<DateTime<Utc>>,
}

impl MatchSession {
    /// Seconds elapsed since the session started.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> f64 {
        (now - self.created_at).num_milliseconds() as f64 / 1000.0
    }

    /// Whether the session has outlived the level's time limit.
    pub fn time_exceeded(&self, level: &GameLevel, now: DateTime<Utc>) -> bool {
        match level.time_limit {
            Some(limit) => self.elapsed_seconds(now) > limit as f64,
            None => false,
        }
    }

    /// Seconds remaining before timeout.
    ///
    /// `None` if the session is no longer playing or the level has no
    /// time limit. Clamped at zero.
    pub fn time_remaining(&self, level: &GameLevel, now: DateTime<Utc>) -> Option<u64> {
        if self.status != MatchStatus::Playing {
            return None;
        }
        let limit = level.time_limit?;
        let remaining = limit as f64 - self.elapsed_seconds(now);
        Some(remaining.max(0.0) as u64)
    }

    /// Number of pairs found so far.
    pub fn matches_found(&self) -> u32 {
        (self.deck.iter().filter(|c| c.matched).count() / 2) as u32
    }

    /// Whether every card has been matched.
    pub fn all_matched(&self) -> bool {
        !self.deck.is_empty() && self.deck.iter().all(|c| c.matched)
    }
}
