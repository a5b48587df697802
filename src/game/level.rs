//! Level and Card Image Records
//!
//! Configuration records consumed by the session engine. Administration
//! of these records (CRUD, uploads) lives outside the core; a level is
//! treated as immutable for the lifetime of any session playing it.

use serde::{Deserialize, Serialize};

/// A playable difficulty level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameLevel {
    /// Record identifier.
    pub id: u64,
    /// Unique display name, e.g. "Level 1" or "Hard".
    pub name: String,
    /// Number of card pairs in the deck (deck length is twice this).
    pub pair_count: u32,
    /// Session time limit in seconds. `None` disables timeout
    /// enforcement for sessions on this level.
    pub time_limit: Option<u64>,
    /// Points awarded on a win (before the streak multiplier).
    pub points_reward: i64,
    /// Points deducted on a loss or abandon (before the multiplier).
    pub points_penalty: i64,
    /// Inactive levels cannot start new sessions.
    pub is_active: bool,
}

/// An uploaded image used as a card face value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardImage {
    /// Record identifier.
    pub id: u64,
    /// Image URL; doubles as the card pair value.
    pub url: String,
    /// Optional display name.
    pub name: Option<String>,
    /// Inactive images are excluded from new decks.
    pub is_active: bool,
}
