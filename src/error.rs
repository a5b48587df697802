//! Game Error Taxonomy
//!
//! Client-facing errors surfaced by the match engine. Persistence
//! failures are wrapped; webhook delivery failures never appear here.

use crate::store::StoreError;

/// Errors returned by match engine operations.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Requested level does not exist or is inactive.
    #[error("Level not found")]
    LevelNotFound,

    /// Requested match session does not exist.
    #[error("Match not found")]
    MatchNotFound,

    /// Operation requires a session that is still in play.
    #[error("Game is over")]
    InvalidState,

    /// Request was malformed, with a specific reason.
    #[error("{0}")]
    InvalidRequest(&'static str),

    /// Persistence failure. Fatal to the operation; no partial state
    /// is left behind.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}
