//! Persistence Abstraction
//!
//! The session engine only ever talks to storage through the
//! [`SessionStore`] trait. The in-memory implementation in
//! [`memory`] backs the binary and the test suite; SQL-backed
//! implementations are external collaborators.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::game::level::{CardImage, GameLevel};
use crate::game::session::{Card, MatchSession, MatchStatus};
use crate::webhook::WebhookConfig;

pub use memory::MemoryStore;

/// Storage errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// Record does not exist.
    #[error("record not found")]
    NotFound,

    /// A guarded write observed a status other than the expected one.
    #[error("status conflict: expected {expected:?}, found {actual:?}")]
    StatusConflict {
        /// Status the writer expected to replace.
        expected: MatchStatus,
        /// Status actually stored.
        actual: MatchStatus,
    },

    /// Backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Fields for a session about to be created.
///
/// The store assigns the id and initializes the mutable fields
/// (`Playing` status, zero score and moves).
#[derive(Debug, Clone)]
pub struct NewSession {
    /// Player identity (email).
    pub player: String,
    /// Level the session plays.
    pub level_id: u64,
    /// Generated deck.
    pub deck: Vec<Card>,
    /// Flip-back duration snapshot.
    pub flip_duration: f64,
    /// Effective win count snapshot.
    pub wins_at_start: u32,
    /// Session start time.
    pub created_at: DateTime<Utc>,
}

/// Persistence operations required by the session engine.
///
/// Implementations must treat [`save_session`](Self::save_session) as
/// a single atomic compare-and-set: the write succeeds only if the
/// stored status equals the expected one, and the whole session value
/// is replaced as a unit.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session and return it with an assigned id.
    async fn create_session(&self, new: NewSession) -> Result<MatchSession, StoreError>;

    /// Fetch a session by id.
    async fn get_session(&self, id: u64) -> Result<Option<MatchSession>, StoreError>;

    /// All sessions currently in the `Playing` state.
    async fn list_active_sessions(&self) -> Result<Vec<MatchSession>, StoreError>;

    /// A player's terminal Win/Lose sessions on one level, ordered
    /// newest-first by completion time (ties broken by id, newest
    /// first).
    async fn list_history(
        &self,
        player: &str,
        level_id: u64,
    ) -> Result<Vec<MatchSession>, StoreError>;

    /// Replace a stored session, guarded on its expected prior status.
    ///
    /// Returns [`StoreError::StatusConflict`] without writing anything
    /// if the stored status differs from `expected`.
    async fn save_session(
        &self,
        session: &MatchSession,
        expected: MatchStatus,
    ) -> Result<(), StoreError>;

    /// Fetch a level by id.
    async fn get_level(&self, id: u64) -> Result<Option<GameLevel>, StoreError>;

    /// All active levels.
    async fn list_active_levels(&self) -> Result<Vec<GameLevel>, StoreError>;

    /// All active card images, in insertion order.
    async fn list_active_images(&self) -> Result<Vec<CardImage>, StoreError>;

    /// Current webhook destination configuration.
    async fn webhook_config(&self) -> Result<WebhookConfig, StoreError>;
}
