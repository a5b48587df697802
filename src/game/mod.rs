//! Game Logic Module
//!
//! Server-authoritative match logic.
//!
//! ## Module Structure
//!
//! - `level`: Level and card image records
//! - `session`: Session state, cards, lifecycle status
//! - `deck`: Paired deck generation and shuffling
//! - `difficulty`: Hidden difficulty from session history
//! - `engine`: The match state machine

pub mod deck;
pub mod difficulty;
pub mod engine;
pub mod level;
pub mod session;

// Re-export key types
pub use deck::{generate_deck, CARD_ICONS};
pub use difficulty::{effective_wins, flip_duration, score_multiplier};
pub use engine::{ExpireOutcome, MatchEngine};
pub use level::{CardImage, GameLevel};
pub use session::{Card, MatchSession, MatchStatus};
