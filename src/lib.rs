//! # Memory Match Session Engine
//!
//! Server-authoritative session engine for a memory card matching game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 MEMORY MATCH SESSION ENGINE                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  game/            - Match logic                              │
//! │  ├── level.rs     - Level and card image records             │
//! │  ├── session.rs   - Session state and lifecycle status       │
//! │  ├── deck.rs      - Paired deck generation and shuffling     │
//! │  ├── difficulty.rs- Hidden difficulty from session history   │
//! │  └── engine.rs    - Match state machine (start/flip/give-up) │
//! │                                                              │
//! │  store/           - Persistence abstraction                  │
//! │  ├── mod.rs       - SessionStore trait (guarded CAS writes)  │
//! │  └── memory.rs    - In-memory implementation                 │
//! │                                                              │
//! │  sweep.rs         - Background time-limit enforcement        │
//! │  webhook.rs       - Signed best-effort result callbacks      │
//! │  protocol.rs      - Client-facing views                      │
//! │  error.rs         - Client-facing error taxonomy             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Race Safety
//!
//! A flip request and the timeout sweep can both try to terminate the
//! same session. Every terminal transition is committed as one atomic
//! compare-and-set guarded on the `Playing` status: the losing racer
//! observes the already-set terminal state instead of overwriting it,
//! and never fires a second notification. Webhook delivery happens
//! off the critical path after the transition has committed.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod game;
pub mod protocol;
pub mod store;
pub mod sweep;
pub mod webhook;

// Re-export commonly used types
pub use error::GameError;
pub use game::engine::MatchEngine;
pub use game::level::{CardImage, GameLevel};
pub use game::session::{Card, MatchSession, MatchStatus};
pub use protocol::{FlipRequest, FlipResponse, GameConfig, MatchView, StartGameRequest};
pub use store::{MemoryStore, NewSession, SessionStore, StoreError};
pub use sweep::{SweeperHandle, TimeoutSweeper};
pub use webhook::{GameResult, WebhookConfig, WebhookNotifier};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Seconds between timeout sweep passes
pub const SWEEP_INTERVAL_SECS: u64 = 5;

/// Webhook delivery timeout in seconds
pub const WEBHOOK_TIMEOUT_SECS: u64 = 10;
