//! In-Memory Session Store
//!
//! Reference [`SessionStore`] implementation backing the binary and
//! the test suite. Uses BTreeMap for stable iteration order and a
//! single lock around all tables so the guarded session write is
//! atomic.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::game::level::{CardImage, GameLevel};
use crate::game::session::{MatchSession, MatchStatus};
use crate::store::{NewSession, SessionStore, StoreError};
use crate::webhook::WebhookConfig;

/// In-memory store.
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

struct Inner {
    levels: BTreeMap<u64, GameLevel>,
    images: BTreeMap<u64, CardImage>,
    sessions: BTreeMap<u64, MatchSession>,
    webhook: WebhookConfig,
    next_level_id: u64,
    next_image_id: u64,
    next_session_id: u64,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                levels: BTreeMap::new(),
                images: BTreeMap::new(),
                sessions: BTreeMap::new(),
                webhook: WebhookConfig::default(),
                next_level_id: 1,
                next_image_id: 1,
                next_session_id: 1,
            }),
        }
    }

    /// Insert a level, assigning its id. Seeding helper; level
    /// administration proper lives outside the core.
    pub async fn insert_level(&self, mut level: GameLevel) -> GameLevel {
        let mut inner = self.inner.write().await;
        level.id = inner.next_level_id;
        inner.next_level_id += 1;
        inner.levels.insert(level.id, level.clone());
        level
    }

    /// Insert a card image, assigning its id.
    pub async fn insert_image(&self, mut image: CardImage) -> CardImage {
        let mut inner = self.inner.write().await;
        image.id = inner.next_image_id;
        inner.next_image_id += 1;
        inner.images.insert(image.id, image.clone());
        image
    }

    /// Replace the webhook destination configuration.
    pub async fn set_webhook_config(&self, config: WebhookConfig) {
        let mut inner = self.inner.write().await;
        inner.webhook = config;
    }

    /// Total number of stored sessions.
    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, new: NewSession) -> Result<MatchSession, StoreError> {
        let mut inner = self.inner.write().await;
        let id = inner.next_session_id;
        inner.next_session_id += 1;

        let session = MatchSession {
            id,
            player: new.player,
            level_id: new.level_id,
            status: MatchStatus::Playing,
            score: 0,
            moves: 0,
            time_taken: 0.0,
            flip_duration: new.flip_duration,
            wins_at_start: new.wins_at_start,
            points_change: None,
            deck: new.deck,
            created_at: new.created_at,
            completed_at: None,
        };
        inner.sessions.insert(id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, id: u64) -> Result<Option<MatchSession>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.sessions.get(&id).cloned())
    }

    async fn list_active_sessions(&self) -> Result<Vec<MatchSession>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .sessions
            .values()
            .filter(|s| s.status == MatchStatus::Playing)
            .cloned()
            .collect())
    }

    async fn list_history(
        &self,
        player: &str,
        level_id: u64,
    ) -> Result<Vec<MatchSession>, StoreError> {
        let inner = self.inner.read().await;
        let mut history: Vec<MatchSession> = inner
            .sessions
            .values()
            .filter(|s| {
                s.player == player
                    && s.level_id == level_id
                    && matches!(s.status, MatchStatus::Win | MatchStatus::Lose)
                    && s.completed_at.is_some()
            })
            .cloned()
            .collect();
        history.sort_by_key(|s| Reverse((s.completed_at, s.id)));
        Ok(history)
    }

    async fn save_session(
        &self,
        session: &MatchSession,
        expected: MatchStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .sessions
            .get_mut(&session.id)
            .ok_or(StoreError::NotFound)?;
        if stored.status != expected {
            return Err(StoreError::StatusConflict {
                expected,
                actual: stored.status,
            });
        }
        *stored = session.clone();
        Ok(())
    }

    async fn get_level(&self, id: u64) -> Result<Option<GameLevel>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.levels.get(&id).cloned())
    }

    async fn list_active_levels(&self) -> Result<Vec<GameLevel>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.levels.values().filter(|l| l.is_active).cloned().collect())
    }

    async fn list_active_images(&self) -> Result<Vec<CardImage>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.images.values().filter(|i| i.is_active).cloned().collect())
    }

    async fn webhook_config(&self) -> Result<WebhookConfig, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.webhook.clone())
    }
}
