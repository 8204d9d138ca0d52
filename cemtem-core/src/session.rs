//! Per-identity conversation state.
//!
//! Provides the [`SessionStore`] port and an in-memory implementation. Sessions
//! are ephemeral: losing them on restart only means users type `/start` again.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::flow::Step;
use crate::identity::Identity;
use crate::rates::RateEntry;

/// Conversation state for one identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Current step in the conversation flow.
    pub step: Step,
    /// Guided rate entry in progress; takes priority over `step` while set.
    pub rate_entry: Option<RateEntry>,
    /// Last time this session handled an event.
    pub touched_at: DateTime<Utc>,
}

impl Session {
    /// A fresh session at the root menu.
    pub fn new() -> Self {
        Self {
            step: Step::Root,
            rate_entry: None,
            touched_at: Utc::now(),
        }
    }

    /// Mark the session as active now.
    pub fn touch(&mut self) {
        self.touched_at = Utc::now();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Port for session state storage.
///
/// The router serialises events per identity, so implementations only need
/// to be safe for concurrent access across different identities.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session for `identity`, if any.
    async fn get(&self, identity: &Identity) -> Option<Session>;

    /// Store (or replace) the session for `identity`.
    async fn set(&self, identity: &Identity, session: Session);

    /// Remove the session for `identity`. Returns whether one existed.
    async fn delete(&self, identity: &Identity) -> bool;

    /// Remove every session idle for longer than `max_idle`.
    ///
    /// Returns the number of sessions removed.
    async fn evict_stale(&self, max_idle: Duration) -> usize;
}

/// Session store backed by a process-local hash map.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<Identity, Session>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, identity: &Identity) -> Option<Session> {
        self.sessions.read().await.get(identity).cloned()
    }

    async fn set(&self, identity: &Identity, session: Session) {
        self.sessions
            .write()
            .await
            .insert(identity.clone(), session);
    }

    async fn delete(&self, identity: &Identity) -> bool {
        self.sessions.write().await.remove(identity).is_some()
    }

    async fn evict_stale(&self, max_idle: Duration) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(max_idle)
            .ok()
            .and_then(|idle| Utc::now().checked_sub_signed(idle))
        else {
            return 0;
        };
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.touched_at >= cutoff);
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "Evicted idle sessions");
        }
        evicted
    }
}
