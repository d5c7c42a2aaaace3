use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlagent_core::{Message, SqlAgentError};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;

use crate::ChatMessageHistory;

/// Exclusive hold on one session's turn slot.
#[derive(Debug)]
pub struct TurnGuard {
    session_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl TurnGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[derive(Debug)]
struct SessionEntry {
    messages: Vec<Message>,
    last_active: Instant,
    turn_lock: Arc<Mutex<()>>,
}

impl SessionEntry {
    fn new(now: Instant) -> Self {
        Self {
            messages: Vec::new(),
            last_active: now,
            turn_lock: Arc::new(Mutex::new(())),
        }
    }

    // The store holds one reference; any other means a TurnGuard is alive.
    fn turn_in_flight(&self) -> bool {
        Arc::strong_count(&self.turn_lock) > 1
    }
}

/// Process-local history store. Sessions are created on first use and live
/// until evicted explicitly or, when `max_idle` is set, by [`evict_idle`].
///
/// [`evict_idle`]: InMemoryHistoryStore::evict_idle
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    max_idle: Option<Duration>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = Some(max_idle);
        self
    }

    pub async fn sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self, session_id: &str) -> usize {
        self.sessions
            .read()
            .await
            .get(session_id)
            .map_or(0, |entry| entry.messages.len())
    }

    /// Remove a session entirely. Returns whether it was removed; a session
    /// with a turn in flight is left in place and reports `false`.
    pub async fn evict(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get(session_id) {
            Some(entry) if entry.turn_in_flight() => {
                tracing::debug!(session_id, "turn in flight; session kept");
                false
            }
            Some(_) => {
                sessions.remove(session_id);
                tracing::debug!(session_id, "evicted session");
                true
            }
            None => false,
        }
    }

    /// Remove sessions idle for longer than `max_idle`, skipping any with a
    /// turn in flight. Returns the number removed; a no-op without `max_idle`.
    pub async fn evict_idle(&self) -> usize {
        let Some(max_idle) = self.max_idle else {
            return 0;
        };
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.turn_in_flight() || now.saturating_duration_since(entry.last_active) <= max_idle
        });
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "evicted idle sessions");
        }
        removed
    }
}

#[async_trait]
impl ChatMessageHistory for InMemoryHistoryStore {
    async fn get(&self, session_id: &str) -> Result<Vec<Message>, SqlAgentError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .map(|entry| entry.messages.clone())
            .unwrap_or_default())
    }

    async fn append_many(
        &self,
        session_id: &str,
        messages: Vec<Message>,
    ) -> Result<(), SqlAgentError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry::new(now));
        entry.messages.extend(messages);
        entry.last_active = now;
        Ok(())
    }

    async fn clear(&self, session_id: &str) -> Result<(), SqlAgentError> {
        if let Some(entry) = self.sessions.write().await.get_mut(session_id) {
            entry.messages.clear();
            entry.last_active = Instant::now();
        }
        Ok(())
    }

    async fn begin_turn(&self, session_id: &str) -> Result<TurnGuard, SqlAgentError> {
        let lock = {
            let now = Instant::now();
            let mut sessions = self.sessions.write().await;
            let entry = sessions
                .entry(session_id.to_string())
                .or_insert_with(|| SessionEntry::new(now));
            entry.last_active = now;
            Arc::clone(&entry.turn_lock)
        };

        let guard = lock.lock_owned().await;
        Ok(TurnGuard {
            session_id: session_id.to_string(),
            _guard: guard,
        })
    }
}
