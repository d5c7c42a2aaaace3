use async_trait::async_trait;
use sqlagent_core::{Message, SqlAgentError};

pub mod store;
mod store_tests;

pub use store::{InMemoryHistoryStore, TurnGuard};

/// Session-keyed, append-only conversation log.
#[async_trait]
pub trait ChatMessageHistory: Send + Sync {
    /// Messages recorded for `session_id`, oldest first. Unknown sessions are empty.
    async fn get(&self, session_id: &str) -> Result<Vec<Message>, SqlAgentError>;

    async fn append(&self, session_id: &str, message: Message) -> Result<(), SqlAgentError> {
        self.append_many(session_id, vec![message]).await
    }

    /// Append all of `messages` or none of them.
    async fn append_many(
        &self,
        session_id: &str,
        messages: Vec<Message>,
    ) -> Result<(), SqlAgentError>;

    /// Drop every message recorded for `session_id`.
    async fn clear(&self, session_id: &str) -> Result<(), SqlAgentError>;

    /// Wait until no other turn is running for `session_id`, then hold it
    /// until the returned guard is dropped.
    async fn begin_turn(&self, session_id: &str) -> Result<TurnGuard, SqlAgentError>;
}
