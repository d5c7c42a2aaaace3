use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use sqlagent_core::Message;
use sqlagent_memory::ChatMessageHistory;

use crate::{AgentError, AgentExecutor, AgentOutcome};

/// Runs agent turns against a session's stored history.
///
/// Prior messages are bound under `history_messages_key` and the user's text
/// under `input_messages_key`. The user/assistant pair is appended only when
/// the turn succeeds, so a failed turn leaves history untouched.
pub struct RunnableWithMessageHistory {
    executor: Arc<AgentExecutor>,
    history: Arc<dyn ChatMessageHistory>,
    input_messages_key: String,
    history_messages_key: String,
}

impl RunnableWithMessageHistory {
    pub fn new(executor: Arc<AgentExecutor>, history: Arc<dyn ChatMessageHistory>) -> Self {
        Self {
            executor,
            history,
            input_messages_key: "input".to_string(),
            history_messages_key: "chat_history".to_string(),
        }
    }

    pub fn input_messages_key(mut self, key: impl Into<String>) -> Self {
        self.input_messages_key = key.into();
        self
    }

    pub fn history_messages_key(mut self, key: impl Into<String>) -> Self {
        self.history_messages_key = key.into();
        self
    }

    pub fn history(&self) -> &Arc<dyn ChatMessageHistory> {
        &self.history
    }

    pub async fn invoke(&self, input: &str, session_id: &str) -> Result<AgentOutcome, AgentError> {
        let _turn = self
            .history
            .begin_turn(session_id)
            .await
            .map_err(AgentError::History)?;

        let prior = self
            .history
            .get(session_id)
            .await
            .map_err(AgentError::History)?;
        tracing::debug!(session_id, prior = prior.len(), "loaded history");

        let mut variables = HashMap::new();
        variables.insert(
            self.input_messages_key.clone(),
            Value::String(input.to_string()),
        );
        variables.insert(
            self.history_messages_key.clone(),
            serde_json::to_value(prior)
                .map_err(|err| AgentError::History(err.into()))?,
        );

        let outcome = match self.executor.invoke(variables).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(session_id, error = %err, "turn failed; history unchanged");
                return Err(err);
            }
        };

        self.history
            .append_many(
                session_id,
                vec![
                    Message::user(input),
                    Message::assistant(outcome.output.clone()),
                ],
            )
            .await
            .map_err(AgentError::History)?;

        Ok(outcome)
    }
}
