use async_trait::async_trait;
use sqlagent_core::{LlmResponse, Runnable, SqlAgentError};

use crate::{AgentAction, AgentFinish, AgentStep};

/// Classifies a model response: any tool calls make it an action step,
/// otherwise its text is the final answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolCallingOutputParser;

impl ToolCallingOutputParser {
    pub fn parse(&self, response: LlmResponse) -> AgentStep {
        if response.tool_calls.is_empty() {
            return AgentStep::Finish(AgentFinish {
                output: response.content,
            });
        }

        let actions = response
            .tool_calls
            .into_iter()
            .map(|call| {
                let mut action = AgentAction::from(call);
                // Tool messages are matched to calls by id.
                if action.call_id.is_empty() {
                    action.call_id = format!("call_{}", uuid::Uuid::new_v4().simple());
                }
                action
            })
            .collect();
        AgentStep::Actions(actions)
    }
}

#[async_trait]
impl Runnable<LlmResponse, AgentStep> for ToolCallingOutputParser {
    async fn invoke(&self, input: LlmResponse) -> Result<AgentStep, SqlAgentError> {
        Ok(self.parse(input))
    }
}
