use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlagent_core::ToolCall;

/// One tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentAction {
    pub call_id: String,
    pub tool: String,
    pub tool_input: Value,
}

impl From<ToolCall> for AgentAction {
    fn from(call: ToolCall) -> Self {
        Self {
            call_id: call.id,
            tool: call.name,
            tool_input: call.args,
        }
    }
}

impl From<&AgentAction> for ToolCall {
    fn from(action: &AgentAction) -> Self {
        ToolCall {
            id: action.call_id.clone(),
            name: action.tool.clone(),
            args: action.tool_input.clone(),
        }
    }
}

/// Result of one dispatched action, keyed by the action's call id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub call_id: String,
    pub tool: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentFinish {
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AgentStep {
    /// Tool calls in the order the model listed them.
    Actions(Vec<AgentAction>),
    Finish(AgentFinish),
}
