use serde_json::Value;
use sqlagent_core::{Message, ToolCall};

use crate::{AgentAction, Observation};

#[derive(Debug, Clone, Default)]
struct Iteration {
    steps: Vec<(AgentAction, Observation)>,
}

/// Tool calls and observations gathered during one turn.
#[derive(Debug, Clone, Default)]
pub struct Scratchpad {
    iterations: Vec<Iteration>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one model round-trip's actions with their observations, in
    /// request order.
    pub fn push_iteration(&mut self, steps: Vec<(AgentAction, Observation)>) {
        self.iterations.push(Iteration { steps });
    }

    pub fn iterations(&self) -> u32 {
        self.iterations.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    pub fn steps(&self) -> impl Iterator<Item = &(AgentAction, Observation)> {
        self.iterations.iter().flat_map(|iteration| iteration.steps.iter())
    }

    pub fn into_steps(self) -> Vec<(AgentAction, Observation)> {
        self.iterations
            .into_iter()
            .flat_map(|iteration| iteration.steps)
            .collect()
    }

    /// Each iteration becomes an assistant message carrying its tool calls,
    /// followed by one tool message per observation.
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages = Vec::new();
        for iteration in &self.iterations {
            let calls: Vec<ToolCall> = iteration
                .steps
                .iter()
                .map(|(action, _)| ToolCall::from(action))
                .collect();
            messages.push(Message::assistant_tool_calls("", calls));
            messages.extend(
                iteration
                    .steps
                    .iter()
                    .map(|(_, observation)| {
                        Message::tool(observation.call_id.clone(), observation.content.clone())
                    }),
            );
        }
        messages
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self.to_messages()).unwrap_or(Value::Array(Vec::new()))
    }
}
