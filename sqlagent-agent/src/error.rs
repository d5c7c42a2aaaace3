use std::time::Duration;

use serde_json::Value;
use sqlagent_core::{SqlAgentError, ToolError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model invocation failed: {0}")]
    ModelInvocation(#[source] SqlAgentError),
    #[error("model requested unknown tool '{name}'")]
    ToolNotFound { name: String },
    #[error("tool '{tool}' failed with args {args}: {source}")]
    ToolExecution {
        tool: String,
        args: Value,
        #[source]
        source: ToolError,
    },
    #[error("agent stopped after {max_iterations} tool iterations without a final answer")]
    LoopExceeded { max_iterations: u32 },
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },
    #[error("agent turn cancelled")]
    Cancelled,
    #[error("prompt rendering failed: {0}")]
    Prompt(#[source] SqlAgentError),
    #[error("history store failed: {0}")]
    History(#[source] SqlAgentError),
}

#[derive(Debug, Error)]
pub enum ToolDispatchError {
    #[error("unknown tool '{name}'")]
    NotFound { name: String },
    #[error("tool '{name}' failed: {source}")]
    Execution {
        name: String,
        args: Value,
        #[source]
        source: ToolError,
    },
    #[error("tool '{name}' timed out after {after:?}")]
    Timeout { name: String, after: Duration },
}

impl From<ToolDispatchError> for AgentError {
    fn from(error: ToolDispatchError) -> Self {
        match error {
            ToolDispatchError::NotFound { name } => AgentError::ToolNotFound { name },
            ToolDispatchError::Execution { name, args, source } => AgentError::ToolExecution {
                tool: name,
                args,
                source,
            },
            ToolDispatchError::Timeout { name, after } => AgentError::Timeout {
                operation: format!("tool '{name}'"),
                after,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolRegistryBuildError {
    #[error("tool name must not be empty or whitespace: {name:?}")]
    InvalidName { name: String },
    #[error("duplicate tool name: {name}")]
    DuplicateName { name: String },
}
