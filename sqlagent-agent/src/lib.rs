//! Tool-calling agent loop: classify model output, dispatch tools, feed
//! observations back, and keep per-session history around each turn.

mod action;
mod error;
mod executor;
mod history;
mod parser;
mod policy;
mod scratchpad;
mod tool;

pub use action::{AgentAction, AgentFinish, AgentStep, Observation};
pub use error::{AgentError, ToolDispatchError, ToolRegistryBuildError};
pub use executor::{AgentExecutor, AgentExecutorBuilder, AgentOutcome, AgentPhase, SCRATCHPAD_KEY};
pub use history::RunnableWithMessageHistory;
pub use parser::ToolCallingOutputParser;
pub use policy::ToolFailurePolicy;
pub use scratchpad::Scratchpad;
pub use tool::{ToolRegistry, ToolRegistryBuilder, TypedTool, TypedToolAdapter};
pub use tokio_util::sync::CancellationToken;

pub type ToolError = sqlagent_core::ToolError;
