pub mod callbacks;
mod chain;
mod error;
mod llm;
mod retry;
mod runnable;
mod tool;
mod value;

pub use callbacks::{
    ensure_object, CallbackHandler, CallbackManager, RunContext, RunType, TracedRunnable,
    TracingHandler,
};
pub use chain::{Chain, RunnableExt};
pub use error::SqlAgentError;
pub use llm::{LlmRequest, LlmResponse, Message, Role, ToolCall, ToolSpec};
pub use retry::{is_retryable, Backoff, Retrying};
pub use runnable::Runnable;
pub use tool::{Tool, ToolError};
pub use value::{TryFromValue, Value};
