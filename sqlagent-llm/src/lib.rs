// OpenAI-compatible chat completions client
pub mod openai_compatible;

pub use openai_compatible::{
    ChatCompletionRequest, ChatCompletionResponse, OpenAiCompatibleBuilder, OpenAiCompatibleClient,
};
pub use sqlagent_core::{LlmRequest, LlmResponse, Message, Role, ToolCall, ToolSpec};
