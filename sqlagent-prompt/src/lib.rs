//! Prompt templates that render chat messages from named variables.

mod chat;
mod template;

pub use chat::{ChatPromptTemplate, MessagePromptTemplate};
pub use template::PromptTemplate;
