//! Ask questions about a SQLite database through a tool-calling model.
//!
//! The agent sees the database's table names in its system prompt and can
//! run queries, read table schemas, and write HTML reports. Each turn is
//! recorded in a per-session conversation history.

pub mod config;
pub mod console;

use std::sync::Arc;

use anyhow::Context;
use sqlagent_agent::{
    AgentError, AgentExecutorBuilder, AgentOutcome, RunnableWithMessageHistory, ToolRegistry,
};
use sqlagent_core::{LlmRequest, LlmResponse, Runnable};
use sqlagent_memory::ChatMessageHistory;
use sqlagent_prompt::{ChatPromptTemplate, MessagePromptTemplate};

pub use sqlagent_agent as agent;
pub use sqlagent_core as core;
pub use sqlagent_llm as llm;
pub use sqlagent_memory as memory;
pub use sqlagent_prompt as prompt;
pub use sqlagent_tools as tools;

use sqlagent_agent::AgentExecutor;
use sqlagent_tools::SqlToolkit;

pub const SYSTEM_PROMPT: &str = "You are an AI that has access to a SQLite database.\n\
The database has tables of: {{tables}}\n\
Do not make any assumptions about what tables exist or what columns exist. \
Instead, use the 'describe_tables' function";

/// Turns issued when no prompts are given on the command line.
pub const DEFAULT_PROMPTS: [&str; 2] = [
    "How many orders are there? Write the result to an html report.",
    "Repeat the exact same process for users.",
];

/// System prompt, prior conversation, the user's input, then the scratchpad.
pub fn sql_agent_prompt(tables: &str) -> ChatPromptTemplate {
    ChatPromptTemplate::new(vec![
        MessagePromptTemplate::system(SYSTEM_PROMPT),
        MessagePromptTemplate::placeholder("chat_history"),
        MessagePromptTemplate::human("{{input}}"),
        MessagePromptTemplate::placeholder("agent_scratchpad"),
    ])
    .partial("tables", tables)
}

/// Wire `llm` to the toolkit's tools and a history store. `configure` sets
/// executor limits, callbacks and policies.
pub async fn build_sql_agent<L, F>(
    llm: L,
    toolkit: &SqlToolkit,
    history: Arc<dyn ChatMessageHistory>,
    configure: F,
) -> anyhow::Result<RunnableWithMessageHistory>
where
    L: Runnable<LlmRequest, LlmResponse> + Send + Sync + 'static,
    F: FnOnce(AgentExecutorBuilder) -> AgentExecutorBuilder,
{
    let tables = toolkit
        .database()
        .list_tables()
        .await
        .context("failed to list database tables")?
        .join("\n");
    tracing::info!(tables = %tables.replace('\n', ", "), "loaded table names");

    let tools = toolkit
        .register(ToolRegistry::builder())
        .build()
        .context("failed to register tools")?;

    let executor = configure(AgentExecutor::builder(llm, sql_agent_prompt(&tables), tools)).build();
    Ok(RunnableWithMessageHistory::new(Arc::new(executor), history))
}

/// Run `prompts` in order within one session. A failed turn is reported in
/// its slot and does not stop the turns after it.
pub async fn run_prompts(
    agent: &RunnableWithMessageHistory,
    prompts: &[String],
    session_id: &str,
) -> Vec<Result<AgentOutcome, AgentError>> {
    let mut results = Vec::with_capacity(prompts.len());
    for prompt in prompts {
        results.push(agent.invoke(prompt, session_id).await);
    }
    results
}
