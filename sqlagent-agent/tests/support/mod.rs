#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use sqlagent_agent::{ToolError, ToolRegistry, TypedTool};
use sqlagent_core::{LlmRequest, LlmResponse, Runnable, SqlAgentError, ToolCall};
use sqlagent_prompt::{ChatPromptTemplate, MessagePromptTemplate};

/// Replays canned responses and records every request it receives.
#[derive(Clone, Default)]
pub struct ScriptedLlm {
    responses: Arc<Mutex<VecDeque<Result<LlmResponse, SqlAgentError>>>>,
    requests: Arc<Mutex<Vec<LlmRequest>>>,
    repeat: Option<LlmResponse>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            ..Self::default()
        }
    }

    pub fn with_results(results: Vec<Result<LlmResponse, SqlAgentError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(results.into_iter().collect())),
            ..Self::default()
        }
    }

    /// Answers every request with `response`.
    pub fn repeating(response: LlmResponse) -> Self {
        Self {
            repeat: Some(response),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Runnable<LlmRequest, LlmResponse> for ScriptedLlm {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, SqlAgentError> {
        self.requests.lock().unwrap().push(input);
        if let Some(response) = &self.repeat {
            return Ok(response.clone());
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SqlAgentError::Custom("script exhausted".to_string())))
    }
}

pub fn call(id: &str, name: &str, args: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        args,
    }
}

pub fn prompt() -> ChatPromptTemplate {
    ChatPromptTemplate::new(vec![
        MessagePromptTemplate::system("You are a test agent."),
        MessagePromptTemplate::placeholder("chat_history"),
        MessagePromptTemplate::human("{{input}}"),
        MessagePromptTemplate::placeholder("agent_scratchpad"),
    ])
}

pub fn input(text: &str) -> HashMap<String, Value> {
    HashMap::from([("input".to_string(), json!(text))])
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddArgs {
    pub a: i64,
    pub b: i64,
}

pub struct AddTool {
    pub calls: Arc<Mutex<u32>>,
}

impl AddTool {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait]
impl TypedTool for AddTool {
    type Args = AddArgs;
    type Output = i64;

    const NAME: &'static str = "add";

    fn description(&self) -> &str {
        "Add two integers"
    }

    async fn run(&self, args: Self::Args) -> Result<Self::Output, ToolError> {
        *self.calls.lock().unwrap() += 1;
        Ok(args.a + args.b)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EchoArgs {
    pub text: String,
    #[serde(default)]
    pub delay_ms: u64,
}

pub struct EchoTool;

#[async_trait]
impl TypedTool for EchoTool {
    type Args = EchoArgs;
    type Output = String;

    const NAME: &'static str = "echo";

    fn description(&self) -> &str {
        "Echo text back after an optional delay"
    }

    async fn run(&self, args: Self::Args) -> Result<Self::Output, ToolError> {
        if args.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
        }
        Ok(args.text)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct FailArgs {}

pub struct FailTool;

#[async_trait]
impl TypedTool for FailTool {
    type Args = FailArgs;
    type Output = Value;

    const NAME: &'static str = "fail";

    fn description(&self) -> &str {
        "Always fails"
    }

    async fn run(&self, _args: Self::Args) -> Result<Self::Output, ToolError> {
        Err(ToolError::ExecutionFailed("boom".to_string()))
    }
}

pub fn registry() -> ToolRegistry {
    ToolRegistry::builder()
        .register_typed(AddTool::new())
        .register_typed(EchoTool)
        .register_typed(FailTool)
        .build()
        .unwrap()
}
