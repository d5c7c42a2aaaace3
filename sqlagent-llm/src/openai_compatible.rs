//! Generic OpenAI-compatible LLM client
//!
//! Supports any provider using OpenAI's chat-completions format (OpenAI, Azure
//! proxies, local gateways). Tool calls travel as `function.arguments` JSON
//! strings on the wire and are decoded into structured [`ToolCall`] args.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlagent_core::{
    LlmRequest, LlmResponse, Message, Role, Runnable, SqlAgentError, ToolCall, ToolSpec, Value,
};
use url::Url;

const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";

/// Request body for chat completions endpoint
#[derive(Serialize, Debug, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireMessage {
    pub role: String,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: WireFunctionCall,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WireFunctionCall {
    pub name: String,
    /// JSON-encoded argument object.
    #[serde(default)]
    pub arguments: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WireTool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct WireFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

fn function_type() -> String {
    "function".to_string()
}

/// Non-streaming response from chat completions
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: WireMessage,
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// OpenAI-style error response
#[derive(Deserialize, Debug, Clone)]
pub struct OpenAiError {
    pub error: ErrorDetail,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    pub code: Option<String>,
}

fn map_tool_call(call: ToolCall) -> Result<WireToolCall, SqlAgentError> {
    let arguments = serde_json::to_string(&call.args)?;
    Ok(WireToolCall {
        id: call.id,
        kind: function_type(),
        function: WireFunctionCall {
            name: call.name,
            arguments,
        },
    })
}

fn map_message(message: Message) -> Result<WireMessage, SqlAgentError> {
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .into_iter()
                .map(map_tool_call)
                .collect::<Result<Vec<_>, _>>()?,
        )
    };

    // Assistant turns that only carry tool calls send a null content.
    let content = if message.role == Role::Assistant
        && tool_calls.is_some()
        && message.content.is_empty()
    {
        None
    } else {
        Some(message.content)
    };

    Ok(WireMessage {
        role: message.role.as_str().to_string(),
        content,
        tool_call_id: message.tool_call_id,
        tool_calls,
    })
}

fn map_tool_spec(spec: ToolSpec) -> WireTool {
    WireTool {
        kind: function_type(),
        function: WireFunction {
            name: spec.name,
            description: spec.description,
            parameters: spec.parameters,
        },
    }
}

fn decode_tool_call(call: WireToolCall) -> Result<ToolCall, SqlAgentError> {
    let raw = call.function.arguments.trim();
    let args = if raw.is_empty() {
        Value::Object(Default::default())
    } else {
        serde_json::from_str(raw).map_err(|err| SqlAgentError::ParseFailed {
            output: call.function.arguments.clone(),
            reason: format!("tool call arguments for '{}': {err}", call.function.name),
        })?
    };
    Ok(ToolCall {
        id: call.id,
        name: call.function.name,
        args,
    })
}

/// Map the first choice of a completion into the provider-neutral response.
pub fn decode_response(response: ChatCompletionResponse) -> Result<LlmResponse, SqlAgentError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| SqlAgentError::ParseFailed {
            output: response.id.clone(),
            reason: "completion has no choices".to_string(),
        })?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(decode_tool_call)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
    })
}

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    http: Client,
    endpoint: Url,
    api_key: Option<SecretString>,
    default_model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("default_model", &self.default_model)
            .field("has_api_key", &self.api_key.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Default)]
pub struct OpenAiCompatibleBuilder {
    base_url: Option<Url>,
    api_key: Option<SecretString>,
    default_model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
}

impl OpenAiCompatibleBuilder {
    pub fn base_url(mut self, base_url: &str) -> Result<Self, SqlAgentError> {
        let mut url = Url::parse(base_url)
            .map_err(|err| SqlAgentError::InvalidConfig(format!("invalid base url: {err}")))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = Some(url);
        Ok(self)
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<OpenAiCompatibleClient, SqlAgentError> {
        let base_url = self
            .base_url
            .ok_or_else(|| SqlAgentError::InvalidConfig("base url is required".to_string()))?;
        let endpoint = base_url
            .join(CHAT_COMPLETIONS_PATH)
            .map_err(|err| SqlAgentError::InvalidConfig(format!("invalid endpoint: {err}")))?;
        let default_model = self
            .default_model
            .filter(|model| !model.trim().is_empty())
            .ok_or_else(|| SqlAgentError::InvalidConfig("default model is required".to_string()))?;
        let timeout = self.timeout.unwrap_or(Duration::from_secs(60));
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SqlAgentError::LlmProvider(err.to_string()))?;

        Ok(OpenAiCompatibleClient {
            http,
            endpoint,
            api_key: self.api_key,
            default_model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout,
        })
    }
}

impl OpenAiCompatibleClient {
    pub fn builder() -> OpenAiCompatibleBuilder {
        OpenAiCompatibleBuilder::default()
    }

    pub fn set_default_model(&mut self, model: impl Into<String>) {
        self.default_model = model.into();
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn build_request(&self, input: LlmRequest) -> Result<ChatCompletionRequest, SqlAgentError> {
        let LlmRequest {
            model,
            messages,
            tools,
        } = input;
        let model = if model.is_empty() {
            self.default_model.clone()
        } else {
            model
        };
        let messages = messages
            .into_iter()
            .map(map_message)
            .collect::<Result<Vec<_>, _>>()?;
        let tools = if tools.is_empty() {
            None
        } else {
            Some(tools.into_iter().map(map_tool_spec).collect())
        };

        Ok(ChatCompletionRequest {
            model,
            messages,
            tools,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        })
    }

    fn map_transport_error(&self, err: reqwest::Error) -> SqlAgentError {
        if err.is_timeout() {
            SqlAgentError::Timeout(self.timeout)
        } else {
            SqlAgentError::LlmProvider(err.to_string())
        }
    }
}

// 429 and 5xx are worth retrying; other 4xx mean the request itself is wrong.
fn map_status_error(status: StatusCode, body: &str) -> SqlAgentError {
    let message = serde_json::from_str::<OpenAiError>(body)
        .map(|err| err.error.message)
        .unwrap_or_else(|_| body.to_string());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        SqlAgentError::LlmProvider(format!("{status}: {message}"))
    } else {
        SqlAgentError::InvalidConfig(format!("provider rejected request ({status}): {message}"))
    }
}

#[async_trait::async_trait]
impl Runnable<LlmRequest, LlmResponse> for OpenAiCompatibleClient {
    async fn invoke(&self, input: LlmRequest) -> Result<LlmResponse, SqlAgentError> {
        let request = self.build_request(input)?;
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "sending chat completion"
        );

        let mut builder = self.http.post(self.endpoint.clone()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| self.map_transport_error(err))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| self.map_transport_error(err))?;

        if !status.is_success() {
            let error = map_status_error(status, &body);
            tracing::warn!(%status, error = %error, "chat completion failed");
            return Err(error);
        }

        let completion: ChatCompletionResponse =
            serde_json::from_str(&body).map_err(|err| SqlAgentError::ParseFailed {
                output: body.clone(),
                reason: err.to_string(),
            })?;
        if let Some(usage) = &completion.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "chat completion usage"
            );
        }

        decode_response(completion)
    }
}
