use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use sqlagent_core::{Runnable, SqlAgentError};
use sqlagent_llm::{LlmRequest, Message, OpenAiCompatibleClient, ToolCall, ToolSpec};

fn client(server: &MockServer) -> OpenAiCompatibleClient {
    OpenAiCompatibleClient::builder()
        .base_url(&server.base_url())
        .expect("base url")
        .api_key("sk-test")
        .default_model("gpt-test")
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client")
}

fn request(messages: Vec<Message>) -> LlmRequest {
    LlmRequest {
        model: String::new(),
        messages,
        tools: vec![],
    }
}

#[tokio::test]
async fn invoke_maps_text_response() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .header("authorization", "Bearer sk-test")
            .json_body_partial(r#"{"model":"gpt-test","stream":false}"#);
        then.status(200).json_body(json!({
            "id": "chatcmpl-1",
            "model": "gpt-test",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "There are 1500 orders."},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }));
    });

    let response = client(&server)
        .invoke(request(vec![Message::user("How many orders?")]))
        .await
        .expect("invoke");

    assert_eq!(response.content, "There are 1500 orders.");
    assert!(response.tool_calls.is_empty());
    mock.assert();
}

#[tokio::test]
async fn invoke_decodes_tool_call_arguments() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(json!({
            "id": "chatcmpl-2",
            "model": "gpt-test",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {
                            "id": "call_a",
                            "type": "function",
                            "function": {"name": "describe_tables", "arguments": "{\"table_names\":[\"orders\"]}"}
                        },
                        {
                            "id": "call_b",
                            "type": "function",
                            "function": {"name": "list_nothing", "arguments": ""}
                        }
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }));
    });

    let response = client(&server)
        .invoke(request(vec![Message::user("describe orders")]))
        .await
        .expect("invoke");

    assert_eq!(response.content, "");
    assert_eq!(
        response.tool_calls,
        vec![
            ToolCall {
                id: "call_a".to_string(),
                name: "describe_tables".to_string(),
                args: json!({"table_names": ["orders"]}),
            },
            ToolCall {
                id: "call_b".to_string(),
                name: "list_nothing".to_string(),
                args: json!({}),
            },
        ]
    );
}

#[tokio::test]
async fn invoke_sends_tools_and_tool_messages_in_wire_format() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .json_body_partial(
                r#"{
                    "tools": [{"type": "function", "function": {"name": "run_sqlite_query"}}],
                    "messages": [
                        {"role": "user", "content": "count"},
                        {"role": "assistant", "content": null, "tool_calls": [
                            {"id": "c1", "type": "function", "function": {"name": "run_sqlite_query", "arguments": "{\"query\":\"SELECT 1\"}"}}
                        ]},
                        {"role": "tool", "content": "[[1]]", "tool_call_id": "c1"}
                    ]
                }"#,
            );
        then.status(200).json_body(json!({
            "choices": [{"message": {"role": "assistant", "content": "1"}, "finish_reason": "stop"}]
        }));
    });

    let call = ToolCall {
        id: "c1".to_string(),
        name: "run_sqlite_query".to_string(),
        args: json!({"query": "SELECT 1"}),
    };
    let mut req = request(vec![
        Message::user("count"),
        Message::assistant_tool_calls("", vec![call]),
        Message::tool("c1", "[[1]]"),
    ]);
    req.tools = vec![ToolSpec {
        name: "run_sqlite_query".to_string(),
        description: "Run a sqlite query.".to_string(),
        parameters: json!({"type": "object"}),
    }];

    let response = client(&server).invoke(req).await.expect("invoke");
    assert_eq!(response.content, "1");
    mock.assert();
}

#[tokio::test]
async fn server_errors_are_retryable_provider_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(503)
            .json_body(json!({"error": {"message": "overloaded", "type": "server_error"}}));
    });

    let err = client(&server)
        .invoke(request(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(&err, SqlAgentError::LlmProvider(msg) if msg.contains("overloaded")));
    assert!(sqlagent_core::is_retryable(&err));
}

#[tokio::test]
async fn client_errors_are_not_retryable() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(401)
            .json_body(json!({"error": {"message": "bad key", "type": "auth"}}));
    });

    let err = client(&server)
        .invoke(request(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(&err, SqlAgentError::InvalidConfig(msg) if msg.contains("bad key")));
    assert!(!sqlagent_core::is_retryable(&err));
}

#[tokio::test]
async fn malformed_tool_arguments_fail_to_parse() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [{"id": "x", "type": "function", "function": {"name": "run_sqlite_query", "arguments": "{not json"}}]
                }
            }]
        }));
    });

    let err = client(&server)
        .invoke(request(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, SqlAgentError::ParseFailed { .. }));
}

#[tokio::test]
async fn empty_choices_fail_to_parse() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(200).json_body(json!({"id": "empty", "choices": []}));
    });

    let err = client(&server)
        .invoke(request(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    assert!(matches!(err, SqlAgentError::ParseFailed { .. }));
}
