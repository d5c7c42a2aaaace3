mod support;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlagent_agent::{
    AgentAction, ToolDispatchError, ToolError, ToolRegistry, ToolRegistryBuildError,
    TypedToolAdapter,
};
use sqlagent_core::Tool;
use support::{AddTool, EchoTool, FailTool};

struct NamedTool(&'static str);

#[async_trait]
impl Tool for NamedTool {
    fn name(&self) -> &str {
        self.0
    }

    fn description(&self) -> &str {
        "named"
    }

    fn schema(&self) -> Value {
        json!({"type": "object"})
    }

    async fn invoke(&self, _args: Value) -> Result<Value, ToolError> {
        Ok(json!({"rows": [[1]]}))
    }
}

fn action(tool: &str, args: Value) -> AgentAction {
    AgentAction {
        call_id: "call-1".to_string(),
        tool: tool.to_string(),
        tool_input: args,
    }
}

#[test]
fn builder_rejects_blank_names() {
    let err = ToolRegistry::builder()
        .register(NamedTool("  "))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ToolRegistryBuildError::InvalidName {
            name: "  ".to_string()
        }
    );
}

#[test]
fn builder_rejects_duplicate_names() {
    let err = ToolRegistry::builder()
        .register(NamedTool("dup"))
        .register(NamedTool("dup"))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        ToolRegistryBuildError::DuplicateName {
            name: "dup".to_string()
        }
    );
    assert_eq!(err.to_string(), "duplicate tool name: dup");
}

#[test]
fn specs_follow_registration_order_and_carry_schemas() {
    let registry = support::registry();
    assert_eq!(registry.names(), vec!["add", "echo", "fail"]);

    let specs = registry.specs();
    assert_eq!(specs[0].name, "add");
    assert_eq!(specs[0].description, "Add two integers");
    let properties = &specs[0].parameters["properties"];
    assert!(properties.get("a").is_some());
    assert!(properties.get("b").is_some());
}

#[tokio::test]
async fn unknown_tool_is_not_found() {
    let registry = support::registry();
    let err = registry
        .dispatch(&action("drop_tables", json!({})), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ToolDispatchError::NotFound { name } if name == "drop_tables"));
}

#[tokio::test]
async fn observation_matches_direct_invocation() {
    let registry = ToolRegistry::builder()
        .register(NamedTool("rows"))
        .build()
        .unwrap();

    let direct = NamedTool("rows").invoke(json!({})).await.unwrap();
    let observation = registry
        .dispatch(&action("rows", json!({})), None)
        .await
        .unwrap();

    assert_eq!(observation.call_id, "call-1");
    assert_eq!(observation.tool, "rows");
    assert_eq!(observation.content, direct.to_string());
}

#[tokio::test]
async fn string_results_pass_through_verbatim() {
    let registry = support::registry();
    let observation = registry
        .dispatch(&action("echo", json!({"text": "hello \"world\""})), None)
        .await
        .unwrap();
    assert_eq!(observation.content, "hello \"world\"");
}

#[tokio::test]
async fn invalid_args_are_execution_errors() {
    let registry = support::registry();
    let err = registry
        .dispatch(&action("add", json!({"a": "one", "b": 2})), None)
        .await
        .unwrap_err();
    match err {
        ToolDispatchError::Execution { name, args, source } => {
            assert_eq!(name, "add");
            assert_eq!(args, json!({"a": "one", "b": 2}));
            assert!(matches!(source, ToolError::InvalidInput(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn tool_failures_keep_their_cause() {
    let registry = support::registry();
    let err = registry
        .dispatch(&action("fail", json!({})), None)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "tool 'fail' failed: execution failed: boom");
}

#[tokio::test(start_paused = true)]
async fn slow_tools_time_out() {
    let registry = support::registry();
    let err = registry
        .dispatch(
            &action("echo", json!({"text": "late", "delay_ms": 5_000})),
            Some(Duration::from_secs(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ToolDispatchError::Timeout { name, after } if name == "echo" && after == Duration::from_secs(1)
    ));
}

#[tokio::test]
async fn typed_adapter_exposes_name_and_schema() {
    let adapter = TypedToolAdapter::new(AddTool::new());
    assert_eq!(adapter.name(), "add");
    assert_eq!(adapter.schema()["type"], "object");
    assert_eq!(adapter.invoke(json!({"a": 2, "b": 3})).await.unwrap(), json!(5));

    let shared: Arc<dyn Tool> = Arc::new(TypedToolAdapter::new(FailTool));
    let registry = ToolRegistry::builder()
        .register_arc(shared)
        .register_typed(EchoTool)
        .build()
        .unwrap();
    assert_eq!(registry.len(), 2);
    assert!(registry.contains("fail"));
}
