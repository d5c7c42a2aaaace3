use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use sqlagent_core::{Tool, ToolError, ToolSpec};
use tracing::Instrument;

use crate::{AgentAction, Observation, ToolDispatchError, ToolRegistryBuildError};

/// A tool with typed arguments. The JSON schema advertised to the model is
/// derived from `Args`.
#[async_trait]
pub trait TypedTool: Send + Sync + 'static {
    type Args: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + Send;

    const NAME: &'static str;

    fn description(&self) -> &str;

    async fn run(&self, args: Self::Args) -> Result<Self::Output, ToolError>;
}

/// Presents a [`TypedTool`] through the untyped [`Tool`] interface.
pub struct TypedToolAdapter<T> {
    tool: T,
    schema: Value,
}

impl<T: TypedTool> TypedToolAdapter<T> {
    pub fn new(tool: T) -> Self {
        let schema = serde_json::to_value(schemars::schema_for!(T::Args))
            .unwrap_or_else(|_| json!({ "type": "object" }));
        Self { tool, schema }
    }

    pub fn inner(&self) -> &T {
        &self.tool
    }
}

#[async_trait]
impl<T: TypedTool> Tool for TypedToolAdapter<T> {
    fn name(&self) -> &str {
        T::NAME
    }

    fn description(&self) -> &str {
        self.tool.description()
    }

    fn schema(&self) -> Value {
        self.schema.clone()
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let typed_args = serde_json::from_value::<T::Args>(args)
            .map_err(|err| ToolError::InvalidInput(err.to_string()))?;
        let output = self.tool.run(typed_args).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Tools the agent may call, keyed by exact name. Read-only once built.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn builder() -> ToolRegistryBuilder {
        ToolRegistryBuilder::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| &self.tools[slot])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool definitions in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|tool| ToolSpec {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.schema(),
            })
            .collect()
    }

    pub async fn dispatch(
        &self,
        action: &AgentAction,
        timeout: Option<Duration>,
    ) -> Result<Observation, ToolDispatchError> {
        let Some(tool) = self.get(&action.tool) else {
            return Err(ToolDispatchError::NotFound {
                name: action.tool.clone(),
            });
        };

        let span = tracing::info_span!("tool", name = %action.tool, call_id = %action.call_id);
        let call = tool.invoke(action.tool_input.clone()).instrument(span);
        let result = match timeout {
            Some(after) => tokio::time::timeout(after, call).await.map_err(|_| {
                ToolDispatchError::Timeout {
                    name: action.tool.clone(),
                    after,
                }
            })?,
            None => call.await,
        };

        match result {
            Ok(value) => {
                tracing::debug!(tool = %action.tool, "tool completed");
                Ok(Observation {
                    call_id: action.call_id.clone(),
                    tool: action.tool.clone(),
                    content: observation_text(value),
                })
            }
            Err(source) => {
                tracing::warn!(tool = %action.tool, error = %source, "tool failed");
                Err(ToolDispatchError::Execution {
                    name: action.tool.clone(),
                    args: action.tool_input.clone(),
                    source,
                })
            }
        }
    }
}

fn observation_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistryBuilder {
    pub fn register<T>(self, tool: T) -> Self
    where
        T: Tool + 'static,
    {
        self.register_arc(Arc::new(tool))
    }

    pub fn register_arc(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn register_typed<T>(self, tool: T) -> Self
    where
        T: TypedTool,
    {
        self.register(TypedToolAdapter::new(tool))
    }

    pub fn build(self) -> Result<ToolRegistry, ToolRegistryBuildError> {
        let mut seen = HashSet::new();
        let mut index = HashMap::new();

        for (slot, tool) in self.tools.iter().enumerate() {
            let name = tool.name();
            if name.trim().is_empty() {
                return Err(ToolRegistryBuildError::InvalidName {
                    name: name.to_string(),
                });
            }

            if !seen.insert(name.to_string()) {
                return Err(ToolRegistryBuildError::DuplicateName {
                    name: name.to_string(),
                });
            }

            index.insert(name.to_string(), slot);
        }

        Ok(ToolRegistry {
            tools: self.tools,
            index,
        })
    }
}
