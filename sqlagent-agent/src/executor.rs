use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use sqlagent_core::{
    Backoff, CallbackManager, LlmRequest, LlmResponse, Retrying, RunContext, RunType, Runnable,
    RunnableExt, TracedRunnable,
};
use sqlagent_prompt::ChatPromptTemplate;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::{
    AgentAction, AgentError, AgentStep, Observation, Scratchpad, ToolCallingOutputParser,
    ToolDispatchError, ToolFailurePolicy, ToolRegistry,
};

type SharedLlm = Arc<dyn Runnable<LlmRequest, LlmResponse> + Send + Sync>;

/// Prompt variable the scratchpad messages are bound to.
pub const SCRATCHPAD_KEY: &str = "agent_scratchpad";

const DEFAULT_MAX_ITERATIONS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    AwaitingModel,
    DispatchingTools,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutcome {
    pub output: String,
    /// Every dispatched action with its observation, in execution order.
    pub intermediate_steps: Vec<(AgentAction, Observation)>,
    pub iterations: u32,
}

/// Runs one agent turn: render the prompt, ask the model, dispatch any
/// requested tools, and repeat until the model answers without tool calls.
pub struct AgentExecutor {
    llm: SharedLlm,
    prompt: ChatPromptTemplate,
    tools: ToolRegistry,
    parser: ToolCallingOutputParser,
    model: String,
    max_iterations: u32,
    max_parallel_tools: usize,
    model_timeout: Option<Duration>,
    tool_timeout: Option<Duration>,
    tool_failure_policy: ToolFailurePolicy,
    callbacks: CallbackManager,
    cancellation: Option<CancellationToken>,
}

impl std::fmt::Debug for AgentExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentExecutor")
            .field("tools", &self.tools)
            .field("model", &self.model)
            .field("max_iterations", &self.max_iterations)
            .field("max_parallel_tools", &self.max_parallel_tools)
            .field("tool_failure_policy", &self.tool_failure_policy)
            .finish()
    }
}

impl AgentExecutor {
    pub fn builder<L>(
        llm: L,
        prompt: ChatPromptTemplate,
        tools: ToolRegistry,
    ) -> AgentExecutorBuilder
    where
        L: Runnable<LlmRequest, LlmResponse> + Send + Sync + 'static,
    {
        AgentExecutorBuilder {
            llm: Arc::new(llm),
            prompt,
            tools,
            model: String::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_parallel_tools: 1,
            model_timeout: None,
            tool_timeout: None,
            tool_failure_policy: ToolFailurePolicy::default(),
            callbacks: CallbackManager::noop(),
            model_attempts: 1,
            backoff: Backoff::default(),
            cancellation: None,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    pub async fn invoke(
        &self,
        variables: HashMap<String, Value>,
    ) -> Result<AgentOutcome, AgentError> {
        let run = RunContext::root(
            RunType::Agent,
            "agent_executor".to_string(),
            Vec::new(),
            BTreeMap::new(),
        );
        let span = tracing::info_span!("agent_turn", run_id = %run.run_id);

        if !self.callbacks.is_noop() {
            let inputs = Value::Object(variables.clone().into_iter().collect());
            self.callbacks.on_start(&run, &inputs).await;
        }

        let result = self.run_loop(&run, variables).instrument(span).await;

        if !self.callbacks.is_noop() {
            let duration_ms = run.start_instant.elapsed().as_millis();
            match &result {
                Ok(outcome) => {
                    let outputs = json!({ "output": outcome.output });
                    self.callbacks.on_end(&run, &outputs, duration_ms).await;
                }
                Err(err) => {
                    let error = json!({ "error": err.to_string() });
                    self.callbacks.on_error(&run, &error, duration_ms).await;
                }
            }
        }

        result
    }

    async fn run_loop(
        &self,
        run: &RunContext,
        variables: HashMap<String, Value>,
    ) -> Result<AgentOutcome, AgentError> {
        let mut scratchpad = Scratchpad::new();
        let mut pending = Vec::new();
        let mut output = String::new();
        let mut phase = AgentPhase::AwaitingModel;

        loop {
            match phase {
                AgentPhase::AwaitingModel => {
                    if scratchpad.iterations() >= self.max_iterations {
                        tracing::warn!(
                            max_iterations = self.max_iterations,
                            "iteration limit reached"
                        );
                        return Err(AgentError::LoopExceeded {
                            max_iterations: self.max_iterations,
                        });
                    }

                    let step = self
                        .cancellable(self.call_model(run, &variables, &scratchpad))
                        .await?;
                    match step {
                        AgentStep::Finish(finish) => {
                            output = finish.output;
                            phase = AgentPhase::Done;
                        }
                        AgentStep::Actions(actions) => {
                            tracing::info!(
                                iteration = scratchpad.iterations() + 1,
                                tools = ?actions.iter().map(|a| &a.tool).collect::<Vec<_>>(),
                                "model requested tools"
                            );
                            pending = actions;
                            phase = AgentPhase::DispatchingTools;
                        }
                    }
                }
                AgentPhase::DispatchingTools => {
                    let actions = std::mem::take(&mut pending);
                    let steps = self.cancellable(self.dispatch_all(run, actions)).await?;
                    scratchpad.push_iteration(steps);
                    phase = AgentPhase::AwaitingModel;
                }
                AgentPhase::Done => {
                    tracing::info!(iterations = scratchpad.iterations(), "agent finished");
                    let iterations = scratchpad.iterations();
                    return Ok(AgentOutcome {
                        output,
                        intermediate_steps: scratchpad.into_steps(),
                        iterations,
                    });
                }
            }
        }
    }

    async fn call_model(
        &self,
        run: &RunContext,
        variables: &HashMap<String, Value>,
        scratchpad: &Scratchpad,
    ) -> Result<AgentStep, AgentError> {
        let mut vars = variables.clone();
        vars.insert(SCRATCHPAD_KEY.to_string(), scratchpad.to_value());
        let messages = self
            .prompt
            .format_messages(&vars)
            .map_err(AgentError::Prompt)?;

        let request = LlmRequest {
            model: self.model.clone(),
            messages,
            tools: self.tools.specs(),
        };
        let traced = TracedRunnable::new(
            Arc::clone(&self.llm),
            self.callbacks.clone(),
            run.clone(),
            RunType::Llm,
            "chat_model".to_string(),
        );

        let pipeline =
            RunnableExt::<LlmRequest, LlmResponse>::then::<AgentStep, _>(traced, self.parser);
        let call = Runnable::<LlmRequest, AgentStep>::invoke(&pipeline, request);
        let result = match self.model_timeout {
            Some(after) => tokio::time::timeout(after, call)
                .await
                .map_err(|_| AgentError::Timeout {
                    operation: "model".to_string(),
                    after,
                })?,
            None => call.await,
        };
        result.map_err(AgentError::ModelInvocation)
    }

    async fn dispatch_all(
        &self,
        run: &RunContext,
        actions: Vec<AgentAction>,
    ) -> Result<Vec<(AgentAction, Observation)>, AgentError> {
        // Nothing runs if any requested name is unknown.
        if let Some(unknown) = actions.iter().find(|a| !self.tools.contains(&a.tool)) {
            tracing::warn!(tool = %unknown.tool, "model requested unknown tool");
            return Err(AgentError::ToolNotFound {
                name: unknown.tool.clone(),
            });
        }

        // Ordered buffering yields results in request order. Returning early drops
        // the stream, so calls not yet started never run.
        let observations = {
            let dispatches = stream::iter(
                actions
                    .iter()
                    .map(|action| self.dispatch_one(run, action)),
            )
            .buffered(self.max_parallel_tools);
            let mut results = std::pin::pin!(dispatches);

            let mut observations = Vec::with_capacity(actions.len());
            while let Some(result) = results.next().await {
                let action = &actions[observations.len()];
                let observation = match result {
                    Ok(observation) => observation,
                    Err(error) => match self.tool_failure_policy.observation_for(&error) {
                        Some(content) => Observation {
                            call_id: action.call_id.clone(),
                            tool: action.tool.clone(),
                            content,
                        },
                        None => return Err(error.into()),
                    },
                };
                observations.push(observation);
            }
            observations
        };

        Ok(actions.into_iter().zip(observations).collect())
    }

    async fn dispatch_one(
        &self,
        run: &RunContext,
        action: &AgentAction,
    ) -> Result<Observation, ToolDispatchError> {
        if self.callbacks.is_noop() {
            return self.tools.dispatch(action, self.tool_timeout).await;
        }

        let ctx = run.child(RunType::Tool, action.tool.clone());
        let inputs = json!({ "call_id": action.call_id, "args": action.tool_input });
        self.callbacks.on_start(&ctx, &inputs).await;

        let result = self.tools.dispatch(action, self.tool_timeout).await;
        let duration_ms = ctx.start_instant.elapsed().as_millis();
        match &result {
            Ok(observation) => {
                let outputs = json!({ "output": observation.content });
                self.callbacks.on_end(&ctx, &outputs, duration_ms).await;
            }
            Err(err) => {
                let error = json!({ "error": err.to_string() });
                self.callbacks.on_error(&ctx, &error, duration_ms).await;
            }
        }
        result
    }

    async fn cancellable<T>(
        &self,
        work: impl Future<Output = Result<T, AgentError>>,
    ) -> Result<T, AgentError> {
        let Some(token) = &self.cancellation else {
            return work.await;
        };
        if token.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(AgentError::Cancelled),
            result = work => result,
        }
    }
}

pub struct AgentExecutorBuilder {
    llm: SharedLlm,
    prompt: ChatPromptTemplate,
    tools: ToolRegistry,
    model: String,
    max_iterations: u32,
    max_parallel_tools: usize,
    model_timeout: Option<Duration>,
    tool_timeout: Option<Duration>,
    tool_failure_policy: ToolFailurePolicy,
    callbacks: CallbackManager,
    model_attempts: usize,
    backoff: Backoff,
    cancellation: Option<CancellationToken>,
}

impl AgentExecutorBuilder {
    /// Model name sent with each request. Empty leaves the choice to the client.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Upper bound on tool calls from one response running at once.
    pub fn max_parallel_tools(mut self, max_parallel_tools: usize) -> Self {
        self.max_parallel_tools = max_parallel_tools.max(1);
        self
    }

    pub fn model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn tool_failure_policy(mut self, policy: ToolFailurePolicy) -> Self {
        self.tool_failure_policy = policy;
        self
    }

    pub fn callbacks(mut self, callbacks: CallbackManager) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Retry transient model failures up to `max_attempts` total attempts.
    pub fn model_retries(mut self, max_attempts: usize, backoff: Backoff) -> Self {
        self.model_attempts = max_attempts;
        self.backoff = backoff;
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn build(self) -> AgentExecutor {
        let llm: SharedLlm = if self.model_attempts > 1 {
            Arc::new(Retrying::new(self.llm, self.model_attempts).backoff(self.backoff))
        } else {
            self.llm
        };

        AgentExecutor {
            llm,
            prompt: self.prompt,
            tools: self.tools,
            parser: ToolCallingOutputParser,
            model: self.model,
            max_iterations: self.max_iterations,
            max_parallel_tools: self.max_parallel_tools,
            model_timeout: self.model_timeout,
            tool_timeout: self.tool_timeout,
            tool_failure_policy: self.tool_failure_policy,
            callbacks: self.callbacks,
            cancellation: self.cancellation,
        }
    }
}
