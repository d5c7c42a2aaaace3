use async_trait::async_trait;

use crate::callbacks::{CallbackHandler, RunContext};
use crate::{Message, Value};

/// Emits one `tracing` event per run boundary.
#[derive(Clone, Debug, Default)]
pub struct TracingHandler;

#[async_trait]
impl CallbackHandler for TracingHandler {
    async fn on_start(&self, ctx: &RunContext, _inputs: &Value) {
        tracing::debug!(
            run_id = %ctx.run_id,
            trace_id = %ctx.trace_id,
            run_type = ctx.run_type.as_str(),
            name = %ctx.name,
            "run started"
        );
    }

    async fn on_end(&self, ctx: &RunContext, _outputs: &Value, duration_ms: u128) {
        tracing::debug!(
            run_id = %ctx.run_id,
            run_type = ctx.run_type.as_str(),
            name = %ctx.name,
            duration_ms = duration_ms as u64,
            "run finished"
        );
    }

    async fn on_error(&self, ctx: &RunContext, error: &Value, duration_ms: u128) {
        tracing::warn!(
            run_id = %ctx.run_id,
            run_type = ctx.run_type.as_str(),
            name = %ctx.name,
            duration_ms = duration_ms as u64,
            error = %error,
            "run failed"
        );
    }

    async fn on_chat_model_start(&self, ctx: &RunContext, messages: &[Message]) {
        for message in messages {
            tracing::trace!(
                run_id = %ctx.run_id,
                role = message.role.as_str(),
                tool_calls = message.tool_calls.len(),
                content = %message.content,
                "sending message"
            );
        }
    }
}
