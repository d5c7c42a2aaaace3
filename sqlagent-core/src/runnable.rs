use async_trait::async_trait;

use crate::SqlAgentError;

/// A unit of work that turns an `Input` into an `Output`.
///
/// Prompts, model clients, output parsers and whole agents implement this, so
/// they compose with [`crate::RunnableExt::then`].
#[async_trait]
pub trait Runnable<Input: Send + 'static, Output: Send + 'static> {
    async fn invoke(&self, input: Input) -> Result<Output, SqlAgentError>;
}

#[async_trait]
impl<Input, Output, R> Runnable<Input, Output> for std::sync::Arc<R>
where
    Input: Send + 'static,
    Output: Send + 'static,
    R: Runnable<Input, Output> + Send + Sync + ?Sized,
{
    async fn invoke(&self, input: Input) -> Result<Output, SqlAgentError> {
        (**self).invoke(input).await
    }
}

#[async_trait]
impl<Input, Output> Runnable<Input, Output> for Box<dyn Runnable<Input, Output> + Send + Sync>
where
    Input: Send + 'static,
    Output: Send + 'static,
{
    async fn invoke(&self, input: Input) -> Result<Output, SqlAgentError> {
        (**self).invoke(input).await
    }
}
