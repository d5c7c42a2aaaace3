use std::time::Duration;

use rand::Rng;

use crate::{Runnable, SqlAgentError};

/// Exponential backoff schedule: `base * 2^(attempt - 1)`, capped at `max_delay`,
/// with up to `jitter` of the computed delay added at random.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub max_delay: Duration,
    pub jitter: f64,
}

impl Backoff {
    pub const NONE: Backoff = Backoff {
        base: Duration::ZERO,
        max_delay: Duration::ZERO,
        jitter: 0.0,
    };

    pub fn exponential(base: Duration, max_delay: Duration) -> Self {
        Self {
            base,
            max_delay,
            jitter: 0.0,
        }
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let raw = self.base.saturating_mul(1u32 << exp).min(self.max_delay);
        if self.jitter == 0.0 || raw.is_zero() {
            return raw;
        }
        let extra = raw.mul_f64(rand::thread_rng().gen_range(0.0..=self.jitter));
        raw.saturating_add(extra)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::exponential(Duration::from_millis(250), Duration::from_secs(8)).with_jitter(0.2)
    }
}

pub struct Retrying<R> {
    runnable: R,
    max_attempts: usize,
    backoff: Backoff,
}

impl<R> Retrying<R> {
    pub fn new(runnable: R, max_attempts: usize) -> Self {
        Self {
            runnable,
            max_attempts,
            backoff: Backoff::NONE,
        }
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Errors worth another attempt: provider hiccups and timeouts.
pub fn is_retryable(error: &SqlAgentError) -> bool {
    matches!(
        error,
        SqlAgentError::LlmProvider(_) | SqlAgentError::Timeout(_)
    )
}

#[async_trait::async_trait]
impl<Input, Output, R> Runnable<Input, Output> for Retrying<R>
where
    Input: Send + Clone + 'static,
    Output: Send + 'static,
    R: Runnable<Input, Output> + Send + Sync,
{
    async fn invoke(&self, input: Input) -> Result<Output, SqlAgentError> {
        if self.max_attempts == 0 {
            return Err(SqlAgentError::MaxRetriesExceeded {
                max: 0,
                last_error: "no attempts allowed".to_string(),
            });
        }

        let mut attempt = 1usize;
        loop {
            let error = match self.runnable.invoke(input.clone()).await {
                Ok(output) => return Ok(output),
                Err(error) => error,
            };

            if !is_retryable(&error) {
                return Err(error);
            }

            if attempt >= self.max_attempts {
                return Err(SqlAgentError::MaxRetriesExceeded {
                    max: self.max_attempts,
                    last_error: error.to_string(),
                });
            }

            let delay = self.backoff.delay_for(attempt as u32);
            tracing::warn!(
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying after transient failure"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }
}
