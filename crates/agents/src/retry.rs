//! Retry with exponential backoff for calls to external collaborators.

use decision_core::OrchestratorConfig;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Sleep after failed attempt `n` is `backoff_factor^n` seconds.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 1.5,
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self {
            max_attempts: config.max_retries,
            backoff_factor: config.backoff_factor,
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        let secs = self.backoff_factor.powi(attempt as i32);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    }

    /// Run `call` until it succeeds or the attempts are used up. The last
    /// error is returned with the attempt count attached.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> anyhow::Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= attempts => {
                    return Err(err.context(format!(
                        "{operation} failed after {attempts} attempts"
                    )));
                }
                Err(err) => {
                    warn!(
                        operation,
                        attempt,
                        max_attempts = attempts,
                        error = %err,
                        "collaborator call failed, retrying"
                    );
                    tokio::time::sleep(self.delay_after(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
