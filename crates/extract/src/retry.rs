use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// step × attempt, capped
    Linear,
    /// step × 2^(attempt-1), capped
    Exponential,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: usize,
    step: Duration,
    max_backoff: Duration,
    backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(3, 2_000, 8_000)
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, step_ms: u64, max_backoff_ms: u64, backoff: Backoff) -> Self {
        Self {
            max_retries,
            step: Duration::from_millis(step_ms),
            max_backoff: Duration::from_millis(max_backoff_ms),
            backoff,
        }
    }

    pub fn linear(max_retries: usize, step_ms: u64, max_backoff_ms: u64) -> Self {
        Self::new(max_retries, step_ms, max_backoff_ms, Backoff::Linear)
    }

    /// Retries without sleeping; for tests and offline runs.
    pub fn immediate(max_retries: usize) -> Self {
        Self::linear(max_retries, 0, 0)
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: usize) -> Duration {
        let attempt = attempt.max(1) as u32;
        let raw = match self.backoff {
            Backoff::Linear => self.step.saturating_mul(attempt),
            Backoff::Exponential => self
                .step
                .saturating_mul(2u32.saturating_pow(attempt - 1)),
        };
        raw.min(self.max_backoff)
    }

    /// Retry every error.
    pub async fn retry<F, Fut, T, E>(&self, operation_name: &str, f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        self.retry_if(operation_name, f, |_| true).await
    }

    /// Retry while `should_retry` accepts the error, up to `max_retries`
    /// extra attempts.
    pub async fn retry_if<F, Fut, T, E, P>(
        &self,
        operation_name: &str,
        mut f: F,
        should_retry: P,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;

        loop {
            match f().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!(
                            operation = operation_name,
                            attempts = attempt + 1,
                            "Operation succeeded after retries"
                        );
                    }
                    return Ok(result);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries || !should_retry(&e) {
                        warn!(
                            operation = operation_name,
                            attempts = attempt,
                            error = %e,
                            "Operation failed, giving up"
                        );
                        return Err(e);
                    }

                    let backoff = self.backoff_for(attempt);
                    warn!(
                        operation = operation_name,
                        attempt = attempt,
                        max_retries = self.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );

                    sleep(backoff).await;
                }
            }
        }
    }
}
