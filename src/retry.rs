//! Bounded retry with capped exponential backoff.
//!
//! The policy is applied by the query layer only; the gateway proxy and the
//! DAS client fail fast and leave the decision to their caller.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    /// Attempts after the initial one.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1_000,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (zero-based): `min(base * 2^attempt, max)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        let millis = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Runs `op` until it succeeds or the attempt budget is spent, returning
    /// the last error in the latter case.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        assert!(self.max_retries <= 16, "Retry budget exceeds defensive bound");

        for attempt in 0..self.max_retries {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        "{label} failed, retrying in {delay:?}: {err}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
        op().await
    }
}
