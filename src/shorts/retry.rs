use std::future::Future;
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;

use super::config::RetryConfig;
use crate::ui::prelude::{Level, emit};

/// Bounded exponential backoff applied around provider calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Single attempt, no waiting. Used by tests and by callers that retry elsewhere.
    pub const fn none() -> Self {
        Self {
            attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt + 1` (0-based failed attempt).
    pub fn compute_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryConfig::default().into()
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(config: RetryConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Run `operation` until it succeeds or the policy's attempts are exhausted.
///
/// Returns the last error when every attempt fails.
pub async fn retry_operation<F, Fut, T>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 >= attempts => return Err(err),
            Err(err) => {
                let delay = policy.compute_delay(attempt);
                emit(
                    Level::Warn,
                    "shorts.retry",
                    &format!(
                        "{label} failed (attempt {}/{attempts}), retrying in {delay:?}: {err:#}",
                        attempt + 1
                    ),
                    Some(json!({
                        "operation": label,
                        "attempt": attempt + 1,
                        "wait_ms": delay.as_millis() as u64,
                    })),
                );
                if !delay.is_zero() {
                    sleep(delay).await;
                }
                attempt += 1;
            }
        }
    }
}
