use async_trait::async_trait;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay after the failed attempt `attempt` (0-based): `base_delay * 2^attempt`.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(16) as u32;
        self.base_delay.saturating_mul(1 << capped)
    }

    /// Whether another attempt is allowed after `attempt` (0-based) failed.
    pub fn should_retry(&self, attempt: usize) -> bool {
        attempt + 1 < self.max_attempts.max(1)
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
