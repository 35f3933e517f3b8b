use crate::error::ModelError;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper};
use async_trait::async_trait;
use tracing::warn;

/// Output width of `text-embedding-ada-002`.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;

#[async_trait]
pub trait Embedder: Send + Sync {
    fn dimensions(&self) -> usize;
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError>;
}

/// Wraps an embedder with bounded retries and exponential backoff.
///
/// The error of the final attempt is returned as-is.
pub struct RetryingEmbedder<E, S = TokioSleeper> {
    inner: E,
    policy: RetryPolicy,
    sleeper: S,
}

impl<E: Embedder> RetryingEmbedder<E> {
    pub fn new(inner: E, policy: RetryPolicy) -> Self {
        Self::with_sleeper(inner, policy, TokioSleeper)
    }
}

impl<E: Embedder, S: Sleeper> RetryingEmbedder<E, S> {
    pub fn with_sleeper(inner: E, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            inner,
            policy,
            sleeper,
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: Embedder, S: Sleeper> Embedder for RetryingEmbedder<E, S> {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ModelError> {
        if text.trim().is_empty() {
            return Err(ModelError::InvalidInput("cannot embed empty text".to_string()));
        }

        let mut attempt = 0usize;
        loop {
            match self.inner.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(error) if error.is_retryable() && self.policy.should_retry(attempt) => {
                    let delay = self.policy.backoff(attempt);
                    let summary = error.to_string().chars().take(100).collect::<String>();
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %summary,
                        "embedding request failed, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
