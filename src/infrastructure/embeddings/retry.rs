//! Retry policy with exponential backoff, jitter, and cache fallback.
//!
//! Provider calls are retried up to `max_attempts` times with exponentially
//! growing, jittered delays. Jitter spreads concurrent callers so their
//! retries do not land on a struggling endpoint at the same instant. When
//! every attempt has failed, the embedding wrapper consults the cache for
//! the exact text before surfacing an error.

use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::domain::errors::{EngineError, EngineResult};
use crate::domain::models::RetryConfig;
use crate::domain::ports::EmbeddingProvider;

use super::cache::EmbeddingCache;

/// Bounded retry with exponential backoff and uniform jitter.
///
/// `max_attempts` counts the first call, so 3 means one call and two
/// retries. The delay before attempt n (n >= 2) is
/// `min(max_delay_ms, base_delay_ms * multiplier^(n-2))` scaled by a
/// uniform factor in `[1 - jitter_factor, 1 + jitter_factor]`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    multiplier: f64,
    jitter_factor: f64,
    max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay_ms: config.base_delay_ms,
            multiplier: config.multiplier,
            jitter_factor: config.jitter_factor,
            max_delay_ms: config.max_delay_ms,
        }
    }

    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Execute an async operation with retry and cancellation.
    ///
    /// Non-retryable errors (validation, configuration) return immediately.
    /// Cancellation is checked before every attempt and raced against every
    /// backoff sleep; a cancelled run returns [`EngineError::Cancelled`]
    /// without consuming further attempts.
    ///
    /// A retryable error in the result means every attempt was consumed.
    pub async fn execute<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = EngineResult<T>>,
    {
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => {
                    debug!(error = %err, "non-retryable error, failing fast");
                    return Err(err);
                }
                Err(err) => {
                    if attempt >= self.max_attempts {
                        warn!(
                            attempt,
                            max_attempts = self.max_attempts,
                            error = %err,
                            "retries exhausted"
                        );
                        return Err(err);
                    }

                    let delay = self.delay_before(attempt + 1);
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = delay.as_millis(),
                        error = %err,
                        "attempt failed, backing off"
                    );

                    tokio::select! {
                        () = cancel.cancelled() => return Err(EngineError::Cancelled),
                        () = sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Jittered delay before the given 1-indexed attempt (n >= 2).
    fn delay_before(&self, next_attempt: u32) -> Duration {
        let exponent = next_attempt.saturating_sub(2);
        let raw = self.base_delay_ms as f64 * self.multiplier.powi(exponent as i32);
        let capped = raw.min(self.max_delay_ms as f64);
        Duration::from_millis((capped * self.jitter_scale()).round() as u64)
    }

    /// Uniform scale factor in `[1 - jitter_factor, 1 + jitter_factor)`,
    /// sampled from the nanosecond clock.
    fn jitter_scale(&self) -> f64 {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();

        1.0 + ((nanos % 1000) as f64 / 1000.0 - 0.5) * 2.0 * self.jitter_factor
    }
}

/// Embedding front end combining provider, retry policy, and cache.
///
/// On success the vector is written to the cache; on retry exhaustion the
/// cache is consulted for the exact `(text, model)` before the failure is
/// surfaced with the provider name and attempt count. A cancelled call
/// neither retries nor falls back.
pub struct ResilientEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
    cache: Option<EmbeddingCache>,
}

impl ResilientEmbedder {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        policy: RetryPolicy,
        cache: Option<EmbeddingCache>,
    ) -> Self {
        Self {
            provider,
            policy,
            cache,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn model_id(&self) -> &str {
        self.provider.model_id()
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }

    /// Embed a single text with retry and cache fallback.
    pub async fn embed(&self, text: &str, cancel: &CancellationToken) -> EngineResult<Vec<f32>> {
        let provider = Arc::clone(&self.provider);
        let result = self
            .policy
            .execute(cancel, || {
                let provider = Arc::clone(&provider);
                let text = text.to_string();
                async move { provider.embed(&text).await }
            })
            .await;

        match result {
            Ok(vector) => {
                self.store(text, &vector).await;
                Ok(vector)
            }
            Err(err) if err.is_retryable() => match self.lookup(text).await {
                Some(vector) => {
                    info!(provider = self.provider.name(), "serving embedding from cache after provider failure");
                    Ok(vector)
                }
                None => Err(self.exhausted(err)),
            },
            Err(err) => Err(err),
        }
    }

    /// Embed a batch of texts with retry; order is preserved.
    ///
    /// Fallback requires a cache hit for every text in the batch; a single
    /// miss surfaces the provider failure for the whole call.
    pub async fn embed_batch(
        &self,
        texts: &[String],
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let provider = Arc::clone(&self.provider);
        let result = self
            .policy
            .execute(cancel, || {
                let provider = Arc::clone(&provider);
                let texts = texts.to_vec();
                async move { provider.embed_batch(&texts).await }
            })
            .await;

        match result {
            Ok(vectors) => {
                for (text, vector) in texts.iter().zip(&vectors) {
                    self.store(text, vector).await;
                }
                Ok(vectors)
            }
            Err(err) if err.is_retryable() => {
                let mut recovered = Vec::with_capacity(texts.len());
                for text in texts {
                    match self.lookup(text).await {
                        Some(vector) => recovered.push(vector),
                        None => return Err(self.exhausted(err)),
                    }
                }
                info!(
                    provider = self.provider.name(),
                    texts = texts.len(),
                    "serving batch from cache after provider failure"
                );
                Ok(recovered)
            }
            Err(err) => Err(err),
        }
    }

    async fn store(&self, text: &str, vector: &[f32]) {
        if let Some(cache) = &self.cache {
            cache
                .put(text, self.provider.model_id(), vector.to_vec())
                .await;
        }
    }

    async fn lookup(&self, text: &str) -> Option<Vec<f32>> {
        let cache = self.cache.as_ref()?;
        cache
            .get(text, self.provider.model_id())
            .await
            .map(|v| v.as_ref().clone())
    }

    fn exhausted(&self, err: EngineError) -> EngineError {
        EngineError::Provider {
            provider: self.provider.name().to_string(),
            attempts: self.policy.max_attempts(),
            message: err.to_string(),
        }
    }
}
