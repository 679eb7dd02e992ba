//! Resilience policy for the AI classification stage.
//!
//! [`ResilientClassifier`] wraps any [`AiClassifier`] and applies, per call:
//!
//! 1. rate-limit wait ([`RateLimiter`])
//! 2. circuit-breaker admission ([`CircuitBreaker`])
//! 3. retry with backoff ([`retry_with_backoff`])
//! 4. the wrapped call
//!
//! Rejections surface as [`AiError`]s, which the classifier absorbs like any
//! other AI failure.

pub mod circuit_breaker;
pub mod rate_limit;
pub mod retry;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use circuit_breaker::{Admission, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use retry::{RetryConfig, retry_with_backoff};

pub use crate::classify::{AiError, AiResult};
use crate::classify::{AiClassifier, AiFuture, CommitClassification};
use crate::commit::CommitInfo;

/// Settings for the `[ai]` config section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Request rate limiting.
    pub rate_limit: RateLimitConfig,
    /// Failure isolation.
    pub circuit_breaker: CircuitBreakerConfig,
    /// Retries for transient failures.
    pub retry: RetryConfig,
}

/// An [`AiClassifier`] guarded by rate limiting, a circuit breaker, and retries.
#[derive(Debug)]
pub struct ResilientClassifier<C> {
    inner: C,
    limiter: RateLimiter,
    breaker: CircuitBreaker,
    retry: RetryConfig,
}

impl<C: AiClassifier> ResilientClassifier<C> {
    /// Wrap a classifier.
    pub fn new(inner: C, config: &ResilienceConfig) -> Self {
        Self {
            inner,
            limiter: RateLimiter::new(config.rate_limit.clone()),
            breaker: CircuitBreaker::new(config.circuit_breaker.clone()),
            retry: config.retry.clone(),
        }
    }

    /// The breaker guarding the wrapped classifier.
    pub const fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        commit: &CommitInfo,
    ) -> AiResult<Option<CommitClassification>> {
        self.limiter.acquire(cancel).await?;

        let Some(admission) = self.breaker.admit() else {
            debug!(hash = %commit.hash, "circuit open, skipping AI call");
            return Err(AiError::CircuitOpen);
        };

        // If this future is dropped mid-call, `admission` hands the half-open slot back.
        let result =
            retry_with_backoff(|| self.inner.classify(cancel, commit), &self.retry, cancel).await;
        match &result {
            Ok(_) => admission.succeeded(),
            Err(AiError::Cancelled) => drop(admission),
            Err(_) => admission.failed(),
        }
        result
    }
}

impl<C: AiClassifier> AiClassifier for ResilientClassifier<C> {
    fn classify<'a>(
        &'a self,
        cancel: &'a CancellationToken,
        commit: &'a CommitInfo,
    ) -> AiFuture<'a> {
        Box::pin(self.call(cancel, commit))
    }
}
