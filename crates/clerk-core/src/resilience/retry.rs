//! Retry with exponential backoff and jitter.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::classify::{AiError, AiResult};

/// Retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, the first one included. 1 disables retries.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound on the computed delay, in milliseconds.
    pub max_backoff_ms: u64,
    /// Growth factor between retries.
    pub backoff_multiplier: f64,
    /// Random spread applied to each delay, as a fraction (0.25 = ±25%).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
            backoff_multiplier: 2.0,
            jitter_factor: 0.25,
        }
    }
}

/// Run `operation` until it succeeds, fails permanently, or runs out of attempts.
///
/// Only [retryable](AiError::is_retryable) errors are retried. A backend-
/// suggested delay replaces the computed one. Sleeping between attempts
/// is cancellable.
pub async fn retry_with_backoff<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    cancel: &CancellationToken,
) -> AiResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AiResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut backoff_ms = config.initial_backoff_ms;
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(AiError::Cancelled);
        }
        attempt += 1;

        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !err.is_retryable() {
            return Err(err);
        }
        if attempt >= max_attempts {
            return Err(AiError::RetriesExhausted {
                attempts: attempt,
                last_error: err.to_string(),
            });
        }

        let delay = err.suggested_backoff().unwrap_or_else(|| {
            apply_jitter(
                Duration::from_millis(backoff_ms.min(config.max_backoff_ms)),
                config.jitter_factor,
            )
        });
        debug!(attempt, delay_ms = delay.as_millis(), error = %err, "retrying AI call");
        wait_with_cancel(cancel, delay).await?;
        backoff_ms = grow(backoff_ms, config.backoff_multiplier);
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn grow(backoff_ms: u64, multiplier: f64) -> u64 {
    (backoff_ms as f64 * multiplier.max(1.0)) as u64
}

/// Sleep for `duration` unless `cancel` fires first.
pub(super) async fn wait_with_cancel(cancel: &CancellationToken, duration: Duration) -> AiResult<()> {
    if duration.is_zero() {
        return Ok(());
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(AiError::Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Spread a delay by ±`jitter_factor` so concurrent callers do not retry in lockstep.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn apply_jitter(duration: Duration, jitter_factor: f64) -> Duration {
    let factor = jitter_factor.clamp(0.0, 1.0);
    if factor == 0.0 {
        return duration;
    }
    let jitter = rand::rng().random_range(-factor..=factor);
    let millis = (duration.as_millis() as f64 * (1.0 + jitter)).max(0.0) as u64;
    Duration::from_millis(millis)
}
