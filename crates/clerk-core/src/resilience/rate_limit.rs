//! Token-bucket rate limiter for AI calls.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::retry::wait_with_cancel;
use crate::classify::{AiError, AiResult};

/// Limiter settings. A non-positive `requests_per_second` disables limiting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained request rate.
    pub requests_per_second: f64,
    /// Requests allowed back-to-back before the rate applies.
    pub burst: u32,
    /// Longest a caller will wait for a slot, in milliseconds.
    pub max_wait_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            burst: 5,
            max_wait_ms: 30_000,
        }
    }
}

#[derive(Debug)]
struct Bucket {
    /// May go negative: each waiting caller reserves a token up front.
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket shared by every call through one classifier.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter with a full bucket.
    pub fn new(config: RateLimitConfig) -> Self {
        let bucket = Bucket {
            tokens: f64::from(config.burst.max(1)),
            last_refill: Instant::now(),
        };
        Self {
            config,
            bucket: Mutex::new(bucket),
        }
    }

    fn enabled(&self) -> bool {
        self.config.requests_per_second > 0.0
    }

    /// Wait for a slot.
    ///
    /// Fails with [`AiError::RateLimited`] if the wait would exceed
    /// `max_wait_ms`, or [`AiError::Cancelled`] if `cancel` fires first.
    /// A wait that is cancelled or dropped gives its token back.
    pub async fn acquire(&self, cancel: &CancellationToken) -> AiResult<()> {
        if !self.enabled() {
            return Ok(());
        }
        let wait = self.reserve()?;
        if wait.is_zero() {
            return Ok(());
        }
        debug!(wait_ms = wait.as_millis(), "waiting for rate limit slot");
        let reservation = Reservation {
            limiter: self,
            used: false,
        };
        wait_with_cancel(cancel, wait).await?;
        reservation.use_slot();
        Ok(())
    }

    /// Return a reserved token that was never used.
    fn refund(&self) {
        let Ok(mut bucket) = self.bucket.lock() else {
            return;
        };
        let capacity = f64::from(self.config.burst.max(1));
        bucket.tokens = (bucket.tokens + 1.0).min(capacity);
        debug!(tokens = bucket.tokens, "rate limit wait abandoned, token refunded");
    }

    /// Take a token, returning how long the caller must wait for it.
    fn reserve(&self) -> AiResult<Duration> {
        let Ok(mut bucket) = self.bucket.lock() else {
            return Ok(Duration::ZERO);
        };
        let rate = self.config.requests_per_second;
        let capacity = f64::from(self.config.burst.max(1));
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = elapsed.mul_add(rate, bucket.tokens).min(capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(Duration::ZERO);
        }

        let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / rate);
        if wait > Duration::from_millis(self.config.max_wait_ms) {
            return Err(AiError::RateLimited { retry_after: wait });
        }
        bucket.tokens -= 1.0;
        Ok(wait)
    }
}

/// A token taken ahead of its slot; refunded unless the caller got to use it.
#[derive(Debug)]
struct Reservation<'a> {
    limiter: &'a RateLimiter,
    used: bool,
}

impl Reservation<'_> {
    fn use_slot(mut self) {
        self.used = true;
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if !self.used {
            self.limiter.refund();
        }
    }
}
