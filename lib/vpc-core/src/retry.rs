//! Retry policy shared by every backoff loop
//!
//! Retries happen in exactly two places: realization polling and the
//! alternate load balancer probe. Every other backend call runs once and
//! leaves retrying to the next reconciliation. Each loop picks a
//! [`CallClass`], and the policy decides from the error alone whether
//! another attempt is allowed.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Kind of call a policy governs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallClass {
    /// Retry only transport-level failures (timeouts, unavailable)
    TransientNetwork,
    /// Retry transport failures and "not yet realized" results
    RealizationPoll,
    /// Never retry
    None,
}

/// Classification an error exposes to the retry loop
pub trait Retryable {
    /// Timeouts, connection failures, 5xx unavailability
    fn is_transient(&self) -> bool;

    /// The operation succeeded but its target has not settled yet
    fn is_pending(&self) -> bool {
        false
    }
}

/// Bounded exponential backoff
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub class: CallClass,
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Random extra delay as a fraction of the computed backoff
    pub jitter: f64,
}

impl RetryPolicy {
    pub fn transient_network() -> Self {
        Self {
            class: CallClass::TransientNetwork,
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            jitter: 0.1,
        }
    }

    pub fn realization_poll() -> Self {
        Self {
            class: CallClass::RealizationPoll,
            max_attempts: 10,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
            jitter: 0.1,
        }
    }

    pub fn none() -> Self {
        Self {
            class: CallClass::None,
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            jitter: 0.0,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.max(0.0);
        self
    }

    /// Check if an error should trigger another attempt under this policy
    pub fn should_retry<E: Retryable>(&self, err: &E) -> bool {
        match self.class {
            CallClass::TransientNetwork => err.is_transient(),
            CallClass::RealizationPoll => err.is_transient() || err.is_pending(),
            CallClass::None => false,
        }
    }

    /// Calculate backoff duration for the given retry count
    pub fn backoff_duration(&self, retry_count: u32) -> Duration {
        let base = self.initial_backoff.as_millis() as u64;
        let exponential = 2u64.saturating_pow(retry_count);
        let backoff_ms = base
            .saturating_mul(exponential)
            .min(self.max_backoff.as_millis() as u64);
        Duration::from_millis(backoff_ms)
    }

    fn jittered(&self, retry_count: u32) -> Duration {
        let backoff = self.backoff_duration(retry_count);
        if self.jitter <= 0.0 || backoff.is_zero() {
            return backoff;
        }
        let extra = rand::thread_rng().gen_range(0.0..=self.jitter);
        backoff + backoff.mul_f64(extra)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent. `op` receives the zero-based attempt number.
    /// The last error is returned when the budget runs out.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts || !self.should_retry(&err) {
                        return Err(err);
                    }
                    let delay = self.jittered(attempt - 1);
                    debug!(
                        class = ?self.class,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after error: {}",
                        err
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
