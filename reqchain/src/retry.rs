//! Per-stage retry policies with configurable backoff.
//!
//! A [`RetryPolicy`] is attached to a single request stage and consulted only
//! for transport failures: config resolution, URL validation, and mapper
//! errors abort immediately. The evaluator is a small decision function; the
//! async loop around it lives in [`run_with_policy`], which re-runs the
//! stage's whole dispatch closure (config re-resolution included) on every
//! attempt.

use crate::errors::{ChainError, TransportError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether a transport failure is worth another attempt.
pub type RetryCondition = Arc<dyn Fn(&TransportError) -> bool + Send + Sync>;

/// Retry behavior for a single stage.
#[derive(Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retries after the initial attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay between attempts in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Whether the delay doubles after each failed attempt.
    #[serde(default)]
    pub exponential_backoff: bool,
    /// Status codes the default condition treats as retryable.
    #[serde(default = "default_retry_status_codes")]
    pub retry_status_codes: HashSet<u16>,
    /// Optional cap on the computed delay in milliseconds.
    #[serde(default)]
    pub max_delay_ms: Option<u64>,
    /// Whether to draw the actual delay uniformly from [0, computed delay].
    #[serde(default)]
    pub jitter: bool,
    /// Custom retry predicate; replaces the default condition entirely.
    #[serde(skip)]
    pub retry_condition: Option<RetryCondition>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_retry_status_codes() -> HashSet<u16> {
    [429, 500, 502, 503, 504].into_iter().collect()
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            exponential_backoff: false,
            retry_status_codes: default_retry_status_codes(),
            max_delay_ms: None,
            jitter: false,
            retry_condition: None,
        }
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("exponential_backoff", &self.exponential_backoff)
            .field("retry_status_codes", &self.retry_status_codes)
            .field("max_delay_ms", &self.max_delay_ms)
            .field("jitter", &self.jitter)
            .field("retry_condition", &self.retry_condition.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

impl RetryPolicy {
    /// Creates a policy with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the base delay in milliseconds.
    #[must_use]
    pub const fn with_retry_delay_ms(mut self, delay: u64) -> Self {
        self.retry_delay_ms = delay;
        self
    }

    /// Enables or disables exponential backoff.
    #[must_use]
    pub const fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }

    /// Adds a status code to the default condition's allow-set.
    #[must_use]
    pub fn with_retry_status(mut self, status: u16) -> Self {
        self.retry_status_codes.insert(status);
        self
    }

    /// Sets the delay cap in milliseconds.
    #[must_use]
    pub const fn with_max_delay_ms(mut self, max: u64) -> Self {
        self.max_delay_ms = Some(max);
        self
    }

    /// Enables or disables full jitter.
    #[must_use]
    pub const fn with_jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Sets a custom retry condition, replacing the default.
    #[must_use]
    pub fn with_retry_condition<F>(mut self, condition: F) -> Self
    where
        F: Fn(&TransportError) -> bool + Send + Sync + 'static,
    {
        self.retry_condition = Some(Arc::new(condition));
        self
    }

    /// Whether the given failure is worth another attempt.
    ///
    /// The default condition retries connection-level failures (no HTTP
    /// status was received) and responses whose status is in the allow-set.
    #[must_use]
    pub fn is_retryable(&self, error: &TransportError) -> bool {
        match &self.retry_condition {
            Some(condition) => condition(error),
            None => match error.status {
                Some(status) => self.retry_status_codes.contains(&status),
                None => error.kind.is_connection_level(),
            },
        }
    }

    /// Computes the backoff delay after `failed_attempts` failures (0-based).
    #[must_use]
    pub fn delay_for(&self, failed_attempts: u32) -> Duration {
        let base = self.retry_delay_ms;
        let millis = if self.exponential_backoff {
            base.saturating_mul(2u64.saturating_pow(failed_attempts))
        } else {
            base
        };
        let capped = self.max_delay_ms.map_or(millis, |max| millis.min(max));
        let jittered = if self.jitter && capped > 0 {
            rand::thread_rng().gen_range(0..=capped)
        } else {
            capped
        };
        Duration::from_millis(jittered)
    }

    /// Makes a retry decision after a transport failure.
    #[must_use]
    pub fn evaluate(&self, failed_attempts: u32, error: &TransportError) -> RetryDecision {
        if !self.is_retryable(error) {
            return RetryDecision::NotRetryable;
        }
        if failed_attempts >= self.max_retries {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry(self.delay_for(failed_attempts))
    }
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// Retries are exhausted, give up.
    GiveUp,
    /// The error is not retryable.
    NotRetryable,
}

/// Runs a dispatch closure under an optional retry policy.
///
/// The closure receives the 0-based count of failures so far and must
/// perform the full dispatch for one attempt, config resolution included,
/// so factories are re-invoked with the unchanged previous-result context
/// on every retry. Only transport failures are evaluated for retry; any
/// other error propagates immediately.
pub async fn run_with_policy<T, F, Fut>(
    policy: Option<&RetryPolicy>,
    mut operation: F,
) -> Result<T, ChainError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    let Some(policy) = policy else {
        return operation(0).await;
    };

    let mut failed_attempts = 0u32;
    loop {
        match operation(failed_attempts).await {
            Ok(value) => return Ok(value),
            Err(ChainError::Transport(transport)) => {
                match policy.evaluate(failed_attempts, &transport) {
                    RetryDecision::Retry(delay) => {
                        tracing::debug!(
                            failed_attempts = failed_attempts + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %transport,
                            "Retrying dispatch after transport failure"
                        );
                        tokio::time::sleep(delay).await;
                        failed_attempts += 1;
                    }
                    RetryDecision::GiveUp | RetryDecision::NotRetryable => {
                        return Err(ChainError::Transport(transport));
                    }
                }
            }
            Err(other) => return Err(other),
        }
    }
}
