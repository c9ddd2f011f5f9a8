//! Transport-level retry policy.
//!
//! The pipeline defaults to [`BackoffConfig::none()`]: one attempt per stage,
//! any failure ends the run. Setting `max_retries` in the config file opts in
//! to exponential backoff with full jitter on 429, 5xx and connection errors.

use crate::PipelineError;
use std::time::Duration;

/// When and how long to wait before re-sending a failed request.
///
/// ```
/// use story_pipeline::backend::BackoffConfig;
/// use std::time::Duration;
///
/// assert_eq!(BackoffConfig::none().max_retries, 0);
///
/// let policy = BackoffConfig::with_max_retries(3);
/// assert_eq!(policy.ceiling(1), Duration::from_secs(1));
/// assert_eq!(policy.ceiling(3), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Retries after the first attempt. 0 disables retry.
    pub max_retries: u32,

    /// Delay ceiling for the first retry; doubles for each later one.
    pub initial_delay: Duration,

    /// Upper bound for any single delay.
    pub max_delay: Duration,

    /// HTTP statuses worth another attempt.
    pub retryable_statuses: Vec<u16>,

    /// Wait exactly as long as a provider's `Retry-After` asks, when it sends one.
    pub respect_retry_after: bool,
}

impl BackoffConfig {
    /// Single attempt.
    pub fn none() -> Self {
        Self::with_max_retries(0)
    }

    /// Three retries, 1s initial ceiling, 30s cap.
    pub fn standard() -> Self {
        Self::with_max_retries(3)
    }

    /// Standard delays with a custom retry budget.
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            retryable_statuses: vec![429, 500, 502, 503, 504],
            respect_retry_after: true,
        }
    }

    /// Whether `error` is transient under this policy.
    pub fn should_retry(&self, error: &PipelineError) -> bool {
        match error {
            PipelineError::HttpError { status, .. } => self.retryable_statuses.contains(status),
            PipelineError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Longest wait before retry number `attempt` (1-indexed).
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(31);
        self.initial_delay
            .saturating_mul(1u32 << doublings)
            .min(self.max_delay)
    }

    /// Full-jitter delay: uniform in `[0, ceiling(attempt)]`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.ceiling(attempt).mul_f64(fastrand::f64())
    }

    /// Delay before retry `attempt` following `error`.
    ///
    /// A `Retry-After` hint wins over the computed delay (still capped at
    /// `max_delay`) when `respect_retry_after` is set.
    pub fn delay_after(&self, attempt: u32, error: &PipelineError) -> Duration {
        match error {
            PipelineError::HttpError {
                retry_after: Some(hint),
                ..
            } if self.respect_retry_after => (*hint).min(self.max_delay),
            _ => self.delay_for_attempt(attempt),
        }
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::none()
    }
}
