//! Retry policy and per-request attempt state.
//!
//! # Responsibilities
//! - Hold the bounds of the failover protocol (same-backend retries, distinct backends)
//! - Carry the two request-scoped counters explicitly through dispatch
//!
//! # Design Decisions
//! - Only transport failures are retried; any HTTP response is final
//! - Fixed delay between same-backend retries, scoped to the request's own task
//! - Counters are plain values owned by one request, never shared

use std::time::Duration;

use crate::config::RetryConfig;

/// Bounds of the retry/failover protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Same-backend retries after a transport failure before the backend is marked dead.
    pub max_retries: u32,
    /// Pause before each same-backend retry.
    pub retry_delay: Duration,
    /// Highest attempt number allowed; dispatch gives up once `attempts` exceeds it.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            max_attempts: config.max_attempts,
        }
    }
}

/// Request-scoped failover counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptState {
    /// Distinct backends tried for this request, starting at 1.
    pub attempts: u32,
    /// Retries spent on the current backend.
    pub retries: u32,
}

impl Default for AttemptState {
    fn default() -> Self {
        Self {
            attempts: 1,
            retries: 0,
        }
    }
}

impl AttemptState {
    /// Move on to the next backend: one more attempt, a fresh retry budget.
    pub fn next_backend(self) -> Self {
        Self {
            attempts: self.attempts + 1,
            retries: 0,
        }
    }

    /// Count one more retry against the current backend.
    pub fn next_retry(self) -> Self {
        Self {
            retries: self.retries + 1,
            ..self
        }
    }
}
