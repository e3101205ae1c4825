//! Backoff policy for the replay worker (spec section 4.3). Pure
//! configuration plus the delay formula; the async poll/sleep/dequeue loop
//! itself lives in the service crate, which needs `tokio::select!` against a
//! shutdown signal.

use rand::Rng;
use std::time::Duration;

use crate::error::ReplayError;

/// Bounded exponential-backoff-with-jitter policy and the DLQ escalation
/// ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    pub jitter_factor: f64,
    pub poll_interval: Duration,
}

impl Default for ReplayPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(300),
            multiplier: 2.0,
            jitter_factor: 0.1,
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl ReplayPolicy {
    /// Rejects the combinations the spec calls out: fewer than one attempt,
    /// a non-positive multiplier, jitter outside `[0, 1]`, or a max backoff
    /// smaller than the initial one.
    pub fn validate(&self) -> Result<(), ReplayError> {
        if self.max_attempts < 1 {
            return Err(ReplayError::InvalidPolicy {
                message: "max_attempts must be at least 1".to_string(),
            });
        }
        if self.multiplier <= 1.0 {
            return Err(ReplayError::InvalidPolicy {
                message: "backoff_multiplier must be greater than 1.0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(ReplayError::InvalidPolicy {
                message: "jitter_factor must be within [0, 1]".to_string(),
            });
        }
        if self.max_backoff < self.initial_backoff {
            return Err(ReplayError::InvalidPolicy {
                message: "max_backoff must be >= initial_backoff".to_string(),
            });
        }
        Ok(())
    }

    /// `min(max_backoff, initial_backoff * multiplier^attempt)`, then jittered
    /// by `+/- jitter_factor`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.multiplier.powi(attempt as i32);
        let base_ms = (self.initial_backoff.as_millis() as f64 * exp)
            .min(self.max_backoff.as_millis() as f64);
        let jitter = rand::rng().random_range(-self.jitter_factor..=self.jitter_factor);
        let jittered_ms = (base_ms * (1.0 + jitter)).max(0.0);
        Duration::from_millis(jittered_ms as u64)
    }

    pub fn should_dead_letter(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}

#[cfg(test)]
#[path = "replay_policy_tests.rs"]
mod tests;
