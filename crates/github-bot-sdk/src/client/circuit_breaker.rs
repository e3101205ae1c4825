//! Windowed-failure-ratio circuit breaker for outbound GitHub calls.
//!
//! Unlike a consecutive-failure-count breaker, this implementation trips on
//! the *ratio* of failures within a rolling time window, with a minimum
//! sample size so a handful of early failures can't trip the circuit before
//! there's enough traffic to judge it fairly.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::timeout;

/// Circuit state, mirroring the classic closed/open/half-open machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn allows_requests(&self) -> bool {
        !matches!(self, Self::Open)
    }

    pub fn is_failure_state(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Configuration for the windowed circuit breaker.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub service_name: String,
    /// Width of the rolling sample window.
    pub failure_window: Duration,
    /// Minimum number of samples in the window before the ratio is judged.
    pub min_throughput: u32,
    /// Failure ratio (0.0-1.0) at or above which the circuit trips.
    pub failure_ratio_threshold: f64,
    /// How long the circuit stays open before allowing a half-open probe.
    pub open_duration: Duration,
    /// Per-call timeout; a timeout counts as a failure.
    pub operation_timeout: Duration,
}

impl CircuitBreakerConfig {
    /// Configuration matching the resilient outbound HTTP pipeline: 30s
    /// window, minimum throughput 5, trip at a 0.5 failure ratio, 30s open
    /// duration, single half-open probe.
    pub fn github_api(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            failure_window: Duration::from_secs(30),
            min_throughput: 5,
            failure_ratio_threshold: 0.5,
            open_duration: Duration::from_secs(30),
            operation_timeout: Duration::from_secs(30),
        }
    }
}

/// Point-in-time circuit breaker metrics, useful for health reporting.
#[derive(Debug, Clone)]
pub struct CircuitMetrics {
    pub state: CircuitState,
    pub window_samples: usize,
    pub window_failures: usize,
    pub failure_ratio: f64,
    pub total_requests: u64,
    pub rejected_requests: u64,
}

/// Errors a call through the breaker can surface.
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker open for {service}")]
    CircuitOpen { service: String },
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("operation failed: {0}")]
    OperationFailed(E),
    #[error("half-open probe already in flight for {service}")]
    HalfOpenProbeBusy { service: String },
}

impl<E> CircuitBreakerError<E> {
    /// Whether this rejection should itself be counted as a breaker failure
    /// (as opposed to protection already working as intended).
    pub fn counts_as_failure(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::OperationFailed(_))
    }

    pub fn is_circuit_protection(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. } | Self::HalfOpenProbeBusy { .. })
    }
}

struct InternalState {
    current_state: CircuitState,
    /// (recorded_at, was_failure) samples, oldest first, pruned to the window.
    samples: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    half_open_probe_in_flight: bool,
    total_requests: u64,
    rejected_requests: u64,
}

impl InternalState {
    fn new() -> Self {
        Self {
            current_state: CircuitState::Closed,
            samples: VecDeque::new(),
            opened_at: None,
            half_open_probe_in_flight: false,
            total_requests: 0,
            rejected_requests: 0,
        }
    }

    fn prune(&mut self, window: Duration, now: Instant) {
        while let Some((recorded_at, _)) = self.samples.front() {
            if now.duration_since(*recorded_at) > window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn failure_ratio(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let failures = self.samples.iter().filter(|(_, failed)| *failed).count();
        failures as f64 / self.samples.len() as f64
    }
}

/// A circuit breaker tracking failure ratio over a rolling time window.
pub struct WindowedCircuitBreaker<T, E> {
    config: CircuitBreakerConfig,
    state: Arc<RwLock<InternalState>>,
    _phantom: std::marker::PhantomData<(T, E)>,
}

impl<T, E> WindowedCircuitBreaker<T, E> {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(InternalState::new())),
            _phantom: std::marker::PhantomData,
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

impl<T, E> WindowedCircuitBreaker<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Run `operation` through the breaker, applying the per-attempt timeout.
    pub async fn call<F, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, E>> + Send,
    {
        let now = Instant::now();

        let is_probe = {
            let mut state = self.state.write().expect("circuit breaker lock poisoned");
            state.prune(self.config.failure_window, now);
            state.total_requests += 1;

            match state.current_state {
                CircuitState::Closed => false,
                CircuitState::Open => {
                    let elapsed_since_open = state
                        .opened_at
                        .map(|opened_at| now.duration_since(opened_at))
                        .unwrap_or_default();
                    if elapsed_since_open >= self.config.open_duration {
                        state.current_state = CircuitState::HalfOpen;
                        state.half_open_probe_in_flight = true;
                        true
                    } else {
                        state.rejected_requests += 1;
                        return Err(CircuitBreakerError::CircuitOpen {
                            service: self.config.service_name.clone(),
                        });
                    }
                }
                CircuitState::HalfOpen => {
                    if state.half_open_probe_in_flight {
                        state.rejected_requests += 1;
                        return Err(CircuitBreakerError::HalfOpenProbeBusy {
                            service: self.config.service_name.clone(),
                        });
                    }
                    state.half_open_probe_in_flight = true;
                    true
                }
            }
        };

        let result = timeout(self.config.operation_timeout, operation()).await;

        let mut state = self.state.write().expect("circuit breaker lock poisoned");
        let completion = Instant::now();

        if is_probe {
            state.half_open_probe_in_flight = false;
        }

        match result {
            Ok(Ok(value)) => {
                state.samples.push_back((completion, false));
                if state.current_state == CircuitState::HalfOpen {
                    state.current_state = CircuitState::Closed;
                    state.samples.clear();
                    state.opened_at = None;
                }
                Ok(value)
            }
            Ok(Err(err)) => {
                Self::record_failure(&mut state, &self.config, completion);
                Err(CircuitBreakerError::OperationFailed(err))
            }
            Err(_) => {
                let timeout_ms = self.config.operation_timeout.as_millis() as u64;
                Self::record_failure(&mut state, &self.config, completion);
                Err(CircuitBreakerError::Timeout { timeout_ms })
            }
        }
    }

    fn record_failure(state: &mut InternalState, config: &CircuitBreakerConfig, now: Instant) {
        state.samples.push_back((now, true));
        state.prune(config.failure_window, now);

        if state.current_state == CircuitState::HalfOpen {
            state.current_state = CircuitState::Open;
            state.opened_at = Some(now);
            return;
        }

        if state.samples.len() as u32 >= config.min_throughput
            && state.failure_ratio() >= config.failure_ratio_threshold
        {
            state.current_state = CircuitState::Open;
            state.opened_at = Some(now);
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
            .read()
            .map(|s| s.current_state)
            .unwrap_or(CircuitState::Open)
    }

    pub fn metrics(&self) -> CircuitMetrics {
        let state = self.state.read().expect("circuit breaker lock poisoned");
        CircuitMetrics {
            state: state.current_state,
            window_samples: state.samples.len(),
            window_failures: state.samples.iter().filter(|(_, f)| *f).count(),
            failure_ratio: state.failure_ratio(),
            total_requests: state.total_requests,
            rejected_requests: state.rejected_requests,
        }
    }

    pub fn reset(&self) {
        let mut state = self.state.write().expect("circuit breaker lock poisoned");
        *state = InternalState::new();
    }
}

#[cfg(test)]
#[path = "circuit_breaker_tests.rs"]
mod tests;
