//! Resilient outbound HTTP pipeline: timeout -> circuit breaker -> retry.
//!
//! Composed outermost to innermost exactly as the resilience contract
//! requires: every attempt gets its own timeout, the circuit breaker decides
//! whether an attempt is allowed to run at all, and the retry loop wraps the
//! whole thing, replaying failed attempts with exponential backoff and
//! jitter up to a bounded number of times.

use std::time::Duration;

use rand::Rng;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerError, WindowedCircuitBreaker};
use crate::error::ApiError;

/// Configuration for the resilient client's retry loop.
#[derive(Debug, Clone)]
pub struct ResilientClientConfig {
    /// Number of retries after the first attempt (so `max_retries + 1` total calls).
    pub max_retries: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for ResilientClientConfig {
    /// Up to 3 retries (4 total calls), base delay 2s, doubling, 10% jitter.
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl ResilientClientConfig {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self.backoff_multiplier.powi(attempt as i32);
        let base_ms = self.base_delay.as_millis() as f64 * exp;
        let jitter = rand::rng().random_range(-self.jitter_factor..=self.jitter_factor);
        let jittered_ms = (base_ms * (1.0 + jitter)).max(0.0);
        Duration::from_millis(jittered_ms as u64)
    }
}

/// True if an HTTP status code should be retried by the resilient pipeline's
/// retry layer (which additionally retries 408, unlike the breaker).
pub fn is_retryable_status_for_retry(status: StatusCode) -> bool {
    status.as_u16() >= 500 || status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::REQUEST_TIMEOUT
}

/// True if an HTTP status code counts as a breaker failure (network errors,
/// 429, and 5xx -- notably not 408).
pub fn is_retryable_status_for_breaker(status: StatusCode) -> bool {
    status.as_u16() >= 500 || status == StatusCode::TOO_MANY_REQUESTS
}

/// Wraps `reqwest::Client`, an installation-scoped auth header, and the
/// timeout/breaker/retry composition applied to every call.
pub struct ResilientClient {
    http: reqwest::Client,
    breaker: WindowedCircuitBreaker<reqwest::Response, ApiError>,
    retry_config: ResilientClientConfig,
}

impl ResilientClient {
    pub fn new(http: reqwest::Client, service_name: impl Into<String>) -> Self {
        Self {
            http,
            breaker: WindowedCircuitBreaker::new(CircuitBreakerConfig::github_api(service_name)),
            retry_config: ResilientClientConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, config: ResilientClientConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn circuit_state(&self) -> super::circuit_breaker::CircuitState {
        self.breaker.state()
    }

    /// Execute a single REST call through the full resilience pipeline.
    ///
    /// `build_request` is invoked fresh for every attempt since a consumed
    /// `reqwest::RequestBuilder` cannot be replayed.
    pub async fn execute_rest<F>(&self, build_request: F) -> Result<reqwest::Response, ApiError>
    where
        F: Fn(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.retry_config.delay_for_attempt(attempt - 1)).await;
            }

            let request = build_request(&self.http);
            let outcome = self
                .breaker
                .call(|| async move {
                    request
                        .send()
                        .await
                        .map_err(ApiError::HttpClientError)
                })
                .await;

            match outcome {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    if !is_retryable_status_for_retry(status) || attempt == self.retry_config.max_retries {
                        return Err(ApiError::HttpError {
                            status: status.as_u16(),
                            message: response.text().await.unwrap_or_default(),
                        });
                    }
                    last_error = Some(ApiError::HttpError {
                        status: status.as_u16(),
                        message: "retrying transient failure".to_string(),
                    });
                }
                Err(CircuitBreakerError::CircuitOpen { service }) => {
                    return Err(ApiError::CircuitBreakerOpen { service });
                }
                Err(CircuitBreakerError::HalfOpenProbeBusy { service }) => {
                    return Err(ApiError::CircuitBreakerOpen { service });
                }
                Err(CircuitBreakerError::Timeout { .. }) => {
                    last_error = Some(ApiError::Timeout);
                }
                Err(CircuitBreakerError::OperationFailed(err)) => {
                    let retryable = err.is_transient();
                    last_error = Some(err);
                    if !retryable || attempt == self.retry_config.max_retries {
                        break;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(ApiError::Timeout))
    }

    /// Execute a GraphQL call, applying the GraphQL envelope contract on top
    /// of the same resilience pipeline used for REST.
    pub async fn execute_graphql<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &str,
        variables: Value,
        auth_header: &str,
    ) -> Result<T, ApiError> {
        let body = serde_json::json!({ "query": query, "variables": variables });

        let response = self
            .execute_rest(|client| {
                client
                    .post(url)
                    .header("Authorization", auth_header)
                    .json(&body)
            })
            .await
            .map_err(|err| match err {
                ApiError::HttpError { status, message } => ApiError::GraphQlHttpError { status, message },
                other => other,
            })?;

        let envelope: Value = response.json().await.map_err(ApiError::HttpClientError)?;

        if let Some(errors) = envelope.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<String> = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect();
                return Err(ApiError::GraphQlError { messages });
            }
        }

        let data = envelope.get("data").cloned().unwrap_or(Value::Null);
        if data.is_null() {
            return Err(ApiError::GraphQlNoData);
        }

        serde_json::from_value(data).map_err(ApiError::JsonError)
    }
}

#[cfg(test)]
#[path = "resilient_tests.rs"]
mod tests;
