//! Bounded retry composed with per-endpoint circuit breakers.
//!
//! Every attempt asks the endpoint's breaker for permission first, so an
//! Open breaker short-circuits all remaining attempts of a call.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tracing::{error, warn};

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState, Clock, SystemClock};
use crate::retry::RetryConfig;
use crate::upstream::{UpstreamEndpoint, UpstreamError, UpstreamErrorKind};

#[derive(Debug)]
pub struct ResiliencePolicy {
    retry: RetryConfig,
    breakers: HashMap<UpstreamEndpoint, Arc<CircuitBreaker>>,
}

impl Default for ResiliencePolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default(), CircuitBreakerConfig::default())
    }
}

impl ResiliencePolicy {
    pub fn new(retry: RetryConfig, breaker: CircuitBreakerConfig) -> Self {
        Self::with_clock(retry, breaker, Arc::new(SystemClock))
    }

    /// Build a policy whose breakers read time from `clock`.
    pub fn with_clock(
        retry: RetryConfig,
        breaker: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let breakers = UpstreamEndpoint::ALL
            .into_iter()
            .map(|endpoint| {
                let breaker = CircuitBreaker::with_clock(endpoint.as_str(), breaker, Arc::clone(&clock));
                (endpoint, Arc::new(breaker))
            })
            .collect();

        Self { retry, breakers }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn breaker(&self, endpoint: UpstreamEndpoint) -> Option<&Arc<CircuitBreaker>> {
        self.breakers.get(&endpoint)
    }

    pub fn circuit_state(&self, endpoint: UpstreamEndpoint) -> CircuitState {
        self.breaker(endpoint)
            .map(|breaker| breaker.state())
            .unwrap_or(CircuitState::Closed)
    }

    /// Run `operation` under retry and the endpoint's breaker.
    ///
    /// Only `Unavailable` outcomes are retried and counted as breaker
    /// failures. `Malformed` and `Rejected` outcomes show the upstream is
    /// reachable, so they reset the breaker and return immediately. A failure
    /// that opens the breaker ends the call with `CircuitOpen` without
    /// waiting out the retry delay.
    pub async fn execute<T, F, Fut>(
        &self,
        endpoint: UpstreamEndpoint,
        mut operation: F,
    ) -> Result<T, UpstreamError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let attempts = self.retry.attempts();
        let breaker = self.breakers.get(&endpoint);
        let mut last_error = UpstreamError::unavailable("no attempt was made");

        for attempt in 0..attempts {
            // Dropping this future mid-call drops the permit, which hands a
            // HalfOpen trial slot back to the breaker.
            let permit = match breaker {
                Some(breaker) => match breaker.acquire() {
                    Some(permit) => Some(permit),
                    None => return Err(UpstreamError::circuit_open(endpoint)),
                },
                None => None,
            };

            match operation().await {
                Ok(value) => {
                    if let Some(permit) = permit {
                        permit.success();
                    }
                    return Ok(value);
                }
                Err(err) if err.kind() == UpstreamErrorKind::Unavailable => {
                    if let Some(permit) = permit {
                        permit.failure();
                    }

                    let remaining = attempts - attempt - 1;
                    if remaining > 0 {
                        if breaker.is_some_and(|breaker| breaker.state() == CircuitState::Open) {
                            warn!(
                                endpoint = %endpoint,
                                attempt = attempt + 1,
                                error = %err,
                                "circuit opened, skipping remaining attempts"
                            );
                            return Err(UpstreamError::circuit_open(endpoint));
                        }

                        let delay = self.retry.delay_for_attempt(attempt);
                        warn!(
                            endpoint = %endpoint,
                            attempt = attempt + 1,
                            remaining,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "upstream call failed, retrying"
                        );
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    last_error = err;
                }
                Err(err) => {
                    if let Some(permit) = permit {
                        permit.success();
                    }
                    return Err(err);
                }
            }
        }

        error!(
            endpoint = %endpoint,
            attempts,
            error = %last_error,
            "upstream call failed after exhausting retries"
        );
        Err(last_error)
    }
}
