use std::fmt::Debug;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

/// Runtime circuit state for one upstream endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Time source for breaker cool-downs.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

/// Wall clock backed by [`Instant::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock for deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_in_flight: false,
        }
    }
}

/// Thread-safe circuit breaker for one upstream endpoint.
///
/// Every transition happens under a single lock together with the failure
/// counter update, so concurrent callers cannot double-trip or double-reset.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<CircuitInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new("default", CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    /// Ask permission for one upstream call.
    ///
    /// Closed admits everything. Open admits nothing until the cool-down has
    /// elapsed, then moves to HalfOpen and admits exactly one trial call;
    /// further callers are refused until the trial reports back.
    pub fn allow_request(&self) -> bool {
        self.admit().is_some()
    }

    /// Like [`allow_request`](Self::allow_request), but hands back a permit
    /// that reports the outcome. A permit dropped without a report (the call
    /// was cancelled) gives the HalfOpen trial slot back.
    pub fn acquire(&self) -> Option<CallPermit<'_>> {
        self.admit().map(|trial| CallPermit {
            breaker: self,
            trial,
            reported: false,
        })
    }

    /// Returns `Some(is_trial)` when the call is admitted.
    fn admit(&self) -> Option<bool> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => Some(false),
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    None
                } else {
                    inner.trial_in_flight = true;
                    Some(true)
                }
            }
            CircuitState::Open => {
                let now = self.clock.now();
                let cool_down_elapsed = inner
                    .opened_at
                    .map(|opened_at| now.saturating_duration_since(opened_at) >= self.config.open_timeout)
                    .unwrap_or(false);

                if cool_down_elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.opened_at = None;
                    inner.trial_in_flight = true;
                    Some(true)
                } else {
                    None
                }
            }
        }
    }

    fn release_trial(&self) {
        let mut inner = self.lock();
        if inner.state == CircuitState::HalfOpen && inner.trial_in_flight {
            debug!(endpoint = %self.name, "trial call abandoned, slot released");
            inner.trial_in_flight = false;
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.state != CircuitState::Closed {
            info!(endpoint = %self.name, "circuit closed after successful trial call");
        }
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
        inner.trial_in_flight = false;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.trial_in_flight = false;

        if inner.state == CircuitState::HalfOpen
            || inner.consecutive_failures >= self.config.failure_threshold
        {
            if inner.state != CircuitState::Open {
                warn!(
                    endpoint = %self.name,
                    failures = inner.consecutive_failures,
                    cool_down_ms = self.config.open_timeout.as_millis() as u64,
                    "circuit opened"
                );
            }
            inner.state = CircuitState::Open;
            inner.opened_at = Some(self.clock.now());
        }
    }

    /// Current state; an Open breaker whose cool-down elapsed still reports
    /// Open until a caller asks for permission.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, CircuitInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Permission for one admitted call, obtained from [`CircuitBreaker::acquire`].
#[derive(Debug)]
#[must_use = "report the call outcome or drop the permit to release it"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    reported: bool,
}

impl CallPermit<'_> {
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    pub fn success(mut self) {
        self.reported = true;
        self.breaker.record_success();
    }

    pub fn failure(mut self) {
        self.reported = true;
        self.breaker.record_failure();
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if self.trial && !self.reported {
            self.breaker.release_trial();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, clock: Arc<ManualClock>) -> CircuitBreaker {
        CircuitBreaker::with_clock(
            "latest",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                open_timeout: Duration::from_secs(30),
            },
            clock,
        )
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = breaker(2, Arc::new(ManualClock::new()));

        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
    }

    #[test]
    fn success_resets_the_failure_count() {
        let breaker = breaker(3, Arc::new(ManualClock::new()));

        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 1);
    }

    #[test]
    fn transitions_to_half_open_after_timeout_then_closes_on_success() {
        let clock = Arc::new(ManualClock::new());
        let breaker = breaker(1, clock.clone());

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(29));
        assert!(!breaker.allow_request());

        clock.advance(Duration::from_secs(1));
        assert!(breaker.allow_request());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[test]
    fn half_open_admits_a_single_trial() {
        let clock = Arc::new(ManualClock::new());
        let breaker = breaker(1, clock.clone());

        breaker.record_failure();
        clock.advance(Duration::from_secs(30));

        assert!(breaker.allow_request());
        assert!(!breaker.allow_request(), "second caller must wait for the trial");
    }

    #[test]
    fn failed_trial_reopens_for_a_full_cool_down() {
        let clock = Arc::new(ManualClock::new());
        let breaker = breaker(3, clock.clone());

        for _ in 0..3 {
            breaker.record_failure();
        }
        clock.advance(Duration::from_secs(30));
        assert!(breaker.allow_request());

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(10));
        assert!(!breaker.allow_request());
        clock.advance(Duration::from_secs(20));
        assert!(breaker.allow_request());
    }

    #[test]
    fn dropped_trial_permit_releases_the_slot() {
        let clock = Arc::new(ManualClock::new());
        let breaker = breaker(1, clock.clone());

        breaker.record_failure();
        clock.advance(Duration::from_secs(30));

        let permit = breaker.acquire().expect("trial admitted");
        assert!(permit.is_trial());
        assert!(breaker.acquire().is_none());
        drop(permit);

        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        let retry = breaker.acquire().expect("slot released");
        retry.success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn dropped_closed_permit_leaves_state_alone() {
        let breaker = breaker(2, Arc::new(ManualClock::new()));

        breaker.record_failure();
        let permit = breaker.acquire().expect("closed admits");
        assert!(!permit.is_trial());
        drop(permit);

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 1);
    }
}
