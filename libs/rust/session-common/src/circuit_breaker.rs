//! Circuit breaker implementation for resilience.
//!
//! Protects callers from a failing downstream store: after a run of
//! consecutive failures the breaker opens and short-circuits every call for a
//! cooldown period, then lets a single trial call through before closing.

use crate::PlatformError;
use std::future::Future;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, requests are allowed
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Circuit is half-open, a trial request tests recovery
    HalfOpen,
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Maximum gap between two failures for them to count as consecutive
    pub failure_window: Duration,
    /// Number of successful trial calls in half-open state to close the circuit
    pub success_threshold: u32,
    /// Cooldown before an open circuit admits a trial call
    pub timeout: Duration,
    /// Maximum concurrent trial calls in half-open state
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            success_threshold: 1,
            timeout: Duration::from_secs(30),
            half_open_max_requests: 1,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new config with custom failure threshold.
    #[must_use]
    pub const fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Create a new config with custom rolling failure window.
    #[must_use]
    pub const fn with_failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }

    /// Create a new config with custom success threshold.
    #[must_use]
    pub const fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Create a new config with custom cooldown.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Circuit breaker for protecting external services.
///
/// Implements the circuit breaker pattern with three states:
/// - Closed: Normal operation, requests are allowed
/// - Open: Failure threshold exceeded, requests are rejected
/// - Half-Open: Cooldown elapsed, a single trial request is allowed
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: RwLock<CircuitState>,
    failures: AtomicU32,
    successes: AtomicU32,
    last_failure: RwLock<Option<Instant>>,
    opened_at: RwLock<Option<Instant>>,
    half_open_requests: AtomicU32,
    // Bumped on every trip and close; results of calls admitted under an
    // older generation are not recorded.
    generation: AtomicU64,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: RwLock::new(CircuitState::Closed),
            failures: AtomicU32::new(0),
            successes: AtomicU32::new(0),
            last_failure: RwLock::new(None),
            opened_at: RwLock::new(None),
            half_open_requests: AtomicU32::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Create a circuit breaker with default configuration.
    #[must_use]
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CircuitBreakerConfig::default())
    }

    /// Name used in errors and logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `op` through the breaker.
    ///
    /// Rejected calls fail with [`PlatformError::CircuitOpen`] without polling
    /// `op`. Every error returned by `op` counts as a failure, unless the
    /// circuit changed state while `op` was in flight. While half-open only
    /// the trial call decides whether the circuit closes.
    ///
    /// # Errors
    ///
    /// Returns `CircuitOpen` when the call is shed, otherwise whatever `op`
    /// returns.
    pub async fn call<T, F>(&self, op: F) -> Result<T, PlatformError>
    where
        F: Future<Output = Result<T, PlatformError>>,
    {
        let generation = self.generation.load(Ordering::SeqCst);
        let admission = self.admit().await;
        if admission == Admission::Rejected {
            return Err(PlatformError::circuit_open(&self.name));
        }

        // Releases a half-open slot if the caller drops us mid-flight.
        let mut permit = TrialPermit {
            counter: &self.half_open_requests,
            armed: admission == Admission::Trial,
        };

        let result = op.await;
        permit.armed = false;

        self.settle(admission, generation, result.is_ok()).await;
        result
    }

    async fn settle(&self, admission: Admission, generation: u64, succeeded: bool) {
        let current = *self.state.read().await;
        let stale = self.generation.load(Ordering::SeqCst) != generation
            || (current == CircuitState::HalfOpen && admission != Admission::Trial);
        if stale {
            debug!(circuit = %self.name, succeeded, "Ignoring result of call admitted before state change");
            return;
        }

        if succeeded {
            self.record_success().await;
        } else {
            self.record_failure().await;
        }
    }

    /// Check if a request is allowed.
    ///
    /// Returns `true` if the request should proceed, `false` if it should be rejected.
    pub async fn allow_request(&self) -> bool {
        self.admit().await != Admission::Rejected
    }

    async fn admit(&self) -> Admission {
        let current = *self.state.read().await;
        match current {
            CircuitState::Closed => Admission::Normal,
            CircuitState::HalfOpen => self.take_trial_slot(),
            CircuitState::Open => {
                let cooled_down = self
                    .opened_at
                    .read()
                    .await
                    .is_some_and(|opened| opened.elapsed() >= self.config.timeout);
                if !cooled_down {
                    return Admission::Rejected;
                }

                let mut state = self.state.write().await;
                match *state {
                    CircuitState::Open => {
                        *state = CircuitState::HalfOpen;
                        self.successes.store(0, Ordering::SeqCst);
                        self.half_open_requests.store(1, Ordering::SeqCst);
                        info!(circuit = %self.name, "Circuit half-open, admitting trial call");
                        Admission::Trial
                    }
                    CircuitState::HalfOpen => self.take_trial_slot(),
                    CircuitState::Closed => Admission::Normal,
                }
            }
        }
    }

    /// Record a successful request.
    ///
    /// In half-open state, enough successful trials close the circuit.
    pub async fn record_success(&self) {
        let current = *self.state.read().await;
        match current {
            CircuitState::HalfOpen => {
                let successes = self.successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    *self.state.write().await = CircuitState::Closed;
                    self.failures.store(0, Ordering::SeqCst);
                    self.successes.store(0, Ordering::SeqCst);
                    self.half_open_requests.store(0, Ordering::SeqCst);
                    *self.opened_at.write().await = None;
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    info!(circuit = %self.name, "Circuit closed");
                } else {
                    release_slot(&self.half_open_requests);
                }
            }
            CircuitState::Closed => {
                self.failures.store(0, Ordering::SeqCst);
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed request.
    ///
    /// Failures spaced further apart than the failure window restart the
    /// count. A failed half-open trial re-opens the circuit immediately.
    pub async fn record_failure(&self) {
        let now = Instant::now();
        let previous = self.last_failure.write().await.replace(now);

        let current = *self.state.read().await;
        match current {
            CircuitState::Closed => {
                let within_window =
                    previous.is_some_and(|last| now.duration_since(last) <= self.config.failure_window);
                let failures = if within_window {
                    self.failures.fetch_add(1, Ordering::SeqCst) + 1
                } else {
                    self.failures.store(1, Ordering::SeqCst);
                    1
                };
                if failures >= self.config.failure_threshold {
                    self.trip(now, failures).await;
                }
            }
            CircuitState::HalfOpen => {
                let failures = self.failures.fetch_add(1, Ordering::SeqCst) + 1;
                self.trip(now, failures).await;
            }
            CircuitState::Open => {}
        }
    }

    /// Get the current circuit state.
    pub async fn state(&self) -> CircuitState {
        *self.state.read().await
    }

    /// Get the current failure count.
    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    /// Reset the circuit breaker to closed state.
    pub async fn reset(&self) {
        *self.state.write().await = CircuitState::Closed;
        self.failures.store(0, Ordering::SeqCst);
        self.successes.store(0, Ordering::SeqCst);
        self.half_open_requests.store(0, Ordering::SeqCst);
        *self.last_failure.write().await = None;
        *self.opened_at.write().await = None;
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    async fn trip(&self, now: Instant, failures: u32) {
        *self.state.write().await = CircuitState::Open;
        *self.opened_at.write().await = Some(now);
        self.successes.store(0, Ordering::SeqCst);
        self.half_open_requests.store(0, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        warn!(
            circuit = %self.name,
            failures = failures,
            cooldown_ms = u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX),
            "Circuit opened"
        );
    }

    fn take_trial_slot(&self) -> Admission {
        let taken = self.half_open_requests.fetch_add(1, Ordering::SeqCst);
        if taken < self.config.half_open_max_requests {
            Admission::Trial
        } else {
            release_slot(&self.half_open_requests);
            Admission::Rejected
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Rejected,
    Normal,
    Trial,
}

fn release_slot(counter: &AtomicU32) {
    let _ = counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
        Some(n.saturating_sub(1))
    });
}

struct TrialPermit<'a> {
    counter: &'a AtomicU32,
    armed: bool,
}

impl Drop for TrialPermit<'_> {
    fn drop(&mut self) {
        if self.armed {
            release_slot(self.counter);
        }
    }
}
