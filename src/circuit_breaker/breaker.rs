//! Circuit breaker implementation.

use crate::circuit_breaker::config::CircuitBreakerConfig;
use crate::circuit_breaker::state::{BreakerMetrics, BreakerState};
use crate::core::{ScanError, ScanOutcome, Scanner, SkipReason};

use async_trait::async_trait;
use std::fmt;
use std::sync::{RwLock, RwLockWriteGuard};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// How a scan was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    Normal,
    Probe,
}

/// A circuit breaker wrapper around a scanner.
///
/// After `failure_threshold` consecutive unavailable or timed-out scans the
/// circuit opens and further scans return `Skipped{CircuitOpen}`
/// immediately. Once `open_duration` has elapsed, up to
/// `half_open_max_probes` scans are forwarded; `success_threshold`
/// verdicts close the circuit again and any failure reopens it.
///
/// # Example
///
/// ```rust,ignore
/// use uploadgate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
/// use uploadgate::backends::ClamAvScanner;
///
/// let scanner = ClamAvScanner::with_defaults()?;
/// let protected = CircuitBreaker::new(scanner, CircuitBreakerConfig::default());
/// let outcome = protected.scan(&bytes).await;
/// ```
pub struct CircuitBreaker<S: Scanner> {
    inner: S,
    state: RwLock<BreakerState>,
    config: CircuitBreakerConfig,
    metrics: RwLock<BreakerMetrics>,
}

impl<S: Scanner> CircuitBreaker<S> {
    /// Creates a new circuit breaker with the given scanner and configuration.
    pub fn new(scanner: S, config: CircuitBreakerConfig) -> Self {
        Self {
            inner: scanner,
            state: RwLock::new(BreakerState::closed()),
            config,
            metrics: RwLock::new(BreakerMetrics::new()),
        }
    }

    /// Creates a new circuit breaker with default configuration.
    pub fn with_defaults(scanner: S) -> Self {
        Self::new(scanner, CircuitBreakerConfig::default())
    }

    /// Returns the current state of the circuit breaker.
    pub fn state(&self) -> BreakerState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns a copy of the current metrics.
    pub fn metrics(&self) -> BreakerMetrics {
        self.metrics
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Forces the circuit into the open state.
    pub fn force_open(&self) {
        let mut state = self.write_state();
        self.trip(&mut state);
    }

    /// Forces the circuit into the closed state.
    pub fn force_close(&self) {
        *self.write_state() = BreakerState::closed();
        self.write_metrics().times_closed += 1;
    }

    /// Resets the circuit breaker state and metrics.
    pub fn reset(&self) {
        *self.write_state() = BreakerState::closed();
        *self.write_metrics() = BreakerMetrics::new();
    }

    /// Returns a reference to the wrapped scanner.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, BreakerState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_metrics(&self) -> RwLockWriteGuard<'_, BreakerMetrics> {
        self.metrics
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Opens the circuit. Caller holds the state lock.
    fn trip(&self, state: &mut BreakerState) {
        *state = BreakerState::open_until(Instant::now() + self.config.open_duration);
        self.write_metrics().times_opened += 1;
        warn!(
            engine = self.inner.name(),
            open_for = ?self.config.open_duration,
            "circuit opened; antivirus scans will be skipped"
        );
    }

    /// Decides whether a scan may reach the engine.
    fn admit(&self) -> Option<Admission> {
        let mut state = self.write_state();

        match &*state {
            BreakerState::Closed { .. } => Some(Admission::Normal),

            BreakerState::Open { until } => {
                if Instant::now() >= *until {
                    *state = BreakerState::HalfOpen {
                        successes: 0,
                        in_flight: 1,
                    };
                    debug!(engine = self.inner.name(), "circuit half-open; probing");
                    Some(Admission::Probe)
                } else {
                    None
                }
            }

            BreakerState::HalfOpen {
                successes,
                in_flight,
            } => {
                if *in_flight < self.config.half_open_max_probes {
                    *state = BreakerState::HalfOpen {
                        successes: *successes,
                        in_flight: in_flight + 1,
                    };
                    Some(Admission::Probe)
                } else {
                    None
                }
            }
        }
    }

    /// Returns a probe slot without recording a result.
    fn release_probe(&self) {
        let mut state = self.write_state();
        if let BreakerState::HalfOpen {
            successes,
            in_flight,
        } = &*state
        {
            *state = BreakerState::HalfOpen {
                successes: *successes,
                in_flight: in_flight.saturating_sub(1),
            };
        }
    }

    /// Updates the state machine with a finished scan.
    fn record(&self, outcome: &ScanOutcome, admission: Admission) {
        let failed = self.config.counts_as_failure(outcome);
        let mut state = self.write_state();
        {
            let mut metrics = self.write_metrics();
            metrics.forwarded += 1;
            if failed {
                metrics.failures += 1;
            }
        }

        match &*state {
            BreakerState::Closed {
                consecutive_failures,
            } => {
                if !failed {
                    *state = BreakerState::closed();
                } else if consecutive_failures + 1 >= self.config.failure_threshold {
                    self.trip(&mut state);
                } else {
                    *state = BreakerState::Closed {
                        consecutive_failures: consecutive_failures + 1,
                    };
                }
            }

            BreakerState::HalfOpen {
                successes,
                in_flight,
            } => {
                let in_flight = if admission == Admission::Probe {
                    in_flight.saturating_sub(1)
                } else {
                    *in_flight
                };

                if failed {
                    self.trip(&mut state);
                } else if successes + 1 >= self.config.success_threshold {
                    *state = BreakerState::closed();
                    self.write_metrics().times_closed += 1;
                    info!(engine = self.inner.name(), "circuit closed; engine recovered");
                } else {
                    *state = BreakerState::HalfOpen {
                        successes: successes + 1,
                        in_flight,
                    };
                }
            }

            // A scan admitted before the circuit opened.
            BreakerState::Open { .. } => {}
        }
    }
}

/// Releases a half-open probe slot if the scan future is dropped early.
struct ProbeGuard<'a, S: Scanner> {
    breaker: &'a CircuitBreaker<S>,
    admission: Admission,
    settled: bool,
}

impl<'a, S: Scanner> ProbeGuard<'a, S> {
    fn settle(mut self, outcome: &ScanOutcome) {
        self.settled = true;
        self.breaker.record(outcome, self.admission);
    }
}

impl<S: Scanner> Drop for ProbeGuard<'_, S> {
    fn drop(&mut self) {
        if !self.settled && self.admission == Admission::Probe {
            self.breaker.release_probe();
        }
    }
}

impl<S: Scanner> fmt::Debug for CircuitBreaker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("inner", &self.inner)
            .field(
                "state",
                &*self
                    .state
                    .read()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()),
            )
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl<S: Scanner> Scanner for CircuitBreaker<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn scan(&self, data: &[u8]) -> ScanOutcome {
        let Some(admission) = self.admit() else {
            self.write_metrics().short_circuited += 1;
            debug!(engine = self.inner.name(), "circuit open; scan skipped");
            return ScanOutcome::skipped(SkipReason::CircuitOpen);
        };

        let guard = ProbeGuard {
            breaker: self,
            admission,
            settled: false,
        };
        let outcome = self.inner.scan(data).await;
        guard.settle(&outcome);
        outcome
    }

    async fn health_check(&self) -> Result<(), ScanError> {
        self.inner.health_check().await
    }

    async fn signature_version(&self) -> Option<String> {
        self.inner.signature_version().await
    }
}
