//! Circuit breaker state machine.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// The current state of a circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakerState {
    /// Scans pass through; failures are counted.
    Closed {
        /// Failed scans since the last verdict.
        consecutive_failures: u32,
    },

    /// Scans are skipped without contacting the daemon.
    Open {
        /// When probing may begin.
        until: Instant,
    },

    /// A limited number of probe scans are let through.
    HalfOpen {
        /// Probes that returned a verdict.
        successes: u32,
        /// Probes currently running.
        in_flight: u32,
    },
}

impl BreakerState {
    /// Creates a new closed state.
    pub fn closed() -> Self {
        Self::Closed {
            consecutive_failures: 0,
        }
    }

    /// Creates an open state lasting until `until`.
    pub fn open_until(until: Instant) -> Self {
        Self::Open { until }
    }

    /// Returns `true` if the circuit is closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }

    /// Returns `true` if the circuit is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }

    /// Returns `true` if the circuit is half-open.
    pub fn is_half_open(&self) -> bool {
        matches!(self, Self::HalfOpen { .. })
    }

    /// Returns the state name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed { .. } => "closed",
            Self::Open { .. } => "open",
            Self::HalfOpen { .. } => "half_open",
        }
    }
}

impl Default for BreakerState {
    fn default() -> Self {
        Self::closed()
    }
}

/// Counters describing what the breaker has done.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerMetrics {
    /// Scans forwarded to the engine.
    pub forwarded: u64,
    /// Forwarded scans that counted as failures.
    pub failures: u64,
    /// Scans answered with `CircuitOpen` without contacting the engine.
    pub short_circuited: u64,
    /// Transitions into the open state.
    pub times_opened: u64,
    /// Transitions from half-open back to closed.
    pub times_closed: u64,
}

impl BreakerMetrics {
    /// Creates new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of forwarded scans that failed (0.0 to 1.0).
    pub fn failure_rate(&self) -> f64 {
        if self.forwarded == 0 {
            return 0.0;
        }
        self.failures as f64 / self.forwarded as f64
    }
}
