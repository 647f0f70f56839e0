//! Circuit breaker configuration.

use crate::core::{ScanOutcome, SkipReason};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed scans before the circuit opens.
    pub failure_threshold: u32,

    /// Successful probes in half-open state before the circuit closes.
    pub success_threshold: u32,

    /// How long the circuit stays open before probing.
    #[serde(with = "crate::core::duration_ms", rename = "open_duration_ms")]
    pub open_duration: Duration,

    /// Concurrent probes allowed while half-open.
    pub half_open_max_probes: u32,

    /// Whether an unparseable daemon reply counts as a failure.
    pub count_unrecognized: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_duration: Duration::from_secs(30),
            half_open_max_probes: 1,
            count_unrecognized: false,
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Sets the success threshold.
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold.max(1);
        self
    }

    /// Sets the open duration.
    pub fn with_open_duration(mut self, duration: Duration) -> Self {
        self.open_duration = duration;
        self
    }

    /// Sets the maximum number of concurrent half-open probes.
    pub fn with_half_open_max_probes(mut self, max: u32) -> Self {
        self.half_open_max_probes = max.max(1);
        self
    }

    /// Sets whether unrecognized replies count as failures.
    pub fn with_count_unrecognized(mut self, count: bool) -> Self {
        self.count_unrecognized = count;
        self
    }

    /// Returns `true` if `outcome` should count against the engine.
    ///
    /// Verdicts, `Clean` or `Infected`, prove the daemon is alive.
    /// `CircuitOpen` from a nested breaker never counts.
    pub fn counts_as_failure(&self, outcome: &ScanOutcome) -> bool {
        match outcome {
            ScanOutcome::Clean | ScanOutcome::Infected { .. } => false,
            ScanOutcome::Skipped { reason } => match reason {
                SkipReason::Unavailable | SkipReason::Timeout => true,
                SkipReason::UnrecognizedResponse => self.count_unrecognized,
                SkipReason::CircuitOpen => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.success_threshold, 2);
        assert_eq!(config.open_duration, Duration::from_secs(30));
    }

    #[test]
    fn test_config_builder() {
        let config = CircuitBreakerConfig::new()
            .with_failure_threshold(10)
            .with_half_open_max_probes(0)
            .with_open_duration(Duration::from_secs(60));

        assert_eq!(config.failure_threshold, 10);
        assert_eq!(config.half_open_max_probes, 1);
        assert_eq!(config.open_duration, Duration::from_secs(60));
    }

    #[test]
    fn test_failure_classification() {
        let config = CircuitBreakerConfig::default();

        assert!(!config.counts_as_failure(&ScanOutcome::Clean));
        assert!(!config.counts_as_failure(&ScanOutcome::infected("Eicar")));
        assert!(config.counts_as_failure(&ScanOutcome::skipped(SkipReason::Unavailable)));
        assert!(config.counts_as_failure(&ScanOutcome::skipped(SkipReason::Timeout)));
        assert!(!config.counts_as_failure(&ScanOutcome::skipped(SkipReason::CircuitOpen)));

        let unrecognized = ScanOutcome::skipped(SkipReason::UnrecognizedResponse);
        assert!(!config.counts_as_failure(&unrecognized));
        assert!(config
            .with_count_unrecognized(true)
            .counts_as_failure(&unrecognized));
    }

    #[test]
    fn test_config_from_json() {
        let config: CircuitBreakerConfig =
            serde_json::from_str(r#"{"failure_threshold":3,"open_duration_ms":1000}"#).unwrap();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.open_duration, Duration::from_secs(1));
        assert_eq!(config.half_open_max_probes, 1);
    }
}
