//! Mock scanner for testing.
//!
//! Returns configured outcomes without a running daemon, so the validator
//! and circuit breaker can be exercised deterministically.

use crate::core::{FileHasher, ScanError, ScanOutcome, Scanner, SkipReason};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// A mock scanner for testing purposes.
///
/// Outcomes can be configured per content digest (BLAKE3 hex), with a
/// default for everything else.
///
/// # Examples
///
/// ```rust
/// use uploadgate::backends::MockScanner;
/// use uploadgate::core::{ScanOutcome, SkipReason};
/// use std::time::Duration;
///
/// // Everything is clean
/// let scanner = MockScanner::new_clean();
///
/// // Everything carries the EICAR signature
/// let scanner = MockScanner::new_infected("Eicar-Test-Signature");
///
/// // The daemon is down
/// let scanner = MockScanner::new_unavailable();
///
/// // Slow, with a custom default
/// let scanner = MockScanner::new()
///     .with_default_outcome(ScanOutcome::skipped(SkipReason::Timeout))
///     .with_latency(Duration::from_millis(100));
/// ```
#[derive(Debug)]
pub struct MockScanner {
    name: String,
    /// Outcomes keyed by BLAKE3 hex digest.
    responses: RwLock<HashMap<String, ScanOutcome>>,
    default_outcome: ScanOutcome,
    latency: Option<Duration>,
    /// Probability (0.0 to 1.0) that a scan reports `Skipped{Unavailable}`.
    fail_rate: f32,
    scan_count: AtomicU64,
    unhealthy: AtomicBool,
}

impl MockScanner {
    /// Creates a new mock scanner that reports clean.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            responses: RwLock::new(HashMap::new()),
            default_outcome: ScanOutcome::Clean,
            latency: None,
            fail_rate: 0.0,
            scan_count: AtomicU64::new(0),
            unhealthy: AtomicBool::new(false),
        }
    }

    /// Creates a mock scanner that always reports clean.
    pub fn new_clean() -> Self {
        Self::new()
    }

    /// Creates a mock scanner that always reports the given signature.
    pub fn new_infected(signature_name: impl Into<String>) -> Self {
        Self {
            default_outcome: ScanOutcome::infected(signature_name),
            ..Self::new()
        }
    }

    /// Creates a mock scanner whose daemon can never be reached.
    pub fn new_unavailable() -> Self {
        let scanner = Self {
            default_outcome: ScanOutcome::skipped(SkipReason::Unavailable),
            ..Self::new()
        };
        scanner.make_unhealthy();
        scanner
    }

    /// Sets the name of this scanner.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the default outcome for unknown content.
    pub fn with_default_outcome(mut self, outcome: ScanOutcome) -> Self {
        self.default_outcome = outcome;
        self
    }

    /// Adds an outcome for a specific BLAKE3 hex digest.
    pub fn with_response(self, hash: impl Into<String>, outcome: ScanOutcome) -> Self {
        self.add_response(hash, outcome);
        self
    }

    /// Sets the simulated latency for scans.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Sets the probability of a simulated unavailability.
    pub fn with_fail_rate(mut self, rate: f32) -> Self {
        self.fail_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Returns the number of scans performed.
    pub fn scan_count(&self) -> u64 {
        self.scan_count.load(Ordering::Relaxed)
    }

    /// Sets the health status.
    pub fn set_healthy(&self, healthy: bool) {
        self.unhealthy.store(!healthy, Ordering::Relaxed);
    }

    /// Makes health checks fail.
    pub fn make_unhealthy(&self) {
        self.set_healthy(false);
    }

    /// Makes health checks pass again.
    pub fn make_healthy(&self) {
        self.set_healthy(true);
    }

    /// Adds an outcome for a specific BLAKE3 hex digest.
    pub fn add_response(&self, hash: impl Into<String>, outcome: ScanOutcome) {
        self.responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(hash.into(), outcome);
    }

    /// Clears all configured responses.
    pub fn clear_responses(&self) {
        self.responses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    fn should_fail(&self, count: u64) -> bool {
        if self.fail_rate <= 0.0 {
            return false;
        }
        if self.fail_rate >= 1.0 {
            return true;
        }
        // Deterministic spread over the scan sequence.
        (count as f32 * 0.618_034) % 1.0 < self.fail_rate
    }
}

impl Default for MockScanner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scanner for MockScanner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scan(&self, data: &[u8]) -> ScanOutcome {
        let count = self.scan_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.should_fail(count) {
            return ScanOutcome::skipped(SkipReason::Unavailable);
        }

        let hash = FileHasher::new().hash_bytes(data);
        self.responses
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&hash.blake3)
            .cloned()
            .unwrap_or_else(|| self.default_outcome.clone())
    }

    async fn health_check(&self) -> Result<(), ScanError> {
        if self.unhealthy.load(Ordering::Relaxed) {
            return Err(ScanError::engine_unavailable(
                &self.name,
                "mock scanner is unhealthy",
            ));
        }
        Ok(())
    }

    async fn signature_version(&self) -> Option<String> {
        Some("mock/0".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_scanner_clean() {
        let scanner = MockScanner::new_clean();
        assert!(scanner.scan(b"test data").await.is_clean());
        assert_eq!(scanner.scan_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_scanner_infected() {
        let scanner = MockScanner::new_infected("Test.Malware");
        assert_eq!(
            scanner.scan(b"malicious data").await,
            ScanOutcome::infected("Test.Malware")
        );
    }

    #[tokio::test]
    async fn test_mock_scanner_unavailable() {
        let scanner = MockScanner::new_unavailable();
        assert_eq!(
            scanner.scan(b"anything").await,
            ScanOutcome::skipped(SkipReason::Unavailable)
        );
        assert!(scanner.health_check().await.is_err());
    }

    #[tokio::test]
    async fn test_mock_scanner_health_check() {
        let scanner = MockScanner::new();
        assert!(scanner.health_check().await.is_ok());

        scanner.make_unhealthy();
        assert!(scanner.health_check().await.is_err());

        scanner.make_healthy();
        assert!(scanner.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_scanner_response_by_digest() {
        let bad = b"known bad bytes";
        let digest = FileHasher::new().hash_bytes(bad).blake3;
        let scanner = MockScanner::new().with_response(digest, ScanOutcome::infected("Known.Bad"));

        assert!(scanner.scan(b"unknown file").await.is_clean());
        assert!(scanner.scan(bad).await.is_infected());

        scanner.clear_responses();
        assert!(scanner.scan(bad).await.is_clean());
    }

    #[tokio::test]
    async fn test_full_fail_rate() {
        let scanner = MockScanner::new().with_fail_rate(1.0);
        for _ in 0..3 {
            assert!(scanner.scan(b"x").await.is_skipped());
        }
        assert_eq!(scanner.scan_count(), 3);
    }
}
