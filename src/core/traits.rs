//! Core traits for the uploadgate library.
//!
//! This module defines the `Scanner` trait that antivirus backends
//! implement. The validator only talks to this trait, so a different
//! engine or a mock can be substituted without touching the pipeline.

use crate::core::error::ScanError;
use crate::core::types::ScanOutcome;

use async_trait::async_trait;
use std::fmt::Debug;

/// An antivirus scanning engine.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync`; one instance serves all
///   concurrent validations.
/// - `scan` never fails. Transport problems, timeouts and unparseable
///   answers are reported as `ScanOutcome::Skipped` so that the caller's
///   unavailability policy decides what happens next.
/// - Implementations must bound every network step with a timeout.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use uploadgate::core::{Scanner, ScanOutcome, ScanError};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct AlwaysClean;
///
/// #[async_trait]
/// impl Scanner for AlwaysClean {
///     fn name(&self) -> &str {
///         "always-clean"
///     }
///
///     async fn scan(&self, _data: &[u8]) -> ScanOutcome {
///         ScanOutcome::Clean
///     }
///
///     async fn health_check(&self) -> Result<(), ScanError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Scanner: Send + Sync + Debug {
    /// Returns a stable identifier like "clamav".
    fn name(&self) -> &str;

    /// Scans the given bytes.
    async fn scan(&self, data: &[u8]) -> ScanOutcome;

    /// Lightweight reachability check that sends no file data.
    async fn health_check(&self) -> Result<(), ScanError>;

    /// Returns the engine's signature database version, if available.
    async fn signature_version(&self) -> Option<String> {
        None
    }
}

/// An arc-wrapped scanner for shared ownership.
pub type ArcScanner = std::sync::Arc<dyn Scanner>;

#[async_trait]
impl<S: Scanner + ?Sized> Scanner for std::sync::Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn scan(&self, data: &[u8]) -> ScanOutcome {
        (**self).scan(data).await
    }

    async fn health_check(&self) -> Result<(), ScanError> {
        (**self).health_check().await
    }

    async fn signature_version(&self) -> Option<String> {
        (**self).signature_version().await
    }
}
