//! Error types for the uploadgate library.
//!
//! Expected validation failures are not errors: they are returned as
//! [`Rejection`](crate::core::Rejection) values. The types here cover the
//! genuinely exceptional paths: reading the upload source, talking to the
//! antivirus daemon, and loading configuration.

use crate::core::types::SkipReason;

use std::time::Duration;
use thiserror::Error;

/// Failure to materialize the bytes of an upload.
///
/// Surfaces to callers as an `InvalidUpload` rejection.
#[derive(Debug, Error)]
pub enum UploadError {
    /// File not found at the specified path.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// The source contained no bytes.
    #[error("upload is empty")]
    Empty,

    /// An I/O error occurred while reading the source.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport-level failure talking to a scanning engine.
///
/// Scanners never propagate these to the validator; they are folded into
/// `ScanOutcome::Skipped` after being logged.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The scanning engine is unavailable or not responding.
    #[error("engine '{engine}' is unavailable: {reason}")]
    EngineUnavailable {
        /// Name of the engine that is unavailable.
        engine: String,
        /// Human-readable reason for unavailability.
        reason: String,
    },

    /// A network step exceeded its deadline.
    #[error("{operation} timed out after {elapsed:?} on engine '{engine}'")]
    Timeout {
        /// Name of the engine that timed out.
        engine: String,
        /// The step that timed out ("connect", "send", "read").
        operation: &'static str,
        /// The deadline that was exceeded.
        elapsed: Duration,
    },

    /// Failed to connect to, or write to, the scanning engine.
    #[error("connection to engine '{engine}' failed: {message}")]
    ConnectionFailed {
        /// Name of the engine.
        engine: String,
        /// Error message describing the failure.
        message: String,
    },

    /// The engine returned a response that could not be interpreted.
    #[error("unrecognized response from engine '{engine}'")]
    UnrecognizedResponse {
        /// Name of the engine.
        engine: String,
        /// Raw response text; logged, never shown to end users.
        raw: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl ScanError {
    /// Returns `true` if this error indicates the engine is unhealthy.
    pub fn indicates_unhealthy_engine(&self) -> bool {
        matches!(
            self,
            Self::EngineUnavailable { .. } | Self::Timeout { .. } | Self::ConnectionFailed { .. }
        )
    }

    /// Returns the engine name if this error is associated with one.
    pub fn engine(&self) -> Option<&str> {
        match self {
            Self::EngineUnavailable { engine, .. }
            | Self::Timeout { engine, .. }
            | Self::ConnectionFailed { engine, .. }
            | Self::UnrecognizedResponse { engine, .. } => Some(engine),
            Self::Configuration { .. } => None,
        }
    }

    /// Maps this error to the reason reported in `ScanOutcome::Skipped`.
    pub fn skip_reason(&self) -> SkipReason {
        match self {
            Self::Timeout { .. } => SkipReason::Timeout,
            Self::UnrecognizedResponse { .. } => SkipReason::UnrecognizedResponse,
            _ => SkipReason::Unavailable,
        }
    }

    /// Creates an `EngineUnavailable` error.
    pub fn engine_unavailable(engine: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EngineUnavailable {
            engine: engine.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(engine: impl Into<String>, operation: &'static str, elapsed: Duration) -> Self {
        Self::Timeout {
            engine: engine.into(),
            operation,
            elapsed,
        }
    }

    /// Creates a `ConnectionFailed` error.
    pub fn connection_failed(engine: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Invalid pipeline or policy configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A category policy would permit no bytes at all.
    #[error("category '{category}' must have a positive max_size_bytes")]
    ZeroMaxSize {
        /// The offending category key.
        category: String,
    },

    /// The registry's default category was never registered.
    #[error("default category '{category}' is not registered")]
    MissingDefault {
        /// The configured default key.
        category: String,
    },

    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The antivirus client could not be built from the configuration.
    #[error(transparent)]
    Scanner(#[from] ScanError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_unhealthy() {
        let timeout = ScanError::timeout("clamav", "connect", Duration::from_secs(5));
        assert!(timeout.indicates_unhealthy_engine());

        let unrecognized = ScanError::UnrecognizedResponse {
            engine: "clamav".into(),
            raw: "garbage".into(),
        };
        assert!(!unrecognized.indicates_unhealthy_engine());
    }

    #[test]
    fn test_skip_reason_mapping() {
        let timeout = ScanError::timeout("clamav", "read", Duration::from_secs(30));
        assert_eq!(timeout.skip_reason(), SkipReason::Timeout);

        let refused = ScanError::connection_failed("clamav", "connection refused");
        assert_eq!(refused.skip_reason(), SkipReason::Unavailable);

        let garbage = ScanError::UnrecognizedResponse {
            engine: "clamav".into(),
            raw: "???".into(),
        };
        assert_eq!(garbage.skip_reason(), SkipReason::UnrecognizedResponse);
    }

    #[test]
    fn test_scan_error_engine() {
        let err = ScanError::engine_unavailable("clamav", "service not running");
        assert_eq!(err.engine(), Some("clamav"));
        assert_eq!(ScanError::configuration("bad").engine(), None);
    }

    #[test]
    fn test_unrecognized_response_hides_raw_text() {
        let err = ScanError::UnrecognizedResponse {
            engine: "clamav".into(),
            raw: "INSTREAM size limit exceeded. ERROR".into(),
        };
        assert!(!err.to_string().contains("ERROR"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ZeroMaxSize {
            category: "image".into(),
        };
        assert!(err.to_string().contains("image"));
    }
}
