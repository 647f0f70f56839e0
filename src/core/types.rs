//! Core types used throughout the uploadgate library.
//!
//! This module defines the antivirus scan outcome, content digests, and the
//! request context carried into audit events.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of an antivirus scan.
///
/// Scanning never fails hard: transport problems and unexpected daemon
/// output are reported as `Skipped` so the validator can apply its
/// unavailability policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// No threats were detected.
    Clean,

    /// The engine reported a signature match.
    Infected {
        /// Signature name as reported by the engine (e.g. "Eicar-Test-Signature").
        signature_name: String,
    },

    /// The scan did not produce a verdict.
    Skipped {
        /// Why no verdict was produced.
        reason: SkipReason,
    },
}

impl ScanOutcome {
    /// Creates an `Infected` outcome.
    pub fn infected(signature_name: impl Into<String>) -> Self {
        Self::Infected {
            signature_name: signature_name.into(),
        }
    }

    /// Creates a `Skipped` outcome.
    pub fn skipped(reason: SkipReason) -> Self {
        Self::Skipped { reason }
    }

    /// Returns `true` if the outcome indicates a clean file.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    /// Returns `true` if the outcome indicates an infected file.
    pub fn is_infected(&self) -> bool {
        matches!(self, Self::Infected { .. })
    }

    /// Returns `true` if no verdict was produced.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Infected { .. } => "infected",
            Self::Skipped { .. } => "skipped",
        }
    }
}

/// Why a scan was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The daemon could not be reached or the connection broke.
    Unavailable,
    /// A network step exceeded its deadline.
    Timeout,
    /// The daemon answered with something other than OK or FOUND.
    UnrecognizedResponse,
    /// A circuit breaker is suppressing calls to a failing daemon.
    CircuitOpen,
}

impl SkipReason {
    /// Returns the reason as a stable string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Timeout => "timeout",
            Self::UnrecognizedResponse => "unrecognized response",
            Self::CircuitOpen => "circuit open",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content digest of an upload, used to correlate audit events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHash {
    /// BLAKE3 hash, hex encoded.
    pub blake3: String,
}

impl FileHash {
    /// Creates a new `FileHash`.
    pub fn new(blake3: impl Into<String>) -> Self {
        Self {
            blake3: blake3.into(),
        }
    }
}

impl fmt::Display for FileHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.blake3)
    }
}

/// Context information for an upload request.
///
/// Carries metadata about who uploaded the file, used only for audit
/// logging. Nothing here influences a validation decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadContext {
    /// Tenant identifier for multi-tenant systems.
    pub tenant_id: Option<String>,

    /// User identifier who initiated the upload.
    pub user_id: Option<String>,

    /// Request or correlation ID for tracing.
    pub request_id: Option<String>,

    /// Additional custom metadata as key-value pairs.
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, String>,
}

impl UploadContext {
    /// Creates a new empty upload context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the tenant ID.
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Sets the user ID.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the request ID.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Adds a custom metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
