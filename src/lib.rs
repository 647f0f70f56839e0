//! # Uploadgate
//!
//! Security validation for untrusted file uploads.
//!
//! ## Overview
//!
//! Before an uploaded file reaches storage, Uploadgate decides whether it
//! may be kept. Each upload passes through a fixed sequence of checks, and
//! the first failing check rejects it:
//!
//! - Extension policy: a global dangerous-extension blocklist, then the
//!   category's allow-list
//! - Size limit per category
//! - MIME type sniffed from the bytes, never from the client's claim
//! - Magic bytes matching the claimed extension
//! - Heuristic detection of active content in PDFs
//! - Antivirus scan through clamd's INSTREAM protocol
//!
//! Accepted uploads get a random storage name. Every decision is written to
//! structured audit logs.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use uploadgate::{UploadCandidate, UploadValidator, ValidationResult};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let validator = UploadValidator::builder().build()?;
//!
//!     let candidate = UploadCandidate::from_path("/tmp/multipart-8812")
//!         .with_category("image")
//!         .with_filename("avatar.png");
//!
//!     match validator.validate(&candidate).await {
//!         ValidationResult::Accepted(upload) => println!("store as {}", upload.storage_id),
//!         ValidationResult::Rejected(rejection) => println!("{}", rejection.kind.message_key()),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Availability
//!
//! When clamd cannot be reached the scan is reported as skipped and, by
//! default, the upload is still accepted. Use
//! [`ScanUnavailablePolicy::FailClosed`] to reject instead, and a
//! [`CircuitBreaker`] to stop waiting on a daemon that is down.
//!
//! ## Architecture
//!
//! - **Core**: Fundamental types, traits, and error handling
//! - **Policy**: Category limits and the extension filter
//! - **Inspect**: Content sniffing, signature checks, PDF heuristics
//! - **Backends**: Antivirus scanner implementations
//! - **Circuit Breaker**: Resilience for a failing antivirus daemon
//! - **Pipeline**: The validator that runs every check in order
//! - **Audit**: Structured logging of every decision

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod circuit_breaker;
pub mod core;
pub mod inspect;
pub mod pipeline;
pub mod policy;

// Re-export commonly used types at the crate root
pub use crate::core::{
    AcceptedUpload, ConfigError, Rejection, RejectionKind, ScanError, ScanOutcome, Scanner,
    SkipReason, UploadCandidate, UploadContext, UploadSource, ValidationResult,
};

pub use crate::backends::{ClamAvConfig, ClamAvScanner};
pub use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
pub use crate::pipeline::{PipelineConfig, ScanUnavailablePolicy, UploadValidator};
pub use crate::policy::{CategoryPolicy, PolicyRegistry};

/// Prelude module for convenient imports.
///
/// ```rust
/// use uploadgate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        AcceptedUpload, ArcScanner, Rejection, RejectionKind, ScanOutcome, Scanner, SkipReason,
        UploadCandidate, UploadContext, ValidationResult,
    };
    pub use crate::backends::{ClamAvConfig, ClamAvScanner, MockScanner};
    pub use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
    pub use crate::pipeline::{PipelineConfig, ScanUnavailablePolicy, UploadValidator};
    pub use crate::policy::{CategoryPolicy, PolicyRegistry};
}
