//! Core types and traits for the uploadgate library.
//!
//! - [`types`] - Scan outcomes, content digests, request context
//! - [`traits`] - The `Scanner` trait for antivirus backends
//! - [`error`] - Structured error types
//! - [`input`] - Upload candidates and their byte sources
//! - [`hasher`] - BLAKE3 content digests for audit correlation
//! - [`identifier`] - Random storage names
//! - [`result`] - Validation results and rejection kinds
//! - [`duration_ms`] - Serde helper for millisecond durations

pub mod duration_ms;
pub mod error;
pub mod hasher;
pub mod identifier;
pub mod input;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{ConfigError, ScanError, UploadError};
pub use hasher::FileHasher;
pub use identifier::IdentifierGenerator;
pub use input::{UploadCandidate, UploadSource};
pub use result::{AcceptedUpload, Rejection, RejectionKind, ValidationResult};
pub use traits::{ArcScanner, Scanner};
pub use types::{FileHash, ScanOutcome, SkipReason, UploadContext};
