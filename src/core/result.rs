//! Validation result structures.
//!
//! A validation run ends in exactly one [`ValidationResult`]: either an
//! accepted upload carrying its storage name, or a rejection carrying a
//! [`RejectionKind`] and a message that is safe to show the uploader.

use crate::core::types::ScanOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an upload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionKind {
    /// The upload source could not be read, or was empty.
    InvalidUpload,
    /// The upload exceeds the category's size limit.
    SizeExceeded,
    /// The extension is dangerous or not allowed for the category.
    ExtensionBlocked,
    /// The sniffed content type is not allowed for the category.
    MimeMismatch,
    /// The leading bytes do not match the extension's format.
    SignatureMismatch,
    /// The PDF contains active-content markers.
    ActiveContentDetected,
    /// The antivirus engine reported a signature match.
    Infected,
    /// The antivirus engine produced no verdict and fail-closed is configured.
    ScanUnavailable,
}

impl RejectionKind {
    /// Returns `true` for rejections that suggest a hostile upload.
    ///
    /// These are audited at elevated severity.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            Self::ExtensionBlocked
                | Self::SignatureMismatch
                | Self::ActiveContentDetected
                | Self::Infected
        )
    }

    /// Stable key for the HTTP layer to look up a localized message.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::InvalidUpload => "upload.invalid",
            Self::SizeExceeded => "upload.size_exceeded",
            Self::ExtensionBlocked => "upload.extension_blocked",
            Self::MimeMismatch => "upload.mime_mismatch",
            Self::SignatureMismatch => "upload.signature_mismatch",
            Self::ActiveContentDetected => "upload.active_content",
            Self::Infected => "upload.infected",
            Self::ScanUnavailable => "upload.scan_unavailable",
        }
    }

    /// Returns the kind as a snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidUpload => "invalid_upload",
            Self::SizeExceeded => "size_exceeded",
            Self::ExtensionBlocked => "extension_blocked",
            Self::MimeMismatch => "mime_mismatch",
            Self::SignatureMismatch => "signature_mismatch",
            Self::ActiveContentDetected => "active_content_detected",
            Self::Infected => "infected",
            Self::ScanUnavailable => "scan_unavailable",
        }
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected upload.
///
/// `message` is user-facing English text. It never includes raw daemon
/// output or internal paths, only details already safe to disclose such
/// as the offending extension or a named threat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    /// The rejection category.
    pub kind: RejectionKind,
    /// User-facing message.
    pub message: String,
}

impl Rejection {
    /// Creates a new rejection.
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Upload could not be read.
    pub fn invalid_upload(message: impl Into<String>) -> Self {
        Self::new(RejectionKind::InvalidUpload, message)
    }

    /// Upload is larger than `max` bytes.
    pub fn size_exceeded(max: u64) -> Self {
        Self::new(
            RejectionKind::SizeExceeded,
            format!("File exceeds the maximum size of {} bytes", max),
        )
    }

    /// Extension is blocked or not allowed.
    pub fn extension_blocked(extension: &str) -> Self {
        let message = if extension.is_empty() {
            "Files without an extension are not allowed".to_string()
        } else {
            format!("File extension .{} is not allowed", extension)
        };
        Self::new(RejectionKind::ExtensionBlocked, message)
    }

    /// Content type is not allowed.
    pub fn mime_mismatch(detected: &str) -> Self {
        Self::new(
            RejectionKind::MimeMismatch,
            format!("File content of type {} is not allowed here", detected),
        )
    }

    /// Leading bytes do not match the extension.
    pub fn signature_mismatch(extension: &str) -> Self {
        Self::new(
            RejectionKind::SignatureMismatch,
            format!("File content does not match the .{} format", extension),
        )
    }

    /// PDF active content was found.
    pub fn active_content(threat: &str) -> Self {
        Self::new(
            RejectionKind::ActiveContentDetected,
            format!("Document contains active content ({})", threat),
        )
    }

    /// The antivirus engine reported a match.
    pub fn infected(signature_name: &str) -> Self {
        Self::new(
            RejectionKind::Infected,
            format!("Malware detected: {}", signature_name),
        )
    }

    /// No antivirus verdict under a fail-closed policy.
    pub fn scan_unavailable() -> Self {
        Self::new(
            RejectionKind::ScanUnavailable,
            "File could not be scanned for malware; please try again later",
        )
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// An accepted upload, ready for the storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedUpload {
    /// Random storage name, e.g. `"3f0c…e1.png"`.
    pub storage_id: String,
    /// MIME type sniffed from the content.
    pub detected_mime: String,
    /// Normalized extension that passed validation.
    pub detected_extension: String,
    /// What the antivirus stage reported.
    pub scan: ScanOutcome,
}

/// The terminal outcome of validating one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationResult {
    /// All stages passed.
    Accepted(AcceptedUpload),
    /// A stage rejected the upload.
    Rejected(Rejection),
}

impl ValidationResult {
    /// Returns `true` if the upload was accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// Returns `true` if the upload was rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// Returns the accepted upload, if any.
    pub fn accepted(&self) -> Option<&AcceptedUpload> {
        match self {
            Self::Accepted(upload) => Some(upload),
            Self::Rejected(_) => None,
        }
    }

    /// Returns the rejection, if any.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            Self::Accepted(_) => None,
        }
    }

    /// Returns the rejection kind, if rejected.
    pub fn rejection_kind(&self) -> Option<RejectionKind> {
        self.rejection().map(|r| r.kind)
    }
}

impl From<Rejection> for ValidationResult {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_relevance() {
        assert!(RejectionKind::ExtensionBlocked.is_security_relevant());
        assert!(RejectionKind::Infected.is_security_relevant());
        assert!(!RejectionKind::SizeExceeded.is_security_relevant());
        assert!(!RejectionKind::ScanUnavailable.is_security_relevant());
    }

    #[test]
    fn test_rejection_messages() {
        let r = Rejection::extension_blocked("php3");
        assert_eq!(r.kind, RejectionKind::ExtensionBlocked);
        assert!(r.message.contains(".php3"));

        let r = Rejection::extension_blocked("");
        assert!(r.message.contains("without an extension"));

        let r = Rejection::infected("Eicar-Test-Signature");
        assert!(r.message.contains("Eicar-Test-Signature"));
    }

    #[test]
    fn test_validation_result_accessors() {
        let accepted = ValidationResult::Accepted(AcceptedUpload {
            storage_id: "abc.png".into(),
            detected_mime: "image/png".into(),
            detected_extension: "png".into(),
            scan: ScanOutcome::Clean,
        });
        assert!(accepted.is_accepted());
        assert!(accepted.rejection().is_none());
        assert_eq!(accepted.accepted().unwrap().storage_id, "abc.png");

        let rejected: ValidationResult = Rejection::size_exceeded(10).into();
        assert!(rejected.is_rejected());
        assert_eq!(rejected.rejection_kind(), Some(RejectionKind::SizeExceeded));
        assert!(rejected.accepted().is_none());
    }

    #[test]
    fn test_validation_result_serialization() {
        let rejected: ValidationResult = Rejection::mime_mismatch("text/html").into();
        let json = serde_json::to_value(&rejected).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["kind"], "mime_mismatch");
    }

    #[test]
    fn test_message_keys_are_distinct() {
        let kinds = [
            RejectionKind::InvalidUpload,
            RejectionKind::SizeExceeded,
            RejectionKind::ExtensionBlocked,
            RejectionKind::MimeMismatch,
            RejectionKind::SignatureMismatch,
            RejectionKind::ActiveContentDetected,
            RejectionKind::Infected,
            RejectionKind::ScanUnavailable,
        ];
        let keys: std::collections::HashSet<_> = kinds.iter().map(|k| k.message_key()).collect();
        assert_eq!(keys.len(), kinds.len());
    }
}
