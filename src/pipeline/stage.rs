//! Validation state machine.

use crate::core::RejectionKind;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a validation currently stands.
///
/// Stages advance strictly in declaration order. `ContentScanned` is only
/// visited for PDFs. `Rejected` is reachable from every non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    /// The candidate was handed to the validator.
    Received,
    /// Filename extension passed the dangerous set and the allow-list.
    ExtensionChecked,
    /// The content was read and fits the category limit.
    SizeChecked,
    /// The sniffed MIME type is allowed.
    MimeChecked,
    /// Leading bytes match the extension.
    SignatureChecked,
    /// No active content was found in a PDF.
    ContentScanned,
    /// The antivirus stage passed (clean, or skipped under fail-open).
    AntivirusScanned,
    /// Terminal: the upload may be stored.
    Accepted,
    /// Terminal: a stage failed.
    Rejected,
}

impl ValidationStage {
    /// Returns the stage name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::ExtensionChecked => "extension_checked",
            Self::SizeChecked => "size_checked",
            Self::MimeChecked => "mime_checked",
            Self::SignatureChecked => "signature_checked",
            Self::ContentScanned => "content_scanned",
            Self::AntivirusScanned => "antivirus_scanned",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    /// Returns the stage whose check produces rejections of `kind`.
    ///
    /// Unreadable or empty sources fail while the size is being established.
    pub fn checked_by(kind: RejectionKind) -> Self {
        match kind {
            RejectionKind::ExtensionBlocked => Self::ExtensionChecked,
            RejectionKind::InvalidUpload | RejectionKind::SizeExceeded => Self::SizeChecked,
            RejectionKind::MimeMismatch => Self::MimeChecked,
            RejectionKind::SignatureMismatch => Self::SignatureChecked,
            RejectionKind::ActiveContentDetected => Self::ContentScanned,
            RejectionKind::Infected | RejectionKind::ScanUnavailable => Self::AntivirusScanned,
        }
    }

    /// Returns `true` for `Accepted` and `Rejected`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }

    /// Returns `true` if the state machine allows moving to `next`.
    pub fn can_advance_to(&self, next: ValidationStage) -> bool {
        use ValidationStage::*;

        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Rejected) => true,
            (Received, ExtensionChecked)
            | (ExtensionChecked, SizeChecked)
            | (SizeChecked, MimeChecked)
            | (MimeChecked, SignatureChecked)
            | (SignatureChecked, ContentScanned)
            | (SignatureChecked, AntivirusScanned)
            | (ContentScanned, AntivirusScanned)
            | (AntivirusScanned, Accepted) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ValidationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_legal() {
        let path = [
            ValidationStage::Received,
            ValidationStage::ExtensionChecked,
            ValidationStage::SizeChecked,
            ValidationStage::MimeChecked,
            ValidationStage::SignatureChecked,
            ValidationStage::ContentScanned,
            ValidationStage::AntivirusScanned,
            ValidationStage::Accepted,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(ValidationStage::SignatureChecked.can_advance_to(ValidationStage::AntivirusScanned));
    }

    #[test]
    fn test_no_skipping_or_leaving_terminal() {
        assert!(!ValidationStage::Received.can_advance_to(ValidationStage::MimeChecked));
        assert!(!ValidationStage::Accepted.can_advance_to(ValidationStage::Rejected));
        assert!(!ValidationStage::Rejected.can_advance_to(ValidationStage::Received));
        assert!(ValidationStage::MimeChecked.can_advance_to(ValidationStage::Rejected));
    }

    #[test]
    fn test_checked_by_follows_check_order() {
        assert_eq!(
            ValidationStage::checked_by(RejectionKind::ExtensionBlocked),
            ValidationStage::ExtensionChecked
        );
        assert_eq!(
            ValidationStage::checked_by(RejectionKind::InvalidUpload),
            ValidationStage::SizeChecked
        );
        assert_eq!(
            ValidationStage::checked_by(RejectionKind::ActiveContentDetected),
            ValidationStage::ContentScanned
        );
        assert_eq!(
            ValidationStage::checked_by(RejectionKind::ScanUnavailable),
            ValidationStage::AntivirusScanned
        );
        assert!(ValidationStage::ExtensionChecked
            .can_advance_to(ValidationStage::checked_by(RejectionKind::SizeExceeded)));
    }

    #[test]
    fn test_names() {
        assert_eq!(ValidationStage::SizeChecked.name(), "size_checked");
        assert_eq!(
            serde_json::to_string(&ValidationStage::AntivirusScanned).unwrap(),
            "\"antivirus_scanned\""
        );
    }
}
