//! Heuristic detection of active content in PDFs.
//!
//! This is a byte-level substring search, not a PDF parser. A marker that
//! only appears inside a comment still triggers a rejection, and markers
//! hidden in compressed or obfuscated streams are missed.

use crate::core::Rejection;

/// MIME type that triggers the scan.
pub const PDF_MIME: &str = "application/pdf";

/// PDF name tokens that indicate executable or auto-triggered content,
/// with the description reported to the uploader. Checked in order.
pub const PDF_ACTIVE_MARKERS: &[(&[u8], &str)] = &[
    (b"/JavaScript", "embedded JavaScript"),
    (b"/JS", "JavaScript action"),
    (b"/Launch", "launch action"),
    (b"/EmbeddedFile", "embedded file"),
    (b"/OpenAction", "automatic open action"),
    (b"/AA", "additional actions"),
    (b"/RichMedia", "rich media"),
    (b"/XFA", "XFA form"),
    (b"/AcroForm", "interactive form"),
];

/// Scans PDF bytes for active-content markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveContentScanner;

impl ActiveContentScanner {
    /// Creates a new scanner.
    pub fn new() -> Self {
        Self
    }

    /// Returns `true` if the upload should be scanned.
    pub fn applies_to(&self, detected_mime: &str, extension: &str) -> bool {
        detected_mime.eq_ignore_ascii_case(PDF_MIME) || extension == "pdf"
    }

    /// Returns the description of the first marker found, in table order.
    pub fn find_threat(&self, data: &[u8]) -> Option<&'static str> {
        PDF_ACTIVE_MARKERS
            .iter()
            .find(|(marker, _)| contains_ignore_ascii_case(data, marker))
            .map(|(_, description)| *description)
    }

    /// Rejects the upload if any marker is present.
    pub fn check(&self, data: &[u8]) -> Result<(), Rejection> {
        match self.find_threat(data) {
            Some(threat) => Err(Rejection::active_content(threat)),
            None => Ok(()),
        }
    }
}

fn contains_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    let Some((&first, _)) = needle.split_first() else {
        return true;
    };
    if haystack.len() < needle.len() {
        return false;
    }

    // Markers all start with '/', so most windows are skipped on one byte.
    haystack
        .windows(needle.len())
        .any(|window| window[0].eq_ignore_ascii_case(&first) && window.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RejectionKind;

    const CLEAN_PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n%%EOF\n";

    #[test]
    fn test_clean_pdf_passes() {
        assert!(ActiveContentScanner::new().check(CLEAN_PDF).is_ok());
    }

    #[test]
    fn test_javascript_detected() {
        let pdf = b"%PDF-1.4\n1 0 obj\n<< /S /JavaScript /JS (app.alert(1)) >>\nendobj\n";
        let err = ActiveContentScanner::new().check(pdf).unwrap_err();
        assert_eq!(err.kind, RejectionKind::ActiveContentDetected);
        assert!(err.message.contains("embedded JavaScript"));
    }

    #[test]
    fn test_marker_in_comment_is_still_rejected() {
        let pdf = b"%PDF-1.4\n% this document mentions /JavaScript in a comment\n%%EOF";
        assert_eq!(
            ActiveContentScanner::new().find_threat(pdf),
            Some("embedded JavaScript")
        );
    }

    #[test]
    fn test_case_insensitive() {
        let pdf = b"%PDF-1.7\n<< /openaction 3 0 R >>";
        assert_eq!(
            ActiveContentScanner::new().find_threat(pdf),
            Some("automatic open action")
        );
    }

    #[test]
    fn test_each_marker_detected() {
        let scanner = ActiveContentScanner::new();
        for (marker, _) in PDF_ACTIVE_MARKERS {
            let mut pdf = b"%PDF-1.5\n<< ".to_vec();
            pdf.extend_from_slice(marker);
            pdf.extend_from_slice(b" >>");
            assert!(scanner.find_threat(&pdf).is_some());
        }
    }

    #[test]
    fn test_applies_to() {
        let scanner = ActiveContentScanner::new();
        assert!(scanner.applies_to("application/pdf", "jpg"));
        assert!(scanner.applies_to("application/octet-stream", "pdf"));
        assert!(!scanner.applies_to("image/png", "png"));
    }

    #[test]
    fn test_contains_ignore_ascii_case() {
        assert!(contains_ignore_ascii_case(b"abc/LAUNCHdef", b"/launch"));
        assert!(!contains_ignore_ascii_case(b"/Laun", b"/launch"));
        assert!(contains_ignore_ascii_case(b"", b""));
    }
}
