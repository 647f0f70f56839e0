//! Content-type detection from file bytes.

use crate::core::Rejection;
use crate::inspect::signature::{HEIF_BRANDS, MPEG_FRAME_SYNCS};
use crate::policy::CategoryPolicy;

use infer::Infer;
use serde::{Deserialize, Serialize};

/// MIME type reported when no known magic number matches.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A content type determined from bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SniffedType {
    /// The detected MIME type.
    pub mime: String,
    /// Canonical extension for the detected type, if known.
    pub extension: Option<String>,
}

impl SniffedType {
    fn unknown() -> Self {
        Self {
            mime: OCTET_STREAM.to_string(),
            extension: None,
        }
    }

    /// Returns `true` if the content was recognized.
    pub fn is_known(&self) -> bool {
        self.mime != OCTET_STREAM
    }
}

/// Determines the real content type of an upload.
///
/// Only the bytes are consulted; the client's declared content type is
/// never trusted. Detection is `infer` extended with matchers for the HEIF
/// brands and MPEG frame syncs the signature table accepts, which `infer`
/// alone does not recognize.
pub struct ContentSniffer {
    infer: Infer,
}

impl ContentSniffer {
    /// Creates a new sniffer.
    pub fn new() -> Self {
        let mut infer = Infer::new();
        infer.add("image/heif", "heif", is_heif_brand);
        infer.add("audio/mpeg", "mp3", is_mpeg_frame);
        Self { infer }
    }

    /// Detects the MIME type of `data`.
    pub fn detect(&self, data: &[u8]) -> SniffedType {
        match self.infer.get(data) {
            Some(kind) => SniffedType {
                mime: kind.mime_type().to_string(),
                extension: Some(kind.extension().to_string()),
            },
            None => SniffedType::unknown(),
        }
    }

    /// Detects the MIME type and checks it against the category policy.
    pub fn check(&self, data: &[u8], policy: &CategoryPolicy) -> Result<SniffedType, Rejection> {
        let sniffed = self.detect(data);
        if !policy.allows_mime(&sniffed.mime) {
            return Err(Rejection::mime_mismatch(&sniffed.mime));
        }
        Ok(sniffed)
    }
}

impl Default for ContentSniffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContentSniffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentSniffer").finish_non_exhaustive()
    }
}

fn is_heif_brand(buf: &[u8]) -> bool {
    buf.get(4..8) == Some(b"ftyp".as_slice())
        && buf
            .get(8..12)
            .is_some_and(|major| HEIF_BRANDS.iter().any(|brand| brand.as_slice() == major))
}

fn is_mpeg_frame(buf: &[u8]) -> bool {
    buf.get(0..2)
        .is_some_and(|head| MPEG_FRAME_SYNCS.iter().any(|sync| sync.as_slice() == head))
}
