//! Content inspection stages.
//!
//! - [`sniffer`] - MIME detection from bytes
//! - [`signature`] - Magic-byte and container verification per extension
//! - [`active_content`] - PDF active-content heuristics

pub mod active_content;
pub mod signature;
pub mod sniffer;

pub use active_content::{ActiveContentScanner, PDF_ACTIVE_MARKERS, PDF_MIME};
pub use signature::{
    SignatureRule, SignatureStrategy, SignatureTable, SignatureVerifier, HEADER_LEN, HEIF_BRANDS,
    MPEG_FRAME_SYNCS,
};
pub use sniffer::{ContentSniffer, SniffedType, OCTET_STREAM};
