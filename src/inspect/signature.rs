//! Magic-byte and container verification.
//!
//! Each extension maps to a [`SignatureStrategy`]. Extensions with no rule
//! pass unverified; registered ones must match their strategy exactly.

use crate::core::Rejection;

use std::collections::HashMap;

/// How many leading bytes the verifier inspects.
pub const HEADER_LEN: usize = 16;

/// Minimum header length needed to verify anything.
const MIN_HEADER_LEN: usize = 4;

/// Major brands accepted for `.heic` and `.heif` files.
pub const HEIF_BRANDS: [[u8; 4]; 4] = [*b"heic", *b"mif1", *b"msf1", *b"heif"];

/// MPEG audio frame-sync words accepted for `.mp3` files without an ID3 tag.
pub const MPEG_FRAME_SYNCS: [[u8; 2]; 3] = [[0xFF, 0xFB], [0xFF, 0xF3], [0xFF, 0xF2]];

const RIFF: &[u8; 4] = b"RIFF";
const FTYP: &[u8; 4] = b"ftyp";

/// How to recognize one file format from its first bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStrategy {
    /// The header starts with any of these byte sequences.
    Prefix(Vec<Vec<u8>>),

    /// `RIFF` at offset 0 and the form type at offset 8.
    Riff {
        /// Four-byte form type, e.g. `WEBP` or `WAVE`.
        form_type: [u8; 4],
    },

    /// `ftyp` at offset 4; the brand is not checked.
    IsoBmff,

    /// `ftyp` at offset 4 and one of `brands` at offset 8.
    IsoBmffBrand {
        /// Accepted major brands.
        brands: Vec<[u8; 4]>,
    },
}

impl SignatureStrategy {
    /// Convenience constructor for prefix rules.
    pub fn prefix<I, B>(magics: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        Self::Prefix(magics.into_iter().map(|m| m.as_ref().to_vec()).collect())
    }

    /// Returns `true` if `header` satisfies this strategy.
    pub fn matches(&self, header: &[u8]) -> bool {
        match self {
            Self::Prefix(magics) => magics.iter().any(|magic| header.starts_with(magic)),
            Self::Riff { form_type } => {
                header.get(0..4) == Some(RIFF.as_slice())
                    && header.get(8..12) == Some(form_type.as_slice())
            }
            Self::IsoBmff => header.get(4..8) == Some(FTYP.as_slice()),
            Self::IsoBmffBrand { brands } => {
                header.get(4..8) == Some(FTYP.as_slice())
                    && header
                        .get(8..12)
                        .is_some_and(|brand| brands.iter().any(|b| b.as_slice() == brand))
            }
        }
    }
}

/// A registered extension and its strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureRule {
    /// Lowercased extension without a dot.
    pub extension: String,
    /// How to verify it.
    pub strategy: SignatureStrategy,
}

impl SignatureRule {
    /// Creates a rule.
    pub fn new(extension: impl Into<String>, strategy: SignatureStrategy) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_ascii_lowercase(),
            strategy,
        }
    }
}

/// Immutable extension → strategy table.
#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    rules: HashMap<String, SignatureStrategy>,
}

impl SignatureTable {
    /// Creates an empty table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the table for the formats the platform accepts.
    pub fn builtin() -> Self {
        let jpeg = SignatureStrategy::prefix([[0xFFu8, 0xD8, 0xFF]]);
        let heif = SignatureStrategy::IsoBmffBrand {
            brands: HEIF_BRANDS.to_vec(),
        };

        Self::empty()
            .with_rule(SignatureRule::new("jpg", jpeg.clone()))
            .with_rule(SignatureRule::new("jpeg", jpeg))
            .with_rule(SignatureRule::new(
                "png",
                SignatureStrategy::prefix([[0x89u8, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]]),
            ))
            .with_rule(SignatureRule::new(
                "gif",
                SignatureStrategy::prefix([b"GIF87a", b"GIF89a"]),
            ))
            .with_rule(SignatureRule::new(
                "pdf",
                SignatureStrategy::prefix([[0x25u8, 0x50, 0x44, 0x46]]),
            ))
            .with_rule(SignatureRule::new(
                "ogg",
                SignatureStrategy::prefix([[0x4Fu8, 0x67, 0x67, 0x53]]),
            ))
            .with_rule(SignatureRule::new(
                "flac",
                SignatureStrategy::prefix([[0x66u8, 0x4C, 0x61, 0x43]]),
            ))
            .with_rule(SignatureRule::new(
                "mp3",
                SignatureStrategy::prefix(
                    std::iter::once(&b"ID3"[..])
                        .chain(MPEG_FRAME_SYNCS.iter().map(|sync| &sync[..])),
                ),
            ))
            .with_rule(SignatureRule::new(
                "webp",
                SignatureStrategy::Riff { form_type: *b"WEBP" },
            ))
            .with_rule(SignatureRule::new(
                "wav",
                SignatureStrategy::Riff { form_type: *b"WAVE" },
            ))
            .with_rule(SignatureRule::new("mp4", SignatureStrategy::IsoBmff))
            .with_rule(SignatureRule::new("m4a", SignatureStrategy::IsoBmff))
            .with_rule(SignatureRule::new("heic", heif.clone()))
            .with_rule(SignatureRule::new("heif", heif))
    }

    /// Adds or replaces a rule.
    pub fn with_rule(mut self, rule: SignatureRule) -> Self {
        self.rules.insert(rule.extension, rule.strategy);
        self
    }

    /// Returns the strategy for an extension, if registered.
    pub fn get(&self, extension: &str) -> Option<&SignatureStrategy> {
        self.rules.get(extension)
    }

    /// Iterates over the registered extensions.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Returns the number of registered extensions.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rules are registered.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Checks that an upload's leading bytes match its extension.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    table: SignatureTable,
}

impl SignatureVerifier {
    /// Creates a verifier over the given table.
    pub fn new(table: SignatureTable) -> Self {
        Self { table }
    }

    /// Returns the rule table.
    pub fn table(&self) -> &SignatureTable {
        &self.table
    }

    /// Verifies `data` against the rule for `extension`.
    ///
    /// Only the first [`HEADER_LEN`] bytes are examined. Unregistered
    /// extensions pass; registered ones fail closed when fewer than four
    /// bytes are available.
    pub fn verify(&self, data: &[u8], extension: &str) -> Result<(), Rejection> {
        let Some(strategy) = self.table.get(extension) else {
            return Ok(());
        };

        let header = &data[..data.len().min(HEADER_LEN)];
        if header.len() < MIN_HEADER_LEN || !strategy.matches(header) {
            return Err(Rejection::signature_mismatch(extension));
        }

        Ok(())
    }
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::new(SignatureTable::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RejectionKind;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::default()
    }

    fn ftyp(brand: &[u8; 4]) -> Vec<u8> {
        let mut header = vec![0x00, 0x00, 0x00, 0x18];
        header.extend_from_slice(b"ftyp");
        header.extend_from_slice(brand);
        header.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
        header
    }

    #[test]
    fn test_prefix_formats() {
        let v = verifier();
        assert!(v.verify(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00], "jpg").is_ok());
        assert!(v.verify(&[0xFF, 0xD8, 0xFF, 0xDB], "jpeg").is_ok());
        assert!(v
            .verify(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00], "png")
            .is_ok());
        assert!(v.verify(b"GIF89a\x01\x00", "gif").is_ok());
        assert!(v.verify(b"%PDF-1.7", "pdf").is_ok());
        assert!(v.verify(b"OggS\x00\x02", "ogg").is_ok());
        assert!(v.verify(b"fLaC\x00\x00", "flac").is_ok());
        assert!(v.verify(b"ID3\x04\x00", "mp3").is_ok());
    }

    #[test]
    fn test_webp_saved_as_jpg_is_rejected() {
        let webp = b"RIFF\x24\x00\x00\x00WEBPVP8 ";
        let err = verifier().verify(webp, "jpg").unwrap_err();
        assert_eq!(err.kind, RejectionKind::SignatureMismatch);
        assert!(verifier().verify(webp, "webp").is_ok());
    }

    #[test]
    fn test_riff_form_type_must_match() {
        let wav = b"RIFF\x24\x00\x00\x00WAVEfmt ";
        assert!(verifier().verify(wav, "wav").is_ok());
        assert!(verifier().verify(wav, "webp").is_err());
    }

    #[test]
    fn test_isobmff_brand_unchecked_for_mp4() {
        assert!(verifier().verify(&ftyp(b"isom"), "mp4").is_ok());
        assert!(verifier().verify(&ftyp(b"M4A "), "m4a").is_ok());
        assert!(verifier().verify(b"\x00\x00\x00\x18moov\x00\x00", "mp4").is_err());
    }

    #[test]
    fn test_heic_brand_whitelist() {
        for brand in [b"heic", b"mif1", b"msf1", b"heif"] {
            assert!(verifier().verify(&ftyp(brand), "heic").is_ok());
            assert!(verifier().verify(&ftyp(brand), "heif").is_ok());
        }
        assert!(verifier().verify(&ftyp(b"isom"), "heic").is_err());
    }

    #[test]
    fn test_short_input_fails_closed() {
        let err = verifier().verify(&[0xFF, 0xD8], "jpg").unwrap_err();
        assert_eq!(err.kind, RejectionKind::SignatureMismatch);
        assert!(verifier().verify(&[], "pdf").is_err());
    }

    #[test]
    fn test_unregistered_extension_passes() {
        assert!(verifier().verify(b"anything at all", "txt").is_ok());
        assert!(verifier().verify(&[], "docx").is_ok());
    }

    #[test]
    fn test_custom_table() {
        let table = SignatureTable::empty().with_rule(SignatureRule::new(
            ".ZIP",
            SignatureStrategy::prefix([b"PK\x03\x04"]),
        ));
        let v = SignatureVerifier::new(table);
        assert_eq!(v.table().len(), 1);
        assert!(v.verify(b"PK\x03\x04\x14\x00", "zip").is_ok());
        assert!(v.verify(b"%PDF-1.4", "pdf").is_ok());
    }
}
