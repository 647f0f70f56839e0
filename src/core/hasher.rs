//! Content hashing with BLAKE3.
//!
//! Digests are only used to correlate audit events for the same bytes
//! across requests; they never affect a validation decision.

use crate::core::types::FileHash;

/// Computes content digests for uploads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileHasher;

impl FileHasher {
    /// Creates a new `FileHasher`.
    pub fn new() -> Self {
        Self
    }

    /// Computes the digest of in-memory bytes.
    pub fn hash_bytes(&self, data: &[u8]) -> FileHash {
        FileHash::new(blake3::hash(data).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_bytes() {
        let hasher = FileHasher::new();
        let hash = hasher.hash_bytes(b"hello world");

        assert_eq!(hash.blake3.len(), 64);
        assert_eq!(hash, hasher.hash_bytes(b"hello world"));
        assert_ne!(hash, hasher.hash_bytes(b"hello world!"));
    }

    #[test]
    fn test_known_vector() {
        let hash = FileHasher::new().hash_bytes(b"");
        assert_eq!(
            hash.blake3,
            "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262"
        );
    }
}
