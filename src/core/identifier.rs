//! Storage name generation.

use uuid::Uuid;

/// Extension used when the supplied one sanitizes to nothing.
pub const FALLBACK_EXTENSION: &str = "bin";

const MAX_EXTENSION_LEN: usize = 16;

/// Generates random storage names for accepted uploads.
///
/// Names are a v4 UUID (122 bits from the OS CSPRNG) plus a sanitized
/// extension. No part of the client filename is reused.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierGenerator;

impl IdentifierGenerator {
    /// Creates a new generator.
    pub fn new() -> Self {
        Self
    }

    /// Returns a fresh storage name such as `"6f1c…9a.png"`.
    pub fn generate(&self, extension: &str) -> String {
        format!("{}.{}", Uuid::new_v4(), sanitize_extension(extension))
    }
}

/// Lowercases and strips everything but ASCII alphanumerics.
pub fn sanitize_extension(extension: &str) -> String {
    let cleaned: String = extension
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_EXTENSION_LEN)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if cleaned.is_empty() {
        FALLBACK_EXTENSION.to_string()
    } else {
        cleaned
    }
}
