//! Upload policies.
//!
//! - [`registry`] - Per-category size, extension and MIME limits
//! - [`extension`] - Dangerous-extension blocklist and allow-list filter

pub mod extension;
pub mod registry;

pub use extension::{extract_extension, StructuralFilter, DANGEROUS_EXTENSIONS};
pub use registry::{
    CategoryPolicy, CategoryPolicySpec, PolicyRegistry, PolicyRegistryBuilder, DEFAULT_CATEGORY,
};
