//! Per-category upload policies.

use crate::core::ConfigError;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

const MIB: u64 = 1024 * 1024;

/// Category used when the caller's category is unknown.
pub const DEFAULT_CATEGORY: &str = "image";

/// Limits for one upload category.
///
/// Immutable once built. Extensions and MIME types are stored lowercased;
/// an empty set means "no restriction" for that dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryPolicy {
    max_size_bytes: u64,
    allowed_extensions: BTreeSet<String>,
    allowed_mime_types: BTreeSet<String>,
}

impl CategoryPolicy {
    /// Creates a policy, rejecting a zero size limit.
    pub fn new<E, M>(
        category: &str,
        max_size_bytes: u64,
        allowed_extensions: E,
        allowed_mime_types: M,
    ) -> Result<Self, ConfigError>
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        M: IntoIterator,
        M::Item: AsRef<str>,
    {
        if max_size_bytes == 0 {
            return Err(ConfigError::ZeroMaxSize {
                category: category.to_string(),
            });
        }

        Ok(Self {
            max_size_bytes,
            allowed_extensions: normalize_set(allowed_extensions, |e| e.trim_start_matches('.')),
            allowed_mime_types: normalize_set(allowed_mime_types, |m| m),
        })
    }

    /// Maximum accepted size in bytes. Always positive.
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_bytes
    }

    /// Allowed extensions, lowercased, without a leading dot.
    pub fn allowed_extensions(&self) -> &BTreeSet<String> {
        &self.allowed_extensions
    }

    /// Allowed MIME types, lowercased.
    pub fn allowed_mime_types(&self) -> &BTreeSet<String> {
        &self.allowed_mime_types
    }

    /// Returns `true` if `extension` (already lowercased) may be uploaded.
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions.is_empty() || self.allowed_extensions.contains(extension)
    }

    /// Returns `true` if `mime` may be uploaded.
    pub fn allows_mime(&self, mime: &str) -> bool {
        self.allowed_mime_types.is_empty()
            || self
                .allowed_mime_types
                .contains(mime.to_ascii_lowercase().as_str())
    }
}

fn normalize_set<I>(items: I, trim: impl Fn(&str) -> &str) -> BTreeSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    items
        .into_iter()
        .map(|item| trim(item.as_ref().trim()).to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Serializable form of a [`CategoryPolicy`], used in configuration files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPolicySpec {
    /// Maximum accepted size in bytes.
    pub max_size_bytes: u64,
    /// Allowed extensions (empty = any).
    #[serde(default)]
    pub allowed_extensions: Vec<String>,
    /// Allowed MIME types (empty = any).
    #[serde(default)]
    pub allowed_mime_types: Vec<String>,
}

/// Lookup table from category key to policy.
///
/// Lookups never fail: unknown categories resolve to the default policy.
/// The registry is immutable and is shared across concurrent validations
/// behind an `Arc`.
///
/// # Examples
///
/// ```rust
/// use uploadgate::policy::PolicyRegistry;
///
/// let registry = PolicyRegistry::builtin();
/// let policy = registry.lookup("no-such-category");
/// assert!(policy.allows_extension("png"));
/// ```
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policies: HashMap<String, CategoryPolicy>,
    default_category: String,
}

impl PolicyRegistry {
    /// Creates a builder.
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::new()
    }

    /// Returns the built-in marketplace categories.
    ///
    /// - `image` (default): 10 MiB, common raster formats
    /// - `document`: 20 MiB, PDF and scanned images
    /// - `certificate`: 10 MiB, PDF and scanned images
    /// - `audio`: 50 MiB, common audio formats
    pub fn builtin() -> Self {
        const IMAGE_EXT: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "heic", "heif"];
        const IMAGE_MIME: &[&str] = &[
            "image/jpeg",
            "image/png",
            "image/gif",
            "image/webp",
            "image/heic",
            "image/heif",
        ];
        const DOC_EXT: &[&str] = &["pdf", "jpg", "jpeg", "png"];
        const DOC_MIME: &[&str] = &["application/pdf", "image/jpeg", "image/png"];
        const AUDIO_EXT: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a", "mp4"];
        const AUDIO_MIME: &[&str] = &[
            "audio/mpeg",
            "audio/wav",
            "audio/x-wav",
            "audio/ogg",
            "audio/flac",
            "audio/x-flac",
            "audio/m4a",
            "audio/mp4",
            "video/mp4",
        ];

        let table: [(&str, u64, &[&str], &[&str]); 4] = [
            ("image", 10 * MIB, IMAGE_EXT, IMAGE_MIME),
            ("document", 20 * MIB, DOC_EXT, DOC_MIME),
            ("certificate", 10 * MIB, DOC_EXT, DOC_MIME),
            ("audio", 50 * MIB, AUDIO_EXT, AUDIO_MIME),
        ];

        let policies = table
            .into_iter()
            .map(|(key, max, ext, mime)| {
                let policy = CategoryPolicy {
                    max_size_bytes: max,
                    allowed_extensions: normalize_set(ext.iter().copied(), |e| e),
                    allowed_mime_types: normalize_set(mime.iter().copied(), |m| m),
                };
                (key.to_string(), policy)
            })
            .collect();

        Self {
            policies,
            default_category: DEFAULT_CATEGORY.to_string(),
        }
    }

    /// Builds a registry from configuration entries.
    pub fn from_specs(
        specs: &HashMap<String, CategoryPolicySpec>,
        default_category: &str,
    ) -> Result<Self, ConfigError> {
        let mut builder = Self::builder().with_default_category(default_category);
        for (category, spec) in specs {
            let policy = CategoryPolicy::new(
                category,
                spec.max_size_bytes,
                &spec.allowed_extensions,
                &spec.allowed_mime_types,
            )?;
            builder = builder.with_category(category, policy);
        }
        builder.build()
    }

    /// Resolves a category to its policy, falling back to the default.
    pub fn lookup(&self, category: &str) -> &CategoryPolicy {
        let key = category.trim().to_ascii_lowercase();
        self.policies
            .get(&key)
            .unwrap_or_else(|| self.default_policy())
    }

    /// Returns `true` if the category is explicitly registered.
    pub fn contains(&self, category: &str) -> bool {
        self.policies
            .contains_key(&category.trim().to_ascii_lowercase())
    }

    /// Returns the policy used for unknown categories.
    pub fn default_policy(&self) -> &CategoryPolicy {
        // The builder guarantees the default key is present.
        &self.policies[&self.default_category]
    }

    /// Returns the default category key.
    pub fn default_category(&self) -> &str {
        &self.default_category
    }

    /// Iterates over all registered categories.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &CategoryPolicy)> {
        self.policies.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Builder for [`PolicyRegistry`].
#[derive(Debug, Default)]
pub struct PolicyRegistryBuilder {
    policies: HashMap<String, CategoryPolicy>,
    default_category: Option<String>,
}

impl PolicyRegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a category.
    pub fn with_category(mut self, category: impl AsRef<str>, policy: CategoryPolicy) -> Self {
        self.policies
            .insert(category.as_ref().trim().to_ascii_lowercase(), policy);
        self
    }

    /// Sets the category used for unknown keys. Defaults to `"image"`.
    pub fn with_default_category(mut self, category: impl AsRef<str>) -> Self {
        self.default_category = Some(category.as_ref().trim().to_ascii_lowercase());
        self
    }

    /// Builds the registry.
    pub fn build(self) -> Result<PolicyRegistry, ConfigError> {
        let default_category = self
            .default_category
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        if !self.policies.contains_key(&default_category) {
            return Err(ConfigError::MissingDefault {
                category: default_category,
            });
        }

        Ok(PolicyRegistry {
            policies: self.policies,
            default_category,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_sizes_positive() {
        let registry = PolicyRegistry::builtin();
        for (category, policy) in registry.categories() {
            assert!(policy.max_size_bytes() > 0, "{category} has zero limit");
        }
        assert_eq!(registry.categories().count(), 4);
    }

    #[test]
    fn test_unknown_category_falls_back_to_default() {
        let registry = PolicyRegistry::builtin();
        assert_eq!(registry.lookup("spaceship"), registry.lookup("image"));
        assert_eq!(registry.lookup(""), registry.default_policy());
        assert!(!registry.contains("spaceship"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = PolicyRegistry::builtin();
        assert!(registry.lookup(" Document ").allows_extension("pdf"));
        assert!(!registry.lookup("image").allows_extension("pdf"));
    }

    #[test]
    fn test_category_policy_rejects_zero_size() {
        let result = CategoryPolicy::new("broken", 0, ["png"], ["image/png"]);
        assert!(matches!(result, Err(ConfigError::ZeroMaxSize { .. })));
    }

    #[test]
    fn test_category_policy_normalizes() {
        let policy = CategoryPolicy::new("x", 10, [".PNG", " jpg "], ["Image/PNG"]).unwrap();
        assert!(policy.allows_extension("png"));
        assert!(policy.allows_extension("jpg"));
        assert!(policy.allows_mime("image/png"));
        assert!(policy.allows_mime("IMAGE/PNG"));
        assert!(!policy.allows_mime("image/gif"));
    }

    #[test]
    fn test_empty_sets_allow_everything() {
        let policy = CategoryPolicy::new("open", 10, Vec::<String>::new(), Vec::<String>::new())
            .unwrap();
        assert!(policy.allows_extension("anything"));
        assert!(policy.allows_mime("application/octet-stream"));
    }

    #[test]
    fn test_builder_requires_default() {
        let policy = CategoryPolicy::new("docs", 10, ["pdf"], ["application/pdf"]).unwrap();
        let result = PolicyRegistry::builder()
            .with_category("docs", policy.clone())
            .build();
        assert!(matches!(result, Err(ConfigError::MissingDefault { .. })));

        let registry = PolicyRegistry::builder()
            .with_category("docs", policy)
            .with_default_category("docs")
            .build()
            .unwrap();
        assert!(registry.lookup("whatever").allows_extension("pdf"));
    }

    #[test]
    fn test_from_specs() {
        let mut specs = HashMap::new();
        specs.insert(
            "avatar".to_string(),
            CategoryPolicySpec {
                max_size_bytes: 512 * 1024,
                allowed_extensions: vec!["png".into()],
                allowed_mime_types: vec!["image/png".into()],
            },
        );

        let registry = PolicyRegistry::from_specs(&specs, "avatar").unwrap();
        assert_eq!(registry.lookup("avatar").max_size_bytes(), 512 * 1024);

        specs.get_mut("avatar").unwrap().max_size_bytes = 0;
        assert!(PolicyRegistry::from_specs(&specs, "avatar").is_err());
    }
}
