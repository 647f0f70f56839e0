//! Pipeline configuration.
//!
//! Everything the validator needs can be loaded from one JSON document:
//!
//! ```json
//! {
//!   "policies": {
//!     "avatar": {
//!       "max_size_bytes": 2097152,
//!       "allowed_extensions": ["png", "jpg"],
//!       "allowed_mime_types": ["image/png", "image/jpeg"]
//!     }
//!   },
//!   "default_category": "avatar",
//!   "clamav": { "tcp_address": "clamd:3310", "connect_timeout_ms": 2000 },
//!   "circuit_breaker": { "failure_threshold": 3 },
//!   "scan_unavailable": "fail_open"
//! }
//! ```
//!
//! Every section is optional. An empty `policies` map selects the built-in
//! categories.

use crate::backends::ClamAvConfig;
use crate::circuit_breaker::CircuitBreakerConfig;
use crate::core::ConfigError;
use crate::policy::{CategoryPolicySpec, PolicyRegistry, StructuralFilter, DEFAULT_CATEGORY};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// What to do when the antivirus stage produces no verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanUnavailablePolicy {
    /// Accept the upload and log the skipped scan.
    #[default]
    FailOpen,
    /// Reject the upload with `ScanUnavailable`.
    FailClosed,
}

impl ScanUnavailablePolicy {
    /// Returns `true` if a skipped scan still lets the upload through.
    pub fn allows_skipped(&self) -> bool {
        matches!(self, Self::FailOpen)
    }
}

/// Configuration for [`UploadValidator::from_config`](crate::pipeline::UploadValidator::from_config).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Category policies keyed by category name. Empty means built-in.
    pub policies: HashMap<String, CategoryPolicySpec>,

    /// Category used for unknown keys.
    pub default_category: Option<String>,

    /// Replaces the built-in dangerous-extension set when present.
    pub dangerous_extensions: Option<Vec<String>>,

    /// clamd connection settings.
    pub clamav: ClamAvConfig,

    /// Wraps the antivirus client in a circuit breaker when present.
    pub circuit_breaker: Option<CircuitBreakerConfig>,

    /// Behavior when the scan is skipped.
    pub scan_unavailable: ScanUnavailablePolicy,
}

impl PipelineConfig {
    /// Creates a configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Sets the clamd settings.
    pub fn with_clamav(mut self, clamav: ClamAvConfig) -> Self {
        self.clamav = clamav;
        self
    }

    /// Enables the circuit breaker.
    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = Some(config);
        self
    }

    /// Sets the unavailability policy.
    pub fn with_scan_unavailable(mut self, policy: ScanUnavailablePolicy) -> Self {
        self.scan_unavailable = policy;
        self
    }

    /// Adds a category policy.
    pub fn with_policy(mut self, category: impl Into<String>, spec: CategoryPolicySpec) -> Self {
        self.policies.insert(category.into(), spec);
        self
    }

    /// Sets the default category.
    pub fn with_default_category(mut self, category: impl Into<String>) -> Self {
        self.default_category = Some(category.into());
        self
    }

    /// Builds the policy registry described by this configuration.
    pub fn policy_registry(&self) -> Result<PolicyRegistry, ConfigError> {
        let default_category = self.default_category.as_deref().unwrap_or(DEFAULT_CATEGORY);

        if !self.policies.is_empty() {
            return PolicyRegistry::from_specs(&self.policies, default_category);
        }

        let builtin = PolicyRegistry::builtin();
        let builder = builtin
            .categories()
            .fold(PolicyRegistry::builder(), |builder, (category, policy)| {
                builder.with_category(category, policy.clone())
            });
        builder.with_default_category(default_category).build()
    }

    /// Builds the structural filter described by this configuration.
    pub fn structural_filter(&self) -> StructuralFilter {
        match &self.dangerous_extensions {
            Some(extensions) => StructuralFilter::with_dangerous_extensions(extensions),
            None => StructuralFilter::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PipelineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.scan_unavailable, ScanUnavailablePolicy::FailOpen);

        let registry = config.policy_registry().unwrap();
        assert_eq!(registry.default_category(), "image");
        assert!(registry.contains("audio"));
    }

    #[test]
    fn test_full_document() {
        let json = r#"{
            "policies": {
                "avatar": {
                    "max_size_bytes": 1024,
                    "allowed_extensions": ["PNG"],
                    "allowed_mime_types": ["image/png"]
                }
            },
            "default_category": "avatar",
            "dangerous_extensions": ["exe", ".php"],
            "clamav": { "tcp_address": "clamd:3310", "connect_timeout_ms": 2000 },
            "circuit_breaker": { "failure_threshold": 3 },
            "scan_unavailable": "fail_closed"
        }"#;
        let config = PipelineConfig::from_json_str(json).unwrap();

        assert_eq!(config.scan_unavailable, ScanUnavailablePolicy::FailClosed);
        assert_eq!(config.clamav.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.circuit_breaker.as_ref().unwrap().failure_threshold, 3);

        let registry = config.policy_registry().unwrap();
        assert_eq!(registry.lookup("whatever").max_size_bytes(), 1024);
        assert!(registry.lookup("avatar").allows_extension("png"));

        let filter = config.structural_filter();
        assert!(filter.is_dangerous("php"));
        assert!(!filter.is_dangerous("svg"));
    }

    #[test]
    fn test_builtin_with_other_default() {
        let config = PipelineConfig::new().with_default_category("document");
        let registry = config.policy_registry().unwrap();
        assert!(registry.lookup("unknown").allows_mime("application/pdf"));
    }

    #[test]
    fn test_missing_default_rejected() {
        let config = PipelineConfig::new().with_default_category("video");
        assert!(matches!(
            config.policy_registry(),
            Err(ConfigError::MissingDefault { .. })
        ));
    }

    #[test]
    fn test_zero_size_rejected() {
        let config = PipelineConfig::new()
            .with_policy(
                "broken",
                CategoryPolicySpec {
                    max_size_bytes: 0,
                    ..CategoryPolicySpec::default()
                },
            )
            .with_default_category("broken");
        assert!(matches!(
            config.policy_registry(),
            Err(ConfigError::ZeroMaxSize { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"scan_unavailable": "fail_closed"}}"#).unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert!(!config.scan_unavailable.allows_skipped());
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            PipelineConfig::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
