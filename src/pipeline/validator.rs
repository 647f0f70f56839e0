//! The upload validator.

use crate::audit::{self, AuditScope};
use crate::backends::ClamAvScanner;
use crate::circuit_breaker::CircuitBreaker;
use crate::core::{
    AcceptedUpload, ArcScanner, ConfigError, FileHasher, IdentifierGenerator, Rejection,
    ScanError, ScanOutcome, UploadCandidate, UploadError, ValidationResult,
};
use crate::inspect::{ActiveContentScanner, ContentSniffer, SignatureTable, SignatureVerifier};
use crate::pipeline::config::{PipelineConfig, ScanUnavailablePolicy};
use crate::pipeline::stage::ValidationStage;
use crate::policy::{PolicyRegistry, StructuralFilter};

use std::sync::Arc;
use tracing::debug;

/// Runs every security check on an upload and decides accept or reject.
///
/// The validator holds only immutable tables and a shared scanner, so a
/// single instance can be wrapped in an `Arc` and used from any number of
/// tasks. Checks run in a fixed order and stop at the first rejection:
///
/// 1. extension (dangerous set, then category allow-list)
/// 2. size (declared, then actual)
/// 3. sniffed MIME type
/// 4. magic bytes against the extension
/// 5. PDF active content, for PDFs only
/// 6. antivirus scan
///
/// # Example
///
/// ```rust,ignore
/// use uploadgate::pipeline::UploadValidator;
/// use uploadgate::core::UploadCandidate;
///
/// let validator = UploadValidator::builder().build()?;
/// let candidate = UploadCandidate::from_path("/tmp/upload-1234")
///     .with_category("document")
///     .with_filename("contract.pdf");
///
/// match validator.validate(&candidate).await {
///     ValidationResult::Accepted(upload) => store(upload.storage_id),
///     ValidationResult::Rejected(rejection) => respond(rejection.kind.message_key()),
/// }
/// ```
#[derive(Debug)]
pub struct UploadValidator {
    registry: PolicyRegistry,
    filter: StructuralFilter,
    sniffer: ContentSniffer,
    verifier: SignatureVerifier,
    active_content: ActiveContentScanner,
    scanner: ArcScanner,
    identifiers: IdentifierGenerator,
    hasher: FileHasher,
    unavailable_policy: ScanUnavailablePolicy,
}

impl UploadValidator {
    /// Returns a builder with built-in tables.
    pub fn builder() -> UploadValidatorBuilder {
        UploadValidatorBuilder::new()
    }

    /// Builds a validator, including its clamd client, from configuration.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let clamav = ClamAvScanner::new(config.clamav.clone())?;
        let scanner: ArcScanner = match &config.circuit_breaker {
            Some(breaker) => Arc::new(CircuitBreaker::new(clamav, breaker.clone())),
            None => Arc::new(clamav),
        };

        Self::builder()
            .with_registry(config.policy_registry()?)
            .with_filter(config.structural_filter())
            .with_scanner(scanner)
            .with_unavailable_policy(config.scan_unavailable)
            .build()
    }

    /// Returns the policy registry.
    pub fn registry(&self) -> &PolicyRegistry {
        &self.registry
    }

    /// Returns the antivirus backend.
    pub fn scanner(&self) -> &ArcScanner {
        &self.scanner
    }

    /// Returns the unavailability policy.
    pub fn unavailable_policy(&self) -> ScanUnavailablePolicy {
        self.unavailable_policy
    }

    /// Checks that the antivirus backend is reachable.
    pub async fn health_check(&self) -> Result<(), ScanError> {
        self.scanner.health_check().await
    }

    /// Validates one upload.
    ///
    /// Never fails: every problem, including an unreadable source, is a
    /// [`Rejection`]. Dropping the returned future abandons the validation
    /// and closes any open antivirus connection.
    pub async fn validate(&self, candidate: &UploadCandidate) -> ValidationResult {
        let mut scope = AuditScope::new(candidate);
        let mut stage = ValidationStage::Received;
        audit::emit_validation_started(&scope);

        match self.run(candidate, &mut scope, &mut stage).await {
            Ok(accepted) => {
                audit::emit_accepted(&scope, &accepted);
                ValidationResult::Accepted(accepted)
            }
            Err(rejection) => {
                audit::emit_rejection(&scope, stage, &rejection);
                ValidationResult::Rejected(rejection)
            }
        }
    }

    async fn run(
        &self,
        candidate: &UploadCandidate,
        scope: &mut AuditScope<'_>,
        stage: &mut ValidationStage,
    ) -> Result<AcceptedUpload, Rejection> {
        let policy = self.registry.lookup(candidate.category());

        // The dangerous set outranks every other check, so it runs before
        // a single byte is read.
        let extension = self.filter.check(candidate.client_filename(), policy)?;
        advance(scope, stage, ValidationStage::ExtensionChecked);

        let max_size = policy.max_size_bytes();
        if candidate.declared_size().is_some_and(|size| size > max_size) {
            return Err(Rejection::size_exceeded(max_size));
        }
        let data = candidate
            .source()
            .read_bounded(max_size.saturating_add(1))
            .await
            .map_err(|e| unreadable(scope, e))?;
        if data.is_empty() {
            return Err(unreadable(scope, UploadError::Empty));
        }
        scope.set_file_hash(self.hasher.hash_bytes(&data));
        if data.len() as u64 > max_size {
            return Err(Rejection::size_exceeded(max_size));
        }
        advance(scope, stage, ValidationStage::SizeChecked);

        let sniffed = self.sniffer.check(&data, policy)?;
        advance(scope, stage, ValidationStage::MimeChecked);

        self.verifier.verify(&data, &extension)?;
        advance(scope, stage, ValidationStage::SignatureChecked);

        if self.active_content.applies_to(&sniffed.mime, &extension) {
            self.active_content.check(&data)?;
            advance(scope, stage, ValidationStage::ContentScanned);
        }

        let scan = self.scanner.scan(&data).await;
        match &scan {
            ScanOutcome::Clean => {}
            ScanOutcome::Infected { signature_name } => {
                return Err(Rejection::infected(signature_name));
            }
            ScanOutcome::Skipped { reason } => {
                let fail_open = self.unavailable_policy.allows_skipped();
                audit::emit_scan_skipped(scope, self.scanner.name(), *reason, fail_open);
                if !fail_open {
                    return Err(Rejection::scan_unavailable());
                }
            }
        }
        advance(scope, stage, ValidationStage::AntivirusScanned);

        let storage_id = self.identifiers.generate(&extension);
        *stage = ValidationStage::Accepted;

        Ok(AcceptedUpload {
            storage_id,
            detected_mime: sniffed.mime,
            detected_extension: extension,
            scan,
        })
    }
}

fn advance(scope: &AuditScope<'_>, stage: &mut ValidationStage, next: ValidationStage) {
    debug_assert!(stage.can_advance_to(next), "{stage} -> {next}");
    *stage = next;
    audit::emit_stage_passed(scope, next);
}

/// Logs the technical cause and returns the user-safe rejection.
fn unreadable(scope: &AuditScope<'_>, error: UploadError) -> Rejection {
    debug!(
        validation_id = %scope.validation_id(),
        error = %error,
        "upload source could not be read"
    );
    match error {
        UploadError::Empty => Rejection::invalid_upload("The uploaded file is empty."),
        _ => Rejection::invalid_upload("The uploaded file could not be read."),
    }
}

/// Builder for [`UploadValidator`].
#[derive(Debug, Default)]
pub struct UploadValidatorBuilder {
    registry: Option<PolicyRegistry>,
    filter: Option<StructuralFilter>,
    signatures: Option<SignatureTable>,
    scanner: Option<ArcScanner>,
    unavailable_policy: ScanUnavailablePolicy,
}

impl UploadValidatorBuilder {
    /// Creates a builder with built-in tables and a default clamd client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the category policies.
    pub fn with_registry(mut self, registry: PolicyRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the extension filter.
    pub fn with_filter(mut self, filter: StructuralFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the magic-byte table.
    pub fn with_signatures(mut self, table: SignatureTable) -> Self {
        self.signatures = Some(table);
        self
    }

    /// Sets the antivirus backend.
    pub fn with_scanner(mut self, scanner: ArcScanner) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Sets the unavailability policy.
    pub fn with_unavailable_policy(mut self, policy: ScanUnavailablePolicy) -> Self {
        self.unavailable_policy = policy;
        self
    }

    /// Builds the validator.
    ///
    /// Without an explicit scanner, a clamd client for `127.0.0.1:3310` is
    /// created.
    pub fn build(self) -> Result<UploadValidator, ConfigError> {
        let scanner = match self.scanner {
            Some(scanner) => scanner,
            None => Arc::new(ClamAvScanner::with_defaults()?),
        };

        Ok(UploadValidator {
            registry: self.registry.unwrap_or_default(),
            filter: self.filter.unwrap_or_default(),
            sniffer: ContentSniffer::new(),
            verifier: SignatureVerifier::new(self.signatures.unwrap_or_else(SignatureTable::builtin)),
            active_content: ActiveContentScanner::new(),
            scanner,
            identifiers: IdentifierGenerator::new(),
            hasher: FileHasher::new(),
            unavailable_policy: self.unavailable_policy,
        })
    }
}
