//! Audit scope and emission functions.

use crate::core::{AcceptedUpload, FileHash, Rejection, SkipReason, UploadCandidate, UploadContext};
use crate::pipeline::ValidationStage;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tracing target for every audit event.
pub const AUDIT_TARGET: &str = "uploadgate::audit";

/// Identity of one validation, attached to each of its audit events.
///
/// Holds only what the client reported plus the content digest once the
/// bytes have been read. No file content is ever logged.
#[derive(Debug, Clone)]
pub struct AuditScope<'a> {
    validation_id: Uuid,
    started_at: DateTime<Utc>,
    category: &'a str,
    client_filename: &'a str,
    declared_size: Option<u64>,
    declared_mime: Option<&'a str>,
    context: &'a UploadContext,
    file_hash: Option<FileHash>,
}

impl<'a> AuditScope<'a> {
    /// Opens a scope for `candidate` with a fresh validation id.
    pub fn new(candidate: &'a UploadCandidate) -> Self {
        Self {
            validation_id: Uuid::new_v4(),
            started_at: Utc::now(),
            category: candidate.category(),
            client_filename: candidate.client_filename(),
            declared_size: candidate.declared_size(),
            declared_mime: candidate.declared_mime(),
            context: candidate.context(),
            file_hash: None,
        }
    }

    /// Returns the id correlating this validation's events.
    pub fn validation_id(&self) -> Uuid {
        self.validation_id
    }

    /// Returns the content digest, once known.
    pub fn file_hash(&self) -> Option<&FileHash> {
        self.file_hash.as_ref()
    }

    /// Records the content digest for subsequent events.
    pub fn set_file_hash(&mut self, hash: FileHash) {
        self.file_hash = Some(hash);
    }

    fn elapsed_ms(&self) -> i64 {
        (Utc::now() - self.started_at).num_milliseconds()
    }

    fn hash_field(&self) -> Option<&str> {
        self.file_hash.as_ref().map(|h| h.blake3.as_str())
    }
}

/// Emits an audit event for a validation starting.
pub fn emit_validation_started(scope: &AuditScope<'_>) {
    info!(
        target: AUDIT_TARGET,
        event_type = "validation_started",
        validation_id = %scope.validation_id,
        category = %scope.category,
        client_filename = %scope.client_filename,
        declared_size = ?scope.declared_size,
        declared_mime = ?scope.declared_mime,
        tenant_id = ?scope.context.tenant_id,
        user_id = ?scope.context.user_id,
        request_id = ?scope.context.request_id,
        "Validation started"
    );
}

/// Emits an audit event for a stage transition.
pub fn emit_stage_passed(scope: &AuditScope<'_>, stage: ValidationStage) {
    debug!(
        target: AUDIT_TARGET,
        event_type = "stage_passed",
        validation_id = %scope.validation_id,
        stage = %stage,
        file_hash_blake3 = ?scope.hash_field(),
        "Stage passed"
    );
}

/// Emits an audit event for a rejected upload.
///
/// `last_passed` is the last stage the upload cleared; the event also
/// carries the stage whose check rejected it. Security-relevant kinds log
/// at `WARN`, the rest at `INFO`.
pub fn emit_rejection(scope: &AuditScope<'_>, last_passed: ValidationStage, rejection: &Rejection) {
    let failed_stage = ValidationStage::checked_by(rejection.kind);

    macro_rules! rejection_event {
        ($level:ident) => {
            $level!(
                target: AUDIT_TARGET,
                event_type = "upload_rejected",
                decision = "rejected",
                validation_id = %scope.validation_id,
                last_passed_stage = %last_passed,
                failed_stage = %failed_stage,
                kind = %rejection.kind,
                message_key = rejection.kind.message_key(),
                reason = %rejection.message,
                category = %scope.category,
                client_filename = %scope.client_filename,
                file_hash_blake3 = ?scope.hash_field(),
                tenant_id = ?scope.context.tenant_id,
                user_id = ?scope.context.user_id,
                request_id = ?scope.context.request_id,
                elapsed_ms = scope.elapsed_ms(),
                "Upload rejected"
            )
        };
    }

    if rejection.kind.is_security_relevant() {
        rejection_event!(warn);
    } else {
        rejection_event!(info);
    }
}

/// Emits an audit event for an antivirus scan that produced no verdict.
pub fn emit_scan_skipped(scope: &AuditScope<'_>, engine: &str, reason: SkipReason, fail_open: bool) {
    info!(
        target: AUDIT_TARGET,
        event_type = "scan_skipped",
        validation_id = %scope.validation_id,
        engine = %engine,
        reason = %reason,
        fail_open = fail_open,
        file_hash_blake3 = ?scope.hash_field(),
        tenant_id = ?scope.context.tenant_id,
        request_id = ?scope.context.request_id,
        "Antivirus scan skipped"
    );
}

/// Emits an audit event for an accepted upload.
pub fn emit_accepted(scope: &AuditScope<'_>, accepted: &AcceptedUpload) {
    info!(
        target: AUDIT_TARGET,
        event_type = "upload_accepted",
        decision = "accepted",
        validation_id = %scope.validation_id,
        storage_id = %accepted.storage_id,
        detected_mime = %accepted.detected_mime,
        detected_extension = %accepted.detected_extension,
        scan = accepted.scan.label(),
        category = %scope.category,
        file_hash_blake3 = ?scope.hash_field(),
        tenant_id = ?scope.context.tenant_id,
        user_id = ?scope.context.user_id,
        request_id = ?scope.context.request_id,
        elapsed_ms = scope.elapsed_ms(),
        "Upload accepted"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FileHasher;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[test]
    fn test_scope_from_candidate() {
        let candidate = UploadCandidate::from_bytes(b"data".to_vec())
            .with_category("document")
            .with_filename("report.pdf")
            .with_declared_size(4)
            .with_context(UploadContext::new().with_request_id("req-1"));

        let mut scope = AuditScope::new(&candidate);
        assert_eq!(scope.category, "document");
        assert_eq!(scope.client_filename, "report.pdf");
        assert_eq!(scope.declared_size, Some(4));
        assert!(scope.file_hash().is_none());

        scope.set_file_hash(FileHasher::new().hash_bytes(b"data"));
        assert_eq!(scope.hash_field().map(str::len), Some(64));
    }

    #[test]
    fn test_scopes_have_distinct_ids() {
        let candidate = UploadCandidate::from_bytes(b"data".to_vec());
        assert_ne!(
            AuditScope::new(&candidate).validation_id(),
            AuditScope::new(&candidate).validation_id()
        );
    }

    #[test]
    fn test_emitters_without_subscriber() {
        let candidate = UploadCandidate::from_bytes(b"data".to_vec()).with_filename("a.exe");
        let scope = AuditScope::new(&candidate);

        emit_validation_started(&scope);
        emit_stage_passed(&scope, ValidationStage::ExtensionChecked);
        emit_rejection(
            &scope,
            ValidationStage::Received,
            &Rejection::extension_blocked("exe"),
        );
        emit_rejection(&scope, ValidationStage::Received, &Rejection::size_exceeded(1));
        emit_scan_skipped(&scope, "clamav", SkipReason::Timeout, true);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap_or_else(|p| p.into_inner());
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl Write for CapturedLogs {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_rejection_names_failed_and_last_passed_stage() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        let candidate = UploadCandidate::from_bytes(vec![0u8; 8])
            .with_category("image")
            .with_filename("huge.png");
        let scope = AuditScope::new(&candidate);

        tracing::subscriber::with_default(subscriber, || {
            emit_rejection(
                &scope,
                ValidationStage::ExtensionChecked,
                &Rejection::size_exceeded(4),
            );
        });

        let output = logs.contents();
        assert!(output.contains("last_passed_stage=extension_checked"), "{output}");
        assert!(output.contains("failed_stage=size_checked"), "{output}");
        assert!(!output.contains(" stage="), "{output}");
    }
}
