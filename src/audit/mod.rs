//! Structured audit logging.
//!
//! Every validation emits `tracing` events under the
//! [`AUDIT_TARGET`] target: one when it starts, one per stage passed
//! (`DEBUG`), and one terminal accept or reject event. Events can be routed
//! to any subscriber (JSON file, OpenTelemetry, etc.) by filtering on the
//! target.

mod events;

pub use events::{
    emit_accepted, emit_rejection, emit_scan_skipped, emit_stage_passed, emit_validation_started,
    AuditScope, AUDIT_TARGET,
};
