//! Validates a handful of sample uploads and prints each decision.
//!
//! This example shows how to:
//! - Build a validator from a JSON configuration
//! - Swap in a mock antivirus backend when no clamd is running
//! - Read audit events through a tracing subscriber
//!
//! Run with: cargo run --example validate_upload
//!
//! Set `UPLOADGATE_CLAMD=host:port` to scan against a real clamd, and
//! `RUST_LOG=uploadgate=debug` to see every stage transition.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use uploadgate::prelude::*;

const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

const WEBP: &[u8] = b"RIFF\x24\x00\x00\x00WEBPVP8 \x18\x00\x00\x00";

const SCRIPTED_PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<< /S /JavaScript /JS (app.alert(1)) >>\nendobj\n";

const CONFIG: &str = r#"{
    "clamav": { "connect_timeout_ms": 1000, "io_timeout_ms": 10000 },
    "circuit_breaker": { "failure_threshold": 3, "open_duration_ms": 30000 },
    "scan_unavailable": "fail_open"
}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("uploadgate=info")),
        )
        .init();

    let mut config = PipelineConfig::from_json_str(CONFIG)?;

    let validator = match std::env::var("UPLOADGATE_CLAMD") {
        Ok(address) => {
            config.clamav = config.clamav.with_tcp(address);
            let validator = UploadValidator::from_config(&config)?;
            match validator.health_check().await {
                Ok(()) => println!(
                    "clamd reachable, signatures: {}",
                    validator
                        .scanner()
                        .signature_version()
                        .await
                        .unwrap_or_else(|| "unknown".into())
                ),
                Err(e) => println!("clamd not healthy ({e}); scans will be skipped"),
            }
            validator
        }
        Err(_) => {
            println!("UPLOADGATE_CLAMD not set, using a mock antivirus backend\n");
            let scanner = MockScanner::new_clean().with_latency(Duration::from_millis(20));
            UploadValidator::builder()
                .with_registry(config.policy_registry()?)
                .with_filter(config.structural_filter())
                .with_scanner(Arc::new(scanner))
                .with_unavailable_policy(config.scan_unavailable)
                .build()?
        }
    };

    let samples = vec![
        (
            "genuine png",
            UploadCandidate::from_bytes(PNG.to_vec())
                .with_category("image")
                .with_filename("avatar.png"),
        ),
        (
            "png renamed to exe",
            UploadCandidate::from_bytes(PNG.to_vec())
                .with_category("image")
                .with_filename("avatar.exe"),
        ),
        (
            "webp claiming jpg",
            UploadCandidate::from_bytes(WEBP.to_vec())
                .with_category("image")
                .with_filename("photo.jpg")
                .with_declared_mime("image/jpeg"),
        ),
        (
            "pdf with javascript",
            UploadCandidate::from_bytes(SCRIPTED_PDF.to_vec())
                .with_category("document")
                .with_filename("invoice.pdf"),
        ),
        (
            "php disguised",
            UploadCandidate::from_bytes(PNG.to_vec())
                .with_category("document")
                .with_filename("shell.php3"),
        ),
        (
            "oversized declaration",
            UploadCandidate::from_bytes(PNG.to_vec())
                .with_category("certificate")
                .with_filename("cert.png")
                .with_declared_size(64 * 1024 * 1024),
        ),
        (
            "empty file",
            UploadCandidate::from_bytes(Vec::new())
                .with_category("audio")
                .with_filename("track.mp3"),
        ),
    ];

    for (label, candidate) in &samples {
        match validator.validate(candidate).await {
            ValidationResult::Accepted(upload) => println!(
                "{label:<24} ACCEPTED  {} ({}, scan: {})",
                upload.storage_id,
                upload.detected_mime,
                upload.scan.label()
            ),
            ValidationResult::Rejected(rejection) => println!(
                "{label:<24} REJECTED  {:<28} {}",
                rejection.kind.message_key(),
                rejection.message
            ),
        }
    }

    Ok(())
}
