//! Antivirus backend implementations.
//!
//! ## Available Backends
//!
//! - [`mock`] - A mock scanner for testing
//! - [`clamav`] - clamd over TCP or a Unix socket
//!
//! ## Implementing a Custom Backend
//!
//! Implement the `Scanner` trait. `scan` must not fail: report transport
//! problems as `ScanOutcome::Skipped`.
//!
//! ```rust,ignore
//! use uploadgate::core::{Scanner, ScanError, ScanOutcome};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! pub struct MyScanner;
//!
//! #[async_trait]
//! impl Scanner for MyScanner {
//!     fn name(&self) -> &str {
//!         "my-scanner"
//!     }
//!
//!     async fn scan(&self, data: &[u8]) -> ScanOutcome {
//!         todo!()
//!     }
//!
//!     async fn health_check(&self) -> Result<(), ScanError> {
//!         Ok(())
//!     }
//! }
//! ```

pub mod clamav;
pub mod mock;

pub use mock::MockScanner;

pub use clamav::{ClamAvConfig, ClamAvScanner};
