//! Circuit breaker around an antivirus backend.
//!
//! A dead daemon would otherwise cost every upload a full connect timeout.
//! The breaker stops contacting a failing engine for a while and reports
//! `Skipped{CircuitOpen}` instead; the validator's unavailability policy
//! then applies as for any other skipped scan.
//!
//! ## States
//!
//! - **Closed**: scans pass through.
//! - **Open**: scans are skipped immediately.
//! - **Half-Open**: a few probe scans test whether the engine has recovered.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use uploadgate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use uploadgate::backends::MockScanner;
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::default()
//!     .with_failure_threshold(5)
//!     .with_open_duration(Duration::from_secs(30));
//!
//! let protected = CircuitBreaker::new(MockScanner::new(), config);
//! ```

mod breaker;
mod config;
mod state;

pub use breaker::CircuitBreaker;
pub use config::CircuitBreakerConfig;
pub use state::{BreakerMetrics, BreakerState};
