//! Upload validation pipeline.
//!
//! - [`stage`] - The validation state machine
//! - [`config`] - JSON-loadable pipeline configuration
//! - [`validator`] - The orchestrator tying every check together

pub mod config;
pub mod stage;
pub mod validator;

pub use config::{PipelineConfig, ScanUnavailablePolicy};
pub use stage::ValidationStage;
pub use validator::{UploadValidator, UploadValidatorBuilder};
