//! Service layer
//!
//! Stateless helpers the workflow composes:
//! - `classifier`: keyword-driven result page classification
//! - `session_store`: remote session persistence and artifact upload
//! - `artifact_recorder`: screenshot and PDF capture
//! - `progress_reporter`: phase-to-percent progress publishing

pub mod artifact_recorder;
pub mod classifier;
pub mod progress_reporter;
pub mod session_store;

pub use artifact_recorder::ArtifactRecorder;
pub use classifier::{classify, Classification};
pub use progress_reporter::ProgressReporter;
pub use session_store::SessionStore;
