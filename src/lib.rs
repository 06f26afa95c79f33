//! # SCRA Verify
//!
//! Browser automation for SCRA (Servicemembers Civil Relief Act) active-duty
//! verification. The target portal exposes no API, only a JavaScript-rendered
//! UI, so every verification drives a real browser session through an
//! unreliable multi-page workflow and classifies the result from page text.
//!
//! ## Architecture
//!
//! The crate is organised in four strict layers:
//!
//! ### Infrastructure
//! - `infrastructure/` - owns the scarce resource (the active `Page`) and
//!   exposes capabilities only
//! - `PageDriver` - the single page owner, provides `eval()` and page swap
//! - `selector` - cross-frame visible-element resolution, fallback selector
//!   lists as data
//!
//! ### Services
//! - `services/` - single capabilities, each handling one concern
//! - `ArtifactRecorder` - screenshot / PDF checkpoints, best-effort uploads
//! - `ProgressReporter` - phase percentage publishing, failures swallowed
//! - `classifier` - keyword-precedence eligibility verdict
//! - `SessionStore` - collaborator session/artifact store client
//!
//! ### Workflow
//! - `workflow/` - the complete flow of one verification session
//! - `VerificationFlow` - phase sequencing (login → form → submit → result),
//!   single-record and multi-record
//! - `navigation` - ordered wait-strategy navigation with geo diagnostics
//!
//! ### Orchestration
//! - `orchestrator/` - resource ownership and response assembly; the only
//!   module that launches and tears down browsers

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::ingest::ingest;
pub use models::record::FixedWidthRecord;
pub use models::request::VerificationRequest;
pub use models::result::{BatchResponse, EligibilityResult, VerificationResponse};
pub use models::session::{Phase, SessionState};
pub use orchestrator::App;
