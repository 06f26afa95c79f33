//! Workflow layer
//!
//! - `navigation`: resilient page navigation with ordered wait strategies
//! - `verification_flow`: the single-record state machine
//! - `batch_flow`: multi-record upload, submit and certificate download

pub mod batch_flow;
pub mod navigation;
pub mod verification_flow;

pub use verification_flow::VerificationFlow;
