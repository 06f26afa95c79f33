//! Browser lifecycle
//!
//! Launching Chrome, draining its CDP event stream, and tearing the
//! session down exactly once.

pub mod session;

pub use session::BrowserHandle;
