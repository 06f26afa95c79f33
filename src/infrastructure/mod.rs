//! Infrastructure layer
//!
//! - `page_driver`: owns the active page and runs scripts on it
//! - `selector`: selector strategies and cross-frame element resolution

pub mod page_driver;
pub mod selector;

pub use page_driver::PageDriver;
pub use selector::SelectorStrategy;
