//! # vmforge Common
//!
//! Shared utilities for the vmforge operator components.
//!
//! ## Logging
//!
//! ```rust
//! use vmforge_common::init_logging;
//!
//! // Initialize with level
//! init_logging("info").unwrap();
//! ```

pub mod logging;

// Re-export logging functions
pub use logging::{init_logging, init_logging_json};
