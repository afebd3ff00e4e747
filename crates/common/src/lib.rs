//! FunGen Common Utilities
//!
//! Shared infrastructure for all FunGen crates:
//! - Error types and result aliases
//! - Progress/log sink contract and rate limiting
//! - Tracing/logging initialization
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;
pub mod progress;

pub use config::*;
pub use error::*;
pub use progress::*;
