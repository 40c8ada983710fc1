//! # handlescope Common Library
//!
//! Shared code for the handlescope binaries:
//! - Error types
//! - Configuration loading (TOML bootstrap, environment overrides, defaults)

pub mod config;
pub mod error;

pub use error::{Error, Result};
