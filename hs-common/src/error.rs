//! Common error types for handlescope

use thiserror::Error;

/// Common result type for handlescope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across handlescope crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file unreadable, malformed or out of range
    #[error("Configuration error: {0}")]
    Config(String),
}
