//! Common error types for ozdash
//!
//! Upstream fetch failures (transport/schema) are adapter-local and live in
//! the service crate; exhaustion is a reconciliation state, not an error.
//! What remains shared is the dataset invariant and configuration errors.

use thiserror::Error;

/// Common result type for ozdash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the ozdash crates
#[derive(Error, Debug)]
pub enum Error {
    /// A series update violated a dataset invariant
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
