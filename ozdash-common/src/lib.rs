//! Shared types for the ozdash data service
//!
//! Holds everything both the reconciliation core and its consumers need:
//! the canonical dataset model, the event bus, error taxonomy, and
//! configuration loading.

pub mod config;
pub mod error;
pub mod events;
pub mod model;

pub use error::{Error, Result};
