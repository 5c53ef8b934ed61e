//! Common types and utilities for the P2P back-office
//!
//! This library contains the shared domain model, error type, decimal
//! helpers and database plumbing used by every crate in the workspace.

pub mod error;
pub mod model;
pub mod decimal;
pub mod db;
pub mod wire;

/// Re-export important types
pub use error::{Error, Result, ErrorExt, IntoError};
pub use decimal::*;

// Re-export utoipa for use in model ToSchema derives
#[cfg(feature = "utoipa")]
pub use utoipa;
