//! Shared error type of the back-office crates
//!
//! Repositories and services return [`Result`]; the API layer maps each
//! variant onto an HTTP status through [`Error::code`]. Upstream failures
//! from the exchange or the fiscal provider travel as plain messages, while
//! storage failures keep the underlying sqlx error for the log.

use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or malformed
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// The record does not exist or belongs to someone else
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// Authenticated, but not allowed
    #[error("Authorization error: {0}")]
    AuthorizationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An exchange or fiscal provider call failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Decimal conversion error: {0}")]
    DecimalError(String),
}

impl Error {
    /// Stable snake_case identifier for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::ValidationError(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::AuthenticationError(_) => "authentication_error",
            Error::AuthorizationError(_) => "authorization_error",
            Error::ConfigurationError(_) => "configuration_error",
            Error::Upstream(_) => "upstream_error",
            Error::Internal(_) => "internal_error",
            Error::Database(_) => "database_error",
            Error::Migration(_) => "migration_error",
            Error::Serialization(_) => "serialization_error",
            Error::DecimalError(_) => "decimal_error",
        }
    }

    /// Whether the caller caused the failure
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::ValidationError(_) | Error::NotFound(_) | Error::AuthenticationError(_) | Error::AuthorizationError(_)
        )
    }

    /// Message of the string-carrying variants
    fn message_mut(&mut self) -> Option<&mut String> {
        match self {
            Error::ValidationError(msg)
            | Error::NotFound(msg)
            | Error::AuthenticationError(msg)
            | Error::AuthorizationError(msg)
            | Error::ConfigurationError(msg)
            | Error::Upstream(msg)
            | Error::Internal(msg)
            | Error::DecimalError(msg) => Some(msg),
            Error::Database(_) | Error::Migration(_) | Error::Serialization(_) => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Prefix an error's message with what was being attempted
pub trait ErrorExt<T> {
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display;
}

impl<T> ErrorExt<T> for Result<T> {
    fn with_context<C, F>(self, context_fn: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Display,
    {
        self.map_err(|mut e| {
            if let Some(msg) = e.message_mut() {
                *msg = format!("{}: {}", context_fn(), msg);
            }
            e
        })
    }
}

/// Wrap a foreign error as [`Error::Internal`] with a message
pub trait IntoError {
    fn into_error(self, message: &str) -> Error;
}

impl<E: std::error::Error> IntoError for E {
    fn into_error(self, message: &str) -> Error {
        Error::Internal(format!("{}: {}", message, self))
    }
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::DecimalError(err.to_string())
    }
}
