//! Error types for bikeledger.
//!
//! This module defines all error types used throughout the bikeledger crate.
//! Variants are grouped by the flow that raises them so callers can decide how
//! to surface a failure without matching on every case.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for bikeledger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Validation Errors ===
    /// A required field was empty or zero.
    #[error("{field} is required")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field was present but malformed.
    #[error("invalid {field}: {message}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Description of what is wrong with it.
        message: String,
    },

    // === Auth Errors ===
    /// Credentials or a one-time code were rejected.
    #[error("authentication failed: {reason}")]
    AuthFailed {
        /// Why authentication failed.
        reason: String,
    },

    /// The configured strategy does not support the requested operation.
    #[error("{strategy} authentication does not support {operation}")]
    AuthUnsupported {
        /// Name of the active strategy.
        strategy: &'static str,
        /// The operation that was attempted.
        operation: &'static str,
    },

    // === Store Errors ===
    /// An operation that needs a session was attempted without one.
    #[error("user not authenticated")]
    NotAuthenticated,

    /// The record store rejected or failed an operation.
    #[error("record store error: {0}")]
    Store(String),

    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Render Errors ===
    /// An invoice was requested without a record.
    #[error("cannot render invoice: no record selected")]
    RenderPrecondition,

    /// The invoice template failed to render.
    #[error("invoice template failed: {0}")]
    Template(#[from] askama::Error),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Transport Errors ===
    /// An HTTP call to the identity provider or webhook failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for bikeledger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new invalid-field error.
    #[must_use]
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }

    /// Create a new authentication failure.
    #[must_use]
    pub fn auth_failed(reason: impl Into<String>) -> Self {
        Self::AuthFailed {
            reason: reason.into(),
        }
    }

    /// Create a new record store error.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error was raised before any backend was contacted
    /// because input was incomplete or malformed.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingField { .. } | Self::InvalidField { .. })
    }

    /// Check if this error is an authentication failure.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::AuthFailed { .. } | Self::AuthUnsupported { .. })
    }

    /// Check if this error came from persisting or retrieving records.
    #[must_use]
    pub fn is_store(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated
                | Self::Store(_)
                | Self::DatabaseOpen { .. }
                | Self::DatabaseQuery(_)
                | Self::DatabaseMigration { .. }
        )
    }

    /// Check if this error came from the invoice renderer.
    #[must_use]
    pub fn is_render(&self) -> bool {
        matches!(self, Self::RenderPrecondition | Self::Template(_))
    }
}
