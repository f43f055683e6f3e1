//! Error types for ecotracker.
//!
//! This module defines all error types used throughout the ecotracker crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for ecotracker operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Input Errors ===
    /// One or more activity quantities were negative or not finite.
    #[error("invalid input: {} must be a number >= 0", keys.join(", "))]
    InvalidInput {
        /// Activity keys with rejected quantities, in input order.
        keys: Vec<String>,
    },

    /// A `key=value` argument could not be parsed.
    #[error("cannot parse activity value '{raw}': {message}")]
    ActivityParse {
        /// The raw argument.
        raw: String,
        /// Description of what went wrong.
        message: String,
    },

    // === History Errors ===
    /// Failed to read or write the history file.
    #[error("history file {path}: {source}")]
    HistoryCsv {
        /// Path to the history file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: csv::Error,
    },

    /// CSV encoding outside of the history file (exports).
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

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

    // === Tip Errors ===
    /// The tip service failed, timed out, or returned an unusable answer.
    #[error("tip service '{service}' failed: {message}")]
    ExternalService {
        /// Name of the provider.
        service: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    // === Report Errors ===
    /// A color string was not `#RRGGBB`.
    #[error("invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    /// PDF rendering failed.
    #[error("failed to render PDF: {0}")]
    Report(String),

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
}

/// A specialized Result type for ecotracker operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid input error for the given activity keys.
    #[must_use]
    pub fn invalid_input<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::InvalidInput {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Create an external service error.
    #[must_use]
    pub fn external_service(service: &'static str, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service,
            message: message.into(),
        }
    }

    /// Create a report rendering error.
    #[must_use]
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report(message.into())
    }

    /// Check if this error rejects user-supplied quantities.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::ActivityParse { .. })
    }

    /// Check if this error came from the tip service.
    #[must_use]
    pub fn is_external_service(&self) -> bool {
        matches!(self, Self::ExternalService { .. })
    }
}
