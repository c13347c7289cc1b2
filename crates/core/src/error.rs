//! Error types for the gitmux-core crate

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for gitmux-core operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Configuration could not be parsed or is semantically invalid
    #[error("Configuration error: {message}")]
    #[diagnostic(code(gitmux_core::config::invalid))]
    Configuration {
        /// The error message describing the configuration issue
        message: String,
    },

    /// I/O error with path context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(gitmux_core::io::error))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<std::path::Path>>,
        /// Description of the operation that failed
        operation: String,
    },
}

impl Error {
    /// Create a configuration error with a message
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an I/O error with context
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(|p| p.into_boxed_path()),
            operation: operation.into(),
        }
    }
}

/// Result type for gitmux-core operations
pub type Result<T> = std::result::Result<T, Error>;
