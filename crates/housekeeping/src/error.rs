//! Error types for the gitmux-housekeeping crate

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for housekeeping operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Walking the repository directory failed
    #[error("failed to walk repository directory: {source}")]
    #[diagnostic(code(gitmux_housekeeping::walk::error))]
    Walk {
        /// The underlying walk error
        #[source]
        source: walkdir::Error,
    },

    /// I/O error with path context
    #[error("I/O error during {operation}: {source}")]
    #[diagnostic(code(gitmux_housekeeping::io::error))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The path where the I/O error occurred, if applicable
        path: Option<Box<std::path::Path>>,
        /// Description of the operation that failed
        operation: String,
    },

    /// The caller's request context completed before the sweep finished
    #[error("request context is done")]
    #[diagnostic(code(gitmux_housekeeping::context::done))]
    Cancelled,
}

impl Error {
    /// Create an I/O error with context
    pub fn io(source: std::io::Error, path: Option<PathBuf>, operation: impl Into<String>) -> Self {
        Self::Io {
            source,
            path: path.map(|p| p.into_boxed_path()),
            operation: operation.into(),
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(source: walkdir::Error) -> Self {
        Self::Walk { source }
    }
}

/// Result type for housekeeping operations
pub type Result<T> = std::result::Result<T, Error>;
