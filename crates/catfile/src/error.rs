//! Error types for the gitmux-catfile crate

use crate::info::ObjectKind;
use miette::Diagnostic;
use thiserror::Error;

/// Main error type for cat-file channel operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The revspec resolved to no object
    #[error("object not found: {revspec}")]
    #[diagnostic(code(gitmux_catfile::object::not_found))]
    ObjectNotFound {
        /// The revspec that resolved to nothing
        revspec: String,
    },

    /// The object exists but has a different kind than the caller asked for.
    ///
    /// The channel has already discarded the unwanted body and is back in
    /// sync; callers treat this as a not-found outcome.
    #[error("expected {expected}, got {actual} for {oid}")]
    #[diagnostic(code(gitmux_catfile::object::unexpected_kind))]
    UnexpectedKind {
        /// The kind the caller asked for
        expected: ObjectKind,
        /// The kind the object actually has
        actual: ObjectKind,
        /// Object id from the response header
        oid: String,
    },

    /// A response header line was malformed
    #[error("malformed header line: {message}")]
    #[diagnostic(code(gitmux_catfile::header::malformed))]
    Parse {
        /// What was wrong with the line
        message: String,
    },

    /// A new request was issued while the previous response body was still
    /// unread
    #[error("batch channel has {pending} unread bytes from the previous request")]
    #[diagnostic(code(gitmux_catfile::batch::unread_data))]
    ProtocolState {
        /// Bytes still owed to the previous response's reader
        pending: u64,
    },

    /// Reading from or writing to a subprocess pipe failed
    #[error("pipe error during {operation}: {source}")]
    #[diagnostic(code(gitmux_catfile::pipe::error))]
    Pipe {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Description of the operation that failed
        operation: String,
    },

    /// A git subprocess could not be started
    #[error("failed to spawn {program}: {source}")]
    #[diagnostic(code(gitmux_catfile::process::spawn))]
    Spawn {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// The program that failed to start
        program: String,
    },

    /// A revspec contains bytes the line-based protocol cannot carry
    #[error("invalid revspec: {message}")]
    #[diagnostic(code(gitmux_catfile::revspec::invalid))]
    InvalidRevspec {
        /// What was wrong with the revspec
        message: String,
    },

    /// The caller's request context completed before the operation ran
    #[error("request context is done")]
    #[diagnostic(code(gitmux_catfile::context::done))]
    Cancelled,
}

impl Error {
    /// Create a not-found error for a revspec
    pub fn not_found(revspec: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            revspec: revspec.into(),
        }
    }

    /// Create a parse error with a message
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a pipe error with operation context
    pub fn pipe(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Pipe {
            source,
            operation: operation.into(),
        }
    }

    /// Create a pipe error for a channel whose stdin has been dropped
    pub fn channel_closed() -> Self {
        Self::Pipe {
            source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "channel is closed"),
            operation: "write request".to_string(),
        }
    }

    /// Create a spawn error for a program
    pub fn spawn(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::Spawn {
            source,
            program: program.into(),
        }
    }

    /// Create an invalid-revspec error with a message
    pub fn invalid_revspec(message: impl Into<String>) -> Self {
        Self::InvalidRevspec {
            message: message.into(),
        }
    }

    /// Whether this error means "no such object" from the caller's point of
    /// view.
    ///
    /// Covers both a genuinely unknown revspec and a kind mismatch; both
    /// are normal business outcomes, not failures of the channel.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ObjectNotFound { .. } | Self::UnexpectedKind { .. }
        )
    }

    /// Whether this error indicates a broken subprocess pipe.
    #[must_use]
    pub fn is_pipe(&self) -> bool {
        matches!(self, Self::Pipe { .. })
    }
}

/// Result type for cat-file channel operations
pub type Result<T> = std::result::Result<T, Error>;
