//! Low-level request plumbing shared by the two channel types.
//!
//! Channels operate over boxed reader/writer halves rather than concrete
//! child handles so that tests can drive them over in-memory pipes.

use crate::{Error, Result};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Writer half of a channel transport (a subprocess stdin in production).
pub(crate) type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
/// Reader half of a channel transport (a subprocess stdout in production).
pub(crate) type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Box an arbitrary writer into a channel transport half.
pub(crate) fn boxed_writer(writer: impl AsyncWrite + Send + Unpin + 'static) -> BoxedWriter {
    Box::new(writer)
}

/// Box an arbitrary reader into a channel transport half.
pub(crate) fn boxed_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> BoxedReader {
    Box::new(reader)
}

/// Reject revspecs the line-based protocol cannot carry.
///
/// A newline would terminate the request early and desynchronize every
/// response that follows; NUL bytes are never part of a valid revspec.
pub(crate) fn validate_revspec(revspec: &str) -> Result<()> {
    if revspec.is_empty() {
        return Err(Error::invalid_revspec("revspec is empty"));
    }
    if revspec.bytes().any(|b| b == b'\n' || b == 0) {
        return Err(Error::invalid_revspec(format!(
            "revspec {revspec:?} contains forbidden bytes"
        )));
    }
    Ok(())
}

/// Write one request line to a subprocess stdin.
///
/// Fails with a closed-channel error when the stdin half has already been
/// dropped by the pair's monitor task.
pub(crate) async fn send_request(stdin: Option<&mut BoxedWriter>, revspec: &str) -> Result<()> {
    let Some(stdin) = stdin else {
        return Err(Error::channel_closed());
    };

    let mut line = Vec::with_capacity(revspec.len() + 1);
    line.extend_from_slice(revspec.as_bytes());
    line.push(b'\n');

    stdin
        .write_all(&line)
        .await
        .map_err(|e| Error::pipe("write request", e))?;
    stdin
        .flush()
        .await
        .map_err(|e| Error::pipe("flush request", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_revspec() {
        assert!(validate_revspec("HEAD").is_ok());
        assert!(validate_revspec("refs/heads/main^{tree}").is_ok());
        assert!(validate_revspec("main:path with spaces.txt").is_ok());
        assert!(validate_revspec("").is_err());
        assert!(validate_revspec("HEAD\nHEAD").is_err());
        assert!(validate_revspec("HEAD\0").is_err());
    }

    #[tokio::test]
    async fn test_send_request_to_closed_channel() {
        let err = send_request(None, "HEAD").await.unwrap_err();
        assert!(err.is_pipe());
    }
}
