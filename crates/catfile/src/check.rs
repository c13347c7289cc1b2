//! The batch-check channel: object metadata over `cat-file --batch-check`.
//!
//! Unlike the batch channel, this one is stateless between calls: every
//! request is one line in, one header line out, so the only discipline
//! needed is mutual exclusion around the write-then-read.

use crate::info::{ObjectInfo, read_header};
use crate::wire::{BoxedReader, BoxedWriter, boxed_reader, boxed_writer, send_request, validate_revspec};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::sync::Mutex;

/// Serialized access to one `cat-file --batch-check` subprocess.
#[derive(Clone)]
pub struct CheckChannel {
    inner: Arc<Mutex<CheckInner>>,
}

struct CheckInner {
    stdin: Option<BoxedWriter>,
    stdout: BufReader<BoxedReader>,
    broken: bool,
}

impl CheckChannel {
    /// Build a channel over the given transport halves.
    pub(crate) fn new(
        stdin: impl AsyncWrite + Send + Unpin + 'static,
        stdout: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CheckInner {
                stdin: Some(boxed_writer(stdin)),
                stdout: BufReader::new(boxed_reader(stdout)),
                broken: false,
            })),
        }
    }

    /// Look up metadata for one revspec.
    ///
    /// Fully serialized; concurrent callers queue on the channel lock. Once
    /// a write or read against the subprocess has failed the channel stays
    /// broken and every further call fails.
    pub async fn info(&self, revspec: &str) -> Result<ObjectInfo> {
        validate_revspec(revspec)?;
        let mut inner = self.inner.lock().await;

        if inner.broken {
            return Err(Error::pipe(
                "write request",
                std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "batch-check channel is broken by an earlier error",
                ),
            ));
        }

        if let Err(e) = send_request(inner.stdin.as_mut(), revspec).await {
            inner.broken = true;
            return Err(e);
        }

        match read_header(&mut inner.stdout).await {
            Ok(info) => Ok(info),
            Err(e) => {
                if e.is_pipe() {
                    inner.broken = true;
                }
                Err(e)
            }
        }
    }

    /// Drop the stdin half, letting the subprocess see EOF and exit.
    pub(crate) async fn close_stdin(&self) {
        self.inner.lock().await.stdin.take();
    }
}
