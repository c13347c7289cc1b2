//! The batch channel: raw object bodies over `cat-file --batch`.
//!
//! This channel is stateful. Every response is a header line followed by
//! exactly `size` body bytes and one trailing newline, and the subprocess
//! will not accept the next request until the previous body has left its
//! stdout. The channel tracks that obligation as a byte debt (`pending`):
//!
//! - `pending == 0`: idle, a new request may start
//! - `pending > 1`: mid-body, only the current [`Object`] may read
//! - `pending == 1`: body consumed, only the trailing newline is left; the
//!   next request drains it first
//!
//! A single misread byte here desynchronizes every later response, which
//! is why object streams decrement the debt under the same lock that
//! serializes requests.

use crate::info::{ObjectInfo, ObjectKind, read_header};
use crate::wire::{BoxedReader, BoxedWriter, boxed_reader, boxed_writer, send_request, validate_revspec};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

/// Serialized, stateful access to one `cat-file --batch` subprocess.
#[derive(Clone)]
pub struct BatchChannel {
    inner: Arc<Mutex<BatchInner>>,
}

pub(crate) struct BatchInner {
    stdin: Option<BoxedWriter>,
    stdout: BufReader<BoxedReader>,
    /// Bytes still owed to the current response: body remainder plus the
    /// trailing newline.
    pending: u64,
    poisoned: bool,
}

impl BatchChannel {
    /// Build a channel over the given transport halves.
    pub(crate) fn new(
        stdin: impl AsyncWrite + Send + Unpin + 'static,
        stdout: impl AsyncRead + Send + Unpin + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BatchInner {
                stdin: Some(boxed_writer(stdin)),
                stdout: BufReader::new(boxed_reader(stdout)),
                pending: 0,
                poisoned: false,
            })),
        }
    }

    /// Request one object and return a streaming reader over its body.
    ///
    /// Fails fast with [`Error::ProtocolState`] if the previous response
    /// has not been fully consumed. When the object exists but is not of
    /// `expected` kind, the body is discarded to keep the channel in sync
    /// and an [`Error::UnexpectedKind`] is returned; callers treat that as
    /// not-found.
    pub async fn reader(&self, revspec: &str, expected: ObjectKind) -> Result<Object> {
        validate_revspec(revspec)?;
        let mut inner = self.inner.lock().await;

        if inner.poisoned {
            return Err(Error::pipe(
                "write request",
                std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "batch channel is poisoned by an earlier error",
                ),
            ));
        }

        if inner.pending == 1 {
            // only the trailing newline of the previous response is left
            let mut lf = [0u8; 1];
            if let Err(e) = inner.stdout.read_exact(&mut lf).await {
                inner.poisoned = true;
                return Err(Error::pipe("read response terminator", e));
            }
            inner.pending = 0;
        }
        if inner.pending != 0 {
            return Err(Error::ProtocolState {
                pending: inner.pending,
            });
        }

        if let Err(e) = send_request(inner.stdin.as_mut(), revspec).await {
            inner.poisoned = true;
            return Err(e);
        }

        let info = match read_header(&mut inner.stdout).await {
            Ok(info) => info,
            Err(e) => {
                if e.is_pipe() {
                    inner.poisoned = true;
                }
                return Err(e);
            }
        };

        let size = u64::try_from(info.size)
            .map_err(|_| Error::parse(format!("negative object size {}", info.size)))?;

        if info.kind != expected {
            // drain the unwanted body plus its trailing newline so the
            // channel is usable for the next request
            return match tokio::io::copy(
                &mut (&mut inner.stdout).take(size + 1),
                &mut tokio::io::sink(),
            )
            .await
            {
                Ok(n) if n == size + 1 => {
                    inner.pending = 0;
                    Err(Error::UnexpectedKind {
                        expected,
                        actual: info.kind,
                        oid: info.oid,
                    })
                }
                Ok(_) => {
                    inner.poisoned = true;
                    Err(Error::pipe(
                        "discard mismatched object",
                        std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "subprocess exited mid-body",
                        ),
                    ))
                }
                Err(e) => {
                    inner.poisoned = true;
                    Err(Error::pipe("discard mismatched object", e))
                }
            };
        }

        inner.pending = size + 1;
        Ok(Object {
            inner: Arc::clone(&self.inner),
            info,
            remaining: size,
        })
    }

    /// Whether a previously returned object still has unread body bytes.
    pub async fn has_unread_data(&self) -> bool {
        self.inner.lock().await.pending > 1
    }

    /// Drop the stdin half, letting the subprocess see EOF and exit.
    pub(crate) async fn close_stdin(&self) {
        self.inner.lock().await.stdin.take();
    }
}

/// One object: its metadata plus a one-shot stream of exactly `size` body
/// bytes.
///
/// The stream is single-use and non-seekable. Reads serialize behind the
/// owning channel's lock, so they never interleave with a new request; a
/// request issued before the stream is drained fails fast instead.
pub struct Object {
    inner: Arc<Mutex<BatchInner>>,
    info: ObjectInfo,
    remaining: u64,
}

impl Object {
    /// Metadata from the response header.
    #[must_use]
    pub fn info(&self) -> &ObjectInfo {
        &self.info
    }

    /// Body bytes not yet read.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Whether the full body has been read.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.remaining == 0
    }

    /// Read up to `buf.len()` body bytes.
    ///
    /// Returns `Ok(0)` once the body is exhausted. An EOF before the body
    /// is complete poisons the channel and surfaces as a pipe error.
    ///
    /// # Panics
    ///
    /// Aborts if the channel's byte debt would drop below the trailing
    /// newline: that can only mean the debt accounting is corrupt, and
    /// continuing would misattribute every later response.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || self.remaining == 0 {
            return Ok(0);
        }

        let mut inner = self.inner.lock().await;
        let want = usize::try_from(self.remaining.min(buf.len() as u64)).unwrap_or(buf.len());

        let n = match inner.stdout.read(&mut buf[..want]).await {
            Ok(0) => {
                inner.poisoned = true;
                return Err(Error::pipe(
                    "read object stream",
                    std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!(
                            "object {} truncated with {} bytes left",
                            self.info.oid, self.remaining
                        ),
                    ),
                ));
            }
            Ok(n) => n,
            Err(e) => {
                inner.poisoned = true;
                return Err(Error::pipe("read object stream", e));
            }
        };

        let read = n as u64;
        assert!(
            inner.pending > read,
            "too many bytes read from batch object stream"
        );
        inner.pending -= read;
        self.remaining -= read;
        Ok(n)
    }

    /// Read the whole remaining body into memory.
    pub async fn read_all(&mut self) -> Result<Vec<u8>> {
        // preallocation is capped so a corrupt size field cannot force a
        // huge up-front allocation; the vector grows as real bytes arrive
        let capacity = usize::try_from(self.remaining.min(8 * 1024 * 1024)).unwrap_or(0);
        let mut out = Vec::with_capacity(capacity);
        let mut chunk = [0u8; 8192];
        while self.remaining > 0 {
            let n = self.read(&mut chunk).await?;
            out.extend_from_slice(&chunk[..n]);
        }
        Ok(out)
    }

    /// Stream the whole remaining body into a writer, returning the number
    /// of bytes copied.
    pub async fn copy_to<W>(&mut self, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut copied = 0u64;
        let mut chunk = [0u8; 8192];
        while self.remaining > 0 {
            let n = self.read(&mut chunk).await?;
            writer
                .write_all(&chunk[..n])
                .await
                .map_err(|e| Error::pipe("copy object stream", e))?;
            copied += n as u64;
        }
        Ok(copied)
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("info", &self.info)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}
