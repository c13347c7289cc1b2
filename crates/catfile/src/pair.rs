//! Batch pairs: one `--batch` and one `--batch-check` subprocess bound to
//! the same repository, environment and lifetime.
//!
//! The pair's cancellation token is deliberately not the caller's request
//! token: a cached pair outlives the request that spawned it, and only the
//! cache (or an explicit `close`) may fire its token. Firing the token
//! drops both stdin pipes; the subprocesses exit on EOF and are reaped by
//! the monitor tasks.

use crate::batch::{BatchChannel, Object};
use crate::check::CheckChannel;
use crate::info::{ObjectInfo, ObjectKind};
use crate::metrics::CatfileMetrics;
use crate::reader::ObjectReader;
use crate::{Error, Result};
use async_trait::async_trait;
use gitmux_core::{GitSettings, Repository, RequestContext};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio_util::sync::CancellationToken;

/// One spawned `cat-file` subprocess with its pipe halves taken.
struct SpawnedProcess {
    stdin: ChildStdin,
    stdout: ChildStdout,
    child: Child,
}

fn spawn_cat_file(git: &GitSettings, repo: &Repository, mode: &str) -> Result<SpawnedProcess> {
    let program = format!("{} cat-file {mode}", git.binary_path);

    let mut cmd = Command::new(&git.binary_path);
    cmd.arg("--git-dir")
        .arg(repo.git_directory())
        .arg("cat-file")
        .arg(mode)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    for (key, value) in repo.git_environment() {
        cmd.env(key, value);
    }

    let mut child = cmd.spawn().map_err(|e| Error::spawn(program.as_str(), e))?;
    let stdin = child.stdin.take().ok_or_else(|| {
        Error::spawn(
            program.as_str(),
            std::io::Error::other("stdin was not captured"),
        )
    })?;
    let stdout = child.stdout.take().ok_or_else(|| {
        Error::spawn(
            program.as_str(),
            std::io::Error::other("stdout was not captured"),
        )
    })?;

    Ok(SpawnedProcess {
        stdin,
        stdout,
        child,
    })
}

/// Reap one subprocess once the pair's token fires.
///
/// Dropping stdin first lets the process finish whatever response it is
/// writing and exit on its own; in-flight readers see the remaining bytes
/// and then EOF.
fn monitor_process<F, Fut>(
    token: CancellationToken,
    close_stdin: F,
    mut child: Child,
    metrics: Arc<CatfileMetrics>,
) where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    metrics.record_process_spawned();
    tokio::spawn(async move {
        token.cancelled().await;
        close_stdin().await;
        if let Err(e) = child.wait().await {
            tracing::warn!(error = %e, "failed to reap cat-file subprocess");
        }
        metrics.record_process_exited();
    });
}

/// A `--batch` channel and a `--batch-check` channel sharing one
/// repository, environment and cancellation token.
pub struct BatchPair {
    batch: BatchChannel,
    check: CheckChannel,
    token: CancellationToken,
    closed: AtomicBool,
}

impl BatchPair {
    /// Spawn both subprocesses for `repo` under `token`.
    ///
    /// If the second spawn fails the token is fired so the first process
    /// is torn down; no partial pairs leak.
    pub(crate) fn spawn(
        git: &GitSettings,
        repo: &Repository,
        token: CancellationToken,
        metrics: &Arc<CatfileMetrics>,
    ) -> Result<Arc<Self>> {
        let batch_process = spawn_cat_file(git, repo, "--batch")?;
        let batch = BatchChannel::new(batch_process.stdin, batch_process.stdout);
        monitor_process(
            token.clone(),
            {
                let channel = batch.clone();
                move || async move { channel.close_stdin().await }
            },
            batch_process.child,
            Arc::clone(metrics),
        );

        let check_process = match spawn_cat_file(git, repo, "--batch-check") {
            Ok(process) => process,
            Err(e) => {
                token.cancel();
                return Err(e);
            }
        };
        let check = CheckChannel::new(check_process.stdin, check_process.stdout);
        monitor_process(
            token.clone(),
            {
                let channel = check.clone();
                move || async move { channel.close_stdin().await }
            },
            check_process.child,
            Arc::clone(metrics),
        );

        tracing::debug!(
            storage = %repo.storage_name,
            relative_path = %repo.relative_path,
            "spawned cat-file subprocess pair"
        );

        Ok(Arc::new(Self {
            batch,
            check,
            token,
            closed: AtomicBool::new(false),
        }))
    }

    /// Close the pair, tearing down both subprocesses.
    ///
    /// Idempotent and safe to call concurrently; only the first call fires
    /// the token. Operations already in progress complete on whatever
    /// bytes they had and then observe EOF.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.token.cancel();
        }
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Whether the batch channel still owes body bytes to a reader.
    pub async fn has_unread_data(&self) -> bool {
        self.batch.has_unread_data().await
    }

    /// Look up object metadata via the batch-check channel.
    pub async fn object_info(&self, revspec: &str) -> Result<ObjectInfo> {
        if self.is_closed() {
            return Err(Error::channel_closed());
        }
        self.check.info(revspec).await
    }

    /// Read one object of the expected kind via the batch channel.
    pub async fn read_object(&self, revspec: &str, expected: ObjectKind) -> Result<Object> {
        if self.is_closed() {
            return Err(Error::channel_closed());
        }
        self.batch.reader(revspec, expected).await
    }

    async fn read_object_checked(
        &self,
        ctx: &RequestContext,
        revspec: &str,
        expected: ObjectKind,
    ) -> Result<Object> {
        if ctx.is_done() {
            return Err(Error::Cancelled);
        }
        self.read_object(revspec, expected).await
    }

    /// Build a pair over in-memory transports, without subprocesses.
    #[cfg(test)]
    pub(crate) fn for_tests() -> (Arc<Self>, tokio::io::DuplexStream, tokio::io::DuplexStream) {
        let (batch_client, batch_server) = tokio::io::duplex(64 * 1024);
        let (check_client, check_server) = tokio::io::duplex(64 * 1024);
        let (batch_read, batch_write) = tokio::io::split(batch_client);
        let (check_read, check_write) = tokio::io::split(check_client);

        let pair = Arc::new(Self {
            batch: BatchChannel::new(batch_write, batch_read),
            check: CheckChannel::new(check_write, check_read),
            token: CancellationToken::new(),
            closed: AtomicBool::new(false),
        });
        (pair, batch_server, check_server)
    }
}

#[async_trait]
impl ObjectReader for BatchPair {
    async fn info(&self, ctx: &RequestContext, revspec: &str) -> Result<ObjectInfo> {
        if ctx.is_done() {
            return Err(Error::Cancelled);
        }
        self.object_info(revspec).await
    }

    async fn tree(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.read_object_checked(ctx, revspec, ObjectKind::Tree).await
    }

    async fn commit(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.read_object_checked(ctx, revspec, ObjectKind::Commit).await
    }

    async fn blob(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.read_object_checked(ctx, revspec, ObjectKind::Blob).await
    }

    async fn tag(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.read_object_checked(ctx, revspec, ObjectKind::Tag).await
    }
}

impl std::fmt::Debug for BatchPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPair")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
