//! Acquisition of subprocess pairs: the entry point that turns a request
//! context and a repository into a ready-to-use pair.
//!
//! Requests carrying a session id go through the cache; on completion a
//! watcher decides the borrowed pair's fate. Clean pairs are returned to
//! the cache under a fresh TTL, dirty ones (a half-read object body means
//! the batch stream is mid-response) are closed, already-closed ones are
//! left alone. Requests without a session id get a pair whose lifetime is
//! the request itself — caching those would pin subprocesses to callers
//! that will never come back.

use crate::Result;
use crate::cache::{RepoKey, SessionCache};
use crate::instrument::Instrumented;
use crate::metrics::{CatfileMetrics, global_metrics};
use crate::pair::BatchPair;
use gitmux_core::{GitSettings, Repository, RequestContext, Settings};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns and caches subprocess pairs per client session.
pub struct BatchPool {
    cache: Arc<SessionCache>,
    git: GitSettings,
    metrics: Arc<CatfileMetrics>,
}

impl BatchPool {
    /// Create a pool from resolved settings, reporting to the global
    /// metrics.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self::with_metrics(settings, global_metrics())
    }

    /// Create a pool from resolved settings with explicit metrics.
    #[must_use]
    pub fn with_metrics(settings: &Settings, metrics: Arc<CatfileMetrics>) -> Self {
        Self {
            cache: Arc::new(SessionCache::new(&settings.cache, Arc::clone(&metrics))),
            git: settings.git.clone(),
            metrics,
        }
    }

    /// The pool's session cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<SessionCache> {
        &self.cache
    }

    /// Start the cache's TTL sweeper.
    pub fn start_sweeper(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.cache.start_sweeper(shutdown)
    }

    /// Acquire an instrumented pair for the request.
    pub fn acquire(
        &self,
        ctx: &RequestContext,
        repo: &Repository,
    ) -> Result<Instrumented<Arc<BatchPair>>> {
        Ok(Instrumented::with_metrics(
            self.acquire_raw(ctx, repo)?,
            Arc::clone(&self.metrics),
        ))
    }

    /// Acquire a pair for the request, without instrumentation.
    ///
    /// With a session id this checks the cache first and installs the
    /// completion watcher either way; without one it spawns a pair bound
    /// to the request context and skips the cache entirely.
    pub fn acquire_raw(&self, ctx: &RequestContext, repo: &Repository) -> Result<Arc<BatchPair>> {
        let Some(session_id) = ctx.session_id() else {
            let token = ctx.token().child_token();
            return BatchPair::spawn(&self.git, repo, token, &self.metrics);
        };

        let key = RepoKey::new(session_id, repo);

        if let Some(pair) = self.cache.checkout(&key) {
            self.watch_return(ctx, key, Arc::clone(&pair));
            return Ok(pair);
        }

        // the pair gets its own token: binding it to the request would
        // tear the subprocesses down at request completion and defeat the
        // cache, which must control the pair's lifetime from here on
        let pair = BatchPair::spawn(&self.git, repo, CancellationToken::new(), &self.metrics)?;
        self.watch_return(ctx, key, Arc::clone(&pair));
        Ok(pair)
    }

    /// Watch for request completion and settle the borrowed pair.
    fn watch_return(&self, ctx: &RequestContext, key: RepoKey, pair: Arc<BatchPair>) {
        let done = ctx.token().clone();
        let cache = Arc::clone(&self.cache);
        let metrics = Arc::clone(&self.metrics);

        tokio::spawn(async move {
            done.cancelled().await;

            if pair.is_closed() {
                return;
            }
            if pair.has_unread_data().await {
                tracing::info!("request returned a dirty cat-file pair, closing it");
                metrics.record_dirty();
                pair.close();
                return;
            }
            cache.add(key, pair);
        });
    }
}

impl std::fmt::Debug for BatchPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchPool")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
