//! Telemetry wrapper around an [`ObjectReader`].
//!
//! Each call opens a tracing span named after the operation, tags it with
//! the revspec and bumps the per-kind lookup counter, then forwards.
//! Errors pass through untouched so not-found stays type-distinguishable.

use crate::batch::Object;
use crate::info::ObjectInfo;
use crate::metrics::{CatfileMetrics, LookupKind, global_metrics};
use crate::reader::ObjectReader;
use crate::Result;
use async_trait::async_trait;
use gitmux_core::RequestContext;
use std::sync::Arc;
use tracing::Instrument;

/// Transparent instrumentation around any [`ObjectReader`].
#[derive(Debug)]
pub struct Instrumented<R> {
    inner: R,
    metrics: Arc<CatfileMetrics>,
}

impl<R> Instrumented<R> {
    /// Wrap a reader, reporting to the global metrics.
    pub fn new(inner: R) -> Self {
        Self::with_metrics(inner, global_metrics())
    }

    /// Wrap a reader, reporting to the given metrics.
    pub fn with_metrics(inner: R, metrics: Arc<CatfileMetrics>) -> Self {
        Self { inner, metrics }
    }

    /// The wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwrap, discarding the instrumentation.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[async_trait]
impl<R: ObjectReader> ObjectReader for Instrumented<R> {
    async fn info(&self, ctx: &RequestContext, revspec: &str) -> Result<ObjectInfo> {
        self.metrics.record_lookup(LookupKind::Info);
        self.inner
            .info(ctx, revspec)
            .instrument(tracing::info_span!("catfile.info", revspec = %revspec))
            .await
    }

    async fn tree(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.metrics.record_lookup(LookupKind::Tree);
        self.inner
            .tree(ctx, revspec)
            .instrument(tracing::info_span!("catfile.tree", revspec = %revspec))
            .await
    }

    async fn commit(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.metrics.record_lookup(LookupKind::Commit);
        self.inner
            .commit(ctx, revspec)
            .instrument(tracing::info_span!("catfile.commit", revspec = %revspec))
            .await
    }

    async fn blob(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.metrics.record_lookup(LookupKind::Blob);
        self.inner
            .blob(ctx, revspec)
            .instrument(tracing::info_span!("catfile.blob", revspec = %revspec))
            .await
    }

    async fn tag(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.metrics.record_lookup(LookupKind::Tag);
        self.inner
            .tag(ctx, revspec)
            .instrument(tracing::info_span!("catfile.tag", revspec = %revspec))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct NotFoundReader;

    #[async_trait]
    impl ObjectReader for NotFoundReader {
        async fn info(&self, _ctx: &RequestContext, revspec: &str) -> Result<ObjectInfo> {
            Err(Error::not_found(revspec))
        }

        async fn tree(&self, _ctx: &RequestContext, revspec: &str) -> Result<Object> {
            Err(Error::not_found(revspec))
        }

        async fn commit(&self, _ctx: &RequestContext, revspec: &str) -> Result<Object> {
            Err(Error::not_found(revspec))
        }

        async fn blob(&self, _ctx: &RequestContext, revspec: &str) -> Result<Object> {
            Err(Error::not_found(revspec))
        }

        async fn tag(&self, _ctx: &RequestContext, revspec: &str) -> Result<Object> {
            Err(Error::not_found(revspec))
        }
    }

    #[tokio::test]
    async fn test_lookup_counters_per_kind() {
        let metrics = Arc::new(CatfileMetrics::new());
        let reader = Instrumented::with_metrics(NotFoundReader, Arc::clone(&metrics));
        let ctx = RequestContext::new();

        let _ = reader.info(&ctx, "a").await;
        let _ = reader.blob(&ctx, "b").await;
        let _ = reader.blob(&ctx, "c").await;
        let _ = reader.tag(&ctx, "d").await;

        assert_eq!(metrics.lookups(LookupKind::Info), 1);
        assert_eq!(metrics.lookups(LookupKind::Blob), 2);
        assert_eq!(metrics.lookups(LookupKind::Tag), 1);
        assert_eq!(metrics.lookups(LookupKind::Commit), 0);
    }

    #[tokio::test]
    async fn test_errors_pass_through_unchanged() {
        let reader = Instrumented::with_metrics(
            NotFoundReader,
            Arc::new(CatfileMetrics::new()),
        );
        let ctx = RequestContext::new();

        let err = reader.blob(&ctx, "deadbeef").await.unwrap_err();
        assert!(err.is_not_found());
        match err {
            Error::ObjectNotFound { revspec } => assert_eq!(revspec, "deadbeef"),
            other => panic!("expected ObjectNotFound, got {other:?}"),
        }
    }
}
