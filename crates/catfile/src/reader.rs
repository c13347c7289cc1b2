//! The capability set consumers program against.

use crate::batch::Object;
use crate::info::ObjectInfo;
use crate::Result;
use async_trait::async_trait;
use gitmux_core::RequestContext;
use std::sync::Arc;

/// The five lookup operations of the object-access core.
///
/// `info` returns metadata only; the other four return the object's
/// metadata plus a one-shot stream over its raw body. A request for an
/// object of the wrong kind fails with a not-found-typed error (see
/// [`crate::Error::is_not_found`]).
#[async_trait]
pub trait ObjectReader: Send + Sync {
    /// Look up object metadata.
    async fn info(&self, ctx: &RequestContext, revspec: &str) -> Result<ObjectInfo>;

    /// Read a tree object.
    async fn tree(&self, ctx: &RequestContext, revspec: &str) -> Result<Object>;

    /// Read a commit object.
    async fn commit(&self, ctx: &RequestContext, revspec: &str) -> Result<Object>;

    /// Read a blob object.
    async fn blob(&self, ctx: &RequestContext, revspec: &str) -> Result<Object>;

    /// Read an annotated tag object.
    async fn tag(&self, ctx: &RequestContext, revspec: &str) -> Result<Object>;
}

#[async_trait]
impl<T: ObjectReader + ?Sized> ObjectReader for Arc<T> {
    async fn info(&self, ctx: &RequestContext, revspec: &str) -> Result<ObjectInfo> {
        self.as_ref().info(ctx, revspec).await
    }

    async fn tree(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.as_ref().tree(ctx, revspec).await
    }

    async fn commit(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.as_ref().commit(ctx, revspec).await
    }

    async fn blob(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.as_ref().blob(ctx, revspec).await
    }

    async fn tag(&self, ctx: &RequestContext, revspec: &str) -> Result<Object> {
        self.as_ref().tag(ctx, revspec).await
    }
}
