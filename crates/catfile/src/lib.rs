//! Multiplexed `git cat-file` subprocess pairs for the gitmux daemon
//!
//! This crate is the object-access core: it serves many concurrent
//! requests for object metadata and raw object bytes with low per-request
//! overhead by keeping one `cat-file --batch` / `cat-file --batch-check`
//! subprocess pair alive per repository and multiplexing requests over it.
//!
//! - [`parse_header`] / [`ObjectInfo`]: the batch-protocol header line
//! - [`CheckChannel`]: serialized metadata lookups (`--batch-check`)
//! - [`BatchChannel`] / [`Object`]: serialized, stateful body streaming
//!   (`--batch`)
//! - [`BatchPair`]: both channels bound to one repository and lifetime
//! - [`SessionCache`]: TTL-bounded reuse of pairs across requests of the
//!   same client session
//! - [`BatchPool`]: the acquisition entry point
//! - [`Instrumented`]: tracing spans and lookup counters around any
//!   [`ObjectReader`]
//!
//! # Example
//!
//! ```no_run
//! use gitmux_catfile::{BatchPool, ObjectReader};
//! use gitmux_core::{Repository, RequestContext, Settings};
//!
//! # async fn example() -> gitmux_catfile::Result<()> {
//! let pool = BatchPool::new(&Settings::default());
//! let ctx = RequestContext::new().with_session_id("session-1");
//! let repo = Repository::new("default", "group/project.git", "/srv/project.git");
//!
//! let reader = pool.acquire(&ctx, &repo)?;
//! let mut blob = reader.blob(&ctx, "HEAD:README.md").await?;
//! let body = blob.read_all().await?;
//! ctx.finish();
//! # let _ = body;
//! # Ok(())
//! # }
//! ```

mod batch;
mod cache;
mod check;
mod error;
mod info;
mod instrument;
mod metrics;
mod pair;
mod pool;
mod reader;
mod wire;

pub use batch::{BatchChannel, Object};
pub use cache::{RepoKey, SessionCache};
pub use check::CheckChannel;
pub use error::{Error, Result};
pub use info::{MAX_HEADER_LEN, ObjectInfo, ObjectKind, parse_header};
pub use instrument::Instrumented;
pub use metrics::{CatfileMetrics, LookupKind, global_metrics};
pub use pair::BatchPair;
pub use pool::BatchPool;
pub use reader::ObjectReader;
