//! Request-scoped context.
//!
//! Every operation on the object-access core runs under a `RequestContext`.
//! The surrounding server cancels the context's token when the request
//! completes (successfully or not); the acquirer uses that signal to return
//! cached subprocess pairs or tear down request-bound ones.

use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Metadata key under which callers supply their session id.
///
/// Requests carrying the same non-empty session id share cached subprocess
/// pairs; an empty or absent session id bypasses the cache entirely.
pub const SESSION_ID_METADATA_KEY: &str = "gitmux-session-id";

/// Request-scoped context: a cancellation token plus string metadata.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Create a context with no metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a metadata entry, builder style.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach a session id, builder style.
    #[must_use]
    pub fn with_session_id(self, session_id: impl Into<String>) -> Self {
        self.with_metadata(SESSION_ID_METADATA_KEY, session_id)
    }

    /// Look up a metadata entry.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// The session id, if a non-empty one was supplied.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.metadata(SESSION_ID_METADATA_KEY)
            .filter(|id| !id.is_empty())
    }

    /// The token that fires when the request completes.
    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Whether the request has already completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Mark the request as complete, firing all completion watchers.
    pub fn finish(&self) {
        self.token.cancel();
    }
}
