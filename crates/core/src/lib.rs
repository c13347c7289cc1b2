//! Shared foundations for the gitmux object-access daemon.
//!
//! This crate carries the value types and plumbing the rest of the
//! workspace builds on:
//! - Repository identity and the environment projection used to spawn git
//! - Request-scoped context (cancellation plus string metadata)
//! - Process-wide configuration, both the on-disk shape and the resolved
//!   runtime settings

mod config;
mod context;
mod error;
mod repository;

pub use config::{
    CacheConfig, CacheSettings, Config, GitConfig, GitSettings, HousekeepingConfig,
    HousekeepingSettings, Settings,
};
pub use context::{RequestContext, SESSION_ID_METADATA_KEY};
pub use error::{Error, Result};
pub use repository::Repository;
