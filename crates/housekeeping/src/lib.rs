//! Housekeeping for gitmux repository directories
//!
//! Aborted fetches and crashed writers leave `tmp_*` files and directories
//! behind in repository object stores. Left alone they accumulate without
//! bound and can poison object lookups, so the daemon sweeps them
//! periodically: anything matching the prefix and older than the stale age
//! is removed, fixing directory permissions along the way when a removal
//! needs it.

mod error;
mod sweep;

pub use error::{Error, Result};
pub use sweep::{SweepResult, TEMP_PREFIX, perform};
