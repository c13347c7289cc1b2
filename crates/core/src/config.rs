//! Configuration for the gitmux daemon.
//!
//! Two layers, following the usual split: `Config` is the serde-facing
//! on-disk shape where everything is optional, `Settings` is the resolved
//! runtime shape with concrete durations and defaults applied.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default time-to-live for cached subprocess pairs.
pub(crate) const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);
/// Default cap on the number of cached subprocess pairs.
pub(crate) const DEFAULT_CACHE_MAX_ENTRIES: usize = 100;
/// Default interval between TTL sweeps.
pub(crate) const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);
/// Default age past which `tmp_*` entries are considered stale.
pub(crate) const DEFAULT_STALE_TEMP_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Main configuration structure for gitmux
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Subprocess-pair cache configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheConfig>,

    /// Housekeeping configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housekeeping: Option<HousekeepingConfig>,

    /// Git subprocess configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitConfig>,
}

/// Subprocess-pair cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Time-to-live for cached pairs, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u64>,

    /// Maximum number of cached pairs; values ≤ 0 fall back to the default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<i64>,

    /// Interval between TTL sweeps, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep_interval_seconds: Option<u64>,
}

/// Housekeeping configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HousekeepingConfig {
    /// Age in days past which `tmp_*` entries are removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_temp_age_days: Option<u64>,
}

/// Git subprocess configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GitConfig {
    /// Path to the git binary; defaults to `git` from `PATH`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<String>,
}

impl Config {
    /// Parse a configuration from its JSON representation.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::configuration(format!("invalid configuration: {e}")))
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(e, Some(path.to_path_buf()), "read"))?;
        Self::from_json_str(&content)
    }
}

/// Resolved runtime settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// Resolved cache settings
    pub cache: CacheSettings,
    /// Resolved housekeeping settings
    pub housekeeping: HousekeepingSettings,
    /// Resolved git settings
    pub git: GitSettings,
}

/// Resolved cache settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Time-to-live for cached pairs
    pub ttl: Duration,
    /// Maximum number of cached pairs
    pub max_entries: usize,
    /// Interval between TTL sweeps
    pub sweep_interval: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Resolved housekeeping settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HousekeepingSettings {
    /// Age past which `tmp_*` entries are removed
    pub stale_temp_age: Duration,
}

impl Default for HousekeepingSettings {
    fn default() -> Self {
        Self {
            stale_temp_age: DEFAULT_STALE_TEMP_AGE,
        }
    }
}

/// Resolved git settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitSettings {
    /// Path to the git binary
    pub binary_path: String,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            binary_path: "git".to_string(),
        }
    }
}

impl Settings {
    /// Resolve runtime settings from an on-disk configuration.
    ///
    /// Absent fields take their defaults; a non-positive `maxEntries` is
    /// replaced by the default at construction.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let cache = config.cache.clone().unwrap_or_default();
        let housekeeping = config.housekeeping.clone().unwrap_or_default();
        let git = config.git.clone().unwrap_or_default();

        let max_entries = match cache.max_entries {
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
            _ => DEFAULT_CACHE_MAX_ENTRIES,
        };

        Self {
            cache: CacheSettings {
                ttl: cache
                    .ttl_seconds
                    .map_or(DEFAULT_CACHE_TTL, Duration::from_secs),
                max_entries,
                sweep_interval: cache
                    .sweep_interval_seconds
                    .map_or(DEFAULT_SWEEP_INTERVAL, Duration::from_secs),
            },
            housekeeping: HousekeepingSettings {
                stale_temp_age: housekeeping
                    .stale_temp_age_days
                    .map_or(DEFAULT_STALE_TEMP_AGE, |days| {
                        Duration::from_secs(days * 24 * 60 * 60)
                    }),
            },
            git: GitSettings {
                binary_path: git.binary_path.unwrap_or_else(|| "git".to_string()),
            },
        }
    }
}
