//! Repository identity.
//!
//! The core never interprets repository paths; it only forwards what the
//! caller supplies to the git subprocesses it spawns (`--git-dir` plus the
//! object-directory environment variables git reads).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Identity of one repository as seen by the object-access core.
///
/// `storage_name` and `relative_path` name the repository within the
/// daemon's storage layout; `git_directory` is the resolved path handed to
/// git as `--git-dir`. Object directory overrides are propagated verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Name of the storage shard the repository lives on
    pub storage_name: String,
    /// Path of the repository relative to the storage root
    pub relative_path: String,
    /// Resolved path to the git directory, passed as `--git-dir`
    pub git_directory: PathBuf,
    /// Override for `GIT_OBJECT_DIRECTORY`, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_object_directory: Option<String>,
    /// Entries for `GIT_ALTERNATE_OBJECT_DIRECTORIES`, if any
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub git_alternate_object_directories: Vec<String>,
}

impl Repository {
    /// Create a repository identity with no object-directory overrides.
    pub fn new(
        storage_name: impl Into<String>,
        relative_path: impl Into<String>,
        git_directory: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage_name: storage_name.into(),
            relative_path: relative_path.into(),
            git_directory: git_directory.into(),
            git_object_directory: None,
            git_alternate_object_directories: Vec::new(),
        }
    }

    /// Set the object directory override, builder style.
    #[must_use]
    pub fn with_object_directory(mut self, dir: impl Into<String>) -> Self {
        self.git_object_directory = Some(dir.into());
        self
    }

    /// Set the alternate object directories, builder style.
    #[must_use]
    pub fn with_alternate_object_directories(
        mut self,
        dirs: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.git_alternate_object_directories = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// The git directory handed to subprocesses.
    #[must_use]
    pub fn git_directory(&self) -> &Path {
        &self.git_directory
    }

    /// The object directory override, or the empty string.
    #[must_use]
    pub fn object_directory(&self) -> &str {
        self.git_object_directory.as_deref().unwrap_or("")
    }

    /// Alternate object directories joined with `:`, the separator git
    /// expects in `GIT_ALTERNATE_OBJECT_DIRECTORIES`.
    #[must_use]
    pub fn alternate_object_directories_joined(&self) -> String {
        self.git_alternate_object_directories.join(":")
    }

    /// Environment entries to inject into spawned git subprocesses.
    ///
    /// Only overrides the caller actually supplied are set; git falls back
    /// to its defaults for anything absent.
    #[must_use]
    pub fn git_environment(&self) -> Vec<(&'static str, String)> {
        let mut env = Vec::new();
        if let Some(dir) = &self.git_object_directory {
            env.push(("GIT_OBJECT_DIRECTORY", dir.clone()));
        }
        if !self.git_alternate_object_directories.is_empty() {
            env.push((
                "GIT_ALTERNATE_OBJECT_DIRECTORIES",
                self.alternate_object_directories_joined(),
            ));
        }
        env
    }
}
