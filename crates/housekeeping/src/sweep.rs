//! The stale temp-file sweep.

use crate::{Error, Result};
use gitmux_core::{HousekeepingSettings, RequestContext};
#[cfg(unix)]
use std::collections::HashSet;
use std::fs;
use std::path::Path;
#[cfg(unix)]
use std::path::PathBuf;
use std::time::SystemTime;
use walkdir::WalkDir;

/// Prefix git and the daemon use for temporary files and directories.
pub const TEMP_PREFIX: &str = "tmp_";

/// Summary of one sweep run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepResult {
    /// Entries matching the prefix and stale enough to remove
    pub marked: usize,
    /// Entries actually removed
    pub removed: usize,
    /// Entries that survived both removal attempts
    pub unremovable: usize,
}

/// Sweep one repository directory.
///
/// Removes every entry whose basename starts with [`TEMP_PREFIX`] and
/// whose modification time is at least the configured stale age in the
/// past. A removal blocked by directory permissions gets one retry after a
/// permission-fixup walk. Individual unremovable entries are logged and
/// counted but never fail the sweep; errors from the walk itself do.
pub fn perform(
    ctx: &RequestContext,
    repo_path: &Path,
    settings: &HousekeepingSettings,
) -> Result<SweepResult> {
    let now = SystemTime::now();
    let mut result = SweepResult::default();

    let mut walker = WalkDir::new(repo_path).into_iter();
    while let Some(entry) = walker.next() {
        if ctx.is_done() {
            return Err(Error::Cancelled);
        }

        let entry = match entry {
            Ok(entry) => entry,
            // entries can vanish mid-walk, including ones we just removed;
            // a missing walk root is still an error
            Err(e)
                if e.path() != Some(repo_path)
                    && e.io_error()
                        .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound) =>
            {
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if !entry.file_name().to_string_lossy().starts_with(TEMP_PREFIX) {
            continue;
        }
        if entry.path() == repo_path {
            // never remove the repository itself, whatever it is called
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < settings.stale_temp_age {
            continue;
        }

        result.marked += 1;
        let is_dir = entry.file_type().is_dir();

        if remove_entry(entry.path(), is_dir).is_ok() {
            result.removed += 1;
        } else if fix_directory_permissions(entry.path())
            .and_then(|()| remove_entry(entry.path(), is_dir))
            .is_ok()
        {
            result.removed += 1;
        } else {
            tracing::warn!(path = %entry.path().display(), "unable to remove stale temporary entry");
            result.unremovable += 1;
        }

        if is_dir {
            // removed or not, there is nothing useful to visit below it
            walker.skip_current_dir();
        }
    }

    tracing::info!(
        repo_path = %repo_path.display(),
        marked = result.marked,
        removed = result.removed,
        unremovable = result.unremovable,
        "stale temporary file sweep finished"
    );

    Ok(result)
}

fn remove_entry(path: &Path, is_dir: bool) -> std::io::Result<()> {
    if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// OR `0o700` into the mode of `root` and every directory beneath it.
///
/// The retry set caps the recursion: a path is fixed at most once per
/// invocation, so permission loops via links cannot recurse forever.
#[cfg(unix)]
fn fix_directory_permissions(root: &Path) -> std::io::Result<()> {
    let mut retried = HashSet::new();
    fix_directory_permissions_inner(root, &mut retried)
}

#[cfg(unix)]
fn fix_directory_permissions_inner(
    dir: &Path,
    retried: &mut HashSet<PathBuf>,
) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if !retried.insert(dir.to_path_buf()) {
        return Ok(());
    }

    let metadata = fs::symlink_metadata(dir)?;
    if !metadata.is_dir() {
        return Ok(());
    }

    let mut permissions = metadata.permissions();
    let mode = permissions.mode();
    if mode & 0o700 != 0o700 {
        permissions.set_mode(mode | 0o700);
        fs::set_permissions(dir, permissions)?;
    }

    for child in fs::read_dir(dir)?.flatten() {
        if child.file_type().is_ok_and(|ft| ft.is_dir()) {
            fix_directory_permissions_inner(&child.path(), retried)?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn fix_directory_permissions(_root: &Path) -> std::io::Result<()> {
    Ok(())
}
