//! Directory move implementation.
//! Tries an atomic rename when the destination is free; merges into an
//! existing destination directory; declines when the destination is a file.

use anyhow::{Result, anyhow};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::UnifsError;
use crate::probe;

use super::helpers::io_err;
use super::merge::merge_into;

/// Move or rename a directory.
///
/// Destination states:
/// - missing: atomic rename, with a merge-based fallback when the rename
///   fails (typically cross-device);
/// - existing directory: contents are merged, source wins on conflicts;
/// - existing file: typed kind-conflict decline, nothing is mutated.
pub fn move_dir(src: &Path, dst: &Path) -> Result<()> {
    if !probe::is_dir(src) {
        return Err(UnifsError::NotADirectory {
            op: "move_dir",
            path: src.to_path_buf(),
        }
        .into());
    }

    if probe::is_file(dst) {
        return Err(UnifsError::KindConflict {
            op: "move_dir",
            path: dst.to_path_buf(),
        }
        .into());
    }

    if !probe::path_exists(dst) {
        if let Some(parent) = dst.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err("create destination parent", parent))?;
            }
        }
        match fs::rename(src, dst) {
            Ok(()) => {
                info!(src = %src.display(), dst = %dst.display(), "renamed directory atomically");
                return Ok(());
            }
            Err(e) => {
                warn!(src = %src.display(), error = %e, "rename failed; merging entry by entry");
                fs::create_dir_all(dst).map_err(io_err("create destination directory", dst))?;
            }
        }
    }

    let report = merge_into(src, dst)?;
    if report.all_ok() {
        Ok(())
    } else {
        let (first_path, first_why) = report
            .failures()
            .next()
            .map(|(p, w)| (p.display().to_string(), w.to_string()))
            .unwrap_or_default();
        Err(anyhow!(
            "move_dir: {} of {} entries failed merging '{}' into '{}'; first: {} ({})",
            report.items.len() - report.succeeded(),
            report.items.len(),
            src.display(),
            dst.display(),
            first_path,
            first_why
        ))
    }
}

/// Like [`move_dir`], but a missing source is vacuous success.
pub fn move_dir_if_exists(src: &Path, dst: &Path) -> Result<()> {
    if !probe::is_dir(src) {
        return Ok(());
    }
    move_dir(src, dst)
}

/// Move the directory only when it has no entries; a populated source is a
/// typed decline.
pub fn move_dir_if_empty(src: &Path, dst: &Path) -> Result<()> {
    if !probe::is_dir(src) {
        return Err(UnifsError::NotADirectory {
            op: "move_dir_if_empty",
            path: src.to_path_buf(),
        }
        .into());
    }
    if !probe::is_dir_empty(src) {
        return Err(UnifsError::NotEmpty {
            op: "move_dir_if_empty",
            path: src.to_path_buf(),
        }
        .into());
    }
    move_dir(src, dst)
}

/// Rename a directory in place. `new_name` must be a bare name, not a path.
pub fn rename_dir(path: &Path, new_name: &str) -> Result<()> {
    if new_name.contains(['/', '\\']) {
        return Err(anyhow!(
            "rename_dir: new name '{new_name}' must not contain path separators"
        ));
    }
    let dst = path.with_file_name(new_name);
    move_dir(path, &dst)
}
