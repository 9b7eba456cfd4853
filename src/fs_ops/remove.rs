//! Deletion primitives and best-effort batch cleanups.
//!
//! Single-target removals return a detailed `Result`; the batch cleanups
//! (`remove_empty_*`, `remove_by_pattern`, `remove_all_links`) attempt
//! every candidate in one directory level and report per-item outcomes.

use anyhow::{Context, Result};
use glob::Pattern;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info};

use crate::batch::BatchReport;
use crate::errors::UnifsError;
use crate::probe;

use super::helpers::io_err;

/// Remove a single file.
pub fn remove_file(path: &Path) -> Result<()> {
    if !probe::is_file(path) {
        return Err(UnifsError::NotAFile {
            op: "remove_file",
            path: path.to_path_buf(),
        }
        .into());
    }
    fs::remove_file(path).map_err(io_err("remove file", path))?;
    Ok(())
}

/// Remove an empty directory; a populated one is a typed decline and is
/// left untouched.
pub fn remove_dir(path: &Path) -> Result<()> {
    if !probe::is_dir(path) {
        return Err(UnifsError::NotADirectory {
            op: "remove_dir",
            path: path.to_path_buf(),
        }
        .into());
    }
    if !probe::is_dir_empty(path) {
        return Err(UnifsError::NotEmpty {
            op: "remove_dir",
            path: path.to_path_buf(),
        }
        .into());
    }
    fs::remove_dir(path).map_err(io_err("remove directory", path))?;
    Ok(())
}

/// Remove a directory and everything beneath it.
pub fn remove_dir_recursive(path: &Path) -> Result<()> {
    if !probe::is_dir(path) {
        return Err(UnifsError::NotADirectory {
            op: "remove_dir_recursive",
            path: path.to_path_buf(),
        }
        .into());
    }
    fs::remove_dir_all(path).map_err(io_err("remove directory tree", path))?;
    Ok(())
}

/// Remove a symlink itself, never its target.
pub fn remove_symlink(path: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(path).map_err(io_err("stat symlink", path))?;
    if !meta.file_type().is_symlink() {
        return Err(anyhow::anyhow!(
            "remove_symlink: '{}' is not a symbolic link",
            path.display()
        ));
    }
    fs::remove_file(path).map_err(io_err("remove symlink", path))?;
    Ok(())
}

/// Empty a directory without removing the directory itself. Best-effort
/// over the immediate children.
pub fn remove_dir_contents(dir: &Path) -> Result<BatchReport> {
    if !probe::is_dir(dir) {
        return Err(UnifsError::NotADirectory {
            op: "remove_dir_contents",
            path: dir.to_path_buf(),
        }
        .into());
    }
    let entries = fs::read_dir(dir).map_err(io_err("read directory", dir))?;
    let mut report = BatchReport::new();

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                report.record_failure(dir, format!("read entry: {e}"));
                continue;
            }
        };
        let path = entry.path();
        let res = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match res {
            Ok(()) => report.record_ok(&path),
            Err(e) => report.record_failure(&path, e),
        }
    }
    Ok(report)
}

/// Remove every zero-byte regular file in one directory level.
pub fn remove_empty_files(dir: &Path) -> Result<BatchReport> {
    batch_over_children(dir, "remove_empty_files", |path, meta| {
        if meta.is_file() && meta.len() == 0 {
            Some(fs::remove_file(path))
        } else {
            None
        }
    })
}

/// Remove every entry-less subdirectory in one directory level.
pub fn remove_empty_dirs(dir: &Path) -> Result<BatchReport> {
    batch_over_children(dir, "remove_empty_dirs", |path, meta| {
        if meta.is_dir() && probe::is_dir_empty(path) {
            Some(fs::remove_dir(path))
        } else {
            None
        }
    })
}

/// Remove every symlink in one directory level.
pub fn remove_all_links(dir: &Path) -> Result<BatchReport> {
    batch_over_children(dir, "remove_all_links", |path, meta| {
        if meta.file_type().is_symlink() {
            Some(fs::remove_file(path))
        } else {
            None
        }
    })
}

/// Remove the files in `dir` whose *names* match a shell glob (`*`, `?`,
/// character classes). Matching is per-name at a single directory level;
/// subdirectories are never matched or entered.
pub fn remove_by_pattern(dir: &Path, pattern: &str) -> Result<BatchReport> {
    let pattern = Pattern::new(pattern)
        .with_context(|| format!("invalid glob pattern '{pattern}'"))?;

    batch_over_children(dir, "remove_by_pattern", move |path, meta| {
        if meta.is_dir() {
            return None;
        }
        let name = path.file_name()?.to_string_lossy();
        if pattern.matches(&name) {
            Some(fs::remove_file(path))
        } else {
            None
        }
    })
}

/// Remove a file only when it still matches the caller's expectations.
///
/// Each supplied expectation must hold exactly: `expected_size` against the
/// current byte length, `expected_mtime` against the current modification
/// time. If an expectation is supplied but the corresponding field cannot
/// be read, the deletion is refused rather than guessed.
pub fn safe_remove_file(
    path: &Path,
    expected_size: Option<u64>,
    expected_mtime: Option<SystemTime>,
) -> Result<()> {
    let meta = fs::metadata(path).map_err(io_err("stat file", path))?;
    if meta.is_dir() {
        return Err(UnifsError::NotAFile {
            op: "safe_remove_file",
            path: path.to_path_buf(),
        }
        .into());
    }

    if let Some(size) = expected_size {
        if meta.len() != size {
            return Err(UnifsError::SafetyMismatch {
                op: "safe_remove_file",
                path: path.to_path_buf(),
                what: "size",
            }
            .into());
        }
    }

    if let Some(mtime) = expected_mtime {
        match meta.modified() {
            Ok(actual) if actual == mtime => {}
            // Unreadable mtime counts as a mismatch: refuse, don't guess.
            _ => {
                return Err(UnifsError::SafetyMismatch {
                    op: "safe_remove_file",
                    path: path.to_path_buf(),
                    what: "modification time",
                }
                .into());
            }
        }
    }

    fs::remove_file(path).map_err(io_err("remove file", path))?;
    info!(path = %path.display(), "safe-removed file");
    Ok(())
}

/// Shared driver for the one-level batch cleanups: `select` returns `None`
/// to skip an entry or `Some(result)` of the attempted removal.
fn batch_over_children<F>(dir: &Path, op: &'static str, select: F) -> Result<BatchReport>
where
    F: Fn(&Path, &fs::Metadata) -> Option<std::io::Result<()>>,
{
    if !probe::is_dir(dir) {
        return Err(UnifsError::NotADirectory {
            op,
            path: dir.to_path_buf(),
        }
        .into());
    }
    let entries = fs::read_dir(dir).map_err(io_err("read directory", dir))?;
    let mut report = BatchReport::new();

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                report.record_failure(dir, format!("read entry: {e}"));
                continue;
            }
        };
        let path = entry.path();
        let meta = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                report.record_failure(&path, format!("stat: {e}"));
                continue;
            }
        };
        match select(&path, &meta) {
            None => {}
            Some(Ok(())) => report.record_ok(&path),
            Some(Err(e)) => report.record_failure(&path, e),
        }
    }

    debug!(dir = %dir.display(), op, removed = report.succeeded(), "batch removal finished");
    Ok(report)
}
