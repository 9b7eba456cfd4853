//! Path predicates and metadata probes.
//!
//! Predicates collapse every underlying error into `false` and report the
//! detail through a `tracing::debug!` side channel only; callers cannot
//! distinguish "missing" from "inaccessible" here. `try_stat` and
//! `list_children` are the detailed escape hatch for code that needs the
//! error value.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

/// Basic stat fields used across the crate.
#[derive(Debug, Clone)]
pub struct PathStat {
    pub size: u64,
    pub mode: u32,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

/// Does the path exist at all (file, directory, or dangling-link target)?
pub fn path_exists(path: &Path) -> bool {
    match fs::symlink_metadata(path) {
        Ok(_) => true,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "path_exists probe");
            false
        }
    }
}

pub fn is_file(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(m) => m.is_file(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "is_file probe");
            false
        }
    }
}

pub fn is_dir(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(m) => m.is_dir(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "is_dir probe");
            false
        }
    }
}

/// Zero directory entries. False for anything that is not a readable
/// directory.
pub fn is_dir_empty(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_none(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "is_dir_empty probe");
            false
        }
    }
}

/// Zero bytes. False for anything that is not a stat-able regular file.
pub fn is_file_empty(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(m) if m.is_file() => m.len() == 0,
        Ok(_) => false,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "is_file_empty probe");
            false
        }
    }
}

/// Kind-dispatching emptiness check: files by byte count, directories by
/// entry count.
pub fn is_empty(path: &Path) -> bool {
    if is_dir(path) {
        is_dir_empty(path)
    } else {
        is_file_empty(path)
    }
}

/// Detailed stat with full error propagation.
pub fn try_stat(path: &Path) -> Result<PathStat> {
    let meta = fs::metadata(path)
        .with_context(|| format!("stat '{}'", path.display()))?;

    #[cfg(unix)]
    let mode = {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode()
    };
    #[cfg(not(unix))]
    let mode = if meta.permissions().readonly() { 0o444 } else { 0o666 };

    Ok(PathStat {
        size: meta.len(),
        mode,
        modified: meta.modified().ok(),
        is_dir: meta.is_dir(),
    })
}

/// Boolean-collapsed stat; `None` on any underlying error.
pub fn stat(path: &Path) -> Option<PathStat> {
    match try_stat(path) {
        Ok(s) => Some(s),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "stat probe");
            None
        }
    }
}

/// Immediate children of a directory, split into files and directories.
/// Symlinks are reported under the kind their target resolves to; dangling
/// links land in the files bucket.
pub fn list_children(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("read directory '{}'", dir.display()))?;

    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry under '{}'", dir.display()))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        } else {
            files.push(path);
        }
    }
    files.sort();
    dirs.sort();
    Ok((files, dirs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn predicates_on_missing_path_are_false() {
        let td = assert_fs::TempDir::new().unwrap();
        let ghost = td.path().join("ghost");
        assert!(!path_exists(&ghost));
        assert!(!is_file(&ghost));
        assert!(!is_dir(&ghost));
        assert!(!is_dir_empty(&ghost));
        assert!(!is_file_empty(&ghost));
        assert!(stat(&ghost).is_none());
    }

    #[test]
    fn emptiness_by_kind() {
        let td = assert_fs::TempDir::new().unwrap();
        let empty_file = td.child("zero.bin");
        empty_file.touch().unwrap();
        let full_file = td.child("data.bin");
        full_file.write_binary(b"abc").unwrap();
        let empty_dir = td.child("hollow");
        empty_dir.create_dir_all().unwrap();

        assert!(is_file_empty(empty_file.path()));
        assert!(!is_file_empty(full_file.path()));
        assert!(is_dir_empty(empty_dir.path()));
        assert!(!is_dir_empty(td.path()));

        assert!(is_empty(empty_file.path()));
        assert!(is_empty(empty_dir.path()));
        assert!(!is_empty(td.path()));
    }

    #[test]
    fn stat_reports_size_and_kind() {
        let td = assert_fs::TempDir::new().unwrap();
        let f = td.child("payload");
        f.write_binary(&[0u8; 17]).unwrap();

        let s = try_stat(f.path()).unwrap();
        assert_eq!(s.size, 17);
        assert!(!s.is_dir);
        assert!(s.modified.is_some());

        let d = try_stat(td.path()).unwrap();
        assert!(d.is_dir);
    }

    #[test]
    fn list_children_splits_kinds() {
        let td = assert_fs::TempDir::new().unwrap();
        td.child("a.txt").touch().unwrap();
        td.child("b.txt").touch().unwrap();
        td.child("nested").create_dir_all().unwrap();

        let (files, dirs) = list_children(td.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(dirs.len(), 1);
        assert!(dirs[0].ends_with("nested"));
    }
}
