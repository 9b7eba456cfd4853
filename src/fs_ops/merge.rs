//! Directory tree merge.
//!
//! Moves every entry of a source directory into an existing destination
//! directory, recursing where both sides hold a directory of the same name.
//! On conflicting file content the source always wins; no timestamps or
//! byte diffs are consulted. Entries are moved, not copied, so a fully
//! successful merge ends with the source directory removed.

use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::batch::BatchReport;
use crate::errors::UnifsError;
use crate::probe;

use super::copy_tree::copy_symlink;
use super::dir_move::move_dir;
use super::file_move::move_file;
use super::helpers::io_err;

/// Merge the contents of `src` into the existing directory `dst`.
///
/// Every entry is attempted even after a failure; the returned report
/// carries the per-entry outcomes. `src` itself is removed only when every
/// entry moved out cleanly, otherwise it stays in place holding the
/// stragglers and the aggregate verdict is failure.
pub fn merge_into(src: &Path, dst: &Path) -> Result<BatchReport> {
    if !probe::is_dir(src) {
        return Err(UnifsError::NotADirectory {
            op: "merge_into",
            path: src.to_path_buf(),
        }
        .into());
    }
    if !probe::is_dir(dst) {
        return Err(UnifsError::NotADirectory {
            op: "merge_into",
            path: dst.to_path_buf(),
        }
        .into());
    }

    let entries = fs::read_dir(src).map_err(io_err("read source directory", src))?;
    let mut report = BatchReport::new();

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                report.record_failure(src, format!("read entry: {e}"));
                continue;
            }
        };
        let child_src = entry.path();
        let child_dst = dst.join(entry.file_name());

        match merge_entry(&child_src, &child_dst) {
            Ok(()) => report.record_ok(&child_src),
            Err(e) => report.record_failure(&child_src, e),
        }
    }

    // Post-order cleanup: children fully processed before the source
    // directory itself is considered for removal.
    if report.all_ok() {
        match fs::remove_dir(src) {
            Ok(()) => info!(src = %src.display(), dst = %dst.display(), "merged directory"),
            Err(e) => report.record_failure(src, format!("remove merged source: {e}")),
        }
    } else {
        debug!(
            src = %src.display(),
            failed = report.items.len() - report.succeeded(),
            "merge left source in place"
        );
    }

    Ok(report)
}

fn merge_entry(child_src: &Path, child_dst: &Path) -> Result<()> {
    let meta = fs::symlink_metadata(child_src).map_err(io_err("stat source entry", child_src))?;

    if meta.file_type().is_symlink() {
        return merge_symlink(child_src, child_dst);
    }

    if meta.is_dir() {
        // Recurses through the move engine: dir-into-dir merges, dir-onto-
        // file is a typed conflict.
        move_dir(child_src, child_dst)
    } else {
        if probe::is_dir(child_dst) {
            return Err(UnifsError::KindConflict {
                op: "merge_into",
                path: child_dst.to_path_buf(),
            }
            .into());
        }
        move_file(child_src, child_dst)
    }
}

fn merge_symlink(child_src: &Path, child_dst: &Path) -> Result<()> {
    if probe::is_dir(child_dst) {
        return Err(UnifsError::KindConflict {
            op: "merge_into",
            path: child_dst.to_path_buf(),
        }
        .into());
    }
    if probe::path_exists(child_dst) {
        fs::remove_file(child_dst).map_err(io_err("remove existing destination", child_dst))?;
    }
    if fs::rename(child_src, child_dst).is_ok() {
        return Ok(());
    }
    // Cross-device: re-create the link, then drop the original.
    copy_symlink(child_src, child_dst)?;
    fs::remove_file(child_src).map_err(io_err("remove source symlink", child_src))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn source_wins_on_file_conflict() {
        let td = assert_fs::TempDir::new().unwrap();
        let src = td.child("src");
        src.child("a/x.txt").write_str("1").unwrap();
        let dst = td.child("dst");
        dst.child("a/x.txt").write_str("2").unwrap();
        dst.child("a/keep.txt").write_str("keep").unwrap();

        let report = merge_into(src.path(), dst.path()).unwrap();
        assert!(report.all_ok());
        assert!(!src.path().exists());
        dst.child("a/x.txt").assert("1");
        dst.child("a/keep.txt").assert("keep");
    }

    #[test]
    fn disjoint_entries_are_moved() {
        let td = assert_fs::TempDir::new().unwrap();
        let src = td.child("src");
        src.child("only-src.txt").write_str("s").unwrap();
        let dst = td.child("dst");
        dst.child("only-dst.txt").write_str("d").unwrap();

        let report = merge_into(src.path(), dst.path()).unwrap();
        assert!(report.all_ok());
        dst.child("only-src.txt").assert("s");
        dst.child("only-dst.txt").assert("d");
    }

    #[test]
    fn kind_conflict_leaves_source_in_place() {
        let td = assert_fs::TempDir::new().unwrap();
        let src = td.child("src");
        src.child("name").write_str("file side").unwrap();
        let dst = td.child("dst");
        dst.child("name").create_dir_all().unwrap();

        let report = merge_into(src.path(), dst.path()).unwrap();
        assert!(!report.all_ok());
        // Source survives with the conflicting entry still inside.
        src.child("name").assert("file side");
        assert!(dst.path().join("name").is_dir());
    }

    #[test]
    fn requires_existing_destination_directory() {
        let td = assert_fs::TempDir::new().unwrap();
        let src = td.child("src");
        src.create_dir_all().unwrap();

        let err = merge_into(src.path(), &td.path().join("nope")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UnifsError>(),
            Some(UnifsError::NotADirectory { .. })
        ));
    }
}
