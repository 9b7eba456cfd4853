//! File move implementation.
//! Attempts an atomic rename; on cross-filesystem or other rename errors,
//! falls back to copy + source delete.

use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::UnifsError;
use crate::probe;

use super::copy_tree::{carry_metadata, copy_file};
use super::helpers::{io_err, is_cross_device};

/// Move or rename a single file. An existing destination file is replaced;
/// a destination that is a directory is a typed kind-conflict decline;
/// missing parents of the destination are created.
///
/// If the rename fails (typically cross-device) the content is copied and
/// the source deleted. Should the delete fail after a successful copy, a
/// [`UnifsError::DuplicateRisk`] is returned while the bytes exist at both
/// locations; this is the one state where a failure does not mean "nothing
/// changed".
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if !probe::is_file(src) {
        return Err(UnifsError::NotAFile {
            op: "move_file",
            path: src.to_path_buf(),
        }
        .into());
    }

    if probe::is_dir(dst) {
        return Err(UnifsError::KindConflict {
            op: "move_file",
            path: dst.to_path_buf(),
        }
        .into());
    }

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err("create destination parent", parent))?;
        }
    }

    // Last writer wins: clear an existing file slot before the rename so the
    // semantics match the copy fallback on every platform.
    if probe::is_file(dst) {
        fs::remove_file(dst).map_err(io_err("remove existing destination", dst))?;
    }

    match fs::rename(src, dst) {
        Ok(()) => {
            info!(src = %src.display(), dst = %dst.display(), "renamed file atomically");
            Ok(())
        }
        Err(e) => {
            let hint = if is_cross_device(&e) {
                "cross-filesystem; copying instead"
            } else {
                "falling back to copy"
            };
            warn!(src = %src.display(), error = %e, hint, "rename failed");

            copy_file(src, dst)?;
            let _ = carry_metadata(src, dst, true);
            if let Err(del) = fs::remove_file(src) {
                warn!(src = %src.display(), error = %del, "source delete failed after copy");
                return Err(UnifsError::DuplicateRisk {
                    src: src.to_path_buf(),
                    dst: dst.to_path_buf(),
                }
                .into());
            }
            info!(src = %src.display(), dst = %dst.display(), "moved file via copy+delete");
            Ok(())
        }
    }
}

/// Like [`move_file`], but a missing source is vacuous success.
pub fn move_file_if_exists(src: &Path, dst: &Path) -> Result<()> {
    if !probe::is_file(src) {
        return Ok(());
    }
    move_file(src, dst)
}

/// Move the file only when it holds zero bytes; a non-empty source is a
/// typed decline, not an I/O failure.
pub fn move_file_if_empty(src: &Path, dst: &Path) -> Result<()> {
    if !probe::is_file(src) {
        return Err(UnifsError::NotAFile {
            op: "move_file_if_empty",
            path: src.to_path_buf(),
        }
        .into());
    }
    if !probe::is_file_empty(src) {
        return Err(UnifsError::NotEmpty {
            op: "move_file_if_empty",
            path: src.to_path_buf(),
        }
        .into());
    }
    move_file(src, dst)
}

/// Rename a file within its directory. `new_name` must be a bare file name,
/// not a path.
pub fn rename_file(path: &Path, new_name: &str) -> Result<()> {
    if new_name.contains(['/', '\\']) {
        return Err(anyhow::anyhow!(
            "rename_file: new name '{new_name}' must not contain path separators"
        ));
    }
    let dst = path.with_file_name(new_name);
    move_file(path, &dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn moves_and_replaces_destination() {
        let td = assert_fs::TempDir::new().unwrap();
        let src = td.child("a/x.txt");
        src.write_str("new").unwrap();
        let dst = td.child("b/x.txt");
        dst.write_str("old").unwrap();

        move_file(src.path(), dst.path()).unwrap();
        assert!(!src.path().exists());
        dst.assert("new");
    }

    #[test]
    fn creates_missing_destination_parents() {
        let td = assert_fs::TempDir::new().unwrap();
        let src = td.child("x.txt");
        src.write_str("payload").unwrap();
        let dst = td.path().join("deep/below/x.txt");

        move_file(src.path(), &dst).unwrap();
        assert_eq!(fs::read_to_string(&dst).unwrap(), "payload");
    }

    #[test]
    fn declines_directory_source() {
        let td = assert_fs::TempDir::new().unwrap();
        let d = td.child("dir");
        d.create_dir_all().unwrap();

        let err = move_file(d.path(), &td.path().join("out")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UnifsError>(),
            Some(UnifsError::NotAFile { .. })
        ));
    }

    #[test]
    fn declines_directory_destination_without_mutation() {
        let td = assert_fs::TempDir::new().unwrap();
        let src = td.child("x.txt");
        src.write_str("payload").unwrap();
        let dst = td.child("taken");
        dst.create_dir_all().unwrap();

        let err = move_file(src.path(), dst.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UnifsError>(),
            Some(UnifsError::KindConflict { .. })
        ));
        src.assert("payload");
        assert!(dst.path().is_dir());
    }

    #[test]
    fn if_exists_is_vacuous_on_missing_source() {
        let td = assert_fs::TempDir::new().unwrap();
        let dst = td.path().join("anywhere.txt");
        move_file_if_exists(&td.path().join("missing.txt"), &dst).unwrap();
        assert!(!dst.exists());
    }

    #[test]
    fn if_empty_declines_non_empty_source() {
        let td = assert_fs::TempDir::new().unwrap();
        let src = td.child("full.txt");
        src.write_str("bytes").unwrap();

        let err = move_file_if_empty(src.path(), &td.path().join("out")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UnifsError>(),
            Some(UnifsError::NotEmpty { .. })
        ));
        src.assert("bytes");
    }

    #[test]
    fn if_empty_moves_zero_byte_file() {
        let td = assert_fs::TempDir::new().unwrap();
        let src = td.child("empty.txt");
        src.touch().unwrap();
        let dst = td.path().join("moved.txt");

        move_file_if_empty(src.path(), &dst).unwrap();
        assert!(!src.path().exists());
        assert!(dst.exists());
    }

    #[test]
    fn rename_rejects_path_separators() {
        let td = assert_fs::TempDir::new().unwrap();
        let src = td.child("f.txt");
        src.touch().unwrap();
        assert!(rename_file(src.path(), "sub/f.txt").is_err());
        assert!(src.path().exists());
    }

    #[test]
    fn rename_stays_in_directory() {
        let td = assert_fs::TempDir::new().unwrap();
        let src = td.child("old.txt");
        src.write_str("x").unwrap();

        rename_file(src.path(), "new.txt").unwrap();
        assert!(!src.path().exists());
        td.child("new.txt").assert("x");
    }
}
