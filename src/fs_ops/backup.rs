//! `.bak` backup management around destructive moves and deletes.
//!
//! A backup is always the sibling path `<target>.bak`; at most one exists
//! per target, and making a new one discards a stale predecessor first.
//! `move_with_backup` is a restartable two-phase operation: rename the
//! destination aside, move the source in, and on failure rename the backup
//! back.

use anyhow::{Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::options::Options;
use crate::probe;

use super::copy_tree::{carry_metadata, copy_file, copy_tree};
use super::dir_move::move_dir;
use super::file_move::move_file;
use super::helpers::io_err;

/// Literal suffix appended to a target path to form its backup sibling.
pub const BACKUP_SUFFIX: &str = ".bak";

/// The backup sibling for `path`: the same path with `.bak` appended.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Discard an existing backup of either kind so a fresh one can take the
/// slot.
fn remove_stale_backup(bak: &Path) -> Result<()> {
    if probe::is_dir(bak) {
        fs::remove_dir_all(bak).map_err(io_err("remove stale backup directory", bak))?;
    } else if probe::path_exists(bak) {
        fs::remove_file(bak).map_err(io_err("remove stale backup", bak))?;
    }
    Ok(())
}

/// Move by the kind of the source: file or directory.
fn move_any(src: &Path, dst: &Path) -> Result<()> {
    if probe::is_file(src) {
        move_file(src, dst)
    } else if probe::is_dir(src) {
        move_dir(src, dst)
    } else {
        Err(anyhow!(
            "move: source '{}' is neither a file nor a directory",
            src.display()
        ))
    }
}

/// Move `src` over `dst`, first setting an existing destination aside as
/// `<dst>.bak`.
///
/// On success the backup path (if one was made) is returned for the
/// caller's own retention or cleanup decision. If the move-in step fails,
/// the backup is renamed back to the original destination before the error
/// is returned.
pub fn move_with_backup(src: &Path, dst: &Path) -> Result<Option<PathBuf>> {
    let mut backup: Option<PathBuf> = None;

    if probe::path_exists(dst) {
        let bak = backup_path(dst);
        remove_stale_backup(&bak)?;
        move_any(dst, &bak)?;
        backup = Some(bak);
    }

    match move_any(src, dst) {
        Ok(()) => {
            info!(src = %src.display(), dst = %dst.display(), backup = ?backup, "moved with backup");
            Ok(backup)
        }
        Err(e) => {
            if let Some(ref bak) = backup {
                if let Err(restore) = move_any(bak, dst) {
                    warn!(backup = %bak.display(), error = %restore, "backup restore failed");
                } else {
                    info!(dst = %dst.display(), "restored destination from backup");
                }
            }
            Err(e.context(format!(
                "move_with_backup '{}' -> '{}'",
                src.display(),
                dst.display()
            )))
        }
    }
}

/// Copy `path` to `<path>.bak`, then delete the original. Works for both
/// files and directories; returns the backup path.
pub fn delete_with_backup(path: &Path, opts: &Options) -> Result<PathBuf> {
    let bak = backup_path(path);
    remove_stale_backup(&bak)?;

    if probe::is_file(path) {
        copy_file(path, &bak)?;
        let _ = carry_metadata(path, &bak, opts.preserve_mtimes);
        fs::remove_file(path).map_err(io_err("remove original after backup", path))?;
    } else if probe::is_dir(path) {
        let report = copy_tree(path, &bak, opts)?;
        if !report.all_ok() {
            return Err(anyhow!(
                "delete_with_backup: backing up '{}' left {} entries uncopied; original kept",
                path.display(),
                report.items.len() - report.succeeded()
            ));
        }
        fs::remove_dir_all(path).map_err(io_err("remove original after backup", path))?;
    } else {
        return Err(anyhow!(
            "delete_with_backup: '{}' is neither a file nor a directory",
            path.display()
        ));
    }

    info!(path = %path.display(), backup = %bak.display(), "deleted with backup");
    Ok(bak)
}

/// File-only deletion with backup; the copy happens before the original is
/// touched, so a failed delete still leaves the backup behind (the error
/// names it).
pub fn remove_file_with_backup(path: &Path) -> Result<PathBuf> {
    if !probe::is_file(path) {
        return Err(crate::errors::UnifsError::NotAFile {
            op: "remove_file_with_backup",
            path: path.to_path_buf(),
        }
        .into());
    }
    let bak = backup_path(path);
    remove_stale_backup(&bak)?;
    copy_file(path, &bak)?;
    fs::remove_file(path).map_err(|e| {
        anyhow!(
            "remove original '{}' after backup to '{}': {}",
            path.display(),
            bak.display(),
            e
        )
    })?;
    Ok(bak)
}
