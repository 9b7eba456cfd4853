//! Recursive tree copy.
//!
//! Best-effort: a failed file or subtree marks the call failed but every
//! sibling is still attempted; the caller receives per-item outcomes.

use anyhow::Result;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use tracing::debug;

use crate::batch::BatchReport;
use crate::errors::UnifsError;
use crate::options::{Options, SymlinkPolicy};

use super::helpers::io_err;

const COPY_BUF: usize = 1024 * 1024;

/// Copy `src`'s full byte content to `dst`, clobbering an existing
/// destination. Returns the number of bytes written. Buffered 1 MiB I/O;
/// the source is read once from start to EOF.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    let src_f = File::open(src).map_err(io_err("open source file", src))?;
    let dst_f = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(dst)
        .map_err(io_err("create destination file", dst))?;

    let mut reader = BufReader::with_capacity(COPY_BUF, src_f);
    let mut writer = BufWriter::with_capacity(COPY_BUF, dst_f);
    let bytes = io::copy(&mut reader, &mut writer).map_err(io_err("copy file contents", dst))?;
    io::Write::flush(&mut writer).map_err(io_err("flush destination file", dst))?;
    Ok(bytes)
}

/// Carry the source's permission bits (Unix) and optionally its mtime onto
/// an already-written destination. Best-effort on the mode, strict on the
/// mtime when requested.
pub(super) fn carry_metadata(src: &Path, dst: &Path, preserve_mtime: bool) -> Result<()> {
    let meta = fs::metadata(src).map_err(io_err("stat source file", src))?;

    #[cfg(unix)]
    {
        let _ = fs::set_permissions(dst, meta.permissions());
    }

    if preserve_mtime {
        if let Ok(modified) = meta.modified() {
            filetime::set_file_mtime(dst, filetime::FileTime::from_system_time(modified))
                .map_err(io_err("set destination mtime", dst))?;
        }
    }
    Ok(())
}

/// Copy the directory subtree at `src` into `dst`, creating `dst` and any
/// missing parents. Structure is preserved; empty directories are created.
///
/// Any single child failure is recorded and the remaining siblings are
/// still attempted, so inspect [`BatchReport::all_ok`] for the aggregate
/// verdict. Only precondition and root-level failures surface as `Err`.
pub fn copy_tree(src: &Path, dst: &Path, opts: &Options) -> Result<BatchReport> {
    if !src.is_dir() {
        return Err(UnifsError::NotADirectory {
            op: "copy_tree",
            path: src.to_path_buf(),
        }
        .into());
    }
    fs::create_dir_all(dst).map_err(io_err("create destination directory", dst))?;

    let mut report = BatchReport::new();
    copy_children(src, dst, opts, &mut report)?;
    debug!(
        src = %src.display(),
        dst = %dst.display(),
        copied = report.succeeded(),
        ok = report.all_ok(),
        "copy_tree finished"
    );
    Ok(report)
}

fn copy_children(src: &Path, dst: &Path, opts: &Options, report: &mut BatchReport) -> Result<()> {
    let entries = fs::read_dir(src).map_err(io_err("read source directory", src))?;

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

        let file_type = match fs::symlink_metadata(&child_src) {
            Ok(m) => m.file_type(),
            Err(e) => {
                report.record_failure(&child_src, format!("stat: {e}"));
                continue;
            }
        };

        if file_type.is_symlink() && opts.symlinks == SymlinkPolicy::Preserve {
            match copy_symlink(&child_src, &child_dst) {
                Ok(()) => report.record_ok(&child_src),
                Err(e) => report.record_failure(&child_src, e),
            }
            continue;
        }

        // Under Follow, symlinks fall through and are classified by target.
        if child_src.is_dir() {
            match fs::create_dir_all(&child_dst) {
                Ok(()) => {
                    // Recurse; child failures land in the shared report.
                    if let Err(e) = copy_children(&child_src, &child_dst, opts, report) {
                        report.record_failure(&child_src, e);
                    }
                }
                Err(e) => report.record_failure(&child_src, format!("create directory: {e}")),
            }
        } else {
            match copy_file(&child_src, &child_dst)
                .and_then(|_| carry_metadata(&child_src, &child_dst, opts.preserve_mtimes))
            {
                Ok(()) => report.record_ok(&child_src),
                Err(e) => report.record_failure(&child_src, e),
            }
        }
    }
    Ok(())
}

pub(super) fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src).map_err(io_err("read symlink", src))?;
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&target, dst).map_err(io_err("create symlink", dst))?;
        Ok(())
    }
    #[cfg(not(unix))]
    {
        let _ = target;
        Err(anyhow::anyhow!(
            "preserving symlink '{}' is not supported on this platform",
            dst.display()
        ))
    }
}
