//! Archive serialization: walks a tree depth-first and streams each entry
//! out as a (header, payload) record.
//!
//! A walk or write failure is fatal and leaves a partially-written archive
//! the caller must treat as invalid. The destination archive excludes
//! itself when it happens to live inside the tree being compressed.

use anyhow::{Context, Result, anyhow};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::errors::UnifsError;
use crate::fs_ops::io_err;
use crate::options::{Options, SymlinkPolicy};

use super::{CHUNK, KIND_DIR, KIND_END, KIND_FILE, KIND_SYMLINK, MAGIC};

/// Low-level record sink over a buffered archive file.
struct RecordSink {
    out: BufWriter<File>,
}

impl RecordSink {
    fn create(dest: &Path) -> Result<Self> {
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err("create archive parent", parent))?;
            }
        }
        let file = File::create(dest).map_err(io_err("create archive", dest))?;
        let mut out = BufWriter::new(file);
        out.write_all(MAGIC).map_err(io_err("write archive magic", dest))?;
        Ok(Self { out })
    }

    fn header(&mut self, kind: u8, mode: u32, mtime: i64, rel: &str) -> Result<()> {
        let path_bytes = rel.as_bytes();
        let path_len = u16::try_from(path_bytes.len())
            .map_err(|_| anyhow!("entry path too long for archive: '{rel}'"))?;
        self.out.write_all(&[kind])?;
        self.out.write_all(&mode.to_le_bytes())?;
        self.out.write_all(&mtime.to_le_bytes())?;
        self.out.write_all(&path_len.to_le_bytes())?;
        self.out.write_all(path_bytes)?;
        Ok(())
    }

    fn add_dir(&mut self, rel: &str, mode: u32, mtime: i64) -> Result<()> {
        self.header(KIND_DIR, mode, mtime, rel)
    }

    /// Stream one file's bytes into the archive in fixed-size chunks,
    /// trailing the payload with its CRC32.
    fn add_file(&mut self, rel: &str, mode: u32, mtime: i64, src: &Path) -> Result<()> {
        let mut input = File::open(src).map_err(io_err("open file for archiving", src))?;
        let size = input
            .metadata()
            .map_err(io_err("stat file for archiving", src))?
            .len();

        self.header(KIND_FILE, mode, mtime, rel)?;
        self.out.write_all(&size.to_le_bytes())?;

        let mut hasher = crc32fast::Hasher::new();
        let mut buf = vec![0u8; CHUNK];
        let mut remaining = size;
        while remaining > 0 {
            let want = remaining.min(CHUNK as u64) as usize;
            input
                .read_exact(&mut buf[..want])
                .map_err(io_err("read file for archiving", src))?;
            hasher.update(&buf[..want]);
            self.out.write_all(&buf[..want])?;
            remaining -= want as u64;
        }
        self.out.write_all(&hasher.finalize().to_le_bytes())?;
        Ok(())
    }

    fn add_symlink(&mut self, rel: &str, mode: u32, mtime: i64, target: &Path) -> Result<()> {
        let target = target
            .to_str()
            .ok_or_else(|| anyhow!("symlink target is not valid UTF-8: {}", target.display()))?;
        let target_len = u16::try_from(target.len())
            .map_err(|_| anyhow!("symlink target too long for archive: '{target}'"))?;
        self.header(KIND_SYMLINK, mode, mtime, rel)?;
        self.out.write_all(&target_len.to_le_bytes())?;
        self.out.write_all(target.as_bytes())?;
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.out.write_all(&[KIND_END])?;
        self.out.flush()?;
        Ok(())
    }
}

fn mode_of(meta: &fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode()
    }
    #[cfg(not(unix))]
    {
        if meta.is_dir() { 0o755 } else { 0o644 }
    }
}

fn mtime_of(meta: &fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// The stored path: relative to the walk root, '/'-separated, UTF-8.
fn rel_path_of(root: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(root)
        .with_context(|| format!("entry '{}' outside walk root", path.display()))?;
    let mut out = String::new();
    for comp in rel.components() {
        let part = comp
            .as_os_str()
            .to_str()
            .ok_or_else(|| anyhow!("entry name is not valid UTF-8: {}", path.display()))?;
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(part);
    }
    Ok(out)
}

/// Serialize the directory tree at `src` into a new archive at `dest`.
/// Empty directories are recorded so extraction reproduces them. Returns
/// the number of entries written.
pub fn compress_dir(src: &Path, dest: &Path, opts: &Options) -> Result<u64> {
    if !src.is_dir() {
        return Err(UnifsError::NotADirectory {
            op: "compress_dir",
            path: src.to_path_buf(),
        }
        .into());
    }

    let mut sink = RecordSink::create(dest)?;
    // The archive file now exists; resolve it once so the walk can skip it
    // if it lives inside the tree being compressed.
    let archive_abs: Option<PathBuf> = dunce::canonicalize(dest).ok();

    let mut entries = 0u64;
    let walk = WalkDir::new(src)
        .min_depth(1)
        .follow_links(opts.symlinks == SymlinkPolicy::Follow)
        .sort_by_file_name();

    for entry in walk {
        let entry = entry.with_context(|| format!("walk '{}'", src.display()))?;
        let path = entry.path();

        if let Some(ref archive) = archive_abs {
            if dunce::canonicalize(path).ok().as_deref() == Some(archive) {
                debug!(path = %path.display(), "skipping archive inside its own tree");
                continue;
            }
        }

        let rel = rel_path_of(src, path)?;
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            // Only reachable under Preserve; Follow resolves links upstream.
            let meta =
                fs::symlink_metadata(path).map_err(io_err("stat symlink for archiving", path))?;
            let target = fs::read_link(path).map_err(io_err("read symlink", path))?;
            sink.add_symlink(&rel, mode_of(&meta), mtime_of(&meta), &target)?;
        } else if file_type.is_dir() {
            let meta = entry.metadata().context("read directory metadata")?;
            sink.add_dir(&rel, mode_of(&meta), mtime_of(&meta))?;
        } else {
            let meta = entry.metadata().context("read file metadata")?;
            sink.add_file(&rel, mode_of(&meta), mtime_of(&meta), path)?;
        }
        entries += 1;
    }

    sink.finish()?;
    info!(src = %src.display(), dest = %dest.display(), entries, "compressed directory");
    Ok(entries)
}

/// Archive a single file under its base name.
pub fn compress_file(src: &Path, dest: &Path) -> Result<()> {
    if !src.is_file() {
        return Err(UnifsError::NotAFile {
            op: "compress_file",
            path: src.to_path_buf(),
        }
        .into());
    }
    let name = src
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("source file has no usable name: {}", src.display()))?
        .to_string();

    let meta = fs::metadata(src).map_err(io_err("stat file for archiving", src))?;
    let mut sink = RecordSink::create(dest)?;
    sink.add_file(&name, mode_of(&meta), mtime_of(&meta), src)?;
    sink.finish()?;
    info!(src = %src.display(), dest = %dest.display(), "compressed file");
    Ok(())
}
