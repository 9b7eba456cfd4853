//! Archive parsing and re-materialization.
//!
//! Extraction aborts on the first bad record; there is no partial-
//! extraction continuation. Every target path is validated to stay inside
//! the requested destination root before anything is written (the
//! zip-slip defense).

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::info;

use crate::errors::UnifsError;
use crate::fs_ops::io_err;
use crate::options::Options;

use super::{ArchiveEntry, CHUNK, KIND_DIR, KIND_END, KIND_FILE, KIND_SYMLINK, MAGIC, RecordKind};

/// One parsed record header; file payloads are consumed separately so they
/// can stream.
enum Record {
    Dir {
        path: String,
        mode: u32,
    },
    File {
        path: String,
        mode: u32,
        mtime: i64,
        size: u64,
    },
    Symlink {
        path: String,
        target: String,
        mode: u32,
    },
}

struct RecordSource {
    input: BufReader<File>,
}

impl RecordSource {
    fn open(archive: &Path) -> Result<Self> {
        let file = File::open(archive).map_err(io_err("open archive", archive))?;
        let mut input = BufReader::new(file);
        let mut magic = [0u8; 8];
        input
            .read_exact(&mut magic)
            .map_err(|_| UnifsError::Malformed {
                reason: "archive shorter than its magic".into(),
            })?;
        if &magic != MAGIC {
            return Err(UnifsError::Malformed {
                reason: "bad magic; not a unifs archive".into(),
            }
            .into());
        }
        Ok(Self { input })
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut b = [0u8; 2];
        self.input.read_exact(&mut b).context("truncated archive")?;
        Ok(u16::from_le_bytes(b))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.input.read_exact(&mut b).context("truncated archive")?;
        Ok(u32::from_le_bytes(b))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut b = [0u8; 8];
        self.input.read_exact(&mut b).context("truncated archive")?;
        Ok(u64::from_le_bytes(b))
    }

    fn read_string(&mut self, len: usize) -> Result<String> {
        let mut buf = vec![0u8; len];
        self.input
            .read_exact(&mut buf)
            .context("truncated archive")?;
        String::from_utf8(buf).map_err(|_| {
            UnifsError::Malformed {
                reason: "record path is not valid UTF-8".into(),
            }
            .into()
        })
    }

    /// Next record header, or `None` at the end marker.
    fn next(&mut self) -> Result<Option<Record>> {
        let mut kind = [0u8; 1];
        self.input
            .read_exact(&mut kind)
            .map_err(|_| UnifsError::Malformed {
                reason: "archive ended without an end marker".into(),
            })?;
        if kind[0] == KIND_END {
            return Ok(None);
        }

        let mode = self.read_u32()?;
        let mtime = self.read_u64()? as i64;
        let path_len = self.read_u16()? as usize;
        let path = self.read_string(path_len)?;

        match kind[0] {
            KIND_DIR => Ok(Some(Record::Dir { path, mode })),
            KIND_FILE => {
                let size = self.read_u64()?;
                Ok(Some(Record::File {
                    path,
                    mode,
                    mtime,
                    size,
                }))
            }
            KIND_SYMLINK => {
                let target_len = self.read_u16()? as usize;
                let target = self.read_string(target_len)?;
                Ok(Some(Record::Symlink { path, target, mode }))
            }
            other => Err(UnifsError::Malformed {
                reason: format!("unknown record kind {other:#x}"),
            }
            .into()),
        }
    }

    /// Stream a file payload into `out` in fixed-size chunks and check the
    /// CRC32 trailer.
    fn stream_payload(&mut self, size: u64, out: &mut impl Write) -> Result<()> {
        let mut hasher = crc32fast::Hasher::new();
        let mut buf = vec![0u8; CHUNK];
        let mut remaining = size;
        while remaining > 0 {
            let want = remaining.min(CHUNK as u64) as usize;
            self.input
                .read_exact(&mut buf[..want])
                .context("truncated file payload")?;
            hasher.update(&buf[..want]);
            out.write_all(&buf[..want]).context("write extracted file")?;
            remaining -= want as u64;
        }
        let stored = self.read_u32()?;
        if hasher.finalize() != stored {
            return Err(UnifsError::Malformed {
                reason: "file payload failed its CRC check".into(),
            }
            .into());
        }
        Ok(())
    }

    fn skip_payload(&mut self, size: u64) -> Result<()> {
        // size comes straight from the header; treat it as hostile.
        let span = size.checked_add(4).ok_or_else(|| UnifsError::Malformed {
            reason: "declared payload size overflows".into(),
        })?;
        let skipped = std::io::copy(&mut (&mut self.input).take(span), &mut std::io::sink())
            .context("skip file payload")?;
        if skipped != span {
            return Err(UnifsError::Malformed {
                reason: "truncated file payload".into(),
            }
            .into());
        }
        Ok(())
    }
}

/// Join a stored relative path to the extraction root, refusing anything
/// that could land outside it: absolute paths, drive prefixes, `.`/`..`
/// components.
fn resolve_entry_path(root: &Path, rel: &str) -> Result<PathBuf> {
    let traversal = || UnifsError::PathTraversal {
        entry: rel.to_string(),
        root: root.to_path_buf(),
    };

    if rel.is_empty() {
        return Err(traversal().into());
    }
    let mut out = root.to_path_buf();
    for comp in Path::new(rel).components() {
        match comp {
            Component::Normal(part) => out.push(part),
            _ => return Err(traversal().into()),
        }
    }
    Ok(out)
}

/// The lexical check above cannot see symlinks already on disk, including
/// ones planted by an earlier record of the same archive. Re-resolve the
/// deepest existing ancestor of `target` and require it to still sit under
/// the extraction root before anything is written beneath it.
fn confine_to_root(root: &Path, target: &Path, entry: &str) -> Result<()> {
    let mut ancestor = target.parent().unwrap_or(root);
    while fs::symlink_metadata(ancestor).is_err() {
        match ancestor.parent() {
            Some(up) => ancestor = up,
            None => break,
        }
    }
    let resolved =
        dunce::canonicalize(ancestor).map_err(io_err("resolve extraction parent", ancestor))?;
    if !resolved.starts_with(root) {
        return Err(UnifsError::PathTraversal {
            entry: entry.to_string(),
            root: root.to_path_buf(),
        }
        .into());
    }
    Ok(())
}

/// A symlink squatting on the target slot would redirect the write through
/// itself; drop it so the entry lands as a real file or directory.
fn clear_link_slot(target: &Path) -> Result<()> {
    if let Ok(meta) = fs::symlink_metadata(target) {
        if meta.file_type().is_symlink() {
            fs::remove_file(target).map_err(io_err("replace existing entry", target))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777));
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) {}

/// Re-materialize an archive under `dest_root`, creating the root if
/// needed. Returns the number of entries extracted.
///
/// Any record failure, including the path-traversal check, aborts the
/// whole extraction; already-extracted entries are left behind.
pub fn extract_archive(archive: &Path, dest_root: &Path, opts: &Options) -> Result<u64> {
    if !archive.is_file() {
        return Err(UnifsError::NotAFile {
            op: "extract_archive",
            path: archive.to_path_buf(),
        }
        .into());
    }
    fs::create_dir_all(dest_root).map_err(io_err("create extraction root", dest_root))?;
    let root = dunce::canonicalize(dest_root)
        .map_err(io_err("resolve extraction root", dest_root))?;

    let mut source = RecordSource::open(archive)?;
    let mut entries = 0u64;

    while let Some(record) = source.next()? {
        match record {
            Record::Dir { path, mode } => {
                let target = resolve_entry_path(&root, &path)?;
                confine_to_root(&root, &target, &path)?;
                clear_link_slot(&target)?;
                fs::create_dir_all(&target).map_err(io_err("create directory", &target))?;
                apply_mode(&target, mode);
            }
            Record::File {
                path,
                mode,
                mtime,
                size,
            } => {
                let target = resolve_entry_path(&root, &path)?;
                confine_to_root(&root, &target, &path)?;
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(io_err("create parent directory", parent))?;
                }
                clear_link_slot(&target)?;
                let mut out = OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(true)
                    .open(&target)
                    .map_err(io_err("create extracted file", &target))?;
                source.stream_payload(size, &mut out)?;
                drop(out);
                apply_mode(&target, mode);
                if opts.preserve_mtimes && mtime > 0 {
                    let _ = filetime::set_file_mtime(
                        &target,
                        filetime::FileTime::from_unix_time(mtime, 0),
                    );
                }
            }
            Record::Symlink { path, target, .. } => {
                let link = resolve_entry_path(&root, &path)?;
                confine_to_root(&root, &link, &path)?;
                if let Some(parent) = link.parent() {
                    fs::create_dir_all(parent).map_err(io_err("create parent directory", parent))?;
                }
                place_symlink(&target, &link)?;
            }
        }
        entries += 1;
    }

    info!(archive = %archive.display(), root = %root.display(), entries, "extracted archive");
    Ok(entries)
}

#[cfg(unix)]
fn place_symlink(target: &str, link: &Path) -> Result<()> {
    if fs::symlink_metadata(link).is_ok() {
        fs::remove_file(link).map_err(io_err("replace existing entry", link))?;
    }
    std::os::unix::fs::symlink(target, link).map_err(io_err("create symlink", link))?;
    Ok(())
}

#[cfg(not(unix))]
fn place_symlink(_target: &str, link: &Path) -> Result<()> {
    Err(anyhow::anyhow!(
        "cannot materialize symlink record '{}' on this platform",
        link.display()
    ))
}

/// Read entry metadata without extracting anything.
pub fn list_archive(archive: &Path) -> Result<Vec<ArchiveEntry>> {
    let mut source = RecordSource::open(archive)?;
    let mut out = Vec::new();

    while let Some(record) = source.next()? {
        match record {
            Record::Dir { path, mode } => out.push(ArchiveEntry {
                path,
                kind: RecordKind::Dir,
                size: 0,
                mode,
            }),
            Record::File {
                path, mode, size, ..
            } => {
                source.skip_payload(size)?;
                out.push(ArchiveEntry {
                    path,
                    kind: RecordKind::File,
                    size,
                    mode,
                });
            }
            Record::Symlink { path, mode, .. } => out.push(ArchiveEntry {
                path,
                kind: RecordKind::Symlink,
                size: 0,
                mode,
            }),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_accepts_nested_relative_paths() {
        let root = Path::new("/out");
        assert_eq!(
            resolve_entry_path(root, "a/b/c.txt").unwrap(),
            PathBuf::from("/out/a/b/c.txt")
        );
    }

    #[test]
    fn resolve_rejects_parent_escapes() {
        let root = Path::new("/out");
        for bad in ["../evil.txt", "a/../../evil.txt", "..", "a/b/../../../x"] {
            let err = resolve_entry_path(root, bad).unwrap_err();
            assert!(
                matches!(
                    err.downcast_ref::<UnifsError>(),
                    Some(UnifsError::PathTraversal { .. })
                ),
                "expected traversal rejection for {bad:?}"
            );
        }
    }

    #[test]
    fn resolve_rejects_absolute_and_empty() {
        let root = Path::new("/out");
        assert!(resolve_entry_path(root, "/etc/passwd").is_err());
        assert!(resolve_entry_path(root, "").is_err());
    }

    #[test]
    fn resolve_rejects_current_dir_components() {
        let root = Path::new("/out");
        assert!(resolve_entry_path(root, "./x").is_err());
    }
}
