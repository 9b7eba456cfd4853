//! Streaming archive container.
//!
//! An archive is an 8-byte magic followed by an ordered sequence of
//! records and a one-byte end marker. Each record is a fixed little-endian
//! header plus, for files, the raw payload and a CRC32 trailer:
//!
//! ```text
//! kind: u8            0 = directory, 1 = file, 2 = symlink, 0xFF = end
//! mode: u32           permission bits (0 when unknown)
//! mtime: i64          seconds since the Unix epoch (0 when unknown)
//! path_len: u16       length of the UTF-8, '/'-separated relative path
//! path: [u8]
//! file only:  size: u64, payload: [u8; size], crc32: u32
//! symlink:    target_len: u16, target: [u8]
//! ```
//!
//! Paths are stored relative to the compression root, so an archive is
//! relocatable: extraction joins each path to whatever destination root the
//! caller picks, and rejects any record that would resolve outside it.

mod reader;
mod writer;

pub use reader::{extract_archive, list_archive};
pub use writer::{compress_dir, compress_file};

pub(crate) const MAGIC: &[u8; 8] = b"UNIFSAR1";
pub(crate) const CHUNK: usize = 64 * 1024;

pub(crate) const KIND_DIR: u8 = 0;
pub(crate) const KIND_FILE: u8 = 1;
pub(crate) const KIND_SYMLINK: u8 = 2;
pub(crate) const KIND_END: u8 = 0xFF;

/// Entry kind as stored in a record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Dir,
    File,
    Symlink,
}

/// Metadata of one archived entry, as returned by [`list_archive`].
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// `/`-separated path relative to the archive root.
    pub path: String,
    pub kind: RecordKind,
    /// Payload byte length; zero for directories and symlinks.
    pub size: u64,
    pub mode: u32,
}
