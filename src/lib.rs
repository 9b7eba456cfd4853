//! Core library for `unifs`.
//!
//! A unified facade over primitive file-system operations: path predicates,
//! recursive tree copies, merge-aware moves with cross-device fallback,
//! `.bak` backup management, batch removals, and a streaming archive format
//! with zip-slip protection.
//!
//! Every mutating operation returns a detailed `Result`; callers that only
//! want classic pass/fail ergonomics collapse it at the logging boundary
//! with [`ok_or_logged`]. Operations are synchronous and single-threaded;
//! callers must ensure exclusive access to the subtrees involved for the
//! duration of a call.

pub mod archive;
pub mod batch;
pub mod errors;
pub mod fs_ops;
pub mod options;
pub mod probe;
pub mod tree;

pub use archive::{
    ArchiveEntry, RecordKind, compress_dir, compress_file, extract_archive, list_archive,
};
pub use batch::{BatchReport, ItemOutcome};
pub use errors::UnifsError;
pub use fs_ops::{
    BACKUP_SUFFIX, backup_path, copy_file, copy_tree, delete_with_backup, merge_into, move_dir,
    move_dir_if_empty, move_dir_if_exists, move_file, move_file_if_empty, move_file_if_exists,
    move_with_backup, remove_all_links, remove_by_pattern, remove_dir, remove_dir_contents,
    remove_dir_recursive, remove_empty_dirs, remove_empty_files, remove_file,
    remove_file_with_backup, remove_symlink, rename_dir, rename_file, safe_remove_file,
};
pub use options::{Options, SymlinkPolicy};
pub use probe::{
    PathStat, is_dir, is_dir_empty, is_empty, is_file, is_file_empty, list_children, path_exists,
    stat, try_stat,
};
pub use tree::{TreeNode, create_tree, remove_tree};

use tracing::warn;

/// Collapse a detailed result into the boolean fast path.
///
/// Errors are logged with the operation tag and swallowed; the caller only
/// sees `true`/`false`. This is the single logging boundary between the
/// `Result` API and the ergonomic boolean one.
pub fn ok_or_logged<T>(op: &str, res: anyhow::Result<T>) -> bool {
    match res {
        Ok(_) => true,
        Err(e) => {
            warn!(op, error = %e, "operation failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn ok_or_logged_collapses_both_ways() {
        assert!(ok_or_logged("noop", Ok::<_, anyhow::Error>(42)));
        assert!(!ok_or_logged("noop", Err::<(), _>(anyhow!("boom"))));
    }
}
