//! Filesystem operations: modularized.

mod backup;
mod copy_tree;
mod dir_move;
mod file_move;
mod helpers;
mod merge;
mod remove;

pub use backup::{
    BACKUP_SUFFIX, backup_path, delete_with_backup, move_with_backup, remove_file_with_backup,
};
pub use copy_tree::{copy_file, copy_tree};
pub use dir_move::{move_dir, move_dir_if_empty, move_dir_if_exists, rename_dir};
pub use file_move::{move_file, move_file_if_empty, move_file_if_exists, rename_file};
pub use merge::merge_into;
pub use remove::{
    remove_all_links, remove_by_pattern, remove_dir, remove_dir_contents, remove_dir_recursive,
    remove_empty_dirs, remove_empty_files, remove_file, remove_symlink, safe_remove_file,
};

pub(crate) use helpers::io_err;
