//! Directory-structure descriptors.
//!
//! A [`TreeNode`] map describes a directory skeleton: keys are directory
//! names, a [`TreeNode::Leaf`] is an empty directory, a
//! [`TreeNode::Branch`] nests further. `create_tree` materializes the
//! skeleton; `remove_tree` is its inverse and only deletes matched
//! directories that are empty once their described children are gone.

use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::batch::BatchReport;
use crate::errors::UnifsError;
use crate::fs_ops::io_err;
use crate::probe;

#[derive(Debug, Clone)]
pub enum TreeNode {
    /// Just this name, as an empty directory.
    Leaf,
    /// A directory with the described children.
    Branch(BTreeMap<String, TreeNode>),
}

impl TreeNode {
    fn children(&self) -> Option<&BTreeMap<String, TreeNode>> {
        match self {
            TreeNode::Leaf => None,
            TreeNode::Branch(map) => Some(map),
        }
    }
}

/// Create the described directory skeleton under `base`, creating `base`
/// itself if needed.
pub fn create_tree(base: &Path, layout: &BTreeMap<String, TreeNode>) -> Result<()> {
    fs::create_dir_all(base).map_err(io_err("create base directory", base))?;
    for (name, node) in layout {
        let dir = base.join(name);
        fs::create_dir_all(&dir).map_err(io_err("create directory", &dir))?;
        if let Some(children) = node.children() {
            create_tree(&dir, children)?;
        }
    }
    Ok(())
}

/// Remove the described skeleton beneath `base`, post-order: a matched
/// directory is only deleted once its described children are gone and it
/// is empty. Unmatched or still-populated directories are skipped, and
/// missing ones are ignored. Best-effort across siblings.
pub fn remove_tree(base: &Path, layout: &BTreeMap<String, TreeNode>) -> Result<BatchReport> {
    if !probe::is_dir(base) {
        return Err(UnifsError::NotADirectory {
            op: "remove_tree",
            path: base.to_path_buf(),
        }
        .into());
    }

    let mut report = BatchReport::new();
    remove_level(base, layout, &mut report);
    Ok(report)
}

fn remove_level(base: &Path, layout: &BTreeMap<String, TreeNode>, report: &mut BatchReport) {
    for (name, node) in layout {
        let dir = base.join(name);
        if !probe::is_dir(&dir) {
            continue;
        }
        if let Some(children) = node.children() {
            remove_level(&dir, children, report);
        }
        if probe::is_dir_empty(&dir) {
            match fs::remove_dir(&dir) {
                Ok(()) => report.record_ok(&dir),
                Err(e) => report.record_failure(&dir, e),
            }
        }
    }
}
