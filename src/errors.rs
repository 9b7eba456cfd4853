//! Typed error definitions for unifs.
//! Provides a small set of well-known failure modes for better logs and tests.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnifsError {
    #[error("{op}: expected a file at {path}")]
    NotAFile { op: &'static str, path: PathBuf },

    #[error("{op}: expected a directory at {path}")]
    NotADirectory { op: &'static str, path: PathBuf },

    #[error("{op}: {path} is not empty")]
    NotEmpty { op: &'static str, path: PathBuf },

    #[error("{op}: destination {path} exists with a conflicting kind")]
    KindConflict { op: &'static str, path: PathBuf },

    #[error("archive entry '{entry}' would escape extraction root {root}")]
    PathTraversal { entry: String, root: PathBuf },

    #[error("source removal failed after copy; data may exist at both {src} and {dst}")]
    DuplicateRisk { src: PathBuf, dst: PathBuf },

    #[error("{op}: {path} did not match the expected {what}; refusing to delete")]
    SafetyMismatch {
        op: &'static str,
        path: PathBuf,
        what: &'static str,
    },

    #[error("invalid archive: {reason}")]
    Malformed { reason: String },
}
