//! Per-call configuration.
//!
//! There is no process-wide default instance; operations that vary by policy
//! take an explicit `&Options`, and `Options::DEFAULT` exists for call-site
//! ergonomics.

/// How symlinks encountered during a walk (copy, archive) are handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SymlinkPolicy {
    /// Re-create the link itself; the target is never read. Safe against
    /// link cycles and links that point outside the source root.
    #[default]
    Preserve,
    /// Dereference the link and treat the target as a regular file or
    /// directory.
    Follow,
}

#[derive(Clone, Copy, Debug)]
pub struct Options {
    pub symlinks: SymlinkPolicy,
    /// Carry source modification times onto copied/extracted files.
    pub preserve_mtimes: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Options {
    pub const DEFAULT: Options = Options {
        symlinks: SymlinkPolicy::Preserve,
        preserve_mtimes: true,
    };

    pub fn follow_symlinks(mut self) -> Self {
        self.symlinks = SymlinkPolicy::Follow;
        self
    }
}
