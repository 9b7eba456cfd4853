//! Small adapters that enrich `io::Error` with the operation and path, plus
//! a platform-aware hint where the raw errno suggests one.
//!
//! Usage: `fs::rename(a, b).map_err(io_err("rename file", b))?;`

use anyhow::anyhow;
use std::io;
use std::path::Path;

fn hint_for(e: &io::Error) -> &'static str {
    #[cfg(unix)]
    if let Some(code) = e.raw_os_error() {
        return match code {
            libc::EXDEV => " (cross-filesystem; atomic rename not possible)",
            libc::EACCES | libc::EPERM => " (permission denied; check ownership and write bits)",
            libc::ENOSPC => " (insufficient space on device)",
            libc::ENOTEMPTY => " (directory not empty)",
            _ => "",
        };
    }
    match e.kind() {
        io::ErrorKind::PermissionDenied => " (permission denied)",
        io::ErrorKind::NotFound => " (path not found)",
        io::ErrorKind::AlreadyExists => " (already exists)",
        _ => "",
    }
}

/// Adapter for `.map_err(...)` converting `io::Error` into a contextual
/// `anyhow::Error`.
pub fn io_err<'a>(op: &'a str, path: &'a Path) -> impl FnOnce(io::Error) -> anyhow::Error + 'a {
    move |e: io::Error| anyhow!("{} '{}': {}{}", op, path.display(), e, hint_for(&e))
}

/// True when the error is the Unix cross-device rename errno. Used to pick
/// the warning text before falling back to copy+delete; the fallback itself
/// runs on any rename failure.
pub fn is_cross_device(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        e.raw_os_error() == Some(libc::EXDEV)
    }
    #[cfg(not(unix))]
    {
        // ERROR_NOT_SAME_DEVICE
        e.raw_os_error() == Some(17)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn io_err_carries_op_and_path() {
        let path = PathBuf::from("/tmp/x");
        let e = io_err("open file", &path)(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let msg = format!("{e}");
        assert!(msg.contains("open file"));
        assert!(msg.contains("/tmp/x"));
    }

    #[cfg(unix)]
    #[test]
    fn exdev_is_cross_device() {
        let e = io::Error::from_raw_os_error(libc::EXDEV);
        assert!(is_cross_device(&e));
        let e = io::Error::from_raw_os_error(libc::EACCES);
        assert!(!is_cross_device(&e));
    }
}
