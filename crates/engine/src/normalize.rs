//! Root path validation and normalization.
//!
//! Every path handed to the engine is made absolute and lexically
//! normalized before any filesystem operation runs against it, so that
//! protected-root checks and task planning work on one canonical spelling.

use std::env;
use std::path::{Component, Path, PathBuf};

use crate::error::EngineError;

/// Returns the absolute, lexically normalized form of `path`.
///
/// `.` components are dropped and `..` components resolved without
/// touching the filesystem; symlinks are deliberately not followed, since
/// the engine removes the link itself, never its target. On Windows the
/// result carries the extended-length prefix so deep trees stay deletable.
pub(crate) fn normalize_root(path: &Path) -> Result<PathBuf, EngineError> {
    if path.as_os_str().is_empty() {
        return Err(EngineError::InvalidRoot {
            path: path.to_path_buf(),
            reason: "empty path",
        });
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = env::current_dir().map_err(|_| EngineError::InvalidRoot {
            path: path.to_path_buf(),
            reason: "relative path and no usable working directory",
        })?;
        cwd.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }

    Ok(apply_platform_prefix(normalized))
}

/// Rejects targets whose removal would take the whole filesystem with
/// them: `/`, drive roots, and share roots.
pub(crate) fn ensure_deletable_root(path: &Path) -> Result<(), EngineError> {
    if path.parent().is_none() {
        return Err(EngineError::InvalidRoot {
            path: path.to_path_buf(),
            reason: "refusing to delete a filesystem root",
        });
    }
    Ok(())
}

#[cfg(windows)]
fn apply_platform_prefix(path: PathBuf) -> PathBuf {
    use std::ffi::OsString;

    let raw = path.as_os_str();
    let already_prefixed = raw
        .to_str()
        .is_some_and(|s| s.starts_with(r"\\?\") || s.starts_with(r"\\.\"));
    if already_prefixed {
        return path;
    }
    let mut prefixed = OsString::from(r"\\?\");
    prefixed.push(raw);
    PathBuf::from(prefixed)
}

#[cfg(not(windows))]
fn apply_platform_prefix(path: PathBuf) -> PathBuf {
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_rejected() {
        let error = normalize_root(Path::new("")).expect_err("empty");
        assert!(matches!(error, EngineError::InvalidRoot { .. }));
    }

    #[test]
    fn relative_paths_become_absolute() {
        let normalized = normalize_root(Path::new("some/dir")).expect("normalize");
        assert!(normalized.is_absolute());
    }

    #[cfg(unix)]
    #[test]
    fn dot_and_dotdot_are_resolved() {
        let normalized = normalize_root(Path::new("/a/b/../c/./d")).expect("normalize");
        assert_eq!(normalized, PathBuf::from("/a/c/d"));
    }

    #[cfg(unix)]
    #[test]
    fn filesystem_root_is_refused() {
        let error = ensure_deletable_root(Path::new("/")).expect_err("protected");
        assert!(matches!(
            error,
            EngineError::InvalidRoot {
                reason: "refusing to delete a filesystem root",
                ..
            }
        ));
    }

    #[cfg(unix)]
    #[test]
    fn ordinary_absolute_path_is_deletable() {
        ensure_deletable_root(Path::new("/tmp/scratch")).expect("deletable");
    }
}
