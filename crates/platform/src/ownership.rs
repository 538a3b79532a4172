//! Best-effort ownership takeover.
//!
//! Failure here is advisory: later deletion strategies may still succeed, so
//! callers log the error and continue rather than aborting the task.

use std::io;
use std::path::Path;

use crate::error::PlatformError;

/// Reassigns ownership of `path` to the current security principal.
///
/// On Unix the entry is `lchown`ed to the effective uid/gid (the link
/// itself, never its target). On Windows the `takeown`/`icacls` pair grants
/// the Everyone group full control, matching the behaviour of manual
/// recovery.
pub fn take_ownership(path: &Path) -> Result<(), PlatformError> {
    imp::take_ownership(path)
}

fn ownership_error(path: &Path, source: io::Error) -> PlatformError {
    PlatformError::Ownership {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
mod imp {
    use super::{io, ownership_error, Path, PlatformError};
    use rustix::fs::{AtFlags, CWD, chownat};
    use rustix::process::{getegid, geteuid};

    pub(super) fn take_ownership(path: &Path) -> Result<(), PlatformError> {
        // SYMLINK_NOFOLLOW: chown the link itself, never its target.
        chownat(
            CWD,
            path,
            Some(geteuid()),
            Some(getegid()),
            AtFlags::SYMLINK_NOFOLLOW,
        )
        .map_err(|errno| ownership_error(path, io::Error::from(errno)))
    }
}

#[cfg(windows)]
mod imp {
    use super::{ownership_error, Path, PlatformError};
    use std::io;
    use std::process::Command;

    pub(super) fn take_ownership(path: &Path) -> Result<(), PlatformError> {
        let takeown = Command::new("takeown")
            .arg("/f")
            .arg(path)
            .output()
            .map_err(|source| ownership_error(path, source))?;
        if !takeown.status.success() {
            return Err(ownership_error(
                path,
                io::Error::other(format!("takeown exited with {}", takeown.status)),
            ));
        }

        let icacls = Command::new("icacls")
            .arg(path)
            .args(["/grant", "Everyone:F", "/c", "/q"])
            .output()
            .map_err(|source| ownership_error(path, source))?;
        if icacls.status.success() {
            Ok(())
        } else {
            Err(ownership_error(
                path,
                io::Error::other(format!("icacls exited with {}", icacls.status)),
            ))
        }
    }
}
