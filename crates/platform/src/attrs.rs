//! Protective-attribute handling.
//!
//! A "protective attribute" is anything the platform uses to veto deletion
//! that a privileged-enough caller may simply clear: the read-only, hidden,
//! and system attributes on Windows, and missing owner permission bits on
//! Unix (where deletion rights live on the parent directory).

use std::fs;
use std::io;
use std::path::Path;

use crate::error::PlatformError;

/// Strips read-only/hidden/system-equivalent attributes from `path`.
///
/// Symbolic links are left untouched: the link itself carries no attributes
/// worth clearing and the target must never be modified.
pub fn clear_protective_attributes(path: &Path) -> Result<(), PlatformError> {
    imp::clear_protective_attributes(path)
}

/// Reports whether `path` (or its parent directory on Unix) carries
/// attributes that commonly veto deletion. Best-effort; unreadable metadata
/// counts as unprotected.
#[must_use]
pub fn has_protective_attributes(path: &Path) -> bool {
    imp::has_protective_attributes(path)
}

fn attributes_error(path: &Path, source: io::Error) -> PlatformError {
    PlatformError::Attributes {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(unix)]
mod imp {
    use super::{attributes_error, fs, Path, PlatformError};
    use std::os::unix::fs::PermissionsExt;

    pub(super) fn clear_protective_attributes(path: &Path) -> Result<(), PlatformError> {
        let metadata =
            fs::symlink_metadata(path).map_err(|source| attributes_error(path, source))?;
        if metadata.file_type().is_symlink() {
            return Ok(());
        }

        let wanted = if metadata.is_dir() { 0o700 } else { 0o600 };
        let mode = metadata.permissions().mode();
        if mode & wanted == wanted {
            return Ok(());
        }

        tracing::debug!(path = %path.display(), mode, "restoring owner permission bits");
        fs::set_permissions(path, fs::Permissions::from_mode(mode | wanted))
            .map_err(|source| attributes_error(path, source))
    }

    pub(super) fn has_protective_attributes(path: &Path) -> bool {
        let entry_read_only = fs::symlink_metadata(path).is_ok_and(|metadata| {
            !metadata.file_type().is_symlink() && metadata.permissions().mode() & 0o200 == 0
        });
        let parent_unwritable = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .and_then(|parent| fs::symlink_metadata(parent).ok())
            .is_some_and(|metadata| metadata.permissions().mode() & 0o200 == 0);
        entry_read_only || parent_unwritable
    }
}

#[cfg(windows)]
mod imp {
    use super::{attributes_error, Path, PlatformError};
    use crate::win::to_wide;
    use std::io;
    use windows_sys::Win32::Storage::FileSystem::{
        FILE_ATTRIBUTE_HIDDEN, FILE_ATTRIBUTE_READONLY, FILE_ATTRIBUTE_SYSTEM,
        GetFileAttributesW, INVALID_FILE_ATTRIBUTES, SetFileAttributesW,
    };

    const PROTECTIVE: u32 =
        FILE_ATTRIBUTE_READONLY | FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM;

    pub(super) fn clear_protective_attributes(path: &Path) -> Result<(), PlatformError> {
        let wide = to_wide(path);
        // SAFETY: `wide` is a valid, NUL-terminated UTF-16 buffer that
        // outlives both calls.
        let attributes = unsafe { GetFileAttributesW(wide.as_ptr()) };
        if attributes == INVALID_FILE_ATTRIBUTES {
            return Err(attributes_error(path, io::Error::last_os_error()));
        }
        if attributes & PROTECTIVE == 0 {
            return Ok(());
        }

        tracing::debug!(path = %path.display(), attributes, "clearing protective attributes");
        // SAFETY: same buffer as above.
        let cleared = unsafe { SetFileAttributesW(wide.as_ptr(), attributes & !PROTECTIVE) };
        if cleared == 0 {
            return Err(attributes_error(path, io::Error::last_os_error()));
        }
        Ok(())
    }

    pub(super) fn has_protective_attributes(path: &Path) -> bool {
        let wide = to_wide(path);
        // SAFETY: valid NUL-terminated buffer.
        let attributes = unsafe { GetFileAttributesW(wide.as_ptr()) };
        attributes != INVALID_FILE_ATTRIBUTES && attributes & PROTECTIVE != 0
    }
}
