//! Failure taxonomy for deletion attempts.
//!
//! Raw [`std::io::Error`] values carry platform-specific codes that the
//! strategy chain cannot branch on portably. [`classify`] folds them into
//! [`ErrorKind`], a small closed set the engine reasons about: whether to
//! retry, escalate, or give up. [`EngineError`] covers the handful of
//! failures that abort a run outright rather than failing a single task.

use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use platform::PlatformError;

/// Classified cause of a failed deletion attempt.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// The path does not exist. Treated as success by the strategy chain.
    NotFound,
    /// Access denied by permissions on the entry or its parent.
    PermissionDenied,
    /// The entry is held open or mapped by another process.
    Locked,
    /// The path exceeds the platform's length limit.
    PathTooLong,
    /// A permission failure traced back to protective attribute or mode
    /// bits on the entry or its parent.
    AttributeProtected,
    /// The operation requires ownership the caller does not hold.
    OwnershipDenied,
    /// The task exhausted its time budget.
    Timeout,
    /// Any other failure, carrying the raw OS error code when known.
    Unknown(i32),
}

impl ErrorKind {
    /// Returns `true` for [`ErrorKind::NotFound`].
    #[must_use]
    pub const fn is_not_found(self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("path not found"),
            Self::PermissionDenied => f.write_str("permission denied"),
            Self::Locked => f.write_str("held open by another process"),
            Self::PathTooLong => f.write_str("path exceeds platform limit"),
            Self::AttributeProtected => f.write_str("blocked by protective attributes"),
            Self::OwnershipDenied => f.write_str("ownership required"),
            Self::Timeout => f.write_str("task time budget exhausted"),
            Self::Unknown(code) => write!(f, "unclassified OS error {code}"),
        }
    }
}

/// Folds an I/O error into the engine's failure taxonomy.
#[must_use]
pub fn classify(error: &io::Error) -> ErrorKind {
    match error.kind() {
        io::ErrorKind::NotFound => return ErrorKind::NotFound,
        io::ErrorKind::TimedOut => return ErrorKind::Timeout,
        io::ErrorKind::ResourceBusy => return ErrorKind::Locked,
        io::ErrorKind::InvalidFilename => return ErrorKind::PathTooLong,
        _ => {}
    }

    if let Some(code) = error.raw_os_error() {
        return classify_os_code(code);
    }
    if error.kind() == io::ErrorKind::PermissionDenied {
        return ErrorKind::PermissionDenied;
    }
    ErrorKind::Unknown(-1)
}

#[cfg(unix)]
fn classify_os_code(code: i32) -> ErrorKind {
    match code {
        libc::ENOENT => ErrorKind::NotFound,
        libc::EACCES => ErrorKind::PermissionDenied,
        libc::EPERM => ErrorKind::OwnershipDenied,
        libc::EBUSY | libc::ETXTBSY => ErrorKind::Locked,
        libc::ENAMETOOLONG => ErrorKind::PathTooLong,
        libc::ETIMEDOUT => ErrorKind::Timeout,
        _ => ErrorKind::Unknown(code),
    }
}

#[cfg(windows)]
fn classify_os_code(code: i32) -> ErrorKind {
    // ERROR_FILE_NOT_FOUND / ERROR_PATH_NOT_FOUND, ERROR_ACCESS_DENIED,
    // ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION, ERROR_FILENAME_EXCED_RANGE.
    match code {
        2 | 3 => ErrorKind::NotFound,
        5 => ErrorKind::PermissionDenied,
        32 | 33 => ErrorKind::Locked,
        206 => ErrorKind::PathTooLong,
        _ => ErrorKind::Unknown(code),
    }
}

/// Like [`classify`], but upgrades permission failures to
/// [`ErrorKind::AttributeProtected`] when protective bits on the entry or
/// its parent explain the denial. Attribute protection has a dedicated
/// recovery strategy; plain permission failures do not.
#[must_use]
pub fn classify_for_path(error: &io::Error, path: &Path) -> ErrorKind {
    match classify(error) {
        kind @ (ErrorKind::PermissionDenied | ErrorKind::OwnershipDenied) => {
            if platform::has_protective_attributes(path) {
                ErrorKind::AttributeProtected
            } else {
                kind
            }
        }
        other => other,
    }
}

/// Maps a platform-layer failure into the taxonomy.
pub(crate) fn classify_platform(error: &PlatformError, path: &Path) -> ErrorKind {
    if let Some(io_error) = error.io_source() {
        return classify_for_path(io_error, path);
    }
    match error {
        PlatformError::ElevatedTimeout { .. } | PlatformError::TerminateTimeout { .. } => {
            ErrorKind::Timeout
        }
        PlatformError::ElevatedStatus { code, .. } => ErrorKind::Unknown(code.unwrap_or(-1)),
        _ => ErrorKind::Unknown(error.os_code().unwrap_or(-1)),
    }
}

/// Failure that aborts an entire deletion run.
///
/// Per-entry failures never surface here; they are recorded in the report's
/// task results instead.
#[derive(Debug)]
#[non_exhaustive]
pub enum EngineError {
    /// The requested root is not a deletable target.
    InvalidRoot {
        /// The rejected path.
        path: PathBuf,
        /// Human-readable rejection reason.
        reason: &'static str,
    },
    /// The run was cancelled before any entry was processed.
    Cancelled,
    /// Enumeration of the root failed before any task could be planned.
    Walk(walk::WalkError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRoot { path, reason } => {
                write!(f, "invalid deletion root {}: {reason}", path.display())
            }
            Self::Cancelled => f.write_str("deletion cancelled before it started"),
            Self::Walk(error) => write!(f, "failed to enumerate deletion root: {error}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Walk(error) => Some(error),
            Self::InvalidRoot { .. } | Self::Cancelled => None,
        }
    }
}

impl From<walk::WalkError> for EngineError {
    fn from(error: walk::WalkError) -> Self {
        Self::Walk(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_classified() {
        let error = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(classify(&error), ErrorKind::NotFound);
        assert!(classify(&error).is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn unix_codes_map_to_taxonomy() {
        assert_eq!(
            classify(&io::Error::from_raw_os_error(libc::EACCES)),
            ErrorKind::PermissionDenied
        );
        assert_eq!(
            classify(&io::Error::from_raw_os_error(libc::EPERM)),
            ErrorKind::OwnershipDenied
        );
        assert_eq!(
            classify(&io::Error::from_raw_os_error(libc::EBUSY)),
            ErrorKind::Locked
        );
        assert_eq!(
            classify(&io::Error::from_raw_os_error(libc::ENAMETOOLONG)),
            ErrorKind::PathTooLong
        );
    }

    #[test]
    fn unrecognized_code_is_preserved() {
        let error = io::Error::from_raw_os_error(9999);
        assert_eq!(classify(&error), ErrorKind::Unknown(9999));
    }

    #[cfg(unix)]
    #[test]
    fn permission_failure_without_protective_bits_stays_permission() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("writable.txt");
        std::fs::write(&path, b"x").expect("write");

        let error = io::Error::from_raw_os_error(libc::EACCES);
        assert_eq!(classify_for_path(&error, &path), ErrorKind::PermissionDenied);
    }

    #[cfg(unix)]
    #[test]
    fn permission_failure_with_readonly_entry_is_attribute_protected() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("readonly.txt");
        std::fs::write(&path, b"x").expect("write");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o400)).expect("chmod");

        let error = io::Error::from_raw_os_error(libc::EACCES);
        assert_eq!(classify_for_path(&error, &path), ErrorKind::AttributeProtected);
    }

    #[test]
    fn engine_error_display_names_the_root() {
        let error = EngineError::InvalidRoot {
            path: PathBuf::from("/"),
            reason: "refusing to delete a filesystem root",
        };
        let rendered = error.to_string();
        assert!(rendered.contains('/'));
        assert!(rendered.contains("refusing"));
    }
}
