//! Registration with the operating system's deletion-at-restart facility.

use std::path::Path;

use crate::error::PlatformError;

/// Schedules `path` for removal at the next system restart.
///
/// On Windows this registers the path with `MoveFileExW` and the
/// delay-until-reboot flag; the OS owns the eventual removal and this crate
/// keeps no record of the registration. Unix has no equivalent facility and
/// reports [`PlatformError::Unsupported`].
pub fn defer_until_reboot(path: &Path) -> Result<(), PlatformError> {
    imp::defer_until_reboot(path)
}

#[cfg(windows)]
mod imp {
    use super::{Path, PlatformError};
    use crate::win::to_wide;
    use std::io;
    use std::ptr;
    use windows_sys::Win32::Storage::FileSystem::{
        MOVEFILE_DELAY_UNTIL_REBOOT, MoveFileExW,
    };

    pub(super) fn defer_until_reboot(path: &Path) -> Result<(), PlatformError> {
        let wide = to_wide(path);
        // SAFETY: `wide` is a valid NUL-terminated UTF-16 buffer; a null
        // target with the delay flag requests deletion at restart.
        let registered =
            unsafe { MoveFileExW(wide.as_ptr(), ptr::null(), MOVEFILE_DELAY_UNTIL_REBOOT) };
        if registered == 0 {
            return Err(PlatformError::Defer {
                path: path.to_path_buf(),
                source: io::Error::last_os_error(),
            });
        }
        tracing::debug!(path = %path.display(), "registered for deletion at next restart");
        Ok(())
    }
}

#[cfg(not(windows))]
mod imp {
    use super::{Path, PlatformError};

    pub(super) fn defer_until_reboot(_path: &Path) -> Result<(), PlatformError> {
        Err(PlatformError::Unsupported)
    }
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;

    #[test]
    fn unix_reports_unsupported() {
        let error = defer_until_reboot(Path::new("/tmp/anything")).expect_err("unsupported");
        assert!(matches!(error, PlatformError::Unsupported));
    }
}
