//! Small Windows-only helpers shared across modules.

use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::path::Path;

/// Encodes `path` as a NUL-terminated UTF-16 buffer for Win32 calls.
pub(crate) fn to_wide(path: &Path) -> Vec<u16> {
    OsStr::new(path)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}
