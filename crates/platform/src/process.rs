//! Discovery and termination of processes holding a path open.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use crate::error::PlatformError;

/// Best-effort enumeration of processes with an open handle to `path`.
///
/// On Linux this scans `/proc/*/fd`; on platforms without an equivalent
/// facility the set is empty, which callers treat as "nothing to break".
/// The current process is never reported.
#[must_use]
pub fn find_locking_processes(path: &Path) -> BTreeSet<u32> {
    imp::find_locking_processes(path)
}

/// Requests graceful termination of `pid`, escalating to forced termination
/// if the process does not exit within `grace`.
pub fn terminate(pid: u32, grace: Duration) -> Result<(), PlatformError> {
    imp::terminate(pid, grace)
}

#[cfg(unix)]
mod imp {
    use super::{BTreeSet, Duration, Path, PlatformError};
    use std::io;
    use std::thread;
    use std::time::Instant;

    use rustix::io::Errno;
    use rustix::process::{Pid, Signal, kill_process, test_kill_process};

    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    #[cfg(target_os = "linux")]
    pub(super) fn find_locking_processes(path: &Path) -> BTreeSet<u32> {
        use std::fs;

        let mut holders = BTreeSet::new();
        let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let own_pid = std::process::id();

        let Ok(proc_entries) = fs::read_dir("/proc") else {
            return holders;
        };
        for entry in proc_entries.flatten() {
            let name = entry.file_name();
            let Some(pid) = name.to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };
            if pid == own_pid {
                continue;
            }
            let fd_dir = entry.path().join("fd");
            let Ok(fds) = fs::read_dir(&fd_dir) else {
                continue;
            };
            for fd in fds.flatten() {
                if let Ok(open_path) = fs::read_link(fd.path()) {
                    if open_path == target || open_path.starts_with(&target) {
                        holders.insert(pid);
                        break;
                    }
                }
            }
        }
        holders
    }

    #[cfg(not(target_os = "linux"))]
    pub(super) fn find_locking_processes(_path: &Path) -> BTreeSet<u32> {
        BTreeSet::new()
    }

    fn to_pid(pid: u32) -> Option<Pid> {
        i32::try_from(pid).ok().and_then(Pid::from_raw)
    }

    fn process_gone(pid: u32) -> bool {
        match to_pid(pid) {
            Some(target) => matches!(test_kill_process(target), Err(Errno::SRCH)),
            None => false,
        }
    }

    fn send_signal(pid: u32, signal: Signal) -> Result<(), PlatformError> {
        let Some(target) = to_pid(pid) else {
            return Err(PlatformError::Terminate {
                pid,
                source: io::Error::from(io::ErrorKind::InvalidInput),
            });
        };
        match kill_process(target, signal) {
            Ok(()) => Ok(()),
            // Already gone counts as terminated.
            Err(Errno::SRCH) => Ok(()),
            Err(errno) => Err(PlatformError::Terminate {
                pid,
                source: io::Error::from(errno),
            }),
        }
    }

    pub(super) fn terminate(pid: u32, grace: Duration) -> Result<(), PlatformError> {
        tracing::debug!(pid, ?grace, "requesting graceful termination");
        send_signal(pid, Signal::TERM)?;

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if process_gone(pid) {
                return Ok(());
            }
            thread::sleep(POLL_INTERVAL);
        }

        tracing::debug!(pid, "grace period elapsed, escalating to SIGKILL");
        send_signal(pid, Signal::KILL)?;
        thread::sleep(POLL_INTERVAL);
        if process_gone(pid) {
            Ok(())
        } else {
            Err(PlatformError::TerminateTimeout { pid, grace })
        }
    }
}

#[cfg(windows)]
mod imp {
    use super::{BTreeSet, Duration, Path, PlatformError};
    use std::io;
    use windows_sys::Win32::Foundation::CloseHandle;
    use windows_sys::Win32::System::Threading::{
        OpenProcess, PROCESS_TERMINATE, TerminateProcess,
    };

    pub(super) fn find_locking_processes(_path: &Path) -> BTreeSet<u32> {
        // Handle enumeration requires undocumented NT APIs; report nothing.
        BTreeSet::new()
    }

    pub(super) fn terminate(pid: u32, _grace: Duration) -> Result<(), PlatformError> {
        // SAFETY: the returned handle is closed below; a null handle is
        // checked before use.
        let handle = unsafe { OpenProcess(PROCESS_TERMINATE, 0, pid) };
        if handle.is_null() {
            return Err(PlatformError::Terminate {
                pid,
                source: io::Error::last_os_error(),
            });
        }
        // SAFETY: `handle` is a valid process handle with terminate rights.
        let terminated = unsafe { TerminateProcess(handle, 1) };
        // SAFETY: `handle` came from OpenProcess above.
        unsafe { CloseHandle(handle) };
        if terminated == 0 {
            return Err(PlatformError::Terminate {
                pid,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}
