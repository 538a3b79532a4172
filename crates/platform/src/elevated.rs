//! Elevated-shell removal fallback.
//!
//! Last resort before giving up on live deletion: a recursive ownership and
//! permission takeover followed by the platform's forced recursive removal
//! command, all bounded by a hard timeout so a wedged child cannot stall a
//! worker indefinitely.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::PlatformError;

const WAIT_POLL: Duration = Duration::from_millis(25);

/// Removes `path` (file or subtree) via the elevated shell fallback.
///
/// A path that is already gone when the command finishes counts as success
/// regardless of the command's exit status.
pub fn elevated_remove(path: &Path, timeout: Duration) -> Result<(), PlatformError> {
    imp::prepare(path, timeout);

    let mut command = imp::removal_command(path);
    command.stdout(Stdio::null()).stderr(Stdio::null());
    let status = run_with_timeout(&mut command, timeout)
        .map_err(|source| PlatformError::ElevatedSpawn {
            path: path.to_path_buf(),
            source,
        })?
        .ok_or_else(|| PlatformError::ElevatedTimeout {
            path: path.to_path_buf(),
            timeout,
        })?;

    if status.success() || !path.exists() {
        return Ok(());
    }
    Err(PlatformError::ElevatedStatus {
        path: path.to_path_buf(),
        code: status.code(),
    })
}

/// Spawns `command` and waits up to `timeout`; `None` means the child was
/// killed after exceeding the budget.
fn run_with_timeout(command: &mut Command, timeout: Duration) -> io::Result<Option<ExitStatus>> {
    let mut child = command.spawn()?;
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            tracing::warn!(?timeout, "elevated removal exceeded its budget, killing");
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(WAIT_POLL);
    }
}

#[cfg(unix)]
mod imp {
    use super::{Command, Duration, Path, Stdio, run_with_timeout};

    pub(super) fn prepare(path: &Path, timeout: Duration) {
        // Best-effort recursive permission takeover before the removal; a
        // failure here just means rm has to cope on its own.
        let mut chmod = Command::new("chmod");
        chmod
            .args(["-R", "u+rwX", "--"])
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Err(error) = run_with_timeout(&mut chmod, timeout) {
            tracing::debug!(path = %path.display(), %error, "recursive chmod failed");
        }
    }

    pub(super) fn removal_command(path: &Path) -> Command {
        let mut command = Command::new("rm");
        command.args(["-rf", "--"]).arg(path);
        command
    }
}

#[cfg(windows)]
mod imp {
    use super::{Command, Duration, Path, Stdio, run_with_timeout};

    pub(super) fn prepare(path: &Path, timeout: Duration) {
        let mut takeown = Command::new("takeown");
        takeown
            .arg("/f")
            .arg(path)
            .args(["/r", "/d", "y"])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Err(error) = run_with_timeout(&mut takeown, timeout) {
            tracing::debug!(path = %path.display(), %error, "recursive takeown failed");
        }

        let mut icacls = Command::new("icacls");
        icacls
            .arg(path)
            .args(["/grant", "Everyone:F", "/t", "/c", "/q"])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Err(error) = run_with_timeout(&mut icacls, timeout) {
            tracing::debug!(path = %path.display(), %error, "recursive icacls failed");
        }
    }

    pub(super) fn removal_command(path: &Path) -> Command {
        let mut command = Command::new("cmd");
        if path.is_dir() {
            command.args(["/c", "rd", "/s", "/q"]).arg(path);
        } else {
            command.args(["/c", "del", "/f", "/q"]).arg(path);
        }
        command
    }
}
