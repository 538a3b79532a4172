//! Error type shared by all platform operations.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure reported by a platform-level operation.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Changing protective attributes failed.
    #[error("failed to change attributes on '{}': {source}", .path.display())]
    Attributes {
        /// Path whose attributes could not be changed.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Reassigning ownership failed.
    #[error("failed to take ownership of '{}': {source}", .path.display())]
    Ownership {
        /// Path whose ownership could not be changed.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// Sending a termination signal failed.
    #[error("failed to terminate process {pid}: {source}")]
    Terminate {
        /// Identifier of the target process.
        pid: u32,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// The process survived both graceful and forced termination.
    #[error("process {pid} did not exit within {grace:?}")]
    TerminateTimeout {
        /// Identifier of the target process.
        pid: u32,
        /// Grace period that elapsed before giving up.
        grace: Duration,
    },
    /// Registering a path for deletion at the next restart failed.
    #[error("failed to register '{}' for deletion at reboot: {source}", .path.display())]
    Defer {
        /// Path that could not be registered.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// The current platform has no reboot-deferred deletion facility.
    #[error("reboot-deferred deletion is not supported on this platform")]
    Unsupported,
    /// The elevated removal command could not be spawned.
    #[error("failed to spawn elevated removal for '{}': {source}", .path.display())]
    ElevatedSpawn {
        /// Path the command targeted.
        path: PathBuf,
        /// Underlying error emitted by the operating system.
        source: io::Error,
    },
    /// The elevated removal command finished without removing the path.
    #[error("elevated removal of '{}' exited with code {code:?}", .path.display())]
    ElevatedStatus {
        /// Path the command targeted.
        path: PathBuf,
        /// Exit code reported by the command, when one exists.
        code: Option<i32>,
    },
    /// The elevated removal command exceeded its time budget and was killed.
    #[error("elevated removal of '{}' timed out after {timeout:?}", .path.display())]
    ElevatedTimeout {
        /// Path the command targeted.
        path: PathBuf,
        /// Budget the command exceeded.
        timeout: Duration,
    },
}

impl PlatformError {
    /// Returns the underlying I/O error, when this failure wraps one.
    #[must_use]
    pub fn io_source(&self) -> Option<&io::Error> {
        match self {
            Self::Attributes { source, .. }
            | Self::Ownership { source, .. }
            | Self::Terminate { source, .. }
            | Self::Defer { source, .. }
            | Self::ElevatedSpawn { source, .. } => Some(source),
            Self::TerminateTimeout { .. }
            | Self::Unsupported
            | Self::ElevatedStatus { .. }
            | Self::ElevatedTimeout { .. } => None,
        }
    }

    /// Returns the raw OS error code, when one is available.
    #[must_use]
    pub fn os_code(&self) -> Option<i32> {
        self.io_source().and_then(io::Error::raw_os_error)
    }
}
