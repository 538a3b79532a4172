//! Ledger of entries handed to the OS for removal at the next restart.
//!
//! The ledger is a thin record of successful registrations; the operating
//! system owns the eventual removal and nothing here survives the process.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use platform::PlatformError;

use crate::error::ErrorKind;

/// One path successfully registered for deletion at the next restart.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeferredEntry {
    path: PathBuf,
    reason: ErrorKind,
    scheduled_at: SystemTime,
}

impl DeferredEntry {
    /// Path the OS will remove at the next restart.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The failure that exhausted live deletion for this path.
    #[must_use]
    pub const fn reason(&self) -> ErrorKind {
        self.reason
    }

    /// When the registration was made.
    #[must_use]
    pub const fn scheduled_at(&self) -> SystemTime {
        self.scheduled_at
    }
}

#[derive(Debug, Default)]
pub(crate) struct DeferredLedger {
    entries: Vec<DeferredEntry>,
}

impl DeferredLedger {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers `path` with the OS and records the registration.
    pub(crate) fn defer(&mut self, path: &Path, reason: ErrorKind) -> Result<(), PlatformError> {
        platform::defer_until_reboot(path)?;
        tracing::info!(path = %path.display(), %reason, "deferred to next restart");
        self.entries.push(DeferredEntry {
            path: path.to_path_buf(),
            reason,
            scheduled_at: SystemTime::now(),
        });
        Ok(())
    }

    pub(crate) fn into_entries(self) -> Vec<DeferredEntry> {
        self.entries
    }
}

#[cfg(all(test, not(windows)))]
mod tests {
    use super::*;

    #[test]
    fn unsupported_platform_records_nothing() {
        let mut ledger = DeferredLedger::new();
        let error = ledger
            .defer(Path::new("/tmp/leftover"), ErrorKind::Locked)
            .expect_err("unix cannot defer");
        assert!(matches!(error, PlatformError::Unsupported));
        assert!(ledger.into_entries().is_empty());
    }
}
