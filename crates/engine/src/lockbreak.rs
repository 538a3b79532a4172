//! Lock breaking shared by every worker in a run.
//!
//! The session wraps the platform primitives with run-level policy: all
//! calls are advisory (a failed reset never fails the task that asked for
//! it), process termination stays disabled unless the caller opted into
//! aggressive mode, and a process is terminated at most once per run even
//! when it holds many entries open.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rustc_hash::FxHashSet;

use crate::options::DeleteOptions;

#[derive(Debug)]
pub(crate) struct LockBreakerSession {
    aggressive: bool,
    dry_run: bool,
    termination_grace: Duration,
    terminated: Mutex<FxHashSet<u32>>,
}

impl LockBreakerSession {
    pub(crate) fn new(options: &DeleteOptions) -> Self {
        Self {
            aggressive: options.is_aggressive(),
            dry_run: options.is_dry_run(),
            termination_grace: options.grace(),
            terminated: Mutex::new(FxHashSet::default()),
        }
    }

    /// Strips protective attributes and takes ownership of `path`, plus the
    /// attribute reset on its parent, since removal rewrites the parent.
    /// Best effort throughout.
    pub(crate) fn reset_protections(&self, path: &Path) {
        if self.dry_run {
            return;
        }
        if let Err(error) = platform::clear_protective_attributes(path) {
            tracing::debug!(path = %path.display(), %error, "attribute reset failed");
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(error) = platform::clear_protective_attributes(parent) {
                tracing::debug!(path = %parent.display(), %error, "parent attribute reset failed");
            }
        }
        if let Err(error) = platform::take_ownership(path) {
            tracing::debug!(path = %path.display(), %error, "ownership takeover failed");
        }
    }

    /// Terminates processes holding `path` open. Returns how many were
    /// newly terminated; always zero outside aggressive mode.
    pub(crate) fn break_locks(&self, path: &Path) -> usize {
        if !self.aggressive || self.dry_run {
            return 0;
        }
        let holders = platform::find_locking_processes(path);
        if holders.is_empty() {
            return 0;
        }

        let mut terminated = self
            .terminated
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut count = 0;
        for pid in holders {
            if terminated.contains(&pid) {
                continue;
            }
            match platform::terminate(pid, self.termination_grace) {
                Ok(()) => {
                    tracing::warn!(pid, path = %path.display(), "terminated lock holder");
                    terminated.insert(pid);
                    count += 1;
                }
                Err(error) => {
                    tracing::warn!(pid, path = %path.display(), %error, "failed to terminate lock holder");
                }
            }
        }
        count
    }
}
