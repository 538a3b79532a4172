//! Cooperative cancellation for a running deletion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Signals a running deletion to stop dispatching new tasks.
///
/// Cancellation is cooperative: tasks already handed to a worker run to
/// completion, everything not yet dispatched is recorded as failed. Clones
/// share the same flag, so a token handed to another thread (or a progress
/// callback) cancels the run it was created for.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
