//! Caller-facing knobs for a deletion run.

use std::time::Duration;

/// Workers spawned before throughput data exists.
pub const DEFAULT_INITIAL_WORKERS: usize = 2;
/// Hard ceiling on pool growth unless overridden.
pub const DEFAULT_MAX_WORKERS: usize = 8;
/// Per-task wall-clock budget unless overridden.
pub const DEFAULT_PER_TASK_TIMEOUT: Duration = Duration::from_secs(60);
/// Minimum spacing between progress callback invocations.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(200);
/// Verification passes after the pool drains.
pub const DEFAULT_VERIFICATION_PASSES: usize = 3;
/// Grace period between a polite termination request and a forced kill.
pub const DEFAULT_TERMINATION_GRACE: Duration = Duration::from_secs(2);

/// Options controlling a deletion run.
///
/// Built with const setters so configurations can live in `const` context:
///
/// ```
/// use engine::DeleteOptions;
///
/// const PREVIEW: DeleteOptions = DeleteOptions::new().dry_run(true);
/// assert!(PREVIEW.is_dry_run());
/// ```
#[derive(Clone, Debug)]
pub struct DeleteOptions {
    dry_run: bool,
    aggressive: bool,
    defer_on_failure: bool,
    initial_workers: usize,
    max_workers: usize,
    per_task_timeout: Option<Duration>,
    progress_interval: Duration,
    verification_passes: usize,
    termination_grace: Duration,
}

impl DeleteOptions {
    /// Default configuration: real deletion, conservative lock handling,
    /// no reboot deferral.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dry_run: false,
            aggressive: false,
            defer_on_failure: false,
            initial_workers: DEFAULT_INITIAL_WORKERS,
            max_workers: DEFAULT_MAX_WORKERS,
            per_task_timeout: Some(DEFAULT_PER_TASK_TIMEOUT),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            verification_passes: DEFAULT_VERIFICATION_PASSES,
            termination_grace: DEFAULT_TERMINATION_GRACE,
        }
    }

    /// Report what would be deleted without touching the filesystem.
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Permit termination of processes found holding entries open.
    #[must_use]
    pub const fn aggressive(mut self, enabled: bool) -> Self {
        self.aggressive = enabled;
        self
    }

    /// Register entries that survive every strategy for removal at the
    /// next restart, where the OS supports it.
    #[must_use]
    pub const fn defer_on_failure(mut self, enabled: bool) -> Self {
        self.defer_on_failure = enabled;
        self
    }

    /// Number of workers to start with. Clamped to at least one and at
    /// most the configured maximum.
    #[must_use]
    pub const fn initial_workers(mut self, count: usize) -> Self {
        self.initial_workers = count;
        self
    }

    /// Ceiling for pool growth. Clamped to at least one.
    #[must_use]
    pub const fn max_workers(mut self, count: usize) -> Self {
        self.max_workers = count;
        self
    }

    /// Wall-clock budget per entry; `None` disables the deadline.
    #[must_use]
    pub const fn per_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.per_task_timeout = timeout;
        self
    }

    /// Minimum interval between progress callback invocations.
    #[must_use]
    pub const fn progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Number of verification passes after the pool drains. Zero behaves
    /// like one; the final existence check always runs.
    #[must_use]
    pub const fn verification_passes(mut self, passes: usize) -> Self {
        self.verification_passes = passes;
        self
    }

    /// Grace period granted to a lock-holding process between the polite
    /// termination request and the forced kill. Only relevant in
    /// aggressive mode.
    #[must_use]
    pub const fn termination_grace(mut self, grace: Duration) -> Self {
        self.termination_grace = grace;
        self
    }

    /// Whether this run only reports what it would delete.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Whether lock-holding processes may be terminated.
    #[must_use]
    pub const fn is_aggressive(&self) -> bool {
        self.aggressive
    }

    /// Whether surviving entries are handed to the OS for removal at
    /// restart.
    #[must_use]
    pub const fn defers_on_failure(&self) -> bool {
        self.defer_on_failure
    }

    /// Effective worker count at startup.
    #[must_use]
    pub const fn effective_initial_workers(&self) -> usize {
        let max = self.effective_max_workers();
        let initial = if self.initial_workers == 0 {
            1
        } else {
            self.initial_workers
        };
        if initial > max { max } else { initial }
    }

    /// Effective ceiling on pool growth.
    #[must_use]
    pub const fn effective_max_workers(&self) -> usize {
        if self.max_workers == 0 {
            1
        } else {
            self.max_workers
        }
    }

    /// Per-entry deadline, if one is configured.
    #[must_use]
    pub const fn task_timeout(&self) -> Option<Duration> {
        self.per_task_timeout
    }

    /// Minimum spacing between progress callback invocations.
    #[must_use]
    pub const fn progress_emit_interval(&self) -> Duration {
        self.progress_interval
    }

    /// Effective number of verification passes; always at least one.
    #[must_use]
    pub const fn effective_verification_passes(&self) -> usize {
        if self.verification_passes == 0 {
            1
        } else {
            self.verification_passes
        }
    }

    /// Grace period before a forced kill in aggressive mode.
    #[must_use]
    pub const fn grace(&self) -> Duration {
        self.termination_grace
    }
}

impl Default for DeleteOptions {
    fn default() -> Self {
        Self::new()
    }
}
