//! The escalation ladder: six removal strategies tried in order, wrapped
//! in a bounded retry loop.
//!
//! # Design
//!
//! Each strategy is a [`RemovalStrategy`] behind a trait object so the
//! runner stays a plain loop over the ladder. A full pass where every
//! strategy fails ends one *round*; rounds repeat with linearly growing
//! backoff until the ladder succeeds, the entry vanishes, the round budget
//! runs out, or the task's deadline passes. A path that disappears between
//! attempts counts as success no matter who removed it.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use crate::entry_is_gone;
use crate::error::{ErrorKind, classify, classify_for_path, classify_platform};
use crate::lockbreak::LockBreakerSession;
use crate::task::{DeletionTask, EntryKind, StrategyKind, StrategyOutcome, TaskStatus};

/// Rounds through the full ladder before a task is declared failed.
pub(crate) const MAX_ROUNDS: usize = 10;
/// Backoff before the second round.
const BACKOFF_BASE: Duration = Duration::from_millis(25);
/// Linear backoff growth per additional round.
const BACKOFF_STEP: Duration = Duration::from_millis(25);
/// Backoff never grows past this.
const BACKOFF_CAP: Duration = Duration::from_millis(250);
/// Budget for one elevated-shell invocation.
const ELEVATED_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything a strategy may use besides the task itself.
pub(crate) struct ChainContext<'a> {
    pub(crate) session: &'a LockBreakerSession,
    pub(crate) temp_dir: &'a Path,
}

trait RemovalStrategy: Sync {
    fn kind(&self) -> StrategyKind;
    fn attempt(&self, task: &DeletionTask, ctx: &ChainContext<'_>) -> Result<(), ErrorKind>;
}

/// Bounded, linearly growing backoff between rounds.
#[derive(Debug)]
pub(crate) struct RetrySchedule {
    rounds_left: usize,
    next_backoff: Duration,
}

impl RetrySchedule {
    pub(crate) const fn new() -> Self {
        Self {
            rounds_left: MAX_ROUNDS - 1,
            next_backoff: BACKOFF_BASE,
        }
    }

    /// Backoff to sleep before the next round, or `None` once the round
    /// budget is spent.
    pub(crate) fn next(&mut self) -> Option<Duration> {
        if self.rounds_left == 0 {
            return None;
        }
        self.rounds_left -= 1;
        let backoff = self.next_backoff;
        self.next_backoff = (self.next_backoff + BACKOFF_STEP).min(BACKOFF_CAP);
        Some(backoff)
    }
}

/// Runs the ladder for one task until success, exhaustion, or deadline.
pub(crate) fn run_chain(
    task: &DeletionTask,
    ctx: &ChainContext<'_>,
    dry_run: bool,
    deadline: Option<Instant>,
) -> (TaskStatus, Vec<StrategyOutcome>) {
    let mut outcomes = Vec::new();

    if dry_run {
        outcomes.push(StrategyOutcome::success(
            StrategyKind::DirectRemove,
            Duration::ZERO,
        ));
        return (TaskStatus::Succeeded, outcomes);
    }

    let ladder: [&dyn RemovalStrategy; 6] = [
        &DirectRemove,
        &OpenExclusiveDelete,
        &ResetAndRetry,
        &RenameInPlace,
        &MoveToTemp,
        &ElevatedFallback,
    ];

    let mut schedule = RetrySchedule::new();
    loop {
        if entry_is_gone(task.path()) {
            return (TaskStatus::Succeeded, outcomes);
        }

        for strategy in ladder {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                outcomes.push(StrategyOutcome::failure(
                    strategy.kind(),
                    ErrorKind::Timeout,
                    Duration::ZERO,
                ));
                return (TaskStatus::Failed, outcomes);
            }

            let started = Instant::now();
            match strategy.attempt(task, ctx) {
                Ok(()) => {
                    outcomes.push(StrategyOutcome::success(strategy.kind(), started.elapsed()));
                    return (TaskStatus::Succeeded, outcomes);
                }
                Err(error) if error.is_not_found() => {
                    // Someone else got there first; same end state.
                    outcomes.push(StrategyOutcome::success(strategy.kind(), started.elapsed()));
                    return (TaskStatus::Succeeded, outcomes);
                }
                Err(error) => {
                    tracing::trace!(
                        path = %task.path().display(),
                        strategy = strategy.kind().as_str(),
                        %error,
                        "strategy failed"
                    );
                    outcomes.push(StrategyOutcome::failure(
                        strategy.kind(),
                        error,
                        started.elapsed(),
                    ));
                }
            }
        }

        // Full round failed. In aggressive mode go after lock holders
        // before backing off.
        ctx.session.break_locks(task.path());

        let Some(backoff) = schedule.next() else {
            tracing::debug!(path = %task.path().display(), "strategy chain exhausted");
            return (TaskStatus::Failed, outcomes);
        };
        thread::sleep(backoff);
    }
}

fn remove_entry(path: &Path, kind: EntryKind) -> Result<(), ErrorKind> {
    let result = match kind {
        EntryKind::File => fs::remove_file(path),
        EntryKind::Directory => fs::remove_dir(path),
    };
    result.map_err(|error| classify_for_path(&error, path))
}

/// A name no concurrent tool is plausibly watching for.
fn scratch_name() -> String {
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = std::collections::hash_map::RandomState::new().build_hasher();
    hasher.write_u32(std::process::id());
    format!(".rmq-{:012x}", hasher.finish() & 0xffff_ffff_ffff)
}

struct DirectRemove;

impl RemovalStrategy for DirectRemove {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DirectRemove
    }

    fn attempt(&self, task: &DeletionTask, _ctx: &ChainContext<'_>) -> Result<(), ErrorKind> {
        remove_entry(task.path(), task.kind())
    }
}

struct OpenExclusiveDelete;

impl RemovalStrategy for OpenExclusiveDelete {
    fn kind(&self) -> StrategyKind {
        StrategyKind::OpenExclusiveDelete
    }

    #[cfg(windows)]
    fn attempt(&self, task: &DeletionTask, _ctx: &ChainContext<'_>) -> Result<(), ErrorKind> {
        use std::fs::OpenOptions;
        use std::os::windows::fs::OpenOptionsExt;
        use windows_sys::Win32::Storage::FileSystem::{DELETE, FILE_FLAG_DELETE_ON_CLOSE};

        if task.kind() == EntryKind::Directory {
            // Delete-on-close needs a file handle; directories fall back
            // to plain removal here and rely on the later rungs.
            return remove_entry(task.path(), task.kind());
        }

        // Exclusive share mode plus delete-on-close: if the open wins, the
        // file is gone the moment the handle drops.
        let opened = OpenOptions::new()
            .access_mode(DELETE)
            .share_mode(0)
            .custom_flags(FILE_FLAG_DELETE_ON_CLOSE)
            .open(task.path());
        match opened {
            Ok(handle) => {
                drop(handle);
                Ok(())
            }
            Err(error) => Err(classify_for_path(&error, task.path())),
        }
    }

    #[cfg(not(windows))]
    fn attempt(&self, task: &DeletionTask, _ctx: &ChainContext<'_>) -> Result<(), ErrorKind> {
        // POSIX unlink already succeeds on open files; there is no
        // exclusive-open dance to win, so this rung is a plain re-attempt.
        remove_entry(task.path(), task.kind())
    }
}

struct ResetAndRetry;

impl RemovalStrategy for ResetAndRetry {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ResetAndRetry
    }

    fn attempt(&self, task: &DeletionTask, ctx: &ChainContext<'_>) -> Result<(), ErrorKind> {
        ctx.session.reset_protections(task.path());
        remove_entry(task.path(), task.kind())
    }
}

struct RenameInPlace;

impl RemovalStrategy for RenameInPlace {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RenameInPlace
    }

    fn attempt(&self, task: &DeletionTask, _ctx: &ChainContext<'_>) -> Result<(), ErrorKind> {
        let parent = task
            .path()
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(ErrorKind::Unknown(-1))?;
        remove_via_rename(task, parent.join(scratch_name()))
    }
}

struct MoveToTemp;

impl RemovalStrategy for MoveToTemp {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MoveToTemp
    }

    fn attempt(&self, task: &DeletionTask, ctx: &ChainContext<'_>) -> Result<(), ErrorKind> {
        remove_via_rename(task, ctx.temp_dir.join(scratch_name()))
    }
}

/// Renames the entry to `staged` and removes it there. A lock keyed on the
/// original name sometimes does not follow the rename. If removal still
/// fails the entry is renamed back so the tree is not left mangled.
fn remove_via_rename(task: &DeletionTask, staged: PathBuf) -> Result<(), ErrorKind> {
    fs::rename(task.path(), &staged).map_err(|error| classify_for_path(&error, task.path()))?;

    match remove_entry(&staged, task.kind()) {
        Ok(()) => Ok(()),
        Err(error) => {
            if let Err(undo) = fs::rename(&staged, task.path()) {
                tracing::warn!(
                    staged = %staged.display(),
                    original = %task.path().display(),
                    error = %classify(&undo),
                    "could not restore renamed entry"
                );
            }
            Err(error)
        }
    }
}

struct ElevatedFallback;

impl RemovalStrategy for ElevatedFallback {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ElevatedFallback
    }

    fn attempt(&self, task: &DeletionTask, _ctx: &ChainContext<'_>) -> Result<(), ErrorKind> {
        platform::elevated_remove(task.path(), ELEVATED_TIMEOUT)
            .map_err(|error| classify_platform(&error, task.path()))
    }
}
