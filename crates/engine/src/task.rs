//! Unit of work produced by enumeration and consumed by the worker pool.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use walk::EntryKind;

use crate::error::ErrorKind;

/// Lifecycle of a deletion task.
///
/// Transitions only move forward: `Pending` to `InProgress` to one of the
/// terminal states. A task never re-enters `Pending`, and a `Succeeded`
/// task is never reprocessed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskStatus {
    /// Planned, not yet handed to a worker.
    Pending,
    /// A worker is running the strategy chain for this entry.
    InProgress,
    /// The entry is gone from the filesystem.
    Succeeded,
    /// Every strategy was exhausted and the entry remains.
    Failed,
    /// Registered with the OS for removal at the next restart.
    DeferredToReboot,
}

impl TaskStatus {
    /// Returns `true` once the task can no longer change to a worse state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::DeferredToReboot)
    }
}

/// One entry scheduled for removal.
#[derive(Clone, Debug)]
pub struct DeletionTask {
    path: PathBuf,
    kind: EntryKind,
    size_bytes: u64,
    status: TaskStatus,
}

impl DeletionTask {
    pub(crate) fn new(path: PathBuf, kind: EntryKind, size_bytes: u64) -> Self {
        Self {
            path,
            kind,
            size_bytes,
            status: TaskStatus::Pending,
        }
    }

    /// Absolute path of the entry.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the entry is removed as a file or as an (empty) directory.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Size recorded at enumeration time; zero for directories.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    pub(crate) fn begin(&mut self) {
        debug_assert_eq!(self.status, TaskStatus::Pending);
        self.status = TaskStatus::InProgress;
    }

    pub(crate) fn finish(&mut self, status: TaskStatus) {
        debug_assert!(status.is_terminal());
        debug_assert_ne!(self.status, TaskStatus::Succeeded);
        self.status = status;
    }
}

/// The escalation ladder, in the order strategies are attempted.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StrategyKind {
    /// Plain `remove_file` / `remove_dir`.
    DirectRemove,
    /// Open with exclusive access and delete-on-close semantics.
    OpenExclusiveDelete,
    /// Clear protective attributes and ownership, then retry removal.
    ResetAndRetry,
    /// Rename to a random sibling name to shed name-based locks, then remove.
    RenameInPlace,
    /// Move into the temp directory, then remove there.
    MoveToTemp,
    /// Recursive forced removal through an elevated shell command.
    ElevatedFallback,
}

impl StrategyKind {
    /// One-based position in the escalation ladder.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::DirectRemove => 1,
            Self::OpenExclusiveDelete => 2,
            Self::ResetAndRetry => 3,
            Self::RenameInPlace => 4,
            Self::MoveToTemp => 5,
            Self::ElevatedFallback => 6,
        }
    }

    /// Stable lowercase name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DirectRemove => "direct-remove",
            Self::OpenExclusiveDelete => "open-exclusive-delete",
            Self::ResetAndRetry => "reset-and-retry",
            Self::RenameInPlace => "rename-in-place",
            Self::MoveToTemp => "move-to-temp",
            Self::ElevatedFallback => "elevated-fallback",
        }
    }
}

/// Record of a single strategy attempt against one entry.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrategyOutcome {
    strategy: StrategyKind,
    succeeded: bool,
    error: Option<ErrorKind>,
    elapsed: Duration,
}

impl StrategyOutcome {
    pub(crate) const fn success(strategy: StrategyKind, elapsed: Duration) -> Self {
        Self {
            strategy,
            succeeded: true,
            error: None,
            elapsed,
        }
    }

    pub(crate) const fn failure(strategy: StrategyKind, error: ErrorKind, elapsed: Duration) -> Self {
        Self {
            strategy,
            succeeded: false,
            error: Some(error),
            elapsed,
        }
    }

    /// Which rung of the ladder this attempt used.
    #[must_use]
    pub const fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    /// Whether the attempt removed the entry.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Classified failure cause, present when the attempt failed.
    #[must_use]
    pub const fn error(&self) -> Option<ErrorKind> {
        self.error
    }

    /// Wall-clock time spent in the attempt.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Final state of one task, with the full attempt history.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaskResult {
    path: PathBuf,
    kind: EntryKind,
    size_bytes: u64,
    status: TaskStatus,
    outcomes: Vec<StrategyOutcome>,
}

impl TaskResult {
    pub(crate) fn new(task: &DeletionTask, outcomes: Vec<StrategyOutcome>) -> Self {
        Self {
            path: task.path.clone(),
            kind: task.kind,
            size_bytes: task.size_bytes,
            status: task.status,
            outcomes,
        }
    }

    /// Absolute path of the entry.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File or directory.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Size recorded at enumeration time; zero for directories.
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Terminal state the task ended in.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Strategy attempts in the order they ran.
    #[must_use]
    pub fn outcomes(&self) -> &[StrategyOutcome] {
        &self.outcomes
    }

    /// Classified cause of the last failed attempt, if any failed.
    #[must_use]
    pub fn last_error(&self) -> Option<ErrorKind> {
        self.outcomes.iter().rev().find_map(StrategyOutcome::error)
    }

    pub(crate) fn mark_succeeded(&mut self) {
        debug_assert_eq!(self.status, TaskStatus::Failed);
        self.status = TaskStatus::Succeeded;
    }

    pub(crate) fn mark_deferred(&mut self) {
        debug_assert_eq!(self.status, TaskStatus::Failed);
        self.status = TaskStatus::DeferredToReboot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_moves_forward_only() {
        let mut task = DeletionTask::new(PathBuf::from("/tmp/x"), EntryKind::File, 4);
        assert_eq!(task.status(), TaskStatus::Pending);
        task.begin();
        assert_eq!(task.status(), TaskStatus::InProgress);
        task.finish(TaskStatus::Succeeded);
        assert!(task.status().is_terminal());
    }

    #[test]
    fn ordinals_follow_the_ladder() {
        let ladder = [
            StrategyKind::DirectRemove,
            StrategyKind::OpenExclusiveDelete,
            StrategyKind::ResetAndRetry,
            StrategyKind::RenameInPlace,
            StrategyKind::MoveToTemp,
            StrategyKind::ElevatedFallback,
        ];
        for (index, kind) in ladder.iter().enumerate() {
            assert_eq!(usize::from(kind.ordinal()), index + 1);
        }
    }

    #[test]
    fn last_error_picks_the_final_failure() {
        let mut task = DeletionTask::new(PathBuf::from("/tmp/x"), EntryKind::File, 0);
        task.begin();
        task.finish(TaskStatus::Failed);
        let result = TaskResult::new(
            &task,
            vec![
                StrategyOutcome::failure(
                    StrategyKind::DirectRemove,
                    ErrorKind::PermissionDenied,
                    Duration::ZERO,
                ),
                StrategyOutcome::failure(
                    StrategyKind::ResetAndRetry,
                    ErrorKind::Locked,
                    Duration::ZERO,
                ),
            ],
        );
        assert_eq!(result.last_error(), Some(ErrorKind::Locked));
    }
}
