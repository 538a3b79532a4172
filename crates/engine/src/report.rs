//! Summary returned to the caller when a run finishes.

use std::time::Duration;

use crate::defer::DeferredEntry;
use crate::task::{TaskResult, TaskStatus};

/// Outcome of a whole deletion run.
///
/// Counters are derived from the per-task results, so
/// `items_succeeded + items_failed + items_deferred == items_total` holds
/// by construction.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeletionReport {
    items_total: u64,
    items_succeeded: u64,
    items_failed: u64,
    items_deferred: u64,
    bytes_deleted: u64,
    duration: Duration,
    deferred: Vec<DeferredEntry>,
    results: Vec<TaskResult>,
}

impl DeletionReport {
    pub(crate) fn new(
        duration: Duration,
        deferred: Vec<DeferredEntry>,
        results: Vec<TaskResult>,
    ) -> Self {
        let mut report = Self {
            items_total: results.len() as u64,
            items_succeeded: 0,
            items_failed: 0,
            items_deferred: 0,
            bytes_deleted: 0,
            duration,
            deferred,
            results,
        };
        for result in &report.results {
            match result.status() {
                TaskStatus::Succeeded => {
                    report.items_succeeded += 1;
                    report.bytes_deleted += result.size_bytes();
                }
                TaskStatus::Failed => report.items_failed += 1,
                TaskStatus::DeferredToReboot => report.items_deferred += 1,
                TaskStatus::Pending | TaskStatus::InProgress => {
                    debug_assert!(false, "non-terminal task in a finished run");
                    report.items_failed += 1;
                }
            }
        }
        report
    }

    /// Number of entries planned for removal.
    #[must_use]
    pub const fn items_total(&self) -> u64 {
        self.items_total
    }

    /// Entries confirmed gone from the filesystem.
    #[must_use]
    pub const fn items_succeeded(&self) -> u64 {
        self.items_succeeded
    }

    /// Entries that survived every strategy and remain on disk.
    #[must_use]
    pub const fn items_failed(&self) -> u64 {
        self.items_failed
    }

    /// Entries handed to the OS for removal at the next restart.
    #[must_use]
    pub const fn items_deferred(&self) -> u64 {
        self.items_deferred
    }

    /// Bytes reclaimed, summed from successfully removed files.
    #[must_use]
    pub const fn bytes_deleted(&self) -> u64 {
        self.bytes_deleted
    }

    /// Wall-clock duration of the run, verification included.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    /// Registrations made with the OS deletion-at-restart facility.
    #[must_use]
    pub fn deferred(&self) -> &[DeferredEntry] {
        &self.deferred
    }

    /// Per-task results in completion order.
    #[must_use]
    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    /// `true` when every entry was removed during the run.
    #[must_use]
    pub const fn is_complete_success(&self) -> bool {
        self.items_succeeded == self.items_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::DeletionTask;
    use std::path::PathBuf;
    use walk::EntryKind;

    fn finished(path: &str, status: TaskStatus, size: u64) -> TaskResult {
        let mut task = DeletionTask::new(PathBuf::from(path), EntryKind::File, size);
        task.begin();
        task.finish(status);
        TaskResult::new(&task, Vec::new())
    }

    #[test]
    fn counters_partition_the_total() {
        let report = DeletionReport::new(
            Duration::from_millis(5),
            Vec::new(),
            vec![
                finished("/t/a", TaskStatus::Succeeded, 10),
                finished("/t/b", TaskStatus::Failed, 20),
                finished("/t/c", TaskStatus::Succeeded, 30),
                finished("/t/d", TaskStatus::DeferredToReboot, 40),
            ],
        );
        assert_eq!(report.items_total(), 4);
        assert_eq!(report.items_succeeded(), 2);
        assert_eq!(report.items_failed(), 1);
        assert_eq!(report.items_deferred(), 1);
        assert_eq!(report.bytes_deleted(), 40);
        assert!(!report.is_complete_success());
    }

    #[test]
    fn empty_run_is_a_complete_success() {
        let report = DeletionReport::new(Duration::ZERO, Vec::new(), Vec::new());
        assert!(report.is_complete_success());
        assert_eq!(report.items_total(), 0);
    }
}
