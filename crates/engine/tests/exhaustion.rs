//! Behavior when every strategy fails.
//!
//! procfs entries cannot be unlinked, renamed, or removed by any rung of
//! the ladder, even by root, which makes them a reliable stand-in for a
//! genuinely undeletable entry.

#![cfg(target_os = "linux")]

use engine::{DeleteOptions, StrategyKind, TaskStatus, delete_path};

#[test]
fn undeletable_entry_climbs_every_rung_then_fails() {
    let report = delete_path("/proc/self/status", &DeleteOptions::new()).expect("run completes");

    assert_eq!(report.items_total(), 1);
    assert_eq!(report.items_failed(), 1);
    assert_eq!(report.items_succeeded(), 0);
    assert!(report.deferred().is_empty());

    let result = &report.results()[0];
    assert_eq!(result.status(), TaskStatus::Failed);
    assert!(result.last_error().is_some());

    // Every rung of the ladder was attempted at least once, in order.
    let attempted: Vec<StrategyKind> = result
        .outcomes()
        .iter()
        .take(6)
        .map(|outcome| outcome.strategy())
        .collect();
    assert_eq!(
        attempted,
        vec![
            StrategyKind::DirectRemove,
            StrategyKind::OpenExclusiveDelete,
            StrategyKind::ResetAndRetry,
            StrategyKind::RenameInPlace,
            StrategyKind::MoveToTemp,
            StrategyKind::ElevatedFallback,
        ]
    );
    assert!(result.outcomes().iter().all(|o| !o.succeeded()));

    // Still there afterwards; the engine reports failure instead of lying.
    assert!(std::path::Path::new("/proc/self/status").exists());
}

#[test]
fn deferral_on_an_unsupported_platform_leaves_the_task_failed() {
    let options = DeleteOptions::new().defer_on_failure(true);
    let report = delete_path("/proc/self/status", &options).expect("run completes");

    // Unix has no deletion-at-restart facility, so the registration fails
    // and the task stays failed rather than claiming a deferral happened.
    assert_eq!(report.items_failed(), 1);
    assert_eq!(report.items_deferred(), 0);
    assert!(report.deferred().is_empty());
}
