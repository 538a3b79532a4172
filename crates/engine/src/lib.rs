#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! A forced-deletion engine for paths that ordinary removal cannot handle:
//! read-only and hidden entries, files held open by other processes,
//! permission-starved subtrees, over-long paths. Each entry climbs an
//! escalation ladder of six removal strategies inside a bounded retry
//! loop, a dependency-aware worker pool removes children before their
//! directories, and a verification sweep re-attempts whatever survived.
//! Entries that outlast everything can be handed to the operating system
//! for removal at the next restart.
//!
//! # Design
//!
//! - [`delete_path`] plans one task per enumerated entry, bottom-up, and
//!   feeds them through a worker pool that grows (never shrinks) while
//!   throughput is poor.
//! - Per-entry failures never abort the run; they are classified into
//!   [`ErrorKind`] and recorded in the [`DeletionReport`].
//! - Process termination is opt-in via [`DeleteOptions::aggressive`];
//!   without it the engine never touches other processes.
//! - Deletion is idempotent: a missing root reports success, and entries
//!   that vanish mid-run count as removed no matter who removed them.
//!
//! # Errors
//!
//! [`EngineError`] covers run-level failures only: an invalid root,
//! cancellation before the run started, or an enumeration that could not
//! even begin. Everything else is per-task data in the report.
//!
//! # Examples
//!
//! ```
//! use engine::{DeleteOptions, delete_path};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let temp = tempfile::tempdir()?;
//! let root = temp.path().join("scratch");
//! std::fs::create_dir(&root)?;
//! std::fs::write(root.join("data.bin"), vec![0_u8; 1024])?;
//!
//! let report = delete_path(&root, &DeleteOptions::new())?;
//! assert!(report.is_complete_success());
//! assert!(!root.exists());
//! # Ok(())
//! # }
//! ```

mod cancel;
mod chain;
mod defer;
mod error;
mod lockbreak;
mod normalize;
mod options;
mod pool;
mod report;
mod task;
mod verify;

use std::fs;
use std::io;
use std::path::Path;
use std::time::Instant;

use progress::{ProgressAggregator, ProgressEmitter};

pub use cancel::CancelToken;
pub use defer::DeferredEntry;
pub use error::{EngineError, ErrorKind, classify, classify_for_path};
pub use options::{
    DEFAULT_INITIAL_WORKERS, DEFAULT_MAX_WORKERS, DEFAULT_PER_TASK_TIMEOUT,
    DEFAULT_PROGRESS_INTERVAL, DEFAULT_TERMINATION_GRACE, DEFAULT_VERIFICATION_PASSES,
    DeleteOptions,
};
pub use progress::ProgressSnapshot;
pub use report::DeletionReport;
pub use task::{EntryKind, StrategyKind, StrategyOutcome, TaskResult, TaskStatus};

use defer::DeferredLedger;
use lockbreak::LockBreakerSession;
use task::DeletionTask;

/// Deletes `root` and everything beneath it.
///
/// Returns a report describing what happened to every enumerated entry.
/// A missing root is a success with a single already-gone entry.
pub fn delete_path(
    root: impl AsRef<Path>,
    options: &DeleteOptions,
) -> Result<DeletionReport, EngineError> {
    run_delete(
        root.as_ref(),
        options,
        &CancelToken::new(),
        ProgressEmitter::disabled(),
    )
}

/// Like [`delete_path`], delivering throttled [`ProgressSnapshot`]s to
/// `on_progress` while the run is underway. The terminal snapshot is
/// always delivered.
pub fn delete_path_with_progress<F>(
    root: impl AsRef<Path>,
    options: &DeleteOptions,
    on_progress: F,
) -> Result<DeletionReport, EngineError>
where
    F: FnMut(ProgressSnapshot) + Send,
{
    run_delete(
        root.as_ref(),
        options,
        &CancelToken::new(),
        ProgressEmitter::new(Box::new(on_progress), options.progress_emit_interval()),
    )
}

/// Full-control variant: optional progress subscription plus cooperative
/// cancellation through `cancel`.
///
/// Cancelling after work has started is not an error; tasks already
/// dispatched run to completion and everything else is reported as failed.
pub fn delete_path_cancellable(
    root: impl AsRef<Path>,
    options: &DeleteOptions,
    cancel: &CancelToken,
    on_progress: Option<Box<dyn FnMut(ProgressSnapshot) + Send + '_>>,
) -> Result<DeletionReport, EngineError> {
    let emitter = match on_progress {
        Some(callback) => ProgressEmitter::new(callback, options.progress_emit_interval()),
        None => ProgressEmitter::disabled(),
    };
    run_delete(root.as_ref(), options, cancel, emitter)
}

/// Runs the verification sweep on its own: up to `max_passes` passes of
/// re-walking `root` and removing whatever remains, with protections
/// reset first. Returns `true` once the root is confirmed gone.
pub fn verify_removed(root: impl AsRef<Path>, max_passes: usize) -> Result<bool, EngineError> {
    let root = normalize::normalize_root(root.as_ref())?;
    normalize::ensure_deletable_root(&root)?;
    let session = LockBreakerSession::new(&DeleteOptions::new());
    Ok(verify::verify(&root, &session, max_passes).converged)
}

fn run_delete(
    root: &Path,
    options: &DeleteOptions,
    cancel: &CancelToken,
    mut emitter: ProgressEmitter<'_>,
) -> Result<DeletionReport, EngineError> {
    let started = Instant::now();
    let root = normalize::normalize_root(root)?;
    normalize::ensure_deletable_root(&root)?;
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }

    match fs::symlink_metadata(&root) {
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            // Nothing to delete; report the single entry as already gone.
            let mut task = DeletionTask::new(root, EntryKind::File, 0);
            task.begin();
            task.finish(TaskStatus::Succeeded);
            let results = vec![TaskResult::new(&task, Vec::new())];
            emitter.emit_final(ProgressSnapshot {
                bytes_done: 0,
                bytes_total: 0,
                items_done: 1,
                items_total: 1,
                throughput_bytes_per_sec: 0,
                throughput_items_per_sec: 0,
                active_workers: 0,
            });
            return Ok(DeletionReport::new(started.elapsed(), Vec::new(), results));
        }
        Err(error) => {
            tracing::warn!(root = %root.display(), %error, "root metadata unreadable, continuing");
        }
        Ok(_) => {}
    }

    let tasks = enumerate(&root)?;
    let plan = pool::Plan::new(tasks);
    tracing::debug!(
        root = %root.display(),
        items = plan.len(),
        bytes = plan.total_bytes(),
        dry_run = options.is_dry_run(),
        "planned deletion"
    );

    let aggregator = ProgressAggregator::new(plan.len() as u64, plan.total_bytes());
    let session = LockBreakerSession::new(options);
    let mut results = pool::run(&plan, options, &session, &aggregator, &mut emitter, cancel);

    let mut ledger = DeferredLedger::new();
    // A cancelled run must not keep deleting behind the caller's back, and
    // a dry run must not delete at all; the sweep is skipped for both.
    if !options.is_dry_run() && !cancel.is_cancelled() {
        let outcome = verify::verify(&root, &session, options.effective_verification_passes());

        for result in &mut results {
            if result.status() == TaskStatus::Failed && entry_is_gone(result.path()) {
                // The sweep (or a later sibling strategy) got it after the
                // task gave up; the filesystem is the source of truth.
                result.mark_succeeded();
            }
        }

        if !outcome.converged && options.defers_on_failure() {
            for result in &mut results {
                if result.status() != TaskStatus::Failed {
                    continue;
                }
                let reason = result.last_error().unwrap_or(ErrorKind::Unknown(-1));
                match ledger.defer(result.path(), reason) {
                    Ok(()) => result.mark_deferred(),
                    Err(error) => {
                        tracing::warn!(path = %result.path().display(), %error, "deferral failed");
                    }
                }
            }
        }
    }

    emitter.emit_final(aggregator.snapshot());
    Ok(DeletionReport::new(
        started.elapsed(),
        ledger.into_entries(),
        results,
    ))
}

/// Enumerates the subtree bottom-up into deletion tasks.
///
/// A walk failure partway through degrades to the entries collected so
/// far; the root task is always present so the elevated fallback gets a
/// shot at unreadable subtrees.
fn enumerate(root: &Path) -> Result<Vec<DeletionTask>, EngineError> {
    let walker = walk::WalkBuilder::new(root).build()?;
    let mut tasks = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                let kind = entry.kind();
                let size = entry.size_bytes();
                tasks.push(DeletionTask::new(entry.into_full_path(), kind, size));
            }
            Err(error) => {
                tracing::warn!(%error, "enumeration degraded, planning the collected entries only");
                break;
            }
        }
    }

    if tasks.last().is_none_or(|task| task.path() != root) {
        let kind = match fs::symlink_metadata(root) {
            Ok(metadata) if metadata.is_dir() => EntryKind::Directory,
            _ => EntryKind::File,
        };
        tasks.push(DeletionTask::new(root.to_path_buf(), kind, 0));
    }
    Ok(tasks)
}

pub(crate) fn entry_is_gone(path: &Path) -> bool {
    matches!(fs::symlink_metadata(path), Err(ref error) if error.kind() == io::ErrorKind::NotFound)
}
