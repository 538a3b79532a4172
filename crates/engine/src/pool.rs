//! Dependency-aware worker pool.
//!
//! # Design
//!
//! Enumeration yields entries bottom-up, so a directory's task becomes
//! ready only once every child task has completed. The plan records, per
//! task, its parent directory's index and a count of outstanding children;
//! leaves start ready, and each completion report releases its parent when
//! the count reaches zero. Workers pull from a shared channel and send
//! completion reports back, so a single coordinator owns all scheduling
//! state and no task is ever dispatched twice.
//!
//! The pool starts small and only grows: when aggregate throughput sits
//! below the low-water mark while work remains, one worker is added per
//! cooldown interval until the configured ceiling. Workers are never
//! culled mid-run; the pool exists for seconds, not hours.

use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use progress::{ProgressAggregator, ProgressEmitter, ProgressSnapshot};
use rustc_hash::FxHashMap;

use crate::cancel::CancelToken;
use crate::chain::{ChainContext, run_chain};
use crate::lockbreak::LockBreakerSession;
use crate::options::DeleteOptions;
use crate::task::{DeletionTask, EntryKind, StrategyOutcome, TaskResult, TaskStatus};

/// Throughput below which an idle-suspect pool grows, in bytes per second.
pub(crate) const LOW_WATER_BYTES_PER_SEC: u64 = 8 * 1024 * 1024;
/// Minimum time between two scaling decisions.
pub(crate) const SCALE_COOLDOWN: Duration = Duration::from_millis(250);

/// Ordered task list plus the parent/child bookkeeping the scheduler needs.
pub(crate) struct Plan {
    tasks: Vec<DeletionTask>,
    parent: Vec<Option<usize>>,
    pending_children: Vec<usize>,
}

impl Plan {
    /// Builds the dependency wiring for a bottom-up ordered task list.
    pub(crate) fn new(tasks: Vec<DeletionTask>) -> Self {
        let mut dir_index: FxHashMap<PathBuf, usize> = FxHashMap::default();
        for (index, task) in tasks.iter().enumerate() {
            if task.kind() == EntryKind::Directory {
                dir_index.insert(task.path().to_path_buf(), index);
            }
        }

        let mut parent = vec![None; tasks.len()];
        let mut pending_children = vec![0_usize; tasks.len()];
        for (index, task) in tasks.iter().enumerate() {
            let Some(parent_path) = task.path().parent() else {
                continue;
            };
            if let Some(&parent_index) = dir_index.get(parent_path) {
                if parent_index != index {
                    parent[index] = Some(parent_index);
                    pending_children[parent_index] += 1;
                }
            }
        }

        Self {
            tasks,
            parent,
            pending_children,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub(crate) fn total_bytes(&self) -> u64 {
        self.tasks.iter().map(DeletionTask::size_bytes).sum()
    }

    fn initially_ready(&self) -> Vec<usize> {
        self.pending_children
            .iter()
            .enumerate()
            .filter_map(|(index, &pending)| (pending == 0).then_some(index))
            .collect()
    }
}

struct WorkItem {
    index: usize,
    task: DeletionTask,
}

struct WorkReport {
    index: usize,
    task: DeletionTask,
    outcomes: Vec<StrategyOutcome>,
}

#[derive(Clone, Copy)]
struct WorkerContext<'a> {
    session: &'a LockBreakerSession,
    temp_dir: &'a std::path::Path,
    cancel: &'a CancelToken,
    dry_run: bool,
    timeout: Option<Duration>,
}

fn spawn_worker<'scope, 'env>(
    scope: &'scope thread::Scope<'scope, 'env>,
    items: Receiver<WorkItem>,
    reports: Sender<WorkReport>,
    ctx: WorkerContext<'env>,
) {
    scope.spawn(move || {
        while let Ok(item) = items.recv() {
            let report = process(item, &ctx);
            if reports.send(report).is_err() {
                break;
            }
        }
    });
}

fn process(item: WorkItem, ctx: &WorkerContext<'_>) -> WorkReport {
    let mut task = item.task;
    task.begin();
    if ctx.cancel.is_cancelled() {
        // Queued before the token was set; fail it instead of deleting
        // behind the caller's back.
        task.finish(TaskStatus::Failed);
        return WorkReport {
            index: item.index,
            task,
            outcomes: Vec::new(),
        };
    }
    let deadline = ctx.timeout.map(|budget| Instant::now() + budget);
    let chain_ctx = ChainContext {
        session: ctx.session,
        temp_dir: ctx.temp_dir,
    };
    let (status, outcomes) = run_chain(&task, &chain_ctx, ctx.dry_run, deadline);
    task.finish(status);
    WorkReport {
        index: item.index,
        task,
        outcomes,
    }
}

/// Grow-only scaling decision, factored out so it can be tested without a
/// live pool.
pub(crate) fn should_add_worker(
    snapshot: &ProgressSnapshot,
    workers: usize,
    max_workers: usize,
    since_last_scale: Duration,
) -> bool {
    workers < max_workers
        && since_last_scale >= SCALE_COOLDOWN
        && snapshot.throughput_bytes_per_sec < LOW_WATER_BYTES_PER_SEC
        && !snapshot.is_complete()
}

/// Hands one task to the pool. Each index is enumerated exactly once and
/// the flag makes re-dispatch a no-op, so no path is ever processed twice.
fn dispatch(
    index: usize,
    tasks: &[DeletionTask],
    dispatched: &mut [bool],
    in_flight: &mut usize,
    items: &Sender<WorkItem>,
) {
    if dispatched[index] {
        return;
    }
    dispatched[index] = true;
    *in_flight += 1;
    let _ = items.send(WorkItem {
        index,
        task: tasks[index].clone(),
    });
}

/// Runs the plan to completion and returns per-task results in completion
/// order. Undispatched tasks (cancellation, or a parent whose children were
/// cut off) are recorded as failed.
pub(crate) fn run(
    plan: &Plan,
    options: &DeleteOptions,
    session: &LockBreakerSession,
    aggregator: &ProgressAggregator,
    emitter: &mut ProgressEmitter<'_>,
    cancel: &CancelToken,
) -> Vec<TaskResult> {
    let total = plan.len();
    let mut results = Vec::with_capacity(total);
    if plan.is_empty() {
        return results;
    }

    let temp_dir = env::temp_dir();
    let max_workers = options.effective_max_workers();
    let initial_workers = options.effective_initial_workers().min(total);

    let (item_tx, item_rx) = unbounded::<WorkItem>();
    let (report_tx, report_rx) = unbounded::<WorkReport>();

    let mut pending = plan.pending_children.clone();
    let mut dispatched = vec![false; total];

    thread::scope(|scope| {
        let ctx = WorkerContext {
            session,
            temp_dir: &temp_dir,
            cancel,
            dry_run: options.is_dry_run(),
            timeout: options.task_timeout(),
        };

        let mut workers = 0_usize;
        for _ in 0..initial_workers.max(1) {
            spawn_worker(scope, item_rx.clone(), report_tx.clone(), ctx);
            workers += 1;
        }
        aggregator.set_active_workers(workers);

        let mut in_flight = 0_usize;
        if !cancel.is_cancelled() {
            for index in plan.initially_ready() {
                dispatch(index, &plan.tasks, &mut dispatched, &mut in_flight, &item_tx);
            }
        }

        let mut last_scale = Instant::now();
        while in_flight > 0 {
            // A report is guaranteed while work is in flight; worker
            // threads only exit once the item channel closes.
            let Ok(report) = report_rx.recv() else {
                break;
            };
            in_flight -= 1;

            if report.task.status() == TaskStatus::Succeeded {
                aggregator.record_success(report.task.size_bytes());
            } else {
                aggregator.record_failure();
            }

            if let Some(parent_index) = plan.parent[report.index] {
                pending[parent_index] -= 1;
                if pending[parent_index] == 0 && !cancel.is_cancelled() {
                    dispatch(
                        parent_index,
                        &plan.tasks,
                        &mut dispatched,
                        &mut in_flight,
                        &item_tx,
                    );
                }
            }

            results.push(TaskResult::new(&report.task, report.outcomes));

            let snapshot = aggregator.snapshot();
            if should_add_worker(&snapshot, workers, max_workers, last_scale.elapsed()) {
                spawn_worker(scope, item_rx.clone(), report_tx.clone(), ctx);
                workers += 1;
                aggregator.set_active_workers(workers);
                last_scale = Instant::now();
                tracing::debug!(workers, "worker pool grew");
            }
            emitter.emit(snapshot);
        }

        // Closing the item channel lets idle workers exit; the scope joins
        // them before returning.
        drop(item_tx);
        drop(report_tx);
    });

    for (index, was_dispatched) in dispatched.iter().enumerate() {
        if !was_dispatched {
            let mut task = plan.tasks[index].clone();
            task.begin();
            task.finish(TaskStatus::Failed);
            aggregator.record_failure();
            results.push(TaskResult::new(&task, Vec::new()));
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn task(path: &str, kind: EntryKind) -> DeletionTask {
        DeletionTask::new(PathBuf::from(path), kind, 0)
    }

    #[test]
    fn plan_wires_children_to_their_directory() {
        // Bottom-up order: files, then inner dir, then root.
        let plan = Plan::new(vec![
            task("/r/inner/a.txt", EntryKind::File),
            task("/r/inner/b.txt", EntryKind::File),
            task("/r/inner", EntryKind::Directory),
            task("/r/top.txt", EntryKind::File),
            task("/r", EntryKind::Directory),
        ]);

        assert_eq!(plan.parent, vec![Some(2), Some(2), Some(4), Some(4), None]);
        assert_eq!(plan.pending_children, vec![0, 0, 2, 0, 2]);
        assert_eq!(plan.initially_ready(), vec![0, 1, 3]);
    }

    #[test]
    fn single_entry_plan_is_immediately_ready() {
        let plan = Plan::new(vec![task("/r/file.txt", EntryKind::File)]);
        assert_eq!(plan.parent, vec![None]);
        assert_eq!(plan.initially_ready(), vec![0]);
    }

    fn snapshot(bytes_per_sec: u64, done: u64, total: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            bytes_done: 0,
            bytes_total: 0,
            items_done: done,
            items_total: total,
            throughput_bytes_per_sec: bytes_per_sec,
            throughput_items_per_sec: 0,
            active_workers: 0,
        }
    }

    #[test]
    fn slow_throughput_grows_the_pool() {
        assert!(should_add_worker(
            &snapshot(1024, 5, 100),
            2,
            8,
            Duration::from_secs(1),
        ));
    }

    #[test]
    fn pool_never_exceeds_the_ceiling() {
        assert!(!should_add_worker(
            &snapshot(0, 5, 100),
            8,
            8,
            Duration::from_secs(1),
        ));
    }

    #[test]
    fn fast_pool_stays_at_its_size() {
        assert!(!should_add_worker(
            &snapshot(LOW_WATER_BYTES_PER_SEC * 4, 5, 100),
            2,
            8,
            Duration::from_secs(1),
        ));
    }

    #[test]
    fn cooldown_throttles_scaling() {
        assert!(!should_add_worker(
            &snapshot(0, 5, 100),
            2,
            8,
            Duration::from_millis(10),
        ));
    }

    #[test]
    fn finished_run_never_scales() {
        assert!(!should_add_worker(
            &snapshot(0, 100, 100),
            2,
            8,
            Duration::from_secs(1),
        ));
    }

    #[test]
    fn pool_removes_a_real_tree_bottom_up() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("tree");
        std::fs::create_dir_all(root.join("inner")).expect("mkdir");
        std::fs::write(root.join("inner/a.txt"), b"aaaa").expect("write");
        std::fs::write(root.join("top.txt"), b"bb").expect("write");

        let plan = Plan::new(vec![
            DeletionTask::new(root.join("inner/a.txt"), EntryKind::File, 4),
            DeletionTask::new(root.join("inner"), EntryKind::Directory, 0),
            DeletionTask::new(root.join("top.txt"), EntryKind::File, 2),
            DeletionTask::new(root.clone(), EntryKind::Directory, 0),
        ]);

        let options = DeleteOptions::new();
        let session = LockBreakerSession::new(&options);
        let aggregator = ProgressAggregator::new(plan.len() as u64, plan.total_bytes());
        let mut emitter = ProgressEmitter::disabled();
        let results = run(
            &plan,
            &options,
            &session,
            &aggregator,
            &mut emitter,
            &CancelToken::new(),
        );

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.status() == TaskStatus::Succeeded));
        assert!(!root.exists());

        // Completion order respects the dependency edges even though four
        // tasks raced across workers.
        let position = |p: &Path| results.iter().position(|r| r.path() == p).expect("present");
        assert!(position(&root.join("inner/a.txt")) < position(&root.join("inner")));
        assert!(position(&root.join("inner")) < position(&root));
        assert!(position(&root.join("top.txt")) < position(&root));
    }

    #[test]
    fn cancelled_before_start_dispatches_nothing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("survivor.txt");
        std::fs::write(&file, b"data").expect("write");

        let cancel = CancelToken::new();
        cancel.cancel();

        let plan = Plan::new(vec![DeletionTask::new(file.clone(), EntryKind::File, 4)]);
        let options = DeleteOptions::new();
        let session = LockBreakerSession::new(&options);
        let aggregator = ProgressAggregator::new(1, 4);
        let mut emitter = ProgressEmitter::disabled();
        let results = run(&plan, &options, &session, &aggregator, &mut emitter, &cancel);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status(), TaskStatus::Failed);
        assert!(file.exists());
    }
}
