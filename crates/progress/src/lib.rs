#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `progress` is the single source of truth for the counters shared across
//! deletion workers. The [`ProgressAggregator`] owns atomic byte/item
//! counters plus a sliding-window throughput measurement; workers record
//! completions concurrently and the scheduler reads consistent
//! [`ProgressSnapshot`] values to drive its scaling decisions.
//!
//! # Design
//!
//! - Counters are plain atomics; concurrent workers never lose an increment.
//! - Throughput is computed over a trailing window of fixed-duration
//!   buckets, not as a cumulative average, so the reported rate reacts to
//!   recent conditions.
//! - [`ProgressEmitter`] rate-limits snapshot delivery to a subscriber and
//!   always delivers the final snapshot.
//!
//! # Invariants
//!
//! - `bytes_done <= bytes_total` and `items_done <= items_total` for every
//!   snapshot taken during a run.
//! - Snapshots taken in sequence observe non-decreasing `bytes_done` and
//!   `items_done`.

mod emitter;
mod window;

pub use emitter::ProgressEmitter;

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use window::RateWindow;

/// Immutable point-in-time view of the aggregate counters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgressSnapshot {
    /// Bytes freed by completed deletions so far.
    pub bytes_done: u64,
    /// Total bytes enumerated for the run.
    pub bytes_total: u64,
    /// Tasks that have completed (successfully or not).
    pub items_done: u64,
    /// Total tasks enumerated for the run.
    pub items_total: u64,
    /// Recent deletion rate in bytes per second (sliding window).
    pub throughput_bytes_per_sec: u64,
    /// Recent completion rate in items per second (sliding window).
    pub throughput_items_per_sec: u64,
    /// Number of workers currently running.
    pub active_workers: usize,
}

impl ProgressSnapshot {
    /// Reports whether every enumerated task has completed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.items_done >= self.items_total
    }
}

/// Shared, thread-safe progress counters for one deletion run.
#[derive(Debug)]
pub struct ProgressAggregator {
    items_total: u64,
    bytes_total: u64,
    items_done: AtomicU64,
    bytes_done: AtomicU64,
    active_workers: AtomicUsize,
    window: Mutex<RateWindow>,
}

impl ProgressAggregator {
    /// Creates an aggregator for a run with the given totals.
    #[must_use]
    pub fn new(items_total: u64, bytes_total: u64) -> Self {
        Self {
            items_total,
            bytes_total,
            items_done: AtomicU64::new(0),
            bytes_done: AtomicU64::new(0),
            active_workers: AtomicUsize::new(0),
            window: Mutex::new(RateWindow::new(Instant::now())),
        }
    }

    /// Records a successfully deleted entry and the bytes it freed.
    pub fn record_success(&self, bytes: u64) {
        self.bytes_done.fetch_add(bytes, Ordering::AcqRel);
        self.items_done.fetch_add(1, Ordering::AcqRel);
        self.lock_window().record(Instant::now(), bytes);
    }

    /// Records a task that completed without deleting its entry.
    pub fn record_failure(&self) {
        self.items_done.fetch_add(1, Ordering::AcqRel);
        self.lock_window().record(Instant::now(), 0);
    }

    /// Publishes the current worker count for inclusion in snapshots.
    pub fn set_active_workers(&self, workers: usize) {
        self.active_workers.store(workers, Ordering::Release);
    }

    /// Takes a consistent point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        let (throughput_bytes_per_sec, throughput_items_per_sec) =
            self.lock_window().rates(Instant::now());
        ProgressSnapshot {
            bytes_done: self.bytes_done.load(Ordering::Acquire),
            bytes_total: self.bytes_total,
            items_done: self.items_done.load(Ordering::Acquire),
            items_total: self.items_total,
            throughput_bytes_per_sec,
            throughput_items_per_sec,
            active_workers: self.active_workers.load(Ordering::Acquire),
        }
    }

    fn lock_window(&self) -> std::sync::MutexGuard<'_, RateWindow> {
        self.window
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
