//! Rate-limited delivery of progress snapshots to a subscriber.

use std::time::{Duration, Instant};

use crate::ProgressSnapshot;

/// Forwards snapshots to a caller-supplied callback, never faster than a
/// configured minimum interval. The final snapshot of a run bypasses the
/// throttle so subscribers always observe the terminal state.
pub struct ProgressEmitter<'cb> {
    callback: Option<Box<dyn FnMut(ProgressSnapshot) + Send + 'cb>>,
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl std::fmt::Debug for ProgressEmitter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressEmitter")
            .field("subscribed", &self.callback.is_some())
            .field("min_interval", &self.min_interval)
            .field("last_emit", &self.last_emit)
            .finish()
    }
}

impl<'cb> ProgressEmitter<'cb> {
    /// Creates an emitter that forwards snapshots to `callback`.
    #[must_use]
    pub fn new(
        callback: Box<dyn FnMut(ProgressSnapshot) + Send + 'cb>,
        min_interval: Duration,
    ) -> Self {
        Self {
            callback: Some(callback),
            min_interval,
            last_emit: None,
        }
    }

    /// Creates an emitter with no subscriber; all emissions are no-ops.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            callback: None,
            min_interval: Duration::ZERO,
            last_emit: None,
        }
    }

    /// Offers a snapshot to the subscriber, honouring the minimum interval.
    ///
    /// Returns `true` when the snapshot was actually delivered.
    pub fn emit(&mut self, snapshot: ProgressSnapshot) -> bool {
        let Some(callback) = self.callback.as_mut() else {
            return false;
        };
        let now = Instant::now();
        if let Some(last) = self.last_emit {
            if now.saturating_duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_emit = Some(now);
        callback(snapshot);
        true
    }

    /// Delivers the terminal snapshot unconditionally.
    pub fn emit_final(&mut self, snapshot: ProgressSnapshot) {
        if let Some(callback) = self.callback.as_mut() {
            self.last_emit = Some(Instant::now());
            callback(snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    fn snapshot(items_done: u64) -> ProgressSnapshot {
        ProgressSnapshot {
            bytes_done: 0,
            bytes_total: 0,
            items_done,
            items_total: 10,
            throughput_bytes_per_sec: 0,
            throughput_items_per_sec: 0,
            active_workers: 1,
        }
    }

    #[test]
    fn disabled_emitter_delivers_nothing() {
        let mut emitter = ProgressEmitter::disabled();
        assert!(!emitter.emit(snapshot(1)));
        emitter.emit_final(snapshot(2));
    }

    #[test]
    fn zero_interval_delivers_every_snapshot() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut emitter = ProgressEmitter::new(
            Box::new(move |snapshot| sink.lock().expect("lock").push(snapshot.items_done)),
            Duration::ZERO,
        );
        for i in 0..3 {
            assert!(emitter.emit(snapshot(i)));
        }
        assert_eq!(*seen.lock().expect("lock"), vec![0, 1, 2]);
    }

    #[test]
    fn throttle_suppresses_rapid_snapshots_but_not_final() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut emitter = ProgressEmitter::new(
            Box::new(move |snapshot| sink.lock().expect("lock").push(snapshot.items_done)),
            Duration::from_secs(3600),
        );
        assert!(emitter.emit(snapshot(0)));
        assert!(!emitter.emit(snapshot(1)));
        assert!(!emitter.emit(snapshot(2)));
        emitter.emit_final(snapshot(10));
        assert_eq!(*seen.lock().expect("lock"), vec![0, 10]);
    }
}
