//! Sliding-window rate accounting.
//!
//! Throughput is measured over a short ring of fixed-duration buckets rather
//! than as a cumulative average, so scaling decisions react to recent
//! conditions instead of the whole run's history.

use std::time::{Duration, Instant};

const MICROS_PER_SECOND: u64 = 1_000_000;

/// Duration of one accounting bucket.
pub(crate) const BUCKET: Duration = Duration::from_millis(250);

/// Number of buckets kept; together they span the measurement window.
pub(crate) const BUCKET_COUNT: usize = 12;

#[derive(Clone, Copy, Debug, Default)]
struct Bucket {
    epoch: u64,
    bytes: u64,
    items: u64,
}

/// Ring of completion counts over the trailing window.
#[derive(Debug)]
pub(crate) struct RateWindow {
    origin: Instant,
    buckets: [Bucket; BUCKET_COUNT],
}

impl RateWindow {
    pub(crate) fn new(origin: Instant) -> Self {
        Self {
            origin,
            buckets: [Bucket::default(); BUCKET_COUNT],
        }
    }

    fn epoch_of(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.origin);
        (elapsed.as_micros() / u128::from(BUCKET.as_micros() as u64)) as u64
    }

    /// Records a completed item and the bytes it freed.
    pub(crate) fn record(&mut self, now: Instant, bytes: u64) {
        let epoch = self.epoch_of(now);
        let slot = (epoch as usize) % BUCKET_COUNT;
        let bucket = &mut self.buckets[slot];
        if bucket.epoch != epoch {
            *bucket = Bucket {
                epoch,
                bytes: 0,
                items: 0,
            };
        }
        bucket.bytes = bucket.bytes.saturating_add(bytes);
        bucket.items = bucket.items.saturating_add(1);
    }

    /// Returns the windowed `(bytes_per_sec, items_per_sec)` rates.
    pub(crate) fn rates(&self, now: Instant) -> (u64, u64) {
        let epoch = self.epoch_of(now);
        let oldest = epoch.saturating_sub(BUCKET_COUNT as u64 - 1);

        let mut bytes = 0u64;
        let mut items = 0u64;
        for bucket in &self.buckets {
            if bucket.epoch >= oldest && bucket.epoch <= epoch && (bucket.items | bucket.bytes) != 0
            {
                bytes = bytes.saturating_add(bucket.bytes);
                items = items.saturating_add(bucket.items);
            }
        }

        let window = now
            .saturating_duration_since(self.origin)
            .min(BUCKET * BUCKET_COUNT as u32)
            .max(BUCKET);
        let micros = window.as_micros() as u64;
        (
            bytes.saturating_mul(MICROS_PER_SECOND) / micros,
            items.saturating_mul(MICROS_PER_SECOND) / micros,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_reports_zero() {
        let origin = Instant::now();
        let window = RateWindow::new(origin);
        assert_eq!(window.rates(origin + Duration::from_secs(1)), (0, 0));
    }

    #[test]
    fn rate_reflects_recent_bytes() {
        let origin = Instant::now();
        let mut window = RateWindow::new(origin);
        for i in 0..4 {
            window.record(origin + BUCKET * i, 1000);
        }
        let (bytes_per_sec, items_per_sec) = window.rates(origin + BUCKET * 4);
        // 4000 bytes over one second.
        assert_eq!(bytes_per_sec, 4000);
        assert_eq!(items_per_sec, 4);
    }

    #[test]
    fn old_buckets_age_out() {
        let origin = Instant::now();
        let mut window = RateWindow::new(origin);
        window.record(origin, 1_000_000);

        // Far past the window: the old bucket no longer counts.
        let later = origin + BUCKET * (BUCKET_COUNT as u32 * 3);
        let (bytes_per_sec, _) = window.rates(later);
        assert_eq!(bytes_per_sec, 0);
    }

    #[test]
    fn rate_is_windowed_not_cumulative() {
        let origin = Instant::now();
        let mut window = RateWindow::new(origin);
        // A burst long ago followed by a quiet recent window must not
        // inflate the reported rate.
        window.record(origin, 100_000);
        let later = origin + BUCKET * (BUCKET_COUNT as u32 + 4);
        window.record(later, 100);
        let (bytes_per_sec, _) = window.rates(later);
        assert!(bytes_per_sec < 100_000 / 3);
    }
}
