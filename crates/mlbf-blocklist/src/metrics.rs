//! Metrics hooks for generation cycles
//!
//! Counters are plain atomics so the recorder can be shared between the
//! service and whatever exports them.
//!
//! ## Usage
//!
//! ```ignore
//! use mlbf_blocklist::metrics::{Metrics, MetricsRecorder};
//!
//! let metrics = Metrics::new();
//! metrics.record_base_built(12_000, 96_000, Duration::from_millis(40));
//! println!("{:?}", metrics.snapshot());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Thread-safe counters for the generation service
#[derive(Default)]
pub struct Metrics {
    /// Base filters built and published
    pub bases_built: AtomicU64,
    /// Stashes published
    pub stashes_published: AtomicU64,
    /// Cycles that found nothing to publish
    pub cycles_skipped: AtomicU64,
    /// Cycles that failed
    pub cycles_failed: AtomicU64,
    /// GUIDs left out of a snapshot because their versions could not be read
    pub guids_skipped: AtomicU64,
    /// Blocked entries in the most recent snapshot
    pub last_blocked_count: AtomicU64,
    /// Total size of published base filters in bits
    pub filter_bits_published: AtomicU64,
    /// Cumulative base build time in nanoseconds
    pub build_time_ns: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a published base filter
    ///
    /// # Arguments
    /// * `blocked_count` - Blocked entries in the snapshot
    /// * `size_bits` - Combined size of both layers
    /// * `duration` - Time spent building the filter
    pub fn record_base_built(&self, blocked_count: usize, size_bits: usize, duration: Duration) {
        self.bases_built.fetch_add(1, Ordering::Relaxed);
        self.last_blocked_count.store(blocked_count as u64, Ordering::Relaxed);
        self.filter_bits_published.fetch_add(size_bits as u64, Ordering::Relaxed);
        self.build_time_ns.fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    pub fn record_stash_published(&self, blocked_count: usize) {
        self.stashes_published.fetch_add(1, Ordering::Relaxed);
        self.last_blocked_count.store(blocked_count as u64, Ordering::Relaxed);
    }

    pub fn record_cycle_skipped(&self) {
        self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_failed(&self) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_guids_skipped(&self, count: usize) {
        self.guids_skipped.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            bases_built: self.bases_built.load(Ordering::Relaxed),
            stashes_published: self.stashes_published.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            guids_skipped: self.guids_skipped.load(Ordering::Relaxed),
            last_blocked_count: self.last_blocked_count.load(Ordering::Relaxed),
            filter_bits_published: self.filter_bits_published.load(Ordering::Relaxed),
            avg_build_ns: self.avg_build_time_ns(),
        }
    }

    /// Average base build time in nanoseconds
    pub fn avg_build_time_ns(&self) -> u64 {
        let total = self.build_time_ns.load(Ordering::Relaxed);
        let count = self.bases_built.load(Ordering::Relaxed);
        if count > 0 {
            total / count
        } else {
            0
        }
    }

    pub fn reset(&self) {
        self.bases_built.store(0, Ordering::Relaxed);
        self.stashes_published.store(0, Ordering::Relaxed);
        self.cycles_skipped.store(0, Ordering::Relaxed);
        self.cycles_failed.store(0, Ordering::Relaxed);
        self.guids_skipped.store(0, Ordering::Relaxed);
        self.last_blocked_count.store(0, Ordering::Relaxed);
        self.filter_bits_published.store(0, Ordering::Relaxed);
        self.build_time_ns.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub bases_built: u64,
    pub stashes_published: u64,
    pub cycles_skipped: u64,
    pub cycles_failed: u64,
    pub guids_skipped: u64,
    pub last_blocked_count: u64,
    pub filter_bits_published: u64,
    pub avg_build_ns: u64,
}

/// Hook for exporting cycle metrics to an external system
pub trait MetricsRecorder: Send + Sync {
    fn record_base_built(&self, blocked_count: usize, size_bits: usize, duration: Duration);
    fn record_stash_published(&self, blocked_count: usize);
    fn record_cycle_skipped(&self);
    fn record_cycle_failed(&self);
    fn record_guids_skipped(&self, count: usize);
}

/// No-op metrics recorder for when metrics are disabled
#[derive(Default)]
pub struct NoOpMetrics;

impl MetricsRecorder for NoOpMetrics {
    fn record_base_built(&self, _: usize, _: usize, _: Duration) {}
    fn record_stash_published(&self, _: usize) {}
    fn record_cycle_skipped(&self) {}
    fn record_cycle_failed(&self) {}
    fn record_guids_skipped(&self, _: usize) {}
}

impl MetricsRecorder for Metrics {
    fn record_base_built(&self, blocked_count: usize, size_bits: usize, duration: Duration) {
        Metrics::record_base_built(self, blocked_count, size_bits, duration);
    }

    fn record_stash_published(&self, blocked_count: usize) {
        Metrics::record_stash_published(self, blocked_count);
    }

    fn record_cycle_skipped(&self) {
        Metrics::record_cycle_skipped(self);
    }

    fn record_cycle_failed(&self) {
        Metrics::record_cycle_failed(self);
    }

    fn record_guids_skipped(&self, count: usize) {
        Metrics::record_guids_skipped(self, count);
    }
}

impl<T: MetricsRecorder + ?Sized> MetricsRecorder for std::sync::Arc<T> {
    fn record_base_built(&self, blocked_count: usize, size_bits: usize, duration: Duration) {
        (**self).record_base_built(blocked_count, size_bits, duration);
    }

    fn record_stash_published(&self, blocked_count: usize) {
        (**self).record_stash_published(blocked_count);
    }

    fn record_cycle_skipped(&self) {
        (**self).record_cycle_skipped();
    }

    fn record_cycle_failed(&self) {
        (**self).record_cycle_failed();
    }

    fn record_guids_skipped(&self, count: usize) {
        (**self).record_guids_skipped(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot, MetricsSnapshot::default());
    }

    #[test]
    fn test_record_bases() {
        let metrics = Metrics::new();
        metrics.record_base_built(10, 1000, Duration::from_nanos(100));
        metrics.record_base_built(12, 2000, Duration::from_nanos(300));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.bases_built, 2);
        assert_eq!(snapshot.last_blocked_count, 12);
        assert_eq!(snapshot.filter_bits_published, 3000);
        assert_eq!(snapshot.avg_build_ns, 200);
    }

    #[test]
    fn test_stash_updates_blocked_gauge() {
        let metrics = Metrics::new();
        metrics.record_base_built(10, 1000, Duration::ZERO);
        metrics.record_stash_published(11);
        assert_eq!(metrics.snapshot().last_blocked_count, 11);
        assert_eq!(metrics.snapshot().stashes_published, 1);
    }

    #[test]
    fn test_reset() {
        let metrics = Metrics::new();
        metrics.record_cycle_skipped();
        metrics.record_cycle_failed();
        metrics.record_guids_skipped(4);
        metrics.reset();
        assert_eq!(metrics.snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_recorder_through_arc() {
        let metrics = std::sync::Arc::new(Metrics::new());
        let recorder: &dyn MetricsRecorder = &metrics;
        recorder.record_guids_skipped(3);
        assert_eq!(metrics.snapshot().guids_skipped, 3);
    }

    #[test]
    fn test_noop_metrics() {
        let metrics = NoOpMetrics;
        metrics.record_base_built(1, 1, Duration::ZERO);
        metrics.record_stash_published(1);
        metrics.record_cycle_skipped();
        metrics.record_cycle_failed();
        metrics.record_guids_skipped(1);
    }
}
