//! 📊 Run statistics: what we listed, what we fetched, and how long it took.
//!
//! ⚠️ Two different byte counts live here and they are NOT the same thing:
//! - [`RunStats::total_bytes`] is summed from listing metadata by the lister.
//!   It reflects what the bucket *says* it holds, fetched or not.
//! - [`FetchOutcome::bytes_read`] is what the handlers actually consumed.
//!
//! If every fetch fails, the first number doesn't budge. That's deliberate:
//! the total is a listing-time count, not a download-success count.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// 🧮 Per-key outcomes, bumped concurrently by every worker.
///
/// Relaxed atomics are enough: nobody reads these until the join barrier,
/// and joining a task already orders everything it did before it exited.
#[derive(Debug, Default)]
pub(crate) struct FetchTally {
    processed: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    bytes_read: AtomicU64,
}

impl FetchTally {
    pub(crate) fn record_success(&self, bytes: u64) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> FetchOutcome {
        FetchOutcome {
            processed: self.processed.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
        }
    }
}

/// 📸 A frozen copy of the [`FetchTally`], taken after every worker exited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Keys a worker picked up and finished with, one way or another.
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    /// Bytes the handlers reported consuming.
    pub bytes_read: u64,
}

/// 📊 Everything a run has to say for itself.
///
/// Owned by the supervisor. `object_count` and `total_bytes` are only ever
/// written by the lister, on the supervisor's own task. No locks required.
#[derive(Debug, Clone)]
pub struct RunStats {
    /// Objects listed (and therefore enqueued).
    pub object_count: u64,
    /// Sum of listed sizes.
    pub total_bytes: u64,
    /// Worker outcomes, filled in once the pool has drained.
    pub fetch: FetchOutcome,
    started_at: Instant,
    finished_at: Option<Instant>,
}

impl RunStats {
    pub(crate) fn start() -> Self {
        Self {
            object_count: 0,
            total_bytes: 0,
            fetch: FetchOutcome::default(),
            started_at: Instant::now(),
            finished_at: None,
        }
    }

    pub(crate) fn record_listed(&mut self, size: u64) {
        self.object_count += 1;
        self.total_bytes = self.total_bytes.saturating_add(size);
    }

    pub(crate) fn finish(&mut self, fetch: FetchOutcome) {
        self.fetch = fetch;
        self.finished_at = Some(Instant::now());
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// ⏱️ Wall time from start to finish, or to now if the run is still going.
    /// Setup (credentials, client) is included; the clock starts before it.
    pub fn elapsed(&self) -> Duration {
        self.finished_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.started_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_listing_adds_up_and_fetching_stays_out_of_it() {
        let mut the_stats = RunStats::start();
        for size in [10, 20, 5] {
            the_stats.record_listed(size);
        }

        let the_tally = FetchTally::default();
        the_tally.record_failure();
        the_tally.record_failure();
        the_tally.record_success(5);
        the_stats.finish(the_tally.snapshot());

        assert_eq!(the_stats.object_count, 3);
        assert_eq!(the_stats.total_bytes, 35);
        assert_eq!(
            the_stats.fetch,
            FetchOutcome {
                processed: 3,
                succeeded: 1,
                failed: 2,
                bytes_read: 5,
            }
        );
        assert!(the_stats.is_finished());
    }

    #[test]
    fn the_one_where_elapsed_freezes_at_the_finish_line() {
        let mut the_stats = RunStats::start();
        the_stats.finish(FetchOutcome::default());
        let first = the_stats.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(the_stats.elapsed(), first);
    }

    #[test]
    fn the_one_where_a_huge_bucket_saturates_instead_of_wrapping() {
        let mut the_stats = RunStats::start();
        the_stats.record_listed(u64::MAX);
        the_stats.record_listed(1);
        assert_eq!(the_stats.total_bytes, u64::MAX);
        assert_eq!(the_stats.object_count, 2);
    }
}
