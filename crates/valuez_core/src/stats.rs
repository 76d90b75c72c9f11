//! Database statistics.
//!
//! Counters are updated by collection actors and the supervisor and can be
//! read at any time through [`crate::Database::stats`].

use std::sync::atomic::{AtomicU64, Ordering};

/// Database statistics.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct DatabaseStats {
    puts: AtomicU64,
    takes: AtomicU64,
    updates: AtomicU64,
    scans: AtomicU64,
    views: AtomicU64,

    transactions_committed: AtomicU64,
    transactions_aborted: AtomicU64,
    transactions_failed: AtomicU64,
    callback_faults: AtomicU64,

    batches_applied: AtomicU64,
    batches_failed: AtomicU64,

    collections_created: AtomicU64,
    collections_deleted: AtomicU64,
}

impl DatabaseStats {
    /// Creates zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_take(&self) {
        self.takes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_view(&self) {
        self.views.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_commit(&self) {
        self.transactions_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_abort(&self) {
        self.transactions_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transaction_failure(&self) {
        self.transactions_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_callback_fault(&self) {
        self.callback_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch_applied(&self) {
        self.batches_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_collection_created(&self) {
        self.collections_created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_collection_deleted(&self) {
        self.collections_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            puts: load(&self.puts),
            takes: load(&self.takes),
            updates: load(&self.updates),
            scans: load(&self.scans),
            views: load(&self.views),
            transactions_committed: load(&self.transactions_committed),
            transactions_aborted: load(&self.transactions_aborted),
            transactions_failed: load(&self.transactions_failed),
            callback_faults: load(&self.callback_faults),
            batches_applied: load(&self.batches_applied),
            batches_failed: load(&self.batches_failed),
            collections_created: load(&self.collections_created),
            collections_deleted: load(&self.collections_deleted),
        }
    }
}

/// A point-in-time snapshot of database statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Successful puts.
    pub puts: u64,
    /// Take requests served.
    pub takes: u64,
    /// Update requests served.
    pub updates: u64,
    /// Direct reads.
    pub scans: u64,
    /// Read-only views opened.
    pub views: u64,
    /// Transactions whose body returned true and whose changes were stored.
    pub transactions_committed: u64,
    /// Transactions whose body returned false.
    pub transactions_aborted: u64,
    /// Transactions that failed in the body or in the durable store.
    pub transactions_failed: u64,
    /// Caller-supplied functions that returned an error or panicked.
    pub callback_faults: u64,
    /// Durable batches applied.
    pub batches_applied: u64,
    /// Durable batches rejected by the store.
    pub batches_failed: u64,
    /// Collections created.
    pub collections_created: u64,
    /// Collections deleted.
    pub collections_deleted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        assert_eq!(DatabaseStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn snapshot() {
        let stats = DatabaseStats::new();
        stats.record_put();
        stats.record_put();
        stats.record_transaction_commit();
        stats.record_batch_failed();

        let snap = stats.snapshot();
        assert_eq!(snap.puts, 2);
        assert_eq!(snap.transactions_committed, 1);
        assert_eq!(snap.batches_failed, 1);
        assert_eq!(snap.takes, 0);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(DatabaseStats::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let s = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    s.record_take();
                    s.record_scan();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        let snap = stats.snapshot();
        assert_eq!(snap.takes, 1000);
        assert_eq!(snap.scans, 1000);
    }
}
