//! Fault injection for the durable store.
//!
//! [`FlakyStore`] wraps a [`MemoryStore`] and fails `apply` on demand, so
//! tests can check that a rejected durable batch leaves no trace in memory.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use valuez_storage::{Batch, BucketStore, MemoryStore, StorageError, StorageResult};

#[derive(Debug, Default)]
struct FaultState {
    fail_all: AtomicBool,
    fail_next: AtomicU64,
    injected: AtomicU64,
}

/// Shared control over a [`FlakyStore`].
///
/// Clones control the same store.
#[derive(Debug, Clone, Default)]
pub struct FaultSwitch {
    state: Arc<FaultState>,
}

impl FaultSwitch {
    /// Creates a switch with no faults armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next `count` batches, then recovers.
    pub fn fail_next(&self, count: u64) {
        self.state.fail_next.store(count, Ordering::SeqCst);
    }

    /// Fails every batch until [`FaultSwitch::heal`] is called.
    pub fn fail_all(&self) {
        self.state.fail_all.store(true, Ordering::SeqCst);
    }

    /// Disarms all faults.
    pub fn heal(&self) {
        self.state.fail_all.store(false, Ordering::SeqCst);
        self.state.fail_next.store(0, Ordering::SeqCst);
    }

    /// Number of batches failed so far.
    pub fn injected(&self) -> u64 {
        self.state.injected.load(Ordering::SeqCst)
    }

    fn should_fail(&self) -> bool {
        let armed = self.state.fail_all.load(Ordering::SeqCst)
            || self
                .state
                .fail_next
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
        if armed {
            self.state.injected.fetch_add(1, Ordering::SeqCst);
        }
        armed
    }
}

/// A memory store whose batches fail when its [`FaultSwitch`] says so.
///
/// Reads and `close` are never faulted.
#[derive(Debug)]
pub struct FlakyStore {
    inner: MemoryStore,
    faults: FaultSwitch,
}

impl FlakyStore {
    /// Creates an empty store controlled by `faults`.
    pub fn new(faults: FaultSwitch) -> Self {
        Self::wrap(MemoryStore::new(), faults)
    }

    /// Wraps an existing store.
    pub fn wrap(inner: MemoryStore, faults: FaultSwitch) -> Self {
        Self { inner, faults }
    }

    /// Returns the wrapped store.
    pub fn into_inner(self) -> MemoryStore {
        self.inner
    }
}

impl BucketStore for FlakyStore {
    fn bucket_names(&self) -> StorageResult<Vec<String>> {
        self.inner.bucket_names()
    }

    fn contains_bucket(&self, name: &str) -> StorageResult<bool> {
        self.inner.contains_bucket(name)
    }

    fn scan(&self, bucket: &str) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.inner.scan(bucket)
    }

    fn apply(&mut self, batch: &Batch) -> StorageResult<()> {
        if self.faults.should_fail() {
            return Err(StorageError::Io(io::Error::other(format!(
                "injected fault ({} ops)",
                batch.len()
            ))));
        }
        self.inner.apply(batch)
    }

    fn close(&mut self) -> StorageResult<()> {
        self.inner.close()
    }
}
