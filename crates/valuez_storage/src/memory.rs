//! In-memory bucket store for testing.

use crate::batch::Batch;
use crate::buckets::BucketMap;
use crate::error::{StorageError, StorageResult};
use crate::store::BucketStore;

/// A bucket store that keeps everything in process memory.
///
/// Suitable for unit tests and as the inner store of fault-injecting
/// wrappers.
///
/// # Example
///
/// ```rust
/// use valuez_storage::{BucketStore, MemoryStore};
///
/// let mut store = MemoryStore::new();
/// store.create_bucket("people").unwrap();
/// assert!(store.contains_bucket("people").unwrap());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: BucketMap,
    batches_applied: u64,
    closed: bool,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of batches applied successfully.
    #[must_use]
    pub fn batches_applied(&self) -> u64 {
        self.batches_applied
    }

    /// Returns true once [`BucketStore::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl BucketStore for MemoryStore {
    fn bucket_names(&self) -> StorageResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.buckets.names())
    }

    fn contains_bucket(&self, name: &str) -> StorageResult<bool> {
        self.ensure_open()?;
        Ok(self.buckets.contains(name))
    }

    fn scan(&self, bucket: &str) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.ensure_open()?;
        self.buckets.scan(bucket)
    }

    fn apply(&mut self, batch: &Batch) -> StorageResult<()> {
        self.ensure_open()?;
        self.buckets.apply(batch)?;
        self.batches_applied += 1;
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        self.ensure_open()?;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_create_and_scan() {
        let mut store = MemoryStore::new();
        store.create_bucket("a").unwrap();

        let mut batch = Batch::new();
        batch
            .put("a", b"2".to_vec(), b"two".to_vec())
            .put("a", b"1".to_vec(), b"one".to_vec());
        store.apply(&batch).unwrap();

        let entries = store.scan("a").unwrap();
        assert_eq!(entries[0].0, b"1");
        assert_eq!(entries[1].0, b"2");
        assert_eq!(store.batches_applied(), 2);
    }

    #[test]
    fn memory_delete_bucket() {
        let mut store = MemoryStore::new();
        store.create_bucket("a").unwrap();
        store.delete_bucket("a").unwrap();

        assert!(!store.contains_bucket("a").unwrap());
        assert!(matches!(
            store.delete_bucket("a"),
            Err(StorageError::BucketNotFound { .. })
        ));
    }

    #[test]
    fn memory_scan_missing_bucket_fails() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.scan("nope"),
            Err(StorageError::BucketNotFound { .. })
        ));
    }

    #[test]
    fn memory_closed_rejects_everything() {
        let mut store = MemoryStore::new();
        store.close().unwrap();

        assert!(store.is_closed());
        assert!(matches!(store.bucket_names(), Err(StorageError::Closed)));
        assert!(matches!(store.create_bucket("a"), Err(StorageError::Closed)));
        assert!(matches!(store.close(), Err(StorageError::Closed)));
    }
}
