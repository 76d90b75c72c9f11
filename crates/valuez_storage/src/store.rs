//! The bucket store trait.

use crate::batch::Batch;
use crate::error::StorageResult;

/// A durable store of named buckets holding ordered byte entries.
///
/// The store is owned by a single writer. It never interprets keys or
/// values.
///
/// # Invariants
///
/// - [`BucketStore::apply`] is all-or-nothing: on error nothing from the
///   batch is visible, in memory or on disk
/// - [`BucketStore::scan`] returns entries in ascending key order
/// - after [`BucketStore::close`] every operation fails with
///   [`crate::StorageError::Closed`]
///
/// # Implementors
///
/// - [`super::MemoryStore`] - For testing and ephemeral data
/// - [`super::FileStore`] - Append-only log file
pub trait BucketStore: Send {
    /// Returns the names of all buckets in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed.
    fn bucket_names(&self) -> StorageResult<Vec<String>>;

    /// Returns true if the bucket exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed.
    fn contains_bucket(&self, name: &str) -> StorageResult<bool>;

    /// Returns every entry of a bucket in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the bucket does not exist or the store is closed.
    fn scan(&self, bucket: &str) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>>;

    /// Applies a batch atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if any operation is invalid, the write fails, or the
    /// store is closed. The store is unchanged in every case.
    fn apply(&mut self, batch: &Batch) -> StorageResult<()>;

    /// Creates an empty bucket.
    ///
    /// # Errors
    ///
    /// Returns `BucketExists` if the bucket is already present.
    fn create_bucket(&mut self, name: &str) -> StorageResult<()> {
        let mut batch = Batch::new();
        batch.create_bucket(name);
        self.apply(&batch)
    }

    /// Drops a bucket and all its entries.
    ///
    /// # Errors
    ///
    /// Returns `BucketNotFound` if the bucket does not exist.
    fn delete_bucket(&mut self, name: &str) -> StorageResult<()> {
        let mut batch = Batch::new();
        batch.drop_bucket(name);
        self.apply(&batch)
    }

    /// Flushes and releases the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails or the store is already closed.
    fn close(&mut self) -> StorageResult<()>;
}
