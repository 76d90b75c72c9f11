//! In-memory bucket tree shared by every store implementation.

use crate::batch::{Batch, BatchOp};
use crate::error::{StorageError, StorageResult};
use std::collections::{BTreeMap, HashSet};

type Bucket = BTreeMap<Vec<u8>, Vec<u8>>;

/// Named buckets of ordered key/value entries.
///
/// Batches go through [`BucketMap::validate`] before [`BucketMap::apply`]
/// touches anything, which is what makes `apply` all-or-nothing.
#[derive(Debug, Clone, Default)]
pub(crate) struct BucketMap {
    buckets: BTreeMap<String, Bucket>,
}

impl BucketMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.buckets.keys().cloned().collect()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.buckets.contains_key(name)
    }

    pub(crate) fn scan(&self, name: &str) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let bucket = self
            .buckets
            .get(name)
            .ok_or_else(|| StorageError::bucket_not_found(name))?;
        Ok(bucket
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    /// Total number of entries across all buckets.
    pub(crate) fn entry_count(&self) -> usize {
        self.buckets.values().map(BTreeMap::len).sum()
    }

    /// Checks that every operation would succeed when applied in order.
    pub(crate) fn validate(&self, batch: &Batch) -> StorageResult<()> {
        let mut created: HashSet<&str> = HashSet::new();
        let mut dropped: HashSet<&str> = HashSet::new();

        let exists = |name: &str, created: &HashSet<&str>, dropped: &HashSet<&str>| {
            created.contains(name) || (self.buckets.contains_key(name) && !dropped.contains(name))
        };

        for op in batch.ops() {
            let name = op.bucket();
            match op {
                BatchOp::CreateBucket { .. } => {
                    if exists(name, &created, &dropped) {
                        return Err(StorageError::bucket_exists(name));
                    }
                    created.insert(name);
                    dropped.remove(name);
                }
                BatchOp::DropBucket { .. } => {
                    if !exists(name, &created, &dropped) {
                        return Err(StorageError::bucket_not_found(name));
                    }
                    created.remove(name);
                    dropped.insert(name);
                }
                BatchOp::Put { .. } | BatchOp::Delete { .. } => {
                    if !exists(name, &created, &dropped) {
                        return Err(StorageError::bucket_not_found(name));
                    }
                }
            }
        }
        Ok(())
    }

    /// Applies a batch that has already passed [`BucketMap::validate`].
    pub(crate) fn apply_validated(&mut self, batch: &Batch) {
        for op in batch.ops() {
            match op {
                BatchOp::CreateBucket { name } => {
                    self.buckets.insert(name.clone(), Bucket::new());
                }
                BatchOp::DropBucket { name } => {
                    self.buckets.remove(name);
                }
                BatchOp::Put { bucket, key, value } => {
                    if let Some(entries) = self.buckets.get_mut(bucket) {
                        entries.insert(key.clone(), value.clone());
                    }
                }
                BatchOp::Delete { bucket, key } => {
                    if let Some(entries) = self.buckets.get_mut(bucket) {
                        entries.remove(key);
                    }
                }
            }
        }
    }

    pub(crate) fn apply(&mut self, batch: &Batch) -> StorageResult<()> {
        self.validate(batch)?;
        self.apply_validated(batch);
        Ok(())
    }

    /// Rebuilds the contents as one batch that recreates them from empty.
    pub(crate) fn to_batch(&self) -> Batch {
        let mut batch = Batch::new();
        for (name, entries) in &self.buckets {
            batch.create_bucket(name.clone());
            for (key, value) in entries {
                batch.put(name.clone(), key.clone(), value.clone());
            }
        }
        batch
    }
}
