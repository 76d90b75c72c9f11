//! Atomic write batches.

/// A single operation inside a [`Batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Create an empty bucket.
    CreateBucket {
        /// Bucket name.
        name: String,
    },
    /// Drop a bucket and all of its entries.
    DropBucket {
        /// Bucket name.
        name: String,
    },
    /// Insert or overwrite an entry.
    Put {
        /// Bucket name.
        bucket: String,
        /// Entry key.
        key: Vec<u8>,
        /// Entry value.
        value: Vec<u8>,
    },
    /// Remove an entry. Removing a missing key is a no-op.
    Delete {
        /// Bucket name.
        bucket: String,
        /// Entry key.
        key: Vec<u8>,
    },
}

impl BatchOp {
    /// Name of the bucket this operation touches.
    #[must_use]
    pub fn bucket(&self) -> &str {
        match self {
            Self::CreateBucket { name } | Self::DropBucket { name } => name,
            Self::Put { bucket, .. } | Self::Delete { bucket, .. } => bucket,
        }
    }
}

/// An ordered list of operations applied all-or-nothing.
///
/// Operations are validated in order, so a batch may create a bucket and
/// then write into it.
///
/// ```
/// use valuez_storage::Batch;
///
/// let mut batch = Batch::new();
/// batch.create_bucket("people").put("people", b"101", b"ada");
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    ops: Vec<BatchOp>,
}

impl Batch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch from existing operations.
    #[must_use]
    pub fn from_ops(ops: Vec<BatchOp>) -> Self {
        Self { ops }
    }

    /// Appends a bucket creation.
    pub fn create_bucket(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(BatchOp::CreateBucket { name: name.into() })
    }

    /// Appends a bucket drop.
    pub fn drop_bucket(&mut self, name: impl Into<String>) -> &mut Self {
        self.push(BatchOp::DropBucket { name: name.into() })
    }

    /// Appends a put.
    pub fn put(
        &mut self,
        bucket: impl Into<String>,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.push(BatchOp::Put {
            bucket: bucket.into(),
            key: key.into(),
            value: value.into(),
        })
    }

    /// Appends a delete.
    pub fn delete(&mut self, bucket: impl Into<String>, key: impl Into<Vec<u8>>) -> &mut Self {
        self.push(BatchOp::Delete {
            bucket: bucket.into(),
            key: key.into(),
        })
    }

    /// Appends an arbitrary operation.
    pub fn push(&mut self, op: BatchOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    /// Returns the operations in order.
    #[must_use]
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Returns the number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if the batch has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl IntoIterator for Batch {
    type Item = BatchOp;
    type IntoIter = std::vec::IntoIter<BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_keeps_order() {
        let mut batch = Batch::new();
        batch
            .create_bucket("a")
            .put("a", b"k".to_vec(), b"v".to_vec())
            .delete("a", b"k".to_vec())
            .drop_bucket("a");

        let buckets: Vec<_> = batch.ops().iter().map(BatchOp::bucket).collect();
        assert_eq!(buckets, ["a", "a", "a", "a"]);
        assert!(matches!(batch.ops()[0], BatchOp::CreateBucket { .. }));
        assert!(matches!(batch.ops()[3], BatchOp::DropBucket { .. }));
    }

    #[test]
    fn empty_batch() {
        let batch = Batch::new();
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }
}
