//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The named bucket does not exist.
    #[error("bucket not found: {name}")]
    BucketNotFound {
        /// The bucket name.
        name: String,
    },

    /// A bucket with this name already exists.
    #[error("bucket already exists: {name}")]
    BucketExists {
        /// The bucket name.
        name: String,
    },

    /// The storage file is corrupted.
    #[error("storage corrupted: {0}")]
    Corrupted(String),

    /// The store is closed.
    #[error("storage is closed")]
    Closed,

    /// Another handle holds the store's exclusive lock.
    #[error("storage is locked by another process: {}", path.display())]
    Locked {
        /// Path of the locked file.
        path: PathBuf,
    },
}

impl StorageError {
    /// Create a bucket-not-found error.
    pub fn bucket_not_found(name: impl Into<String>) -> Self {
        Self::BucketNotFound { name: name.into() }
    }

    /// Create a bucket-exists error.
    pub fn bucket_exists(name: impl Into<String>) -> Self {
        Self::BucketExists { name: name.into() }
    }

    /// Create a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }
}
