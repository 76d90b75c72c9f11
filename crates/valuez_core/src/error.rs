//! Error types for valuez core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in valuez core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Durable store error.
    #[error("storage error: {0}")]
    Storage(#[from] valuez_storage::StorageError),

    /// Value codec error.
    #[error("codec error: {0}")]
    Codec(#[from] valuez_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A caller-supplied function failed or panicked.
    #[error("{operation} callback failed: {message}")]
    Callback {
        /// Operation that invoked the callback.
        operation: &'static str,
        /// The callback's error message or panic payload.
        message: String,
    },

    /// The durable store rejected a transaction commit.
    #[error("commit failed: {message}")]
    CommitFailed {
        /// Underlying failure.
        message: String,
    },

    /// A mutation was attempted through a read-only view.
    #[error("{operation} not allowed in read-only view")]
    ReadOnlyView {
        /// The rejected operation.
        operation: &'static str,
    },

    /// An operation that cannot run through a transaction handle.
    #[error("{operation} is unusable inside a transaction")]
    NotAllowedInTransaction {
        /// The rejected operation.
        operation: &'static str,
    },

    /// The collection has been deleted or suspended.
    #[error("collection closed: {name}")]
    CollectionClosed {
        /// Name of the collection.
        name: String,
    },

    /// A collection with this name already exists.
    #[error("collection already exists: {name}")]
    CollectionExists {
        /// Name of the collection.
        name: String,
    },

    /// Collection not found.
    #[error("collection not found: {name}")]
    CollectionNotFound {
        /// Name of the collection.
        name: String,
    },

    /// The collection name cannot be used.
    #[error("invalid collection name {name:?}: {reason}")]
    InvalidCollectionName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Shutdown is in progress; new work is refused.
    #[error("database closing")]
    DatabaseClosing,

    /// The database has shut down.
    #[error("database closed")]
    DatabaseClosed,

    /// Invalid operation for current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of the invalid operation.
        message: String,
    },

    /// Persisted data does not have the expected shape.
    #[error("corrupted data: {message}")]
    Corrupted {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Create a callback error.
    pub fn callback(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Callback {
            operation,
            message: message.into(),
        }
    }

    /// Create a commit failed error.
    pub fn commit_failed(message: impl Into<String>) -> Self {
        Self::CommitFailed {
            message: message.into(),
        }
    }

    /// Create a collection closed error.
    pub fn collection_closed(name: impl Into<String>) -> Self {
        Self::CollectionClosed { name: name.into() }
    }

    /// Create a collection exists error.
    pub fn collection_exists(name: impl Into<String>) -> Self {
        Self::CollectionExists { name: name.into() }
    }

    /// Create a collection not found error.
    pub fn collection_not_found(name: impl Into<String>) -> Self {
        Self::CollectionNotFound { name: name.into() }
    }

    /// Create an invalid collection name error.
    pub fn invalid_collection_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidCollectionName {
            name: name.into(),
            reason,
        }
    }

    /// Create an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a corrupted data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Returns true if the error means the target has shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::CollectionClosed { .. } | Self::DatabaseClosing | Self::DatabaseClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(
            CoreError::ReadOnlyView { operation: "put" }.to_string(),
            "put not allowed in read-only view"
        );
        assert_eq!(
            CoreError::collection_closed("users").to_string(),
            "collection closed: users"
        );
        assert_eq!(
            CoreError::callback("take", "boom").to_string(),
            "take callback failed: boom"
        );
    }

    #[test]
    fn storage_errors_convert() {
        let err: CoreError = valuez_storage::StorageError::Closed.into();
        assert!(matches!(err, CoreError::Storage(_)));
    }

    #[test]
    fn closed_family() {
        assert!(CoreError::DatabaseClosed.is_closed());
        assert!(CoreError::collection_closed("a").is_closed());
        assert!(!CoreError::collection_exists("a").is_closed());
    }
}
