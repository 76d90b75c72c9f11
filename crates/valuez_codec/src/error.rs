//! Codec errors.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while turning values into bytes and back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The serializer failed.
    #[error("cannot encode value: {0}")]
    Encode(String),

    /// The input is not a well-formed data item.
    #[error("cannot decode value: {0}")]
    Decode(String),

    /// A well-formed item followed by extra bytes.
    #[error("{count} trailing bytes after data item")]
    TrailingBytes {
        /// Number of extra bytes.
        count: usize,
    },

    /// The input holds a data item with no `Value` counterpart.
    #[error("unsupported data item: {item}")]
    Unsupported {
        /// What was found.
        item: String,
    },

    /// Integer does not fit in an `i64`.
    #[error("integer out of i64 range")]
    IntegerOverflow,
}

impl CodecError {
    pub(crate) fn unsupported(item: impl Into<String>) -> Self {
        Self::Unsupported { item: item.into() }
    }
}
