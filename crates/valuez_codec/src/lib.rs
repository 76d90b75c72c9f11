//! # valuez codec
//!
//! The value type stored by valuez collections and the codec boundary
//! between values and the bytes kept in the durable store.
//!
//! The store treats values as opaque. The only contract a codec must honor
//! is that `decode(encode(v)) == v`, and it must not call back into the
//! database: codecs run on the database supervisor thread and during warm
//! start.
//!
//! ## Usage
//!
//! ```
//! use valuez_codec::{CborCodec, Codec, Value};
//!
//! let codec = CborCodec::new();
//! let value = Value::Integer(42);
//! let bytes = codec.encode(&value).unwrap();
//! assert_eq!(codec.decode(&bytes).unwrap(), value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod value;

pub use cbor::CborCodec;
pub use error::{CodecError, CodecResult};
pub use value::Value;

/// Converts values to and from their stored byte form.
///
/// Implementations must be deterministic round-trips and must be usable
/// from any thread.
pub trait Codec: Send + Sync {
    /// Encodes a value to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented.
    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>>;

    /// Decodes a value previously produced by [`Codec::encode`].
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed.
    fn decode(&self, bytes: &[u8]) -> CodecResult<Value>;

    /// Short name used in logs and tooling output.
    fn name(&self) -> &'static str {
        "custom"
    }
}
