//! CBOR codec backed by `ciborium`.

use crate::error::{CodecError, CodecResult};
use crate::value::Value;
use crate::Codec;
use ciborium::value::{Integer, Value as Cbor};

/// The default codec: one CBOR data item per stored value.
///
/// ```
/// use valuez_codec::{CborCodec, Codec, Value};
///
/// let codec = CborCodec::new();
/// let bytes = codec.encode(&Value::from("hello")).unwrap();
/// assert_eq!(codec.decode(&bytes).unwrap(), Value::from("hello"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl CborCodec {
    /// Creates the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Codec for CborCodec {
    fn encode(&self, value: &Value) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&to_cbor(value), &mut buf)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Value> {
        let mut reader = bytes;
        let item: Cbor = ciborium::de::from_reader(&mut reader)
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        if !reader.is_empty() {
            return Err(CodecError::TrailingBytes {
                count: reader.len(),
            });
        }
        from_cbor(item)
    }

    fn name(&self) -> &'static str {
        "cbor"
    }
}

fn to_cbor(value: &Value) -> Cbor {
    match value {
        Value::Null => Cbor::Null,
        Value::Bool(b) => Cbor::Bool(*b),
        Value::Integer(n) => Cbor::Integer(Integer::from(*n)),
        Value::Bytes(b) => Cbor::Bytes(b.clone()),
        Value::Text(s) => Cbor::Text(s.clone()),
        Value::Array(items) => Cbor::Array(items.iter().map(to_cbor).collect()),
        Value::Map(pairs) => Cbor::Map(
            pairs
                .iter()
                .map(|(k, v)| (to_cbor(k), to_cbor(v)))
                .collect(),
        ),
    }
}

fn from_cbor(item: Cbor) -> CodecResult<Value> {
    match item {
        Cbor::Null => Ok(Value::Null),
        Cbor::Bool(b) => Ok(Value::Bool(b)),
        Cbor::Integer(n) => i64::try_from(n)
            .map(Value::Integer)
            .map_err(|_| CodecError::IntegerOverflow),
        Cbor::Bytes(b) => Ok(Value::Bytes(b)),
        Cbor::Text(s) => Ok(Value::Text(s)),
        Cbor::Array(items) => items
            .into_iter()
            .map(from_cbor)
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Array),
        Cbor::Map(pairs) => pairs
            .into_iter()
            .map(|(k, v)| Ok((from_cbor(k)?, from_cbor(v)?)))
            .collect::<CodecResult<Vec<_>>>()
            .map(Value::Map),
        Cbor::Float(_) => Err(CodecError::unsupported("float")),
        Cbor::Tag(tag, _) => Err(CodecError::unsupported(format!("tag {tag}"))),
        _ => Err(CodecError::unsupported("unknown")),
    }
}
