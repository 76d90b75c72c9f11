//! Dynamic value type stored in collections.

/// A dynamic value.
///
/// Collections hold `Value`s opaquely: the store never inspects them except
/// through caller-supplied predicates and update functions. Floats are not
/// representable so that `Value` stays `Eq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Text string (UTF-8).
    Text(String),
    /// Array of values.
    Array(Vec<Value>),
    /// Map of key-value pairs, in insertion order.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Wraps key-value pairs as a map, keeping their order.
    pub fn map(pairs: Vec<(Value, Value)>) -> Self {
        Self::Map(pairs)
    }

    /// Creates a map value from text keys.
    ///
    /// ```
    /// use valuez_codec::Value;
    ///
    /// let user = Value::record([("name", Value::from("ada")), ("age", Value::from(36))]);
    /// assert_eq!(user.get("age"), Some(&Value::Integer(36)));
    /// ```
    pub fn record<'a>(fields: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Value::Map(
            fields
                .into_iter()
                .map(|(k, v)| (Value::Text(k.to_string()), v))
                .collect(),
        )
    }

    /// Returns a short name for the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        *self == Self::Null
    }

    /// The boolean, for [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        if let Self::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// The integer, for [`Value::Integer`].
    pub fn as_integer(&self) -> Option<i64> {
        if let Self::Integer(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    /// The bytes, for [`Value::Bytes`].
    pub fn as_bytes(&self) -> Option<&[u8]> {
        if let Self::Bytes(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// The string, for [`Value::Text`].
    pub fn as_text(&self) -> Option<&str> {
        if let Self::Text(text) = self {
            Some(text)
        } else {
            None
        }
    }

    /// The elements, for [`Value::Array`].
    pub fn as_array(&self) -> Option<&[Value]> {
        if let Self::Array(items) = self {
            Some(items)
        } else {
            None
        }
    }

    /// The entries, for [`Value::Map`].
    pub fn as_map(&self) -> Option<&[(Value, Value)]> {
        if let Self::Map(pairs) = self {
            Some(pairs)
        } else {
            None
        }
    }

    /// Looks up a text key; `None` for non-maps and missing keys.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| k.as_text() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }

    /// Returns a copy of this map with `key` set to `value`.
    ///
    /// Non-map values are returned unchanged. Handy inside update functions,
    /// which must produce a new value rather than mutate the stored one.
    #[must_use]
    pub fn with(&self, key: &str, value: Value) -> Value {
        match self {
            Value::Map(pairs) => {
                let mut pairs = pairs.clone();
                match pairs.iter_mut().find(|(k, _)| k.as_text() == Some(key)) {
                    Some(slot) => slot.1 = value,
                    None => pairs.push((Value::Text(key.to_string()), value)),
                }
                Value::Map(pairs)
            }
            other => other.clone(),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident $(via $conv:path)?),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant($($conv)?(v))
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i64 => Integer,
    i32 => Integer via i64::from,
    u32 => Integer via i64::from,
    String => Text,
    Vec<u8> => Bytes,
    Vec<Value> => Array,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_get() {
        let user = Value::record([
            ("name", Value::from("Alice")),
            ("age", Value::from(30)),
        ]);

        assert_eq!(user.get("name"), Some(&Value::Text("Alice".to_string())));
        assert_eq!(user.get("age"), Some(&Value::Integer(30)));
        assert_eq!(user.get("missing"), None);
        assert_eq!(Value::Integer(1).get("name"), None);
    }

    #[test]
    fn with_replaces_or_appends() {
        let v = Value::record([("n", Value::from(1))]);

        let replaced = v.with("n", Value::from(2));
        assert_eq!(replaced.get("n"), Some(&Value::Integer(2)));
        assert_eq!(replaced.as_map().map(<[_]>::len), Some(1));

        let appended = v.with("m", Value::from(3));
        assert_eq!(appended.as_map().map(<[_]>::len), Some(2));

        // the receiver is left as it was
        assert_eq!(v.get("n"), Some(&Value::Integer(1)));
    }

    #[test]
    fn value_accessors() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(true).is_null());

        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Integer(42).as_bool(), None);

        assert_eq!(Value::Integer(42).as_integer(), Some(42));
        assert_eq!(Value::Text("42".to_string()).as_integer(), None);

        assert_eq!(Value::Text("hello".to_string()).as_text(), Some("hello"));
        assert_eq!(Value::Bytes(vec![1, 2, 3]).as_bytes(), Some(&[1, 2, 3][..]));
        assert_eq!(Value::Array(vec![]).type_name(), "array");
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i64), Value::Integer(42));
        assert_eq!(Value::from(42u32), Value::Integer(42));
        assert_eq!(Value::from("hello"), Value::Text("hello".to_string()));
        assert_eq!(Value::from(vec![1u8, 2, 3]), Value::Bytes(vec![1, 2, 3]));
        assert_eq!(
            Value::from(vec![Value::Null, Value::from(1)]),
            Value::Array(vec![Value::Null, Value::Integer(1)])
        );
        assert_eq!(Value::from(()), Value::Null);
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
    }
}
