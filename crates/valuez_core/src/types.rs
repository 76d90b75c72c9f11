//! Identifier types.

use std::fmt;
use std::str::FromStr;

/// Identifier of an item within a collection.
///
/// Handed out by a per-collection counter, strictly increasing for the
/// lifetime of the collection. Stored as its decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    /// Creates an identifier from its numeric value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the key under which the item is stored.
    #[must_use]
    pub fn key(self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_decimal() {
        let id = ItemId::new(101);
        assert_eq!(id.to_string(), "101");
        assert_eq!(id.key(), "101");
        assert_eq!("101".parse::<ItemId>().unwrap(), id);
    }

    #[test]
    fn ordering_follows_value() {
        assert!(ItemId::new(101) < ItemId::new(102));
        assert!("abc".parse::<ItemId>().is_err());
    }
}
