use std::fmt;
use std::fmt::{Display, Formatter};

/// Largest index an array element may have (2^32 - 2).
pub const MAX_ARRAY_INDEX: u64 = 4_294_967_294;

/// Property key: integer indices are kept apart from names so arrays can be walked by index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    Index(u64),
    Name(String),
}

impl PropertyKey {
    /// Canonicalizes a string key: `"3"` becomes `Index(3)`, `"03"` stays a name.
    pub fn from_name(name: &str) -> Self {
        match name.parse::<u64>() {
            Ok(i) if i <= MAX_ARRAY_INDEX && i.to_string() == name => PropertyKey::Index(i),
            _ => PropertyKey::Name(name.to_string()),
        }
    }

    pub fn as_index(&self) -> Option<u64> {
        match self {
            PropertyKey::Index(i) => Some(*i),
            PropertyKey::Name(_) => None,
        }
    }

    pub fn is_named(&self, name: &str) -> bool {
        matches!(self, PropertyKey::Name(n) if n == name)
    }
}

impl From<u64> for PropertyKey {
    fn from(i: u64) -> Self {
        PropertyKey::Index(i)
    }
}

impl From<&str> for PropertyKey {
    fn from(name: &str) -> Self {
        PropertyKey::from_name(name)
    }
}

impl Display for PropertyKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(i) => write!(f, "{}", i),
            PropertyKey::Name(n) => write!(f, "{}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_index_keys() {
        assert_eq!(PropertyKey::from_name("0"), PropertyKey::Index(0));
        assert_eq!(PropertyKey::from_name("42"), PropertyKey::Index(42));
        assert_eq!(
            PropertyKey::from_name("042"),
            PropertyKey::Name("042".to_string())
        );
        assert_eq!(
            PropertyKey::from_name("-1"),
            PropertyKey::Name("-1".to_string())
        );
        assert_eq!(
            PropertyKey::from_name("4294967295"),
            PropertyKey::Name("4294967295".to_string())
        );
    }
}
