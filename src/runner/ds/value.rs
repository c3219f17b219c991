use std::fmt;
use std::fmt::{Display, Formatter};

use crate::runner::ds::operations::type_conversion::{
    number_to_js_string, TYPE_STR_NULL, TYPE_STR_UNDEFINED,
};

/// Handle into the object store. Ids are handed out monotonically and never reused within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub usize);

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A concretely known scalar. Equality is IEEE for numbers, so `NaN != NaN`.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    Number(f64),
    String(String),
    Boolean(bool),
}

impl PrimitiveValue {
    /// SameValueZero: like `==` on the payload except that NaN equals NaN.
    pub fn same_value_zero(&self, other: &PrimitiveValue) -> bool {
        match (self, other) {
            (PrimitiveValue::Number(a), PrimitiveValue::Number(b)) => {
                a == b || (a.is_nan() && b.is_nan())
            }
            _ => self == other,
        }
    }
}

impl Display for PrimitiveValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveValue::Number(n) => write!(f, "{}", number_to_js_string(*n)),
            PrimitiveValue::String(s) => write!(f, "{:?}", s),
            PrimitiveValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Element of the abstract value lattice.
#[derive(Debug, Clone, PartialEq)]
pub enum AbstractValue {
    Bottom,
    Top,
    Primitive(PrimitiveValue),
    Reference(ObjectId),
    /// Finite disjunction; never nested, never holds `Top` or `Bottom`, members pairwise distinct.
    Union(Vec<AbstractValue>),
    Undefined,
    Null,
}

impl AbstractValue {
    pub fn number(n: f64) -> Self {
        AbstractValue::Primitive(PrimitiveValue::Number(n))
    }

    pub fn string(s: impl Into<String>) -> Self {
        AbstractValue::Primitive(PrimitiveValue::String(s.into()))
    }

    pub fn boolean(b: bool) -> Self {
        AbstractValue::Primitive(PrimitiveValue::Boolean(b))
    }

    /// True for the values the concrete evaluation bridge can marshal.
    pub fn is_concrete(&self) -> bool {
        matches!(
            self,
            AbstractValue::Primitive(_) | AbstractValue::Undefined | AbstractValue::Null
        )
    }

    pub fn is_top(&self) -> bool {
        matches!(self, AbstractValue::Top)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AbstractValue::Primitive(PrimitiveValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbstractValue::Primitive(PrimitiveValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            AbstractValue::Primitive(PrimitiveValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            AbstractValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    /// Lattice equality used for joins: like `==` but NaN matches NaN.
    pub fn same_value(&self, other: &AbstractValue) -> bool {
        match (self, other) {
            (AbstractValue::Primitive(a), AbstractValue::Primitive(b)) => a.same_value_zero(b),
            (AbstractValue::Union(a), AbstractValue::Union(b)) => {
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.same_value(y)))
            }
            _ => self == other,
        }
    }

    /// The alternatives this value stands for. A non-union is its own single alternative.
    pub fn alternatives(&self) -> Vec<AbstractValue> {
        match self {
            AbstractValue::Union(members) => members.clone(),
            other => vec![other.clone()],
        }
    }

    /// Least upper bound of two values.
    pub fn join(self, other: AbstractValue) -> AbstractValue {
        match (self, other) {
            (AbstractValue::Bottom, v) | (v, AbstractValue::Bottom) => v,
            (AbstractValue::Top, _) | (_, AbstractValue::Top) => AbstractValue::Top,
            (a, b) => {
                let mut members = a.alternatives();
                for candidate in b.alternatives() {
                    if !members.iter().any(|m| m.same_value(&candidate)) {
                        members.push(candidate);
                    }
                }
                if members.len() == 1 {
                    members.pop().unwrap_or(AbstractValue::Bottom)
                } else {
                    AbstractValue::Union(members)
                }
            }
        }
    }

    /// Joins every value of the iterator, starting from `Bottom`.
    pub fn join_all<I: IntoIterator<Item = AbstractValue>>(values: I) -> AbstractValue {
        values
            .into_iter()
            .fold(AbstractValue::Bottom, |acc, v| acc.join(v))
    }

    /// Widens unions wider than `max_union_size` to `Top`.
    pub fn widen(self, max_union_size: usize) -> AbstractValue {
        match self {
            AbstractValue::Union(ref members) if members.len() > max_union_size => {
                AbstractValue::Top
            }
            other => other,
        }
    }
}

impl From<PrimitiveValue> for AbstractValue {
    fn from(p: PrimitiveValue) -> Self {
        AbstractValue::Primitive(p)
    }
}

impl Display for AbstractValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AbstractValue::Bottom => write!(f, "Bottom"),
            AbstractValue::Top => write!(f, "Top"),
            AbstractValue::Primitive(p) => write!(f, "{}", p),
            AbstractValue::Reference(id) => write!(f, "ref({})", id),
            AbstractValue::Undefined => write!(f, "{}", TYPE_STR_UNDEFINED),
            AbstractValue::Null => write!(f, "{}", TYPE_STR_NULL),
            AbstractValue::Union(members) => {
                let parts: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "Or({})", parts.join(" | "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_identity_and_absorption() {
        let one = AbstractValue::number(1.0);
        assert_eq!(AbstractValue::Bottom.join(one.clone()), one);
        assert_eq!(one.clone().join(AbstractValue::Top), AbstractValue::Top);
        assert_eq!(one.clone().join(one.clone()), one);
    }

    #[test]
    fn test_join_builds_flat_deduplicated_union() {
        let u = AbstractValue::number(1.0)
            .join(AbstractValue::string("a"))
            .join(AbstractValue::number(1.0))
            .join(AbstractValue::Undefined);
        assert_eq!(
            u,
            AbstractValue::Union(vec![
                AbstractValue::number(1.0),
                AbstractValue::string("a"),
                AbstractValue::Undefined
            ])
        );
    }

    #[test]
    fn test_nan_is_not_equal_but_joins_once() {
        let nan = AbstractValue::number(f64::NAN);
        assert_ne!(nan, nan.clone());
        assert!(nan.same_value(&nan));
        assert!(matches!(nan.clone().join(nan), AbstractValue::Primitive(_)));
    }

    #[test]
    fn test_widen() {
        let u = AbstractValue::join_all((0..4).map(|i| AbstractValue::number(i as f64)));
        assert_eq!(u.clone().widen(8), u);
        assert_eq!(u.widen(3), AbstractValue::Top);
    }
}
