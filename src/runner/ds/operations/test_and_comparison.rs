use crate::runner::bridge::TaggedValue;

/// `===` on scalars. NaN is unequal to itself and `+0 === -0`.
pub fn strict_equality_comparison(a: &TaggedValue, b: &TaggedValue) -> bool {
    match (a, b) {
        (TaggedValue::Number(x), TaggedValue::Number(y)) => x == y,
        (TaggedValue::String(x), TaggedValue::String(y)) => x == y,
        (TaggedValue::Boolean(x), TaggedValue::Boolean(y)) => x == y,
        (TaggedValue::Undefined, TaggedValue::Undefined)
        | (TaggedValue::Null, TaggedValue::Null) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> TaggedValue {
        TaggedValue::String(v.to_string())
    }

    #[test]
    fn test_strict_equality() {
        assert!(!strict_equality_comparison(
            &TaggedValue::Number(f64::NAN),
            &TaggedValue::Number(f64::NAN)
        ));
        assert!(strict_equality_comparison(
            &TaggedValue::Number(0.0),
            &TaggedValue::Number(-0.0)
        ));
        assert!(!strict_equality_comparison(&TaggedValue::Number(1.0), &s("1")));
        assert!(!strict_equality_comparison(&TaggedValue::Null, &TaggedValue::Undefined));
        assert!(strict_equality_comparison(&s("a"), &s("a")));
    }
}
