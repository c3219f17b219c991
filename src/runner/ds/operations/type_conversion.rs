use crate::parser::ast::{BinaryOperator, UnaryOperator};
use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::object::{AbstractObject, MissingMode, ObjectKind};
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::value::{AbstractValue, ObjectId, PrimitiveValue};
use crate::runner::eval::operators::{apply_binary, apply_unary};
use crate::runner::plugin::types::EvalContext;

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";
pub const TYPE_STR_BOOLEAN: &str = "boolean";
pub const TYPE_STR_STRING: &str = "string";
pub const TYPE_STR_NUMBER: &str = "number";
pub const TYPE_STR_OBJECT: &str = "object";
pub const TYPE_STR_FUNCTION: &str = "function";

/// JS `Number::toString(10)`.
pub fn number_to_js_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let mut buf = ryu_js::Buffer::new();
    buf.format(n).to_string()
}

/// ECMAScript WhiteSpace and LineTerminator code points.
pub fn is_js_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}'
            | '\u{000B}'
            | '\u{000C}'
            | ' '
            | '\u{00A0}'
            | '\u{FEFF}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
            | '\n'
            | '\r'
            | '\u{2028}'
            | '\u{2029}'
    )
}

pub fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

pub fn to_uint32(n: f64) -> u32 {
    if n.is_nan() || n.is_infinite() || n == 0.0 {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

/// Integral value of `n` if it is one and fits in an `i64`.
pub fn as_integer(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        Some(n as i64)
    } else {
        None
    }
}

pub fn utf16_units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// `None` when `units` holds an unpaired surrogate, which a UTF-8 string cannot carry.
pub fn string_from_utf16(units: &[u16]) -> Option<String> {
    String::from_utf16(units).ok()
}

/// String value of `units`, `Top` when they cannot be kept exactly.
pub fn string_value_from_utf16(units: &[u16]) -> AbstractValue {
    match string_from_utf16(units) {
        Some(s) => AbstractValue::string(s),
        None => AbstractValue::Top,
    }
}

pub fn get_type(obj: Option<&AbstractObject>, v: &AbstractValue) -> Option<&'static str> {
    Some(match v {
        AbstractValue::Undefined => TYPE_STR_UNDEFINED,
        AbstractValue::Null => TYPE_STR_OBJECT,
        AbstractValue::Primitive(PrimitiveValue::Number(_)) => TYPE_STR_NUMBER,
        AbstractValue::Primitive(PrimitiveValue::String(_)) => TYPE_STR_STRING,
        AbstractValue::Primitive(PrimitiveValue::Boolean(_)) => TYPE_STR_BOOLEAN,
        AbstractValue::Reference(_) => match obj {
            Some(o) if o.is_callable() => TYPE_STR_FUNCTION,
            Some(_) => TYPE_STR_OBJECT,
            None => return None,
        },
        AbstractValue::Top | AbstractValue::Bottom | AbstractValue::Union(_) => return None,
    })
}

/// Abstract `ToString`. Never fails on unmodeled shapes, those give `Top`.
pub fn to_string(ctx: &EvalContext, v: &AbstractValue) -> Result<AbstractValue, AnalysisError> {
    let mut visiting = vec![];
    to_string_inner(ctx, v, &mut visiting)
}

fn to_string_inner(
    ctx: &EvalContext,
    v: &AbstractValue,
    visiting: &mut Vec<ObjectId>,
) -> Result<AbstractValue, AnalysisError> {
    match v {
        AbstractValue::Top | AbstractValue::Bottom => Ok(v.clone()),
        AbstractValue::Union(members) => {
            let mut result = AbstractValue::Bottom;
            for m in members {
                result = result.join(to_string_inner(ctx, m, visiting)?);
            }
            Ok(result.widen(ctx.max_union_size()))
        }
        AbstractValue::Reference(id) => object_to_string(ctx, *id, visiting),
        AbstractValue::Primitive(PrimitiveValue::String(_)) => Ok(v.clone()),
        _ => apply_binary(ctx, BinaryOperator::Add, &AbstractValue::string(""), v),
    }
}

fn object_to_string(
    ctx: &EvalContext,
    id: ObjectId,
    visiting: &mut Vec<ObjectId>,
) -> Result<AbstractValue, AnalysisError> {
    let obj = ctx.object(id)?;
    match &obj.kind {
        ObjectKind::Function(f) => return Ok(AbstractValue::string(f.source_text())),
        ObjectKind::Native(native) => {
            let name = ctx
                .registry()
                .native(*native)
                .map(|n| n.name.as_str())
                .unwrap_or("");
            return Ok(AbstractValue::string(format!(
                "function {}() {{ [native code] }}",
                name
            )));
        }
        ObjectKind::Plain => {}
    }
    if let Some(re) = &obj.regexp {
        return Ok(AbstractValue::string(format!("/{}/{}", re.source, re.flags)));
    }
    if obj.missing_mode() == MissingMode::MissingIsTop {
        return Ok(AbstractValue::Top);
    }
    let length = match obj.tablength() {
        Some(length) => length,
        None => return Ok(AbstractValue::string("[object Object]")),
    };
    if visiting.contains(&id) {
        return Ok(AbstractValue::Top);
    }
    visiting.push(id);
    let mut parts = Vec::with_capacity(length.min(1024) as usize);
    for i in 0..length {
        let element = match obj.get_own(&PropertyKey::Index(i)) {
            Some(element) => element,
            None => {
                visiting.pop();
                return Ok(AbstractValue::Top);
            }
        };
        match element {
            AbstractValue::Undefined | AbstractValue::Null => parts.push(String::new()),
            _ => match to_string_inner(ctx, element, visiting)? {
                AbstractValue::Primitive(PrimitiveValue::String(s)) => parts.push(s),
                _ => {
                    visiting.pop();
                    return Ok(AbstractValue::Top);
                }
            },
        }
    }
    visiting.pop();
    Ok(AbstractValue::string(parts.join(",")))
}

/// Abstract `ToNumber`: objects go through `ToString` first, then unary `+`.
pub fn to_number(ctx: &EvalContext, v: &AbstractValue) -> Result<AbstractValue, AnalysisError> {
    match v {
        AbstractValue::Top | AbstractValue::Bottom => Ok(v.clone()),
        AbstractValue::Primitive(PrimitiveValue::Number(_)) => Ok(v.clone()),
        AbstractValue::Reference(_) | AbstractValue::Union(_) => {
            let s = to_string(ctx, v)?;
            if s.is_top() {
                return Ok(AbstractValue::Top);
            }
            apply_unary(ctx, UnaryOperator::Plus, &s)
        }
        _ => apply_unary(ctx, UnaryOperator::Plus, v),
    }
}

/// Abstract `ToBoolean`. Objects are always truthy.
pub fn to_boolean(ctx: &EvalContext, v: &AbstractValue) -> Result<AbstractValue, AnalysisError> {
    match v {
        AbstractValue::Top | AbstractValue::Bottom => Ok(v.clone()),
        AbstractValue::Reference(_) => Ok(AbstractValue::boolean(true)),
        AbstractValue::Union(members) => {
            let mut result = AbstractValue::Bottom;
            for m in members {
                result = result.join(to_boolean(ctx, m)?);
            }
            Ok(result)
        }
        _ => Ok(match apply_unary(ctx, UnaryOperator::LogicalNot, v)? {
            AbstractValue::Primitive(PrimitiveValue::Boolean(b)) => AbstractValue::boolean(!b),
            _ => AbstractValue::Top,
        }),
    }
}

/// `Some(b)` only when the value is definitely truthy or definitely falsy.
pub fn known_truthiness(
    ctx: &EvalContext,
    v: &AbstractValue,
) -> Result<Option<bool>, AnalysisError> {
    Ok(to_boolean(ctx, v)?.as_boolean())
}

/// Concrete string payload after coercion, if it is known.
pub fn to_concrete_string(
    ctx: &EvalContext,
    v: &AbstractValue,
) -> Result<Option<String>, AnalysisError> {
    Ok(match to_string(ctx, v)? {
        AbstractValue::Primitive(PrimitiveValue::String(s)) => Some(s),
        _ => None,
    })
}

/// Concrete number after coercion, if it is known.
pub fn to_concrete_number(
    ctx: &EvalContext,
    v: &AbstractValue,
) -> Result<Option<f64>, AnalysisError> {
    Ok(to_number(ctx, v)?.as_number())
}

/// Property key for a computed member access, `None` when the key is not known.
pub fn to_property_key(
    ctx: &EvalContext,
    v: &AbstractValue,
) -> Result<Option<PropertyKey>, AnalysisError> {
    if let AbstractValue::Primitive(PrimitiveValue::Number(n)) = v {
        if let Some(i) = as_integer(*n) {
            if i >= 0 {
                return Ok(Some(PropertyKey::from_name(&i.to_string())));
            }
        }
    }
    Ok(to_concrete_string(ctx, v)?.map(|s| PropertyKey::from_name(&s)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_js_string() {
        assert_eq!(number_to_js_string(1.0), "1");
        assert_eq!(number_to_js_string(-0.0), "0");
        assert_eq!(number_to_js_string(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(number_to_js_string(1e21), "1e+21");
        assert_eq!(number_to_js_string(f64::NAN), "NaN");
        assert_eq!(number_to_js_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_int32_truncation() {
        assert_eq!(to_int32(4_294_967_296.0 + 5.0), 5);
        assert_eq!(to_int32(2_147_483_648.0), -2_147_483_648);
        assert_eq!(to_int32(-1.5), -1);
        assert_eq!(to_uint32(-1.0), 4_294_967_295);
        assert_eq!(to_uint32(f64::NAN), 0);
    }

    #[test]
    fn test_utf16_helpers() {
        assert_eq!(utf16_len("a\u{1F600}"), 3);
        let units = utf16_units("a\u{1F600}");
        assert_eq!(string_from_utf16(&units[1..]).as_deref(), Some("\u{1F600}"));
        assert_eq!(string_from_utf16(&units[1..2]), None);
        assert_eq!(string_value_from_utf16(&units[2..]), AbstractValue::Top);
        assert_eq!(string_value_from_utf16(&units[..1]), AbstractValue::string("a"));
    }

    #[test]
    fn test_js_whitespace() {
        for c in ['\t', '\u{000B}', '\u{00A0}', '\u{FEFF}', '\u{2007}', '\u{3000}', '\u{2029}'] {
            assert!(is_js_whitespace(c), "{:?}", c);
        }
        for c in ['\u{0085}', '\u{180E}', '\u{200B}', 'a'] {
            assert!(!is_js_whitespace(c), "{:?}", c);
        }
    }
}
