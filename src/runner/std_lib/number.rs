//! Number built-in.
//!
//! Provides the Number constructor and constants, and the `toString` hook that
//! numbers share with callables and pattern objects.

use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::operations::type_conversion::{
    as_integer, number_to_js_string, to_concrete_number, to_number, to_string,
};
use crate::runner::ds::value::{AbstractValue, ObjectId, PrimitiveValue};
use crate::runner::plugin::core_resolver::CoreMethodHook;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::resolver::ReceiverCategory;
use crate::runner::plugin::types::{BuiltInFn, BuiltInObject, CallSite, EvalContext};

use super::argument;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Register the Number built-in and the `toString` hook. `Number.constructor`
/// is tied to `function_global`.
pub fn register(registry: &mut BuiltInRegistry, function_global: ObjectId) {
    let number = BuiltInObject::new("Number")
        .with_constructor(BuiltInFn::new("Number", number_constructor))
        .add_property("MAX_VALUE", AbstractValue::number(f64::MAX))
        .add_property("MIN_VALUE", AbstractValue::number(5e-324))
        .add_property("POSITIVE_INFINITY", AbstractValue::number(f64::INFINITY))
        .add_property("NEGATIVE_INFINITY", AbstractValue::number(f64::NEG_INFINITY))
        .add_property("NaN", AbstractValue::number(f64::NAN))
        .add_property("MAX_SAFE_INTEGER", AbstractValue::number(9_007_199_254_740_991.0))
        .add_property("MIN_SAFE_INTEGER", AbstractValue::number(-9_007_199_254_740_991.0))
        .add_property("EPSILON", AbstractValue::number(f64::EPSILON))
        .add_method("isNaN", number_is_nan)
        .add_method("isInteger", number_is_integer);
    let number = registry.register_object(number);
    registry.set_object_property(number, "constructor", AbstractValue::Reference(function_global));

    let to_string = registry.register_native(
        BuiltInFn::new("toString", value_to_string).with_defaults(vec![AbstractValue::Undefined]),
    );
    let hook = CoreMethodHook::new(
        "to_string",
        vec![
            ReceiverCategory::Number,
            ReceiverCategory::Callable,
            ReceiverCategory::RegExp,
        ],
    )
    .with_method("toString", to_string);
    registry.register_method_hook(Box::new(hook));
}

/// Number constructor.
fn number_constructor(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    match args.first() {
        Some(v) => to_number(ctx, v),
        None => Ok(AbstractValue::number(0.0)),
    }
}

/// Number.isNaN
fn number_is_nan(
    _ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match argument(&args, 0) {
        AbstractValue::Primitive(PrimitiveValue::Number(n)) => AbstractValue::boolean(n.is_nan()),
        v if v.is_concrete() || matches!(v, AbstractValue::Reference(_)) => {
            AbstractValue::boolean(false)
        }
        _ => AbstractValue::Top,
    })
}

/// Number.isInteger
fn number_is_integer(
    _ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match argument(&args, 0) {
        AbstractValue::Primitive(PrimitiveValue::Number(n)) => {
            AbstractValue::boolean(n.is_finite() && n.fract() == 0.0)
        }
        v if v.is_concrete() || matches!(v, AbstractValue::Reference(_)) => {
            AbstractValue::boolean(false)
        }
        _ => AbstractValue::Top,
    })
}

/// Number.prototype.toString and Function.prototype.toString
fn value_to_string(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let radix = match argument(&args, 0) {
        AbstractValue::Undefined => 10,
        other => match to_concrete_number(ctx, &other)?.and_then(as_integer) {
            Some(radix) if (2..=36).contains(&radix) => radix as u32,
            _ => return Ok(AbstractValue::Top),
        },
    };
    value_in_radix(ctx, &this, radix)
}

fn value_in_radix(
    ctx: &EvalContext,
    v: &AbstractValue,
    radix: u32,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match v {
        AbstractValue::Primitive(PrimitiveValue::Number(n)) => {
            match number_to_radix_string(*n, radix) {
                Some(s) => AbstractValue::string(s),
                None => AbstractValue::Top,
            }
        }
        AbstractValue::Reference(_) => to_string(ctx, v)?,
        AbstractValue::Union(members) => {
            let mut result = AbstractValue::Bottom;
            for m in members {
                result = result.join(value_in_radix(ctx, m, radix)?);
            }
            result.widen(ctx.max_union_size())
        }
        _ => AbstractValue::Top,
    })
}

/// Digits of `n` in `radix`; `None` for fractions outside base 10.
pub fn number_to_radix_string(n: f64, radix: u32) -> Option<String> {
    if radix == 10 || !n.is_finite() {
        return Some(number_to_js_string(n));
    }
    let integer = as_integer(n)?;
    let mut out = String::new();
    if integer < 0 {
        out.push('-');
    }
    push_digits(integer.unsigned_abs(), radix as u64, &mut out);
    Some(out)
}

fn push_digits(n: u64, radix: u64, out: &mut String) {
    if n >= radix {
        push_digits(n / radix, radix, out);
    }
    out.push(DIGITS[(n % radix) as usize] as char);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_radix_string() {
        assert_eq!(number_to_radix_string(255.0, 16).as_deref(), Some("ff"));
        assert_eq!(number_to_radix_string(-5.0, 2).as_deref(), Some("-101"));
        assert_eq!(number_to_radix_string(0.0, 36).as_deref(), Some("0"));
        assert_eq!(number_to_radix_string(35.0, 36).as_deref(), Some("z"));
        assert_eq!(number_to_radix_string(1.5, 10).as_deref(), Some("1.5"));
        assert_eq!(number_to_radix_string(f64::NAN, 2).as_deref(), Some("NaN"));
        assert_eq!(number_to_radix_string(1.5, 2), None);
    }
}
