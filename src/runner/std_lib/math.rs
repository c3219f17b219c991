//! Math built-in.

use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::operations::type_conversion::to_concrete_number;
use crate::runner::ds::value::AbstractValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInObject, CallSite, EvalContext};

/// Register the Math built-in with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let undefined = || vec![AbstractValue::Undefined];
    let math = BuiltInObject::new("Math")
        .add_property("E", AbstractValue::number(std::f64::consts::E))
        .add_property("LN2", AbstractValue::number(std::f64::consts::LN_2))
        .add_property("LN10", AbstractValue::number(std::f64::consts::LN_10))
        .add_property("PI", AbstractValue::number(std::f64::consts::PI))
        .add_property("SQRT2", AbstractValue::number(std::f64::consts::SQRT_2))
        .add_method_with_defaults("abs", math_abs, undefined())
        .add_method_with_defaults("floor", math_floor, undefined())
        .add_method_with_defaults("ceil", math_ceil, undefined())
        .add_method_with_defaults("round", math_round, undefined())
        .add_method_with_defaults("trunc", math_trunc, undefined())
        .add_method_with_defaults("sqrt", math_sqrt, undefined())
        .add_method_with_defaults(
            "pow",
            math_pow,
            vec![AbstractValue::Undefined, AbstractValue::Undefined],
        )
        .add_method("max", math_max)
        .add_method("min", math_min)
        .add_method("random", math_random);

    registry.register_object(math);
}

/// Every argument as a number, or `None` if any of them is not known.
fn numeric_args(
    ctx: &EvalContext,
    args: &[AbstractValue],
) -> Result<Option<Vec<f64>>, AnalysisError> {
    let mut numbers = Vec::with_capacity(args.len());
    for arg in args {
        match to_concrete_number(ctx, arg)? {
            Some(n) => numbers.push(n),
            None => return Ok(None),
        }
    }
    Ok(Some(numbers))
}

fn unary_math(
    ctx: &EvalContext,
    args: &[AbstractValue],
    f: fn(f64) -> f64,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match numeric_args(ctx, &args[..1.min(args.len())])? {
        Some(numbers) => AbstractValue::number(f(numbers.first().copied().unwrap_or(f64::NAN))),
        None => AbstractValue::Top,
    })
}

/// Math.abs
fn math_abs(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    unary_math(ctx, &args, f64::abs)
}

/// Math.floor
fn math_floor(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    unary_math(ctx, &args, f64::floor)
}

/// Math.ceil
fn math_ceil(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    unary_math(ctx, &args, f64::ceil)
}

/// Math.round: halves go up, toward positive infinity.
fn math_round(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    unary_math(ctx, &args, js_round)
}

/// Math.trunc
fn math_trunc(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    unary_math(ctx, &args, f64::trunc)
}

/// Math.sqrt
fn math_sqrt(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    unary_math(ctx, &args, f64::sqrt)
}

/// Math.pow
fn math_pow(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match numeric_args(ctx, &args[..2.min(args.len())])?.as_deref() {
        Some([base, exponent]) => AbstractValue::number(js_pow(*base, *exponent)),
        _ => AbstractValue::Top,
    })
}

/// Math.max
fn math_max(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match numeric_args(ctx, &args)? {
        Some(numbers) => {
            AbstractValue::number(numbers.into_iter().fold(f64::NEG_INFINITY, |acc, n| {
                if acc.is_nan() || n.is_nan() {
                    f64::NAN
                } else {
                    acc.max(n)
                }
            }))
        }
        None => AbstractValue::Top,
    })
}

/// Math.min
fn math_min(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match numeric_args(ctx, &args)? {
        Some(numbers) => AbstractValue::number(numbers.into_iter().fold(f64::INFINITY, |acc, n| {
            if acc.is_nan() || n.is_nan() {
                f64::NAN
            } else {
                acc.min(n)
            }
        })),
        None => AbstractValue::Top,
    })
}

/// Math.random is never concrete.
fn math_random(
    _ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    _args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(AbstractValue::Top)
}

fn js_round(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// `powf` except where JS differs: a NaN exponent, and `±1 ** ±Infinity`.
fn js_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_round() {
        assert_eq!(js_round(2.5), 3.0);
        assert_eq!(js_round(-2.5), -2.0);
        assert_eq!(js_round(-2.6), -3.0);
        assert_eq!(js_round(0.49999999999999994), 0.0);
    }

    #[test]
    fn test_js_pow() {
        assert_eq!(js_pow(2.0, 10.0), 1024.0);
        assert!(js_pow(1.0, f64::INFINITY).is_nan());
        assert!(js_pow(2.0, f64::NAN).is_nan());
        assert_eq!(js_pow(f64::NAN, 0.0), 1.0);
    }
}
