//! String built-in.
//!
//! Strings are kept as UTF-8 but every index the program sees is a UTF-16
//! code unit, so positional methods work on `utf16_units`.

use log::debug;

use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::object::AbstractObject;
use crate::runner::ds::operations::type_conversion::{
    is_js_whitespace, string_value_from_utf16, to_concrete_number, to_concrete_string, to_string,
    to_uint32, utf16_units,
};
use crate::runner::ds::object::RegExpSlot;
use crate::runner::ds::value::{AbstractValue, ObjectId, PrimitiveValue};
use crate::runner::plugin::core_resolver::CoreMethodHook;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::resolver::ReceiverCategory;
use crate::runner::plugin::types::{BuiltInFn, BuiltInObject, CallSite, EvalContext, NativeFn};

use super::argument;
use super::regexp::regexp_slot;

/// Register the String global and the string method hook.
pub fn register(registry: &mut BuiltInRegistry, index_of: ObjectId) {
    let string = BuiltInObject::new("String")
        .with_constructor(BuiltInFn::new("String", string_constructor))
        .add_method("fromCharCode", from_char_code);
    registry.register_object(string);

    let undefined = || AbstractValue::Undefined;
    let zero = || AbstractValue::number(0.0);
    let mut native = |name: &str, func: NativeFn, defaults: Vec<AbstractValue>| {
        registry.register_native(BuiltInFn::new(name, func).with_defaults(defaults))
    };
    let hook = CoreMethodHook::new("string", vec![ReceiverCategory::String])
        .with_method("split", native("split", split, vec![undefined(), undefined()]))
        .with_method("charCodeAt", native("charCodeAt", char_code_at, vec![zero()]))
        .with_method("charAt", native("charAt", char_at, vec![zero()]))
        .with_method("slice", native("slice", slice, vec![zero(), undefined()]))
        .with_method("substr", native("substr", substr, vec![zero(), undefined()]))
        .with_method(
            "substring",
            native("substring", substring, vec![zero(), undefined()]),
        )
        .with_method("replace", native("replace", replace, vec![undefined(), undefined()]))
        .with_method("toLowerCase", native("toLowerCase", to_lower_case, vec![]))
        .with_method("toUpperCase", native("toUpperCase", to_upper_case, vec![]))
        .with_method("trim", native("trim", trim, vec![]))
        .with_method("concat", native("concat", concat, vec![]))
        .with_method("indexOf", index_of);
    registry.register_method_hook(Box::new(hook));
}

/// Applies `op` to each string the receiver may be and joins the results.
fn for_each_receiver<F>(
    ctx: &mut EvalContext,
    this: &AbstractValue,
    mut op: F,
) -> Result<AbstractValue, AnalysisError>
where
    F: FnMut(&mut EvalContext, &str) -> Result<AbstractValue, AnalysisError>,
{
    match this {
        AbstractValue::Primitive(PrimitiveValue::String(s)) => op(ctx, s),
        AbstractValue::Union(members) => {
            let mut result = AbstractValue::Bottom;
            for m in members {
                result = match m {
                    AbstractValue::Primitive(PrimitiveValue::String(s)) => result.join(op(ctx, s)?),
                    _ => return Ok(AbstractValue::Top),
                };
            }
            Ok(result.widen(ctx.max_union_size()))
        }
        _ => Ok(AbstractValue::Top),
    }
}

/// `ToIntegerOrInfinity`, with `None` when the argument is not known.
fn integer_argument(ctx: &EvalContext, v: &AbstractValue) -> Result<Option<f64>, AnalysisError> {
    Ok(to_concrete_number(ctx, v)?.map(|n| if n.is_nan() { 0.0 } else { n.trunc() }))
}

/// Relative position as used by `slice`: negative counts from the end.
fn relative_index(n: f64, len: usize) -> usize {
    let len = len as f64;
    let index = if n < 0.0 { (len + n).max(0.0) } else { n.min(len) };
    index as usize
}

fn clamp_index(n: f64, len: usize) -> usize {
    n.max(0.0).min(len as f64) as usize
}

/// String constructor
fn string_constructor(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    match args.first() {
        Some(v) => to_string(ctx, v),
        None => Ok(AbstractValue::string("")),
    }
}

/// String.fromCharCode
fn from_char_code(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let mut units = Vec::with_capacity(args.len());
    for arg in &args {
        match to_concrete_number(ctx, arg)? {
            Some(n) => units.push((to_uint32(n) & 0xFFFF) as u16),
            None => return Ok(AbstractValue::Top),
        }
    }
    Ok(string_value_from_utf16(&units))
}

/// String.prototype.split
fn split(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let separator = argument(&args, 0);
    let limit = match argument(&args, 1) {
        AbstractValue::Undefined => u32::MAX as usize,
        other => match to_concrete_number(ctx, &other)? {
            Some(n) => to_uint32(n) as usize,
            None => return Ok(AbstractValue::Top),
        },
    };
    let pattern = regexp_slot(ctx, &separator)?;
    let separator = match (&pattern, &separator) {
        (Some(_), _) | (None, AbstractValue::Undefined) => None,
        (None, other) => match to_concrete_string(ctx, other)? {
            Some(s) => Some(s),
            None => return Ok(AbstractValue::Top),
        },
    };
    for_each_receiver(ctx, &this, |ctx, s| {
        let mut elements: Vec<Option<AbstractValue>> = match (&pattern, &separator) {
            (Some(re), _) => split_by_pattern(re, &utf16_units(s), limit),
            (None, None) => vec![Some(AbstractValue::string(s))],
            (None, Some(sep)) if sep.is_empty() => utf16_units(s)
                .iter()
                .map(|u| Some(string_value_from_utf16(&[*u])))
                .collect(),
            (None, Some(sep)) => s
                .split(sep.as_str())
                .map(|p| Some(AbstractValue::string(p)))
                .collect(),
        };
        elements.truncate(limit);
        let id = ctx.allocate(AbstractObject::new_array(elements))?;
        Ok(AbstractValue::Reference(id))
    })
}

/// Pieces of `units` around each match of `re`, capture groups spliced in
/// after the piece they follow. Stops once `limit` elements are collected.
fn split_by_pattern(re: &RegExpSlot, units: &[u16], limit: usize) -> Vec<Option<AbstractValue>> {
    let mut out = vec![];
    if limit == 0 {
        return out;
    }
    if units.is_empty() {
        if re.find_at(units, 0).is_none() {
            out.push(Some(AbstractValue::string("")));
        }
        return out;
    }
    let mut piece_start = 0;
    let mut q = 0;
    while q < units.len() {
        let m = match re.find_at(units, q) {
            Some(m) if m.range().start < units.len() => m,
            _ => break,
        };
        let end = m.range().end.min(units.len());
        if end == piece_start {
            q = m.range().start + 1;
            continue;
        }
        out.push(Some(string_value_from_utf16(&units[piece_start..m.range().start])));
        if out.len() == limit {
            return out;
        }
        for group in &m.captures {
            out.push(Some(match group {
                Some(range) => string_value_from_utf16(&units[range.clone()]),
                None => AbstractValue::Undefined,
            }));
            if out.len() == limit {
                return out;
            }
        }
        piece_start = end;
        q = end;
    }
    out.push(Some(string_value_from_utf16(&units[piece_start..])));
    out
}

/// String.prototype.charCodeAt
fn char_code_at(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let pos = match integer_argument(ctx, &argument(&args, 0))? {
        Some(pos) => pos,
        None => return Ok(AbstractValue::Top),
    };
    for_each_receiver(ctx, &this, |_, s| {
        let units = utf16_units(s);
        Ok(match unit_at(&units, pos) {
            Some(unit) => AbstractValue::number(unit as f64),
            None => AbstractValue::number(f64::NAN),
        })
    })
}

/// String.prototype.charAt
fn char_at(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let pos = match integer_argument(ctx, &argument(&args, 0))? {
        Some(pos) => pos,
        None => return Ok(AbstractValue::Top),
    };
    for_each_receiver(ctx, &this, |_, s| {
        let units = utf16_units(s);
        Ok(match unit_at(&units, pos) {
            Some(unit) => string_value_from_utf16(&[unit]),
            None => AbstractValue::string(""),
        })
    })
}

fn unit_at(units: &[u16], pos: f64) -> Option<u16> {
    if pos < 0.0 || pos >= units.len() as f64 {
        return None;
    }
    units.get(pos as usize).copied()
}

/// Start and optional end arguments, each `None` in the outer option when unknown.
fn range_arguments(
    ctx: &EvalContext,
    args: &[AbstractValue],
) -> Result<Option<(f64, Option<f64>)>, AnalysisError> {
    let start = match integer_argument(ctx, &argument(args, 0))? {
        Some(start) => start,
        None => return Ok(None),
    };
    let end = match argument(args, 1) {
        AbstractValue::Undefined => None,
        other => match integer_argument(ctx, &other)? {
            Some(end) => Some(end),
            None => return Ok(None),
        },
    };
    Ok(Some((start, end)))
}

/// String.prototype.slice
fn slice(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let (start, end) = match range_arguments(ctx, &args)? {
        Some(range) => range,
        None => return Ok(AbstractValue::Top),
    };
    for_each_receiver(ctx, &this, |_, s| {
        let units = utf16_units(s);
        let from = relative_index(start, units.len());
        let to = end.map_or(units.len(), |e| relative_index(e, units.len()));
        Ok(if from < to {
            string_value_from_utf16(&units[from..to])
        } else {
            AbstractValue::string("")
        })
    })
}

/// String.prototype.substr
fn substr(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let (start, length) = match range_arguments(ctx, &args)? {
        Some(range) => range,
        None => return Ok(AbstractValue::Top),
    };
    for_each_receiver(ctx, &this, |_, s| {
        let units = utf16_units(s);
        let from = relative_index(start, units.len());
        let count = length.map_or(units.len() as f64, |l| l.max(0.0));
        let to = (from as f64 + count).min(units.len() as f64) as usize;
        Ok(if from < to {
            string_value_from_utf16(&units[from..to])
        } else {
            AbstractValue::string("")
        })
    })
}

/// String.prototype.substring
fn substring(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let (start, end) = match range_arguments(ctx, &args)? {
        Some(range) => range,
        None => return Ok(AbstractValue::Top),
    };
    for_each_receiver(ctx, &this, |_, s| {
        let units = utf16_units(s);
        let a = clamp_index(start, units.len());
        let b = end.map_or(units.len(), |e| clamp_index(e, units.len()));
        let (from, to) = if a <= b { (a, b) } else { (b, a) };
        Ok(string_value_from_utf16(&units[from..to]))
    })
}

/// String.prototype.replace, without `$` patterns or replacer functions.
fn replace(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let pattern = argument(&args, 0);
    let replacement = argument(&args, 1);
    if let AbstractValue::Reference(id) = replacement {
        if ctx.object(id)?.is_callable() {
            debug!("replace with a replacer function is not modeled");
            return Ok(AbstractValue::Top);
        }
    }
    let replacement = match to_concrete_string(ctx, &replacement)? {
        Some(r) if !r.contains('$') => r,
        _ => return Ok(AbstractValue::Top),
    };
    if let Some(re) = regexp_slot(ctx, &pattern)? {
        let replacement = utf16_units(&replacement);
        return for_each_receiver(ctx, &this, |_, s| {
            let units = utf16_units(s);
            let matches = if re.is_global() {
                re.find_all(&units)
            } else {
                re.find_at(&units, 0).into_iter().collect()
            };
            let mut out = Vec::with_capacity(units.len());
            let mut copied = 0;
            for m in &matches {
                out.extend_from_slice(&units[copied..m.range().start]);
                out.extend_from_slice(&replacement);
                copied = m.range().end;
            }
            out.extend_from_slice(&units[copied..]);
            Ok(string_value_from_utf16(&out))
        });
    }
    let needle = match to_concrete_string(ctx, &pattern)? {
        Some(needle) => needle,
        None => return Ok(AbstractValue::Top),
    };
    for_each_receiver(ctx, &this, |_, s| {
        Ok(AbstractValue::string(s.replacen(needle.as_str(), &replacement, 1)))
    })
}

/// String.prototype.toLowerCase
fn to_lower_case(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    _args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    for_each_receiver(ctx, &this, |_, s| Ok(AbstractValue::string(s.to_lowercase())))
}

/// String.prototype.toUpperCase
fn to_upper_case(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    _args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    for_each_receiver(ctx, &this, |_, s| Ok(AbstractValue::string(s.to_uppercase())))
}

/// String.prototype.trim
fn trim(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    _args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    for_each_receiver(ctx, &this, |_, s| {
        Ok(AbstractValue::string(s.trim_matches(is_js_whitespace)))
    })
}

/// String.prototype.concat
fn concat(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let mut tail = String::new();
    for arg in &args {
        match to_concrete_string(ctx, arg)? {
            Some(s) => tail.push_str(&s),
            None => return Ok(AbstractValue::Top),
        }
    }
    for_each_receiver(ctx, &this, |_, s| Ok(AbstractValue::string(format!("{}{}", s, tail))))
}
