//! Array built-in.
//!
//! Provides the `Array` constructor and the hooked prototype methods. The
//! per-index work is done by [`array_object`]; the natives here only sort out
//! what the receiver is.

use log::debug;

use crate::runner::ds::array_object;
use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::object::AbstractObject;
use crate::runner::ds::operations::type_conversion::{
    as_integer, to_concrete_number, to_concrete_string, utf16_units,
};
use crate::runner::ds::value::{AbstractValue, ObjectId, PrimitiveValue};
use crate::runner::plugin::core_resolver::CoreMethodHook;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::resolver::ReceiverCategory;
use crate::runner::plugin::types::{BuiltInFn, BuiltInObject, CallSite, EvalContext};

use super::argument;

/// Register the Array built-in and its method hook. Returns the `indexOf`
/// native, which strings share.
pub fn register(registry: &mut BuiltInRegistry) -> ObjectId {
    let array = BuiltInObject::new("Array")
        .with_constructor(BuiltInFn::new("Array", array_constructor))
        .add_method("isArray", is_array);
    registry.register_object(array);

    let index_of = registry.register_native(
        BuiltInFn::new("indexOf", array_index_of)
            .with_defaults(vec![AbstractValue::Undefined, AbstractValue::number(0.0)]),
    );
    let hook = CoreMethodHook::new("array", vec![ReceiverCategory::Array])
        .with_method("push", registry.register_native(BuiltInFn::new("push", array_push)))
        .with_method("pop", registry.register_native(BuiltInFn::new("pop", array_pop)))
        .with_method("shift", registry.register_native(BuiltInFn::new("shift", array_shift)))
        .with_method(
            "reverse",
            registry.register_native(BuiltInFn::new("reverse", array_reverse)),
        )
        .with_method(
            "join",
            registry.register_native(
                BuiltInFn::new("join", array_join).with_defaults(vec![AbstractValue::Undefined]),
            ),
        )
        .with_method("indexOf", index_of);
    registry.register_method_hook(Box::new(hook));
    index_of
}

/// Runs `op` on a receiver that is exactly one object. Receivers that may be
/// several objects lose what is known about all of them.
fn with_receiver<F>(
    ctx: &mut EvalContext,
    this: &AbstractValue,
    name: &str,
    op: F,
) -> Result<AbstractValue, AnalysisError>
where
    F: FnOnce(&mut AbstractObject) -> AbstractValue,
{
    match this {
        AbstractValue::Reference(id) => Ok(op(ctx.object_mut(*id)?)),
        AbstractValue::Union(members) => {
            debug!("{} on an ambiguous receiver {}, degrading it", name, this);
            for member in members {
                if let AbstractValue::Reference(id) = member {
                    ctx.object_mut(*id)?.forget_all();
                }
            }
            Ok(AbstractValue::Top)
        }
        AbstractValue::Top => {
            debug!("{} on an unknown receiver, degrading program objects", name);
            ctx.state.store.degrade_program_objects();
            Ok(AbstractValue::Top)
        }
        _ => Ok(AbstractValue::Top),
    }
}

/// Array constructor: `Array(n)` makes `n` holes, anything else lists the arguments.
fn array_constructor(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let elements = match args.as_slice() {
        [AbstractValue::Primitive(PrimitiveValue::Number(n))] => match as_integer(*n) {
            Some(length) if (0..=u32::MAX as i64).contains(&length) => {
                let mut obj = AbstractObject::new_array(vec![]);
                obj.set_tablength(Some(length as u64));
                return Ok(AbstractValue::Reference(ctx.allocate(obj)?));
            }
            _ => return Ok(AbstractValue::Top),
        },
        [single] if !single.is_concrete() && !matches!(single, AbstractValue::Reference(_)) => {
            return Ok(AbstractValue::Top)
        }
        _ => args.into_iter().map(Some).collect(),
    };
    let id = ctx.allocate(AbstractObject::new_array(elements))?;
    Ok(AbstractValue::Reference(id))
}

/// Array.isArray
fn is_array(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match argument(&args, 0) {
        AbstractValue::Reference(id) => {
            let obj = ctx.object(id)?;
            if obj.is_array() {
                AbstractValue::boolean(true)
            } else if obj.contains_top() && !obj.is_callable() {
                AbstractValue::Top
            } else {
                AbstractValue::boolean(false)
            }
        }
        AbstractValue::Top | AbstractValue::Union(_) => AbstractValue::Top,
        _ => AbstractValue::boolean(false),
    })
}

/// Array.prototype.push
fn array_push(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    with_receiver(ctx, &this, "push", |obj| array_object::array_push(obj, args))
}

/// Array.prototype.pop
fn array_pop(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    _args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    with_receiver(ctx, &this, "pop", array_object::array_pop)
}

/// Array.prototype.shift
fn array_shift(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    _args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    with_receiver(ctx, &this, "shift", array_object::array_shift)
}

/// Array.prototype.reverse, yielding a reversed copy.
fn array_reverse(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    _args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let id = match this {
        AbstractValue::Reference(id) => id,
        _ => return Ok(AbstractValue::Top),
    };
    match array_object::array_reversed(ctx.object(id)?) {
        Some(reversed) => Ok(AbstractValue::Reference(ctx.allocate(reversed)?)),
        None => Ok(AbstractValue::Top),
    }
}

/// Array.prototype.indexOf, and String.prototype.indexOf for string receivers.
fn array_index_of(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let item = argument(&args, 0);
    let start = argument(&args, 1);
    if this.is_top() || item.is_top() || start.is_top() {
        return Ok(AbstractValue::Top);
    }
    let start = match to_concrete_number(ctx, &start)? {
        Some(n) if n.is_nan() => 0,
        Some(n) => n.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64,
        None => return Ok(AbstractValue::Top),
    };
    index_of_in(ctx, &this, &item, start)
}

fn index_of_in(
    ctx: &EvalContext,
    receiver: &AbstractValue,
    item: &AbstractValue,
    start: i64,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match receiver {
        AbstractValue::Reference(id) => array_object::array_index_of(ctx.object(*id)?, item, start),
        AbstractValue::Primitive(PrimitiveValue::String(s)) => {
            match to_concrete_string(ctx, item)? {
                Some(needle) => AbstractValue::number(string_index_of(s, &needle, start)),
                None => AbstractValue::Top,
            }
        }
        AbstractValue::Union(members) => {
            let mut result = AbstractValue::Bottom;
            for m in members {
                result = result.join(index_of_in(ctx, m, item, start)?);
            }
            result.widen(ctx.max_union_size())
        }
        _ => AbstractValue::Top,
    })
}

/// Position of `needle` in `haystack` at or after `start`, in UTF-16 units, or -1.
pub fn string_index_of(haystack: &str, needle: &str, start: i64) -> f64 {
    let hay = utf16_units(haystack);
    let needle = utf16_units(needle);
    let from = start.clamp(0, hay.len() as i64) as usize;
    if needle.is_empty() {
        return from as f64;
    }
    if needle.len() > hay.len() {
        return -1.0;
    }
    (from..=hay.len() - needle.len())
        .find(|&i| hay[i..i + needle.len()] == needle[..])
        .map(|i| i as f64)
        .unwrap_or(-1.0)
}

/// Array.prototype.join
fn array_join(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let ctx: &EvalContext = ctx;
    let separator = match argument(&args, 0) {
        AbstractValue::Undefined => ",".to_string(),
        other => match to_concrete_string(ctx, &other)? {
            Some(s) => s,
            None => return Ok(AbstractValue::Top),
        },
    };
    let id = match this {
        AbstractValue::Reference(id) => id,
        _ => return Ok(AbstractValue::Top),
    };
    array_object::array_join(ctx.object(id)?, &separator, |v| to_concrete_string(ctx, v))
}
