//! Default operator handlers.
//!
//! Coercions the analyzer models itself (objects to strings or booleans,
//! `typeof`, reference identity) are done here; everything that is left with
//! concrete scalar operands goes to the concrete evaluation bridge.

use crate::parser::ast::{BinaryOperator, UnaryOperator, UpdateOperator};
use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::operations::type_conversion::{
    get_type, to_boolean, to_number, to_string,
};
use crate::runner::ds::value::{AbstractValue, ObjectId};
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::EvalContext;

pub fn register(registry: &mut BuiltInRegistry) {
    registry.register_unary_handler(unary_handler);
    registry.register_binary_handler(binary_handler);
    registry.register_update_handler(update_handler);
}

pub fn unary_handler(
    ctx: &EvalContext,
    op: UnaryOperator,
    v: &AbstractValue,
) -> Result<Option<AbstractValue>, AnalysisError> {
    match op {
        UnaryOperator::Void => return Ok(Some(AbstractValue::Undefined)),
        UnaryOperator::TypeOf => {
            let obj = match v {
                AbstractValue::Reference(id) => Some(ctx.object(*id)?),
                _ => None,
            };
            return Ok(Some(
                get_type(obj, v)
                    .map(AbstractValue::string)
                    .unwrap_or(AbstractValue::Top),
            ));
        }
        UnaryOperator::Delete => return Ok(Some(AbstractValue::Top)),
        _ => {}
    }
    let operand = match v {
        AbstractValue::Top => return Ok(Some(AbstractValue::Top)),
        AbstractValue::Reference(_) => match op {
            UnaryOperator::LogicalNot => to_boolean(ctx, v)?,
            _ => to_string(ctx, v)?,
        },
        _ => v.clone(),
    };
    if !operand.is_concrete() {
        return Ok(Some(AbstractValue::Top));
    }
    if ctx.bridge().supports_unary(op) {
        return Ok(Some(ctx.bridge().unary(op, &operand)?));
    }
    Ok(None)
}

pub fn binary_handler(
    ctx: &EvalContext,
    op: BinaryOperator,
    a: &AbstractValue,
    b: &AbstractValue,
) -> Result<Option<AbstractValue>, AnalysisError> {
    if a.is_top() || b.is_top() {
        return Ok(Some(AbstractValue::Top));
    }
    let (a_ref, b_ref) = (a.as_reference(), b.as_reference());
    if op == BinaryOperator::InstanceOf {
        return Ok(Some(instance_of(ctx, a_ref, b_ref)?));
    }
    if op == BinaryOperator::In {
        return Ok(Some(AbstractValue::Top));
    }
    if a_ref.is_some() || b_ref.is_some() {
        match op {
            BinaryOperator::StrictlyEqual => {
                return Ok(Some(AbstractValue::boolean(a_ref == b_ref)))
            }
            BinaryOperator::StrictlyUnequal => {
                return Ok(Some(AbstractValue::boolean(a_ref != b_ref)))
            }
            BinaryOperator::LooselyEqual | BinaryOperator::LooselyUnequal => {
                if let Some(equal) = loose_reference_equality(a, b) {
                    let equal = equal == (op == BinaryOperator::LooselyEqual);
                    return Ok(Some(AbstractValue::boolean(equal)));
                }
            }
            _ => {}
        }
    }
    let left = match a_ref {
        Some(_) => to_string(ctx, a)?,
        None => a.clone(),
    };
    let right = match b_ref {
        Some(_) => to_string(ctx, b)?,
        None => b.clone(),
    };
    if !(left.is_concrete() && right.is_concrete()) {
        return Ok(Some(AbstractValue::Top));
    }
    if ctx.bridge().supports_binary(op) {
        return Ok(Some(ctx.bridge().binary(op, &left, &right)?));
    }
    Ok(None)
}

/// `==` where at least one side is an object. `None` means the object has to be
/// converted to a primitive first.
fn loose_reference_equality(a: &AbstractValue, b: &AbstractValue) -> Option<bool> {
    match (a, b) {
        (AbstractValue::Reference(x), AbstractValue::Reference(y)) => Some(x == y),
        (AbstractValue::Reference(_), AbstractValue::Undefined | AbstractValue::Null)
        | (AbstractValue::Undefined | AbstractValue::Null, AbstractValue::Reference(_)) => {
            Some(false)
        }
        _ => None,
    }
}

/// Only `f instanceof Function` for a callable `f` is decided.
fn instance_of(
    ctx: &EvalContext,
    instance: Option<ObjectId>,
    class: Option<ObjectId>,
) -> Result<AbstractValue, AnalysisError> {
    let function_global = ctx.registry().global("Function").and_then(|v| v.as_reference());
    if let (Some(instance), Some(class)) = (instance, class) {
        if Some(class) == function_global && ctx.object(instance)?.is_callable() {
            return Ok(AbstractValue::boolean(true));
        }
    }
    Ok(AbstractValue::Top)
}

pub fn update_handler(
    ctx: &EvalContext,
    op: UpdateOperator,
    v: &AbstractValue,
) -> Result<Option<AbstractValue>, AnalysisError> {
    let delta = match op {
        UpdateOperator::PlusPlus => 1.0,
        UpdateOperator::MinusMinus => -1.0,
    };
    Ok(Some(match to_number(ctx, v)?.as_number() {
        Some(n) => AbstractValue::number(n + delta),
        None => AbstractValue::Top,
    }))
}
