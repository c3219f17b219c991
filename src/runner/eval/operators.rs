//! Operator dispatch.
//!
//! Operators are resolved by the handler chains of the registry: the first
//! handler that answers decides the result, and an operator nobody answers
//! for is `Top`. Unions are split before the handlers see them, so every
//! handler only ever deals with a single alternative.

use log::trace;

use crate::parser::ast::{BinaryOperator, UnaryOperator, UpdateOperator};
use crate::runner::ds::value::AbstractValue;
use crate::runner::plugin::types::EvalContext;

use super::types::ValueResult;

/// Result of `op v`.
pub fn apply_unary(ctx: &EvalContext, op: UnaryOperator, v: &AbstractValue) -> ValueResult {
    match v {
        AbstractValue::Bottom => Ok(AbstractValue::Bottom),
        AbstractValue::Union(members) => {
            let mut result = AbstractValue::Bottom;
            for m in members {
                result = result.join(apply_unary(ctx, op, m)?);
            }
            Ok(result.widen(ctx.max_union_size()))
        }
        _ => {
            for handler in ctx.registry().unary_handlers() {
                if let Some(result) = handler(ctx, op, v)? {
                    trace!("{}{} = {}", op, v, result);
                    return Ok(result);
                }
            }
            trace!("{}{}: no handler, Top", op, v);
            Ok(AbstractValue::Top)
        }
    }
}

/// Result of `a op b`. Union operands are split on both sides.
pub fn apply_binary(
    ctx: &EvalContext,
    op: BinaryOperator,
    a: &AbstractValue,
    b: &AbstractValue,
) -> ValueResult {
    match (a, b) {
        (AbstractValue::Bottom, _) | (_, AbstractValue::Bottom) => Ok(AbstractValue::Bottom),
        (AbstractValue::Union(members), _) => {
            let mut result = AbstractValue::Bottom;
            for m in members {
                result = result.join(apply_binary(ctx, op, m, b)?);
            }
            Ok(result.widen(ctx.max_union_size()))
        }
        (_, AbstractValue::Union(members)) => {
            let mut result = AbstractValue::Bottom;
            for m in members {
                result = result.join(apply_binary(ctx, op, a, m)?);
            }
            Ok(result.widen(ctx.max_union_size()))
        }
        _ => {
            for handler in ctx.registry().binary_handlers() {
                if let Some(result) = handler(ctx, op, a, b)? {
                    trace!("{} {} {} = {}", a, op, b, result);
                    return Ok(result);
                }
            }
            trace!("{} {} {}: no handler, Top", a, op, b);
            Ok(AbstractValue::Top)
        }
    }
}

/// New value of the target of `++`/`--`.
pub fn apply_update(ctx: &EvalContext, op: UpdateOperator, v: &AbstractValue) -> ValueResult {
    match v {
        AbstractValue::Bottom => Ok(AbstractValue::Bottom),
        AbstractValue::Union(members) => {
            let mut result = AbstractValue::Bottom;
            for m in members {
                result = result.join(apply_update(ctx, op, m)?);
            }
            Ok(result.widen(ctx.max_union_size()))
        }
        _ => {
            for handler in ctx.registry().update_handlers() {
                if let Some(result) = handler(ctx, op, v)? {
                    trace!("{}{} = {}", v, op, result);
                    return Ok(result);
                }
            }
            Ok(AbstractValue::Top)
        }
    }
}
