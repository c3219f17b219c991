//! Expression evaluation.
//!
//! Every expression evaluates to an abstract value. Operators go through the
//! handler chains in [`super::operators`], property access through the object
//! model, and short-circuiting constructs whose test is not known explore both
//! outcomes and join the resulting states.

use std::rc::Rc;

use log::debug;

use crate::parser::ast::{
    AssignmentOperator, ExpressionType, LiteralData, LogicalOperator, MemberExpressionType,
    PropertyData, PropertyKeyType, UnaryOperator, UpdateOperator,
};
use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::function_object::FunctionObject;
use crate::runner::ds::object::AbstractObject;
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::object::{delete_property, get_property, set_property};
use crate::runner::ds::operations::type_conversion::{
    known_truthiness, to_number, to_property_key,
};
use crate::runner::ds::value::AbstractValue;
use crate::runner::plugin::types::{CallSite, EvalContext};
use crate::runner::std_lib::regexp::new_regexp;

use super::function::{call_value, construct};
use super::operators::{apply_binary, apply_unary, apply_update};
use super::types::ValueResult;

/// Evaluate an expression and return its value.
pub fn evaluate_expression(ctx: &mut EvalContext, expr: &ExpressionType) -> ValueResult {
    match expr {
        ExpressionType::Literal { value, .. } => evaluate_literal(ctx, value),

        ExpressionType::Identifier(id) => Ok(lookup_identifier(ctx, &id.name)),

        ExpressionType::ThisExpression { .. } => Ok(ctx.this_value.clone()),

        ExpressionType::ArrayExpression { elements, .. } => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(match element {
                    Some(e) => Some(evaluate_expression(ctx, e)?),
                    None => None,
                });
            }
            let id = ctx.allocate(AbstractObject::new_array(values))?;
            Ok(AbstractValue::Reference(id))
        }

        ExpressionType::ObjectExpression { properties, .. } => {
            evaluate_object_literal(ctx, properties)
        }

        ExpressionType::FunctionExpression(f) => {
            let function = FunctionObject::new(f.clone(), ctx.source.clone(), ctx.scope);
            let id = ctx.allocate(AbstractObject::new_function(function))?;
            Ok(AbstractValue::Reference(id))
        }

        ExpressionType::UnaryExpression {
            operator, argument, ..
        } => evaluate_unary_expression(ctx, *operator, argument),

        ExpressionType::UpdateExpression {
            operator,
            argument,
            prefix,
            ..
        } => evaluate_update_expression(ctx, *operator, argument, *prefix),

        ExpressionType::BinaryExpression {
            operator,
            left,
            right,
            ..
        } => {
            let left = evaluate_expression(ctx, left)?;
            let right = evaluate_expression(ctx, right)?;
            apply_binary(ctx, *operator, &left, &right)
        }

        ExpressionType::LogicalExpression {
            operator,
            left,
            right,
            ..
        } => evaluate_logical_expression(ctx, *operator, left, right),

        ExpressionType::AssignmentExpression {
            operator,
            left,
            right,
            ..
        } => evaluate_assignment_expression(ctx, *operator, left, right),

        ExpressionType::ConditionalExpression {
            test,
            consequent,
            alternate,
            ..
        } => evaluate_conditional_expression(ctx, test, consequent, alternate),

        ExpressionType::CallExpression {
            callee, arguments, ..
        } => {
            let (this, callee) = match callee.as_ref() {
                ExpressionType::MemberExpression(member) => {
                    let (receiver, key) = evaluate_member_target(ctx, member)?;
                    let method = get_property(ctx, &receiver, &key)?;
                    (receiver, method)
                }
                other => (AbstractValue::Undefined, evaluate_expression(ctx, other)?),
            };
            let args = evaluate_arguments(ctx, arguments)?;
            let source = Rc::clone(&ctx.source);
            let site = CallSite::new(expr, &source, false);
            call_value(ctx, &site, &callee, this, args)
        }

        ExpressionType::NewExpression {
            callee, arguments, ..
        } => {
            let callee = evaluate_expression(ctx, callee)?;
            let args = evaluate_arguments(ctx, arguments)?;
            let source = Rc::clone(&ctx.source);
            let site = CallSite::new(expr, &source, true);
            construct(ctx, &site, &callee, args)
        }

        ExpressionType::MemberExpression(member) => {
            let (receiver, key) = evaluate_member_target(ctx, member)?;
            get_property(ctx, &receiver, &key)
        }

        ExpressionType::SequenceExpression { expressions, .. } => {
            let mut value = AbstractValue::Undefined;
            for e in expressions {
                value = evaluate_expression(ctx, e)?;
            }
            Ok(value)
        }
    }
}

fn evaluate_literal(ctx: &mut EvalContext, lit: &LiteralData) -> ValueResult {
    Ok(match lit {
        LiteralData::NullLiteral => AbstractValue::Null,
        LiteralData::BooleanLiteral(b) => AbstractValue::boolean(*b),
        LiteralData::StringLiteral(s) => AbstractValue::string(s.clone()),
        LiteralData::UnpairedStringLiteral => AbstractValue::Top,
        LiteralData::NumberLiteral(n) => AbstractValue::number(*n),
        LiteralData::RegExpLiteral { pattern, flags } => {
            let obj = ctx.allocate(AbstractObject::new_plain())?;
            new_regexp(ctx, obj, pattern, flags)?
        }
    })
}

/// Unbound names are unknown: they may be host globals the analyzer does not model.
fn lookup_identifier(ctx: &EvalContext, name: &str) -> AbstractValue {
    match ctx.state.scopes.lookup(ctx.scope, name) {
        Some(value) => value.clone(),
        None => {
            debug!("unbound identifier `{}`", name);
            AbstractValue::Top
        }
    }
}

fn evaluate_arguments(
    ctx: &mut EvalContext,
    arguments: &[ExpressionType],
) -> Result<Vec<AbstractValue>, AnalysisError> {
    let mut args = Vec::with_capacity(arguments.len());
    for a in arguments {
        args.push(evaluate_expression(ctx, a)?);
    }
    Ok(args)
}

fn evaluate_object_literal(ctx: &mut EvalContext, properties: &[PropertyData]) -> ValueResult {
    let mut obj = AbstractObject::new_plain();
    for property in properties {
        let key = match &property.key {
            PropertyKeyType::Named(name) => Some(PropertyKey::from_name(name)),
            PropertyKeyType::Computed(e) => {
                let key = evaluate_expression(ctx, e)?;
                to_property_key(ctx, &key)?
            }
        };
        let value = evaluate_expression(ctx, &property.value)?;
        match key {
            Some(key) => obj.set(key, value),
            None => obj.forget_all(),
        }
    }
    let id = ctx.allocate(obj)?;
    Ok(AbstractValue::Reference(id))
}

/// Receiver and key of a member expression; `a.b` has the key `"b"`.
fn evaluate_member_target(
    ctx: &mut EvalContext,
    member: &MemberExpressionType,
) -> Result<(AbstractValue, AbstractValue), AnalysisError> {
    match member {
        MemberExpressionType::SimpleMemberExpression {
            object, property, ..
        } => {
            let receiver = evaluate_expression(ctx, object)?;
            Ok((receiver, AbstractValue::string(property.name.clone())))
        }
        MemberExpressionType::ComputedMemberExpression {
            object, property, ..
        } => {
            let receiver = evaluate_expression(ctx, object)?;
            let key = evaluate_expression(ctx, property)?;
            Ok((receiver, key))
        }
    }
}

fn evaluate_unary_expression(
    ctx: &mut EvalContext,
    operator: UnaryOperator,
    argument: &ExpressionType,
) -> ValueResult {
    if operator == UnaryOperator::Delete {
        return match argument {
            ExpressionType::MemberExpression(member) => {
                let (receiver, key) = evaluate_member_target(ctx, member)?;
                delete_property(ctx, &receiver, &key)?;
                Ok(match receiver {
                    AbstractValue::Reference(_) => AbstractValue::boolean(true),
                    _ => AbstractValue::Top,
                })
            }
            ExpressionType::Identifier(_) => Ok(AbstractValue::Top),
            other => {
                evaluate_expression(ctx, other)?;
                Ok(AbstractValue::boolean(true))
            }
        };
    }
    let value = evaluate_expression(ctx, argument)?;
    apply_unary(ctx, operator, &value)
}

/// Where an assignment or update writes to.
enum AssignmentTarget {
    Binding(String),
    Property(AbstractValue, AbstractValue),
}

fn evaluate_assignment_target(
    ctx: &mut EvalContext,
    target: &ExpressionType,
) -> Result<Option<AssignmentTarget>, AnalysisError> {
    Ok(match target {
        ExpressionType::Identifier(id) => Some(AssignmentTarget::Binding(id.name.clone())),
        ExpressionType::MemberExpression(member) => {
            let (receiver, key) = evaluate_member_target(ctx, member)?;
            Some(AssignmentTarget::Property(receiver, key))
        }
        _ => None,
    })
}

fn read_target(ctx: &EvalContext, target: &AssignmentTarget) -> ValueResult {
    match target {
        AssignmentTarget::Binding(name) => Ok(lookup_identifier(ctx, name)),
        AssignmentTarget::Property(receiver, key) => get_property(ctx, receiver, key),
    }
}

fn write_target(
    ctx: &mut EvalContext,
    target: &AssignmentTarget,
    value: AbstractValue,
) -> Result<(), AnalysisError> {
    match target {
        AssignmentTarget::Binding(name) => {
            let scope = ctx.scope;
            ctx.state.scopes.assign(scope, name, value);
            Ok(())
        }
        AssignmentTarget::Property(receiver, key) => set_property(ctx, receiver, key, value),
    }
}

fn evaluate_assignment_expression(
    ctx: &mut EvalContext,
    operator: AssignmentOperator,
    left: &ExpressionType,
    right: &ExpressionType,
) -> ValueResult {
    let target = match evaluate_assignment_target(ctx, left)? {
        Some(target) => target,
        None => {
            debug!("assignment to an unsupported target ignored");
            return evaluate_expression(ctx, right);
        }
    };
    let value = match operator.binary_operator() {
        None => evaluate_expression(ctx, right)?,
        Some(op) => {
            let old = read_target(ctx, &target)?;
            let right = evaluate_expression(ctx, right)?;
            apply_binary(ctx, op, &old, &right)?
        }
    };
    write_target(ctx, &target, value.clone())?;
    Ok(value)
}

fn evaluate_update_expression(
    ctx: &mut EvalContext,
    operator: UpdateOperator,
    argument: &ExpressionType,
    prefix: bool,
) -> ValueResult {
    let target = match evaluate_assignment_target(ctx, argument)? {
        Some(target) => target,
        None => return Ok(AbstractValue::Top),
    };
    let old = read_target(ctx, &target)?;
    let new = apply_update(ctx, operator, &old)?;
    write_target(ctx, &target, new.clone())?;
    if prefix {
        Ok(new)
    } else {
        to_number(ctx, &old)
    }
}

fn evaluate_logical_expression(
    ctx: &mut EvalContext,
    operator: LogicalOperator,
    left: &ExpressionType,
    right: &ExpressionType,
) -> ValueResult {
    let left = evaluate_expression(ctx, left)?;
    let short_circuits_on = operator == LogicalOperator::Or;
    match known_truthiness(ctx, &left)? {
        Some(truthy) if truthy == short_circuits_on => Ok(left),
        Some(_) => evaluate_expression(ctx, right),
        None => {
            let right = evaluate_optionally(ctx, right)?;
            Ok(left.join(right).widen(ctx.max_union_size()))
        }
    }
}

fn evaluate_conditional_expression(
    ctx: &mut EvalContext,
    test: &ExpressionType,
    consequent: &ExpressionType,
    alternate: &ExpressionType,
) -> ValueResult {
    let test = evaluate_expression(ctx, test)?;
    match known_truthiness(ctx, &test)? {
        Some(true) => evaluate_expression(ctx, consequent),
        Some(false) => evaluate_expression(ctx, alternate),
        None => {
            let before = ctx.state.clone();
            let first = evaluate_expression(ctx, consequent)?;
            let second_state = before.fork_after(&ctx.state);
            let first_state = std::mem::replace(&mut ctx.state, second_state);
            let second = evaluate_expression(ctx, alternate)?;
            let second_state = std::mem::take(&mut ctx.state);
            let max_union_size = ctx.max_union_size();
            ctx.state = first_state.join(second_state, max_union_size);
            Ok(first.join(second).widen(max_union_size))
        }
    }
}

/// Evaluates an expression that may or may not run: its effects are joined with the skipped path.
fn evaluate_optionally(ctx: &mut EvalContext, expr: &ExpressionType) -> ValueResult {
    let before = ctx.state.clone();
    let value = evaluate_expression(ctx, expr)?;
    let skipped = before.fork_after(&ctx.state);
    let taken = std::mem::take(&mut ctx.state);
    ctx.state = taken.join(skipped, ctx.max_union_size());
    Ok(value)
}
