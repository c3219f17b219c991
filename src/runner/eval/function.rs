//! Function call execution.
//!
//! Calls dispatch on the callee's object kind: natives run through the
//! registry, program functions run their body in a fresh scope chained to the
//! scope they were created in. Anything else is an unknown callee, which may
//! have done anything to the objects it was handed.

use std::rc::Rc;

use log::debug;

use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::execution_context::AnalysisState;
use crate::runner::ds::function_object::FunctionObject;
use crate::runner::ds::object::{AbstractObject, ObjectKind};
use crate::runner::ds::value::{AbstractValue, ObjectId};
use crate::runner::plugin::types::{CallSite, EvalContext};

use super::statement::{execute_statements, hoist_declarations};
use super::types::{Completion, ValueResult};

/// Call `callee` with `this` and `args`.
pub fn call_value(
    ctx: &mut EvalContext,
    site: &CallSite,
    callee: &AbstractValue,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> ValueResult {
    match callee {
        AbstractValue::Reference(id) => call_object(ctx, site, *id, this, args),
        AbstractValue::Union(members) => {
            let members = members.clone();
            call_each(ctx, &members, |ctx, member| {
                call_value(ctx, site, member, this.clone(), args.clone())
            })
        }
        AbstractValue::Bottom => Ok(AbstractValue::Bottom),
        _ => Ok(unknown_call(ctx, site, this, args)),
    }
}

/// `new callee(args)`.
pub fn construct(
    ctx: &mut EvalContext,
    site: &CallSite,
    callee: &AbstractValue,
    args: Vec<AbstractValue>,
) -> ValueResult {
    match callee {
        AbstractValue::Reference(id) => {
            let id = *id;
            let is_native = matches!(ctx.object(id)?.kind, ObjectKind::Native(_));
            let instance = ctx.allocate(AbstractObject::new_plain())?;
            let result = call_object(ctx, site, id, AbstractValue::Reference(instance), args)?;
            Ok(match result {
                AbstractValue::Reference(_) => result,
                AbstractValue::Top | AbstractValue::Union(_) => AbstractValue::Top,
                _ if is_native => AbstractValue::Top,
                _ => AbstractValue::Reference(instance),
            })
        }
        AbstractValue::Union(members) => {
            let members = members.clone();
            call_each(ctx, &members, |ctx, member| {
                construct(ctx, site, member, args.clone())
            })
        }
        AbstractValue::Bottom => Ok(AbstractValue::Bottom),
        _ => Ok(unknown_call(ctx, site, AbstractValue::Undefined, args)),
    }
}

/// Runs `call` once per possible callee, each on its own fork of the state, and joins.
fn call_each<F>(ctx: &mut EvalContext, members: &[AbstractValue], mut call: F) -> ValueResult
where
    F: FnMut(&mut EvalContext, &AbstractValue) -> ValueResult,
{
    let max_union_size = ctx.max_union_size();
    let before = ctx.state.clone();
    let mut joined: Option<AnalysisState> = None;
    let mut result = AbstractValue::Bottom;
    for member in members {
        if let Some(done) = &joined {
            ctx.state = before.clone().fork_after(done);
        }
        result = result.join(call(ctx, member)?);
        let branch = std::mem::take(&mut ctx.state);
        joined = Some(match joined {
            Some(done) => done.join(branch, max_union_size),
            None => branch,
        });
    }
    ctx.state = joined.unwrap_or(before);
    Ok(result.widen(max_union_size))
}

fn unknown_call(
    ctx: &mut EvalContext,
    site: &CallSite,
    this: AbstractValue,
    mut args: Vec<AbstractValue>,
) -> AbstractValue {
    debug!("call of an unknown callee at `{}`", site.text());
    args.push(this);
    ctx.state.store.degrade_reachable(&args);
    AbstractValue::Top
}

fn call_object(
    ctx: &mut EvalContext,
    site: &CallSite,
    id: ObjectId,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> ValueResult {
    let kind = ctx.object(id)?.kind.clone();
    match kind {
        ObjectKind::Native(native) => {
            let runtime = Rc::clone(&ctx.runtime);
            let func = runtime.registry.native(native).ok_or_else(|| {
                AnalysisError::defect("call", "native lookup", &AbstractValue::Reference(id))
            })?;
            func.call(ctx, site, this, args)
        }
        ObjectKind::Function(function) => call_function(ctx, id, &function, this, args),
        ObjectKind::Plain => {
            debug!("call of non-callable object {} at `{}`", id, site.text());
            Ok(AbstractValue::Top)
        }
    }
}

/// Runs a program function's body. The result joins every value the body may return.
pub fn call_function(
    ctx: &mut EvalContext,
    id: ObjectId,
    function: &FunctionObject,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> ValueResult {
    ctx.enter()?;
    let scope = ctx.state.scopes.new_scope(function.scope);
    if let Some(name) = &function.code.id {
        ctx.state
            .scopes
            .declare(scope, &name.name, AbstractValue::Reference(id));
    }
    let arguments = AbstractObject::new_array(args.iter().cloned().map(Some).collect());
    let arguments = match ctx.allocate(arguments) {
        Ok(arguments) => arguments,
        Err(e) => {
            ctx.leave();
            return Err(e);
        }
    };
    ctx.state
        .scopes
        .declare(scope, "arguments", AbstractValue::Reference(arguments));
    for (i, param) in function.code.params.iter().enumerate() {
        let value = args.get(i).cloned().unwrap_or(AbstractValue::Undefined);
        ctx.state.scopes.declare(scope, &param.name, value);
    }

    let saved_scope = std::mem::replace(&mut ctx.scope, scope);
    let saved_this = std::mem::replace(&mut ctx.this_value, this);
    let saved_source = std::mem::replace(&mut ctx.source, Rc::clone(&function.source));
    let saved_value = ctx.state.value.clone();

    let result = hoist_declarations(ctx, &function.code.body, scope)
        .and_then(|_| execute_statements(ctx, &function.code.body));

    ctx.scope = saved_scope;
    ctx.this_value = saved_this;
    ctx.source = saved_source;
    ctx.state.value = saved_value;
    ctx.leave();

    Ok(match result? {
        Completion::Normal => AbstractValue::Undefined,
        Completion::Return(v) => v,
        Completion::MaybeReturn(v) => v.join(AbstractValue::Undefined),
    })
}
