//! Function built-in, `eval` and the `call`/`apply` hook.
//!
//! `eval` and the `Function` constructor parse their text at analysis time and
//! run it against the current abstract state. Each successful re-entry is
//! recorded as a `CallSiteAnnotation` on the context.

use std::mem;
use std::rc::Rc;

use log::{debug, warn};

use crate::parser::JsParser;
use crate::runner::ds::array_object::dense_elements;
use crate::runner::ds::env_record::Scopes;
use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::value::{AbstractValue, ObjectId, PrimitiveValue};
use crate::runner::ds::operations::type_conversion::to_concrete_string;
use crate::runner::eval::function::call_value;
use crate::runner::eval::statement::run_program;
use crate::runner::plugin::core_resolver::CoreMethodHook;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::resolver::ReceiverCategory;
use crate::runner::plugin::types::{
    BuiltInFn, BuiltInObject, CallSite, CallSiteAnnotation, EvalContext, ReentryKind,
};

use super::argument;

/// Register `Function`, `eval` and the callable method hook. Returns the
/// `Function` global.
pub fn register(registry: &mut BuiltInRegistry) -> ObjectId {
    let function = BuiltInObject::new("Function")
        .with_constructor(BuiltInFn::new("Function", function_constructor));
    let function_global = registry.register_object(function);

    let eval = registry.register_native(BuiltInFn::new("eval", eval));
    registry.register_global_symbol("eval", AbstractValue::Reference(eval));

    let hook = CoreMethodHook::new("function", vec![ReceiverCategory::Callable])
        .with_method("call", registry.register_native(BuiltInFn::new("call", function_call)))
        .with_method(
            "apply",
            registry.register_native(
                BuiltInFn::new("apply", function_apply)
                    .with_defaults(vec![AbstractValue::Undefined, AbstractValue::Undefined]),
            ),
        );
    registry.register_method_hook(Box::new(hook));
    function_global
}

/// Parses `source` and runs it on the current state. `global` runs it in the
/// global scope with an undefined `this`, as the `Function` constructor does.
pub fn reenter(
    ctx: &mut EvalContext,
    site: &CallSite,
    kind: ReentryKind,
    source: String,
    global: bool,
) -> Result<AbstractValue, AnalysisError> {
    let program = match JsParser::parse_to_ast_from_str(&source) {
        Ok(program) => Rc::new(program),
        Err(e) => {
            warn!("[{}] {} text at `{}` does not parse: {}", ctx.run_id, kind, site.text(), e);
            return Ok(AbstractValue::Top);
        }
    };
    debug!(
        "[{}] entering {} at depth {}: {} statements",
        ctx.run_id,
        kind,
        ctx.depth,
        program.body.len()
    );
    let source: Rc<str> = Rc::from(source);
    ctx.enter()?;
    let saved_source = mem::replace(&mut ctx.source, Rc::clone(&source));
    let saved_scope = ctx.scope;
    let saved_this = ctx.this_value.clone();
    if global {
        ctx.scope = Scopes::GLOBAL;
        ctx.this_value = AbstractValue::Undefined;
    }
    let result = run_program(ctx, &program);
    ctx.source = saved_source;
    ctx.scope = saved_scope;
    ctx.this_value = saved_this;
    ctx.leave();
    let value = result?;
    debug!("[{}] {} at `{}` produced {}", ctx.run_id, kind, site.text(), value);
    ctx.annotations.push(CallSiteAnnotation {
        call_site: site.meta().cloned(),
        kind,
        source,
        program,
    });
    Ok(value)
}

/// eval
fn eval(
    ctx: &mut EvalContext,
    site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    match argument(&args, 0) {
        AbstractValue::Primitive(PrimitiveValue::String(source)) => {
            reenter(ctx, site, ReentryKind::Eval, source, false)
        }
        AbstractValue::Top => {
            debug!("[{}] eval of unknown text at `{}`", ctx.run_id, site.text());
            Ok(AbstractValue::Top)
        }
        AbstractValue::Union(members)
            if members
                .iter()
                .any(|m| matches!(m, AbstractValue::Primitive(PrimitiveValue::String(_)))) =>
        {
            debug!("[{}] eval of one of several texts at `{}`", ctx.run_id, site.text());
            Ok(AbstractValue::Top)
        }
        other => Ok(other),
    }
}

/// Function constructor: parameter names first, body last.
fn function_constructor(
    ctx: &mut EvalContext,
    site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let mut texts = Vec::with_capacity(args.len());
    for arg in &args {
        match to_concrete_string(ctx, arg)? {
            Some(text) => texts.push(text),
            None => {
                debug!("[{}] Function built from unknown text at `{}`", ctx.run_id, site.text());
                return Ok(AbstractValue::Top);
            }
        }
    }
    let body = texts.pop().unwrap_or_default();
    let source = format!("(function anonymous({}\n) {{\n{}\n}})", texts.join(","), body);
    reenter(ctx, site, ReentryKind::FunctionConstructor, source, true)
}

/// Function.prototype.call
fn function_call(
    ctx: &mut EvalContext,
    site: &CallSite,
    this: AbstractValue,
    mut args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let this_arg = if args.is_empty() {
        AbstractValue::Undefined
    } else {
        args.remove(0)
    };
    call_value(ctx, site, &this, this_arg, args)
}

/// Function.prototype.apply
fn function_apply(
    ctx: &mut EvalContext,
    site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let this_arg = argument(&args, 0);
    let list = argument(&args, 1);
    let call_args = match &list {
        AbstractValue::Undefined | AbstractValue::Null => Some(vec![]),
        AbstractValue::Reference(id) => {
            dense_elements(ctx.object(*id)?).map(|elements| elements.into_iter().cloned().collect())
        }
        _ => None,
    };
    match call_args {
        Some(call_args) => call_value(ctx, site, &this, this_arg, call_args),
        None => {
            debug!("apply with an unknown argument list, degrading what the call can reach");
            ctx.state.store.degrade_reachable(&[this, this_arg, list]);
            Ok(AbstractValue::Top)
        }
    }
}
