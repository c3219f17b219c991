//! Analyzer introspection built-ins.
//!
//! Test scripts call these to check what the analysis knows at a given point.
//! `___assert` failing aborts the run with `AnalysisError::AssertionFailed`.

use log::info;

use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::operations::type_conversion::known_truthiness;
use crate::runner::ds::value::AbstractValue;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInFn, CallSite, EvalContext};

use super::argument;

/// Register the diagnostic globals.
pub fn register(registry: &mut BuiltInRegistry) {
    let assert = registry.register_native(
        BuiltInFn::new("___assert", assert).with_defaults(vec![AbstractValue::Undefined]),
    );
    registry.register_global_symbol("___assert", AbstractValue::Reference(assert));
    let display = registry.register_native(BuiltInFn::new("___display", display));
    registry.register_global_symbol("___display", AbstractValue::Reference(display));
    let state = registry.register_native(BuiltInFn::new("___state", dump_state));
    registry.register_global_symbol("___state", AbstractValue::Reference(state));
    let concretizable = registry.register_native(
        BuiltInFn::new("___is_concretizable", is_concretizable)
            .with_defaults(vec![AbstractValue::Undefined]),
    );
    registry.register_global_symbol(
        "___is_concretizable",
        AbstractValue::Reference(concretizable),
    );
}

/// Passes only when the argument is known to be truthy.
fn assert(
    ctx: &mut EvalContext,
    site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let value = argument(&args, 0);
    if known_truthiness(ctx, &value)? == Some(true) {
        return Ok(AbstractValue::Undefined);
    }
    Err(AnalysisError::AssertionFailed {
        expression: site.argument_text(0).unwrap_or_else(|| site.text()).to_string(),
        value: value.to_string(),
    })
}

fn display(
    ctx: &mut EvalContext,
    site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    for (i, value) in args.iter().enumerate() {
        let text = site.argument_text(i).unwrap_or("<argument>");
        info!("[{}] {} = {}", ctx.run_id, text, value);
    }
    Ok(AbstractValue::Undefined)
}

fn dump_state(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    _args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let store = &ctx.state.store;
    info!(
        "[{}] state: {} objects ({} preexisting), depth {}, value {}",
        ctx.run_id,
        store.len(),
        store.preexisting_count(),
        ctx.depth,
        ctx.state.value
    );
    let mut bindings: Vec<_> = ctx.state.scopes.global_bindings().iter().collect();
    bindings.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in bindings {
        info!("[{}]   {} = {}", ctx.run_id, name, value);
    }
    for (id, obj) in store.iter().skip(store.preexisting_count()) {
        info!("[{}]   {} = {:?}", ctx.run_id, id, obj.properties());
    }
    Ok(AbstractValue::Top)
}

fn is_concretizable(
    _ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(AbstractValue::boolean(!argument(&args, 0).is_top()))
}
