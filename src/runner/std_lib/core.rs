//! Core built-ins registration.

use crate::runner::ds::value::AbstractValue;
use crate::runner::plugin::registry::BuiltInRegistry;

use super::{array, diagnostics, function, global, math, number, operators, regexp, string};

/// Register the operator handlers, global constants, built-in objects and
/// method hooks with the registry.
pub fn register_core_builtins(registry: &mut BuiltInRegistry) {
    operators::register(registry);

    registry.register_global_symbol("undefined", AbstractValue::Undefined);
    registry.register_global_symbol("NaN", AbstractValue::number(f64::NAN));
    registry.register_global_symbol("Infinity", AbstractValue::number(f64::INFINITY));

    // `indexOf` is one native shared by arrays and strings.
    let index_of = array::register(registry);
    string::register(registry, index_of);
    let function_global = function::register(registry);
    number::register(registry, function_global);
    math::register(registry);
    global::register(registry);
    regexp::register(registry);
    diagnostics::register(registry);
}
