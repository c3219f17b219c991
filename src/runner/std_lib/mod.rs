//! Standard library built-ins.
//!
//! Every built-in works on abstract values: inputs that are not precisely
//! known produce `Top`, never an error. Prototype methods are not stored on
//! objects; each module registers a method hook handing out its natives.

pub mod array;
pub mod core;
pub mod diagnostics;
pub mod function;
pub mod global;
pub mod math;
pub mod number;
pub mod operators;
pub mod regexp;
pub mod string;

pub use self::core::register_core_builtins;

use crate::runner::ds::value::AbstractValue;

/// Positional argument, `undefined` when it was not passed.
pub(crate) fn argument(args: &[AbstractValue], index: usize) -> AbstractValue {
    args.get(index).cloned().unwrap_or(AbstractValue::Undefined)
}
