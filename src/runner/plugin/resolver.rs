//! Method-hook resolver trait.
//!
//! When `receiver.name` is not an own property of the receiver, the resolver
//! chain is asked for a built-in method instead. This keeps prototype methods
//! off every individual object: the hook hands out a reference to one shared
//! native, so the same method always resolves to the same `ObjectId`.

use crate::runner::ds::value::ObjectId;

/// Kind of receiver a hook applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverCategory {
    /// Non-callable objects that are, or may be, arrays.
    Array,
    String,
    Number,
    Callable,
    /// Objects carrying a compiled pattern.
    RegExp,
}

pub trait MethodHookResolver {
    /// Receiver categories this resolver answers for.
    fn categories(&self) -> &[ReceiverCategory];

    /// Does this resolver provide `name`?
    ///
    /// This should be a cheap check and must not allocate.
    fn has_method(&self, name: &str) -> bool;

    /// The preregistered native for `name`. Called only after `has_method` returns `true`.
    fn resolve(&self, name: &str) -> Option<ObjectId>;

    /// Human-readable name for this resolver (for debugging/logging).
    fn name(&self) -> &str;
}
