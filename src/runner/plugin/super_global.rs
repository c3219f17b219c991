//! Method-hook chain: the fallback consulted by property reads.
//!
//! ## How It Works
//!
//! When the host evaluates `receiver.name` and the receiver has no own
//! property `name`, the chain is consulted:
//!
//! ```text
//! JavaScript: arr.push(1)
//!      ↓
//! 1. Own property "push" on arr → not found
//! 2. Receiver category → Array
//! 3. Query resolvers for (Array, "push") in registration order
//! 4. The array hook says "yes" → ref(#n), the shared push native
//! 5. Nobody says yes → the read is Top
//! ```
//!
//! ## Caching Strategy
//!
//! - **First lookup**: Query all resolvers in order, cache which one owns the name
//! - **Subsequent lookups**: Use cached resolver index directly
//!
//! ## Example
//!
//! ```
//! use jsai::runner::plugin::core_resolver::CoreMethodHook;
//! use jsai::runner::plugin::resolver::ReceiverCategory;
//! use jsai::runner::plugin::super_global::MethodHookChain;
//! use jsai::runner::ds::value::ObjectId;
//!
//! let mut chain = MethodHookChain::new();
//! chain.add_resolver(Box::new(
//!     CoreMethodHook::new("array", vec![ReceiverCategory::Array])
//!         .with_method("push", ObjectId(3)),
//! ));
//!
//! assert_eq!(chain.resolve(ReceiverCategory::Array, "push"), Some(ObjectId(3)));
//! assert_eq!(chain.resolve(ReceiverCategory::String, "push"), None);
//! ```

use std::cell::RefCell;
use std::collections::HashMap;

use crate::runner::ds::value::ObjectId;
use crate::runner::plugin::resolver::{MethodHookResolver, ReceiverCategory};

pub struct MethodHookChain {
    /// Registered resolvers, queried in order.
    resolvers: Vec<Box<dyn MethodHookResolver>>,
    /// Which resolver owns which (category, name); `None` caches a miss.
    resolver_map: RefCell<HashMap<(ReceiverCategory, String), Option<usize>>>,
}

impl MethodHookChain {
    pub fn new() -> Self {
        MethodHookChain {
            resolvers: Vec::new(),
            resolver_map: RefCell::new(HashMap::new()),
        }
    }

    /// Register a resolver. Resolvers are queried in registration order.
    pub fn add_resolver(&mut self, resolver: Box<dyn MethodHookResolver>) {
        self.resolvers.push(resolver);
        self.resolver_map.borrow_mut().clear();
    }

    /// Find which resolver (if any) provides `name` for the category.
    fn find_resolver_index(&self, category: ReceiverCategory, name: &str) -> Option<usize> {
        let key = (category, name.to_string());
        if let Some(idx) = self.resolver_map.borrow().get(&key) {
            return *idx;
        }
        let idx = self
            .resolvers
            .iter()
            .position(|r| r.categories().contains(&category) && r.has_method(name));
        self.resolver_map.borrow_mut().insert(key, idx);
        idx
    }

    /// The native standing for `name` on receivers of `category`.
    pub fn resolve(&self, category: ReceiverCategory, name: &str) -> Option<ObjectId> {
        let idx = self.find_resolver_index(category, name)?;
        self.resolvers[idx].resolve(name)
    }

    /// Get a reference to the resolvers (for inspection/testing).
    pub fn resolvers(&self) -> &[Box<dyn MethodHookResolver>] {
        &self.resolvers
    }
}

impl Default for MethodHookChain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::plugin::core_resolver::CoreMethodHook;

    #[test]
    fn test_first_matching_resolver_wins() {
        let mut chain = MethodHookChain::new();
        chain.add_resolver(Box::new(
            CoreMethodHook::new("first", vec![ReceiverCategory::String])
                .with_method("slice", ObjectId(1)),
        ));
        chain.add_resolver(Box::new(
            CoreMethodHook::new("second", vec![ReceiverCategory::String, ReceiverCategory::Array])
                .with_method("slice", ObjectId(2))
                .with_method("indexOf", ObjectId(3)),
        ));
        assert_eq!(chain.resolve(ReceiverCategory::String, "slice"), Some(ObjectId(1)));
        assert_eq!(chain.resolve(ReceiverCategory::Array, "slice"), Some(ObjectId(2)));
        assert_eq!(chain.resolve(ReceiverCategory::String, "indexOf"), Some(ObjectId(3)));
        assert_eq!(chain.resolve(ReceiverCategory::Callable, "indexOf"), None);
    }

    #[test]
    fn test_resolution_is_stable() {
        let mut chain = MethodHookChain::new();
        chain.add_resolver(Box::new(
            CoreMethodHook::new("array", vec![ReceiverCategory::Array])
                .with_method("push", ObjectId(7)),
        ));
        let first = chain.resolve(ReceiverCategory::Array, "push");
        let second = chain.resolve(ReceiverCategory::Array, "push");
        assert_eq!(first, second);
    }
}
