//! Table-driven method hook used by the core built-ins.

use std::collections::HashMap;

use crate::runner::ds::value::ObjectId;
use crate::runner::plugin::resolver::{MethodHookResolver, ReceiverCategory};

/// Maps method names to natives registered in the `BuiltInRegistry`.
pub struct CoreMethodHook {
    name: String,
    categories: Vec<ReceiverCategory>,
    methods: HashMap<String, ObjectId>,
}

impl CoreMethodHook {
    pub fn new(name: impl Into<String>, categories: Vec<ReceiverCategory>) -> Self {
        CoreMethodHook {
            name: name.into(),
            categories,
            methods: HashMap::new(),
        }
    }

    pub fn with_method(mut self, name: impl Into<String>, id: ObjectId) -> Self {
        self.methods.insert(name.into(), id);
        self
    }

    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }
}

impl MethodHookResolver for CoreMethodHook {
    fn categories(&self) -> &[ReceiverCategory] {
        &self.categories
    }

    fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    fn resolve(&self, name: &str) -> Option<ObjectId> {
        self.methods.get(name).copied()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
