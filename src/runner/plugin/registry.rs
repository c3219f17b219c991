//! Built-in registry: preexisting objects, native functions, global symbols,
//! method hooks and operator handlers.
//!
//! Everything here is populated once during setup and only read afterwards.

use std::collections::HashMap;

use log::debug;

use super::resolver::MethodHookResolver;
use super::super_global::MethodHookChain;
use super::types::{BinaryHandler, BuiltInFn, BuiltInObject, UnaryHandler, UpdateHandler};
use crate::runner::ds::function_object::NativeId;
use crate::runner::ds::object::AbstractObject;
use crate::runner::ds::value::{AbstractValue, ObjectId};
use crate::runner::std_lib::register_core_builtins;

pub struct BuiltInRegistry {
    /// Objects every analysis run starts with; index `i` is `ObjectId(i)`.
    objects: Vec<AbstractObject>,
    natives: Vec<BuiltInFn>,
    globals: Vec<(String, AbstractValue)>,
    global_index: HashMap<String, usize>,
    method_hooks: MethodHookChain,
    unary_handlers: Vec<UnaryHandler>,
    binary_handlers: Vec<BinaryHandler>,
    update_handlers: Vec<UpdateHandler>,
}

impl BuiltInRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        BuiltInRegistry {
            objects: vec![],
            natives: vec![],
            globals: vec![],
            global_index: HashMap::new(),
            method_hooks: MethodHookChain::new(),
            unary_handlers: vec![],
            binary_handlers: vec![],
            update_handlers: vec![],
        }
    }

    /// Create a registry with the core built-ins, hooks and operator handlers.
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        register_core_builtins(&mut registry);
        debug!(
            "core built-ins registered: {} objects, {} natives, {} globals",
            registry.objects.len(),
            registry.natives.len(),
            registry.globals.len()
        );
        registry
    }

    /// Binds `name` in the global scope of every run. Re-registering replaces the value.
    pub fn register_global_symbol(&mut self, name: impl Into<String>, value: AbstractValue) {
        let name = name.into();
        match self.global_index.get(&name) {
            Some(i) => self.globals[*i].1 = value,
            None => {
                self.global_index.insert(name.clone(), self.globals.len());
                self.globals.push((name, value));
            }
        }
    }

    pub fn register_preexisting_object(&mut self, obj: AbstractObject) -> ObjectId {
        self.objects.push(obj);
        ObjectId(self.objects.len() - 1)
    }

    /// Registers a native and the callable object standing for it.
    pub fn register_native(&mut self, func: BuiltInFn) -> ObjectId {
        self.natives.push(func);
        let native = NativeId(self.natives.len() - 1);
        self.register_preexisting_object(AbstractObject::new_native(native))
    }

    /// Registers a built-in object with its methods and binds it as a global.
    pub fn register_object(&mut self, obj: BuiltInObject) -> ObjectId {
        let BuiltInObject {
            name,
            methods,
            properties,
            constructor,
        } = obj;
        let mut target = match constructor {
            Some(ctor) => {
                self.natives.push(ctor);
                AbstractObject::new_native(NativeId(self.natives.len() - 1))
            }
            None => AbstractObject::new_plain(),
        };
        for method in methods {
            let method_name = method.name.clone();
            let id = self.register_native(method);
            target.set(method_name.as_str().into(), AbstractValue::Reference(id));
        }
        for (prop_name, value) in properties {
            target.set(prop_name.as_str().into(), value);
        }
        let id = self.register_preexisting_object(target);
        self.register_global_symbol(name, AbstractValue::Reference(id));
        id
    }

    pub fn register_method_hook(&mut self, resolver: Box<dyn MethodHookResolver>) {
        self.method_hooks.add_resolver(resolver);
    }

    pub fn register_unary_handler(&mut self, handler: UnaryHandler) {
        self.unary_handlers.push(handler);
    }

    pub fn register_binary_handler(&mut self, handler: BinaryHandler) {
        self.binary_handlers.push(handler);
    }

    pub fn register_update_handler(&mut self, handler: UpdateHandler) {
        self.update_handlers.push(handler);
    }

    /// Adds a property to an already registered object, e.g. to tie two globals together.
    pub fn set_object_property(&mut self, id: ObjectId, name: &str, value: AbstractValue) {
        if let Some(obj) = self.objects.get_mut(id.0) {
            obj.set(name.into(), value);
        }
    }

    pub fn preexisting_objects(&self) -> &[AbstractObject] {
        &self.objects
    }

    pub fn native(&self, id: NativeId) -> Option<&BuiltInFn> {
        self.natives.get(id.0)
    }

    pub fn global_symbols(&self) -> &[(String, AbstractValue)] {
        &self.globals
    }

    pub fn global(&self, name: &str) -> Option<&AbstractValue> {
        self.global_index.get(name).map(|i| &self.globals[*i].1)
    }

    pub fn method_hooks(&self) -> &MethodHookChain {
        &self.method_hooks
    }

    pub fn unary_handlers(&self) -> &[UnaryHandler] {
        &self.unary_handlers
    }

    pub fn binary_handlers(&self) -> &[BinaryHandler] {
        &self.binary_handlers
    }

    pub fn update_handlers(&self) -> &[UpdateHandler] {
        &self.update_handlers
    }
}

impl Default for BuiltInRegistry {
    fn default() -> Self {
        Self::with_core()
    }
}
