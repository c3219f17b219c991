//! Core types shared by the built-ins, the operator handlers and the host.

use std::fmt;
use std::rc::Rc;

use log::debug;
use uuid::Uuid;

use crate::parser::ast::{
    BinaryOperator, ExpressionType, HasMeta, Meta, ProgramData, UnaryOperator, UpdateOperator,
};
use crate::runner::bridge::ConcreteBridge;
use crate::runner::ds::env_record::{ScopeId, Scopes};
use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::execution_context::AnalysisState;
use crate::runner::ds::heap::{HeapConfig, ObjectStore};
use crate::runner::ds::object::AbstractObject;
use crate::runner::ds::value::{AbstractValue, ObjectId};
use crate::runner::plugin::config::AnalysisConfig;
use crate::runner::plugin::registry::BuiltInRegistry;

/// Everything fixed at setup: registries, bridge and configuration.
pub struct Runtime {
    pub registry: BuiltInRegistry,
    pub bridge: ConcreteBridge,
    pub config: AnalysisConfig,
}

/// How a sub-program was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReentryKind {
    Eval,
    FunctionConstructor,
}

impl fmt::Display for ReentryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReentryKind::Eval => "eval",
            ReentryKind::FunctionConstructor => "fn_cons",
        })
    }
}

/// Sub-program parsed at an `eval`/`Function` call site, kept for downstream tooling.
#[derive(Debug, Clone)]
pub struct CallSiteAnnotation {
    /// Range of the call expression in the program that contains it.
    pub call_site: Option<Meta>,
    pub kind: ReentryKind,
    pub source: Rc<str>,
    pub program: Rc<ProgramData>,
}

/// The call expression a built-in is invoked from.
#[derive(Clone, Copy)]
pub struct CallSite<'a> {
    pub expression: Option<&'a ExpressionType>,
    pub source: &'a str,
    /// True for `new f(...)`.
    pub construct: bool,
}

impl<'a> CallSite<'a> {
    pub fn new(expression: &'a ExpressionType, source: &'a str, construct: bool) -> Self {
        CallSite {
            expression: Some(expression),
            source,
            construct,
        }
    }

    /// A call that does not come from program text.
    pub fn synthetic() -> CallSite<'static> {
        CallSite {
            expression: None,
            source: "",
            construct: false,
        }
    }

    pub fn meta(&self) -> Option<&'a Meta> {
        self.expression.map(|e| e.get_meta())
    }

    pub fn text(&self) -> &'a str {
        match self.meta() {
            Some(meta) => meta.source_text(self.source),
            None => "<native>",
        }
    }

    pub fn argument_text(&self, index: usize) -> Option<&'a str> {
        match self.expression? {
            ExpressionType::CallExpression { arguments, .. }
            | ExpressionType::NewExpression { arguments, .. } => arguments
                .get(index)
                .map(|a| a.get_meta().source_text(self.source)),
            _ => None,
        }
    }
}

/// Function signature for built-in methods.
/// Natives receive the context, the call site, `this` and the padded arguments.
pub type NativeFn = fn(
    ctx: &mut EvalContext,
    site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError>;

/// A handler answers `Some` when it decides the result; `None` passes to the next handler.
pub type UnaryHandler =
    fn(&EvalContext, UnaryOperator, &AbstractValue) -> Result<Option<AbstractValue>, AnalysisError>;
pub type BinaryHandler = fn(
    &EvalContext,
    BinaryOperator,
    &AbstractValue,
    &AbstractValue,
) -> Result<Option<AbstractValue>, AnalysisError>;
pub type UpdateHandler = fn(
    &EvalContext,
    UpdateOperator,
    &AbstractValue,
) -> Result<Option<AbstractValue>, AnalysisError>;

/// Built-in function with declared defaults for omitted trailing arguments.
pub struct BuiltInFn {
    pub name: String,
    pub func: NativeFn,
    pub defaults: Vec<AbstractValue>,
}

impl BuiltInFn {
    pub fn new(name: impl Into<String>, func: NativeFn) -> Self {
        BuiltInFn {
            name: name.into(),
            func,
            defaults: vec![],
        }
    }

    pub fn with_defaults(mut self, defaults: Vec<AbstractValue>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Pads `args` from the defaults, then runs the native. Extra arguments are passed through.
    pub fn call(
        &self,
        ctx: &mut EvalContext,
        site: &CallSite,
        this: AbstractValue,
        mut args: Vec<AbstractValue>,
    ) -> Result<AbstractValue, AnalysisError> {
        if args.len() < self.defaults.len() {
            args.extend(self.defaults[args.len()..].iter().cloned());
        }
        (self.func)(ctx, site, this, args)
    }
}

impl fmt::Debug for BuiltInFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltInFn({})", self.name)
    }
}

/// Built-in object definition, e.g. `Math` or `String`.
pub struct BuiltInObject {
    pub name: String,
    pub methods: Vec<BuiltInFn>,
    pub properties: Vec<(String, AbstractValue)>,
    /// Makes the global itself callable, as for `String(x)` or `RegExp(p)`.
    pub constructor: Option<BuiltInFn>,
}

impl BuiltInObject {
    pub fn new(name: impl Into<String>) -> Self {
        BuiltInObject {
            name: name.into(),
            methods: vec![],
            properties: vec![],
            constructor: None,
        }
    }

    pub fn add_method(mut self, name: impl Into<String>, func: NativeFn) -> Self {
        self.methods.push(BuiltInFn::new(name, func));
        self
    }

    pub fn add_method_with_defaults(
        mut self,
        name: impl Into<String>,
        func: NativeFn,
        defaults: Vec<AbstractValue>,
    ) -> Self {
        self.methods
            .push(BuiltInFn::new(name, func).with_defaults(defaults));
        self
    }

    pub fn add_property(mut self, name: impl Into<String>, value: AbstractValue) -> Self {
        self.properties.push((name.into(), value));
        self
    }

    pub fn with_constructor(mut self, constructor: BuiltInFn) -> Self {
        self.constructor = Some(constructor);
        self
    }
}

/// Execution context of one analysis run.
pub struct EvalContext {
    pub runtime: Rc<Runtime>,
    pub state: AnalysisState,
    /// Scope the evaluator is currently running in.
    pub scope: ScopeId,
    pub this_value: AbstractValue,
    /// Text of the program currently being evaluated.
    pub source: Rc<str>,
    /// Nesting of calls and re-entrant evaluations.
    pub depth: usize,
    pub annotations: Vec<CallSiteAnnotation>,
    pub run_id: Uuid,
}

impl EvalContext {
    /// Fresh state: the store is seeded with the registry's objects and the global
    /// scope with its symbols.
    pub fn new(runtime: Rc<Runtime>, source: Rc<str>) -> Self {
        let heap = HeapConfig::with_limit(runtime.config.max_objects);
        let store = ObjectStore::with_preexisting(heap, runtime.registry.preexisting_objects());
        let mut scopes = Scopes::new();
        for (name, value) in runtime.registry.global_symbols() {
            scopes.declare(Scopes::GLOBAL, name, value.clone());
        }
        let run_id = Uuid::new_v4();
        debug!("[{}] new analysis context", run_id);
        EvalContext {
            runtime,
            state: AnalysisState::new(store, scopes),
            scope: Scopes::GLOBAL,
            this_value: AbstractValue::Undefined,
            source,
            depth: 0,
            annotations: vec![],
            run_id,
        }
    }

    pub fn registry(&self) -> &BuiltInRegistry {
        &self.runtime.registry
    }

    pub fn bridge(&self) -> &ConcreteBridge {
        &self.runtime.bridge
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.runtime.config
    }

    pub fn max_union_size(&self) -> usize {
        self.runtime.config.max_union_size
    }

    pub fn object(&self, id: ObjectId) -> Result<&AbstractObject, AnalysisError> {
        self.state.store.object(id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut AbstractObject, AnalysisError> {
        self.state.store.object_mut(id)
    }

    pub fn allocate(&mut self, obj: AbstractObject) -> Result<ObjectId, AnalysisError> {
        self.state.store.allocate(obj)
    }

    /// Enters one level of nesting, failing the run past `max_eval_depth`.
    pub fn enter(&mut self) -> Result<(), AnalysisError> {
        if self.depth >= self.runtime.config.max_eval_depth {
            return Err(AnalysisError::RecursionLimit {
                depth: self.runtime.config.max_eval_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
