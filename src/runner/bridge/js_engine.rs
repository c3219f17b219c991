//! Reference evaluator backed by the Boa JavaScript engine.
//!
//! Every snippet is evaluated once in a shared context so it defines a global
//! function; invocation looks that function up and calls it with the operands.

use std::cell::RefCell;
use std::collections::HashMap;

use boa_engine::vm::RuntimeLimits;
use boa_engine::{Context, JsString, JsValue, Source};
use log::debug;

use crate::runner::bridge::{BridgeError, ReferenceEvaluator, TaggedValue};

const RECURSION_LIMIT: usize = 64;
const LOOP_ITERATION_LIMIT: u64 = 10_000;

struct Registered {
    function: JsValue,
    arity: usize,
}

#[derive(Default)]
pub struct BoaEvaluator {
    // Dropped before the context that created them.
    functions: HashMap<String, Registered>,
    context: Option<RefCell<Context>>,
}

impl BoaEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    fn context(&self) -> Result<&RefCell<Context>, BridgeError> {
        self.context.as_ref().ok_or_else(|| {
            BridgeError::Unavailable("boa evaluator used before initialize()".to_string())
        })
    }
}

impl ReferenceEvaluator for BoaEvaluator {
    fn initialize(&mut self) -> Result<(), BridgeError> {
        let mut context = Context::default();
        let mut limits = RuntimeLimits::default();
        limits.set_recursion_limit(RECURSION_LIMIT);
        limits.set_loop_iteration_limit(LOOP_ITERATION_LIMIT);
        context.set_runtime_limits(limits);
        self.context = Some(RefCell::new(context));
        Ok(())
    }

    fn register(&mut self, name: &str, source: &str) -> Result<(), BridgeError> {
        let reject = |reason: String| BridgeError::Registration {
            name: name.to_string(),
            reason,
        };
        let registered = {
            let mut context = self
                .context()?
                .try_borrow_mut()
                .map_err(|e| reject(e.to_string()))?;
            context
                .eval(Source::from_bytes(source))
                .map_err(|e| reject(e.to_string()))?;
            let global = context.global_object().clone();
            let function = global
                .get(JsString::from(name), &mut context)
                .map_err(|e| reject(e.to_string()))?;
            if !function.is_callable() {
                return Err(reject(format!("`{}` does not define a function", source)));
            }
            let length = match function.as_object() {
                Some(object) => object
                    .get(JsString::from("length"), &mut context)
                    .map_err(|e| reject(e.to_string()))?,
                None => JsValue::undefined(),
            };
            let arity = length.as_number().unwrap_or(0.0) as usize;
            Registered { function, arity }
        };
        debug!("boa evaluator registered `{}` taking {} arguments", name, registered.arity);
        self.functions.insert(name.to_string(), registered);
        Ok(())
    }

    fn invoke(&self, name: &str, args: &[TaggedValue]) -> Result<TaggedValue, BridgeError> {
        let registered = self
            .functions
            .get(name)
            .ok_or_else(|| BridgeError::UnknownFunction(name.to_string()))?;
        if registered.arity != args.len() {
            return Err(BridgeError::Arity {
                name: name.to_string(),
                expected: registered.arity,
                actual: args.len(),
            });
        }
        let fail = |reason: String| BridgeError::Evaluation {
            name: name.to_string(),
            reason,
        };
        let mut context = self
            .context()?
            .try_borrow_mut()
            .map_err(|e| fail(e.to_string()))?;
        let function = registered
            .function
            .as_callable()
            .ok_or_else(|| fail("registered value is not callable".to_string()))?;
        let args: Vec<JsValue> = args.iter().map(to_js_value).collect();
        let result = function
            .call(&JsValue::undefined(), &args, &mut context)
            .map_err(|e| fail(e.to_string()))?;
        from_js_value(&result)
            .ok_or_else(|| fail(format!("result {} is not a scalar", result.display())))
    }

    fn name(&self) -> &str {
        "boa"
    }
}

pub fn to_js_value(v: &TaggedValue) -> JsValue {
    match v {
        TaggedValue::Number(n) => JsValue::from(*n),
        TaggedValue::String(s) => JsValue::from(JsString::from(s.as_str())),
        TaggedValue::Boolean(b) => JsValue::from(*b),
        TaggedValue::Undefined => JsValue::undefined(),
        TaggedValue::Null => JsValue::null(),
    }
}

/// `None` for objects, symbols, big integers and strings with unpaired surrogates.
pub fn from_js_value(v: &JsValue) -> Option<TaggedValue> {
    if v.is_undefined() {
        return Some(TaggedValue::Undefined);
    }
    if v.is_null() {
        return Some(TaggedValue::Null);
    }
    if let Some(b) = v.as_boolean() {
        return Some(TaggedValue::Boolean(b));
    }
    if let Some(n) = v.as_number() {
        return Some(TaggedValue::Number(n));
    }
    v.as_string()
        .and_then(|s| s.to_std_string().ok())
        .map(TaggedValue::String)
}
