//! Analyzer entry point.
//!
//! An [`Analyzer`] owns everything fixed at setup (the bridge to the reference
//! evaluator, the built-in registry and the configuration) and runs any number
//! of independent analyses against it.
//!
//! ```
//! use jsai::runner::api::Analyzer;
//! use jsai::runner::ds::value::AbstractValue;
//! use jsai::runner::plugin::config::AnalysisConfig;
//!
//! let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
//! let outcome = analyzer.analyze("var x = eval('1 + 1'); x").unwrap();
//! assert_eq!(outcome.value, AbstractValue::number(2.0));
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use log::{debug, info};
use uuid::Uuid;

use crate::parser::JsParser;
use crate::runner::bridge::{BoaEvaluator, ConcreteBridge, ReferenceEvaluator};
use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::heap::ObjectStore;
use crate::runner::ds::object::AbstractObject;
use crate::runner::ds::value::{AbstractValue, ObjectId};
use crate::runner::eval::statement::run_program;
use crate::runner::plugin::config::AnalysisConfig;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{CallSiteAnnotation, EvalContext, Runtime};

pub struct Analyzer {
    runtime: Rc<Runtime>,
}

/// What one analysis run found.
#[derive(Debug)]
pub struct AnalysisOutcome {
    /// Value of the last expression statement.
    pub value: AbstractValue,
    pub store: ObjectStore,
    pub globals: HashMap<String, AbstractValue>,
    pub annotations: Vec<CallSiteAnnotation>,
    pub run_id: Uuid,
}

impl AnalysisOutcome {
    pub fn global(&self, name: &str) -> Option<&AbstractValue> {
        self.globals.get(name)
    }

    pub fn object(&self, id: ObjectId) -> Option<&AbstractObject> {
        self.store.get(id)
    }
}

impl Analyzer {
    /// Sets up with the Boa-backed [`BoaEvaluator`].
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        Self::with_evaluator(config, Box::new(BoaEvaluator::new()))
    }

    pub fn with_evaluator(
        config: AnalysisConfig,
        evaluator: Box<dyn ReferenceEvaluator>,
    ) -> Result<Self, AnalysisError> {
        Self::with_registry(config, evaluator, BuiltInRegistry::with_core())
    }

    /// Sets up with a caller-built registry, e.g. one carrying extra method hooks.
    pub fn with_registry(
        config: AnalysisConfig,
        evaluator: Box<dyn ReferenceEvaluator>,
        registry: BuiltInRegistry,
    ) -> Result<Self, AnalysisError> {
        let bridge = ConcreteBridge::new(evaluator)?;
        debug!(
            "analyzer ready: evaluator `{}`, max_eval_depth {}, max_union_size {}",
            bridge.evaluator_name(),
            config.max_eval_depth,
            config.max_union_size
        );
        Ok(Analyzer {
            runtime: Rc::new(Runtime {
                registry,
                bridge,
                config,
            }),
        })
    }

    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.runtime
    }

    /// A fresh context for `source`, for callers driving the evaluator themselves.
    pub fn context(&self, source: &str) -> EvalContext {
        EvalContext::new(Rc::clone(&self.runtime), Rc::from(source))
    }

    /// One analysis run over `source`, starting from a fresh state.
    pub fn analyze(&self, source: &str) -> Result<AnalysisOutcome, AnalysisError> {
        let program = JsParser::parse_to_ast_from_str(source)?;
        let mut ctx = self.context(source);
        info!("[{}] analyzing {} statements", ctx.run_id, program.body.len());
        let value = run_program(&mut ctx, &program)?;
        info!(
            "[{}] done: {} objects, {} call-site annotations",
            ctx.run_id,
            ctx.state.store.len(),
            ctx.annotations.len()
        );
        let EvalContext {
            state,
            annotations,
            run_id,
            ..
        } = ctx;
        Ok(AnalysisOutcome {
            value,
            globals: state.scopes.global_bindings().clone(),
            store: state.store,
            annotations,
            run_id,
        })
    }
}
