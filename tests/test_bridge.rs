//! Tests for the concrete evaluation bridge and pluggable reference evaluators,
//! plus agreement of whole analyses with a JavaScript engine on concrete input.

extern crate jsai;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use jsai::runner::api::Analyzer;
use jsai::runner::bridge::{BoaEvaluator, BridgeError, ReferenceEvaluator, TaggedValue};
use jsai::runner::ds::error::AnalysisError;
use jsai::runner::ds::value::AbstractValue;
use jsai::runner::plugin::config::AnalysisConfig;

// ============================================================================
// Test evaluators
// ============================================================================

/// Delegates to the Boa evaluator and records every call it answers.
struct RecordingEvaluator {
    inner: BoaEvaluator,
    calls: Rc<RefCell<Vec<String>>>,
    sources: Rc<RefCell<HashMap<String, String>>>,
}

impl ReferenceEvaluator for RecordingEvaluator {
    fn initialize(&mut self) -> Result<(), BridgeError> {
        self.inner.initialize()
    }

    fn register(&mut self, name: &str, source: &str) -> Result<(), BridgeError> {
        self.sources
            .borrow_mut()
            .insert(name.to_string(), source.to_string());
        self.inner.register(name, source)
    }

    fn invoke(&self, name: &str, args: &[TaggedValue]) -> Result<TaggedValue, BridgeError> {
        self.calls.borrow_mut().push(name.to_string());
        self.inner.invoke(name, args)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Fails to start, like an engine that is not installed.
struct UnavailableEvaluator;

impl ReferenceEvaluator for UnavailableEvaluator {
    fn initialize(&mut self) -> Result<(), BridgeError> {
        Err(BridgeError::Unavailable("no engine installed".to_string()))
    }

    fn register(&mut self, _name: &str, _source: &str) -> Result<(), BridgeError> {
        Ok(())
    }

    fn invoke(&self, name: &str, _args: &[TaggedValue]) -> Result<TaggedValue, BridgeError> {
        Err(BridgeError::UnknownFunction(name.to_string()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

/// Starts fine but errors on every call.
struct BrokenEvaluator;

impl ReferenceEvaluator for BrokenEvaluator {
    fn initialize(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }

    fn register(&mut self, _name: &str, _source: &str) -> Result<(), BridgeError> {
        Ok(())
    }

    fn invoke(&self, name: &str, _args: &[TaggedValue]) -> Result<TaggedValue, BridgeError> {
        Err(BridgeError::Evaluation {
            name: name.to_string(),
            reason: "engine crashed".to_string(),
        })
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn recording() -> (
    RecordingEvaluator,
    Rc<RefCell<Vec<String>>>,
    Rc<RefCell<HashMap<String, String>>>,
) {
    let calls = Rc::new(RefCell::new(vec![]));
    let sources = Rc::new(RefCell::new(HashMap::new()));
    let evaluator = RecordingEvaluator {
        inner: BoaEvaluator::new(),
        calls: Rc::clone(&calls),
        sources: Rc::clone(&sources),
    };
    (evaluator, calls, sources)
}

// ============================================================================
// Setup
// ============================================================================

mod setup_tests {
    use super::*;

    #[test]
    fn test_every_operator_is_registered_as_a_snippet() {
        let (evaluator, _calls, sources) = recording();
        Analyzer::with_evaluator(AnalysisConfig::default(), Box::new(evaluator)).unwrap();
        let sources = sources.borrow();
        assert!(sources.len() > 20);
        assert!(sources
            .values()
            .any(|s| s.contains("return a + b")));
        assert!(sources.values().any(|s| s.contains("return ! a")));
    }

    #[test]
    fn test_unavailable_evaluator_is_a_setup_error() {
        let result = Analyzer::with_evaluator(AnalysisConfig::default(), Box::new(UnavailableEvaluator));
        match result {
            Err(AnalysisError::Setup(message)) => assert!(message.contains("no engine installed")),
            Err(other) => panic!("expected a setup error, got {}", other),
            Ok(_) => panic!("expected a setup error"),
        }
    }

    #[test]
    fn test_boa_evaluator_rejects_snippets_without_the_function() {
        let mut evaluator = BoaEvaluator::new();
        evaluator.initialize().unwrap();
        assert!(matches!(
            evaluator.register("f", "function f(a) { return a( }"),
            Err(BridgeError::Registration { .. })
        ));
        assert!(matches!(
            evaluator.register("g", "function h(a) { return a; }"),
            Err(BridgeError::Registration { .. })
        ));
    }

    #[test]
    fn test_boa_evaluator_requires_initialize() {
        let mut evaluator = BoaEvaluator::new();
        assert!(matches!(
            evaluator.register("f", "function f(a) { return -a; }"),
            Err(BridgeError::Unavailable(_))
        ));
    }
}

// ============================================================================
// Calls
// ============================================================================

mod call_tests {
    use super::*;

    #[test]
    fn test_concrete_operands_go_through_the_evaluator() {
        let (evaluator, calls, _sources) = recording();
        let analyzer =
            Analyzer::with_evaluator(AnalysisConfig::default(), Box::new(evaluator)).unwrap();
        let outcome = analyzer.analyze("1 + 2").unwrap();
        assert_eq!(outcome.value, AbstractValue::number(3.0));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_unknown_operands_never_reach_the_evaluator() {
        let (evaluator, calls, _sources) = recording();
        let analyzer =
            Analyzer::with_evaluator(AnalysisConfig::default(), Box::new(evaluator)).unwrap();
        let outcome = analyzer.analyze("x * 2").unwrap();
        assert_eq!(outcome.value, AbstractValue::Top);
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_evaluator_failure_is_a_defect() {
        let analyzer =
            Analyzer::with_evaluator(AnalysisConfig::default(), Box::new(BrokenEvaluator)).unwrap();
        let result = analyzer.analyze("1 - 2");
        match result {
            Err(AnalysisError::Defect { value, .. }) => assert!(value.contains("engine crashed")),
            Err(other) => panic!("expected a defect, got {}", other),
            Ok(outcome) => panic!("expected a defect, got {}", outcome.value),
        }
    }

    #[test]
    fn test_invoke_checks_arity() {
        let mut evaluator = BoaEvaluator::new();
        evaluator.initialize().unwrap();
        evaluator
            .register("sub", "function sub(a, b) { return a - b; }")
            .unwrap();
        assert_eq!(
            evaluator
                .invoke("sub", &[TaggedValue::Number(5.0), TaggedValue::Number(3.0)])
                .unwrap(),
            TaggedValue::Number(2.0)
        );
        assert!(matches!(
            evaluator.invoke("sub", &[TaggedValue::Number(5.0)]),
            Err(BridgeError::Arity { expected: 2, actual: 1, .. })
        ));
        assert!(matches!(
            evaluator.invoke("nope", &[]),
            Err(BridgeError::UnknownFunction(_))
        ));
    }
}

// ============================================================================
// Agreement with a JavaScript engine
// ============================================================================

mod ground_truth_tests {
    use super::*;
    use boa_engine::{Context, Source};
    use jsai::parser::ast::UnaryOperator;
    use jsai::runner::bridge::js_engine::from_js_value;
    use jsai::runner::bridge::{BRIDGED_BINARY_OPERATORS, BRIDGED_UNARY_OPERATORS};

    const OPERANDS: &[&str] = &[
        "0",
        "1",
        "-1.5",
        "NaN",
        "Infinity",
        "'7'",
        "''",
        "' 12 '",
        "'abc'",
        "'0x1f'",
        "true",
        "false",
        "null",
        "undefined",
        "String.fromCharCode(133) + '1'",
        "String.fromCharCode(160) + '2'",
    ];

    /// SameValue: NaN matches NaN and the sign of zero counts.
    fn same_value(a: &AbstractValue, b: &AbstractValue) -> bool {
        match (a.as_number(), b.as_number()) {
            (Some(x), Some(y)) if x.is_nan() || y.is_nan() => x.is_nan() && y.is_nan(),
            (Some(x), Some(y)) => x == y && x.is_sign_negative() == y.is_sign_negative(),
            _ => a == b,
        }
    }

    fn reference(context: &mut Context, code: &str) -> AbstractValue {
        let value = context
            .eval(Source::from_bytes(code))
            .unwrap_or_else(|e| panic!("`{}` failed in the engine: {}", code, e));
        from_js_value(&value)
            .unwrap_or_else(|| panic!("`{}` is not a scalar in the engine", code))
            .into_abstract()
    }

    fn assert_agrees(analyzer: &Analyzer, context: &mut Context, code: &str) {
        let expected = reference(context, code);
        let actual = analyzer
            .analyze(code)
            .unwrap_or_else(|e| panic!("analysis of `{}` failed: {}", code, e))
            .value;
        assert!(
            same_value(&actual, &expected),
            "`{}`: analyzer gave {}, the engine gives {}",
            code,
            actual,
            expected
        );
    }

    #[test]
    fn test_binary_operators_agree_with_the_engine() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let mut context = Context::default();
        for op in BRIDGED_BINARY_OPERATORS {
            for a in OPERANDS {
                for b in OPERANDS {
                    assert_agrees(&analyzer, &mut context, &format!("({}) {} ({})", a, op, b));
                }
            }
        }
    }

    #[test]
    fn test_unary_operators_agree_with_the_engine() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let mut context = Context::default();
        let handled = [UnaryOperator::TypeOf, UnaryOperator::Void];
        for op in BRIDGED_UNARY_OPERATORS.iter().chain(handled.iter()) {
            for a in OPERANDS {
                assert_agrees(&analyzer, &mut context, &format!("{} ({})", op, a));
            }
        }
    }

    #[test]
    fn test_coercing_built_ins_agree_with_the_engine() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let mut context = Context::default();
        let calls = ["parseInt", "parseFloat", "Number", "String", "isNaN"];
        for call in calls {
            for a in OPERANDS {
                // parseInt(undefined) is kept as undefined by the analyzer.
                if call == "parseInt" && *a == "undefined" {
                    continue;
                }
                assert_agrees(&analyzer, &mut context, &format!("{}({})", call, a));
            }
        }
        for a in OPERANDS {
            assert_agrees(&analyzer, &mut context, &format!("String({}).trim()", a));
            assert_agrees(&analyzer, &mut context, &format!("String({}).length", a));
        }
    }
}
