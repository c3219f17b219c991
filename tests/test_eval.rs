//! Tests for the abstract evaluator: branching and joins, functions and
//! closures, object mutation, re-entry through `eval`/`Function`.

extern crate jsai;

use jsai::runner::api::{AnalysisOutcome, Analyzer};
use jsai::runner::ds::error::AnalysisError;
use jsai::runner::ds::value::AbstractValue;
use jsai::runner::plugin::config::AnalysisConfig;
use jsai::runner::plugin::types::ReentryKind;

fn analyze(code: &str) -> AnalysisOutcome {
    let analyzer = Analyzer::new(AnalysisConfig::default()).expect("setup should succeed");
    analyzer
        .analyze(code)
        .unwrap_or_else(|e| panic!("analysis of `{}` failed: {}", code, e))
}

fn value_of(code: &str) -> AbstractValue {
    analyze(code).value
}

fn num(n: f64) -> AbstractValue {
    AbstractValue::number(n)
}

fn string(s: &str) -> AbstractValue {
    AbstractValue::string(s)
}

/// Asserts `v` is a union of exactly `expected`, in any order.
fn assert_union_of(v: &AbstractValue, expected: &[AbstractValue]) {
    let alternatives = v.alternatives();
    assert_eq!(alternatives.len(), expected.len(), "unexpected value {}", v);
    for e in expected {
        assert!(alternatives.contains(e), "{} does not contain {}", v, e);
    }
}

// ============================================================================
// Expressions
// ============================================================================

mod expression_tests {
    use super::*;

    #[test]
    fn test_concrete_arithmetic() {
        assert_eq!(value_of("1 + 2 * 3"), num(7.0));
        assert_eq!(value_of("'a' + 1 + 2"), string("a12"));
        assert_eq!(value_of("7 % 3 - -1"), num(2.0));
        assert_eq!(value_of("(5 >>> 1) | 8"), num(10.0));
    }

    #[test]
    fn test_unknown_operand_gives_top() {
        assert_eq!(value_of("x + 1"), AbstractValue::Top);
        assert_eq!(value_of("-x"), AbstractValue::Top);
    }

    #[test]
    fn test_typeof() {
        assert_eq!(value_of("typeof 1"), string("number"));
        assert_eq!(value_of("typeof 'a'"), string("string"));
        assert_eq!(value_of("typeof {}"), string("object"));
        assert_eq!(value_of("typeof function () {}"), string("function"));
        assert_eq!(value_of("typeof undefined"), string("undefined"));
    }

    #[test]
    fn test_strict_equality_on_references() {
        assert_eq!(value_of("var a = {}; var b = a; a === b"), AbstractValue::boolean(true));
        assert_eq!(value_of("({}) === ({})"), AbstractValue::boolean(false));
    }

    #[test]
    fn test_compound_assignment_and_update() {
        assert_eq!(value_of("var i = 1; i += 2; i"), num(3.0));
        assert_eq!(value_of("var i = 1; i++"), num(1.0));
        assert_eq!(value_of("var i = 1; ++i"), num(2.0));
        assert_eq!(value_of("var o = {n: 1}; o.n++; o.n"), num(2.0));
    }

    #[test]
    fn test_object_literals_and_members() {
        assert_eq!(value_of("var o = {a: 1, 'b': 2}; o.a + o['b']"), num(3.0));
        assert_eq!(value_of("var o = {}; o.missing"), AbstractValue::Undefined);
        assert_eq!(value_of("var k = 'z'; var o = {[k]: 5}; o.z"), num(5.0));
    }

    #[test]
    fn test_delete() {
        assert_eq!(
            value_of("var o = {a: 1}; delete o.a; o.a"),
            AbstractValue::Undefined
        );
    }

    #[test]
    fn test_sequence() {
        assert_eq!(value_of("(1, 2, 3)"), num(3.0));
    }

    #[test]
    fn test_logical_short_circuit() {
        assert_eq!(value_of("0 || 'fallback'"), string("fallback"));
        assert_eq!(value_of("1 && 'second'"), string("second"));
        assert_eq!(value_of("'first' || x"), string("first"));
        assert_eq!(value_of("x && 1"), AbstractValue::Top);
    }
}

// ============================================================================
// Control flow and joins
// ============================================================================

mod branch_tests {
    use super::*;

    #[test]
    fn test_known_branch_runs_alone() {
        let outcome = analyze("var s; if (1 < 2) { s = 'yes'; } else { s = 'no'; }");
        assert_eq!(outcome.global("s"), Some(&string("yes")));
    }

    #[test]
    fn test_unknown_branch_joins_both() {
        let outcome = analyze("var s; if (x) { s = 1; } else { s = 2; }");
        assert_union_of(outcome.global("s").unwrap(), &[num(1.0), num(2.0)]);
    }

    #[test]
    fn test_unknown_branch_without_else_keeps_old_value() {
        let outcome = analyze("var s = 'old'; if (x) { s = 'new'; }");
        assert_union_of(outcome.global("s").unwrap(), &[string("old"), string("new")]);
    }

    #[test]
    fn test_conditional_expression() {
        assert_eq!(value_of("true ? 1 : 2"), num(1.0));
        assert_union_of(&value_of("x ? 1 : 2"), &[num(1.0), num(2.0)]);
    }

    #[test]
    fn test_branches_join_object_properties() {
        let outcome = analyze("var o = {v: 0}; if (x) { o.v = 1; } var r = o.v;");
        assert_union_of(outcome.global("r").unwrap(), &[num(0.0), num(1.0)]);
    }

    #[test]
    fn test_wide_unions_become_top() {
        let config = AnalysisConfig {
            max_union_size: 2,
            ..AnalysisConfig::default()
        };
        let analyzer = Analyzer::new(config).unwrap();
        let outcome = analyzer
            .analyze("var s = 1; if (x) { s = 2; } if (y) { s = 3; }")
            .unwrap();
        assert_eq!(outcome.global("s"), Some(&AbstractValue::Top));
    }
}

// ============================================================================
// Functions
// ============================================================================

mod function_tests {
    use super::*;

    #[test]
    fn test_declaration_is_hoisted() {
        assert_eq!(value_of("f(2); function f(n) { return n * 2; }"), num(4.0));
    }

    #[test]
    fn test_missing_arguments_are_undefined() {
        assert_eq!(
            value_of("function f(a, b) { return b; } f(1)"),
            AbstractValue::Undefined
        );
    }

    #[test]
    fn test_arguments_object() {
        assert_eq!(
            value_of("function f() { return arguments.length; } f(1, 2, 3)"),
            num(3.0)
        );
    }

    #[test]
    fn test_closure_sees_outer_scope() {
        assert_eq!(
            value_of(
                "function make(k) { return function (v) { return k + v; }; } \
                 var add5 = make(5); add5(1)"
            ),
            num(6.0)
        );
    }

    #[test]
    fn test_closure_writes_outer_variable() {
        let outcome = analyze("var count = 0; function bump() { count = count + 1; } bump(); bump();");
        assert_eq!(outcome.global("count"), Some(&num(2.0)));
    }

    #[test]
    fn test_bounded_recursion() {
        assert_eq!(
            value_of("function fact(n) { if (n <= 1) { return 1; } return n * fact(n - 1); } fact(5)"),
            num(120.0)
        );
    }

    #[test]
    fn test_unbounded_recursion_fails_the_run() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let result = analyzer.analyze("function f(n) { return f(n + 1); } f(0)");
        assert!(matches!(
            result,
            Err(AnalysisError::RecursionLimit { depth: 32 })
        ));
    }

    #[test]
    fn test_maybe_return_joins_undefined() {
        assert_union_of(
            &value_of("function f() { if (x) { return 1; } } f()"),
            &[num(1.0), AbstractValue::Undefined],
        );
    }

    #[test]
    fn test_this_in_method_call() {
        assert_eq!(
            value_of("var o = {v: 4, get: function () { return this.v; }}; o.get()"),
            num(4.0)
        );
    }

    #[test]
    fn test_new_with_program_function() {
        assert_eq!(
            value_of("function P(n) { this.n = n; } var p = new P(3); p.n"),
            num(3.0)
        );
    }

    #[test]
    fn test_union_callee_joins_results() {
        assert_union_of(
            &value_of(
                "var f = x ? function () { return 1; } : function () { return 2; }; f()"
            ),
            &[num(1.0), num(2.0)],
        );
    }

    #[test]
    fn test_unknown_callee_degrades_its_arguments() {
        let outcome = analyze("var o = {a: 1}; var p = {b: 2}; someHost(o); var ra = o.a; var rb = p.b;");
        assert_eq!(outcome.global("ra"), Some(&AbstractValue::Top));
        assert_eq!(outcome.global("rb"), Some(&num(2.0)));
    }
}

// ============================================================================
// Re-entry through eval and Function
// ============================================================================

mod reentry_tests {
    use super::*;

    #[test]
    fn test_eval_runs_in_caller_scope() {
        let outcome = analyze("var a = 2; function f() { var a = 5; return eval('a * 10'); } var r = f();");
        assert_eq!(outcome.global("r"), Some(&num(50.0)));
    }

    #[test]
    fn test_eval_can_define_globals() {
        let outcome = analyze("eval('var hidden = \"payload\"');");
        assert_eq!(outcome.global("hidden"), Some(&string("payload")));
    }

    #[test]
    fn test_eval_records_annotation() {
        let outcome = analyze("var code = 'var z = ' + '1;'; eval(code);");
        assert_eq!(outcome.annotations.len(), 1);
        let annotation = &outcome.annotations[0];
        assert_eq!(annotation.kind, ReentryKind::Eval);
        assert_eq!(&*annotation.source, "var z = 1;");
        assert_eq!(annotation.program.body.len(), 1);
        assert!(annotation.call_site.is_some());
    }

    #[test]
    fn test_nested_eval() {
        let outcome = analyze("eval(\"eval('var deep = 3')\");");
        assert_eq!(outcome.global("deep"), Some(&num(3.0)));
        assert_eq!(outcome.annotations.len(), 2);
    }

    #[test]
    fn test_function_constructor_runs_in_global_scope() {
        let outcome = analyze(
            "var a = 'global'; \
             function f() { var a = 'local'; return Function('return a')(); } \
             var r = f();",
        );
        assert_eq!(outcome.global("r"), Some(&string("global")));
        assert_eq!(outcome.annotations[0].kind, ReentryKind::FunctionConstructor);
        assert_eq!(outcome.annotations[0].kind.to_string(), "fn_cons");
    }

    #[test]
    fn test_unknown_eval_argument_records_nothing() {
        let outcome = analyze("var r = eval(someHostString);");
        assert_eq!(outcome.global("r"), Some(&AbstractValue::Top));
        assert!(outcome.annotations.is_empty());
    }

    #[test]
    fn test_runs_are_independent() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let first = analyzer.analyze("Math.leak = 1; var a = [1]; a.push(2);").unwrap();
        let second = analyzer.analyze("Math.leak").unwrap();
        assert_eq!(first.global("a").map(|v| v.as_reference().is_some()), Some(true));
        assert_eq!(second.value, AbstractValue::Undefined);
        assert_ne!(first.run_id, second.run_id);
    }
}
