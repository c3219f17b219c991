//! Tests for the abstract built-ins.
//!
//! Each test analyzes a short script and checks the final expression value:
//! known inputs must give exact results, unknown inputs `Top`.

extern crate jsai;

use jsai::runner::api::Analyzer;
use jsai::runner::ds::error::AnalysisError;
use jsai::runner::ds::value::AbstractValue;
use jsai::runner::plugin::config::AnalysisConfig;

fn run(code: &str) -> Result<AbstractValue, AnalysisError> {
    let analyzer = Analyzer::new(AnalysisConfig::default()).expect("setup should succeed");
    analyzer.analyze(code).map(|outcome| outcome.value)
}

fn value_of(code: &str) -> AbstractValue {
    run(code).unwrap_or_else(|e| panic!("analysis of `{}` failed: {}", code, e))
}

fn num(n: f64) -> AbstractValue {
    AbstractValue::number(n)
}

fn string(s: &str) -> AbstractValue {
    AbstractValue::string(s)
}

fn boolean(b: bool) -> AbstractValue {
    AbstractValue::boolean(b)
}

fn assert_nan(v: AbstractValue) {
    match v.as_number() {
        Some(n) => assert!(n.is_nan(), "expected NaN, got {}", n),
        None => panic!("expected NaN, got {}", v),
    }
}

// ============================================================================
// Math tests
// ============================================================================

mod math_tests {
    use super::*;

    #[test]
    fn test_math_abs() {
        assert_eq!(value_of("Math.abs(-5)"), num(5.0));
    }

    #[test]
    fn test_math_floor_ceil() {
        assert_eq!(value_of("Math.floor(3.7)"), num(3.0));
        assert_eq!(value_of("Math.ceil(3.2)"), num(4.0));
    }

    #[test]
    fn test_math_round_halves_go_up() {
        assert_eq!(value_of("Math.round(2.5)"), num(3.0));
        assert_eq!(value_of("Math.round(-2.5)"), num(-2.0));
    }

    #[test]
    fn test_math_max_min() {
        assert_eq!(value_of("Math.max(1, 5, 3)"), num(5.0));
        assert_eq!(value_of("Math.min(4, '2', 3)"), num(2.0));
        assert_eq!(value_of("Math.max()"), num(f64::NEG_INFINITY));
        assert_nan(value_of("Math.min(1, NaN)"));
    }

    #[test]
    fn test_math_pow() {
        assert_eq!(value_of("Math.pow(2, 10)"), num(1024.0));
    }

    #[test]
    fn test_math_constants() {
        assert_eq!(value_of("Math.PI"), num(std::f64::consts::PI));
    }

    #[test]
    fn test_math_unknown_inputs() {
        assert_eq!(value_of("Math.random()"), AbstractValue::Top);
        assert_eq!(value_of("Math.abs(someGlobal)"), AbstractValue::Top);
        assert_eq!(value_of("Math.floor(Math.random() * 10)"), AbstractValue::Top);
    }
}

// ============================================================================
// String tests
// ============================================================================

mod string_tests {
    use super::*;

    #[test]
    fn test_char_code_at() {
        assert_eq!(value_of("'abc'.charCodeAt(1)"), num(98.0));
        assert_eq!(value_of("'abc'.charCodeAt()"), num(97.0));
        assert_nan(value_of("'abc'.charCodeAt(3)"));
    }

    #[test]
    fn test_char_at() {
        assert_eq!(value_of("'abc'.charAt(2)"), string("c"));
        assert_eq!(value_of("'abc'.charAt(5)"), string(""));
    }

    #[test]
    fn test_slice_substr_substring() {
        assert_eq!(value_of("'hello'.slice(-3)"), string("llo"));
        assert_eq!(value_of("'hello'.slice(1, -1)"), string("ell"));
        assert_eq!(value_of("'hello'.substr(1, 3)"), string("ell"));
        assert_eq!(value_of("'hello'.substr(-2)"), string("lo"));
        assert_eq!(value_of("'hello'.substring(3, 1)"), string("el"));
        assert_eq!(value_of("'hello'.substring(-4, 2)"), string("he"));
    }

    #[test]
    fn test_split() {
        assert_eq!(value_of("'a,b,c'.split(',').length"), num(3.0));
        assert_eq!(value_of("'a,b,c'.split(',')[1]"), string("b"));
        assert_eq!(value_of("'abc'.split('').join('-')"), string("a-b-c"));
        assert_eq!(value_of("'abc'.split()[0]"), string("abc"));
        assert_eq!(value_of("'a,b,c'.split(',', 2).length"), num(2.0));
        assert_eq!(value_of("'a1b22c'.split(/[0-9]+/).join('')"), string("abc"));
    }

    #[test]
    fn test_replace() {
        assert_eq!(value_of("'aXbXc'.replace('X', '-')"), string("a-bXc"));
        assert_eq!(value_of("'aXbXc'.replace(/X/g, '-')"), string("a-b-c"));
        assert_eq!(value_of("'aXbXc'.replace(/x/i, '-')"), string("a-bXc"));
        assert_eq!(value_of("'abc'.replace('b', '$&$&')"), AbstractValue::Top);
        assert_eq!(
            value_of("'abc'.replace('b', function (m) { return m; })"),
            AbstractValue::Top
        );
    }

    #[test]
    fn test_case_trim_concat() {
        assert_eq!(value_of("'Hi'.toUpperCase()"), string("HI"));
        assert_eq!(value_of("'Hi'.toLowerCase()"), string("hi"));
        assert_eq!(value_of("'  hi \\n'.trim()"), string("hi"));
        assert_eq!(value_of("'a'.concat('b', 1)"), string("ab1"));
    }

    #[test]
    fn test_index_of_on_strings() {
        assert_eq!(value_of("'hello'.indexOf('l')"), num(2.0));
        assert_eq!(value_of("'hello'.indexOf('l', 3)"), num(3.0));
        assert_eq!(value_of("'hello'.indexOf('z')"), num(-1.0));
    }

    #[test]
    fn test_length_and_index() {
        assert_eq!(value_of("'hello'.length"), num(5.0));
        assert_eq!(value_of("'hello'[1]"), string("e"));
    }

    #[test]
    fn test_string_global() {
        assert_eq!(value_of("String.fromCharCode(72, 105)"), string("Hi"));
        assert_eq!(value_of("String.fromCharCode(65601)"), string("A"));
        assert_eq!(value_of("String.fromCharCode(x)"), AbstractValue::Top);
        assert_eq!(value_of("String(12)"), string("12"));
        assert_eq!(value_of("String([1, [2, 3]])"), string("1,2,3"));
        assert_eq!(value_of("String()"), string(""));
    }

    #[test]
    fn test_lone_surrogates_are_not_made_up() {
        assert_eq!(
            value_of("String.fromCharCode(55357, 56832)"),
            string("\u{1F600}")
        );
        assert_eq!(value_of("String.fromCharCode(55357)"), AbstractValue::Top);
        assert_eq!(
            value_of("String.fromCharCode(55357) + String.fromCharCode(56832)"),
            AbstractValue::Top
        );
        assert_eq!(
            value_of("String.fromCharCode(55357).charCodeAt(0)"),
            AbstractValue::Top
        );
        assert_eq!(
            value_of("String.fromCharCode(55357, 56832).charCodeAt(0)"),
            num(55357.0)
        );
        assert_eq!(value_of("String.fromCharCode(55357, 56832)[0]"), AbstractValue::Top);
        assert_eq!(value_of("String.fromCharCode(55357, 56832).charAt(1)"), AbstractValue::Top);
        assert_eq!(value_of("String.fromCharCode(55357, 56832, 97).slice(2)"), string("a"));
        assert_eq!(
            value_of("String.fromCharCode(55357, 56832, 97).substr(1)"),
            AbstractValue::Top
        );
        assert_eq!(value_of("'\\uD83D\\uDE00'"), string("\u{1F600}"));
        assert_eq!(value_of("'\\uD83D'"), AbstractValue::Top);
        assert_eq!(value_of("var o = {'\\uDE00': 1}; o['\\uFFFD']"), AbstractValue::Top);
        assert_eq!(value_of("unescape('%uD83D')"), AbstractValue::Top);
    }

    #[test]
    fn test_only_js_whitespace_is_trimmed() {
        assert_eq!(
            value_of("(String.fromCharCode(133) + 'a').trim().length"),
            num(2.0)
        );
        assert_eq!(
            value_of("(String.fromCharCode(8199) + 'a' + String.fromCharCode(12288)).trim()"),
            string("a")
        );
    }

    #[test]
    fn test_unknown_receiver() {
        assert_eq!(value_of("someGlobal.charAt(0)"), AbstractValue::Top);
    }

    #[test]
    fn test_receiver_union() {
        assert_eq!(
            value_of("var s = x ? 'ab' : 'cb'; s.charAt(1)"),
            string("b")
        );
    }
}

// ============================================================================
// Array tests
// ============================================================================

mod array_tests {
    use super::*;

    #[test]
    fn test_push_is_variadic() {
        assert_eq!(value_of("var a = [1, 2]; a.push(3, 4)"), num(4.0));
        assert_eq!(value_of("var a = [1, 2]; a.push(3, 4); a[3]"), num(4.0));
    }

    #[test]
    fn test_pop_and_shift() {
        assert_eq!(value_of("var a = [1, 2, 3]; a.pop()"), num(3.0));
        assert_eq!(value_of("var a = [1, 2, 3]; a.pop(); a.length"), num(2.0));
        assert_eq!(value_of("var a = []; a.pop()"), AbstractValue::Undefined);
        assert_eq!(value_of("var a = [1, 2, 3]; a.shift()"), num(1.0));
        assert_eq!(value_of("var a = [1, 2, 3]; a.shift(); a[0]"), num(2.0));
    }

    #[test]
    fn test_reverse_returns_a_copy() {
        assert_eq!(
            value_of("var a = [1, 2, 3]; var b = a.reverse(); a[0] + '' + b[0]"),
            string("13")
        );
    }

    #[test]
    fn test_index_of() {
        assert_eq!(value_of("[1, 2, 3].indexOf(2)"), num(1.0));
        assert_eq!(value_of("[1, 2, 3].indexOf(4)"), num(-1.0));
        assert_eq!(value_of("[1, 2, 1].indexOf(1, 1)"), num(2.0));
        assert_eq!(value_of("[1, 2, 3].indexOf(x)"), AbstractValue::Top);
    }

    #[test]
    fn test_join() {
        assert_eq!(value_of("[1, 2, 3].join()"), string("1,2,3"));
        assert_eq!(value_of("['a', 'b'].join('')"), string("ab"));
        assert_eq!(value_of("[1, null, 3].join('-')"), string("1--3"));
        assert_eq!(value_of("[1, x].join()"), AbstractValue::Top);
    }

    #[test]
    fn test_array_global() {
        assert_eq!(value_of("Array.isArray([])"), boolean(true));
        assert_eq!(value_of("Array.isArray('a')"), boolean(false));
        assert_eq!(value_of("Array(3).length"), num(3.0));
        assert_eq!(value_of("Array(1, 2)[1]"), num(2.0));
    }

    #[test]
    fn test_push_on_unknown_length_degrades() {
        assert_eq!(
            value_of("var a = [1]; a[x] = 2; a.push(3)"),
            AbstractValue::Top
        );
    }
}

// ============================================================================
// Number and global function tests
// ============================================================================

mod number_tests {
    use super::*;

    #[test]
    fn test_to_string_radix() {
        assert_eq!(value_of("var n = 255; n.toString(16)"), string("ff"));
        assert_eq!(value_of("var n = -5; n.toString(2)"), string("-101"));
        assert_eq!(value_of("var n = 1.5; n.toString()"), string("1.5"));
        assert_eq!(value_of("var n = 10; n.toString(x)"), AbstractValue::Top);
    }

    #[test]
    fn test_number_conversion() {
        assert_eq!(value_of("Number('42')"), num(42.0));
        assert_eq!(value_of("Number()"), num(0.0));
        assert_nan(value_of("Number('4x')"));
    }

    #[test]
    fn test_number_constructor_is_function() {
        assert_eq!(value_of("Number.constructor === Function"), boolean(true));
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(value_of("parseInt('ff', 16)"), num(255.0));
        assert_eq!(value_of("parseInt('3.14')"), num(3.0));
        assert_eq!(value_of("parseInt('0x1A')"), num(26.0));
        assert_eq!(value_of("parseInt(42.9)"), num(42.0));
        assert_nan(value_of("parseInt('', 10)"));
        assert_nan(value_of("parseInt('7', 37)"));
        assert_eq!(value_of("parseInt()"), AbstractValue::Undefined);
    }

    #[test]
    fn test_next_line_is_not_whitespace() {
        assert_nan(value_of("parseInt(String.fromCharCode(133) + '1')"));
        assert_nan(value_of("parseFloat(String.fromCharCode(133) + '1')"));
        assert_nan(value_of("Number(String.fromCharCode(133) + '1')"));
        assert_nan(value_of("+(String.fromCharCode(133) + '1')"));
        assert_eq!(value_of("parseInt(String.fromCharCode(160) + '1')"), num(1.0));
    }

    #[test]
    fn test_parse_float_and_is_nan() {
        assert_eq!(value_of("parseFloat('2.5em')"), num(2.5));
        assert_eq!(value_of("isNaN('abc')"), boolean(true));
        assert_eq!(value_of("isNaN('12')"), boolean(false));
    }

    #[test]
    fn test_base64() {
        assert_eq!(value_of("atob('aGVsbG8=')"), string("hello"));
        assert_eq!(value_of("atob('aGVsbG8')"), string("hello"));
        assert_eq!(value_of("btoa('hello')"), string("aGVsbG8="));
        assert_eq!(value_of("btoa(1)"), AbstractValue::Top);
        assert_eq!(value_of("atob('*')"), AbstractValue::Top);
    }

    #[test]
    fn test_uri_decoding() {
        assert_eq!(value_of("decodeURIComponent('%20')"), string(" "));
        assert_eq!(value_of("decodeURIComponent('%2F%C3%A9')"), string("/\u{e9}"));
        assert_eq!(value_of("decodeURIComponent('%E0%A4%A')"), AbstractValue::Top);
        assert_eq!(value_of("decodeURI('%20%2F')"), string(" %2F"));
        assert_eq!(value_of("encodeURIComponent('a b&c')"), string("a%20b%26c"));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(value_of("unescape('%u0041%42c')"), string("ABc"));
    }

    #[test]
    fn test_global_constants() {
        assert_eq!(value_of("undefined"), AbstractValue::Undefined);
        assert_eq!(value_of("Infinity"), num(f64::INFINITY));
        assert_nan(value_of("NaN"));
    }
}

// ============================================================================
// RegExp tests
// ============================================================================

mod regexp_tests {
    use super::*;

    #[test]
    fn test_literal_test() {
        assert_eq!(value_of("/ab+c/.test('xabbbc')"), boolean(true));
        assert_eq!(value_of("/^ab/.test('xab')"), boolean(false));
    }

    #[test]
    fn test_constructor_with_flags() {
        assert_eq!(value_of("var r = new RegExp('^a', 'i'); r.test('Abc')"), boolean(true));
        assert_eq!(value_of("RegExp('b').test('abc')"), boolean(true));
        assert_eq!(value_of("var r = new RegExp('x'); r.source"), string("x"));
    }

    #[test]
    fn test_stringification() {
        assert_eq!(value_of("String(/a+/g)"), string("/a+/g"));
        assert_eq!(value_of("/a+/g.toString()"), string("/a+/g"));
    }

    #[test]
    fn test_global_test_moves_last_index() {
        assert_eq!(
            value_of("var r = /a/g; r.test('aa'); r.test('aa'); r.test('aa')"),
            boolean(false)
        );
        assert_eq!(value_of("var r = /a/g; r.test('xa'); r.lastIndex"), num(2.0));
    }

    #[test]
    fn test_unknown_pattern_degrades() {
        assert_eq!(value_of("var r = RegExp(x); r.test('a')"), AbstractValue::Top);
        assert_eq!(value_of("var r = new RegExp(x); r.source"), AbstractValue::Top);
    }

    #[test]
    fn test_backreferences_and_lookaround() {
        assert_eq!(value_of("/(a)\\1/.test('aa')"), boolean(true));
        assert_eq!(value_of("/a(?=b)/.test('ac')"), boolean(false));
    }

    #[test]
    fn test_rejected_patterns_and_flags_degrade() {
        assert_eq!(value_of("new RegExp('(').test('a')"), AbstractValue::Top);
        assert_eq!(value_of("new RegExp('a', 'y').test('a')"), AbstractValue::Top);
        assert_eq!(value_of("new RegExp('a', 'gg').test('a')"), AbstractValue::Top);
    }

    #[test]
    fn test_classes_are_ascii_without_unicode_flag() {
        assert_eq!(
            value_of("new RegExp('^\\\\d$').test(String.fromCharCode(1635))"),
            boolean(false)
        );
        assert_eq!(
            value_of("new RegExp('^\\\\w$').test(String.fromCharCode(233))"),
            boolean(false)
        );
        assert_eq!(value_of("new RegExp('^\\\\d$').test('7')"), boolean(true));
    }

    #[test]
    fn test_dot_skips_line_terminators() {
        assert_eq!(
            value_of("new RegExp('^.$').test(String.fromCharCode(13))"),
            boolean(false)
        );
        assert_eq!(
            value_of("new RegExp('^.$', 's').test(String.fromCharCode(13))"),
            boolean(true)
        );
    }

    #[test]
    fn test_split_and_replace_with_patterns() {
        assert_eq!(value_of("'a1b2c'.split(/(\\d)/).join('|')"), string("a|1|b|2|c"));
        assert_eq!(value_of("''.split(/x*/).length"), num(0.0));
        assert_eq!(value_of("'ab'.split(/x*/).join('|')"), string("a|b"));
        assert_eq!(value_of("'abc'.replace(/x*/g, '-')"), string("-a-b-c-"));
        assert_eq!(
            value_of("('x' + String.fromCharCode(1635)).replace(/\\d/g, '')"),
            AbstractValue::string("x\u{0663}")
        );
    }
}

// ============================================================================
// Function, eval and diagnostics tests
// ============================================================================

mod function_tests {
    use super::*;

    #[test]
    fn test_function_to_string_is_source_slice() {
        assert_eq!(
            value_of("var f = function (a) { return a; }; f.toString()"),
            string("function (a) { return a; }")
        );
        assert_eq!(
            value_of("parseInt.toString()"),
            string("function parseInt() { [native code] }")
        );
    }

    #[test]
    fn test_call_and_apply() {
        let add = "var add = function (a, b) { return a + b; };";
        assert_eq!(value_of(&format!("{} add.call(null, 1, 2)", add)), num(3.0));
        assert_eq!(value_of(&format!("{} add.apply(null, [1, 2])", add)), num(3.0));
        assert_eq!(value_of(&format!("{} add.apply(null, x)", add)), AbstractValue::Top);
    }

    #[test]
    fn test_function_constructor() {
        assert_eq!(
            value_of("var f = Function('a', 'b', 'return a + b'); f(2, 3)"),
            num(5.0)
        );
        assert_eq!(value_of("new Function('return 7')()"), num(7.0));
        assert_eq!(value_of("Function(x)"), AbstractValue::Top);
    }

    #[test]
    fn test_eval() {
        assert_eq!(value_of("eval('1+1')"), num(2.0));
        assert_eq!(value_of("eval(x)"), AbstractValue::Top);
        assert_eq!(value_of("eval(5)"), num(5.0));
        assert_eq!(value_of("eval('1 +')"), AbstractValue::Top);
    }

    #[test]
    fn test_assert_passes_on_truthy() {
        assert_eq!(value_of("___assert(1 === 1); 3"), num(3.0));
    }

    #[test]
    fn test_assert_failure_names_the_expression() {
        match run("var y = x; ___assert(y)") {
            Err(AnalysisError::AssertionFailed { expression, value }) => {
                assert_eq!(expression, "y");
                assert_eq!(value, AbstractValue::Top.to_string());
            }
            other => panic!("expected an assertion failure, got {:?}", other.map(|v| v.to_string())),
        }
    }

    #[test]
    fn test_is_concretizable() {
        assert_eq!(value_of("___is_concretizable(1 + 1)"), boolean(true));
        assert_eq!(value_of("___is_concretizable(Math.random())"), boolean(false));
    }

    #[test]
    fn test_state_dump_is_top() {
        assert_eq!(value_of("___display(1); ___state()"), AbstractValue::Top);
    }
}
