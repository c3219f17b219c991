//! Global functions: number parsing, base64 and URI decoding.

use std::collections::HashSet;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::operations::type_conversion::{
    as_integer, is_js_whitespace, string_from_utf16, to_concrete_number, to_concrete_string,
    to_int32, utf16_units,
};
use crate::runner::ds::value::{AbstractValue, PrimitiveValue};
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::types::{BuiltInFn, CallSite, EvalContext, NativeFn};

use super::argument;

lazy_static! {
    /// Bytes `decodeURI` leaves escaped.
    static ref URI_RESERVED: HashSet<u8> = b";/?:@&=+$,#".iter().copied().collect();
}

/// Characters `encodeURIComponent` escapes: all but `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// `atob` accepts unpadded input and stray trailing bits.
const FORGIVING_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Register the global functions with the registry.
pub fn register(registry: &mut BuiltInRegistry) {
    let undefined = || vec![AbstractValue::Undefined];
    let functions: Vec<(&str, NativeFn, Vec<AbstractValue>)> = vec![
        (
            "parseInt",
            parse_int,
            vec![AbstractValue::Undefined, AbstractValue::Undefined],
        ),
        ("parseFloat", parse_float, undefined()),
        ("isNaN", is_nan, undefined()),
        ("atob", atob, undefined()),
        ("btoa", btoa, undefined()),
        ("decodeURIComponent", decode_uri_component, undefined()),
        ("decodeURI", decode_uri, undefined()),
        ("encodeURIComponent", encode_uri_component, undefined()),
        ("unescape", unescape, undefined()),
    ];
    for (name, func, defaults) in functions {
        let id = registry.register_native(BuiltInFn::new(name, func).with_defaults(defaults));
        registry.register_global_symbol(name, AbstractValue::Reference(id));
    }
}

/// The argument when it is exactly one known string.
fn string_argument(args: &[AbstractValue]) -> Option<String> {
    match argument(args, 0) {
        AbstractValue::Primitive(PrimitiveValue::String(s)) => Some(s),
        _ => None,
    }
}

/// parseInt
fn parse_int(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let input = match argument(&args, 0) {
        AbstractValue::Undefined => return Ok(AbstractValue::Undefined),
        other => match to_concrete_string(ctx, &other)? {
            Some(s) => s,
            None => return Ok(AbstractValue::Top),
        },
    };
    let radix = match argument(&args, 1) {
        AbstractValue::Undefined => 0,
        other => match to_concrete_number(ctx, &other)? {
            Some(n) => to_int32(n),
            None => return Ok(AbstractValue::Top),
        },
    };
    Ok(AbstractValue::number(parse_int_str(&input, radix)))
}

/// `parseInt` on a known string; radix 0 means 10, or 16 after a `0x` prefix.
pub fn parse_int_str(input: &str, radix: i32) -> f64 {
    let s = input.trim_start_matches(is_js_whitespace);
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let mut radix = radix;
    let mut strip_prefix = true;
    if radix != 0 {
        if !(2..=36).contains(&radix) {
            return f64::NAN;
        }
        strip_prefix = radix == 16;
    } else {
        radix = 10;
    }
    let s = match s.get(..2) {
        Some("0x") | Some("0X") if strip_prefix => {
            radix = 16;
            &s[2..]
        }
        _ => s,
    };
    let digits: Vec<u32> = s
        .chars()
        .map_while(|c| c.to_digit(radix as u32))
        .collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let value = digits
        .iter()
        .fold(0f64, |acc, d| acc * radix as f64 + *d as f64);
    if negative {
        -value
    } else {
        value
    }
}

/// parseFloat
fn parse_float(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match to_concrete_string(ctx, &argument(&args, 0))? {
        Some(s) => AbstractValue::number(parse_float_str(&s)),
        None => AbstractValue::Top,
    })
}

/// Longest prefix of `input` that reads as a decimal literal.
pub fn parse_float_str(input: &str) -> f64 {
    let s = input.trim_start_matches(is_js_whitespace);
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end = 1;
    }
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - digits_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let fraction_start = end + 1;
        let mut fraction_end = fraction_start;
        while fraction_end < bytes.len() && bytes[fraction_end].is_ascii_digit() {
            fraction_end += 1;
        }
        mantissa_digits += fraction_end - fraction_start;
        if mantissa_digits > 0 {
            end = fraction_end;
        }
    }
    if mantissa_digits == 0 {
        return f64::NAN;
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exponent_end = end + 1;
        if exponent_end < bytes.len()
            && (bytes[exponent_end] == b'+' || bytes[exponent_end] == b'-')
        {
            exponent_end += 1;
        }
        let exponent_digits_start = exponent_end;
        while exponent_end < bytes.len() && bytes[exponent_end].is_ascii_digit() {
            exponent_end += 1;
        }
        if exponent_end > exponent_digits_start {
            end = exponent_end;
        }
    }
    s[..end].parse::<f64>().unwrap_or(f64::NAN)
}

/// isNaN
fn is_nan(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match to_concrete_number(ctx, &argument(&args, 0))? {
        Some(n) => AbstractValue::boolean(n.is_nan()),
        None => AbstractValue::Top,
    })
}

/// atob: bytes come back as Latin-1 characters.
fn atob(
    _ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let input = match string_argument(&args) {
        Some(input) => input,
        None => return Ok(AbstractValue::Top),
    };
    let compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(match FORGIVING_BASE64.decode(compact) {
        Ok(bytes) => AbstractValue::string(bytes.into_iter().map(char::from).collect::<String>()),
        Err(_) => AbstractValue::Top,
    })
}

/// btoa: only Latin-1 input is encodable.
fn btoa(
    _ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let input = match string_argument(&args) {
        Some(input) => input,
        None => return Ok(AbstractValue::Top),
    };
    let bytes: Option<Vec<u8>> = input.chars().map(|c| u8::try_from(c).ok()).collect();
    Ok(match bytes {
        Some(bytes) => AbstractValue::string(FORGIVING_BASE64.encode(bytes)),
        None => AbstractValue::Top,
    })
}

/// Every `%` starts two hex digits.
fn well_formed_escapes(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some([a, b]) if a.is_ascii_hexdigit() && b.is_ascii_hexdigit() => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

/// decodeURIComponent
fn decode_uri_component(
    _ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let input = match string_argument(&args) {
        Some(input) if well_formed_escapes(&input) => input,
        _ => return Ok(AbstractValue::Top),
    };
    Ok(match percent_decode_str(&input).decode_utf8() {
        Ok(decoded) => AbstractValue::string(decoded.into_owned()),
        Err(_) => AbstractValue::Top,
    })
}

/// decodeURI
fn decode_uri(
    _ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let input = match string_argument(&args) {
        Some(input) if well_formed_escapes(&input) => input,
        _ => return Ok(AbstractValue::Top),
    };
    Ok(match decode_uri_str(&input) {
        Some(decoded) => AbstractValue::string(decoded),
        None => AbstractValue::Top,
    })
}

/// Percent-decodes `input` except for escapes of reserved URI characters.
pub fn decode_uri_str(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = std::str::from_utf8(bytes.get(i + 1..i + 3)?).ok()?;
            let byte = u8::from_str_radix(hex, 16).ok()?;
            if URI_RESERVED.contains(&byte) {
                out.extend_from_slice(&bytes[i..i + 3]);
            } else {
                out.push(byte);
            }
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// encodeURIComponent
fn encode_uri_component(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match to_concrete_string(ctx, &argument(&args, 0))? {
        Some(s) => AbstractValue::string(utf8_percent_encode(&s, URI_COMPONENT).to_string()),
        None => AbstractValue::Top,
    })
}

/// unescape
fn unescape(
    ctx: &mut EvalContext,
    _site: &CallSite,
    _this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    Ok(match to_concrete_string(ctx, &argument(&args, 0))? {
        Some(s) => unescape_str(&s).map_or(AbstractValue::Top, AbstractValue::string),
        None => AbstractValue::Top,
    })
}

/// Legacy `%XX` and `%uXXXX` decoding over UTF-16 units; malformed escapes stay as they are.
/// `None` when the decoded units leave a surrogate unpaired.
pub fn unescape_str(input: &str) -> Option<String> {
    let units = utf16_units(input);
    let hex = |range: &[u16]| -> Option<u16> {
        let text = String::from_utf16(range).ok()?;
        if !text.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u16::from_str_radix(&text, 16).ok()
    };
    let mut out = Vec::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        if units[i] == u16::from(b'%') {
            if units.get(i + 1) == Some(&u16::from(b'u')) {
                if let Some(unit) = units.get(i + 2..i + 6).and_then(hex) {
                    out.push(unit);
                    i += 6;
                    continue;
                }
            }
            if let Some(unit) = units.get(i + 1..i + 3).and_then(hex) {
                out.push(unit);
                i += 3;
                continue;
            }
        }
        out.push(units[i]);
        i += 1;
    }
    string_from_utf16(&out)
}
