//! RegExp built-in.
//!
//! Patterns are compiled with `regress`, an ECMAScript regular expression
//! engine, into the object's internal slot. Patterns it rejects, repeated
//! flags and the sticky flag leave the object degraded instead.

use log::{debug, warn};
use regress::{Flags, Regex};

use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::object::{AbstractObject, MissingMode, RegExpSlot};
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::type_conversion::{
    as_integer, to_concrete_string, utf16_units,
};
use crate::runner::ds::value::{AbstractValue, ObjectId};
use crate::runner::plugin::core_resolver::CoreMethodHook;
use crate::runner::plugin::registry::BuiltInRegistry;
use crate::runner::plugin::resolver::ReceiverCategory;
use crate::runner::plugin::types::{BuiltInFn, BuiltInObject, CallSite, EvalContext};

use super::argument;

/// Register the RegExp global and the method hook for pattern objects.
pub fn register(registry: &mut BuiltInRegistry) {
    let regexp = BuiltInObject::new("RegExp").with_constructor(
        BuiltInFn::new("RegExp", regexp_constructor)
            .with_defaults(vec![AbstractValue::Undefined, AbstractValue::Undefined]),
    );
    registry.register_object(regexp);

    let test = registry.register_native(
        BuiltInFn::new("test", regexp_test).with_defaults(vec![AbstractValue::Undefined]),
    );
    let hook =
        CoreMethodHook::new("regexp", vec![ReceiverCategory::RegExp]).with_method("test", test);
    registry.register_method_hook(Box::new(hook));
}

/// Turns `target` into a RegExp object for `pattern` and `flags`.
pub fn new_regexp(
    ctx: &mut EvalContext,
    target: ObjectId,
    pattern: &str,
    flags: &str,
) -> Result<AbstractValue, AnalysisError> {
    let obj = ctx.object_mut(target)?;
    let mut engine_flags = String::new();
    for (i, flag) in flags.char_indices() {
        let supported = matches!(flag, 'g' | 'i' | 'm' | 's' | 'u');
        if !supported || flags[..i].contains(flag) {
            warn!(
                "regular expression flags `{}` are not supported, /{}/{} left unknown",
                flags, pattern, flags
            );
            obj.forget_all();
            return Ok(AbstractValue::Reference(target));
        }
        if flag != 'g' {
            engine_flags.push(flag);
        }
    }
    let regex = match Regex::with_flags(pattern, Flags::from(engine_flags.as_str())) {
        Ok(regex) => regex,
        Err(e) => {
            warn!("cannot compile /{}/{}: {}", pattern, flags, e);
            obj.forget_all();
            return Ok(AbstractValue::Reference(target));
        }
    };
    obj.regexp = Some(RegExpSlot {
        regex,
        source: pattern.to_string(),
        flags: flags.to_string(),
    });
    obj.set("source".into(), AbstractValue::string(pattern));
    obj.set("flags".into(), AbstractValue::string(flags));
    obj.set("global".into(), AbstractValue::boolean(flags.contains('g')));
    obj.set("lastIndex".into(), AbstractValue::number(0.0));
    Ok(AbstractValue::Reference(target))
}

/// The compiled pattern behind `v`, if `v` is exactly one intact RegExp object.
pub fn regexp_slot(
    ctx: &EvalContext,
    v: &AbstractValue,
) -> Result<Option<RegExpSlot>, AnalysisError> {
    Ok(match v {
        AbstractValue::Reference(id) => {
            let obj = ctx.object(*id)?;
            match &obj.regexp {
                Some(slot) if obj.missing_mode() == MissingMode::MissingIsUndefined => {
                    Some(slot.clone())
                }
                _ => None,
            }
        }
        _ => None,
    })
}

/// RegExp constructor
fn regexp_constructor(
    ctx: &mut EvalContext,
    site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let target = match this {
        AbstractValue::Reference(id) if site.construct => id,
        _ => ctx.allocate(AbstractObject::new_plain())?,
    };
    let pattern = argument(&args, 0);
    let flags = argument(&args, 1);
    let existing = regexp_slot(ctx, &pattern)?;
    let source = match (&existing, &pattern) {
        (Some(slot), _) => Some(slot.source.clone()),
        (None, AbstractValue::Undefined) => Some("(?:)".to_string()),
        (None, p) => to_concrete_string(ctx, p)?,
    };
    let flags = match (&existing, &flags) {
        (Some(slot), AbstractValue::Undefined) => Some(slot.flags.clone()),
        (None, AbstractValue::Undefined) => Some(String::new()),
        (_, f) => to_concrete_string(ctx, f)?,
    };
    match (source, flags) {
        (Some(source), Some(flags)) => new_regexp(ctx, target, &source, &flags),
        _ => {
            debug!("RegExp built from an unknown pattern, its shape is no longer tracked");
            ctx.object_mut(target)?.forget_all();
            Ok(AbstractValue::Reference(target))
        }
    }
}

/// RegExp.prototype.test
///
/// Global patterns search from `lastIndex` and move it, like the real method.
fn regexp_test(
    ctx: &mut EvalContext,
    _site: &CallSite,
    this: AbstractValue,
    args: Vec<AbstractValue>,
) -> Result<AbstractValue, AnalysisError> {
    let id = match this {
        AbstractValue::Reference(id) => id,
        _ => return Ok(AbstractValue::Top),
    };
    let slot = match regexp_slot(ctx, &this)? {
        Some(slot) => slot,
        None => return Ok(AbstractValue::Top),
    };
    let input = match to_concrete_string(ctx, &argument(&args, 0))? {
        Some(input) => input,
        None => return Ok(AbstractValue::Top),
    };
    let units = utf16_units(&input);
    if !slot.is_global() {
        return Ok(AbstractValue::boolean(slot.find_at(&units, 0).is_some()));
    }
    let last_index_key: PropertyKey = "lastIndex".into();
    let obj = ctx.object_mut(id)?;
    let last_index = match obj.get(&last_index_key).as_number().and_then(as_integer) {
        Some(i) if i >= 0 => i as usize,
        Some(_) => 0,
        None => return Ok(AbstractValue::Top),
    };
    let (matched, next) = match slot.find_at(&units, last_index) {
        Some(m) => (true, m.range().end),
        None => (false, 0),
    };
    obj.set(last_index_key, AbstractValue::number(next as f64));
    Ok(AbstractValue::boolean(matched))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(pattern: &str, flags: &str) -> RegExpSlot {
        RegExpSlot {
            regex: Regex::with_flags(pattern, Flags::from(flags.replace('g', "").as_str()))
                .unwrap(),
            source: pattern.to_string(),
            flags: flags.to_string(),
        }
    }

    #[test]
    fn test_character_classes_follow_ecmascript() {
        let digit = slot("^\\d$", "");
        assert!(digit.find_at(&utf16_units("7"), 0).is_some());
        assert!(digit.find_at(&utf16_units("\u{0663}"), 0).is_none());
        assert!(slot("^\\w$", "").find_at(&utf16_units("\u{00E9}"), 0).is_none());
        assert!(slot("^.$", "").find_at(&utf16_units("\r"), 0).is_none());
        assert!(slot("^.$", "s").find_at(&utf16_units("\r"), 0).is_some());
    }

    #[test]
    fn test_match_positions_are_code_units() {
        let units = utf16_units("\u{1F600}ab");
        let m = slot("b", "g").find_at(&units, 0).unwrap();
        assert_eq!(m.range(), 3..4);
        assert!(slot("a", "").find_at(&units, 4).is_none());
        assert!(slot("a", "").find_at(&units, 9).is_none());
    }

    #[test]
    fn test_find_all_steps_over_empty_matches() {
        let units = utf16_units("ab");
        let ranges: Vec<_> = slot("x*", "g").find_all(&units).iter().map(|m| m.range()).collect();
        assert_eq!(ranges, vec![0..0, 1..1, 2..2]);
    }
}
