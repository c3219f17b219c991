use log::{debug, trace};

use crate::runner::ds::array_object::array_set_length;
use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::object::{AbstractObject, MissingMode};
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::type_conversion::{
    as_integer, string_value_from_utf16, to_property_key, utf16_len, utf16_units,
};
use crate::runner::ds::value::{AbstractValue, ObjectId, PrimitiveValue};
use crate::runner::plugin::resolver::ReceiverCategory;
use crate::runner::plugin::types::EvalContext;

/// Names every plain object inherits from `Object.prototype`.
const OBJECT_PROTOTYPE_NAMES: &[&str] = &[
    "constructor",
    "hasOwnProperty",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "toLocaleString",
    "toString",
    "valueOf",
    "__proto__",
    "__defineGetter__",
    "__defineSetter__",
    "__lookupGetter__",
    "__lookupSetter__",
];

/// Hook category of an object. A degraded object might be an array, so array hooks apply to it.
pub fn object_category(obj: &AbstractObject) -> Option<ReceiverCategory> {
    if obj.is_callable() {
        Some(ReceiverCategory::Callable)
    } else if obj.regexp.is_some() {
        Some(ReceiverCategory::RegExp)
    } else if obj.is_array() || obj.missing_mode() == MissingMode::MissingIsTop {
        Some(ReceiverCategory::Array)
    } else {
        None
    }
}

fn hooked_method(
    ctx: &EvalContext,
    category: ReceiverCategory,
    name: &str,
) -> Option<AbstractValue> {
    let id = ctx.registry().method_hooks().resolve(category, name)?;
    debug!("method hook resolved {:?}.{} to {}", category, name, id);
    Some(AbstractValue::Reference(id))
}

/// `receiver[key]`.
pub fn get_property(
    ctx: &EvalContext,
    receiver: &AbstractValue,
    key: &AbstractValue,
) -> Result<AbstractValue, AnalysisError> {
    if matches!(receiver, AbstractValue::Top | AbstractValue::Bottom) {
        return Ok(receiver.clone());
    }
    match to_property_key(ctx, key)? {
        Some(key) => get_property_by_key(ctx, receiver, &key),
        None => Ok(AbstractValue::Top),
    }
}

pub fn get_property_by_key(
    ctx: &EvalContext,
    receiver: &AbstractValue,
    key: &PropertyKey,
) -> Result<AbstractValue, AnalysisError> {
    trace!("get {}[{}]", receiver, key);
    Ok(match receiver {
        AbstractValue::Reference(id) => get_object_property(ctx, *id, key)?,
        AbstractValue::Union(members) => {
            let mut result = AbstractValue::Bottom;
            for m in members {
                result = result.join(get_property_by_key(ctx, m, key)?);
            }
            result.widen(ctx.max_union_size())
        }
        AbstractValue::Primitive(PrimitiveValue::String(s)) => match key {
            PropertyKey::Index(i) => {
                let units = utf16_units(s);
                match units.get(*i as usize) {
                    Some(unit) => string_value_from_utf16(&[*unit]),
                    None => AbstractValue::Undefined,
                }
            }
            PropertyKey::Name(name) if name == "length" => {
                AbstractValue::number(utf16_len(s) as f64)
            }
            PropertyKey::Name(name) => {
                hooked_method(ctx, ReceiverCategory::String, name).unwrap_or(AbstractValue::Top)
            }
        },
        AbstractValue::Primitive(PrimitiveValue::Number(_)) => match key {
            PropertyKey::Name(name) => {
                hooked_method(ctx, ReceiverCategory::Number, name).unwrap_or(AbstractValue::Top)
            }
            PropertyKey::Index(_) => AbstractValue::Undefined,
        },
        AbstractValue::Bottom => AbstractValue::Bottom,
        _ => AbstractValue::Top,
    })
}

fn get_object_property(
    ctx: &EvalContext,
    id: ObjectId,
    key: &PropertyKey,
) -> Result<AbstractValue, AnalysisError> {
    let obj = ctx.object(id)?;
    if let Some(value) = obj.get_own(key) {
        return Ok(value.clone());
    }
    let name = match key {
        PropertyKey::Name(name) => name.as_str(),
        PropertyKey::Index(_) => return Ok(obj.missing_value()),
    };
    if name == "length" {
        if let Some(length) = obj.tablength() {
            return Ok(AbstractValue::number(length as f64));
        }
    }
    let category = object_category(obj);
    if let Some(category) = category {
        if let Some(method) = hooked_method(ctx, category, name) {
            return Ok(method);
        }
        // Arrays and functions carry many more prototype members than are hooked.
        return Ok(AbstractValue::Top);
    }
    if OBJECT_PROTOTYPE_NAMES.contains(&name) {
        return Ok(AbstractValue::Top);
    }
    Ok(obj.missing_value())
}

/// `receiver[key] = value`.
pub fn set_property(
    ctx: &mut EvalContext,
    receiver: &AbstractValue,
    key: &AbstractValue,
    value: AbstractValue,
) -> Result<(), AnalysisError> {
    let key = match receiver {
        AbstractValue::Reference(_) | AbstractValue::Union(_) => to_property_key(ctx, key)?,
        _ => None,
    };
    let max_union_size = ctx.max_union_size();
    match receiver {
        AbstractValue::Reference(id) => {
            write_object_property(ctx.object_mut(*id)?, key, value, false, max_union_size);
        }
        AbstractValue::Union(members) => {
            for m in members {
                if let AbstractValue::Reference(id) = m {
                    write_object_property(
                        ctx.object_mut(*id)?,
                        key.clone(),
                        value.clone(),
                        true,
                        max_union_size,
                    );
                }
            }
        }
        AbstractValue::Top => {
            debug!("write through an unknown receiver, degrading program objects");
            ctx.state.store.degrade_program_objects();
        }
        _ => {}
    }
    Ok(())
}

/// A weak update keeps the old value as a possibility: the write may have hit another object.
pub fn write_object_property(
    obj: &mut AbstractObject,
    key: Option<PropertyKey>,
    value: AbstractValue,
    weak: bool,
    max_union_size: usize,
) {
    let key = match key {
        Some(key) => key,
        None => {
            debug!("write to an unknown key, degrading object");
            obj.forget_all();
            return;
        }
    };
    if obj.is_array() && key.is_named("length") {
        match value.as_number().and_then(as_integer) {
            Some(length) if length >= 0 && !weak => array_set_length(obj, length as u64),
            _ => obj.forget_all(),
        }
        return;
    }
    if weak {
        let joined = obj.get(&key).join(value).widen(max_union_size);
        if let (PropertyKey::Index(i), Some(length)) = (&key, obj.tablength()) {
            if *i >= length {
                obj.mark_missing_is_top();
            }
        }
        obj.insert(key, joined);
    } else {
        obj.set(key, value);
    }
}

/// `delete receiver[key]`.
pub fn delete_property(
    ctx: &mut EvalContext,
    receiver: &AbstractValue,
    key: &AbstractValue,
) -> Result<(), AnalysisError> {
    let key = match receiver {
        AbstractValue::Reference(_) | AbstractValue::Union(_) => to_property_key(ctx, key)?,
        _ => None,
    };
    let targets: Vec<ObjectId> = receiver
        .alternatives()
        .iter()
        .filter_map(|v| v.as_reference())
        .collect();
    let weak = targets.len() > 1;
    let max_union_size = ctx.max_union_size();
    for id in targets {
        let obj = ctx.object_mut(id)?;
        match &key {
            Some(k) if weak => {
                let joined = obj.get(k).join(obj.missing_value()).widen(max_union_size);
                obj.insert(k.clone(), joined);
            }
            Some(k) => {
                obj.remove(k);
            }
            None => obj.forget_all(),
        }
    }
    if receiver.is_top() {
        ctx.state.store.degrade_program_objects();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> AbstractValue {
        AbstractValue::number(n)
    }

    #[test]
    fn test_weak_update_keeps_old_value() {
        let mut obj = AbstractObject::new_plain().with_property("x", num(1.0));
        write_object_property(&mut obj, Some(PropertyKey::from_name("x")), num(2.0), true, 16);
        assert_eq!(
            obj.get(&PropertyKey::from_name("x")),
            AbstractValue::Union(vec![num(1.0), num(2.0)])
        );
    }

    #[test]
    fn test_unknown_key_write_degrades() {
        let mut obj = AbstractObject::new_plain().with_property("x", num(1.0));
        write_object_property(&mut obj, None, num(2.0), false, 16);
        assert_eq!(obj.get(&PropertyKey::from_name("x")), AbstractValue::Top);
        assert_eq!(obj.missing_mode(), MissingMode::MissingIsTop);
    }

    #[test]
    fn test_length_write_truncates_or_degrades() {
        let mut arr = AbstractObject::new_array(vec![Some(num(1.0)), Some(num(2.0))]);
        let length = || Some(PropertyKey::from_name("length"));
        write_object_property(&mut arr, length(), num(1.0), false, 16);
        assert_eq!(arr.tablength(), Some(1));
        write_object_property(&mut arr, length(), AbstractValue::Top, false, 16);
        assert_eq!(arr.tablength(), None);
        assert_eq!(arr.missing_mode(), MissingMode::MissingIsTop);
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            object_category(&AbstractObject::new_array(vec![])),
            Some(ReceiverCategory::Array)
        );
        assert_eq!(object_category(&AbstractObject::new_plain()), None);
    }
}
