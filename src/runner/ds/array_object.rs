//! Array operations over the missing-mode object model.
//!
//! Every operation that needs to know which indices exist gives up once the
//! length is no longer tracked: the array is degraded and the result is `Top`.

use log::debug;

use crate::runner::bridge::TaggedValue;
use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::object::AbstractObject;
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::operations::test_and_comparison::strict_equality_comparison;
use crate::runner::ds::value::AbstractValue;

fn degrade(obj: &mut AbstractObject, operation: &str) -> AbstractValue {
    debug!("{} on an array of unknown length, degrading it", operation);
    obj.forget_all();
    AbstractValue::Top
}

/// Appends `values` and yields the new length.
pub fn array_push(obj: &mut AbstractObject, values: Vec<AbstractValue>) -> AbstractValue {
    let mut length = match obj.tablength() {
        Some(length) => length,
        None => return degrade(obj, "push"),
    };
    for value in values {
        obj.insert(PropertyKey::Index(length), value);
        length += 1;
    }
    obj.set_tablength(Some(length));
    AbstractValue::number(length as f64)
}

pub fn array_pop(obj: &mut AbstractObject) -> AbstractValue {
    let length = match obj.tablength() {
        Some(length) => length,
        None => return degrade(obj, "pop"),
    };
    if length == 0 {
        return AbstractValue::Undefined;
    }
    let last = PropertyKey::Index(length - 1);
    let value = obj.remove(&last).unwrap_or_else(|| obj.missing_value());
    obj.set_tablength(Some(length - 1));
    value
}

/// Removes index 0 and moves every other index down by one. A hole at 0 yields `Undefined`.
pub fn array_shift(obj: &mut AbstractObject) -> AbstractValue {
    let length = match obj.tablength() {
        Some(length) => length,
        None => return degrade(obj, "shift"),
    };
    if length == 0 {
        return AbstractValue::Undefined;
    }
    let first = obj
        .remove(&PropertyKey::Index(0))
        .unwrap_or_else(|| obj.missing_value());
    for i in obj.index_keys_sorted() {
        if let Some(value) = obj.remove(&PropertyKey::Index(i)) {
            obj.insert(PropertyKey::Index(i - 1), value);
        }
    }
    obj.set_tablength(Some(length - 1));
    first
}

/// Copy with every index `k` moved to `length - 1 - k`. The source is left untouched.
pub fn array_reversed(obj: &AbstractObject) -> Option<AbstractObject> {
    let length = obj.tablength()?;
    let mut reversed = AbstractObject::new_array(vec![]);
    reversed.set_tablength(Some(length));
    for i in obj.index_keys_sorted() {
        if i < length {
            if let Some(value) = obj.get_own(&PropertyKey::Index(i)) {
                reversed.insert(PropertyKey::Index(length - 1 - i), value.clone());
            }
        }
    }
    Some(reversed)
}

/// `===` when the answer is certain.
pub fn strictly_equal(a: &AbstractValue, b: &AbstractValue) -> Option<bool> {
    match (a, b) {
        (AbstractValue::Reference(x), AbstractValue::Reference(y)) => Some(x == y),
        (AbstractValue::Reference(_), other) | (other, AbstractValue::Reference(_)) => {
            if other.is_concrete() {
                Some(false)
            } else {
                None
            }
        }
        _ => match (TaggedValue::from_abstract(a), TaggedValue::from_abstract(b)) {
            (Some(x), Some(y)) => Some(strict_equality_comparison(&x, &y)),
            _ => None,
        },
    }
}

/// First index at or after `start` holding a value `===` to `item`, or -1.
pub fn array_index_of(obj: &AbstractObject, item: &AbstractValue, start: i64) -> AbstractValue {
    let length = match obj.tablength() {
        Some(length) => length as i64,
        None => return AbstractValue::Top,
    };
    let from = if start < 0 { (length + start).max(0) } else { start };
    for i in from..length {
        let element = match obj.get_own(&PropertyKey::Index(i as u64)) {
            Some(element) => element,
            None => continue,
        };
        match strictly_equal(element, item) {
            Some(true) => return AbstractValue::number(i as f64),
            Some(false) => {}
            None => return AbstractValue::Top,
        }
    }
    AbstractValue::number(-1.0)
}

/// Elements `0..length`, or `None` as soon as the length is unknown or an index is missing.
pub fn dense_elements(obj: &AbstractObject) -> Option<Vec<&AbstractValue>> {
    let length = obj.tablength()?;
    (0..length)
        .map(|i| obj.get_own(&PropertyKey::Index(i)))
        .collect()
}

/// Joins the dense prefix. `stringify` gives `None` for elements it cannot render.
pub fn array_join<F>(
    obj: &AbstractObject,
    separator: &str,
    mut stringify: F,
) -> Result<AbstractValue, AnalysisError>
where
    F: FnMut(&AbstractValue) -> Result<Option<String>, AnalysisError>,
{
    if obj.contains_top() {
        return Ok(AbstractValue::Top);
    }
    let elements = match dense_elements(obj) {
        Some(elements) => elements,
        None => return Ok(AbstractValue::Top),
    };
    let mut parts = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            AbstractValue::Undefined | AbstractValue::Null => parts.push(String::new()),
            other => match stringify(other)? {
                Some(s) => parts.push(s),
                None => return Ok(AbstractValue::Top),
            },
        }
    }
    Ok(AbstractValue::string(parts.join(separator)))
}

/// Assigning `length`: indices past the new end are dropped.
pub fn array_set_length(obj: &mut AbstractObject, new_length: u64) {
    for i in obj.index_keys_sorted() {
        if i >= new_length {
            obj.remove(&PropertyKey::Index(i));
        }
    }
    obj.set_tablength(Some(new_length));
}
