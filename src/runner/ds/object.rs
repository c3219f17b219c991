use std::collections::{HashMap, HashSet};

use regress::{Match, Regex};

use crate::runner::ds::function_object::{FunctionObject, NativeId};
use crate::runner::ds::object_property::PropertyKey;
use crate::runner::ds::value::{AbstractValue, ObjectId};

/// What a read of a key absent from `properties` yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingMode {
    MissingIsUndefined,
    MissingIsTop,
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Plain,
    Function(FunctionObject),
    Native(NativeId),
}

/// Compiled pattern held in the internal slot of RegExp objects.
#[derive(Debug, Clone)]
pub struct RegExpSlot {
    pub regex: Regex,
    pub source: String,
    pub flags: String,
}

impl RegExpSlot {
    pub fn is_global(&self) -> bool {
        self.flags.contains('g')
    }

    /// First match at or after the code unit `start`. Without the `u` flag the
    /// input is matched unit by unit, surrogate halves included.
    pub fn find_at(&self, units: &[u16], start: usize) -> Option<Match> {
        if start > units.len() {
            return None;
        }
        if self.flags.contains('u') {
            self.regex.find_from_utf16(units, start).next()
        } else {
            self.regex.find_from_ucs2(units, start).next()
        }
    }

    /// Every non-overlapping match, stepping one unit past empty ones.
    pub fn find_all(&self, units: &[u16]) -> Vec<Match> {
        let mut matches = vec![];
        let mut start = 0;
        while let Some(m) = self.find_at(units, start) {
            start = if m.range().is_empty() {
                m.range().end + 1
            } else {
                m.range().end
            };
            matches.push(m);
        }
        matches
    }
}

/// Partial model of a JS object or array.
///
/// Once `missing_mode` is `MissingIsTop` it never reverts and `tablength` stays `None`.
#[derive(Debug, Clone)]
pub struct AbstractObject {
    properties: HashMap<PropertyKey, AbstractValue>,
    tablength: Option<u64>,
    missing_mode: MissingMode,
    pub kind: ObjectKind,
    pub regexp: Option<RegExpSlot>,
}

impl AbstractObject {
    pub fn new_plain() -> Self {
        AbstractObject {
            properties: HashMap::new(),
            tablength: None,
            missing_mode: MissingMode::MissingIsUndefined,
            kind: ObjectKind::Plain,
            regexp: None,
        }
    }

    /// Array with a known length; `None` entries are holes.
    pub fn new_array(elements: Vec<Option<AbstractValue>>) -> Self {
        let mut obj = AbstractObject::new_plain();
        obj.tablength = Some(elements.len() as u64);
        for (i, element) in elements.into_iter().enumerate() {
            if let Some(value) = element {
                obj.properties.insert(PropertyKey::Index(i as u64), value);
            }
        }
        obj
    }

    pub fn new_function(function: FunctionObject) -> Self {
        let mut obj = AbstractObject::new_plain();
        obj.kind = ObjectKind::Function(function);
        obj
    }

    pub fn new_native(id: NativeId) -> Self {
        let mut obj = AbstractObject::new_plain();
        obj.kind = ObjectKind::Native(id);
        obj
    }

    pub fn with_property(mut self, key: impl Into<PropertyKey>, value: AbstractValue) -> Self {
        self.set(key.into(), value);
        self
    }

    pub fn tablength(&self) -> Option<u64> {
        self.tablength
    }

    /// Sets the tracked length. A degraded object keeps `None` whatever is asked.
    pub fn set_tablength(&mut self, length: Option<u64>) {
        if self.missing_mode == MissingMode::MissingIsUndefined {
            self.tablength = length;
        }
    }

    pub fn missing_mode(&self) -> MissingMode {
        self.missing_mode
    }

    pub fn properties(&self) -> &HashMap<PropertyKey, AbstractValue> {
        &self.properties
    }

    pub fn is_callable(&self) -> bool {
        !matches!(self.kind, ObjectKind::Plain)
    }

    pub fn is_array(&self) -> bool {
        self.tablength.is_some()
    }

    pub fn missing_value(&self) -> AbstractValue {
        match self.missing_mode {
            MissingMode::MissingIsUndefined => AbstractValue::Undefined,
            MissingMode::MissingIsTop => AbstractValue::Top,
        }
    }

    pub fn get_own(&self, key: &PropertyKey) -> Option<&AbstractValue> {
        self.properties.get(key)
    }

    /// Own property, or whatever the missing mode says for an absent key.
    pub fn get(&self, key: &PropertyKey) -> AbstractValue {
        match self.properties.get(key) {
            Some(v) => v.clone(),
            None => self.missing_value(),
        }
    }

    /// Writes a property, growing the tracked length when an index lands past the end.
    pub fn set(&mut self, key: PropertyKey, value: AbstractValue) {
        if let (PropertyKey::Index(i), Some(length)) = (&key, self.tablength) {
            if *i >= length {
                self.tablength = Some(i + 1);
            }
        }
        self.properties.insert(key, value);
    }

    /// Writes a property without touching the tracked length.
    pub fn insert(&mut self, key: PropertyKey, value: AbstractValue) {
        self.properties.insert(key, value);
    }

    pub fn remove(&mut self, key: &PropertyKey) -> Option<AbstractValue> {
        self.properties.remove(key)
    }

    pub fn index_keys_sorted(&self) -> Vec<u64> {
        let mut indexes: Vec<u64> = self.properties.keys().filter_map(|k| k.as_index()).collect();
        indexes.sort_unstable();
        indexes
    }

    /// Keeps the known properties but stops tracking anything else.
    pub fn mark_missing_is_top(&mut self) {
        self.missing_mode = MissingMode::MissingIsTop;
        self.tablength = None;
    }

    /// Drops every known property and degrades to `MissingIsTop`.
    pub fn forget_all(&mut self) {
        self.properties.clear();
        self.mark_missing_is_top();
    }

    pub fn contains_top(&self) -> bool {
        self.missing_mode == MissingMode::MissingIsTop
            || self.properties.values().any(|v| v.is_top())
    }

    /// Objects directly referenced from property values.
    pub fn referenced_objects(&self) -> Vec<ObjectId> {
        let mut seen = HashSet::new();
        for value in self.properties.values() {
            for alt in value.alternatives() {
                if let AbstractValue::Reference(id) = alt {
                    seen.insert(id);
                }
            }
        }
        seen.into_iter().collect()
    }

    /// Pointwise join of two versions of the same object.
    pub fn join(self, other: AbstractObject, max_union_size: usize) -> AbstractObject {
        let self_missing = self.missing_value();
        let other_missing = other.missing_value();
        let mut keys: HashSet<&PropertyKey> = self.properties.keys().collect();
        keys.extend(other.properties.keys());
        let mut properties = HashMap::with_capacity(keys.len());
        for key in keys {
            let a = self.properties.get(key).cloned().unwrap_or_else(|| self_missing.clone());
            let b = other.properties.get(key).cloned().unwrap_or_else(|| other_missing.clone());
            properties.insert(key.clone(), a.join(b).widen(max_union_size));
        }
        let mut joined = AbstractObject {
            properties,
            tablength: self.tablength,
            missing_mode: self.missing_mode,
            kind: self.kind,
            regexp: self.regexp.or(other.regexp),
        };
        if other.missing_mode == MissingMode::MissingIsTop || self.tablength != other.tablength {
            joined.mark_missing_is_top();
        }
        joined
    }
}
