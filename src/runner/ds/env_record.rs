use std::collections::HashMap;

use crate::runner::ds::value::AbstractValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub usize);

/// Declarative environment record: the bindings of one function body or program.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentRecord {
    pub parent: Option<ScopeId>,
    pub bindings: HashMap<String, AbstractValue>,
}

/// Arena of environment records. Record 0 is the global scope.
#[derive(Debug, Clone)]
pub struct Scopes {
    records: Vec<EnvironmentRecord>,
}

impl Scopes {
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn new() -> Self {
        Scopes {
            records: vec![EnvironmentRecord::default()],
        }
    }

    pub fn new_scope(&mut self, parent: ScopeId) -> ScopeId {
        self.records.push(EnvironmentRecord {
            parent: Some(parent),
            bindings: HashMap::new(),
        });
        ScopeId(self.records.len() - 1)
    }

    pub fn record(&self, scope: ScopeId) -> Option<&EnvironmentRecord> {
        self.records.get(scope.0)
    }

    /// Innermost scope on the chain from `scope` that binds `name`.
    pub fn find_binding_scope(&self, scope: ScopeId, name: &str) -> Option<ScopeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let record = self.records.get(id.0)?;
            if record.bindings.contains_key(name) {
                return Some(id);
            }
            current = record.parent;
        }
        None
    }

    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&AbstractValue> {
        let found = self.find_binding_scope(scope, name)?;
        self.records.get(found.0)?.bindings.get(name)
    }

    pub fn has_own_binding(&self, scope: ScopeId, name: &str) -> bool {
        self.records
            .get(scope.0)
            .map(|r| r.bindings.contains_key(name))
            .unwrap_or(false)
    }

    /// Creates or overwrites a binding directly in `scope`.
    pub fn declare(&mut self, scope: ScopeId, name: &str, value: AbstractValue) {
        if let Some(record) = self.records.get_mut(scope.0) {
            record.bindings.insert(name.to_string(), value);
        }
    }

    /// Assigns to the nearest binding; an undeclared name becomes a global, as in sloppy mode.
    pub fn assign(&mut self, scope: ScopeId, name: &str, value: AbstractValue) {
        let target = self
            .find_binding_scope(scope, name)
            .unwrap_or(Scopes::GLOBAL);
        self.declare(target, name, value);
    }

    pub fn global_bindings(&self) -> &HashMap<String, AbstractValue> {
        &self.records[Scopes::GLOBAL.0].bindings
    }

    /// Copies the records `other` created past this arena's end, as for object ids.
    pub fn reserve_ids_of(&mut self, other: &Scopes) {
        if other.records.len() > self.records.len() {
            let start = self.records.len();
            self.records.extend_from_slice(&other.records[start..]);
        }
    }

    /// Pointwise join. A name bound on one side only joins with `Top`.
    pub fn join(self, other: Scopes, max_union_size: usize) -> Scopes {
        let mut left = self.records.into_iter();
        let mut right = other.records.into_iter();
        let mut records = vec![];
        loop {
            match (left.next(), right.next()) {
                (Some(mut a), Some(mut b)) => {
                    let mut bindings = HashMap::new();
                    for (name, value) in a.bindings.drain() {
                        let joined = match b.bindings.remove(&name) {
                            Some(other_value) => value.join(other_value).widen(max_union_size),
                            None => AbstractValue::Top,
                        };
                        bindings.insert(name, joined);
                    }
                    for (name, _) in b.bindings.drain() {
                        bindings.insert(name, AbstractValue::Top);
                    }
                    records.push(EnvironmentRecord {
                        parent: a.parent,
                        bindings,
                    });
                }
                (Some(a), None) | (None, Some(a)) => records.push(a),
                (None, None) => break,
            }
        }
        Scopes { records }
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_walks_parents() {
        let mut scopes = Scopes::new();
        scopes.declare(Scopes::GLOBAL, "a", AbstractValue::number(1.0));
        let inner = scopes.new_scope(Scopes::GLOBAL);
        scopes.declare(inner, "b", AbstractValue::number(2.0));
        assert_eq!(scopes.lookup(inner, "a"), Some(&AbstractValue::number(1.0)));
        assert_eq!(scopes.lookup(Scopes::GLOBAL, "b"), None);
    }

    #[test]
    fn test_assign_undeclared_goes_global() {
        let mut scopes = Scopes::new();
        let inner = scopes.new_scope(Scopes::GLOBAL);
        scopes.assign(inner, "leak", AbstractValue::Null);
        assert_eq!(scopes.global_bindings().get("leak"), Some(&AbstractValue::Null));
    }

    #[test]
    fn test_join_one_sided_binding_is_top() {
        let mut a = Scopes::new();
        let b = Scopes::new();
        a.declare(Scopes::GLOBAL, "x", AbstractValue::number(1.0));
        let joined = a.join(b, 16);
        assert_eq!(joined.lookup(Scopes::GLOBAL, "x"), Some(&AbstractValue::Top));
    }
}
