use crate::runner::ds::env_record::Scopes;
use crate::runner::ds::heap::{HeapConfig, ObjectStore};
use crate::runner::ds::value::AbstractValue;

/// Mutable part of an analysis run: objects, bindings and the current expression value.
#[derive(Debug, Clone)]
pub struct AnalysisState {
    pub store: ObjectStore,
    pub scopes: Scopes,
    /// Value of the last evaluated expression statement.
    pub value: AbstractValue,
}

impl AnalysisState {
    pub fn new(store: ObjectStore, scopes: Scopes) -> Self {
        AnalysisState {
            store,
            scopes,
            value: AbstractValue::Undefined,
        }
    }

    /// Fork for a second branch: `self` is the pre-branch snapshot, `taken`
    /// is the state the first branch produced.
    pub fn fork_after(mut self, taken: &AnalysisState) -> AnalysisState {
        self.store.reserve_ids_of(&taken.store);
        self.scopes.reserve_ids_of(&taken.scopes);
        self
    }

    pub fn join(self, other: AnalysisState, max_union_size: usize) -> AnalysisState {
        AnalysisState {
            store: self.store.join(other.store, max_union_size),
            scopes: self.scopes.join(other.scopes, max_union_size),
            value: self.value.join(other.value).widen(max_union_size),
        }
    }
}

impl Default for AnalysisState {
    fn default() -> Self {
        AnalysisState::new(ObjectStore::new(HeapConfig::unlimited()), Scopes::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::object::AbstractObject;

    #[test]
    fn test_fork_and_join_branches() {
        let mut before = AnalysisState::default();
        before.scopes.declare(Scopes::GLOBAL, "x", AbstractValue::number(1.0));

        let mut first = before.clone();
        let a = first.store.allocate(AbstractObject::new_plain()).unwrap();
        first.scopes.assign(Scopes::GLOBAL, "x", AbstractValue::number(2.0));
        first.value = AbstractValue::Reference(a);

        let mut second = before.fork_after(&first);
        let b = second.store.allocate(AbstractObject::new_plain()).unwrap();
        assert_ne!(a, b);
        second.value = AbstractValue::Reference(b);

        let joined = first.join(second, 16);
        assert_eq!(
            joined.scopes.lookup(Scopes::GLOBAL, "x"),
            Some(&AbstractValue::Union(vec![
                AbstractValue::number(2.0),
                AbstractValue::number(1.0)
            ]))
        );
        assert_eq!(
            joined.value,
            AbstractValue::Union(vec![AbstractValue::Reference(a), AbstractValue::Reference(b)])
        );
    }
}
