//! Object store for one analysis run.
//!
//! Objects live in an arena indexed by [`ObjectId`]. Ids are handed out in
//! allocation order and never reused, so reference identity stays stable for
//! `===` and aliasing checks for the whole run.

use log::debug;

use crate::runner::ds::error::AnalysisError;
use crate::runner::ds::object::AbstractObject;
use crate::runner::ds::value::{AbstractValue, ObjectId};

/// Configuration for the object store.
#[derive(Debug, Clone)]
pub struct HeapConfig {
    /// Maximum number of live objects. None means unlimited.
    pub max_objects: Option<usize>,
}

impl HeapConfig {
    /// Create a new heap configuration with no object limit.
    pub fn unlimited() -> Self {
        HeapConfig { max_objects: None }
    }

    /// Create a new heap configuration with an object limit.
    pub fn with_limit(max_objects: usize) -> Self {
        HeapConfig {
            max_objects: Some(max_objects),
        }
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[derive(Debug, Clone)]
pub struct ObjectStore {
    config: HeapConfig,
    objects: Vec<AbstractObject>,
    /// Objects below this id were registered during setup.
    preexisting: usize,
}

fn dangling(id: ObjectId) -> AnalysisError {
    AnalysisError::defect("object store", "lookup", &AbstractValue::Reference(id))
}

impl ObjectStore {
    pub fn new(config: HeapConfig) -> Self {
        ObjectStore {
            config,
            objects: Vec::new(),
            preexisting: 0,
        }
    }

    /// Store seeded with the objects registered during setup; their ids are kept as is.
    pub fn with_preexisting(config: HeapConfig, objects: &[AbstractObject]) -> Self {
        ObjectStore {
            config,
            objects: objects.to_vec(),
            preexisting: objects.len(),
        }
    }

    /// Allocate an object and return its fresh id.
    ///
    /// Returns an error if the allocation would exceed the object limit.
    pub fn allocate(&mut self, obj: AbstractObject) -> Result<ObjectId, AnalysisError> {
        if let Some(max_objects) = self.config.max_objects {
            if self.objects.len() >= max_objects {
                return Err(AnalysisError::Defect {
                    context: "object store".to_string(),
                    operator: "allocate".to_string(),
                    value: format!("{} objects (limit {})", self.objects.len(), max_objects),
                });
            }
        }
        self.objects.push(obj);
        Ok(ObjectId(self.objects.len() - 1))
    }

    pub fn get(&self, id: ObjectId) -> Option<&AbstractObject> {
        self.objects.get(id.0)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut AbstractObject> {
        self.objects.get_mut(id.0)
    }

    /// Like [`get`](Self::get), but a dangling id is a defect.
    pub fn object(&self, id: ObjectId) -> Result<&AbstractObject, AnalysisError> {
        self.objects
            .get(id.0)
            .ok_or_else(|| dangling(id))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Result<&mut AbstractObject, AnalysisError> {
        self.objects
            .get_mut(id.0)
            .ok_or_else(|| dangling(id))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn preexisting_count(&self) -> usize {
        self.preexisting
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &AbstractObject)> {
        self.objects.iter().enumerate().map(|(i, o)| (ObjectId(i), o))
    }

    /// Every object reachable from `roots` through property values, roots included.
    pub fn reachable_from(&self, roots: &[AbstractValue]) -> Vec<ObjectId> {
        let mut seen = vec![false; self.objects.len()];
        let mut stack: Vec<ObjectId> = roots
            .iter()
            .flat_map(|v| v.alternatives())
            .filter_map(|v| v.as_reference())
            .collect();
        let mut reached = vec![];
        while let Some(id) = stack.pop() {
            match seen.get_mut(id.0) {
                Some(flag) if !*flag => *flag = true,
                _ => continue,
            }
            reached.push(id);
            if let Some(obj) = self.objects.get(id.0) {
                stack.extend(obj.referenced_objects());
            }
        }
        reached
    }

    /// Degrades the given objects and everything reachable from them.
    pub fn degrade_reachable(&mut self, roots: &[AbstractValue]) {
        for id in self.reachable_from(roots) {
            if let Some(obj) = self.objects.get_mut(id.0) {
                debug!("degrading object {} to missing-is-top", id);
                obj.forget_all();
            }
        }
    }

    /// Degrades every object allocated by the analyzed program.
    pub fn degrade_program_objects(&mut self) {
        debug!(
            "degrading {} program objects",
            self.objects.len().saturating_sub(self.preexisting)
        );
        for obj in self.objects.iter_mut().skip(self.preexisting) {
            obj.forget_all();
        }
    }

    /// Copies the objects `other` allocated past this store's end so both
    /// stores agree on which ids are taken. The copies are unreachable here.
    pub fn reserve_ids_of(&mut self, other: &ObjectStore) {
        if other.objects.len() > self.objects.len() {
            let start = self.objects.len();
            self.objects.extend_from_slice(&other.objects[start..]);
        }
    }

    /// Pointwise join of two stores that forked from the same ancestor.
    pub fn join(self, other: ObjectStore, max_union_size: usize) -> ObjectStore {
        let preexisting = self.preexisting;
        let config = self.config.clone();
        let mut left = self.objects.into_iter();
        let mut right = other.objects.into_iter();
        let mut objects = vec![];
        loop {
            match (left.next(), right.next()) {
                (Some(a), Some(b)) => objects.push(a.join(b, max_union_size)),
                (Some(a), None) | (None, Some(a)) => objects.push(a),
                (None, None) => break,
            }
        }
        ObjectStore {
            config,
            objects,
            preexisting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::object::MissingMode;
    use crate::runner::ds::object_property::PropertyKey;

    #[test]
    fn test_ids_are_monotonic() {
        let mut store = ObjectStore::new(HeapConfig::unlimited());
        let a = store.allocate(AbstractObject::new_plain()).unwrap();
        let b = store.allocate(AbstractObject::new_plain()).unwrap();
        assert_eq!(a, ObjectId(0));
        assert_eq!(b, ObjectId(1));
    }

    #[test]
    fn test_store_limited() {
        let mut store = ObjectStore::new(HeapConfig::with_limit(1));
        assert!(store.allocate(AbstractObject::new_plain()).is_ok());
        assert!(matches!(
            store.allocate(AbstractObject::new_plain()),
            Err(AnalysisError::Defect { .. })
        ));
    }

    #[test]
    fn test_preexisting_objects_keep_their_ids() {
        let seed = vec![AbstractObject::new_plain(), AbstractObject::new_plain()];
        let mut store = ObjectStore::with_preexisting(HeapConfig::unlimited(), &seed);
        assert_eq!(store.allocate(AbstractObject::new_plain()).unwrap(), ObjectId(2));
        assert_eq!(store.preexisting_count(), 2);
    }

    #[test]
    fn test_degrade_reachable_follows_properties() {
        let mut store = ObjectStore::new(HeapConfig::unlimited());
        let inner = store.allocate(AbstractObject::new_array(vec![])).unwrap();
        let outer = store
            .allocate(
                AbstractObject::new_plain().with_property("x", AbstractValue::Reference(inner)),
            )
            .unwrap();
        let unrelated = store.allocate(AbstractObject::new_plain()).unwrap();
        store.degrade_reachable(&[AbstractValue::Reference(outer)]);
        assert_eq!(store.get(inner).unwrap().missing_mode(), MissingMode::MissingIsTop);
        assert_eq!(
            store.get(outer).unwrap().get(&PropertyKey::from_name("x")),
            AbstractValue::Top
        );
        assert_eq!(
            store.get(unrelated).unwrap().missing_mode(),
            MissingMode::MissingIsUndefined
        );
    }

    #[test]
    fn test_forked_stores_do_not_share_ids() {
        let mut base = ObjectStore::new(HeapConfig::unlimited());
        base.allocate(AbstractObject::new_plain()).unwrap();
        let mut left = base.clone();
        let a = left.allocate(AbstractObject::new_plain()).unwrap();
        let mut right = base;
        right.reserve_ids_of(&left);
        let b = right.allocate(AbstractObject::new_plain()).unwrap();
        assert_ne!(a, b);
        let joined = left.join(right, 16);
        assert_eq!(joined.len(), 3);
    }
}
