//! Legacy-to-new identifier maps.
//!
//! A pass fills an [`IdentifierMapBuilder`] while it assigns fresh ids, then
//! freezes it into an [`IdentifierMap`]. Later passes only ever see the
//! frozen map, so the mapping for an entity type cannot change once its
//! pass is done.

use std::collections::HashMap;
use uuid::Uuid;

use crate::entity::EntityKind;

/// Mutable side of an identifier map, owned by the pass that fills it
#[derive(Debug)]
pub struct IdentifierMapBuilder {
    entity: EntityKind,
    ids: HashMap<String, Uuid>,
}

impl IdentifierMapBuilder {
    pub fn new(entity: EntityKind) -> Self {
        Self {
            entity,
            ids: HashMap::new(),
        }
    }

    /// Record the new id for a legacy key.
    ///
    /// A repeated legacy key keeps the latest id, matching how the legacy
    /// export is read top to bottom.
    pub fn insert(&mut self, legacy: impl Into<String>, id: Uuid) {
        let legacy = legacy.into();
        if let Some(previous) = self.ids.insert(legacy.clone(), id) {
            tracing::warn!(
                entity = self.entity.key(),
                legacy_id = %legacy,
                previous = %previous,
                "Duplicate legacy id, keeping the latest mapping"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn freeze(self) -> IdentifierMap {
        IdentifierMap {
            entity: self.entity,
            ids: self.ids,
        }
    }
}

/// Read-only legacy-to-new id lookup for one entity type
#[derive(Debug, Clone)]
pub struct IdentifierMap {
    entity: EntityKind,
    ids: HashMap<String, Uuid>,
}

impl IdentifierMap {
    /// An empty map, for passes whose parent collection was empty.
    pub fn empty(entity: EntityKind) -> Self {
        IdentifierMapBuilder::new(entity).freeze()
    }

    pub fn entity(&self) -> EntityKind {
        self.entity
    }

    /// Look up the new id for a legacy key. Legacy keys are matched exactly
    /// as they appear in the export.
    pub fn resolve(&self, legacy: &str) -> Option<Uuid> {
        self.ids.get(legacy).copied()
    }

    pub fn contains(&self, legacy: &str) -> bool {
        self.ids.contains_key(legacy)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freeze_and_resolve() {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let mut builder = IdentifierMapBuilder::new(EntityKind::Property);
        builder.insert("1", first);
        builder.insert("2".to_string(), second);
        let map = builder.freeze();

        assert_eq!(map.entity(), EntityKind::Property);
        assert_eq!(map.len(), 2);
        assert_eq!(map.resolve("1"), Some(first));
        assert_eq!(map.resolve("2"), Some(second));
        assert_eq!(map.resolve("3"), None);
    }

    #[test]
    fn test_duplicate_legacy_id_keeps_latest() {
        let old = Uuid::new_v4();
        let new = Uuid::new_v4();

        let mut builder = IdentifierMapBuilder::new(EntityKind::Tenant);
        builder.insert("7", old);
        builder.insert("7", new);

        let map = builder.freeze();
        assert_eq!(map.len(), 1);
        assert_eq!(map.resolve("7"), Some(new));
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut builder = IdentifierMapBuilder::new(EntityKind::Tenant);
        builder.insert("12", Uuid::new_v4());
        let map = builder.freeze();

        assert!(map.contains("12"));
        assert!(!map.contains(" 12"));
        assert!(!map.contains("12.0"));
        assert!(IdentifierMap::empty(EntityKind::Tenant).is_empty());
    }
}
