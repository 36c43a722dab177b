//! Persisting a whole registry.
//!
//! A [`WorldSnapshot`] holds the allocator state plus one [`StoreRecord`] per
//! component store. Each record is tagged with the kind's stable
//! [`ComponentTypeId`], so a loader needs nothing but a [`TypeRegistry`] to
//! rebuild stores of the right concrete type. Records are sorted by hash, so
//! saving the same world twice produces identical bytes.
//!
//! All encoding is MessagePack via `rmp-serde`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::component::ComponentTypeId;
use crate::entity::EntityAllocator;
use crate::error::{EcsError, Result};
use crate::registry::Registry;
use crate::type_registry::TypeRegistry;

/// One component store's encoded `(values, entity -> index, index -> entity)`
/// triple, tagged with its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRecord {
    /// Stable hash of the component kind.
    pub type_hash: ComponentTypeId,
    /// MessagePack-encoded store.
    pub data: Vec<u8>,
}

/// The persisted form of a [`Registry`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Entity allocation state, including the free list order.
    pub allocator: EntityAllocator,
    /// Every component store, sorted by `type_hash`.
    pub stores: Vec<StoreRecord>,
}

impl WorldSnapshot {
    /// Encode to MessagePack bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Encode`] if serialisation fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    /// Decode from MessagePack bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Decode`] for malformed input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl Registry {
    /// Capture every store and the allocator.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] if any store's kind is not registered
    /// in `types`, or [`EcsError::Encode`] if a component fails to serialise.
    pub fn snapshot(&self, types: &TypeRegistry) -> Result<WorldSnapshot> {
        let mut stores = Vec::with_capacity(self.stores.len());
        for (&type_id, store) in &self.stores {
            let type_hash = types
                .constant(type_id)
                .map_err(|_| EcsError::UnknownType(store.component_name().to_owned()))?;
            stores.push(StoreRecord {
                type_hash,
                data: store.try_serialize()?,
            });
        }
        stores.sort_by_key(|record| record.type_hash);
        Ok(WorldSnapshot {
            allocator: self.allocator.clone(),
            stores,
        })
    }

    /// Rebuild a registry from a snapshot, constructing each store from its
    /// hash alone.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] for an unregistered hash,
    /// [`EcsError::Decode`] for a malformed store, and
    /// [`EcsError::CorruptAllocator`] if the allocator could reissue a live
    /// id, and [`EcsError::CorruptStore`] if a store is inconsistent, appears
    /// twice, or references an entity the allocator does not consider alive.
    pub fn from_snapshot(snapshot: WorldSnapshot, types: &TypeRegistry) -> Result<Self> {
        let WorldSnapshot { allocator, stores: records } = snapshot;
        allocator.validate()?;
        let mut stores = HashMap::with_capacity(records.len());
        for record in records {
            let type_id = types.type_index(record.type_hash)?;
            let mut store = types.create_store(record.type_hash)?;
            store.try_deserialize(&record.data)?;

            if let Some(&dead) = store
                .entities()
                .iter()
                .find(|&&entity| !allocator.is_alive(entity))
            {
                return Err(EcsError::CorruptStore {
                    component: store.component_name(),
                    reason: format!("holds a component for dead {dead}"),
                });
            }
            let component = store.component_name();
            if stores.insert(type_id, store).is_some() {
                return Err(EcsError::CorruptStore {
                    component,
                    reason: "store appears twice in snapshot".to_owned(),
                });
            }
        }
        debug!(
            entities = allocator.alive_count(),
            stores = stores.len(),
            "restored registry from snapshot"
        );
        Ok(Self { allocator, stores })
    }

    /// Encode the registry with `types`.
    ///
    /// # Errors
    ///
    /// See [`snapshot`](Self::snapshot).
    pub fn save(&self, types: &TypeRegistry) -> Result<Vec<u8>> {
        let bytes = self.snapshot(types)?.to_bytes()?;
        debug!(bytes = bytes.len(), stores = self.stores.len(), "saved registry");
        Ok(bytes)
    }

    /// Decode a registry previously written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// See [`from_snapshot`](Self::from_snapshot).
    pub fn load(bytes: &[u8], types: &TypeRegistry) -> Result<Self> {
        Self::from_snapshot(WorldSnapshot::from_bytes(bytes)?, types)
    }

    /// [`save`](Self::save) with the installed global type table.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RegistryNotInstalled`] if no table is installed.
    pub fn save_global(&self) -> Result<Vec<u8>> {
        self.save(TypeRegistry::global()?)
    }

    /// [`load`](Self::load) with the installed global type table.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RegistryNotInstalled`] if no table is installed.
    pub fn load_global(bytes: &[u8]) -> Result<Self> {
        Self::load(bytes, TypeRegistry::global()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Component, Entity};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Position {
        x: f32,
        y: f32,
    }
    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Label(String);
    impl Component for Label {
        fn type_name() -> &'static str {
            "Label"
        }
    }

    fn types() -> TypeRegistry {
        let mut types = TypeRegistry::new();
        types.register_component::<Position>();
        types.register_component::<Label>();
        types
    }

    fn world() -> Registry {
        let mut registry = Registry::new();
        for i in 0..6 {
            let e = registry.create();
            registry
                .add_component(e, Position { x: i as f32, y: 0.0 })
                .unwrap();
            if i % 2 == 1 {
                registry.add_component(e, Label(format!("odd-{i}"))).unwrap();
            }
        }
        registry.destroy(Entity(2)).unwrap();
        registry.remove_component::<Position>(Entity(0)).unwrap();
        registry
    }

    #[test]
    fn test_save_load_restores_state() {
        let types = types();
        let registry = world();
        let bytes = registry.save(&types).unwrap();
        let mut restored = Registry::load(&bytes, &types).unwrap();

        assert_eq!(restored.entity_count(), registry.entity_count());
        assert_eq!(
            restored.entities_with::<Position>(),
            registry.entities_with::<Position>()
        );
        assert_eq!(
            restored.get_component::<Label>(Entity(3)).unwrap(),
            &Label("odd-3".to_owned())
        );
        assert!(!restored.has_component::<Position>(Entity(0)));
        assert!(!restored.is_alive(Entity(2)));
        // The free list survives, so the next id is the destroyed one.
        assert_eq!(restored.create(), Entity(2));
    }

    #[test]
    fn test_resave_is_byte_identical() {
        let types = types();
        let bytes = world().save(&types).unwrap();
        let again = Registry::load(&bytes, &types).unwrap().save(&types).unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn test_records_are_sorted_by_hash() {
        let snapshot = world().snapshot(&types()).unwrap();
        let hashes: Vec<_> = snapshot.stores.iter().map(|r| r.type_hash).collect();
        let mut sorted = hashes.clone();
        sorted.sort();
        assert_eq!(hashes, sorted);
        assert_eq!(hashes.len(), 2);
    }

    #[test]
    fn test_unregistered_kind_cannot_be_saved() {
        let mut types = TypeRegistry::new();
        types.register_component::<Position>();
        let err = world().save(&types).unwrap_err();
        assert!(matches!(err, EcsError::UnknownType(name) if name == "Label"));
    }

    #[test]
    fn test_unknown_hash_cannot_be_loaded() {
        let bytes = world().save(&types()).unwrap();
        let mut partial = TypeRegistry::new();
        partial.register_component::<Label>();
        assert!(matches!(
            Registry::load(&bytes, &partial),
            Err(EcsError::UnknownType(_))
        ));
    }

    #[test]
    fn test_store_for_dead_entity_is_rejected() {
        let types = types();
        let mut snapshot = world().snapshot(&types).unwrap();
        snapshot.allocator = EntityAllocator::new();
        assert!(matches!(
            Registry::from_snapshot(snapshot, &types),
            Err(EcsError::CorruptStore { .. })
        ));
    }

    #[test]
    fn test_allocator_reissuing_live_id_is_rejected() {
        let types = types();
        let mut registry = Registry::new();
        let e = registry.create();
        registry
            .add_component(e, Position { x: 7.0, y: 0.0 })
            .unwrap();
        let mut snapshot = registry.snapshot(&types).unwrap();

        // Entity 0 is alive and also sitting on the free list.
        let forged = rmp_serde::to_vec(&(1u32, vec![e], vec![true])).unwrap();
        snapshot.allocator = rmp_serde::from_slice(&forged).unwrap();

        assert!(matches!(
            Registry::from_snapshot(snapshot, &types),
            Err(EcsError::CorruptAllocator(_))
        ));
    }

    #[test]
    fn test_duplicate_record_is_rejected() {
        let types = types();
        let mut snapshot = world().snapshot(&types).unwrap();
        let first = snapshot.stores[0].clone();
        snapshot.stores.push(first);
        assert!(matches!(
            Registry::from_snapshot(snapshot, &types),
            Err(EcsError::CorruptStore { .. })
        ));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        assert!(matches!(
            Registry::load(&[0xc1, 0x00], &types()),
            Err(EcsError::Decode(_))
        ));
    }
}
