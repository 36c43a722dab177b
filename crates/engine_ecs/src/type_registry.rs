//! Stable component type table.
//!
//! Maps a human-assigned name, hashed to a [`ComponentTypeId`], to the
//! component's runtime [`TypeId`] and to a factory that builds an empty store
//! of that kind. This is what lets a snapshot written by one build be loaded
//! by another: stores are tagged by hash, never by `TypeId`.
//!
//! ## Global table
//!
//! Type-erased consumers (snapshots, dynamic lookups) need one table for the
//! whole process. Build it at startup, before creating any
//! [`Registry`](crate::Registry), then [`install`](TypeRegistry::install) it:
//!
//! ```rust
//! # use engine_ecs::{Component, TypeRegistry};
//! # #[derive(Debug, serde::Serialize, serde::Deserialize)]
//! # struct Health(f32);
//! # impl Component for Health { fn type_name() -> &'static str { "Health" } }
//! let mut types = TypeRegistry::new();
//! types.register_component::<Health>();
//! let types = types.install().unwrap();
//! assert_eq!(types.len(), 1);
//! ```
//!
//! Every API that needs a table also accepts one explicitly, so tests and
//! tools can use private tables without touching the global.

use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::debug;

use crate::component::{Component, ComponentTypeId};
use crate::error::{EcsError, Result};
use crate::storage::{ComponentStore, ErasedStore};

static GLOBAL: OnceLock<TypeRegistry> = OnceLock::new();

/// Builds an empty store for one component kind.
pub type StoreFactory = fn() -> Box<dyn ErasedStore>;

fn new_store<T: Component>() -> Box<dyn ErasedStore> {
    Box::new(ComponentStore::<T>::new())
}

/// One registered component kind.
#[derive(Debug, Clone)]
struct Registration {
    name: String,
    type_id: TypeId,
    factory: StoreFactory,
}

/// Name-hash <-> type table with per-kind store factories.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_hash: HashMap<ComponentTypeId, Registration>,
    by_type: HashMap<TypeId, ComponentTypeId>,
}

impl TypeRegistry {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `name` and returns the name's hash.
    ///
    /// Registering an already-used name, or registering `T` a second time
    /// under a different name, replaces the earlier binding. Both directions
    /// of the table stay inverse.
    pub fn register<T: Component>(&mut self, name: &str) -> ComponentTypeId {
        let hash = ComponentTypeId::from_name(name);
        let type_id = TypeId::of::<T>();

        if let Some(previous) = self.by_hash.remove(&hash) {
            self.by_type.remove(&previous.type_id);
        }
        if let Some(previous_hash) = self.by_type.remove(&type_id) {
            self.by_hash.remove(&previous_hash);
        }

        self.by_hash.insert(
            hash,
            Registration {
                name: name.to_owned(),
                type_id,
                factory: new_store::<T>,
            },
        );
        self.by_type.insert(type_id, hash);
        debug!(name, %hash, component = type_name::<T>(), "registered component type");
        hash
    }

    /// Registers `T` under its [`Component::type_name`].
    pub fn register_component<T: Component>(&mut self) -> ComponentTypeId {
        self.register::<T>(T::type_name())
    }

    /// The stable hash registered for a runtime type.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] if the type was never registered.
    pub fn constant(&self, type_id: TypeId) -> Result<ComponentTypeId> {
        self.by_type
            .get(&type_id)
            .copied()
            .ok_or_else(|| EcsError::UnknownType(format!("{type_id:?}")))
    }

    /// The stable hash registered for `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] if `T` was never registered.
    pub fn constant_of<T: Component>(&self) -> Result<ComponentTypeId> {
        self.by_type
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or_else(|| EcsError::UnknownType(type_name::<T>().to_owned()))
    }

    /// The runtime type registered under `hash`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] if nothing is registered under `hash`.
    pub fn type_index(&self, hash: ComponentTypeId) -> Result<TypeId> {
        self.registration(hash).map(|r| r.type_id)
    }

    /// The name `hash` was registered under.
    #[must_use]
    pub fn name_of(&self, hash: ComponentTypeId) -> Option<&str> {
        self.by_hash.get(&hash).map(|r| r.name.as_str())
    }

    /// Builds an empty store for the kind registered under `hash`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] if nothing is registered under `hash`.
    pub fn create_store(&self, hash: ComponentTypeId) -> Result<Box<dyn ErasedStore>> {
        self.registration(hash).map(|r| (r.factory)())
    }

    /// Number of registered kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    fn registration(&self, hash: ComponentTypeId) -> Result<&Registration> {
        self.by_hash
            .get(&hash)
            .ok_or_else(|| EcsError::UnknownType(hash.to_string()))
    }

    /// Makes this table the process-wide one.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RegistryAlreadyInstalled`] if a table was already
    /// installed; the existing table is kept.
    pub fn install(self) -> Result<&'static TypeRegistry> {
        let count = self.len();
        GLOBAL
            .set(self)
            .map_err(|_| EcsError::RegistryAlreadyInstalled)?;
        debug!(count, "installed global type registry");
        Self::global()
    }

    /// The process-wide table.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::RegistryNotInstalled`] before [`install`](Self::install).
    pub fn global() -> Result<&'static TypeRegistry> {
        GLOBAL.get().ok_or(EcsError::RegistryNotInstalled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Health(f32);

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Velocity(f32, f32);

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[test]
    fn test_inverse_law() {
        let mut types = TypeRegistry::new();
        types.register_component::<Health>();
        types.register::<Velocity>("physics.velocity");

        for type_id in [TypeId::of::<Health>(), TypeId::of::<Velocity>()] {
            let hash = types.constant(type_id).unwrap();
            assert_eq!(types.type_index(hash).unwrap(), type_id);
        }
        assert_eq!(
            types.constant_of::<Velocity>().unwrap(),
            ComponentTypeId::from_name("physics.velocity")
        );
        assert_eq!(
            types.name_of(ComponentTypeId::from_name("physics.velocity")),
            Some("physics.velocity")
        );
    }

    #[test]
    fn test_unknown_lookups_fail() {
        let types = TypeRegistry::new();
        assert!(matches!(
            types.constant(TypeId::of::<Health>()),
            Err(EcsError::UnknownType(_))
        ));
        assert!(matches!(
            types.constant_of::<Health>(),
            Err(EcsError::UnknownType(_))
        ));
        let hash = ComponentTypeId::from_name("Health");
        assert!(matches!(types.type_index(hash), Err(EcsError::UnknownType(_))));
        assert!(matches!(types.create_store(hash), Err(EcsError::UnknownType(_))));
        assert!(types.is_empty());
    }

    #[test]
    fn test_reregistering_name_overwrites() {
        let mut types = TypeRegistry::new();
        let hash = types.register::<Health>("shared");
        assert_eq!(types.register::<Velocity>("shared"), hash);

        assert_eq!(types.len(), 1);
        assert_eq!(types.type_index(hash).unwrap(), TypeId::of::<Velocity>());
        assert!(types.constant_of::<Health>().is_err());
    }

    #[test]
    fn test_reregistering_type_drops_old_name() {
        let mut types = TypeRegistry::new();
        let old = types.register::<Health>("hp");
        let new = types.register::<Health>("health");
        assert_eq!(types.len(), 1);
        assert!(types.type_index(old).is_err());
        assert_eq!(types.constant_of::<Health>().unwrap(), new);
    }

    #[test]
    fn test_factory_builds_matching_store() {
        let mut types = TypeRegistry::new();
        let hash = types.register_component::<Health>();
        let mut store = types.create_store(hash).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.component_name(), "Health");

        let typed = store
            .as_any_mut()
            .downcast_mut::<ComponentStore<Health>>()
            .unwrap();
        typed.insert(Entity(0), Health(1.0)).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_global_install_once() {
        let mut types = TypeRegistry::new();
        types.register_component::<Health>();
        let installed = types.install().unwrap();
        assert!(installed.constant_of::<Health>().is_ok());
        assert!(TypeRegistry::global().is_ok());
        assert!(matches!(
            TypeRegistry::new().install(),
            Err(EcsError::RegistryAlreadyInstalled)
        ));
    }
}
