//! The component registry: one world's entities and stores.
//!
//! A [`Registry`] owns an [`EntityAllocator`] and one type-erased
//! [`ComponentStore`] per component kind, created lazily the first time the
//! kind is added. Everything else in the engine reads and writes simulation
//! state through it: entity lifecycle, per-component add/remove/get/has, and
//! [`view`](Registry::view) joins.
//!
//! The registry is single-threaded. Callers on other threads must marshal
//! their work onto the owning thread or wrap the registry in their own lock.

use std::any::TypeId;
use std::collections::HashMap;

use tracing::{debug, trace};

use crate::component::Component;
use crate::entity::{Entity, EntityAllocator};
use crate::error::{EcsError, Result};
use crate::storage::{ComponentStore, ErasedStore};
use crate::view::{StoreMap, View, ViewQuery};

/// Entities plus every component store of one world or scene.
pub struct Registry {
    pub(crate) allocator: EntityAllocator,
    pub(crate) stores: StoreMap,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            stores: HashMap::new(),
        }
    }

    // -- Entity lifecycle --

    /// Allocate an entity with no components.
    pub fn create(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        trace!(%entity, "created entity");
        entity
    }

    /// Remove `entity` from every store holding it and release its id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if `entity` is not alive.
    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        let mut removed = 0usize;
        for store in self.stores.values_mut() {
            if store.remove_entity(entity) {
                removed += 1;
            }
        }
        self.allocator.free(entity);
        trace!(%entity, removed, "destroyed entity");
        Ok(())
    }

    /// Returns `true` if `entity` was created and not yet destroyed.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    // -- Component operations --

    /// Attach `value` to `entity`, creating the store for `T` on first use.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if `entity` is not alive and
    /// [`EcsError::DuplicateComponent`] if it already has a `T`.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> Result<&mut T> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        self.store_or_insert::<T>()?.insert(entity, value)
    }

    /// Attach `T::default()` to `entity`.
    ///
    /// # Errors
    ///
    /// Same as [`add_component`](Self::add_component).
    pub fn add_default<T: Component + Default>(&mut self, entity: Entity) -> Result<&mut T> {
        self.add_component(entity, T::default())
    }

    /// Detach and return `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownType`] if no `T` was ever added to this
    /// registry, and [`EcsError::ComponentNotFound`] if `entity` has no `T`.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T> {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|store| store.as_any_mut().downcast_mut::<ComponentStore<T>>())
            .ok_or_else(|| EcsError::UnknownType(T::type_name().to_owned()))?
            .remove(entity)
    }

    /// Borrow `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if `entity` has no `T`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T> {
        match self.store::<T>() {
            Some(store) => store.get(entity),
            None => Err(EcsError::ComponentNotFound {
                entity,
                component: T::type_name(),
            }),
        }
    }

    /// Mutably borrow `entity`'s `T`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if `entity` has no `T`.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        match self.store_mut::<T>() {
            Some(store) => store.get_mut(entity),
            None => Err(EcsError::ComponentNotFound {
                entity,
                component: T::type_name(),
            }),
        }
    }

    /// Returns `true` if `entity` has a `T`. Never fails, even if `T` was
    /// never used.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.store::<T>().is_some_and(|store| store.contains(entity))
    }

    /// Join over every entity holding all kinds in `Q`.
    ///
    /// ```rust,ignore
    /// for (entity, (transform, model)) in registry.view::<(Transform, ModelRef)>() { .. }
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `Q` names the same component kind twice.
    pub fn view<Q: ViewQuery>(&mut self) -> View<'_, Q> {
        View::new(&mut self.stores)
    }

    // -- Store access --

    /// The store for `T`, if `T` has been used in this registry.
    #[must_use]
    pub fn store<T: Component>(&self) -> Option<&ComponentStore<T>> {
        self.stores
            .get(&TypeId::of::<T>())?
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
    }

    fn store_mut<T: Component>(&mut self) -> Option<&mut ComponentStore<T>> {
        self.stores
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
    }

    fn store_or_insert<T: Component>(&mut self) -> Result<&mut ComponentStore<T>> {
        self.stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                debug!(component = T::type_name(), "created component store");
                Box::new(ComponentStore::<T>::new()) as Box<dyn ErasedStore>
            })
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .ok_or_else(|| EcsError::UnknownType(T::type_name().to_owned()))
    }

    /// Entities holding a `T`, in the store's dense order.
    #[must_use]
    pub fn entities_with<T: Component>(&self) -> &[Entity] {
        self.store::<T>()
            .map(ComponentStore::entities)
            .unwrap_or_default()
    }

    /// Number of component stores created so far.
    #[must_use]
    pub fn store_count(&self) -> usize {
        self.stores.len()
    }

    /// Every component `entity` holds, as `(kind name, debug text)` pairs
    /// sorted by name.
    #[must_use]
    pub fn inspect(&self, entity: Entity) -> Vec<(&'static str, String)> {
        let mut components: Vec<_> = self
            .stores
            .values()
            .filter_map(|store| {
                store
                    .inspect(entity)
                    .map(|value| (store.component_name(), format!("{value:?}")))
            })
            .collect();
        components.sort_by_key(|(name, _)| *name);
        components
    }

    /// Clear every store, drop them, and reset entity allocation.
    pub fn clear(&mut self) {
        for store in self.stores.values_mut() {
            store.clear();
        }
        self.stores.clear();
        self.allocator = EntityAllocator::new();
        debug!("cleared registry");
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stores: Vec<_> = self
            .stores
            .values()
            .map(|store| (store.component_name(), store.len()))
            .collect();
        stores.sort_unstable();
        f.debug_struct("Registry")
            .field("entities", &self.allocator.alive_count())
            .field("stores", &stores)
            .finish()
    }
}
