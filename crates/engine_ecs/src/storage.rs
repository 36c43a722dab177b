//! Per-kind component storage.
//!
//! A [`ComponentStore`] is a sparse set: a dense array of component values,
//! a parallel dense array of owning entities, and a sparse table indexed by
//! entity id that points back into the dense arrays.
//!
//! ```text
//! sparse  (entity -> index):  [ 1, -, 0, -, 2 ]
//! dense   (index -> entity):  [ e2, e0, e4 ]
//! values  (index -> value):   [ v2, v0, v4 ]
//! ```
//!
//! Removal is swap-and-pop, so every operation is O(1) but the dense order
//! changes whenever something other than the last slot is removed.
//!
//! The registry holds stores as `Box<dyn ErasedStore>` so it can remove a
//! destroyed entity from every kind, persist stores, and show them in an
//! inspector without naming the concrete component types.

use std::any::Any;
use std::fmt::Debug;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::entity::Entity;
use crate::error::{EcsError, Result};

/// Dense storage for every component of kind `T`.
///
/// The serialised form is the ordered triple `(values, entity -> index,
/// index -> entity)`. The sparse table is a plain vector, so the encoding is
/// deterministic and a decode/encode cycle reproduces it byte for byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentStore<T> {
    values: Vec<T>,
    sparse: Vec<Option<u32>>,
    dense: Vec<Entity>,
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            sparse: Vec::new(),
            dense: Vec::new(),
        }
    }
}

impl<T: Component> ComponentStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Dense index of `entity`'s component, if it has one.
    fn slot(&self, entity: Entity) -> Option<usize> {
        self.sparse
            .get(entity.index())
            .copied()
            .flatten()
            .map(|index| index as usize)
    }

    fn not_found(entity: Entity) -> EcsError {
        EcsError::ComponentNotFound {
            entity,
            component: T::type_name(),
        }
    }

    /// Appends a component for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateComponent`] if `entity` already has one;
    /// the store is left untouched.
    pub fn insert(&mut self, entity: Entity, value: T) -> Result<&mut T> {
        if self.contains(entity) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: T::type_name(),
            });
        }
        let index = self.dense.len();
        if entity.index() >= self.sparse.len() {
            self.sparse.resize(entity.index() + 1, None);
        }
        self.sparse[entity.index()] = Some(index as u32);
        self.dense.push(entity);
        self.values.push(value);
        Ok(&mut self.values[index])
    }

    /// Removes and returns `entity`'s component.
    ///
    /// The last dense slot is moved into the vacated one.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if `entity` has none.
    pub fn remove(&mut self, entity: Entity) -> Result<T> {
        let index = self.slot(entity).ok_or_else(|| Self::not_found(entity))?;
        self.sparse[entity.index()] = None;
        self.dense.swap_remove(index);
        let value = self.values.swap_remove(index);
        if let Some(&moved) = self.dense.get(index) {
            self.sparse[moved.index()] = Some(index as u32);
        }
        Ok(value)
    }

    /// Borrows `entity`'s component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if `entity` has none.
    pub fn get(&self, entity: Entity) -> Result<&T> {
        let index = self.slot(entity).ok_or_else(|| Self::not_found(entity))?;
        Ok(&self.values[index])
    }

    /// Mutably borrows `entity`'s component.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentNotFound`] if `entity` has none.
    pub fn get_mut(&mut self, entity: Entity) -> Result<&mut T> {
        let index = self.slot(entity).ok_or_else(|| Self::not_found(entity))?;
        Ok(&mut self.values[index])
    }

    /// Returns `true` if `entity` has a component in this store.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// The dense index -> entity sequence, in iteration order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.dense
    }

    /// The dense component values, parallel to [`entities`](Self::entities).
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Number of components stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns `true` if the store holds no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Iterates `(entity, component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.dense.iter().copied().zip(self.values.iter())
    }

    /// Iterates `(entity, component)` pairs mutably in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.dense.iter().copied().zip(self.values.iter_mut())
    }

    /// Splits the store into the raw parts a join view needs.
    pub(crate) fn fetch(&mut self) -> StoreFetch<'_, T> {
        StoreFetch {
            values: self.values.as_mut_ptr(),
            sparse: &self.sparse,
            dense: &self.dense,
            _marker: PhantomData,
        }
    }

    /// Checks that the three tables describe the same set of entities.
    fn validate(&self) -> Result<()> {
        let corrupt = |reason: String| EcsError::CorruptStore {
            component: T::type_name(),
            reason,
        };
        if self.values.len() != self.dense.len() {
            return Err(corrupt(format!(
                "{} values but {} entities",
                self.values.len(),
                self.dense.len()
            )));
        }
        for (index, &entity) in self.dense.iter().enumerate() {
            if self.slot(entity) != Some(index) {
                return Err(corrupt(format!(
                    "{entity} at dense index {index} is not mapped back to it"
                )));
            }
        }
        let mapped = self.sparse.iter().filter(|slot| slot.is_some()).count();
        if mapped != self.dense.len() {
            return Err(corrupt(format!(
                "{mapped} mapped entities but {} dense entries",
                self.dense.len()
            )));
        }
        Ok(())
    }
}

/// Type-erased capabilities of a [`ComponentStore`].
///
/// Implemented once for every `ComponentStore<T>`; the registry keeps its
/// stores as `Box<dyn ErasedStore>` keyed by [`TypeId`](std::any::TypeId).
pub trait ErasedStore: Any {
    /// Name of the stored component kind.
    fn component_name(&self) -> &'static str;

    /// Number of components stored.
    fn len(&self) -> usize;

    /// Returns `true` if the store holds no components.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The dense index -> entity sequence.
    fn entities(&self) -> &[Entity];

    /// Returns `true` if `entity` has a component in this store.
    fn contains(&self, entity: Entity) -> bool;

    /// Drops `entity`'s component if present. Returns whether one was removed.
    fn remove_entity(&mut self, entity: Entity) -> bool;

    /// Encodes the store's `(values, entity -> index, index -> entity)` triple.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Encode`] if a component fails to serialise.
    fn try_serialize(&self) -> Result<Vec<u8>>;

    /// Replaces the store's contents with a previously encoded triple.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Decode`] for malformed bytes and
    /// [`EcsError::CorruptStore`] if the decoded tables are inconsistent. The
    /// store is unchanged on error.
    fn try_deserialize(&mut self, bytes: &[u8]) -> Result<()>;

    /// `entity`'s component as a debug-printable value.
    fn inspect(&self, entity: Entity) -> Option<&dyn Debug>;

    /// Drops every component.
    fn clear(&mut self);

    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStore for ComponentStore<T> {
    fn component_name(&self) -> &'static str {
        T::type_name()
    }

    fn len(&self) -> usize {
        self.dense.len()
    }

    fn entities(&self) -> &[Entity] {
        &self.dense
    }

    fn contains(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_ok()
    }

    fn try_serialize(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec(self)?)
    }

    fn try_deserialize(&mut self, bytes: &[u8]) -> Result<()> {
        let decoded: Self = rmp_serde::from_slice(bytes)?;
        decoded.validate()?;
        *self = decoded;
        Ok(())
    }

    fn inspect(&self, entity: Entity) -> Option<&dyn Debug> {
        self.slot(entity)
            .map(|index| &self.values[index] as &dyn Debug)
    }

    fn clear(&mut self) {
        self.values.clear();
        self.sparse.clear();
        self.dense.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Raw access into one store for the lifetime of a join view.
///
/// Holds the value buffer as a raw pointer so several entities' components
/// can be handed out as `&'a mut T` one after another while the lookup
/// tables stay shared.
pub struct StoreFetch<'a, T> {
    values: *mut T,
    sparse: &'a [Option<u32>],
    pub(crate) dense: &'a [Entity],
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> StoreFetch<'a, T> {
    /// Returns `true` if `entity` has a component in the fetched store.
    pub(crate) fn contains(&self, entity: Entity) -> bool {
        matches!(self.sparse.get(entity.index()), Some(Some(_)))
    }

    /// Hands out `entity`'s component.
    ///
    /// # Safety
    ///
    /// Each entity must be fetched at most once for the lifetime `'a`, so no
    /// two live `&mut T` alias the same slot.
    pub(crate) unsafe fn get(&self, entity: Entity) -> Option<&'a mut T> {
        let index = self.sparse.get(entity.index()).copied().flatten()? as usize;
        // SAFETY: `index` comes from the store's own sparse table, so it is
        // below the value buffer's length, and the buffer cannot be resized
        // while `'a` borrows the store. The caller rules out aliasing.
        Some(unsafe { &mut *self.values.add(index) })
    }
}
