//! Entity type and allocation utilities.
//!
//! An [`Entity`] is a plain `u32` handle with no data of its own. Liveness is
//! tracked by the [`EntityAllocator`] that issued it, never by the handle.
//!
//! Freed ids are recycled LIFO and carry no generation tag: a stale handle to
//! a destroyed entity is indistinguishable from the entity that later reuses
//! the same id. Callers that hold handles across a destroy must track that
//! themselves.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, Result};

/// An opaque entity handle.
///
/// Handles are only meaningful for the [`Registry`](crate::Registry) that
/// created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity(pub u32);

impl Entity {
    /// Create an entity from a raw `u32` identifier.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw `u32` identifier.
    #[must_use]
    pub const fn id(self) -> u32 {
        self.0
    }

    /// The id widened for use as a table index.
    #[must_use]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Issues and recycles entity ids.
///
/// Allocation pops the free list first and only grows the counter when the
/// list is empty. The counter wraps on overflow; that limit is not detected.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityAllocator {
    next_id: u32,
    free: Vec<Entity>,
    /// `alive[id]` is set between `allocate` and `free` for that id.
    alive: Vec<bool>,
}

impl EntityAllocator {
    /// Creates a new allocator. The first id issued is `0`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates an entity id, reusing the most recently freed one if any.
    pub fn allocate(&mut self) -> Entity {
        let entity = match self.free.pop() {
            Some(recycled) => recycled,
            None => {
                let fresh = Entity(self.next_id);
                self.next_id = self.next_id.wrapping_add(1);
                fresh
            }
        };
        let index = entity.index();
        if index >= self.alive.len() {
            self.alive.resize(index + 1, false);
        }
        self.alive[index] = true;
        entity
    }

    /// Returns an id to the free list.
    ///
    /// Returns `false` and changes nothing if `entity` is not currently
    /// allocated, so a double free never puts an id on the list twice.
    pub fn free(&mut self, entity: Entity) -> bool {
        match self.alive.get_mut(entity.index()) {
            Some(slot) if *slot => {
                *slot = false;
                self.free.push(entity);
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if `entity` has been allocated and not freed since.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.get(entity.index()).copied().unwrap_or(false)
    }

    /// Number of currently allocated ids.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.alive.iter().filter(|&&alive| alive).count()
    }

    /// Number of ids waiting on the free list.
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Checks that allocator state decoded from elsewhere can be trusted.
    ///
    /// Every free id must be below the counter, dead, and listed once, and
    /// no id at or above the counter may be marked alive.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::CorruptAllocator`] describing the first violation.
    pub fn validate(&self) -> Result<()> {
        let issued = self.next_id as usize;
        if self.alive.len() > issued {
            return Err(EcsError::CorruptAllocator(format!(
                "liveness table covers {} ids but only {issued} were issued",
                self.alive.len()
            )));
        }
        let mut seen = HashSet::with_capacity(self.free.len());
        for &entity in &self.free {
            if entity.index() >= issued {
                return Err(EcsError::CorruptAllocator(format!(
                    "free list holds {entity}, which was never issued"
                )));
            }
            if self.is_alive(entity) {
                return Err(EcsError::CorruptAllocator(format!(
                    "free list holds live {entity}"
                )));
            }
            if !seen.insert(entity) {
                return Err(EcsError::CorruptAllocator(format!(
                    "free list holds {entity} twice"
                )));
            }
        }
        Ok(())
    }
}
