//! # engine_ecs
//!
//! The storage layer of the engine's ECS. Rendering, physics, input and
//! networking are all clients of this crate: they read and write simulation
//! state through entity handles, per-component operations and join views
//! rather than owning their own data layout.
//!
//! This crate provides:
//!
//! - [`Entity`] / [`EntityAllocator`]: `u32` handles with LIFO id recycling.
//! - [`Component`] / [`ComponentTypeId`]: the component contract and its
//!   stable FNV-1a 32-bit identifier.
//! - [`ComponentStore`]: sparse-set storage, one per component kind, behind
//!   the type-erased [`ErasedStore`] interface.
//! - [`TypeRegistry`]: name hash <-> type table with store factories, used
//!   to rebuild stores from persisted data.
//! - [`Registry`]: one world's entities and stores.
//! - [`View`]: joins over several component kinds, driven by the smallest
//!   store.
//! - [`WorldSnapshot`]: MessagePack persistence of a whole registry.
//!
//! Everything here is single-threaded and synchronous.

pub mod component;
pub mod entity;
pub mod error;
pub mod registry;
pub mod snapshot;
pub mod storage;
pub mod type_registry;
pub mod view;

pub use component::{Component, ComponentTypeId};
pub use entity::{Entity, EntityAllocator};
pub use error::{EcsError, Result};
pub use registry::Registry;
pub use snapshot::{StoreRecord, WorldSnapshot};
pub use storage::{ComponentStore, ErasedStore};
pub use type_registry::{StoreFactory, TypeRegistry};
pub use view::{View, ViewQuery};
