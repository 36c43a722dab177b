//! Storage-layer error types.

use crate::entity::Entity;

/// Errors returned by the entity, store, registry and type-table APIs.
///
/// Every variant is raised synchronously at the call that broke the
/// precondition, before any structural mutation is observed.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity already holds a component of this kind.
    #[error("{entity} already has a `{component}` component")]
    DuplicateComponent {
        /// The entity the component was added to.
        entity: Entity,
        /// The component kind's name.
        component: &'static str,
    },

    /// The entity holds no component of this kind.
    #[error("{entity} has no `{component}` component")]
    ComponentNotFound {
        /// The entity that was looked up.
        entity: Entity,
        /// The component kind's name.
        component: &'static str,
    },

    /// The entity was never created or has already been destroyed.
    #[error("{0} is not alive")]
    EntityNotFound(Entity),

    /// A component kind or hash that was never registered (or never used in
    /// this registry).
    #[error("unknown component type: {0}")]
    UnknownType(String),

    /// Failed to encode a store or snapshot to MessagePack.
    #[error("failed to encode: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a store or snapshot from MessagePack.
    #[error("failed to decode: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A decoded store whose entity/index tables disagree.
    #[error("corrupt `{component}` store: {reason}")]
    CorruptStore {
        /// The component kind's name.
        component: &'static str,
        /// What was inconsistent.
        reason: String,
    },

    /// Decoded allocator state that would hand out live or duplicate ids.
    #[error("corrupt entity allocator: {0}")]
    CorruptAllocator(String),

    /// [`TypeRegistry::install`](crate::TypeRegistry::install) was called twice.
    #[error("a global type registry is already installed")]
    RegistryAlreadyInstalled,

    /// [`TypeRegistry::global`](crate::TypeRegistry::global) was called before
    /// any table was installed.
    #[error("no global type registry installed")]
    RegistryNotInstalled,
}

impl EcsError {
    /// Returns `true` for both "not found" conditions (missing component or
    /// dead entity).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ComponentNotFound { .. } | Self::EntityNotFound(_)
        )
    }
}

/// Shorthand result type for this crate.
pub type Result<T, E = EcsError> = std::result::Result<T, E>;
