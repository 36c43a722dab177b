//! Core [`Component`] trait and stable component type identifiers.
//!
//! ## Stable Type Identity
//!
//! [`std::any::TypeId`] is not stable across compilations or processes, so
//! persisted data is tagged with a [`ComponentTypeId`] instead: the FNV-1a
//! 32-bit hash of a human-assigned name. Any implementation that hashes the
//! same UTF-8 bytes gets the same id.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// A stable identifier for a component kind, derived from its name using
/// FNV-1a 32-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u32);

impl ComponentTypeId {
    /// FNV-1a 32-bit offset basis.
    const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;

    /// FNV-1a 32-bit prime.
    const FNV_PRIME: u32 = 0x0100_0193;

    /// Hash a component name with FNV-1a 32-bit.
    ///
    /// # Algorithm (FNV-1a 32-bit)
    ///
    /// ```text
    /// hash = 0x811c9dc5          (offset basis)
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x01000193  (prime)
    /// return hash
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u32;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// The id for `T` under its default name, [`Component::type_name`].
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

impl std::fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// The core component trait.
///
/// Components are plain data records. They must be serialisable so any store
/// can be persisted once its kind is registered with the
/// [`TypeRegistry`](crate::TypeRegistry), and `Debug` so inspectors can show
/// them without knowing the concrete type.
///
/// # Examples
///
/// ```rust
/// use serde::{Serialize, Deserialize};
/// use engine_ecs::Component;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: Debug + Send + Sync + 'static + Serialize + for<'de> Deserialize<'de> {
    /// A human-readable name for this component kind.
    fn type_name() -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[test]
    fn test_component_type_id_matches_from_name() {
        assert_eq!(ComponentTypeId::of::<Health>(), ComponentTypeId::from_name("Health"));
        assert_ne!(
            ComponentTypeId::from_name("Health"),
            ComponentTypeId::from_name("Velocity")
        );
    }

    #[test]
    fn test_fnv1a_known_vectors() {
        // The empty string hashes to the offset basis itself.
        assert_eq!(ComponentTypeId::from_name(""), ComponentTypeId(0x811c_9dc5));
        assert_eq!(ComponentTypeId::from_name("a"), ComponentTypeId(0xe40c_292c));
        assert_eq!(ComponentTypeId::from_name("foobar"), ComponentTypeId(0xbf9c_f968));
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(ComponentTypeId(0xab).to_string(), "0x000000ab");
    }
}
