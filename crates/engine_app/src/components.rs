//! Components used by the simulation driver.
//!
//! Each one is registered under a stable name in [`register_all`] before any
//! [`Registry`](engine_ecs::Registry) exists, so worlds can be saved and
//! reloaded by hash.

use engine_ecs::{Component, ComponentTypeId, TypeRegistry};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// World-space position.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    /// Position in world units.
    pub position: Vec3,
}

impl Transform {
    /// A transform at `position`.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self { position }
    }
}

impl Component for Transform {
    fn type_name() -> &'static str {
        "Transform"
    }
}

/// A 3D velocity component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Velocity {
    /// Linear velocity in world units per second.
    pub linear: Vec3,
}

impl Velocity {
    /// Zero velocity.
    pub const ZERO: Self = Self { linear: Vec3::ZERO };

    /// Create a new velocity.
    #[must_use]
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            linear: Vec3::new(x, y, z),
        }
    }
}

impl Default for Velocity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Component for Velocity {
    fn type_name() -> &'static str {
        "Velocity"
    }
}

/// Hit points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Health {
    /// Current hit points.
    pub current: f32,
    /// Maximum hit points.
    pub max: f32,
}

impl Health {
    /// Full health.
    #[must_use]
    pub fn full(max: f32) -> Self {
        Self { current: max, max }
    }

    /// `true` while hit points remain.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Apply damage, clamping to zero.
    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }
}

impl Component for Health {
    fn type_name() -> &'static str {
        "Health"
    }
}

/// Reference to a renderable model asset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRef {
    /// Path or identifier of the model asset.
    pub asset_path: String,
}

impl ModelRef {
    /// Create a new model reference.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            asset_path: path.into(),
        }
    }
}

impl Component for ModelRef {
    fn type_name() -> &'static str {
        "ModelRef"
    }
}

/// Register every driver component under its stable name.
pub fn register_all(types: &mut TypeRegistry) -> Vec<ComponentTypeId> {
    vec![
        types.register_component::<Transform>(),
        types.register_component::<Velocity>(),
        types.register_component::<Health>(),
        types.register_component::<ModelRef>(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage_clamps() {
        let mut h = Health::full(10.0);
        assert!(h.is_alive());
        h.damage(4.0);
        assert_eq!(h.current, 6.0);
        h.damage(100.0);
        assert_eq!(h.current, 0.0);
        assert!(!h.is_alive());
    }

    #[test]
    fn test_register_all_is_invertible() {
        let mut types = TypeRegistry::new();
        let hashes = register_all(&mut types);
        assert_eq!(types.len(), 4);
        for hash in hashes {
            let type_id = types.type_index(hash).unwrap();
            assert_eq!(types.constant(type_id).unwrap(), hash);
        }
        assert_eq!(
            types.constant_of::<ModelRef>().unwrap(),
            ComponentTypeId::from_name("ModelRef")
        );
    }
}
