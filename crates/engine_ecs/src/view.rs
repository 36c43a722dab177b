//! Multi-component join views.
//!
//! [`Registry::view`](crate::Registry::view) walks the entities of the
//! smallest requested store and yields every entity that also has all the
//! other requested kinds, together with a mutable reference to each
//! component:
//!
//! ```rust
//! # use engine_ecs::{Component, Registry};
//! # #[derive(Debug, serde::Serialize, serde::Deserialize)]
//! # struct Position(f32);
//! # impl Component for Position { fn type_name() -> &'static str { "Position" } }
//! # #[derive(Debug, serde::Serialize, serde::Deserialize)]
//! # struct Velocity(f32);
//! # impl Component for Velocity { fn type_name() -> &'static str { "Velocity" } }
//! let mut registry = Registry::new();
//! let e = registry.create();
//! registry.add_component(e, Position(0.0)).unwrap();
//! registry.add_component(e, Velocity(2.0)).unwrap();
//!
//! for (_entity, (pos, vel)) in registry.view::<(Position, Velocity)>() {
//!     pos.0 += vel.0;
//! }
//! assert_eq!(registry.get_component::<Position>(e).unwrap().0, 2.0);
//! ```
//!
//! A view is single-pass and borrows the registry mutably, so no component
//! can be added or removed while it is alive. Iteration order follows the
//! driving store's dense order, which changes whenever that store removes
//! something.

use std::any::TypeId;
use std::collections::HashMap;

use crate::component::Component;
use crate::entity::Entity;
use crate::storage::{ComponentStore, ErasedStore, StoreFetch};

pub(crate) type StoreMap = HashMap<TypeId, Box<dyn ErasedStore>>;

/// A tuple of component kinds that can be joined by a [`View`].
///
/// Implemented for tuples of 1 to 8 [`Component`] types. The methods are
/// plumbing for [`View`] and not meant to be called directly.
pub trait ViewQuery: 'static {
    /// What the view yields per matching entity.
    type Item<'a>;

    /// Per-store raw access held for the view's lifetime.
    #[doc(hidden)]
    type Fetch<'a>;

    /// Borrows every requested store, or `None` if one was never created.
    ///
    /// # Panics
    ///
    /// Panics if the same existing store is requested twice.
    #[doc(hidden)]
    fn fetch(stores: &mut StoreMap) -> Option<Self::Fetch<'_>>;

    /// The smallest requested store's dense entity sequence.
    #[doc(hidden)]
    fn driving<'a>(fetch: &Self::Fetch<'a>) -> &'a [Entity];

    /// Returns `true` if `entity` is present in every requested store.
    #[doc(hidden)]
    fn matches(fetch: &Self::Fetch<'_>, entity: Entity) -> bool;

    /// Fetches `entity`'s components from every requested store.
    ///
    /// # Safety
    ///
    /// Each entity may be fetched at most once per fetch lifetime.
    #[doc(hidden)]
    unsafe fn get<'a>(fetch: &Self::Fetch<'a>, entity: Entity) -> Option<Self::Item<'a>>;
}

/// Single-pass iterator over the entities holding every kind in `Q`.
///
/// Yields `(entity, (&mut K1, .., &mut Kn))`.
pub struct View<'a, Q: ViewQuery> {
    fetch: Option<Q::Fetch<'a>>,
    driving: std::slice::Iter<'a, Entity>,
}

impl<'a, Q: ViewQuery> View<'a, Q> {
    pub(crate) fn new(stores: &'a mut StoreMap) -> Self {
        let fetch = Q::fetch(stores);
        let driving = fetch.as_ref().map(Q::driving).unwrap_or(&[]).iter();
        Self { fetch, driving }
    }

    /// Number of entities left in the driving sequence. An upper bound on
    /// the remaining yields.
    #[must_use]
    pub fn candidates(&self) -> usize {
        self.driving.len()
    }
}

impl<'a, Q: ViewQuery> Iterator for View<'a, Q> {
    type Item = (Entity, Q::Item<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let fetch = self.fetch.as_ref()?;
        for &entity in self.driving.by_ref() {
            if !Q::matches(fetch, entity) {
                continue;
            }
            // SAFETY: the driving sequence is a store's dense entity list, so
            // each entity appears in it once and is fetched once.
            if let Some(item) = unsafe { Q::get(fetch, entity) } {
                return Some((entity, item));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.driving.len()))
    }
}

macro_rules! impl_view_query {
    ($($name:ident $var:ident),+) => {
        impl<$($name: Component),+> ViewQuery for ($($name,)+) {
            type Item<'a> = ($(&'a mut $name,)+);
            type Fetch<'a> = ($(StoreFetch<'a, $name>,)+);

            fn fetch(stores: &mut StoreMap) -> Option<Self::Fetch<'_>> {
                let [$($var),+] = stores.get_disjoint_mut([$(&TypeId::of::<$name>()),+]);
                Some(($(
                    $var?
                        .as_any_mut()
                        .downcast_mut::<ComponentStore<$name>>()?
                        .fetch(),
                )+))
            }

            fn driving<'a>(fetch: &Self::Fetch<'a>) -> &'a [Entity] {
                let ($($var,)+) = fetch;
                [$($var.dense),+]
                    .into_iter()
                    .min_by_key(|dense| dense.len())
                    .unwrap_or(&[])
            }

            fn matches(fetch: &Self::Fetch<'_>, entity: Entity) -> bool {
                let ($($var,)+) = fetch;
                true $(&& $var.contains(entity))+
            }

            unsafe fn get<'a>(fetch: &Self::Fetch<'a>, entity: Entity) -> Option<Self::Item<'a>> {
                let ($($var,)+) = fetch;
                // SAFETY: forwarded from the caller; the stores are distinct
                // because `get_disjoint_mut` refused duplicates.
                Some(($(unsafe { $var.get(entity)? },)+))
            }
        }
    };
}

impl_view_query!(A a);
impl_view_query!(A a, B b);
impl_view_query!(A a, B b, C c);
impl_view_query!(A a, B b, C c, D d);
impl_view_query!(A a, B b, C c, D d, E e);
impl_view_query!(A a, B b, C c, D d, E e, F f);
impl_view_query!(A a, B b, C c, D d, E e, F f, G g);
impl_view_query!(A a, B b, C c, D d, E e, F f, G g, H h);

#[cfg(test)]
mod tests {
    use crate::{Component, Entity, Registry};

    #[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Pos(i32);
    impl Component for Pos {
        fn type_name() -> &'static str {
            "Pos"
        }
    }

    #[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Vel(i32);
    impl Component for Vel {
        fn type_name() -> &'static str {
            "Vel"
        }
    }

    #[derive(Debug, Default, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Tag;
    impl Component for Tag {
        fn type_name() -> &'static str {
            "Tag"
        }
    }

    /// Ten entities: all have `Pos`, even ones have `Vel`, multiples of
    /// three have `Tag`.
    fn populated() -> (Registry, Vec<Entity>) {
        let mut registry = Registry::new();
        let mut entities = Vec::new();
        for i in 0..10 {
            let e = registry.create();
            registry.add_component(e, Pos(i)).unwrap();
            if i % 2 == 0 {
                registry.add_component(e, Vel(1)).unwrap();
            }
            if i % 3 == 0 {
                registry.add_component(e, Tag).unwrap();
            }
            entities.push(e);
        }
        (registry, entities)
    }

    #[test]
    fn test_view_count_matches_intersection() {
        let (mut registry, entities) = populated();
        let expected = entities
            .iter()
            .filter(|&&e| {
                registry.has_component::<Pos>(e)
                    && registry.has_component::<Vel>(e)
                    && registry.has_component::<Tag>(e)
            })
            .count();
        assert_eq!(expected, 2); // 0 and 6
        assert_eq!(registry.view::<(Pos, Vel, Tag)>().count(), expected);
        assert_eq!(registry.view::<(Pos,)>().count(), 10);
        assert_eq!(registry.view::<(Pos, Vel)>().count(), 5);
        assert_eq!(registry.view::<(Vel, Tag)>().count(), 2);
    }

    #[test]
    fn test_view_drives_from_smallest_store() {
        let (mut registry, _) = populated();
        // Tag has 4 entities (0, 3, 6, 9) against 10 for Pos.
        assert_eq!(registry.view::<(Pos, Tag)>().candidates(), 4);
        assert_eq!(registry.view::<(Tag, Pos)>().candidates(), 4);
    }

    #[test]
    fn test_view_mutation_is_visible() {
        let (mut registry, entities) = populated();
        for (_, (pos, vel)) in registry.view::<(Pos, Vel)>() {
            pos.0 += vel.0 * 100;
        }
        assert_eq!(registry.get_component::<Pos>(entities[4]).unwrap(), &Pos(104));
        assert_eq!(registry.get_component::<Pos>(entities[5]).unwrap(), &Pos(5));
    }

    #[test]
    fn test_view_yields_matching_entities() {
        let (mut registry, entities) = populated();
        let mut seen: Vec<Entity> = registry.view::<(Tag, Vel)>().map(|(e, _)| e).collect();
        seen.sort();
        assert_eq!(seen, vec![entities[0], entities[6]]);
    }

    #[test]
    fn test_view_of_unused_kind_is_empty() {
        let (mut registry, _) = populated();

        #[derive(Debug, serde::Serialize, serde::Deserialize)]
        struct Unused;
        impl Component for Unused {
            fn type_name() -> &'static str {
                "Unused"
            }
        }

        assert_eq!(registry.view::<(Pos, Unused)>().count(), 0);
        assert_eq!(registry.view::<(Unused,)>().candidates(), 0);
    }

    #[test]
    fn test_view_over_emptied_store() {
        let (mut registry, entities) = populated();
        for &e in &entities {
            if registry.has_component::<Vel>(e) {
                registry.remove_component::<Vel>(e).unwrap();
            }
        }
        assert_eq!(registry.view::<(Pos, Vel)>().count(), 0);
    }

    #[test]
    #[should_panic]
    fn test_duplicate_kind_panics() {
        let (mut registry, _) = populated();
        let _ = registry.view::<(Pos, Pos)>().count();
    }
}
