//! Filters: entity queries by component composition.
//!
//! A filter is built from a set of *include* component types and an optional
//! set of *exclude* component types, each given as a tuple (`(A,)`,
//! `(A, B)`, ... up to four types, or `()`). The builder returned by
//! [`World::filter`] produces one of two filters with different semantics:
//!
//! - [`Filter`] (`build`): starts from the live entities of the world and
//!   intersects every include pool, then removes every exclude pool.
//!   [`Filter::update`] recomputes the result after pools change.
//! - [`UnionFilter`] (`build_union`): starts from the empty set, unions every
//!   include pool, removes every exclude pool and trims the result. It is
//!   computed once. Because an entity only needs one of the include types,
//!   its iterators yield `Option` references.
//!
//! Iteration starts at the lowest matching entity and steps with
//! [`EntitySet::next_after`] until it runs out of bits. Components are
//! fetched from their pools at every step; nothing is cached.
//!
//! ## Mutation during iteration
//!
//! Do not add, remove or destroy anything in the world while iterating a
//! filter. A component reference yielded by the iterator keeps its pool
//! borrowed, so a conflicting mutation panics; a mutation made between two
//! steps leaves the filter's bitset stale and the next fetch panics on the
//! missing component.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Weak;

use crate::bitset::EntitySet;
use crate::entity::{EntityId, EntityRegistry};
use crate::pool::{Pool, SharedPool};
use crate::world::World;

// ---------------------------------------------------------------------------
// ComponentSet -- a tuple of component types
// ---------------------------------------------------------------------------

/// A tuple of component types used as the include or exclude list of a
/// filter.
pub trait ComponentSet: 'static {
    /// One typed pool handle per component type.
    type Pools: Clone;

    /// Fetch (binding if needed) the pool of every component type.
    fn pools(world: &mut World) -> Self::Pools;

    /// The pools behind the type-erased interface, in tuple order.
    fn erase(pools: &Self::Pools) -> Vec<SharedPool>;
}

fn apply_excludes(entities: &mut EntitySet, exclude: &[SharedPool]) {
    for pool in exclude {
        entities.subtract(pool.borrow().entities());
    }
}

// ---------------------------------------------------------------------------
// FilterBuilder
// ---------------------------------------------------------------------------

/// Builder returned by [`World::filter`].
pub struct FilterBuilder<'w, I: ComponentSet> {
    world: &'w mut World,
    exclude: Vec<SharedPool>,
    _include: PhantomData<I>,
}

impl<'w, I: ComponentSet> FilterBuilder<'w, I> {
    pub(crate) fn new(world: &'w mut World) -> Self {
        Self {
            world,
            exclude: Vec::new(),
            _include: PhantomData,
        }
    }

    /// Exclude entities carrying any component in `E`. Replaces the exclude
    /// set of an earlier call.
    pub fn exclude<E: ComponentSet>(mut self) -> Self {
        let pools = E::pools(self.world);
        self.exclude = E::erase(&pools);
        self
    }

    /// Build an intersection filter over the live entities.
    pub fn build(self) -> Filter<I> {
        let pools = I::pools(self.world);
        let mut filter = Filter {
            universe: self.world.registry_handle(),
            include: I::erase(&pools),
            pools,
            exclude: self.exclude,
            entities: EntitySet::new(),
        };
        filter.update();
        filter
    }

    /// Build a union filter, computed once from the empty set.
    pub fn build_union(self) -> UnionFilter<I> {
        let pools = I::pools(self.world);
        let include = I::erase(&pools);

        let mut entities = EntitySet::new();
        for pool in &include {
            entities.union_with(pool.borrow().entities());
        }
        apply_excludes(&mut entities, &self.exclude);
        entities.trim();
        tracing::trace!(matched = entities.count(), "built union filter");

        UnionFilter {
            pools,
            entities,
            _include: include,
            _exclude: self.exclude,
        }
    }
}

// ---------------------------------------------------------------------------
// Filter -- intersection over live entities
// ---------------------------------------------------------------------------

/// Entities that are live, carry every component in `I`, and carry none of
/// the excluded components.
///
/// With `I = ()` the filter matches every live entity not excluded.
pub struct Filter<I: ComponentSet> {
    universe: Weak<RefCell<EntityRegistry>>,
    pools: I::Pools,
    include: Vec<SharedPool>,
    exclude: Vec<SharedPool>,
    entities: EntitySet,
}

impl<I: ComponentSet> Filter<I> {
    /// Recompute the matching entities from the current pool contents.
    ///
    /// A filter whose world has been dropped matches nothing.
    pub fn update(&mut self) {
        let mut entities = match self.universe.upgrade() {
            Some(registry) => registry.borrow().live().clone(),
            None => EntitySet::new(),
        };
        for pool in &self.include {
            entities.intersect_with(pool.borrow().entities());
        }
        apply_excludes(&mut entities, &self.exclude);
        tracing::trace!(matched = entities.count(), "updated filter");
        self.entities = entities;
    }

    /// The matching entities as of the last update.
    pub fn entities(&self) -> &EntitySet {
        &self.entities
    }

    /// Number of matching entities.
    pub fn len(&self) -> usize {
        self.entities.count()
    }

    /// Whether nothing matches.
    pub fn is_empty(&self) -> bool {
        self.entities.is_clear()
    }

    /// Whether `entity` matched at the last update.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(entity.index())
    }

    /// The typed pools of the include set.
    pub fn pools(&self) -> &I::Pools {
        &self.pools
    }

    /// Matching entity ids in ascending order.
    pub fn ids(&self) -> Ids<'_> {
        Ids::new(&self.entities)
    }

    /// Iterate `(entity, (&A, &B, ...))` over matching entities.
    pub fn iter(&self) -> Iter<'_, I> {
        Iter {
            pools: &self.pools,
            ids: self.ids(),
        }
    }

    /// Iterate `(entity, (&mut A, &mut B, ...))` over matching entities.
    ///
    /// Each yielded reference borrows its pool mutably; drop it before the
    /// next step if another reference to the same component type is needed.
    ///
    /// # Panics
    ///
    /// Panics on the second step if an earlier item is still alive, so
    /// `iter_mut().collect::<Vec<_>>()` panics once two entities match. Also
    /// panics on the first step when `I` names the same component type twice,
    /// such as `(A, A)`; use [`iter`](Self::iter) for that.
    pub fn iter_mut(&self) -> IterMut<'_, I> {
        IterMut {
            pools: &self.pools,
            ids: self.ids(),
        }
    }
}

impl<I: ComponentSet> fmt::Debug for Filter<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// UnionFilter -- union over include pools, built once
// ---------------------------------------------------------------------------

/// Entities carrying at least one component in `I` and none of the excluded
/// components, computed once at build time.
///
/// With `I = ()` the filter matches nothing.
pub struct UnionFilter<I: ComponentSet> {
    pools: I::Pools,
    entities: EntitySet,
    // Held so the pools share the filter's lifetime, as `Filter` does.
    _include: Vec<SharedPool>,
    _exclude: Vec<SharedPool>,
}

impl<I: ComponentSet> UnionFilter<I> {
    /// The matching entities.
    pub fn entities(&self) -> &EntitySet {
        &self.entities
    }

    /// Number of matching entities.
    pub fn len(&self) -> usize {
        self.entities.count()
    }

    /// Whether nothing matches.
    pub fn is_empty(&self) -> bool {
        self.entities.is_clear()
    }

    /// Whether `entity` matched.
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(entity.index())
    }

    /// Matching entity ids in ascending order.
    pub fn ids(&self) -> Ids<'_> {
        Ids::new(&self.entities)
    }

    /// Iterate `(entity, (Option<&A>, Option<&B>, ...))`.
    pub fn iter(&self) -> UnionIter<'_, I> {
        UnionIter {
            pools: &self.pools,
            ids: self.ids(),
        }
    }

    /// Iterate `(entity, (Option<&mut A>, Option<&mut B>, ...))`.
    ///
    /// # Panics
    ///
    /// Same rules as [`Filter::iter_mut`]: holding an item across a step, or
    /// naming one component type twice in `I`, panics on the conflicting
    /// borrow.
    pub fn iter_mut(&self) -> UnionIterMut<'_, I> {
        UnionIterMut {
            pools: &self.pools,
            ids: self.ids(),
        }
    }
}

impl<I: ComponentSet> fmt::Debug for UnionFilter<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionFilter")
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Iterators
// ---------------------------------------------------------------------------

/// Forward, single-pass walk over the members of an entity bitset.
#[derive(Debug, Clone)]
pub struct Ids<'f> {
    entities: &'f EntitySet,
    cursor: Option<usize>,
}

impl<'f> Ids<'f> {
    fn new(entities: &'f EntitySet) -> Self {
        Self {
            entities,
            cursor: entities.first(),
        }
    }
}

impl Iterator for Ids<'_> {
    type Item = EntityId;

    fn next(&mut self) -> Option<EntityId> {
        let current = self.cursor?;
        self.cursor = self.entities.next_after(current);
        Some(EntityId::new(current))
    }
}

/// Iterator returned by [`Filter::iter`].
pub struct Iter<'f, I: ComponentSet> {
    pools: &'f I::Pools,
    ids: Ids<'f>,
}

/// Iterator returned by [`Filter::iter_mut`].
pub struct IterMut<'f, I: ComponentSet> {
    pools: &'f I::Pools,
    ids: Ids<'f>,
}

/// Iterator returned by [`UnionFilter::iter`].
pub struct UnionIter<'f, I: ComponentSet> {
    pools: &'f I::Pools,
    ids: Ids<'f>,
}

/// Iterator returned by [`UnionFilter::iter_mut`].
pub struct UnionIterMut<'f, I: ComponentSet> {
    pools: &'f I::Pools,
    ids: Ids<'f>,
}

// -- tuple impls for arity 0..=4 --------------------------------------------

macro_rules! impl_component_set {
    ($($comp:ident : $idx:tt),*) => {
        impl<$($comp: 'static),*> ComponentSet for ($($comp,)*) {
            type Pools = ($(Pool<$comp>,)*);

            #[allow(unused_variables)]
            fn pools(world: &mut World) -> Self::Pools {
                ($(world.pool::<$comp>(),)*)
            }

            #[allow(unused_variables)]
            fn erase(pools: &Self::Pools) -> Vec<SharedPool> {
                vec![$(pools.$idx.shared()),*]
            }
        }

        impl<'f, $($comp: 'static),*> Iterator for Iter<'f, ($($comp,)*)> {
            type Item = (EntityId, ($(Ref<'f, $comp>,)*));

            #[allow(unused_variables)]
            fn next(&mut self) -> Option<Self::Item> {
                let entity = self.ids.next()?;
                let pools = self.pools;
                Some((entity, ($(pools.$idx.get(entity),)*)))
            }
        }

        impl<'f, $($comp: 'static),*> Iterator for IterMut<'f, ($($comp,)*)> {
            type Item = (EntityId, ($(RefMut<'f, $comp>,)*));

            #[allow(unused_variables)]
            fn next(&mut self) -> Option<Self::Item> {
                let entity = self.ids.next()?;
                let pools = self.pools;
                Some((entity, ($(pools.$idx.get_mut(entity),)*)))
            }
        }

        impl<'f, $($comp: 'static),*> Iterator for UnionIter<'f, ($($comp,)*)> {
            type Item = (EntityId, ($(Option<Ref<'f, $comp>>,)*));

            #[allow(unused_variables)]
            fn next(&mut self) -> Option<Self::Item> {
                let entity = self.ids.next()?;
                let pools = self.pools;
                Some((entity, ($(pools.$idx.try_get(entity),)*)))
            }
        }

        impl<'f, $($comp: 'static),*> Iterator for UnionIterMut<'f, ($($comp,)*)> {
            type Item = (EntityId, ($(Option<RefMut<'f, $comp>>,)*));

            #[allow(unused_variables)]
            fn next(&mut self) -> Option<Self::Item> {
                let entity = self.ids.next()?;
                let pools = self.pools;
                Some((entity, ($(pools.$idx.try_get_mut(entity),)*)))
            }
        }
    };
}

impl_component_set!();
impl_component_set!(A: 0);
impl_component_set!(A: 0, B: 1);
impl_component_set!(A: 0, B: 1, C: 2);
impl_component_set!(A: 0, B: 1, C: 2, D: 3);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
