//! The [`World`] is the top-level container for the ECS. It owns the entity
//! registry and one component pool per component type, and keeps the pools
//! consistent when entities are destroyed.

use std::any::{type_name, Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bitset::EntitySet;
use crate::entity::{EntityId, EntityRegistry};
use crate::filter::{ComponentSet, FilterBuilder};
use crate::pool::{AnyPool, ComponentPool, Pool, SharedPool};
use crate::EcsError;

// ---------------------------------------------------------------------------
// PoolSlot -- one bound pool, viewed both erased and typed
// ---------------------------------------------------------------------------

/// A pool as stored in the world: the erased view used for destruction
/// routing, and the same allocation as `dyn Any` for typed lookups.
struct PoolSlot {
    component: &'static str,
    shared: SharedPool,
    typed: Rc<dyn Any>,
}

impl PoolSlot {
    fn new<T: 'static>(pool: ComponentPool<T>) -> Self {
        let inner = Rc::new(RefCell::new(pool));
        let shared: SharedPool = inner.clone();
        Self {
            component: type_name::<T>(),
            shared,
            typed: inner,
        }
    }

    fn typed<T: 'static>(&self) -> Pool<T> {
        match Rc::clone(&self.typed).downcast::<RefCell<ComponentPool<T>>>() {
            Ok(inner) => Pool::from_inner(inner),
            Err(_) => unreachable!(
                "pool slot for '{}' holds another component type",
                type_name::<T>()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The ECS world: entities plus every component pool bound to them.
///
/// # Example
///
/// ```
/// use tessera_ecs::prelude::*;
///
/// struct Position(f32, f32);
///
/// let mut world = World::new();
/// let e = world.create_entity();
/// world.pool::<Position>().add(e, Position(1.0, 2.0)).unwrap();
///
/// world.destroy_entity(e);
/// assert!(!world.has_component::<Position>(e));
/// ```
pub struct World {
    registry: Rc<RefCell<EntityRegistry>>,
    pools: HashMap<TypeId, PoolSlot>,
}

impl World {
    /// Create an empty world.
    pub fn new() -> Self {
        Self {
            registry: Rc::new(RefCell::new(EntityRegistry::new())),
            pools: HashMap::new(),
        }
    }

    // -- entities -----------------------------------------------------------

    /// Create an entity, reusing the lowest recycled id if there is one.
    pub fn create_entity(&mut self) -> EntityId {
        let entity = self.registry.borrow_mut().create();
        tracing::trace!(%entity, "created entity");
        entity
    }

    /// Whether `entity` is live.
    pub fn has_entity(&self, entity: EntityId) -> bool {
        self.registry.borrow().is_alive(entity)
    }

    /// Destroy `entity` and remove its components from every pool.
    ///
    /// Returns `false` and does nothing if `entity` is not live.
    ///
    /// # Panics
    ///
    /// Panics if a component reference into any pool is still held, which
    /// happens when destroying entities while iterating a filter. The world
    /// is left untouched in that case: the entity stays live and keeps all of
    /// its components.
    pub fn destroy_entity(&mut self, entity: EntityId) -> bool {
        if !self.has_entity(entity) {
            return false;
        }

        // Every pool must be free before anything changes.
        let mut pools: Vec<RefMut<'_, dyn AnyPool>> = Vec::with_capacity(self.pools.len());
        for slot in self.pools.values() {
            match slot.shared.try_borrow_mut() {
                Ok(pool) => pools.push(pool),
                Err(_) => panic!(
                    "cannot destroy entity {entity}: component '{}' is still borrowed",
                    slot.component
                ),
            }
        }
        for pool in &mut pools {
            pool.remove(entity);
        }
        drop(pools);

        // Recycle last, so the id never comes back with components attached.
        self.registry.borrow_mut().destroy(entity);
        tracing::trace!(%entity, "destroyed entity");
        true
    }

    /// The live-entity bitset.
    pub fn entities(&self) -> Ref<'_, EntitySet> {
        Ref::map(self.registry.borrow(), EntityRegistry::live)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.registry.borrow().alive_count()
    }

    // -- pools --------------------------------------------------------------

    /// The pool for component type `T`, created and bound on first request.
    ///
    /// Every call for the same `T` returns a handle to the same pool.
    pub fn pool<T: 'static>(&mut self) -> Pool<T> {
        let registry = Rc::downgrade(&self.registry);
        self.pools
            .entry(TypeId::of::<T>())
            .or_insert_with(|| {
                tracing::debug!(component = type_name::<T>(), "binding component pool");
                PoolSlot::new(ComponentPool::<T>::new(registry))
            })
            .typed::<T>()
    }

    /// Number of bound pools.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Attach `value` to `entity` through the `T` pool.
    ///
    /// # Errors
    ///
    /// [`EcsError::EntityNotFound`] or [`EcsError::DuplicateComponent`].
    pub fn add_component<T: 'static>(&mut self, entity: EntityId, value: T) -> Result<(), EcsError> {
        self.pool::<T>().add(entity, value).map(drop)
    }

    /// Whether `entity` has a `T`. Does not bind a pool.
    pub fn has_component<T: 'static>(&self, entity: EntityId) -> bool {
        self.pools
            .get(&TypeId::of::<T>())
            .map_or(false, |slot| slot.shared.borrow().has(entity))
    }

    /// Detach and return the `T` of `entity`, if any. Does not bind a pool.
    pub fn remove_component<T: 'static>(&mut self, entity: EntityId) -> Option<T> {
        self.pools
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.typed::<T>().take(entity))
    }

    // -- filters ------------------------------------------------------------

    /// Start a filter over entities carrying every component in `I`.
    ///
    /// ```
    /// use tessera_ecs::prelude::*;
    ///
    /// struct Position(f32);
    /// struct Velocity(f32);
    /// struct Frozen;
    ///
    /// let mut world = World::new();
    /// let e = world.create_entity();
    /// world.add_component(e, Position(0.0)).unwrap();
    /// world.add_component(e, Velocity(2.0)).unwrap();
    ///
    /// let filter = world.filter::<(Position, Velocity)>().exclude::<(Frozen,)>().build();
    /// for (_entity, (mut pos, vel)) in filter.iter_mut() {
    ///     pos.0 += vel.0;
    /// }
    /// assert_eq!(world.pool::<Position>().get(e).0, 2.0);
    /// ```
    pub fn filter<I: ComponentSet>(&mut self) -> FilterBuilder<'_, I> {
        FilterBuilder::new(self)
    }

    pub(crate) fn registry_handle(&self) -> Weak<RefCell<EntityRegistry>> {
        Rc::downgrade(&self.registry)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut components: Vec<&'static str> = self
            .pools
            .values()
            .map(|slot| slot.shared.borrow().component_name())
            .collect();
        components.sort_unstable();
        f.debug_struct("World")
            .field("entities", &*self.registry.borrow().live())
            .field("components", &components)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
