//! Component pools.
//!
//! A [`ComponentPool<T>`] binds a [`SparseSet<T>`] to the entity registry of
//! the world that owns it, so that components can only be attached to live
//! entities. Pools are shared between the world and any number of filters
//! through [`Pool<T>`], a reference-counted handle.
//!
//! The world keeps pools of different component types side by side through
//! the type-erased [`AnyPool`] trait, which only exposes what entity
//! destruction and filter evaluation need. Typed operations (`add`, `get`)
//! live on [`Pool<T>`].

use std::any::type_name;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::bitset::EntitySet;
use crate::entity::{EntityId, EntityRegistry};
use crate::sparse::SparseSet;
use crate::EcsError;

// ---------------------------------------------------------------------------
// AnyPool -- type-erased capability surface
// ---------------------------------------------------------------------------

/// Operations available on a pool without knowing its component type.
pub trait AnyPool {
    /// Name of the stored component type, for diagnostics.
    fn component_name(&self) -> &'static str;
    /// Whether `entity` holds a component in this pool.
    fn has(&self, entity: EntityId) -> bool;
    /// Remove the component of `entity`, if any.
    fn remove(&mut self, entity: EntityId);
    /// Bitset of entities holding a component in this pool.
    fn entities(&self) -> &EntitySet;
    /// Number of components stored.
    fn len(&self) -> usize;
    /// Whether the pool stores no components.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A shared, type-erased pool as held by the world and by filters.
pub type SharedPool = Rc<RefCell<dyn AnyPool>>;

// ---------------------------------------------------------------------------
// ComponentPool
// ---------------------------------------------------------------------------

/// Storage for every `T` component in one world.
pub struct ComponentPool<T> {
    storage: SparseSet<T>,
    registry: Weak<RefCell<EntityRegistry>>,
}

impl<T: 'static> ComponentPool<T> {
    pub(crate) fn new(registry: Weak<RefCell<EntityRegistry>>) -> Self {
        Self {
            storage: SparseSet::new(),
            registry,
        }
    }

    /// Whether `entity` is live in the owning world. Always false once the
    /// world has been dropped.
    fn entity_is_valid(&self, entity: EntityId) -> bool {
        self.registry
            .upgrade()
            .map_or(false, |registry| registry.borrow().is_alive(entity))
    }

    /// Attach a component built by `make` to `entity`.
    ///
    /// `make` only runs once both checks pass.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotFound`] if `entity` is not live.
    /// - [`EcsError::DuplicateComponent`] if `entity` already has a `T`.
    pub fn add_with<F>(&mut self, entity: EntityId, make: F) -> Result<&mut T, EcsError>
    where
        F: FnOnce() -> T,
    {
        if !self.entity_is_valid(entity) {
            return Err(EcsError::EntityNotFound { entity });
        }
        if self.storage.contains(entity.index()) {
            return Err(EcsError::DuplicateComponent {
                component: type_name::<T>(),
                entity,
            });
        }
        Ok(self.storage.insert(entity.index(), make()))
    }

    /// Attach `value` to `entity`. See [`add_with`](Self::add_with).
    pub fn add(&mut self, entity: EntityId, value: T) -> Result<&mut T, EcsError> {
        self.add_with(entity, || value)
    }

    /// The component of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` has no `T`. Check with [`has`](Self::has) or go
    /// through a filter first, or use [`try_get`](Self::try_get).
    pub fn get(&self, entity: EntityId) -> &T {
        match self.storage.get(entity.index()) {
            Some(value) => value,
            None => missing_component::<T>(entity),
        }
    }

    /// Mutable access to the component of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` has no `T`.
    pub fn get_mut(&mut self, entity: EntityId) -> &mut T {
        match self.storage.get_mut(entity.index()) {
            Some(value) => value,
            None => missing_component::<T>(entity),
        }
    }

    /// The component of `entity`, if present.
    pub fn try_get(&self, entity: EntityId) -> Option<&T> {
        self.storage.get(entity.index())
    }

    /// Mutable access to the component of `entity`, if present.
    pub fn try_get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.storage.get_mut(entity.index())
    }

    /// Detach and return the component of `entity`. Idempotent.
    pub fn take(&mut self, entity: EntityId) -> Option<T> {
        self.storage.remove(entity.index())
    }

    /// The underlying storage.
    pub fn storage(&self) -> &SparseSet<T> {
        &self.storage
    }
}

impl<T: 'static> AnyPool for ComponentPool<T> {
    fn component_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn has(&self, entity: EntityId) -> bool {
        self.storage.contains(entity.index())
    }

    fn remove(&mut self, entity: EntityId) {
        self.storage.remove(entity.index());
    }

    fn entities(&self) -> &EntitySet {
        self.storage.entities()
    }

    fn len(&self) -> usize {
        self.storage.len()
    }
}

impl<T> fmt::Debug for ComponentPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentPool")
            .field("component", &type_name::<T>())
            .field("entities", self.storage.entities())
            .finish()
    }
}

#[cold]
#[track_caller]
fn missing_component<T>(entity: EntityId) -> ! {
    panic!(
        "component '{}' is not attached to entity {entity}",
        type_name::<T>()
    )
}

// ---------------------------------------------------------------------------
// Pool -- shared typed handle
// ---------------------------------------------------------------------------

/// Shared handle to the `T` pool of a world.
///
/// Cloning the handle is cheap and every clone refers to the same pool. The
/// accessors return `RefCell` guards; holding one across a mutation of the
/// same pool (for example destroying an entity while a component ref is
/// alive) panics instead of invalidating the reference.
pub struct Pool<T> {
    inner: Rc<RefCell<ComponentPool<T>>>,
}

impl<T: 'static> Pool<T> {
    pub(crate) fn from_inner(inner: Rc<RefCell<ComponentPool<T>>>) -> Self {
        Self { inner }
    }

    /// Attach `value` to `entity`.
    ///
    /// # Errors
    ///
    /// See [`ComponentPool::add_with`].
    pub fn add(&self, entity: EntityId, value: T) -> Result<RefMut<'_, T>, EcsError> {
        self.add_with(entity, || value)
    }

    /// Attach a component built by `make` to `entity`.
    ///
    /// # Errors
    ///
    /// See [`ComponentPool::add_with`].
    pub fn add_with<F>(&self, entity: EntityId, make: F) -> Result<RefMut<'_, T>, EcsError>
    where
        F: FnOnce() -> T,
    {
        let mut pool = self.inner.borrow_mut();
        pool.add_with(entity, make)?;
        Ok(RefMut::map(pool, |pool| pool.get_mut(entity)))
    }

    /// Attach `T::default()` to `entity`.
    ///
    /// # Errors
    ///
    /// See [`ComponentPool::add_with`].
    pub fn add_default(&self, entity: EntityId) -> Result<RefMut<'_, T>, EcsError>
    where
        T: Default,
    {
        self.add_with(entity, T::default)
    }

    /// The component of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` has no `T`, or if the pool is mutably borrowed.
    #[track_caller]
    pub fn get(&self, entity: EntityId) -> Ref<'_, T> {
        Ref::map(self.inner.borrow(), |pool| pool.get(entity))
    }

    /// Mutable access to the component of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` has no `T`, or if the pool is already borrowed.
    #[track_caller]
    pub fn get_mut(&self, entity: EntityId) -> RefMut<'_, T> {
        RefMut::map(self.inner.borrow_mut(), |pool| pool.get_mut(entity))
    }

    /// The component of `entity`, if present.
    pub fn try_get(&self, entity: EntityId) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.inner.borrow(), |pool| pool.try_get(entity)).ok()
    }

    /// Mutable access to the component of `entity`, if present.
    pub fn try_get_mut(&self, entity: EntityId) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.inner.borrow_mut(), |pool| pool.try_get_mut(entity)).ok()
    }

    /// Whether `entity` has a `T`.
    pub fn has(&self, entity: EntityId) -> bool {
        self.inner.borrow().has(entity)
    }

    /// Detach the component of `entity`. Idempotent.
    pub fn remove(&self, entity: EntityId) {
        self.inner.borrow_mut().remove(entity);
    }

    /// Detach and return the component of `entity`.
    pub fn take(&self, entity: EntityId) -> Option<T> {
        self.inner.borrow_mut().take(entity)
    }

    /// Bitset of entities that have a `T`.
    pub fn entities(&self) -> Ref<'_, EntitySet> {
        Ref::map(self.inner.borrow(), |pool| pool.storage.entities())
    }

    /// Number of `T` components.
    pub fn len(&self) -> usize {
        self.inner.borrow().storage.len()
    }

    /// Whether no entity has a `T`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the whole pool, e.g. to walk its storage densely.
    pub fn borrow(&self) -> Ref<'_, ComponentPool<T>> {
        self.inner.borrow()
    }

    /// The same pool behind the type-erased interface.
    pub fn shared(&self) -> SharedPool {
        self.inner.clone()
    }

    /// Whether two handles refer to the same pool.
    pub fn ptr_eq(&self, other: &Pool<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Pool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(pool) => pool.fmt(f),
            Err(_) => f.write_str("Pool(<borrowed>)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
