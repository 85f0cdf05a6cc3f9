//! Entity identifiers and the live/recycled registry.
//!
//! An [`EntityId`] is a plain index with no generation. The
//! [`EntityRegistry`] tracks every index that was ever handed out in one of
//! two bitsets: `live` or `recycled`. Recycled indices are reused, lowest
//! first, before any new index is minted, which keeps ids dense under churn.

use std::fmt;

use crate::bitset::EntitySet;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A lightweight entity identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(usize);

impl EntityId {
    /// Construct an `EntityId` from its index.
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The index of this entity in every entity bitset and sparse array.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for EntityId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityRegistry
// ---------------------------------------------------------------------------

/// Allocates and recycles [`EntityId`]s.
///
/// Every index below the highest one ever minted is either live or recycled.
/// `create` relies on this: with no recycled index available the live set is
/// exactly `0..count`, so `count` is the next unused index.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    live: EntitySet,
    recycled: EntitySet,
}

impl EntityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id: the lowest recycled index, or the next unused one.
    pub fn create(&mut self) -> EntityId {
        if let Some(index) = self.recycled.first() {
            self.recycled.remove(index);
            self.live.insert(index);
            return EntityId(index);
        }

        let index = self.live.count();
        self.live.insert(index);
        EntityId(index)
    }

    /// Mark a live id as recycled. Returns `false` (and does nothing) when
    /// the id is not live.
    pub fn destroy(&mut self, entity: EntityId) -> bool {
        if !self.live.remove(entity.0) {
            return false;
        }
        self.recycled.insert(entity.0);
        true
    }

    /// Whether `entity` is currently live.
    #[inline]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.live.contains(entity.0)
    }

    /// Whether `entity` was destroyed and is waiting to be reused.
    #[inline]
    pub fn is_recycled(&self, entity: EntityId) -> bool {
        self.recycled.contains(entity.0)
    }

    /// Number of live entities.
    pub fn alive_count(&self) -> usize {
        self.live.count()
    }

    /// The live-entity bitset.
    pub fn live(&self) -> &EntitySet {
        &self.live
    }

    /// The recycled-id bitset.
    pub fn recycled(&self) -> &EntitySet {
        &self.recycled
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
