//! Sparse set storage for one component type.
//!
//! A [`SparseSet`] maps entity indices to densely packed values:
//!
//! - `present`: bitset of indices that currently hold a value,
//! - `sparse`: index -> dense slot (meaningful only where `present` is set),
//! - `dense`: dense slot -> index,
//! - `data`: dense slot -> value.
//!
//! For every present index `i`, `dense[sparse[i]] == i`. The dense arrays have
//! no holes: removal swaps the last slot into the vacated one, so any removal
//! may move one other value. References into the storage are therefore only
//! valid until the next insert or remove.

use crate::bitset::EntitySet;

/// Number of entity slots reserved by [`SparseSet::new`].
pub const DEFAULT_CAPACITY: usize = 512;

// ---------------------------------------------------------------------------
// SparseSet
// ---------------------------------------------------------------------------

/// Dense storage of `T` values keyed by sparse entity indices.
#[derive(Debug, Clone)]
pub struct SparseSet<T> {
    present: EntitySet,
    sparse: Vec<usize>,
    dense: Vec<usize>,
    data: Vec<T>,
}

impl<T> SparseSet<T> {
    /// Create a storage with [`DEFAULT_CAPACITY`] slots reserved.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a storage with `capacity` slots reserved.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut set = Self {
            present: EntitySet::new(),
            sparse: Vec::new(),
            dense: Vec::new(),
            data: Vec::new(),
        };
        set.reserve(capacity);
        set
    }

    /// Reserve room for `additional` more entries in every array.
    pub fn reserve(&mut self, additional: usize) {
        self.present.reserve(additional);
        self.sparse.reserve(additional);
        self.dense.reserve(additional);
        self.data.reserve(additional);
    }

    /// Insert `value` for `index`, overwriting any existing value in place.
    pub fn insert(&mut self, index: usize, value: T) -> &mut T {
        if self.present.contains(index) {
            let slot = self.sparse[index];
            self.data[slot] = value;
            return &mut self.data[slot];
        }

        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, 0);
        }
        let slot = self.dense.len();
        self.sparse[index] = slot;
        self.dense.push(index);
        self.data.push(value);
        self.present.insert(index);
        &mut self.data[slot]
    }

    /// Whether `index` holds a value.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.present.contains(index)
    }

    /// The value for `index`, if present.
    pub fn get(&self, index: usize) -> Option<&T> {
        if !self.present.contains(index) {
            return None;
        }
        Some(&self.data[self.sparse[index]])
    }

    /// Mutable access to the value for `index`, if present.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if !self.present.contains(index) {
            return None;
        }
        let slot = self.sparse[index];
        Some(&mut self.data[slot])
    }

    /// Remove and return the value for `index`. Absent indices are a no-op.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        // The presence check must come first: swap-removing an absent index
        // would read a stale sparse slot and evict some other entity.
        if !self.present.remove(index) {
            return None;
        }

        let slot = self.sparse[index];
        self.dense.swap_remove(slot);
        let value = self.data.swap_remove(slot);
        if let Some(&moved) = self.dense.get(slot) {
            self.sparse[moved] = slot;
        }
        Some(value)
    }

    /// Number of stored values. Always equal to `entities().count()`.
    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Whether no values are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// The presence bitset.
    pub fn entities(&self) -> &EntitySet {
        &self.present
    }

    /// Entity indices in dense order.
    pub fn ids(&self) -> &[usize] {
        &self.dense
    }

    /// Iterate `(index, &value)` in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.dense.iter().copied().zip(self.data.iter())
    }

    /// Iterate `(index, &mut value)` in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.dense.iter().copied().zip(self.data.iter_mut())
    }

    /// Remove every value. Capacity is kept.
    pub fn clear(&mut self) {
        self.present.clear();
        self.sparse.clear();
        self.dense.clear();
        self.data.clear();
    }
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
