//! Growable entity bitsets.
//!
//! An [`EntitySet`] records which entity ids are members of some set: the
//! live entities of a world, the entities carrying a component, or the result
//! of a filter. Sets grow on demand and may have different lengths; the
//! combining operations treat missing bits as zero.

use std::fmt;

use bitvec::vec::BitVec;

// ---------------------------------------------------------------------------
// EntitySet
// ---------------------------------------------------------------------------

/// A growable bitset keyed by entity index.
///
/// The length of the underlying bit vector is an implementation detail: two
/// sets with the same members compare equal only when their lengths match as
/// well, so compare member lists (`iter().collect()`) in tests.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    bits: BitVec,
}

impl EntitySet {
    /// Create an empty set with no backing storage.
    pub fn new() -> Self {
        Self { bits: BitVec::new() }
    }

    /// Create an empty set whose storage already covers `len` bits.
    pub fn with_len(len: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, len),
        }
    }

    /// Number of bits currently covered (set or not).
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.bits.len()
    }

    /// Number of members.
    #[inline]
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Whether the set has no members.
    #[inline]
    pub fn is_clear(&self) -> bool {
        self.bits.not_any()
    }

    /// Whether `index` is a member. Indices past the end are never members.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.bits.get(index).map_or(false, |bit| *bit)
    }

    /// Add `index`, growing the set to cover it.
    pub fn insert(&mut self, index: usize) {
        self.cover(index);
        self.bits.set(index, true);
    }

    /// Remove `index`. Returns whether it was a member.
    pub fn remove(&mut self, index: usize) -> bool {
        if !self.contains(index) {
            return false;
        }
        self.bits.set(index, false);
        true
    }

    /// Grow (never shrink) so that `index` is addressable.
    pub fn cover(&mut self, index: usize) {
        if index >= self.bits.len() {
            self.bits.resize(index + 1, false);
        }
    }

    /// Resize to exactly `len` bits. New bits are zero.
    pub fn resize(&mut self, len: usize) {
        self.bits.resize(len, false);
    }

    /// Reserve storage for at least `additional` more bits.
    pub fn reserve(&mut self, additional: usize) {
        self.bits.reserve(additional);
    }

    /// Drop every member and all covered bits.
    pub fn clear(&mut self) {
        self.bits.clear();
    }

    /// The lowest member, or `None` when the set is empty.
    #[inline]
    pub fn first(&self) -> Option<usize> {
        self.bits.first_one()
    }

    /// The lowest member strictly greater than `index`.
    ///
    /// `None` is the "no more bits" sentinel that ends filter iteration.
    pub fn next_after(&self, index: usize) -> Option<usize> {
        let start = index.checked_add(1)?;
        if start >= self.bits.len() {
            return None;
        }
        self.bits[start..].first_one().map(|offset| start + offset)
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    /// Zero-extend whichever of `self` and `other` is shorter so both cover
    /// the same number of bits.
    pub fn equalize(&mut self, other: &mut EntitySet) {
        let len = self.bit_len().max(other.bit_len());
        self.resize(len);
        other.resize(len);
    }

    /// Keep only members that are also in `other`.
    ///
    /// The shorter operand is treated as zero-extended, so the result covers
    /// the longer of the two lengths.
    pub fn intersect_with(&mut self, other: &EntitySet) {
        let shared = self.bit_len().min(other.bit_len());
        if other.bit_len() > self.bit_len() {
            self.resize(other.bit_len());
        }
        self.bits[..shared] &= &other.bits[..shared];
        self.bits[shared..].fill(false);
    }

    /// Add every member of `other`.
    pub fn union_with(&mut self, other: &EntitySet) {
        if other.bit_len() > self.bit_len() {
            self.resize(other.bit_len());
        }
        let len = other.bit_len();
        self.bits[..len] |= other.bits.as_bitslice();
    }

    /// Remove every member of `other`.
    pub fn subtract(&mut self, other: &EntitySet) {
        for index in other.iter() {
            if index >= self.bits.len() {
                break;
            }
            self.bits.set(index, false);
        }
    }

    /// Shrink to one past the highest member and release spare capacity.
    pub fn trim(&mut self) {
        match self.bits.last_one() {
            Some(last) => self.bits.truncate(last + 1),
            None => self.bits.clear(),
        }
        self.bits.shrink_to_fit();
    }
}

impl fmt::Debug for EntitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<usize> for EntitySet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = EntitySet::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

impl Extend<usize> for EntitySet {
    fn extend<I: IntoIterator<Item = usize>>(&mut self, iter: I) {
        for index in iter {
            self.insert(index);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
