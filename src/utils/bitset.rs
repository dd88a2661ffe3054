//! A fixed-capacity bit vector for local slot sets.
//!
//! Liveness facts are stored as one set of local slots per program point.
//! Methods rarely use more than a few dozen locals, so a set is usually a
//! single machine word, and the merge test of the optimizer boils down to
//! word-wise `AND`s.
//!
//! # Example
//!
//! ```rust
//! use slotopt::utils::BitSet;
//!
//! let mut live = BitSet::new(100);
//! live.insert(0);
//! live.insert(50);
//! live.insert(99);
//!
//! assert!(live.contains(50));
//! assert_eq!(live.count(), 3);
//! assert_eq!(live.iter().collect::<Vec<_>>(), vec![0, 50, 99]);
//! ```

/// A bit vector over the indices `0..len`.
///
/// All binary operations require both operands to have the same capacity;
/// sets belonging to one method are always created with that method's
/// `max_locals`.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BitSet {
    /// The bits, stored as a vector of words.
    words: Vec<u64>,
    /// The number of addressable bits.
    len: usize,
}

impl BitSet {
    /// Creates a new empty bit set with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
            len: capacity,
        }
    }

    /// Returns the capacity of this bit set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Sets the bit at `index`.
    ///
    /// Returns `true` if the bit was not set before.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn insert(&mut self, index: usize) -> bool {
        assert!(index < self.len, "index out of bounds");
        let (word, mask) = Self::locate(index);
        let was_set = self.words[word] & mask != 0;
        self.words[word] |= mask;
        !was_set
    }

    /// Clears the bit at `index`.
    ///
    /// Returns `true` if the bit was set before.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn remove(&mut self, index: usize) -> bool {
        assert!(index < self.len, "index out of bounds");
        let (word, mask) = Self::locate(index);
        let was_set = self.words[word] & mask != 0;
        self.words[word] &= !mask;
        was_set
    }

    /// Sets or clears the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    pub fn set(&mut self, index: usize, value: bool) {
        if value {
            self.insert(index);
        } else {
            self.remove(index);
        }
    }

    /// Returns `true` if the bit at `index` is set.
    ///
    /// Indices past the capacity are reported as not set, so queries for
    /// slots beyond a method's frame never panic.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let (word, mask) = Self::locate(index);
        self.words[word] & mask != 0
    }

    /// Returns the number of bits set.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Clears all bits.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    /// Computes the union with another bit set (in place).
    ///
    /// Returns `true` if `self` changed.
    pub fn union_with(&mut self, other: &Self) -> bool {
        assert_eq!(self.len, other.len, "bit sets must have same length");
        let mut changed = false;
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            let old = *a;
            *a |= *b;
            changed |= old != *a;
        }
        changed
    }

    /// Removes all bits that are set in `other` from `self`.
    ///
    /// Returns `true` if `self` changed.
    pub fn difference_with(&mut self, other: &Self) -> bool {
        assert_eq!(self.len, other.len, "bit sets must have same length");
        let mut changed = false;
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            let old = *a;
            *a &= !*b;
            changed |= old != *a;
        }
        changed
    }

    /// Returns `true` if `self` and `other` have at least one bit in common.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .any(|(a, b)| a & b != 0)
    }

    /// Returns `true` if every bit of `self` is also set in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .all(|(a, b)| a & !b == 0)
    }

    /// Returns an iterator over the indices of set bits, in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            set: self,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    #[inline]
    const fn locate(index: usize) -> (usize, u64) {
        (index / 64, 1u64 << (index % 64))
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the set bits in a [`BitSet`].
pub struct BitSetIter<'a> {
    set: &'a BitSet,
    word_idx: usize,
    /// Remaining bits of the current word.
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.word_idx * 64 + bit);
            }
            self.word_idx += 1;
            self.current = *self.set.words.get(self.word_idx)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_basic() {
        let mut bs = BitSet::new(100);
        assert!(bs.is_empty());
        assert_eq!(bs.count(), 0);

        assert!(bs.insert(0));
        assert!(bs.insert(50));
        assert!(bs.insert(99));
        assert!(!bs.insert(99));

        assert!(!bs.is_empty());
        assert_eq!(bs.count(), 3);
        assert!(bs.contains(0));
        assert!(bs.contains(50));
        assert!(bs.contains(99));
        assert!(!bs.contains(1));
    }

    #[test]
    fn test_bitset_contains_past_capacity() {
        let mut bs = BitSet::new(4);
        bs.insert(3);
        assert!(bs.contains(3));
        assert!(!bs.contains(4));
        assert!(!bs.contains(1000));
    }

    #[test]
    fn test_bitset_remove_and_set() {
        let mut bs = BitSet::new(70);
        bs.set(65, true);
        assert!(bs.contains(65));

        assert!(bs.remove(65));
        assert!(!bs.remove(65));
        assert!(!bs.contains(65));

        bs.set(3, true);
        bs.set(3, false);
        assert!(bs.is_empty());
    }

    #[test]
    fn test_bitset_union_and_difference() {
        let mut a = BitSet::new(100);
        let mut b = BitSet::new(100);

        a.insert(0);
        a.insert(1);
        b.insert(1);
        b.insert(2);

        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![0, 1, 2]);

        assert!(a.difference_with(&b));
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_bitset_intersects_and_subset() {
        let mut a = BitSet::new(130);
        let mut b = BitSet::new(130);

        a.insert(5);
        a.insert(128);
        b.insert(6);
        assert!(!a.intersects(&b));

        b.insert(128);
        assert!(a.intersects(&b));

        let mut c = BitSet::new(130);
        c.insert(128);
        assert!(c.is_subset(&a));
        assert!(!a.is_subset(&c));
    }

    #[test]
    fn test_bitset_iter_across_words() {
        let mut bs = BitSet::new(200);
        for idx in [0, 63, 64, 127, 199] {
            bs.insert(idx);
        }
        assert_eq!(bs.iter().collect::<Vec<_>>(), vec![0, 63, 64, 127, 199]);
        assert_eq!(format!("{bs:?}"), "{0, 63, 64, 127, 199}");
    }

    #[test]
    fn test_bitset_empty_capacity() {
        let bs = BitSet::new(0);
        assert!(bs.is_empty());
        assert_eq!(bs.iter().next(), None);
    }

    #[test]
    fn test_bitset_clear() {
        let mut bs = BitSet::new(100);
        bs.insert(50);
        bs.clear();
        assert!(bs.is_empty());
        assert_eq!(bs.len(), 100);
    }
}
