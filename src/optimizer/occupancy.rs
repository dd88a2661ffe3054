//! Cumulative slot occupancy during coalescing.

use crate::{analysis::Liveness, utils::BitSet};

/// Which program points each slot is alive at, updated as slots are merged.
///
/// The liveness tables are indexed by offset; coalescing asks the opposite
/// question (is this slot ever alive together with that one?), so the facts
/// are transposed into one offset set per slot. Two slots overlap if their
/// alive-before sets or their alive-after sets intersect.
///
/// Slots that hold either half of a category 2 value are marked wide and
/// never take part in a merge.
#[derive(Debug, Clone)]
pub struct SlotOccupancy {
    before: Vec<BitSet>,
    after: Vec<BitSet>,
    wide: BitSet,
}

impl SlotOccupancy {
    /// Seeds the occupancy from analysis results for the slots below `limit`.
    ///
    /// Slots at or above `limit` are treated as never alive and never merge.
    #[must_use]
    pub fn from_liveness(liveness: &Liveness, limit: u16) -> Self {
        let slots = usize::from(liveness.max_locals().min(limit));
        let offsets = liveness.code_length() as usize;
        let mut before = vec![BitSet::new(offsets); slots];
        let mut after = vec![BitSet::new(offsets); slots];
        let mut wide = BitSet::new(slots);

        for offset in 0..liveness.code_length() {
            let index = offset as usize;
            if let Some(set) = liveness.alive_before(offset) {
                for slot in set.iter().take_while(|&slot| slot < slots) {
                    before[slot].insert(index);
                }
            }
            if let Some(set) = liveness.alive_after(offset) {
                for slot in set.iter().take_while(|&slot| slot < slots) {
                    after[slot].insert(index);
                }
            }
            if let Some(set) = liveness.category2(offset) {
                for slot in set.iter().take_while(|&slot| slot < slots) {
                    wide.insert(slot);
                    if slot + 1 < slots {
                        wide.insert(slot + 1);
                    }
                }
            }
        }

        Self {
            before,
            after,
            wide,
        }
    }

    /// Returns `true` if `slot` is alive anywhere.
    #[must_use]
    pub fn is_occupied(&self, slot: u16) -> bool {
        let slot = usize::from(slot);
        self.before.get(slot).is_some_and(|set| !set.is_empty())
            || self.after.get(slot).is_some_and(|set| !set.is_empty())
    }

    /// Returns `true` if `slot` is part of a category 2 value somewhere.
    #[must_use]
    pub fn is_wide(&self, slot: u16) -> bool {
        self.wide.contains(usize::from(slot))
    }

    /// Returns `true` if `a` and `b` are alive together at some program point.
    #[must_use]
    pub fn overlaps(&self, a: u16, b: u16) -> bool {
        let (a, b) = (usize::from(a), usize::from(b));
        let pair = |sets: &[BitSet]| match (sets.get(a), sets.get(b)) {
            (Some(x), Some(y)) => x.intersects(y),
            _ => false,
        };
        pair(&self.before) || pair(&self.after)
    }

    /// Returns `true` if `from` may share a slot with `into`.
    #[must_use]
    pub fn can_merge(&self, from: u16, into: u16) -> bool {
        let tracked = usize::from(from.max(into)) < self.before.len();
        tracked && !self.is_wide(from) && !self.is_wide(into) && !self.overlaps(from, into)
    }

    /// Moves every fact of `from` to `into`.
    ///
    /// Later merge candidates see the combined occupancy of `into`, and
    /// `from` becomes free.
    pub fn merge(&mut self, from: u16, into: u16) {
        let (from, into) = (usize::from(from), usize::from(into));
        if from == into || from >= self.before.len() || into >= self.before.len() {
            return;
        }
        for sets in [&mut self.before, &mut self.after] {
            let len = sets[from].len();
            let moved = std::mem::replace(&mut sets[from], BitSet::new(len));
            sets[into].union_with(&moved);
        }
    }
}
