//! Liveness tables of local slots.
//!
//! A slot is *alive* at a program point if its current value may still be
//! read on some path from that point. [`Liveness`] records, for every
//! instruction offset of a method and every local slot:
//!
//! - whether the slot is alive right before the instruction,
//! - whether it is alive right after it,
//! - whether the instruction accesses a category 2 value starting at the slot.
//!
//! The tables are indexed by byte offset and span the whole code. Offsets
//! that do not start an instruction carry no facts. Queries for offsets or
//! slots outside the tables answer `false` instead of panicking.

use crate::utils::BitSet;

/// Liveness facts for every instruction offset of one method body.
///
/// Produced by [`LivenessAnalyzer`](super::LivenessAnalyzer).
///
/// # Examples
///
/// ```rust
/// use slotopt::{analysis::LivenessAnalyzer, code::MethodAssembler};
///
/// // static void f(int a) { int b = a; return; }
/// let mut asm = MethodAssembler::new_static("f", "(I)V");
/// asm.iload(0)?.istore(1)?.return_void()?;
/// let body = asm.finish()?;
///
/// let liveness = LivenessAnalyzer::analyze(&body)?;
/// assert!(liveness.is_alive_before(0, 0));
/// assert!(!liveness.is_alive_after(0, 0));
/// // The dead store still marks its slot right after it.
/// assert!(liveness.is_alive_after(1, 1));
/// assert!(!liveness.is_alive_before(2, 1));
/// # Ok::<(), slotopt::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liveness {
    max_locals: u16,
    alive_before: Vec<BitSet>,
    alive_after: Vec<BitSet>,
    category2: Vec<BitSet>,
    iterations: usize,
}

impl Liveness {
    /// Creates empty tables for a method with `code_length` bytes of code.
    #[must_use]
    pub fn new(code_length: u32, max_locals: u16) -> Self {
        let empty = BitSet::new(usize::from(max_locals));
        let offsets = code_length as usize;
        Self {
            max_locals,
            alive_before: vec![empty.clone(); offsets],
            alive_after: vec![empty.clone(); offsets],
            category2: vec![empty; offsets],
            iterations: 0,
        }
    }

    /// Length of the analyzed code in bytes.
    #[must_use]
    pub fn code_length(&self) -> u32 {
        u32::try_from(self.alive_before.len()).unwrap_or(u32::MAX)
    }

    /// Number of local slots covered by the tables.
    #[must_use]
    pub const fn max_locals(&self) -> u16 {
        self.max_locals
    }

    /// Number of worklist iterations the analysis needed to converge.
    #[must_use]
    pub const fn iterations(&self) -> usize {
        self.iterations
    }

    pub(crate) fn set_iterations(&mut self, iterations: usize) {
        self.iterations = iterations;
    }

    /// Returns `true` if `slot` is alive right before the instruction at `offset`.
    #[must_use]
    pub fn is_alive_before(&self, offset: u32, slot: u16) -> bool {
        Self::lookup(&self.alive_before, offset, slot)
    }

    /// Returns `true` if `slot` is alive right after the instruction at `offset`.
    #[must_use]
    pub fn is_alive_after(&self, offset: u32, slot: u16) -> bool {
        Self::lookup(&self.alive_after, offset, slot)
    }

    /// Returns `true` if the instruction at `offset` accesses a category 2
    /// value whose low half is `slot`.
    #[must_use]
    pub fn is_category2(&self, offset: u32, slot: u16) -> bool {
        Self::lookup(&self.category2, offset, slot)
    }

    /// Sets or clears the alive-before fact of `slot` at `offset`.
    ///
    /// Out-of-range positions are ignored.
    pub fn set_alive_before(&mut self, offset: u32, slot: u16, alive: bool) {
        Self::store(&mut self.alive_before, offset, slot, alive);
    }

    /// Sets or clears the alive-after fact of `slot` at `offset`.
    ///
    /// Out-of-range positions are ignored.
    pub fn set_alive_after(&mut self, offset: u32, slot: u16, alive: bool) {
        Self::store(&mut self.alive_after, offset, slot, alive);
    }

    /// Sets or clears the category 2 fact of `slot` at `offset`.
    ///
    /// Out-of-range positions are ignored.
    pub fn set_category2(&mut self, offset: u32, slot: u16, category2: bool) {
        Self::store(&mut self.category2, offset, slot, category2);
    }

    /// All slots alive right before the instruction at `offset`.
    #[must_use]
    pub fn alive_before(&self, offset: u32) -> Option<&BitSet> {
        self.alive_before.get(offset as usize)
    }

    /// All slots alive right after the instruction at `offset`.
    #[must_use]
    pub fn alive_after(&self, offset: u32) -> Option<&BitSet> {
        self.alive_after.get(offset as usize)
    }

    /// Low slots of category 2 values accessed at `offset`.
    #[must_use]
    pub fn category2(&self, offset: u32) -> Option<&BitSet> {
        self.category2.get(offset as usize)
    }

    /// Returns `true` if `slot` is the low half of a category 2 value anywhere
    /// in the method.
    #[must_use]
    pub fn is_ever_category2(&self, slot: u16) -> bool {
        self.category2
            .iter()
            .any(|set| set.contains(usize::from(slot)))
    }

    /// Replaces the before and after sets at `offset` in one go.
    pub(crate) fn record(&mut self, offset: u32, before: &BitSet, after: &BitSet) {
        let index = offset as usize;
        if index < self.alive_before.len() {
            self.alive_before[index].clone_from(before);
            self.alive_after[index].clone_from(after);
        }
    }

    fn lookup(table: &[BitSet], offset: u32, slot: u16) -> bool {
        table
            .get(offset as usize)
            .is_some_and(|set| set.contains(usize::from(slot)))
    }

    fn store(table: &mut [BitSet], offset: u32, slot: u16, value: bool) {
        if let Some(set) = table.get_mut(offset as usize) {
            if usize::from(slot) < set.len() {
                set.set(usize::from(slot), value);
            }
        }
    }
}
