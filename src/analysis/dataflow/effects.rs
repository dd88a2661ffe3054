//! Per-instruction effects on local slots.

use crate::{code::Instruction, utils::BitSet};

/// How one instruction affects the liveness of local slots.
///
/// The transfer function of the liveness analysis only looks at these sets,
/// so they are computed once per instruction before solving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEffects {
    /// Slots read by the instruction.
    pub uses: BitSet,
    /// Slots whose previous value the instruction definitely overwrites.
    pub kills: BitSet,
    /// Slots written by the instruction; they count as alive right after it,
    /// even when the stored value is never read.
    pub writes: BitSet,
    /// Low slot of a category 2 value accessed by the instruction.
    pub category2: Option<u16>,
}

impl SlotEffects {
    /// Computes the effects of `instr` in a frame of `max_locals` slots.
    ///
    /// Slots past the frame are ignored; a validated body has none.
    #[must_use]
    pub fn of(instr: &Instruction, max_locals: u16) -> Self {
        let capacity = usize::from(max_locals);
        let mut effects = Self {
            uses: BitSet::new(capacity),
            kills: BitSet::new(capacity),
            writes: BitSet::new(capacity),
            category2: None,
        };

        let Some(access) = instr.local_access() else {
            return effects;
        };

        for slot in access.slots().filter(|&slot| slot < capacity) {
            if access.reads {
                effects.uses.insert(slot);
            }
            if access.writes {
                effects.kills.insert(slot);
                effects.writes.insert(slot);
            }
        }
        if access.kind.is_category2() {
            effects.category2 = Some(access.slot);
        }

        effects
    }
}
