//! Slot remapping tables.

use std::fmt;

/// Maps every original local slot of a method to its new slot.
///
/// A fresh map is the identity. Entries are only ever changed by the
/// optimizer, one source slot at a time, and always to a lower slot.
///
/// # Examples
///
/// ```rust
/// use slotopt::optimizer::VariableMap;
///
/// let map = VariableMap::identity(4);
/// assert!(map.is_identity());
/// assert_eq!(map.get(3), 3);
/// assert_eq!(map.to_string(), "identity");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableMap {
    slots: Vec<u16>,
}

impl VariableMap {
    /// Creates the identity map over `max_locals` slots.
    #[must_use]
    pub fn identity(max_locals: u16) -> Self {
        Self {
            slots: (0..max_locals).collect(),
        }
    }

    /// Number of slots covered by the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the map covers no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The new slot of `old`.
    ///
    /// Slots past the end of the map are left where they are.
    #[must_use]
    pub fn get(&self, old: u16) -> u16 {
        self.slots.get(usize::from(old)).copied().unwrap_or(old)
    }

    pub(crate) fn set(&mut self, old: u16, new: u16) {
        if let Some(slot) = self.slots.get_mut(usize::from(old)) {
            *slot = new;
        }
    }

    /// Returns `true` if no slot moves.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.moves().next().is_none()
    }

    /// Number of slots that move.
    #[must_use]
    pub fn remapped_count(&self) -> usize {
        self.moves().count()
    }

    /// All `(old, new)` pairs, in ascending order of the old slot.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        (0u16..).zip(self.slots.iter().copied())
    }

    /// The `(old, new)` pairs of slots that move.
    pub fn moves(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.iter().filter(|(old, new)| old != new)
    }

    /// The new slot of every original slot, indexed by original slot.
    #[must_use]
    pub fn as_slice(&self) -> &[u16] {
        &self.slots
    }
}

impl fmt::Display for VariableMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_identity() {
            return f.write_str("identity");
        }
        for (position, (old, new)) in self.moves().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write!(f, "v{old} -> v{new}")?;
        }
        Ok(())
    }
}
