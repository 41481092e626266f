//! Fixed-length table of display slots

use std::collections::HashSet;

use super::MessageId;

static EMPTY: Slot = Slot::Empty;

/// Occupancy of one display row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Slot {
    #[default]
    Empty,
    Occupied(MessageId),
}

impl Slot {
    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            Self::Empty => None,
            Self::Occupied(id) => Some(id),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Mapping of display rows `0..N` to the message each one shows
///
/// The length is fixed when the assignment is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    slots: Vec<Slot>,
}

impl SlotAssignment {
    /// Create `len` empty slots
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![Slot::Empty; len],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot at `index`; out-of-range indices read as empty
    pub fn get(&self, index: usize) -> &Slot {
        self.slots.get(index).unwrap_or(&EMPTY)
    }

    /// Replace slot `index`, returning the previous occupant
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn set(&mut self, index: usize, slot: Slot) -> Slot {
        std::mem::replace(&mut self.slots[index], slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter()
    }

    /// Ids currently shown by any slot
    pub fn message_ids(&self) -> HashSet<MessageId> {
        self.slots
            .iter()
            .filter_map(Slot::message_id)
            .cloned()
            .collect()
    }
}
