//! Memoized display data keyed by message id

use std::collections::{HashMap, HashSet};

use crate::models::{MessageDisplayData, MessageId};

/// Display data for messages that are (or were just) shown in a slot
///
/// Lives only as long as the poll worker; pruned once per cycle.
#[derive(Debug, Default)]
pub struct MessageCache {
    entries: HashMap<MessageId, MessageDisplayData>,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &MessageId) -> Option<&MessageDisplayData> {
        self.entries.get(id)
    }

    pub fn put(&mut self, id: MessageId, data: MessageDisplayData) {
        self.entries.insert(id, data);
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.entries.contains_key(id)
    }

    /// Drop every entry whose id is not in `ids_in_use`
    pub fn retain_only(&mut self, ids_in_use: &HashSet<MessageId>) {
        self.entries.retain(|id, _| ids_in_use.contains(id));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &MessageId> {
        self.entries.keys()
    }
}
