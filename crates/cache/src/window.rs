//! The reversible window: recent blocks whose cached state can still be rolled back.

use crate::{BlockHead, BlockNumber, Revision, Slot};
use std::collections::VecDeque;

/// Result of walking the window back towards the parent of a new head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollback {
    /// The head is already in the window; it is now the top and must not be pushed again.
    Known {
        /// Number of slots discarded on the way.
        popped: usize,
    },
    /// The top is now the head's parent, or the window is empty.
    Attach {
        /// Number of slots discarded on the way.
        popped: usize,
    },
}

impl Rollback {
    /// Number of slots discarded.
    pub const fn popped(&self) -> usize {
        match self {
            Self::Known { popped } | Self::Attach { popped } => *popped,
        }
    }
}

/// Slots ordered oldest to newest, each linked to the previous one by parent id.
#[derive(Debug)]
pub struct ReversibleWindow {
    slots: VecDeque<Slot>,
    max_len: usize,
}

impl ReversibleWindow {
    /// Creates an empty window holding at most `max_len` slots.
    pub fn new(max_len: usize) -> Self {
        Self { slots: VecDeque::with_capacity(max_len + 1), max_len }
    }

    /// The newest slot.
    pub fn top(&self) -> Option<&Slot> {
        self.slots.back()
    }

    /// Index of the newest slot matching `revision`.
    pub fn find_index(&self, revision: &Revision) -> Option<usize> {
        self.slots.iter().rposition(|slot| slot.matches(revision))
    }

    /// The newest slot matching `revision`.
    pub fn find(&self, revision: &Revision) -> Option<&Slot> {
        self.find_index(revision).and_then(|index| self.slots.get(index))
    }

    /// Mutable access to the newest slot matching `revision`.
    pub fn find_mut(&mut self, revision: &Revision) -> Option<&mut Slot> {
        self.find_index(revision).and_then(|index| self.slots.get_mut(index))
    }

    /// Slot at `index`, counted from the oldest.
    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    /// Mutable slot at `index`, counted from the oldest.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Slot> {
        self.slots.get_mut(index)
    }

    /// Pops slots until the top is the parent of `head`, `head` itself, or the window is empty.
    pub fn rollback_to_parent_of(&mut self, head: &BlockHead) -> Rollback {
        let mut popped = 0;
        while let Some(top) = self.slots.back() {
            if top.head.id == head.id {
                return Rollback::Known { popped };
            }
            if top.head.id == head.parent_id {
                break;
            }
            if let Some(slot) = self.slots.pop_back() {
                tracing::debug!(
                    target: "cache::window",
                    number = slot.head.number,
                    id = %slot.head.id,
                    "Discarding forked slot"
                );
            }
            popped += 1;
        }
        Rollback::Attach { popped }
    }

    /// Pushes a new top slot, returning the oldest slots that no longer fit.
    pub fn push(&mut self, slot: Slot) -> Vec<Slot> {
        self.slots.push_back(slot);
        let overflow = self.slots.len().saturating_sub(self.max_len);
        self.slots.drain(..overflow).collect()
    }

    /// Returns true if block `number` is too far behind the top to ever be rolled back.
    pub fn is_irreversible(&self, number: BlockNumber) -> bool {
        self.top().is_some_and(|top| {
            number.saturating_add(self.max_len as BlockNumber) < top.head.number
        })
    }

    /// Number of slots held.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no block has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of slots held.
    pub const fn max_len(&self) -> usize {
        self.max_len
    }

    /// Iterates slots from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Slot> + ExactSizeIterator {
        self.slots.iter()
    }
}
