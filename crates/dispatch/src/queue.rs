//! Bounded FIFO of outstanding dispatches.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sequence number of a dispatch, assigned in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DispatchId(pub u64);

impl fmt::Display for DispatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A statement that has been sent on its own remote connection and whose
/// result has not been collected yet.
#[derive(Debug)]
pub struct PendingDispatch<C> {
    pub id: DispatchId,
    pub connection: C,
    /// Kept for diagnostics only. Never resent.
    pub statement: String,
}

/// Fixed capacity circular buffer.
///
/// Entries leave in the order they entered. Nothing in here blocks, callers
/// must make room before enqueueing.
#[derive(Debug)]
pub struct WorkQueue<T> {
    slots: Vec<Option<T>>,
    /// Insertion cursor.
    head: usize,
    /// Removal cursor.
    tail: usize,
    count: usize,
}

impl<T> WorkQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        WorkQueue {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    /// Push an entry onto the back of the queue.
    ///
    /// The entry is handed back if the queue is full.
    pub fn try_enqueue(&mut self, entry: T) -> Result<(), T> {
        if self.is_full() {
            return Err(entry);
        }
        debug_assert!(self.slots[self.head].is_none());
        self.slots[self.head] = Some(entry);
        self.head = (self.head + 1) % self.slots.len();
        self.count += 1;
        Ok(())
    }

    /// Get the oldest entry without removing it.
    pub fn peek_oldest(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.tail].as_ref()
    }

    /// Remove the oldest entry, transferring ownership to the caller.
    pub fn remove_oldest(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let entry = self.slots[self.tail].take();
        debug_assert!(entry.is_some());
        self.tail = (self.tail + 1) % self.slots.len();
        self.count -= 1;
        entry
    }

    /// Iterate entries from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        (0..self.count).filter_map(move |i| self.slots[(self.tail + i) % self.slots.len()].as_ref())
    }
}
