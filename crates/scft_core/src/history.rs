//! Fixed-capacity history of past states, newest first.
//!
//! Slots are allocated once from a prototype. Pushing into a full history
//! evicts the oldest entry and reuses its storage, so large field arrays are
//! never reallocated inside an iteration loop.

use crate::error::{Result, ScftError};

#[derive(Debug, Clone)]
pub struct History<T> {
    slots: Vec<T>,
    /// Slot index of the newest entry.
    head: usize,
    len: usize,
}

impl<T: Clone> History<T> {
    /// Creates a history of `capacity` slots, each a clone of `prototype`.
    pub fn new(capacity: usize, prototype: T) -> Result<Self> {
        if capacity == 0 {
            return Err(ScftError::InvalidHistorySize {
                size: 0,
                reason: "history capacity must be positive",
            });
        }
        Ok(Self {
            slots: vec![prototype; capacity],
            head: 0,
            len: 0,
        })
    }

    /// Copies `value` into a fresh newest slot.
    pub fn push(&mut self, value: &T) {
        self.advance().clone_from(value);
    }
}

impl<T> History<T> {
    /// Rotates the ring and returns the slot that now holds age 0.
    ///
    /// The slot still contains whatever it held before (the evicted entry
    /// once the history is full); callers overwrite it in place.
    pub fn advance(&mut self) -> &mut T {
        let capacity = self.slots.len();
        self.head = (self.head + capacity - 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        }
        &mut self.slots[self.head]
    }

    /// Entry of the given age; age 0 is the most recent.
    pub fn get(&self, age: usize) -> Result<&T> {
        if age >= self.len {
            return Err(ScftError::IndexOutOfRange {
                index: age,
                size: self.len,
            });
        }
        Ok(&self.slots[self.slot(age)])
    }

    pub fn get_mut(&mut self, age: usize) -> Result<&mut T> {
        if age >= self.len {
            return Err(ScftError::IndexOutOfRange {
                index: age,
                size: self.len,
            });
        }
        let slot = self.slot(age);
        Ok(&mut self.slots[slot])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Forgets all entries but keeps the slot storage.
    pub fn clear(&mut self) {
        self.len = 0;
        self.head = 0;
    }

    /// Valid entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).map(move |age| &self.slots[self.slot(age)])
    }

    fn slot(&self, age: usize) -> usize {
        (self.head + age) % self.slots.len()
    }
}
