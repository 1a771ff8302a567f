//! Bounded queue of bodies to delete at the end of a collision pass.

use std::fmt;

use crate::physics::BodyHandle;

/// Default number of bodies that may be queued per pass.
pub const DEFAULT_REMOVAL_CAPACITY: usize = 500;

/// The queue was full when another body had to be removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalQueueOverflow {
    pub capacity: usize,
}

impl fmt::Display for RemovalQueueOverflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "removal queue full ({} entries)", self.capacity)
    }
}

impl std::error::Error for RemovalQueueOverflow {}

/// Fractured parents waiting for removal.
///
/// The backing allocation is made once and reused by every pass.
#[derive(Debug, Clone)]
pub struct RemovalQueue {
    entries: Vec<BodyHandle>,
    capacity: usize,
}

impl Default for RemovalQueue {
    fn default() -> Self {
        Self::new(DEFAULT_REMOVAL_CAPACITY)
    }
}

impl RemovalQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.entries.contains(&handle)
    }

    /// Queue `handle`; fails without side effects when the queue is full.
    pub fn push(&mut self, handle: BodyHandle) -> Result<(), RemovalQueueOverflow> {
        if self.is_full() {
            return Err(RemovalQueueOverflow {
                capacity: self.capacity,
            });
        }
        self.entries.push(handle);
        Ok(())
    }

    pub fn as_slice(&self) -> &[BodyHandle] {
        &self.entries
    }

    /// Hand the queued entries to `f` in insertion order, then empty the queue.
    pub fn drain_with(&mut self, mut f: impl FnMut(BodyHandle)) {
        for handle in self.entries.drain(..) {
            f(handle);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
