//! Indexed binary min-heap over dense integer handles.
//!
//! Handles are `usize` values in `0..capacity` (for the solver: the flat
//! index of a cell). A side table maps each handle to its slot in the heap,
//! which gives O(1) membership tests and O(log n) priority updates.
//!
//! Entries with equal priority come out in the order they were first
//! enqueued (FIFO). [`update_priority`](IndexedHeap::update_priority) keeps
//! an entry's original sequence number.

use std::cmp::Ordering;

use crate::error::HeapError;

#[derive(Clone, Copy, Debug)]
struct Entry {
    handle: usize,
    priority: i32,
    /// Insertion counter used to break ties.
    seq: u64,
}

impl Entry {
    #[inline]
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.seq.cmp(&other.seq))
    }
}

/// A fixed-capacity indexed min-heap.
#[derive(Clone, Debug)]
pub struct IndexedHeap {
    heap: Vec<Entry>,
    /// `positions[handle]` is the heap slot of `handle`, if queued.
    positions: Vec<Option<usize>>,
    seq: u64,
}

impl IndexedHeap {
    /// Create an empty heap accepting handles in `0..capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity),
            positions: vec![None; capacity],
            seq: 0,
        }
    }

    /// Largest handle + 1 this heap accepts.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.positions.len()
    }

    /// Number of queued handles.
    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether `handle` is currently queued. O(1).
    #[inline]
    pub fn contains(&self, handle: usize) -> bool {
        self.positions.get(handle).is_some_and(Option::is_some)
    }

    /// Current priority of a queued handle.
    pub fn priority(&self, handle: usize) -> Option<i32> {
        let pos = (*self.positions.get(handle)?)?;
        Some(self.heap[pos].priority)
    }

    /// Look at the minimum without removing it.
    #[inline]
    pub fn peek_first(&self) -> Option<(usize, i32)> {
        self.heap.first().map(|e| (e.handle, e.priority))
    }

    /// Queue `handle` with `priority`.
    pub fn enqueue(&mut self, handle: usize, priority: i32) -> Result<(), HeapError> {
        match self.positions.get(handle) {
            None => {
                return Err(HeapError::OutOfCapacity {
                    handle,
                    capacity: self.capacity(),
                });
            }
            Some(Some(_)) => return Err(HeapError::AlreadyQueued(handle)),
            Some(None) => {}
        }
        let seq = self.seq;
        self.seq += 1;
        let pos = self.heap.len();
        self.heap.push(Entry {
            handle,
            priority,
            seq,
        });
        self.positions[handle] = Some(pos);
        self.sift_up(pos);
        Ok(())
    }

    /// Remove and return the handle with the lowest priority.
    pub fn dequeue(&mut self) -> Result<usize, HeapError> {
        if self.heap.is_empty() {
            return Err(HeapError::Empty);
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let Some(top) = self.heap.pop() else {
            return Err(HeapError::Empty);
        };
        self.positions[top.handle] = None;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Ok(top.handle)
    }

    /// Change the priority of a queued handle, restoring heap order.
    pub fn update_priority(&mut self, handle: usize, priority: i32) -> Result<(), HeapError> {
        let Some(pos) = self.positions.get(handle).copied().flatten() else {
            return Err(HeapError::NotQueued(handle));
        };
        let old = self.heap[pos].priority;
        self.heap[pos].priority = priority;
        match priority.cmp(&old) {
            Ordering::Less => self.sift_up(pos),
            Ordering::Greater => self.sift_down(pos),
            Ordering::Equal => {}
        }
        Ok(())
    }

    /// Drop every queued handle. Capacity is kept.
    pub fn clear(&mut self) {
        for e in self.heap.drain(..) {
            self.positions[e.handle] = None;
        }
        self.seq = 0;
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    #[inline]
    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.heap.swap(a, b);
        self.positions[self.heap[a].handle] = Some(a);
        self.positions[self.heap[b].handle] = Some(b);
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.heap[pos].key_cmp(&self.heap[parent]) != Ordering::Less {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;
            if left < len && self.heap[left].key_cmp(&self.heap[smallest]) == Ordering::Less {
                smallest = left;
            }
            if right < len && self.heap[right].key_cmp(&self.heap[smallest]) == Ordering::Less {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
    }
}
