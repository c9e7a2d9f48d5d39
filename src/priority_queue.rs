//! Array-backed binary min-heap with priority mutation.
//!
//! Every inserted entry is identified by an [`EntryHandle`]. The queue keeps a
//! handle to heap position index so that [`PriorityQueue::decrease_priority`]
//! and [`PriorityQueue::set_priority`] run in `O(log n)`.
//!
//! Slots of extracted entries are reused by later inserts, so the index never
//! outgrows the largest number of entries held at once. Each slot carries a
//! generation that is bumped on release, which makes stale handles fail with
//! [`QueueError::UnknownHandle`] instead of reaching the slot's new entry.

use std::collections::TryReserveError;
use std::fmt::Display;

pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle {
    slot: usize,
    generation: u32,
}

#[derive(Debug)]
pub enum QueueError {
    AllocationFailed(TryReserveError),
    UnknownHandle,
    PriorityNotDecreased,
    LengthMismatch { payloads: usize, priorities: usize },
}

impl Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllocationFailed(error) => {
                write!(f, "Unable to grow priority queue: {}", error)
            }
            Self::UnknownHandle => write!(f, "Entry is not part of the priority queue"),
            Self::PriorityNotDecreased => {
                write!(f, "New priority is not smaller than the current one")
            }
            Self::LengthMismatch {
                payloads,
                priorities,
            } => write!(
                f,
                "Got {} payloads but {} priorities",
                payloads, priorities
            ),
        }
    }
}

impl std::error::Error for QueueError {}

impl From<TryReserveError> for QueueError {
    fn from(value: TryReserveError) -> Self {
        Self::AllocationFailed(value)
    }
}

struct Entry<T, P> {
    payload: T,
    priority: P,
    handle: EntryHandle,
}

#[derive(Clone, Copy)]
struct Slot {
    // None while the slot is free
    position: Option<usize>,
    generation: u32,
}

pub struct PriorityQueue<T, P: Ord> {
    heap: Vec<Entry<T, P>>,
    slots: Vec<Slot>,
    free_slots: Vec<usize>,
}

impl<T, P: Ord> PriorityQueue<T, P> {
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            slots: Vec::new(),
            free_slots: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Result<Self, QueueError> {
        let capacity = if capacity == 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            capacity
        };
        let mut queue = Self::new();
        queue.heap.try_reserve_exact(capacity)?;
        queue.slots.try_reserve_exact(capacity)?;
        queue.reserve_free_slots()?;
        Ok(queue)
    }

    /// Bulk loads all entries and restores the heap order bottom-up in `O(n)`.
    ///
    /// The returned handles are in the same order as the input payloads.
    pub fn build(
        payloads: Vec<T>,
        priorities: Vec<P>,
    ) -> Result<(Self, Vec<EntryHandle>), QueueError> {
        if payloads.len() != priorities.len() {
            return Err(QueueError::LengthMismatch {
                payloads: payloads.len(),
                priorities: priorities.len(),
            });
        }
        let mut queue = Self::with_capacity(payloads.len())?;
        let mut handles = Vec::new();
        handles.try_reserve_exact(payloads.len())?;
        for (index, (payload, priority)) in payloads.into_iter().zip(priorities).enumerate() {
            let handle = EntryHandle {
                slot: index,
                generation: 0,
            };
            queue.heap.push(Entry {
                payload,
                priority,
                handle,
            });
            queue.slots.push(Slot {
                position: Some(index),
                generation: 0,
            });
            handles.push(handle);
        }
        for index in (0..queue.heap.len() / 2).rev() {
            queue.sift_down(index);
        }
        Ok((queue, handles))
    }

    pub fn insert(&mut self, payload: T, priority: P) -> Result<EntryHandle, QueueError> {
        self.grow_if_full()?;
        let index = self.heap.len();
        let handle = match self.free_slots.pop() {
            Some(slot) => {
                self.slots[slot].position = Some(index);
                EntryHandle {
                    slot,
                    generation: self.slots[slot].generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    position: Some(index),
                    generation: 0,
                });
                EntryHandle {
                    slot: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };
        self.heap.push(Entry {
            payload,
            priority,
            handle,
        });
        self.sift_up(index);
        Ok(handle)
    }

    pub fn extract_min(&mut self) -> Option<(T, P)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let entry = self.heap.pop()?;
        self.release(entry.handle.slot);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((entry.payload, entry.priority))
    }

    pub fn peek_min(&self) -> Option<(&T, &P)> {
        self.heap
            .first()
            .map(|entry| (&entry.payload, &entry.priority))
    }

    pub fn decrease_priority(
        &mut self,
        handle: EntryHandle,
        new_priority: P,
    ) -> Result<(), QueueError> {
        let index = self.position_of(handle)?;
        if new_priority >= self.heap[index].priority {
            return Err(QueueError::PriorityNotDecreased);
        }
        self.heap[index].priority = new_priority;
        self.sift_up(index);
        Ok(())
    }

    pub fn set_priority(&mut self, handle: EntryHandle, new_priority: P) -> Result<(), QueueError> {
        let index = self.position_of(handle)?;
        let old_priority = std::mem::replace(&mut self.heap[index].priority, new_priority);
        match self.heap[index].priority.cmp(&old_priority) {
            std::cmp::Ordering::Less => self.sift_up(index),
            std::cmp::Ordering::Greater => self.sift_down(index),
            std::cmp::Ordering::Equal => (),
        }
        Ok(())
    }

    pub fn priority(&self, handle: EntryHandle) -> Option<&P> {
        self.position_of(handle)
            .ok()
            .map(|index| &self.heap[index].priority)
    }

    pub fn contains(&self, handle: EntryHandle) -> bool {
        self.position_of(handle).is_ok()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Yields the remaining payloads in non-decreasing priority order.
    pub fn drain_sorted(&mut self) -> impl Iterator<Item = (T, P)> + '_ {
        std::iter::from_fn(move || self.extract_min())
    }

    fn grow_if_full(&mut self) -> Result<(), QueueError> {
        if self.heap.len() == self.heap.capacity() {
            let additional = self.heap.capacity().max(DEFAULT_QUEUE_CAPACITY);
            self.heap.try_reserve_exact(additional)?;
        }
        if self.free_slots.is_empty() && self.slots.len() == self.slots.capacity() {
            let additional = self.slots.capacity().max(DEFAULT_QUEUE_CAPACITY);
            self.slots.try_reserve_exact(additional)?;
            self.reserve_free_slots()?;
        }
        Ok(())
    }

    // release() must never allocate, so the free list can always take every slot
    fn reserve_free_slots(&mut self) -> Result<(), QueueError> {
        let additional = self.slots.capacity() - self.free_slots.len();
        self.free_slots.try_reserve_exact(additional)?;
        Ok(())
    }

    fn release(&mut self, slot: usize) {
        let slot_state = &mut self.slots[slot];
        slot_state.position = None;
        slot_state.generation = slot_state.generation.wrapping_add(1);
        self.free_slots.push(slot);
    }

    fn position_of(&self, handle: EntryHandle) -> Result<usize, QueueError> {
        self.slots
            .get(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.position)
            .ok_or(QueueError::UnknownHandle)
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.slots[self.heap[a].handle.slot].position = Some(a);
        self.slots[self.heap[b].handle.slot].position = Some(b);
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[parent].priority <= self.heap[index].priority {
                break;
            }
            self.swap(parent, index);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;
            if left < self.heap.len() && self.heap[left].priority < self.heap[smallest].priority {
                smallest = left;
            }
            if right < self.heap.len() && self.heap[right].priority < self.heap[smallest].priority
            {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.swap(index, smallest);
            index = smallest;
        }
    }
}

impl<T, P: Ord> Default for PriorityQueue<T, P> {
    fn default() -> Self {
        Self::new()
    }
}
