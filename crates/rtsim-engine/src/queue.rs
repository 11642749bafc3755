//! # rtsim-engine::queue
//!
//! The time-ordered pending-event queue. `std::collections::BinaryHeap`
//! cannot remove an arbitrary element in better than linear time, and
//! `Event::drop()` needs exactly that, so this is a hand-rolled indexed
//! binary heap: a `Vec` holding the heap order plus a side table mapping
//! each event's stable [`EventId`] to its current index, kept in sync on
//! every swap.

use fxhash::FxHashMap;
use rtsim_types::prelude::*;

use crate::event::{Event, EventHandle};

pub struct EventQueue {
    heap: Vec<EventHandle>,
    positions: FxHashMap<EventId, usize>,
    next_order: u64,
    next_event_id: EventId,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            heap: Vec::new(),
            positions: FxHashMap::default(),
            next_order: 0,
            next_event_id: 0,
        }
    }

    /// Allocates a fresh, stable event id, distinct from `order` (which
    /// changes on every `post`).
    pub fn alloc_event_id(&mut self) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.checked_add(1).expect("EventId overflow");
        id
    }

    /// Allocates the next insertion-order counter value for `post`.
    pub fn next_order(&mut self) -> u64 {
        let order = self.next_order;
        self.next_order = self.next_order.checked_add(1).expect("order overflow");
        order
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// The time of the head event, without removing it.
    pub fn peek_time(&self) -> Option<Tick> {
        self.heap.first().map(|e| e.borrow().time())
    }

    fn key(&self, i: usize) -> (Tick, i32, u64) {
        let ev = self.heap[i].borrow();
        (ev.time(), ev.priority(), ev.core.order)
    }

    /// Inserts an already-scheduled event (its `core` fields must already
    /// be set by `Event::post`/`process`).
    pub fn push(&mut self, handle: EventHandle) {
        let id = handle.borrow().id();
        let idx = self.heap.len();
        self.heap.push(handle);
        self.positions.insert(id, idx);
        self.sift_up(idx);
    }

    /// Removes and returns the minimum `(time, priority, order)` event.
    pub fn pop_min(&mut self) -> Option<EventHandle> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let min = self.heap.pop().unwrap();
        self.positions.remove(&min.borrow().id());
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(min)
    }

    /// Removes the event with the given id from the queue, if present.
    /// A no-op if the event isn't currently enqueued — matching the
    /// "drop() on a non-enqueued event is a no-op" invariant.
    pub fn remove(&mut self, id: EventId) -> Option<EventHandle> {
        let idx = *self.positions.get(&id)?;
        let last = self.heap.len() - 1;
        self.swap(idx, last);
        let removed = self.heap.pop().unwrap();
        self.positions.remove(&id);
        if idx < self.heap.len() {
            self.sift_down(idx);
            self.sift_up(idx);
        }
        Some(removed)
    }

    /// Drains every event from the queue (used by `clearEventQueue`). The
    /// caller is responsible for clearing each returned event's `in_queue`
    /// flag; disposable events with no other owner are deallocated once the
    /// returned `Vec` is dropped.
    pub fn drain_all(&mut self) -> Vec<EventHandle> {
        self.positions.clear();
        self.heap.drain(..).collect()
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.positions.insert(self.heap[i].borrow().id(), i);
        self.positions.insert(self.heap[j].borrow().id(), j);
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.key(i) < self.key(parent) {
                self.swap(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            let right = 2 * i + 2;
            let mut smallest = i;
            if left < self.heap.len() && self.key(left) < self.key(smallest) {
                smallest = left;
            }
            if right < self.heap.len() && self.key(right) < self.key(smallest) {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.swap(i, smallest);
            i = smallest;
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(queue: &mut EventQueue, time: i64, priority: i32) -> EventHandle {
        let id = queue.alloc_event_id();
        Event::new(id, priority, |_, _| Ok(()))
            .tap_post(queue, Tick::new(time))
    }

    trait TapPost {
        fn tap_post(self, queue: &mut EventQueue, at: Tick) -> Self;
    }

    impl TapPost for EventHandle {
        fn tap_post(self, queue: &mut EventQueue, at: Tick) -> Self {
            let order = queue.next_order();
            {
                let mut ev = self.borrow_mut();
                ev.core.time = at;
                ev.core.order = order;
                ev.core.in_queue = true;
            }
            queue.push(self.clone());
            self
        }
    }

    #[test]
    fn head_minimality_time_then_priority_then_order() {
        let mut q = EventQueue::new();
        let a = post(&mut q, 10, 8);
        let b = post(&mut q, 10, 0);
        let c = post(&mut q, 5, 3);
        let head = q.pop_min().unwrap();
        assert_eq!(head.borrow().id(), c.borrow().id());
        let head = q.pop_min().unwrap();
        assert_eq!(head.borrow().id(), b.borrow().id());
        let head = q.pop_min().unwrap();
        assert_eq!(head.borrow().id(), a.borrow().id());
        assert!(q.is_empty());
    }

    #[test]
    fn fifo_at_ties() {
        let mut q = EventQueue::new();
        let a = post(&mut q, 10, 5);
        let b = post(&mut q, 10, 5);
        assert_eq!(q.pop_min().unwrap().borrow().id(), a.borrow().id());
        assert_eq!(q.pop_min().unwrap().borrow().id(), b.borrow().id());
    }

    #[test]
    fn remove_arbitrary_element() {
        let mut q = EventQueue::new();
        let a = post(&mut q, 10, 5);
        let b = post(&mut q, 5, 5);
        let c = post(&mut q, 20, 5);
        let removed_id = b.borrow().id();
        q.remove(removed_id);
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop_min().unwrap().borrow().id(), a.borrow().id());
        assert_eq!(q.pop_min().unwrap().borrow().id(), c.borrow().id());
    }
}
