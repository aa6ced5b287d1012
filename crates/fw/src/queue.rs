//! Event queue of an execution context.
//!
//! A bounded FIFO of shared event handles with LIFO insertion, blocking
//! retrieval and the in-place cancellation used by timers. Every operation
//! runs under the queue's lock, so readers and writers on different threads
//! observe each operation atomically.

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::error::{FwError, FwResult};
use crate::event::{Evt, EvtRef};

struct QueueState {
    events: VecDeque<EvtRef>,
    min_free: usize,
}

impl QueueState {
    fn note_len(&mut self, capacity: usize) {
        self.min_free = self.min_free.min(capacity - self.events.len());
    }
}

pub struct EventQueue {
    name: &'static str,
    capacity: usize,
    state: Mutex<QueueState>,
    ready: Condvar,
}

impl EventQueue {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity,
            state: Mutex::new(QueueState {
                events: VecDeque::with_capacity(capacity),
                min_free: capacity,
            }),
            ready: Condvar::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Post an event to the back of the queue (FIFO).
    pub fn post(&self, event: EvtRef) -> FwResult<()> {
        self.insert(event, false)
    }

    /// Post an event to the front of the queue (LIFO).
    pub fn post_lifo(&self, event: EvtRef) -> FwResult<()> {
        self.insert(event, true)
    }

    fn insert(&self, event: EvtRef, front: bool) -> FwResult<()> {
        let mut state = self.state.lock();
        if state.events.len() >= self.capacity {
            return Err(FwError::QueueFull(self.name));
        }
        if front {
            state.events.push_front(event);
        } else {
            state.events.push_back(event);
        }
        state.note_len(self.capacity);
        drop(state);
        self.ready.notify_one();
        Ok(())
    }

    /// Posts `event` unless an event with the same signal and route is
    /// already pending. Returns whether it was posted.
    pub fn post_unless_queued(&self, event: EvtRef) -> FwResult<bool> {
        let mut state = self.state.lock();
        if state.events.iter().any(|e| e.same_route(&event)) {
            return Ok(false);
        }
        if state.events.len() >= self.capacity {
            return Err(FwError::QueueFull(self.name));
        }
        state.events.push_back(event);
        state.note_len(self.capacity);
        drop(state);
        self.ready.notify_one();
        Ok(true)
    }

    /// Puts a batch back at the front of the queue, keeping its order.
    pub fn post_front_batch<I>(&self, events: I) -> FwResult<()>
    where
        I: IntoIterator<Item = EvtRef>,
    {
        let batch: Vec<EvtRef> = events.into_iter().collect();
        if batch.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock();
        if state.events.len() + batch.len() > self.capacity {
            return Err(FwError::QueueFull(self.name));
        }
        for event in batch.into_iter().rev() {
            state.events.push_front(event);
        }
        state.note_len(self.capacity);
        drop(state);
        self.ready.notify_one();
        Ok(())
    }

    /// Blocks until an event is available.
    pub fn get(&self) -> EvtRef {
        let mut state = self.state.lock();
        loop {
            if let Some(event) = state.events.pop_front() {
                return event;
            }
            self.ready.wait(&mut state);
        }
    }

    /// Waits up to `timeout` for an event.
    pub fn get_timeout(&self, timeout: Duration) -> Option<EvtRef> {
        let mut state = self.state.lock();
        if state.events.is_empty() {
            self.ready.wait_for(&mut state, timeout);
        }
        state.events.pop_front()
    }

    pub fn try_get(&self) -> Option<EvtRef> {
        self.state.lock().events.pop_front()
    }

    /// Replaces every pending event matching `pred` with the inert canceled
    /// placeholder and returns how many were replaced.
    ///
    /// # Panics
    ///
    /// Panics if a matched event is not a static timer event.
    pub fn cancel<F>(&self, pred: F) -> usize
    where
        F: Fn(&Evt) -> bool,
    {
        let mut state = self.state.lock();
        let mut canceled = 0;
        for slot in state.events.iter_mut() {
            if pred(&**slot) {
                assert!(
                    slot.signal().is_timer() && !slot.is_pooled(),
                    "only static timer events can be canceled in {}",
                    self.name
                );
                *slot = EvtRef::canceled();
                canceled += 1;
            }
        }
        canceled
    }

    pub fn len(&self) -> usize {
        self.state.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fewest free entries observed since creation.
    pub fn min_free(&self) -> usize {
        self.state.lock().min_free
    }

    /// Signals of the pending events, front first.
    pub fn pending_signals(&self) -> Vec<crate::signal::Signal> {
        self.state.lock().events.iter().map(|e| e.signal()).collect()
    }
}

impl core::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventQueue")
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::signal::{Hsmn, Signal};

    fn evt(sig: u8) -> EvtRef {
        Evt::new_static(Signal::interface(Hsmn(1), sig))
            .with_to(Hsmn(1))
            .into()
    }

    fn timer_evt(sig: u8, to: Hsmn) -> EvtRef {
        Evt::new_static(Signal::timer(Hsmn(1), sig)).with_to(to).into()
    }

    #[test]
    fn fifo_and_lifo() {
        let q = EventQueue::new("q", 4);
        q.post(evt(1)).unwrap();
        q.post(evt(2)).unwrap();
        q.post_lifo(evt(3)).unwrap();
        let order: Vec<u8> = std::iter::from_fn(|| q.try_get())
            .map(|e| e.signal().index())
            .collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn full_queue_rejects() {
        let q = EventQueue::new("q", 2);
        q.post(evt(1)).unwrap();
        q.post(evt(2)).unwrap();
        assert_eq!(q.post(evt(3)), Err(FwError::QueueFull("q")));
        assert_eq!(q.min_free(), 0);
    }

    #[test]
    fn front_batch_keeps_order() {
        let q = EventQueue::new("q", 8);
        q.post(evt(9)).unwrap();
        q.post_front_batch(vec![evt(1), evt(2), evt(3)]).unwrap();
        let order: Vec<u8> = std::iter::from_fn(|| q.try_get())
            .map(|e| e.signal().index())
            .collect();
        assert_eq!(order, vec![1, 2, 3, 9]);
    }

    #[test]
    fn coalesces_same_route() {
        let q = EventQueue::new("q", 4);
        assert!(q.post_unless_queued(evt(1)).unwrap());
        assert!(!q.post_unless_queued(evt(1)).unwrap());
        assert!(q.post_unless_queued(evt(2)).unwrap());
        let from_other: EvtRef = Evt::new_static(Signal::interface(Hsmn(1), 1))
            .with_to(Hsmn(1))
            .with_from(Hsmn(3))
            .into();
        assert!(q.post_unless_queued(from_other).unwrap());
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn cancel_replaces_in_place() {
        let q = EventQueue::new("q", 4);
        q.post(timer_evt(1, Hsmn(2))).unwrap();
        q.post(evt(5)).unwrap();
        q.post(timer_evt(1, Hsmn(3))).unwrap();

        let n = q.cancel(|e| e.signal() == Signal::timer(Hsmn(1), 1) && e.to() == Hsmn(2));
        assert_eq!(n, 1);
        assert_eq!(q.len(), 3);
        assert_eq!(
            q.pending_signals(),
            vec![
                Signal::CANCELED,
                Signal::interface(Hsmn(1), 5),
                Signal::timer(Hsmn(1), 1)
            ]
        );
    }

    #[test]
    fn get_blocks_until_post() {
        let q = Arc::new(EventQueue::new("q", 4));
        let producer = {
            let q = Arc::clone(&q);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                q.post(evt(7)).unwrap();
            })
        };
        assert_eq!(q.get().signal().index(), 7);
        producer.join().unwrap();
        assert!(q.get_timeout(Duration::from_millis(5)).is_none());
    }
}
