//! Per-machine deferred event queue.

use heapless::{Deque, Vec};

use crate::event::EvtRef;

pub const DEFER_QUEUE_COUNT: usize = 16;

/// Holds events a machine cannot handle in its current state until it asks
/// for them back with a recall.
#[derive(Default)]
pub struct DeferQueue {
    events: Deque<EvtRef, DEFER_QUEUE_COUNT>,
}

impl DeferQueue {
    pub const fn new() -> Self {
        Self {
            events: Deque::new(),
        }
    }

    /// Keeps a reference to `event`. Returns `false` when the queue is full.
    ///
    /// # Panics
    ///
    /// Panics if `event` is static.
    pub fn defer(&mut self, event: &EvtRef) -> bool {
        if self.events.is_full() {
            return false;
        }
        assert!(
            event.is_pooled(),
            "static event {} cannot be deferred",
            event.signal()
        );
        // Capacity checked above.
        let _ = self.events.push_back(event.clone());
        true
    }

    /// Removes all deferred events, oldest first.
    pub fn take_all(&mut self) -> Vec<EvtRef, DEFER_QUEUE_COUNT> {
        let mut out = Vec::new();
        while let Some(event) = self.events.pop_front() {
            let _ = out.push(event);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Evt;
    use crate::pool::{EventPools, PoolConfig};
    use crate::signal::{Hsmn, Signal};

    #[test]
    fn defer_until_full_then_take_in_order() {
        let pools = EventPools::new(&[PoolConfig::new(32, 32)]);
        let mut dq = DeferQueue::new();
        for i in 0..DEFER_QUEUE_COUNT as u8 {
            let e: EvtRef = Evt::new(&pools, Signal::interface(Hsmn(1), i)).unwrap().into();
            assert!(dq.defer(&e));
        }
        let extra: EvtRef = Evt::new(&pools, Signal::interface(Hsmn(1), 99)).unwrap().into();
        assert!(!dq.defer(&extra));
        assert_eq!(EvtRef::ref_count(&extra), 1);

        let taken = dq.take_all();
        assert!(dq.is_empty());
        let order: std::vec::Vec<u8> = taken.iter().map(|e| e.signal().index()).collect();
        assert_eq!(order, (0..DEFER_QUEUE_COUNT as u8).collect::<std::vec::Vec<_>>());
    }

    #[test]
    #[should_panic(expected = "cannot be deferred")]
    fn static_events_cannot_be_deferred() {
        let e: EvtRef = Evt::new_static(Signal::interface(Hsmn(1), 0)).into();
        DeferQueue::new().defer(&e);
    }
}
