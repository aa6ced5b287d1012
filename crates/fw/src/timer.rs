//! Timers bound to a machine and a timer signal.
//!
//! A [`Timer`] posts a static timer event, addressed to its machine, into the
//! queue of the machine's execution context when it expires. Stopping a timer
//! also neutralizes an expiry that is already queued but not yet dispatched,
//! so a stopped timer's event is never delivered.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::event::{Evt, EvtRef};
use crate::framework::Framework;
use crate::registry::Registry;
use crate::signal::{Hsmn, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    Once,
    Periodic,
}

#[derive(Debug, Default)]
struct TimerState {
    armed: bool,
    remaining: u32,
    interval: u32,
}

pub(crate) struct TimerCore {
    hsmn: Hsmn,
    signal: Signal,
    evt: EvtRef,
    state: Mutex<TimerState>,
}

impl TimerCore {
    /// Counts down one tick and posts on expiry.
    ///
    /// The post happens with the timer locked so that a concurrent stop
    /// either prevents it or finds the event in the queue.
    fn on_tick(&self, registry: &Registry) {
        let mut state = self.state.lock();
        if !state.armed {
            return;
        }
        state.remaining = state.remaining.saturating_sub(1);
        if state.remaining > 0 {
            return;
        }
        if state.interval > 0 {
            state.remaining = state.interval;
        } else {
            state.armed = false;
        }
        match registry.container(self.hsmn) {
            Some(queue) => {
                if let Err(err) = queue.post(self.evt.clone()) {
                    panic!("timer {} for {}: {err}", self.signal, self.hsmn);
                }
            }
            None => log::trace!("timer {} for unregistered {} dropped", self.signal, self.hsmn),
        }
    }
}

/// The set of timers driven by [`Framework::tick`].
#[derive(Default)]
pub struct TimerWheel {
    timers: Mutex<Vec<Weak<TimerCore>>>,
}

impl TimerWheel {
    fn register(&self, core: &Arc<TimerCore>) {
        self.timers.lock().push(Arc::downgrade(core));
    }

    pub(crate) fn tick(&self, registry: &Registry) {
        let live: Vec<Arc<TimerCore>> = {
            let mut timers = self.timers.lock();
            timers.retain(|t| t.strong_count() > 0);
            timers.iter().filter_map(Weak::upgrade).collect()
        };
        for timer in live {
            timer.on_tick(registry);
        }
    }

    /// Number of live timers.
    pub fn len(&self) -> usize {
        self.timers
            .lock()
            .iter()
            .filter(|t| t.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Timer {
    core: Arc<TimerCore>,
    fw: Arc<Framework>,
}

impl Timer {
    /// Creates a stopped timer posting `signal` to `hsmn`.
    ///
    /// # Panics
    ///
    /// Panics unless `signal` is a timer signal.
    pub fn new(fw: &Arc<Framework>, hsmn: Hsmn, signal: Signal) -> Self {
        assert!(signal.is_timer(), "{signal} is not a timer signal");
        let evt = Evt::new_static(signal).with_to(hsmn).with_from(hsmn).into();
        let core = Arc::new(TimerCore {
            hsmn,
            signal,
            evt,
            state: Mutex::new(TimerState::default()),
        });
        fw.timers().register(&core);
        Self {
            core,
            fw: Arc::clone(fw),
        }
    }

    pub fn hsmn(&self) -> Hsmn {
        self.core.hsmn
    }

    pub fn signal(&self) -> Signal {
        self.core.signal
    }

    pub fn is_armed(&self) -> bool {
        self.core.state.lock().armed
    }

    /// Arms the timer. The timeout is rounded up to whole ticks; a running
    /// timer is re-armed.
    pub fn start(&self, timeout_ms: u32, mode: TimerMode) {
        let ticks = self.fw.config().ms_to_ticks(timeout_ms);
        let mut state = self.core.state.lock();
        state.armed = true;
        state.remaining = ticks;
        state.interval = match mode {
            TimerMode::Once => 0,
            TimerMode::Periodic => ticks,
        };
    }

    /// Disarms the timer and cancels any of its expiries still queued.
    pub fn stop(&self) {
        let mut state = self.core.state.lock();
        state.armed = false;
        state.remaining = 0;
        let Some(queue) = self.fw.registry().container(self.core.hsmn) else {
            return;
        };
        let (signal, hsmn) = (self.core.signal, self.core.hsmn);
        let canceled = queue.cancel(|e| e.signal() == signal && e.to() == hsmn);
        if canceled > 0 {
            log::trace!("canceled {canceled} queued {signal} for {hsmn}");
        }
    }

    pub fn restart(&self, timeout_ms: u32, mode: TimerMode) {
        self.stop();
        self.start(timeout_ms, mode);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.stop();
    }
}
