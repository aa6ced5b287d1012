//! Execution contexts: active objects and bare region-hosting threads.
//!
//! Each context owns one event queue and processes its events one at a time
//! to completion. The dispatcher routes every event by its destination
//! address: to the context's own machine, to one of its regions, or nowhere,
//! in which case it is dropped.

use std::sync::Arc;

use crate::error::FwResult;
use crate::event::{Evt, EvtRef};
use crate::framework::Framework;
use crate::machine::{Machine, StateMachine};
use crate::queue::EventQueue;
use crate::region::{Region, RegionTable};
use crate::signal::Hsmn;

/// Object-safe interface used by the kernel.
pub trait ActiveRunnable: Send {
    fn name(&self) -> &'static str;
    fn priority(&self) -> u8;
    fn queue(&self) -> &Arc<EventQueue>;
    /// Registers the context's own machine and takes every initial
    /// transition.
    fn start(&mut self) -> FwResult<()>;
    /// Runs one event to completion.
    fn dispatch(&mut self, e: EvtRef);

    fn dispatch_one(&mut self) -> bool {
        match self.queue().try_get() {
            Some(e) => {
                self.dispatch(e);
                true
            }
            None => false,
        }
    }

    fn has_events(&self) -> bool {
        !self.queue().is_empty()
    }
}

/// An active object: a primary state machine with its own queue, optionally
/// hosting regions.
pub struct ActiveObject<M: Machine> {
    sm: StateMachine<M>,
    regions: RegionTable,
    queue: Arc<EventQueue>,
    fw: Arc<Framework>,
    priority: u8,
}

impl<M: Machine> ActiveObject<M> {
    pub fn new(
        fw: &Arc<Framework>,
        hsmn: Hsmn,
        name: &'static str,
        priority: u8,
        machine: M,
    ) -> Self {
        Self {
            sm: StateMachine::new(fw, hsmn, name, machine),
            regions: RegionTable::new(),
            queue: Arc::new(EventQueue::new(name, fw.config().event_queue_len)),
            fw: Arc::clone(fw),
            priority,
        }
    }

    pub fn hsmn(&self) -> Hsmn {
        self.sm.hsmn()
    }

    pub fn state(&self) -> Option<M::State> {
        self.sm.state()
    }

    pub fn machine(&self) -> &M {
        self.sm.machine()
    }

    pub fn state_machine(&self) -> &StateMachine<M> {
        &self.sm
    }

    /// Hosts `region` in this active object. Must happen before the kernel
    /// starts processing events.
    pub fn add_region<R: Machine>(&mut self, region: Region<R>) -> FwResult<()> {
        self.regions
            .add(&self.fw, self.sm.name(), region, &self.queue)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Puts `e` at the front of this object's own queue.
    pub fn post_front(&self, e: Evt) {
        if let Err(err) = self.queue.post_lifo(e.into()) {
            panic!("{}: {err}", self.sm.name());
        }
    }
}

impl<M: Machine> ActiveRunnable for ActiveObject<M> {
    fn name(&self) -> &'static str {
        self.sm.name()
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    fn start(&mut self) -> FwResult<()> {
        self.fw
            .registry()
            .register(Arc::clone(self.sm.info()), Arc::clone(&self.queue))?;
        self.sm.attach(Arc::clone(&self.queue));
        self.sm.init();
        self.regions.init_all();
        log::info!("{} started at priority {}", self.sm.name(), self.priority);
        Ok(())
    }

    fn dispatch(&mut self, e: EvtRef) {
        let Some(to) = e.destination() else {
            log::trace!("{}: {} has no destination", self.sm.name(), e.signal());
            return;
        };
        if to == self.sm.hsmn() {
            self.sm.dispatch(&e);
        } else if !self.regions.dispatch(to, &e) {
            log::trace!("{}: {} for {to} not hosted here", self.sm.name(), e.signal());
        }
    }
}

/// A bare thread hosting regions only.
pub struct XThread {
    name: &'static str,
    regions: RegionTable,
    queue: Arc<EventQueue>,
    fw: Arc<Framework>,
    priority: u8,
}

impl XThread {
    pub fn new(fw: &Arc<Framework>, name: &'static str, priority: u8) -> Self {
        Self {
            name,
            regions: RegionTable::new(),
            queue: Arc::new(EventQueue::new(name, fw.config().xthread_queue_len)),
            fw: Arc::clone(fw),
            priority,
        }
    }

    pub fn add_region<R: Machine>(&mut self, region: Region<R>) -> FwResult<()> {
        self.regions.add(&self.fw, self.name, region, &self.queue)
    }

    pub fn region_count(&self) -> usize {
        self.regions.len()
    }
}

impl ActiveRunnable for XThread {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    fn start(&mut self) -> FwResult<()> {
        self.regions.init_all();
        log::info!("{} started at priority {}", self.name, self.priority);
        Ok(())
    }

    fn dispatch(&mut self, e: EvtRef) {
        let Some(to) = e.destination() else {
            return;
        };
        if !self.regions.dispatch(to, &e) {
            log::trace!("{}: {} for {to} not hosted here", self.name, e.signal());
        }
    }
}
