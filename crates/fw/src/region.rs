//! Regions: state machines hosted by another execution context.
//!
//! A region has its own address and is reached through the queue of the
//! active object (or bare thread) hosting it. Hosts keep their regions in a
//! small local [`RegionTable`] and look them up by address on every event.

use std::sync::Arc;

use heapless::Vec;

use crate::error::{FwError, FwResult};
use crate::event::EvtRef;
use crate::framework::Framework;
use crate::machine::{Machine, StateMachine};
use crate::queue::EventQueue;
use crate::registry::HsmInfo;
use crate::signal::Hsmn;

/// Number of regions a single host can carry.
pub const MAX_REGION_COUNT: usize = 8;

/// Object-safe view of a hosted state machine.
pub trait Dispatch: Send {
    fn hsmn(&self) -> Hsmn;
    fn info(&self) -> &Arc<HsmInfo>;
    fn attach(&mut self, container: Arc<EventQueue>);
    fn init(&mut self);
    fn dispatch(&mut self, e: &EvtRef);
}

impl<M: Machine> Dispatch for StateMachine<M> {
    fn hsmn(&self) -> Hsmn {
        StateMachine::hsmn(self)
    }

    fn info(&self) -> &Arc<HsmInfo> {
        StateMachine::info(self)
    }

    fn attach(&mut self, container: Arc<EventQueue>) {
        StateMachine::attach(self, container);
    }

    fn init(&mut self) {
        StateMachine::init(self);
    }

    fn dispatch(&mut self, e: &EvtRef) {
        StateMachine::dispatch(self, e);
    }
}

/// A state machine to be added to a host.
pub struct Region<M: Machine> {
    sm: StateMachine<M>,
}

impl<M: Machine> Region<M> {
    pub fn new(fw: &Arc<Framework>, hsmn: Hsmn, name: &'static str, machine: M) -> Self {
        Self {
            sm: StateMachine::new(fw, hsmn, name, machine),
        }
    }

    pub fn hsmn(&self) -> Hsmn {
        self.sm.hsmn()
    }

    pub fn machine(&self) -> &M {
        self.sm.machine()
    }

    pub fn machine_mut(&mut self) -> &mut M {
        self.sm.machine_mut()
    }

    pub(crate) fn into_dispatch(self) -> Box<dyn Dispatch> {
        Box::new(self.sm)
    }
}

/// Regions of one host, keyed by address.
#[derive(Default)]
pub struct RegionTable {
    regions: Vec<Box<dyn Dispatch>, MAX_REGION_COUNT>,
}

impl RegionTable {
    pub const fn new() -> Self {
        Self {
            regions: Vec::new(),
        }
    }

    /// Registers `region` as hosted behind `container`, then records it
    /// locally.
    pub(crate) fn add<M: Machine>(
        &mut self,
        fw: &Framework,
        host: &'static str,
        region: Region<M>,
        container: &Arc<EventQueue>,
    ) -> FwResult<()> {
        if self.regions.is_full() {
            return Err(FwError::RegionTableFull(host));
        }
        let mut region = region.into_dispatch();
        fw.registry()
            .register(Arc::clone(region.info()), Arc::clone(container))?;
        region.attach(Arc::clone(container));
        log::debug!("{host}: hosting {} ({})", region.info().name(), region.hsmn());
        if self.regions.push(region).is_err() {
            return Err(FwError::RegionTableFull(host));
        }
        Ok(())
    }

    pub(crate) fn init_all(&mut self) {
        for region in self.regions.iter_mut() {
            region.init();
        }
    }

    /// Dispatches to the region at `hsmn`. Returns `false` if this host has
    /// no such region.
    pub(crate) fn dispatch(&mut self, hsmn: Hsmn, e: &EvtRef) -> bool {
        match self.regions.iter_mut().find(|r| r.hsmn() == hsmn) {
            Some(region) => {
                region.dispatch(e);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, hsmn: Hsmn) -> bool {
        self.regions.iter().any(|r| r.hsmn() == hsmn)
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
