//! Process-wide framework services.
//!
//! One [`Framework`] is shared by every execution context. It owns the
//! address registry, the event pools, the timer wheel and the diagnostic
//! tables, and implements address-based posting.

use std::sync::Arc;

use crate::config::FwConfig;
use crate::event::{Evt, EvtRef};
use crate::names::{EvtNames, LogMask};
use crate::pool::EventPools;
use crate::registry::{HsmInfo, Registry};
use crate::signal::{Hsmn, Signal, SignalClass};
use crate::timer::TimerWheel;

pub struct Framework {
    config: FwConfig,
    registry: Registry,
    pools: EventPools,
    timers: TimerWheel,
    names: EvtNames,
    log: LogMask,
}

impl Framework {
    pub fn new(config: FwConfig) -> Arc<Self> {
        log::info!("{}: {} event pools", config.name, config.pools.len());
        Arc::new(Self {
            pools: EventPools::new(&config.pools),
            registry: Registry::new(),
            timers: TimerWheel::default(),
            names: EvtNames::default(),
            log: LogMask::default(),
            config,
        })
    }

    pub fn config(&self) -> &FwConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn pools(&self) -> &EventPools {
        &self.pools
    }

    pub fn timers(&self) -> &TimerWheel {
        &self.timers
    }

    /// Delivers `event` to the queue hosting its destination.
    ///
    /// Events for undefined or unregistered addresses are dropped, which
    /// releases them.
    ///
    /// # Panics
    ///
    /// Panics if the destination queue is full.
    pub fn post(&self, event: EvtRef) {
        let to = event.to();
        let Some(queue) = self.registry.container(to) else {
            log::trace!("{} to {to} discarded", self.evt_name(event.signal()));
            return;
        };
        if let Err(err) = queue.post(event) {
            panic!("posting to {to}: {err}");
        }
    }

    /// Like [`post`](Self::post), but the event goes to the front of the
    /// destination queue.
    pub fn post_front(&self, event: EvtRef) {
        let to = event.to();
        let Some(queue) = self.registry.container(to) else {
            log::trace!("{} to {to} discarded", self.evt_name(event.signal()));
            return;
        };
        if let Err(err) = queue.post_lifo(event) {
            panic!("posting to {to}: {err}");
        }
    }

    /// Posts `event` unless one with the same signal and route is already
    /// queued at the destination. Returns whether it was posted.
    pub fn post_not_in_queue(&self, event: EvtRef) -> bool {
        let to = event.to();
        let Some(queue) = self.registry.container(to) else {
            return false;
        };
        match queue.post_unless_queued(event) {
            Ok(posted) => posted,
            Err(err) => panic!("posting to {to}: {err}"),
        }
    }

    /// Advances every timer by one tick.
    pub fn tick(&self) {
        self.timers.tick(&self.registry);
    }

    pub fn hsm_name(&self, hsmn: Hsmn) -> &'static str {
        self.registry.info(hsmn).map_or("UNDEF", |i| i.name())
    }

    /// Current state name of a registered machine.
    pub fn state_of(&self, hsmn: Hsmn) -> Option<&'static str> {
        self.registry.info(hsmn).map(|i| i.state())
    }

    pub fn set_evt_names(&self, hsmn: Hsmn, class: SignalClass, names: &'static [&'static str]) {
        self.names.set(hsmn, class, names);
    }

    pub fn evt_name(&self, signal: Signal) -> &'static str {
        self.names.get(signal)
    }

    pub fn log_on(&self, hsmn: Hsmn) {
        self.log.on(hsmn);
    }

    pub fn log_off(&self, hsmn: Hsmn) {
        self.log.off(hsmn);
    }

    pub fn log_on_all(&self) {
        self.log.on_all();
    }

    pub fn log_off_all(&self) {
        self.log.off_all();
    }

    pub fn is_log_on(&self, hsmn: Hsmn) -> bool {
        self.log.is_on(hsmn)
    }

    pub(crate) fn log_event(&self, hsm: &HsmInfo, event: &Evt) {
        if !self.log.is_on(hsm.hsmn()) {
            return;
        }
        log::debug!(
            target: hsm.name(),
            "{} {} from {} seq={} in {}",
            self.evt_name(event.signal()),
            event.signal(),
            self.hsm_name(event.from()),
            event.seq(),
            hsm.state(),
        );
    }
}
