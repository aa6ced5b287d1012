//! Address registry.
//!
//! Maps each HSM number to the machine's descriptor and the queue of the
//! execution context hosting it. Slots are write-once: they are filled during
//! setup and read lock-free afterwards by any thread.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{FwError, FwResult};
use crate::queue::EventQueue;
use crate::signal::{Hsmn, MAX_HSM_COUNT};

/// Name and current state of a registered machine.
#[derive(Debug)]
pub struct HsmInfo {
    hsmn: Hsmn,
    name: &'static str,
    state: Mutex<&'static str>,
}

impl HsmInfo {
    pub fn new(hsmn: Hsmn, name: &'static str) -> Self {
        Self {
            hsmn,
            name,
            state: Mutex::new("UNDEF"),
        }
    }

    pub fn hsmn(&self) -> Hsmn {
        self.hsmn
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> &'static str {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: &'static str) {
        *self.state.lock() = state;
    }
}

/// A resolved registry entry.
#[derive(Debug)]
pub struct HsmSlot {
    info: Arc<HsmInfo>,
    container: Arc<EventQueue>,
}

impl HsmSlot {
    pub fn info(&self) -> &Arc<HsmInfo> {
        &self.info
    }

    /// Queue of the execution context hosting the machine.
    pub fn container(&self) -> &Arc<EventQueue> {
        &self.container
    }
}

pub struct Registry {
    slots: [OnceCell<HsmSlot>; MAX_HSM_COUNT],
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| OnceCell::new()),
        }
    }

    /// Binds a machine to the queue of its execution context.
    pub fn register(&self, info: Arc<HsmInfo>, container: Arc<EventQueue>) -> FwResult<()> {
        let hsmn = info.hsmn();
        if !hsmn.is_valid() {
            return Err(FwError::InvalidHsmn(hsmn));
        }
        self.slots[hsmn.index()]
            .set(HsmSlot { info, container })
            .map_err(|_| FwError::DuplicateHsmn(hsmn))?;
        log::debug!("registered {hsmn}");
        Ok(())
    }

    /// Looks up an address. Undefined and unregistered addresses resolve to
    /// `None`.
    pub fn resolve(&self, hsmn: Hsmn) -> Option<&HsmSlot> {
        if !hsmn.is_valid() {
            return None;
        }
        self.slots[hsmn.index()].get()
    }

    pub fn container(&self, hsmn: Hsmn) -> Option<&Arc<EventQueue>> {
        self.resolve(hsmn).map(HsmSlot::container)
    }

    pub fn info(&self, hsmn: Hsmn) -> Option<&Arc<HsmInfo>> {
        self.resolve(hsmn).map(HsmSlot::info)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HsmSlot> + '_ {
        self.slots.iter().filter_map(OnceCell::get)
    }
}
