//! Event names and the per-machine log switch.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::signal::{Hsmn, Signal, SignalClass, MAX_HSM_COUNT};

const UNDEF: &str = "UNDEF";

#[derive(Debug, Clone, Copy, Default)]
struct EvtSet {
    timer: &'static [&'static str],
    internal: &'static [&'static str],
    interface: &'static [&'static str],
}

/// Event name tables, one set per owning HSM number.
pub struct EvtNames {
    sets: RwLock<[EvtSet; MAX_HSM_COUNT]>,
}

impl Default for EvtNames {
    fn default() -> Self {
        Self {
            sets: RwLock::new([EvtSet::default(); MAX_HSM_COUNT]),
        }
    }
}

impl EvtNames {
    /// Registers names for one class of `hsmn`'s event set, indexed by the
    /// signal index. Invalid addresses are ignored.
    pub fn set(&self, hsmn: Hsmn, class: SignalClass, names: &'static [&'static str]) {
        if !hsmn.is_valid() {
            return;
        }
        let mut sets = self.sets.write();
        let set = &mut sets[hsmn.index()];
        match class {
            SignalClass::Timer => set.timer = names,
            SignalClass::Internal => set.internal = names,
            SignalClass::Interface => set.interface = names,
        }
    }

    pub fn get(&self, signal: Signal) -> &'static str {
        match signal {
            Signal::EMPTY => return "EMPTY",
            Signal::ENTRY => return "ENTRY",
            Signal::EXIT => return "EXIT",
            Signal::INIT => return "INIT",
            Signal::CANCELED => return "CANCELED",
            _ => {}
        }
        let hsmn = signal.hsmn();
        if !hsmn.is_valid() {
            return UNDEF;
        }
        let set = self.sets.read()[hsmn.index()];
        let table = match signal.class() {
            SignalClass::Timer => set.timer,
            SignalClass::Internal => set.internal,
            SignalClass::Interface => set.interface,
        };
        table.get(signal.index() as usize).copied().unwrap_or(UNDEF)
    }
}

/// Bit set selecting which machines have event logging switched on.
#[derive(Debug, Default)]
pub struct LogMask(AtomicU64);

impl LogMask {
    fn bit(hsmn: Hsmn) -> u64 {
        if hsmn.is_valid() {
            1 << hsmn.index()
        } else {
            0
        }
    }

    pub fn on(&self, hsmn: Hsmn) {
        self.0.fetch_or(Self::bit(hsmn), Ordering::Relaxed);
    }

    pub fn off(&self, hsmn: Hsmn) {
        self.0.fetch_and(!Self::bit(hsmn), Ordering::Relaxed);
    }

    pub fn on_all(&self) {
        self.0.store(u64::MAX, Ordering::Relaxed);
    }

    pub fn off_all(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    pub fn is_on(&self, hsmn: Hsmn) -> bool {
        self.0.load(Ordering::Relaxed) & Self::bit(hsmn) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Hsmn = Hsmn(3);
    static TIMER_NAMES: [&str; 2] = ["STATE_TIMER", "IDLE_TIMER"];
    static IFACE_NAMES: [&str; 1] = ["START_REQ"];

    #[test]
    fn names_by_class_and_index() {
        let names = EvtNames::default();
        names.set(OWNER, SignalClass::Timer, &TIMER_NAMES);
        names.set(OWNER, SignalClass::Interface, &IFACE_NAMES);

        assert_eq!(names.get(Signal::timer(OWNER, 1)), "IDLE_TIMER");
        assert_eq!(names.get(Signal::interface(OWNER, 0)), "START_REQ");
        assert_eq!(names.get(Signal::interface(OWNER, 1)), "UNDEF");
        assert_eq!(names.get(Signal::internal(OWNER, 0)), "UNDEF");
        assert_eq!(names.get(Signal::EXIT), "EXIT");
    }

    #[test]
    fn log_mask_bits() {
        let mask = LogMask::default();
        assert!(!mask.is_on(OWNER));
        mask.on(OWNER);
        assert!(mask.is_on(OWNER));
        assert!(!mask.is_on(Hsmn(4)));
        mask.on_all();
        mask.off(OWNER);
        assert!(!mask.is_on(OWNER));
        assert!(mask.is_on(Hsmn(63)));
        assert!(!mask.is_on(Hsmn::UNDEF));
        mask.off_all();
        assert!(!mask.is_on(Hsmn(63)));
    }
}
