//! Addresses and event sets of the demo.

use fw::{Framework, Hsmn, Signal, SignalClass};

pub const SYSTEM: Hsmn = Hsmn(1);
pub const COMPOSITE: Hsmn = Hsmn(2);
/// First subsystem region. The others follow contiguously.
pub const SUBSYSTEM: Hsmn = Hsmn(3);
pub const SUBSYSTEM_COUNT: u8 = 3;

pub const fn subsystem_hsmn(index: u8) -> Hsmn {
    Hsmn(SUBSYSTEM.0 + index)
}

pub mod system {
    use super::*;

    pub const STATE_TIMER: Signal = Signal::timer(SYSTEM, 0);
    pub const HOLD_TIMER: Signal = Signal::timer(SYSTEM, 1);

    pub const TIMER_NAMES: &[&str] = &["SYSTEM_STATE_TIMER", "SYSTEM_HOLD_TIMER"];
}

pub mod composite {
    use super::*;

    pub const STATE_TIMER: Signal = Signal::timer(COMPOSITE, 0);

    pub const DONE: Signal = Signal::internal(COMPOSITE, 0);
    pub const FAILED: Signal = Signal::internal(COMPOSITE, 1);

    pub const START_REQ: Signal = Signal::interface(COMPOSITE, 0);
    pub const START_CFM: Signal = Signal::interface(COMPOSITE, 1);
    pub const STOP_REQ: Signal = Signal::interface(COMPOSITE, 2);
    pub const STOP_CFM: Signal = Signal::interface(COMPOSITE, 3);

    pub const START_TIMEOUT_MS: u32 = 600;
    pub const STOP_TIMEOUT_MS: u32 = 600;

    pub const TIMER_NAMES: &[&str] = &["COMPOSITE_STATE_TIMER"];
    pub const INTERNAL_NAMES: &[&str] = &["COMPOSITE_DONE", "COMPOSITE_FAILED"];
    pub const INTERFACE_NAMES: &[&str] = &[
        "COMPOSITE_START_REQ",
        "COMPOSITE_START_CFM",
        "COMPOSITE_STOP_REQ",
        "COMPOSITE_STOP_CFM",
    ];
}

/// Shared by every subsystem region; the event set is owned by the first.
pub mod subsystem {
    use super::*;

    pub const STATE_TIMER: Signal = Signal::timer(SUBSYSTEM, 0);

    pub const START_REQ: Signal = Signal::interface(SUBSYSTEM, 0);
    pub const START_CFM: Signal = Signal::interface(SUBSYSTEM, 1);
    pub const STOP_REQ: Signal = Signal::interface(SUBSYSTEM, 2);
    pub const STOP_CFM: Signal = Signal::interface(SUBSYSTEM, 3);

    pub const TIMER_NAMES: &[&str] = &["SUBSYSTEM_STATE_TIMER"];
    pub const INTERFACE_NAMES: &[&str] = &[
        "SUBSYSTEM_START_REQ",
        "SUBSYSTEM_START_CFM",
        "SUBSYSTEM_STOP_REQ",
        "SUBSYSTEM_STOP_CFM",
    ];
}

pub fn register_names(fw: &Framework) {
    fw.set_evt_names(SYSTEM, SignalClass::Timer, system::TIMER_NAMES);
    fw.set_evt_names(COMPOSITE, SignalClass::Timer, composite::TIMER_NAMES);
    fw.set_evt_names(COMPOSITE, SignalClass::Internal, composite::INTERNAL_NAMES);
    fw.set_evt_names(COMPOSITE, SignalClass::Interface, composite::INTERFACE_NAMES);
    fw.set_evt_names(SUBSYSTEM, SignalClass::Timer, subsystem::TIMER_NAMES);
    fw.set_evt_names(SUBSYSTEM, SignalClass::Interface, subsystem::INTERFACE_NAMES);
}
