//! Addresses and signals.
//!
//! Every state machine in the system is identified by a small integer, its
//! *HSM number* ([`Hsmn`]). Signals are 16 bits wide: the high byte names the
//! HSM number owning the event set, the low byte encodes the event class and
//! an index within that class.
//!
//! ```text
//!  15            8 7 6 5           0
//! +---------------+---+-------------+
//! |     hsmn      |cls|    index    |
//! +---------------+---+-------------+
//!   cls = 00 timer, 01 internal, 1x interface (7-bit index)
//! ```

use core::fmt;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of addressable state machines.
pub const MAX_HSM_COUNT: usize = 64;

/// Sequence number stamped on requests and echoed on confirmations.
///
/// Sequence numbers wrap around; equality is the only meaningful comparison.
pub type Sequence = u16;

/// Address of a state machine.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hsmn(pub u8);

impl Hsmn {
    /// The reserved "no machine" address.
    pub const UNDEF: Hsmn = Hsmn(0);

    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// `true` for any address other than [`Hsmn::UNDEF`].
    pub const fn is_defined(self) -> bool {
        self.0 != Self::UNDEF.0
    }

    /// `true` when the address is defined and fits in the registry.
    pub const fn is_valid(self) -> bool {
        self.is_defined() && (self.0 as usize) < MAX_HSM_COUNT
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<u8> for Hsmn {
    #[inline]
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for Hsmn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HSM({})", self.0)
    }
}

/// Class of a signal, decoded from bits 7..6 of its low byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalClass {
    Timer,
    Internal,
    Interface,
}

const CLASS_SHIFT: u16 = 6;
const INTERNAL_BITS: u16 = 0x40;
const INTERFACE_BITS: u16 = 0x80;
const INDEX_MASK: u16 = 0x3F;
const INTERFACE_INDEX_MASK: u16 = 0x7F;

/// Identifier of an event type.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signal(pub u16);

impl Signal {
    pub const EMPTY: Signal = Signal(0);
    pub const ENTRY: Signal = Signal(1);
    pub const EXIT: Signal = Signal(2);
    pub const INIT: Signal = Signal(3);
    /// Inert placeholder left behind when a queued timer event is canceled.
    pub const CANCELED: Signal = Signal(4);

    pub const fn timer(hsmn: Hsmn, index: u8) -> Self {
        Self(((hsmn.0 as u16) << 8) | (index as u16 & INDEX_MASK))
    }

    pub const fn internal(hsmn: Hsmn, index: u8) -> Self {
        Self(((hsmn.0 as u16) << 8) | INTERNAL_BITS | (index as u16 & INDEX_MASK))
    }

    pub const fn interface(hsmn: Hsmn, index: u8) -> Self {
        Self(((hsmn.0 as u16) << 8) | INTERFACE_BITS | (index as u16 & INTERFACE_INDEX_MASK))
    }

    /// HSM number owning the event set this signal belongs to.
    pub const fn hsmn(self) -> Hsmn {
        Hsmn((self.0 >> 8) as u8)
    }

    pub const fn class(self) -> SignalClass {
        match (self.0 >> CLASS_SHIFT) & 0x3 {
            0 => SignalClass::Timer,
            1 => SignalClass::Internal,
            _ => SignalClass::Interface,
        }
    }

    pub const fn index(self) -> u8 {
        match self.class() {
            SignalClass::Interface => (self.0 & INTERFACE_INDEX_MASK) as u8,
            _ => (self.0 & INDEX_MASK) as u8,
        }
    }

    /// `true` for timer-class signals of a defined event set.
    pub const fn is_timer(self) -> bool {
        self.hsmn().is_defined() && matches!(self.class(), SignalClass::Timer)
    }

    /// `true` for the engine signals `EMPTY`, `ENTRY`, `EXIT` and `INIT`.
    pub const fn is_reserved(self) -> bool {
        self.0 <= Self::INIT.0
    }
}

impl From<u16> for Signal {
    #[inline]
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SIG({:#06x})", self.0)
    }
}
