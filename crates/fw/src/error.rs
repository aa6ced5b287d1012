//! Framework errors and the application-level error taxonomy.

use core::fmt;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signal::Hsmn;

/// Application-level outcome carried by confirmation events.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    #[default]
    Success,
    Unspec,
    Aborted,
    Timeout,
    Hal,
    Hardware,
    Hsmn,
    State,
    Unavail,
    Param,
    Network,
    Auth,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 12] = [
        Self::Success,
        Self::Unspec,
        Self::Aborted,
        Self::Timeout,
        Self::Hal,
        Self::Hardware,
        Self::Hsmn,
        Self::State,
        Self::Unavail,
        Self::Param,
        Self::Network,
        Self::Auth,
    ];

    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Wire name as used in [`ErrorMsg`](crate::msg::ErrorMsg) records.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Unspec => "UNSPEC",
            Self::Aborted => "ABORTED",
            Self::Timeout => "TIMEOUT",
            Self::Hal => "HAL",
            Self::Hardware => "HARDWARE",
            Self::Hsmn => "HSMN",
            Self::State => "STATE",
            Self::Unavail => "UNAVAIL",
            Self::Param => "PARAM",
            Self::Network => "NETWORK",
            Self::Auth => "AUTH",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.name() == name)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Application-specific refinement of an [`ErrorCode`].
pub type Reason = u16;

/// Recoverable framework errors.
///
/// These are reported at setup time. Runtime contract violations such as a
/// reminder overflow panic instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FwError {
    #[error("{0} is undefined or outside the registry")]
    InvalidHsmn(Hsmn),
    #[error("{0} is already registered")]
    DuplicateHsmn(Hsmn),
    #[error("region table of {0} is full")]
    RegionTableFull(&'static str),
    #[error("no event pool has blocks of {0} bytes")]
    EventTooLarge(usize),
    #[error("event pool {0} is exhausted")]
    PoolExhausted(u8),
    #[error("event queue of {0} is full")]
    QueueFull(&'static str),
    #[error("priority {0} is used by more than one execution context")]
    DuplicatePriority(u8),
    #[error("cannot spawn the thread of {0}")]
    Spawn(&'static str),
}

pub type FwResult<T> = Result<T, FwError>;
