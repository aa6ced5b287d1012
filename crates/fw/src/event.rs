//! Event primitives and the ownership model.
//!
//! An [`Evt`] is built and addressed by its sender while it is still
//! exclusively owned. Posting freezes it into an [`EvtRef`], a cheaply
//! clonable shared handle. Each queue entry, deferred entry or in-flight
//! dispatch holds one reference; the pool block of a dynamic event goes back
//! to its pool when the last reference drops.
//!
//! *Static* events (timer events, the canceled placeholder and the engine
//! signals) have no pool block. They may be queued but never deferred or
//! raised.

use core::fmt;
use std::any::Any;
use std::mem::size_of;
use std::ops::Deref;
use std::sync::Arc;

use once_cell::sync::Lazy;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, FwResult, Reason};
use crate::pool::{Block, EventPools};
use crate::signal::{Hsmn, Sequence, Signal};

/// Routing header shared by all events.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvtHeader {
    pub signal: Signal,
    pub to: Hsmn,
    pub from: Hsmn,
    pub seq: Sequence,
}

impl EvtHeader {
    pub const fn new(signal: Signal) -> Self {
        Self {
            signal,
            to: Hsmn::UNDEF,
            from: Hsmn::UNDEF,
            seq: 0,
        }
    }

    pub const fn with_route(signal: Signal, to: Hsmn, from: Hsmn, seq: Sequence) -> Self {
        Self {
            signal,
            to,
            from,
            seq,
        }
    }
}

/// Error triple carried by confirmation and response events.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ErrorInfo {
    pub error: ErrorCode,
    pub origin: Hsmn,
    pub reason: Reason,
}

impl ErrorInfo {
    pub const fn new(error: ErrorCode, origin: Hsmn, reason: Reason) -> Self {
        Self {
            error,
            origin,
            reason,
        }
    }
}

/// Type-erased event payload.
pub type DynPayload = Box<dyn Any + Send + Sync>;

/// Bytes accounted against a pool block for every event.
pub const EVT_HEADER_SIZE: usize = size_of::<EvtHeader>() + size_of::<ErrorInfo>();

/// An event under construction, exclusively owned by its creator.
pub struct Evt {
    header: EvtHeader,
    error: Option<ErrorInfo>,
    payload: Option<DynPayload>,
    block: Option<Block>,
}

impl Evt {
    /// Allocates a dynamic event without payload.
    pub fn new(pools: &EventPools, signal: Signal) -> FwResult<Self> {
        Self::alloc(pools, signal, None, 0)
    }

    /// Allocates a dynamic event carrying `payload`.
    pub fn with_payload<T: Any + Send + Sync>(
        pools: &EventPools,
        signal: Signal,
        payload: T,
    ) -> FwResult<Self> {
        Self::alloc(pools, signal, Some(Box::new(payload)), size_of::<T>())
    }

    /// Creates a static event, owned by no pool.
    pub fn new_static(signal: Signal) -> Self {
        Self {
            header: EvtHeader::new(signal),
            error: None,
            payload: None,
            block: None,
        }
    }

    fn alloc(
        pools: &EventPools,
        signal: Signal,
        payload: Option<DynPayload>,
        payload_size: usize,
    ) -> FwResult<Self> {
        let block = pools.alloc(EVT_HEADER_SIZE + payload_size)?;
        Ok(Self {
            header: EvtHeader::new(signal),
            error: None,
            payload,
            block: Some(block),
        })
    }

    pub fn with_error(mut self, error: ErrorCode, origin: Hsmn, reason: Reason) -> Self {
        self.error = Some(ErrorInfo::new(error, origin, reason));
        self
    }

    pub fn with_to(mut self, to: Hsmn) -> Self {
        self.header.to = to;
        self
    }

    pub fn with_from(mut self, from: Hsmn) -> Self {
        self.header.from = from;
        self
    }

    pub fn header(&self) -> &EvtHeader {
        &self.header
    }

    pub fn signal(&self) -> Signal {
        self.header.signal
    }

    pub fn to(&self) -> Hsmn {
        self.header.to
    }

    pub fn from(&self) -> Hsmn {
        self.header.from
    }

    pub fn seq(&self) -> Sequence {
        self.header.seq
    }

    pub fn set_to(&mut self, to: Hsmn) {
        self.header.to = to;
    }

    pub fn set_from(&mut self, from: Hsmn) {
        self.header.from = from;
    }

    pub fn set_seq(&mut self, seq: Sequence) {
        self.header.seq = seq;
    }

    pub fn error_info(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }

    pub fn set_error(&mut self, error: ErrorCode, origin: Hsmn, reason: Reason) {
        self.error = Some(ErrorInfo::new(error, origin, reason));
    }

    /// Error code, `Success` for events that carry none.
    pub fn error(&self) -> ErrorCode {
        self.error.map(|e| e.error).unwrap_or_default()
    }

    pub fn payload<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref()?.downcast_ref()
    }

    pub fn payload_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.payload.as_deref_mut()?.downcast_mut()
    }

    pub fn is_pooled(&self) -> bool {
        self.block.is_some()
    }

    /// Pool the event was drawn from; 0 for static events.
    pub fn pool_id(&self) -> u8 {
        self.block.as_ref().map_or(0, Block::pool_id)
    }

    /// Address the dispatcher routes this event to.
    ///
    /// Events whose signal carries no owning HSM number (the engine signals
    /// and the canceled placeholder) have no destination and are discarded.
    pub fn destination(&self) -> Option<Hsmn> {
        if !self.header.signal.hsmn().is_defined() {
            return None;
        }
        self.header.to.is_defined().then_some(self.header.to)
    }

    /// `true` when `other` has the same signal and route endpoints.
    pub fn same_route(&self, other: &Evt) -> bool {
        self.header.signal == other.header.signal
            && self.header.to == other.header.to
            && self.header.from == other.header.from
    }
}

impl fmt::Debug for Evt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evt")
            .field("header", &self.header)
            .field("error", &self.error)
            .field("pool_id", &self.pool_id())
            .finish_non_exhaustive()
    }
}

/// Shared, frozen handle to a posted event.
#[derive(Clone)]
pub struct EvtRef(Arc<Evt>);

impl EvtRef {
    /// Number of live references, including this one.
    pub fn ref_count(this: &Self) -> usize {
        Arc::strong_count(&this.0)
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// The placeholder substituted for canceled timer events.
    pub fn canceled() -> Self {
        CANCELED_EVT.clone()
    }
}

impl From<Evt> for EvtRef {
    fn from(evt: Evt) -> Self {
        Self(Arc::new(evt))
    }
}

impl Deref for EvtRef {
    type Target = Evt;

    fn deref(&self) -> &Evt {
        &self.0
    }
}

impl fmt::Debug for EvtRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

static CANCELED_EVT: Lazy<EvtRef> = Lazy::new(|| Evt::new_static(Signal::CANCELED).into());
pub(crate) static ENTRY_EVT: Lazy<EvtRef> = Lazy::new(|| Evt::new_static(Signal::ENTRY).into());
pub(crate) static EXIT_EVT: Lazy<EvtRef> = Lazy::new(|| Evt::new_static(Signal::EXIT).into());
pub(crate) static INIT_EVT: Lazy<EvtRef> = Lazy::new(|| Evt::new_static(Signal::INIT).into());
