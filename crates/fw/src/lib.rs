//! # fw
//!
//! An active object runtime for hierarchical state machines. Every machine
//! has a small integer address; events are posted by address into the queue
//! of the execution context hosting the destination, and each context runs
//! its events to completion one at a time.
//!
//! On top of plain messaging the runtime provides the coordination
//! primitives long-running control software needs: reminders a machine
//! raises to itself, deferral and recall of events a state cannot handle
//! yet, timers whose stop also cancels an already queued expiry, and
//! sequence records that match confirmations to outstanding requests.
//!
//! ## Module Overview
//! - [`signal`]    – Addresses, signal layout and sequence numbers.
//! - [`event`]     – Events, shared event handles and the ownership model.
//! - [`pool`]      – Fixed-block event pools.
//! - [`msg`]       – Fixed-layout messages for external peers.
//! - [`queue`]     – Event queue of an execution context.
//! - [`registry`]  – Address registry.
//! - [`defer`]     – Deferred event queue.
//! - [`seqrec`]    – Request/confirmation sequence records.
//! - [`hsm`]       – Per-machine runtime core and the send API.
//! - [`machine`]   – Hierarchical dispatch engine.
//! - [`region`]    – Machines hosted by another context.
//! - [`active`]    – Active objects, bare threads and the dispatcher.
//! - [`timer`]     – Timers.
//! - [`framework`] – Process-wide services.
//! - [`kernel`]    – Cooperative and threaded scheduling.
//! - [`config`]    – Framework configuration.
//! - [`names`]     – Event names and the per-machine log switch.

pub mod active;
pub mod config;
pub mod defer;
pub mod error;
pub mod event;
pub mod framework;
pub mod hsm;
pub mod kernel;
pub mod machine;
pub mod msg;
pub mod names;
pub mod pool;
pub mod queue;
pub mod region;
pub mod registry;
pub mod seqrec;
pub mod signal;
pub mod timer;

pub use active::{ActiveObject, ActiveRunnable, XThread};
pub use config::{FwConfig, FwConfigBuilder};
pub use error::{ErrorCode, FwError, FwResult, Reason};
pub use event::{ErrorInfo, Evt, EvtHeader, EvtRef};
pub use framework::Framework;
pub use hsm::Hsm;
pub use kernel::{Kernel, KernelBuilder, KernelHandle};
pub use machine::{Machine, Reaction, StateMachine};
pub use msg::{ErrorMsg, Msg, MsgError, MsgId};
pub use region::Region;
pub use seqrec::{CfmOutcome, EvtSeqRec, MsgSeqRec, SeqRec};
pub use signal::{Hsmn, Sequence, Signal, SignalClass};
pub use timer::{Timer, TimerMode};

#[cfg(test)]
mod tests;
