//! Per-machine runtime core.
//!
//! [`Hsm`] carries everything a state machine needs at run time besides its
//! own states: its address, a sequence generator, the deferred queue, the
//! reminder queue and the default sequence record. It is handed to every
//! state handler as `&mut Hsm`, so only the machine itself can raise
//! reminders or defer and recall events.

use std::any::Any;
use std::sync::Arc;

use heapless::Deque;

use crate::defer::DeferQueue;
use crate::error::{ErrorCode, Reason};
use crate::event::{Evt, EvtHeader, EvtRef};
use crate::framework::Framework;
use crate::msg::{fixed, MSG_UNDEF};
use crate::seqrec::MsgSeqRec;
use crate::queue::EventQueue;
use crate::registry::HsmInfo;
use crate::seqrec::{CfmOutcome, EvtSeqRec};
use crate::signal::{Hsmn, Sequence, Signal};
use crate::timer::Timer;

pub const REMINDER_QUEUE_COUNT: usize = 4;

pub struct Hsm {
    info: Arc<HsmInfo>,
    fw: Arc<Framework>,
    container: Option<Arc<EventQueue>>,
    next_seq: Sequence,
    defer: DeferQueue,
    reminders: Deque<EvtRef, REMINDER_QUEUE_COUNT>,
    evt_seq: EvtSeqRec,
}

impl Hsm {
    pub fn new(fw: &Arc<Framework>, hsmn: Hsmn, name: &'static str) -> Self {
        Self {
            info: Arc::new(HsmInfo::new(hsmn, name)),
            fw: Arc::clone(fw),
            container: None,
            next_seq: 0,
            defer: DeferQueue::new(),
            reminders: Deque::new(),
            evt_seq: EvtSeqRec::new(),
        }
    }

    pub fn hsmn(&self) -> Hsmn {
        self.info.hsmn()
    }

    pub fn name(&self) -> &'static str {
        self.info.name()
    }

    /// Name of the current state.
    pub fn state(&self) -> &'static str {
        self.info.state()
    }

    pub fn info(&self) -> &Arc<HsmInfo> {
        &self.info
    }

    pub fn fw(&self) -> &Arc<Framework> {
        &self.fw
    }

    pub(crate) fn attach(&mut self, container: Arc<EventQueue>) {
        self.container = Some(container);
    }

    /// Next sequence number. Wraps around.
    pub fn gen_seq(&mut self) -> Sequence {
        let seq = self.next_seq;
        self.next_seq = seq.wrapping_add(1);
        seq
    }

    /// Creates a timer posting `signal` to this machine.
    pub fn timer(&self, signal: Signal) -> Timer {
        Timer::new(&self.fw, self.hsmn(), signal)
    }

    // Event construction. Pool exhaustion is a sizing error and panics.

    pub fn evt(&self, signal: Signal) -> Evt {
        Evt::new(self.fw.pools(), signal)
            .unwrap_or_else(|err| panic!("{}: {err}", self.name()))
    }

    pub fn evt_with<T: Any + Send + Sync>(&self, signal: Signal, payload: T) -> Evt {
        Evt::with_payload(self.fw.pools(), signal, payload)
            .unwrap_or_else(|err| panic!("{}: {err}", self.name()))
    }

    pub fn error_evt(&self, signal: Signal, error: ErrorCode, origin: Hsmn, reason: Reason) -> Evt {
        self.evt(signal).with_error(error, origin, reason)
    }

    // Sending.

    /// Posts `e` to `e.to`, filling in `from` when it is undefined.
    pub fn send(&mut self, mut e: Evt) {
        if !e.from().is_defined() {
            e.set_from(self.hsmn());
        }
        self.fw.post(e.into());
    }

    /// Addresses `e` to `to` with a fresh sequence number and posts it.
    pub fn send_to(&mut self, mut e: Evt, to: Hsmn) {
        let seq = self.gen_seq();
        e.set_to(to);
        e.set_seq(seq);
        self.send(e);
    }

    pub fn send_with_seq(&mut self, mut e: Evt, to: Hsmn, seq: Sequence) {
        e.set_to(to);
        e.set_seq(seq);
        self.send(e);
    }

    /// Sends `e` unless an event with the same signal, destination and
    /// source is already waiting in the destination queue.
    pub fn send_not_in_queue(&mut self, mut e: Evt) -> bool {
        if !e.from().is_defined() {
            e.set_from(self.hsmn());
        }
        self.fw.post_not_in_queue(e.into())
    }

    pub fn send_not_in_queue_to(&mut self, mut e: Evt, to: Hsmn) -> bool {
        let seq = self.gen_seq();
        e.set_to(to);
        e.set_seq(seq);
        self.send_not_in_queue(e)
    }

    pub fn send_not_in_queue_with_seq(&mut self, mut e: Evt, to: Hsmn, seq: Sequence) -> bool {
        e.set_to(to);
        e.set_seq(seq);
        self.send_not_in_queue(e)
    }

    // Request / confirmation coordination.

    /// Sends a request and records the sequence number its confirmation
    /// must carry. `reset` clears the record first.
    pub fn send_req(&mut self, e: Evt, to: Hsmn, reset: bool) {
        let mut rec = std::mem::take(&mut self.evt_seq);
        self.send_req_with(e, to, reset, &mut rec);
        self.evt_seq = rec;
    }

    pub fn send_req_with(&mut self, mut e: Evt, to: Hsmn, reset: bool, rec: &mut EvtSeqRec) {
        let seq = self.gen_seq();
        e.set_to(to);
        e.set_seq(seq);
        rec.save(to, seq, reset);
        self.send(e);
    }

    /// Indications follow the same protocol as requests.
    pub fn send_ind(&mut self, e: Evt, to: Hsmn, reset: bool) {
        self.send_req(e, to, reset);
    }

    pub fn send_ind_with(&mut self, e: Evt, to: Hsmn, reset: bool, rec: &mut EvtSeqRec) {
        self.send_req_with(e, to, reset, rec);
    }

    /// Matches a confirmation against the default record.
    pub fn check_cfm(&mut self, e: &Evt) -> CfmOutcome {
        self.evt_seq.check_code(&e.from(), e.seq(), e.error())
    }

    pub fn check_cfm_with(&self, e: &Evt, rec: &mut EvtSeqRec) -> CfmOutcome {
        rec.check_code(&e.from(), e.seq(), e.error())
    }

    pub fn check_rsp(&mut self, e: &Evt) -> CfmOutcome {
        self.check_cfm(e)
    }

    pub fn check_rsp_with(&self, e: &Evt, rec: &mut EvtSeqRec) -> CfmOutcome {
        self.check_cfm_with(e, rec)
    }

    /// The default sequence record.
    pub fn seq_rec(&self) -> &EvtSeqRec {
        &self.evt_seq
    }

    pub fn seq_rec_mut(&mut self) -> &mut EvtSeqRec {
        &mut self.evt_seq
    }

    /// Replies to a request, echoing its source and sequence number.
    pub fn send_cfm(&mut self, e: Evt, req: &EvtHeader) {
        self.send_with_seq(e, req.from, req.seq);
    }

    /// Replies to a saved request and forgets it. Nothing is sent when no
    /// request is saved.
    pub fn send_cfm_saved(&mut self, e: Evt, saved: &mut Option<EvtHeader>) {
        if let Some(req) = saved.take() {
            self.send_cfm(e, &req);
        }
    }

    pub fn send_rsp(&mut self, e: Evt, req: &EvtHeader) {
        self.send_cfm(e, req);
    }

    pub fn send_rsp_saved(&mut self, e: Evt, saved: &mut Option<EvtHeader>) {
        self.send_cfm_saved(e, saved);
    }

    // Message variants. The message travels as the event payload.

    /// Sends a message request to the peer `msg_to` hosted behind `to`.
    ///
    /// # Panics
    ///
    /// Panics if `e` carries no message.
    pub fn send_req_msg(
        &mut self,
        mut e: Evt,
        to: Hsmn,
        msg_to: &str,
        reset: bool,
        rec: &mut MsgSeqRec,
    ) {
        let seq = self.gen_seq();
        let signal = e.signal();
        e.set_to(to);
        e.set_seq(seq);
        let Some(msg) = e.msg_mut() else {
            panic!("{signal} carries no message");
        };
        msg.set_to(msg_to);
        if msg.from() == MSG_UNDEF {
            msg.set_from(self.info.name());
        }
        msg.set_seq(seq);
        rec.save(fixed(msg_to), seq, reset);
        self.send(e);
    }

    pub fn send_ind_msg(
        &mut self,
        e: Evt,
        to: Hsmn,
        msg_to: &str,
        reset: bool,
        rec: &mut MsgSeqRec,
    ) {
        self.send_req_msg(e, to, msg_to, reset, rec);
    }

    /// Replies to a message request, echoing both its event and message
    /// routing.
    ///
    /// # Panics
    ///
    /// Panics if either event carries no message.
    pub fn send_cfm_msg(&mut self, mut e: Evt, req: &Evt) {
        let signal = e.signal();
        let Some(req_msg) = req.msg() else {
            panic!("{} carries no message", req.signal());
        };
        let Some(msg) = e.msg_mut() else {
            panic!("{signal} carries no message");
        };
        msg.set_to(req_msg.from());
        msg.set_from(req_msg.to());
        msg.set_seq(req_msg.seq());
        self.send_with_seq(e, req.from(), req.seq());
    }

    pub fn send_rsp_msg(&mut self, e: Evt, req: &Evt) {
        self.send_cfm_msg(e, req);
    }

    /// Matches a message confirmation by message source and sequence.
    /// Events without an error message are ignored.
    pub fn check_cfm_msg(&self, e: &Evt, rec: &mut MsgSeqRec) -> CfmOutcome {
        match e.error_msg() {
            Some(m) => rec.check(&m.msg().from_id(), m.msg().seq(), m.is_success()),
            None => CfmOutcome::Ignored,
        }
    }

    pub fn check_rsp_msg(&self, e: &Evt, rec: &mut MsgSeqRec) -> CfmOutcome {
        self.check_cfm_msg(e, rec)
    }

    // Reminders, deferral and recall.

    /// Queues `e` for this machine itself. It is dispatched right after the
    /// current event, before anything else in the queue.
    ///
    /// # Panics
    ///
    /// Panics if `e` is static or the reminder queue is full.
    pub fn raise(&mut self, mut e: Evt) {
        assert!(e.is_pooled(), "static event {} cannot be raised", e.signal());
        let seq = self.gen_seq();
        e.set_to(self.hsmn());
        e.set_from(self.hsmn());
        e.set_seq(seq);
        if self.reminders.push_back(e.into()).is_err() {
            panic!("reminder queue of {} overflowed", self.name());
        }
    }

    pub(crate) fn next_reminder(&mut self) -> Option<EvtRef> {
        self.reminders.pop_front()
    }

    /// Keeps `e` for a later [`recall`](Self::recall). Returns `false` when
    /// the deferred queue is full.
    pub fn defer(&mut self, e: &EvtRef) -> bool {
        let deferred = self.defer.defer(e);
        if !deferred {
            log::warn!("{}: deferred queue full, dropped {}", self.name(), e.signal());
        }
        deferred
    }

    /// Puts every deferred event back at the front of the host queue in the
    /// order it was deferred.
    ///
    /// # Panics
    ///
    /// Panics if the host queue cannot take them all.
    pub fn recall(&mut self) {
        if self.defer.is_empty() {
            return;
        }
        let events = self.defer.take_all();
        match &self.container {
            Some(queue) => {
                if let Err(err) = queue.post_front_batch(events) {
                    panic!("{}: recall failed: {err}", self.name());
                }
            }
            None => log::trace!("{}: recall before start dropped events", self.name()),
        }
    }

    pub fn deferred_count(&self) -> usize {
        self.defer.len()
    }

    /// Logs `e` if logging is on for this machine.
    pub fn log_event(&self, e: &Evt) {
        self.fw.log_event(&self.info, e);
    }
}
