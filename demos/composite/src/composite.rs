//! The composite active object.
//!
//! Starts and stops its subsystem regions concurrently. A start succeeds
//! only when every subsystem confirms; any failure or the state timeout
//! fails it and stops everything again. Stop requests arriving while a stop
//! is in progress are deferred and answered once stopped.

use fw::{ErrorCode, EvtHeader, EvtRef, Hsm, Machine, Reaction, Signal, Timer, TimerMode};

use crate::signals::composite::*;
use crate::signals::{subsystem, subsystem_hsmn, SUBSYSTEM_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Root,
    Stopped,
    Starting,
    Started,
    Stopping,
}

#[derive(Default)]
pub struct Composite {
    timer: Option<Timer>,
    in_req: Option<EvtHeader>,
}

impl Composite {
    fn start_timer(&self, ms: u32) {
        if let Some(timer) = &self.timer {
            timer.start(ms, TimerMode::Once);
        }
    }

    fn stop_timer(&self) {
        if let Some(timer) = &self.timer {
            timer.stop();
        }
    }

    fn fan_out(hsm: &mut Hsm, signal: Signal) {
        for i in 0..SUBSYSTEM_COUNT {
            let req = hsm.evt(signal);
            hsm.send_req(req, subsystem_hsmn(i), i == 0);
        }
    }

    /// Turns a subsystem confirmation into `DONE` or `FAILED`.
    fn on_cfm(hsm: &mut Hsm, e: &EvtRef) {
        let outcome = hsm.check_cfm(e);
        if !outcome.handled_ok() {
            let (error, origin, reason) = e
                .error_info()
                .map_or((ErrorCode::Unspec, e.from(), 0), |i| (i.error, i.origin, i.reason));
            let failed = hsm.error_evt(FAILED, error, origin, reason);
            hsm.raise(failed);
        } else if outcome.all_received() {
            let done = hsm.evt(DONE);
            hsm.raise(done);
        }
    }
}

impl Machine for Composite {
    type State = State;

    fn initial(&mut self, hsm: &mut Hsm) -> State {
        self.timer = Some(hsm.timer(STATE_TIMER));
        State::Root
    }

    fn superstate(state: State) -> Option<State> {
        match state {
            State::Root => None,
            _ => Some(State::Root),
        }
    }

    fn state_name(state: State) -> &'static str {
        match state {
            State::Root => "Root",
            State::Stopped => "Stopped",
            State::Starting => "Starting",
            State::Started => "Started",
            State::Stopping => "Stopping",
        }
    }

    fn handle(&mut self, hsm: &mut Hsm, state: State, e: &EvtRef) -> Reaction<State> {
        match (state, e.signal()) {
            (State::Root, Signal::INIT) => Reaction::Transition(State::Stopped),
            (State::Root, START_REQ) => {
                let cfm = hsm.error_evt(START_CFM, ErrorCode::State, hsm.hsmn(), 0);
                hsm.send_cfm(cfm, e.header());
                Reaction::Handled
            }
            (State::Root, STOP_REQ) => {
                hsm.defer(e);
                Reaction::Transition(State::Stopping)
            }

            (State::Stopped, STOP_REQ) => {
                let cfm = hsm.evt(STOP_CFM);
                hsm.send_cfm(cfm, e.header());
                Reaction::Handled
            }
            (State::Stopped, START_REQ) => {
                self.in_req = Some(*e.header());
                Reaction::Transition(State::Starting)
            }

            (State::Starting, Signal::ENTRY) => {
                self.start_timer(START_TIMEOUT_MS);
                Self::fan_out(hsm, subsystem::START_REQ);
                Reaction::Handled
            }
            (State::Starting, Signal::EXIT) => {
                self.stop_timer();
                Reaction::Handled
            }
            (State::Starting, subsystem::START_CFM) => {
                Self::on_cfm(hsm, e);
                Reaction::Handled
            }
            (State::Starting, FAILED) => {
                let info = e.error_info().copied();
                let (error, origin, reason) =
                    info.map_or((ErrorCode::Unspec, hsm.hsmn(), 0), |i| (i.error, i.origin, i.reason));
                log::warn!("start failed: {error} from {origin}");
                let cfm = hsm.error_evt(START_CFM, error, origin, reason);
                hsm.send_cfm_saved(cfm, &mut self.in_req);
                Reaction::Transition(State::Stopping)
            }
            (State::Starting, STATE_TIMER) => {
                log::warn!("start timed out");
                let cfm = hsm.error_evt(START_CFM, ErrorCode::Timeout, hsm.hsmn(), 0);
                hsm.send_cfm_saved(cfm, &mut self.in_req);
                Reaction::Transition(State::Stopping)
            }
            (State::Starting, DONE) => {
                let cfm = hsm.evt(START_CFM);
                hsm.send_cfm_saved(cfm, &mut self.in_req);
                Reaction::Transition(State::Started)
            }

            (State::Stopping, Signal::ENTRY) => {
                self.start_timer(STOP_TIMEOUT_MS);
                Self::fan_out(hsm, subsystem::STOP_REQ);
                Reaction::Handled
            }
            (State::Stopping, Signal::EXIT) => {
                self.stop_timer();
                hsm.recall();
                Reaction::Handled
            }
            (State::Stopping, STOP_REQ) => {
                hsm.defer(e);
                Reaction::Handled
            }
            (State::Stopping, subsystem::STOP_CFM) => {
                Self::on_cfm(hsm, e);
                Reaction::Handled
            }
            (State::Stopping, FAILED | STATE_TIMER) => {
                log::error!("subsystems failed to stop");
                Reaction::Transition(State::Stopped)
            }
            (State::Stopping, DONE) => Reaction::Transition(State::Stopped),

            _ => Reaction::Unhandled,
        }
    }
}
