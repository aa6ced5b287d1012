//! A subsystem region. Starting and stopping take a configurable time,
//! simulated with a state timer. A failing subsystem answers its start
//! request with a timeout error.

use fw::{ErrorCode, EvtHeader, EvtRef, Hsm, Machine, Reaction, Timer, TimerMode};

use crate::signals::subsystem::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Root,
    Stopped,
    Starting,
    Started,
    Stopping,
}

pub struct Subsystem {
    delay_ms: u32,
    fail: bool,
    timer: Option<Timer>,
    in_req: Option<EvtHeader>,
}

impl Subsystem {
    pub fn new(delay_ms: u32, fail: bool) -> Self {
        Self {
            delay_ms,
            fail,
            timer: None,
            in_req: None,
        }
    }

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
}

impl Machine for Subsystem {
    type State = State;

    fn initial(&mut self, hsm: &mut Hsm) -> State {
        self.timer = Some(hsm.timer(STATE_TIMER));
        State::Stopped
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
            (State::Root, START_REQ) => {
                let cfm = hsm.error_evt(START_CFM, ErrorCode::State, hsm.hsmn(), 0);
                hsm.send_cfm(cfm, e.header());
                Reaction::Handled
            }
            (State::Root, STOP_REQ) => {
                self.in_req = Some(*e.header());
                Reaction::Transition(State::Stopping)
            }

            (State::Stopped, START_REQ) => {
                self.in_req = Some(*e.header());
                Reaction::Transition(State::Starting)
            }
            (State::Stopped, STOP_REQ) => {
                let cfm = hsm.evt(STOP_CFM);
                hsm.send_cfm(cfm, e.header());
                Reaction::Handled
            }

            (State::Starting, fw::Signal::ENTRY) => {
                self.start_timer(self.delay_ms);
                Reaction::Handled
            }
            (State::Starting, fw::Signal::EXIT) => {
                self.stop_timer();
                Reaction::Handled
            }
            (State::Starting, STATE_TIMER) if self.fail => {
                let cfm = hsm.error_evt(START_CFM, ErrorCode::Timeout, hsm.hsmn(), 0);
                hsm.send_cfm_saved(cfm, &mut self.in_req);
                Reaction::Transition(State::Stopped)
            }
            (State::Starting, STATE_TIMER) => {
                let cfm = hsm.evt(START_CFM);
                hsm.send_cfm_saved(cfm, &mut self.in_req);
                Reaction::Transition(State::Started)
            }

            (State::Stopping, fw::Signal::ENTRY) => {
                self.start_timer(self.delay_ms / 2);
                Reaction::Handled
            }
            (State::Stopping, fw::Signal::EXIT) => {
                self.stop_timer();
                Reaction::Handled
            }
            (State::Stopping, STATE_TIMER) => {
                let cfm = hsm.evt(STOP_CFM);
                hsm.send_cfm_saved(cfm, &mut self.in_req);
                Reaction::Transition(State::Stopped)
            }

            _ => Reaction::Unhandled,
        }
    }
}
