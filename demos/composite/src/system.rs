//! The system active object: starts the composite, keeps it running for a
//! while, then stops it with two back-to-back stop requests.

use fw::{CfmOutcome, EvtRef, Hsm, Machine, Reaction, Signal, Timer, TimerMode};
use fw_posix::ShutdownHandle;

use crate::signals::system::*;
use crate::signals::{composite, COMPOSITE};

const GUARD_MS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Root,
    Starting,
    Running,
    Stopping,
    Stopped,
}

pub struct System {
    hold_ms: u32,
    state_timer: Option<Timer>,
    hold_timer: Option<Timer>,
    on_stopped: Option<ShutdownHandle>,
}

impl System {
    pub fn new(hold_ms: u32, on_stopped: ShutdownHandle) -> Self {
        Self {
            hold_ms,
            state_timer: None,
            hold_timer: None,
            on_stopped: Some(on_stopped),
        }
    }
}

fn start(timer: Option<&Timer>, ms: u32) {
    if let Some(timer) = timer {
        timer.start(ms, TimerMode::Once);
    }
}

fn stop(timer: Option<&Timer>) {
    if let Some(timer) = timer {
        timer.stop();
    }
}

impl Machine for System {
    type State = State;

    fn initial(&mut self, hsm: &mut Hsm) -> State {
        self.state_timer = Some(hsm.timer(STATE_TIMER));
        self.hold_timer = Some(hsm.timer(HOLD_TIMER));
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
            State::Starting => "Starting",
            State::Running => "Running",
            State::Stopping => "Stopping",
            State::Stopped => "Stopped",
        }
    }

    fn handle(&mut self, hsm: &mut Hsm, state: State, e: &EvtRef) -> Reaction<State> {
        match (state, e.signal()) {
            (State::Root, Signal::INIT) => Reaction::Transition(State::Starting),

            (State::Starting, Signal::ENTRY) => {
                start(self.state_timer.as_ref(), composite::START_TIMEOUT_MS + GUARD_MS);
                let req = hsm.evt(composite::START_REQ);
                hsm.send_req(req, COMPOSITE, true);
                Reaction::Handled
            }
            (State::Starting, Signal::EXIT) => {
                stop(self.state_timer.as_ref());
                Reaction::Handled
            }
            (State::Starting, composite::START_CFM) => match hsm.check_cfm(e) {
                CfmOutcome::AllReceived => {
                    log::info!("composite started");
                    Reaction::Transition(State::Running)
                }
                CfmOutcome::Failed => {
                    log::warn!("composite failed to start: {}", e.error());
                    Reaction::Transition(State::Stopping)
                }
                CfmOutcome::Pending | CfmOutcome::Ignored => Reaction::Handled,
            },
            (State::Starting, STATE_TIMER) => {
                log::warn!("no start confirmation from the composite");
                Reaction::Transition(State::Stopping)
            }

            (State::Running, Signal::ENTRY) => {
                start(self.hold_timer.as_ref(), self.hold_ms);
                Reaction::Handled
            }
            (State::Running, Signal::EXIT) => {
                stop(self.hold_timer.as_ref());
                Reaction::Handled
            }
            (State::Running, HOLD_TIMER) => Reaction::Transition(State::Stopping),

            (State::Stopping, Signal::ENTRY) => {
                start(self.state_timer.as_ref(), composite::STOP_TIMEOUT_MS + GUARD_MS);
                // The second request supersedes the first in the record, so
                // the first confirmation is stale when it arrives.
                let first = hsm.evt(composite::STOP_REQ);
                hsm.send_req(first, COMPOSITE, true);
                let second = hsm.evt(composite::STOP_REQ);
                hsm.send_req(second, COMPOSITE, false);
                Reaction::Handled
            }
            (State::Stopping, Signal::EXIT) => {
                stop(self.state_timer.as_ref());
                Reaction::Handled
            }
            (State::Stopping, composite::STOP_CFM) => match hsm.check_cfm(e) {
                CfmOutcome::AllReceived => Reaction::Transition(State::Stopped),
                CfmOutcome::Ignored => {
                    log::info!("stale stop confirmation seq={} ignored", e.seq());
                    Reaction::Handled
                }
                CfmOutcome::Failed => {
                    log::error!("composite failed to stop: {}", e.error());
                    Reaction::Transition(State::Stopped)
                }
                CfmOutcome::Pending => Reaction::Handled,
            },
            (State::Stopping, STATE_TIMER) => {
                log::error!("no stop confirmation from the composite");
                Reaction::Transition(State::Stopped)
            }

            (State::Stopped, Signal::ENTRY) => {
                log::info!("system stopped");
                if let Some(handle) = self.on_stopped.take() {
                    handle.shutdown();
                }
                Reaction::Handled
            }

            _ => Reaction::Unhandled,
        }
    }
}
