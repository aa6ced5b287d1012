use std::sync::{Arc, Mutex};

use crate::config::FwConfig;
use crate::event::{Evt, EvtRef};
use crate::framework::Framework;
use crate::hsm::Hsm;
use crate::machine::{Machine, Reaction, StateMachine};
use crate::signal::{Hsmn, Signal};

const OWNER: Hsmn = Hsmn(1);
const GO_A2: Signal = Signal::interface(OWNER, 0);
const GO_B: Signal = Signal::interface(OWNER, 1);
const RESTART_A: Signal = Signal::interface(OWNER, 2);
const PING: Signal = Signal::interface(OWNER, 3);
const KICK: Signal = Signal::interface(OWNER, 4);
const FLOOD: Signal = Signal::interface(OWNER, 5);
const RAISE_STATIC: Signal = Signal::interface(OWNER, 6);
const R1: Signal = Signal::internal(OWNER, 0);
const R2: Signal = Signal::internal(OWNER, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum S {
    Root,
    A,
    A1,
    A2,
    B,
}

#[derive(Clone, Default)]
struct Nested {
    log: Arc<Mutex<Vec<String>>>,
}

impl Nested {
    fn note(&self, entry: impl Into<String>) {
        self.log.lock().unwrap().push(entry.into());
    }

    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock().unwrap())
    }
}

impl Machine for Nested {
    type State = S;

    fn initial(&mut self, _hsm: &mut Hsm) -> S {
        self.note("init");
        S::Root
    }

    fn superstate(state: S) -> Option<S> {
        match state {
            S::Root => None,
            S::A | S::B => Some(S::Root),
            S::A1 | S::A2 => Some(S::A),
        }
    }

    fn state_name(state: S) -> &'static str {
        match state {
            S::Root => "Root",
            S::A => "A",
            S::A1 => "A1",
            S::A2 => "A2",
            S::B => "B",
        }
    }

    fn handle(&mut self, hsm: &mut Hsm, state: S, e: &EvtRef) -> Reaction<S> {
        match e.signal() {
            Signal::ENTRY => {
                self.note(format!("{state:?}:entry"));
                return Reaction::Handled;
            }
            Signal::EXIT => {
                self.note(format!("{state:?}:exit"));
                return Reaction::Handled;
            }
            _ => {}
        }
        match (state, e.signal()) {
            (S::Root, Signal::INIT) => Reaction::Transition(S::A),
            (S::A, Signal::INIT) => Reaction::Transition(S::A1),
            (S::A1, GO_A2) => Reaction::Transition(S::A2),
            (S::A, GO_B) => Reaction::Transition(S::B),
            (S::Root, RESTART_A) => Reaction::Transition(S::A),
            (S::Root, PING) => {
                self.note("ping");
                Reaction::Handled
            }
            (S::B, KICK) => {
                let r1 = hsm.evt(R1);
                hsm.raise(r1);
                let r2 = hsm.evt(R2);
                hsm.raise(r2);
                self.note("kick");
                Reaction::Handled
            }
            (S::B, R1) => {
                self.note("r1");
                Reaction::Handled
            }
            (S::B, R2) => {
                self.note("r2");
                Reaction::Transition(S::A)
            }
            (_, FLOOD) => {
                for _ in 0..5 {
                    let r = hsm.evt(R1);
                    hsm.raise(r);
                }
                Reaction::Handled
            }
            (_, RAISE_STATIC) => {
                hsm.raise(Evt::new_static(R1));
                Reaction::Handled
            }
            _ => Reaction::Unhandled,
        }
    }
}

fn ev(signal: Signal) -> EvtRef {
    Evt::new_static(signal).with_to(OWNER).into()
}

fn started() -> (StateMachine<Nested>, Nested) {
    let fw = Framework::new(FwConfig::default());
    let probe = Nested::default();
    let mut sm = StateMachine::new(&fw, OWNER, "Nested", probe.clone());
    sm.init();
    (sm, probe)
}

#[test]
fn init_enters_down_to_leaf() {
    let (sm, probe) = started();
    assert_eq!(probe.take(), ["init", "Root:entry", "A:entry", "A1:entry"]);
    assert_eq!(sm.state(), Some(S::A1));
    assert!(sm.is_in(S::A));
    assert!(sm.is_in(S::Root));
    assert!(!sm.is_in(S::B));
    assert_eq!(sm.hsm().state(), "A1");
}

#[test]
fn sibling_transition_stays_in_parent() {
    let (mut sm, probe) = started();
    probe.take();
    sm.dispatch(&ev(GO_A2));
    assert_eq!(probe.take(), ["A1:exit", "A2:entry"]);
    assert_eq!(sm.state(), Some(S::A2));
}

#[test]
fn transition_from_ancestor_exits_current_leaf() {
    let (mut sm, probe) = started();
    sm.dispatch(&ev(GO_A2));
    probe.take();
    sm.dispatch(&ev(GO_B));
    assert_eq!(probe.take(), ["A2:exit", "A:exit", "B:entry"]);
    assert_eq!(sm.state(), Some(S::B));
}

#[test]
fn transition_to_substate_keeps_source_active() {
    let (mut sm, probe) = started();
    sm.dispatch(&ev(GO_B));
    probe.take();
    sm.dispatch(&ev(RESTART_A));
    assert_eq!(probe.take(), ["B:exit", "A:entry", "A1:entry"]);
}

#[test]
fn unhandled_events_bubble_up() {
    let (mut sm, probe) = started();
    probe.take();
    sm.dispatch(&ev(PING));
    assert_eq!(probe.take(), ["ping"]);
    assert_eq!(sm.state(), Some(S::A1));
}

#[test]
fn reminders_run_before_dispatch_returns() {
    let (mut sm, probe) = started();
    sm.dispatch(&ev(GO_B));
    probe.take();
    sm.dispatch(&ev(KICK));
    assert_eq!(
        probe.take(),
        ["kick", "r1", "r2", "B:exit", "A:entry", "A1:entry"]
    );
    let stats = sm.hsm().fw().pools().stats(1).unwrap();
    assert_eq!(stats.used_blocks, 0);
}

#[test]
#[should_panic(expected = "reminder queue")]
fn reminder_overflow_is_fatal() {
    let (mut sm, _probe) = started();
    sm.dispatch(&ev(FLOOD));
}

#[test]
#[should_panic(expected = "cannot be raised")]
fn raising_static_event_is_fatal() {
    let (mut sm, _probe) = started();
    sm.dispatch(&ev(RAISE_STATIC));
}

#[test]
fn reminders_carry_own_address_and_fresh_sequence() {
    let fw = Framework::new(FwConfig::default());
    let mut hsm = Hsm::new(&fw, OWNER, "Raiser");
    let e = hsm.evt(R1).with_to(Hsmn(9));
    hsm.raise(e);
    let e = hsm.evt(R2);
    hsm.raise(e);
    let first = hsm.next_reminder().unwrap();
    let second = hsm.next_reminder().unwrap();
    assert_eq!((first.to(), first.from()), (OWNER, OWNER));
    assert_eq!(first.seq().wrapping_add(1), second.seq());
    assert!(hsm.next_reminder().is_none());
}

#[derive(Default)]
struct Deep;

impl Machine for Deep {
    type State = u8;

    fn initial(&mut self, _hsm: &mut Hsm) -> u8 {
        8
    }

    fn superstate(state: u8) -> Option<u8> {
        state.checked_sub(1)
    }

    fn state_name(_state: u8) -> &'static str {
        "Deep"
    }

    fn handle(&mut self, _hsm: &mut Hsm, _state: u8, _e: &EvtRef) -> Reaction<u8> {
        Reaction::Handled
    }
}

#[test]
#[should_panic(expected = "nested deeper")]
fn nesting_limit_is_enforced() {
    let fw = Framework::new(FwConfig::default());
    StateMachine::new(&fw, OWNER, "Deep", Deep).init();
}
