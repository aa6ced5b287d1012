//! Hierarchical state machine engine.
//!
//! Applications describe a machine by implementing [`Machine`]: a state
//! enum, its parent relation and one handler. [`StateMachine`] runs it:
//! events bubble from the current leaf state to its ancestors until one
//! handles them, and transitions run exit actions up to the least common
//! ancestor, entry actions down to the target and then the target's initial
//! transitions.
//!
//! After every dispatched event the engine drains the reminder queue, so
//! reminders raised while handling an event run before any other event is
//! taken from the host queue.

use core::fmt;
use std::sync::Arc;

use heapless::Vec;

use crate::event::{EvtRef, ENTRY_EVT, EXIT_EVT, INIT_EVT};
use crate::framework::Framework;
use crate::hsm::Hsm;
use crate::queue::EventQueue;
use crate::registry::HsmInfo;
use crate::signal::Hsmn;

/// Maximum nesting depth of states, the top state included.
pub const MAX_STATE_DEPTH: usize = 8;

/// What a state handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction<S> {
    /// The event was consumed.
    Handled,
    /// Not handled here; try the parent state.
    Unhandled,
    /// Consumed, with a transition to the given state. In response to
    /// `INIT` this names the initial substate.
    Transition(S),
}

/// Behavior of a hierarchical state machine.
pub trait Machine: Send + 'static {
    type State: Copy + Eq + fmt::Debug + Send + 'static;

    /// Top-level initial transition. Returns the first state to enter.
    fn initial(&mut self, hsm: &mut Hsm) -> Self::State;

    /// Parent of `state`, `None` for top-level states.
    fn superstate(state: Self::State) -> Option<Self::State>;

    fn state_name(state: Self::State) -> &'static str;

    /// Handles `e` in `state`. Entry, exit and initial transitions arrive as
    /// `Signal::ENTRY`, `Signal::EXIT` and `Signal::INIT`.
    fn handle(&mut self, hsm: &mut Hsm, state: Self::State, e: &EvtRef) -> Reaction<Self::State>;
}

type Path<S> = Vec<S, MAX_STATE_DEPTH>;

/// Runs a [`Machine`] together with its [`Hsm`] core.
pub struct StateMachine<M: Machine> {
    machine: M,
    hsm: Hsm,
    state: Option<M::State>,
}

impl<M: Machine> StateMachine<M> {
    pub fn new(fw: &Arc<Framework>, hsmn: Hsmn, name: &'static str, machine: M) -> Self {
        Self {
            machine,
            hsm: Hsm::new(fw, hsmn, name),
            state: None,
        }
    }

    pub fn hsmn(&self) -> Hsmn {
        self.hsm.hsmn()
    }

    pub fn name(&self) -> &'static str {
        self.hsm.name()
    }

    pub fn hsm(&self) -> &Hsm {
        &self.hsm
    }

    pub fn hsm_mut(&mut self) -> &mut Hsm {
        &mut self.hsm
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut M {
        &mut self.machine
    }

    /// Current leaf state, `None` before [`init`](Self::init).
    pub fn state(&self) -> Option<M::State> {
        self.state
    }

    /// `true` if the current state is `state` or one of its substates.
    pub fn is_in(&self, state: M::State) -> bool {
        let mut cur = self.state;
        while let Some(s) = cur {
            if s == state {
                return true;
            }
            cur = M::superstate(s);
        }
        false
    }

    pub(crate) fn info(&self) -> &Arc<HsmInfo> {
        self.hsm.info()
    }

    pub(crate) fn attach(&mut self, container: Arc<EventQueue>) {
        self.hsm.attach(container);
    }

    /// Takes the top-level initial transition.
    pub fn init(&mut self) {
        let target = self.machine.initial(&mut self.hsm);
        let path = Self::path_to_root(target);
        for s in path.iter().rev() {
            self.enter(*s);
        }
        self.drill_into(target);
        self.drain_reminders();
    }

    /// Dispatches `e`, then any reminders it raised.
    pub fn dispatch(&mut self, e: &EvtRef) {
        self.process(e);
        self.drain_reminders();
    }

    fn process(&mut self, e: &EvtRef) {
        let Some(current) = self.state else {
            log::warn!("{}: {} before init dropped", self.name(), e.signal());
            return;
        };
        self.hsm.log_event(e);
        let mut state = Some(current);
        while let Some(s) = state {
            match self.machine.handle(&mut self.hsm, s, e) {
                Reaction::Handled => return,
                Reaction::Transition(target) => {
                    self.transition(current, s, target);
                    return;
                }
                Reaction::Unhandled => state = M::superstate(s),
            }
        }
        log::trace!("{}: {} unhandled", self.name(), e.signal());
    }

    fn drain_reminders(&mut self) {
        while let Some(reminder) = self.hsm.next_reminder() {
            self.process(&reminder);
            assert!(
                reminder.is_pooled() && reminder.to() == self.hsmn(),
                "{}: reminder {} corrupted",
                self.name(),
                reminder.signal()
            );
        }
    }

    fn transition(&mut self, current: M::State, source: M::State, target: M::State) {
        // Leave substates of the handling state first.
        let mut s = current;
        while s != source {
            self.exit(s);
            match M::superstate(s) {
                Some(parent) => s = parent,
                None => break,
            }
        }

        let source_path = Self::path_to_root(source);
        let target_path = Self::path_to_root(target);
        let lca = if source == target {
            M::superstate(source)
        } else {
            source_path
                .iter()
                .copied()
                .find(|s| target_path.contains(s))
                .and_then(|common| {
                    if common == target {
                        M::superstate(target)
                    } else {
                        Some(common)
                    }
                })
        };

        for s in source_path.iter().copied() {
            if Some(s) == lca {
                break;
            }
            self.exit(s);
        }
        let entry: Path<M::State> = target_path
            .iter()
            .copied()
            .take_while(|s| Some(*s) != lca)
            .collect();
        for s in entry.iter().rev() {
            self.enter(*s);
        }
        self.drill_into(target);
    }

    /// Follows initial transitions below `state` and settles there.
    fn drill_into(&mut self, mut state: M::State) {
        loop {
            match self.machine.handle(&mut self.hsm, state, &INIT_EVT) {
                Reaction::Transition(child) if child != state => {
                    let path = Self::path_to_root(child);
                    let entry: Path<M::State> =
                        path.iter().copied().take_while(|s| *s != state).collect();
                    for s in entry.iter().rev() {
                        self.enter(*s);
                    }
                    state = child;
                }
                _ => break,
            }
        }
        self.state = Some(state);
        self.hsm.info().set_state(M::state_name(state));
        if self.hsm.fw().is_log_on(self.hsmn()) {
            log::debug!(target: self.name(), "state {}", M::state_name(state));
        }
    }

    fn enter(&mut self, state: M::State) {
        self.machine.handle(&mut self.hsm, state, &ENTRY_EVT);
    }

    fn exit(&mut self, state: M::State) {
        self.machine.handle(&mut self.hsm, state, &EXIT_EVT);
    }

    /// `[state, parent, ..., top]`.
    ///
    /// # Panics
    ///
    /// Panics if the nesting exceeds [`MAX_STATE_DEPTH`].
    fn path_to_root(state: M::State) -> Path<M::State> {
        let mut path = Path::new();
        let mut cur = Some(state);
        while let Some(s) = cur {
            if path.push(s).is_err() {
                panic!("state {s:?} nested deeper than {}", MAX_STATE_DEPTH);
            }
            cur = M::superstate(s);
        }
        path
    }
}

impl<M: Machine + fmt::Debug> fmt::Debug for StateMachine<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMachine")
            .field("hsmn", &self.hsmn())
            .field("state", &self.state)
            .field("machine", &self.machine)
            .finish()
    }
}
