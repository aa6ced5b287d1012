use std::sync::{Arc, Mutex};

use crate::event::{Evt, EvtHeader, EvtRef};
use crate::framework::Framework;
use crate::hsm::Hsm;
use crate::machine::{Machine, Reaction};
use crate::signal::{Hsmn, Signal};

mod machine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flat {
    Top,
}

/// Flat machine keeping every non-engine event it receives.
#[derive(Clone, Default)]
pub(crate) struct Collector {
    events: Arc<Mutex<Vec<EvtRef>>>,
}

impl Collector {
    pub(crate) fn signals(&self) -> Vec<Signal> {
        self.events.lock().unwrap().iter().map(|e| e.signal()).collect()
    }

    pub(crate) fn headers(&self) -> Vec<EvtHeader> {
        self.events.lock().unwrap().iter().map(|e| *e.header()).collect()
    }

    pub(crate) fn events(&self) -> Vec<EvtRef> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl Machine for Collector {
    type State = Flat;

    fn initial(&mut self, _hsm: &mut Hsm) -> Flat {
        Flat::Top
    }

    fn superstate(_state: Flat) -> Option<Flat> {
        None
    }

    fn state_name(_state: Flat) -> &'static str {
        "Top"
    }

    fn handle(&mut self, _hsm: &mut Hsm, _state: Flat, e: &EvtRef) -> Reaction<Flat> {
        if !e.signal().is_reserved() {
            self.events.lock().unwrap().push(e.clone());
        }
        Reaction::Handled
    }
}

/// Posts a pooled event without payload to `to`.
pub(crate) fn post(fw: &Arc<Framework>, signal: Signal, to: Hsmn) {
    let e = Evt::new(fw.pools(), signal).unwrap().with_to(to);
    fw.post(e.into());
}
