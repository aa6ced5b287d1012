//! Deferral and recall through a running active object.

use std::sync::{Arc, Mutex};

use fw::defer::DEFER_QUEUE_COUNT;
use fw::{
    ActiveObject, EvtRef, Framework, FwConfig, Hsm, Hsmn, Kernel, Machine, Reaction, Signal,
};
use proptest::prelude::*;

const WORKER: Hsmn = Hsmn(2);
const CLIENT: Hsmn = Hsmn(9);
const BEGIN: Signal = Signal::interface(WORKER, 0);
const DONE: Signal = Signal::interface(WORKER, 1);
const WORK: Signal = Signal::interface(WORKER, 2);
const STOP_REQ: Signal = Signal::interface(WORKER, 3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Busy,
}

/// Defers work while busy and takes it up again once idle.
#[derive(Clone, Default)]
struct Worker {
    handled: Arc<Mutex<Vec<(Signal, u16)>>>,
}

impl Machine for Worker {
    type State = State;

    fn initial(&mut self, _hsm: &mut Hsm) -> State {
        State::Idle
    }

    fn superstate(_state: State) -> Option<State> {
        None
    }

    fn state_name(state: State) -> &'static str {
        match state {
            State::Idle => "Idle",
            State::Busy => "Busy",
        }
    }

    fn handle(&mut self, hsm: &mut Hsm, state: State, e: &EvtRef) -> Reaction<State> {
        match (state, e.signal()) {
            (State::Idle, Signal::ENTRY) => {
                hsm.recall();
                Reaction::Handled
            }
            (State::Idle, BEGIN) => Reaction::Transition(State::Busy),
            (State::Idle, WORK | STOP_REQ) => {
                self.handled.lock().unwrap().push((e.signal(), e.seq()));
                Reaction::Handled
            }
            (State::Busy, WORK | STOP_REQ) => {
                hsm.defer(e);
                Reaction::Handled
            }
            (State::Busy, DONE) => Reaction::Transition(State::Idle),
            _ => Reaction::Unhandled,
        }
    }
}

fn running_worker() -> (Arc<Framework>, Kernel, Worker) {
    let fw = Framework::new(FwConfig::default());
    let worker = Worker::default();
    let mut kernel = Kernel::builder(&fw)
        .register(ActiveObject::new(&fw, WORKER, "Worker", 1, worker.clone()))
        .build()
        .unwrap();
    kernel.start().unwrap();
    (fw, kernel, worker)
}

fn send(fw: &Framework, signal: Signal, seq: u16) {
    let mut e = fw::Evt::new(fw.pools(), signal)
        .unwrap()
        .with_to(WORKER)
        .with_from(CLIENT);
    e.set_seq(seq);
    fw.post(e.into());
}

#[test]
fn second_stop_request_waits_for_the_first() {
    let (fw, mut kernel, worker) = running_worker();

    send(&fw, BEGIN, 0);
    send(&fw, STOP_REQ, 1);
    send(&fw, STOP_REQ, 2);
    kernel.run_until_idle();
    assert!(worker.handled.lock().unwrap().is_empty());
    assert_eq!(fw.state_of(WORKER), Some("Busy"));

    send(&fw, DONE, 3);
    kernel.run_until_idle();
    assert_eq!(
        *worker.handled.lock().unwrap(),
        vec![(STOP_REQ, 1), (STOP_REQ, 2)]
    );
    assert_eq!(fw.pools().stats(1).unwrap().used_blocks, 0);
}

#[test]
fn recalled_events_run_before_later_arrivals() {
    let (fw, mut kernel, worker) = running_worker();

    send(&fw, BEGIN, 0);
    send(&fw, WORK, 1);
    kernel.run_until_idle();
    send(&fw, DONE, 2);
    send(&fw, WORK, 3);
    kernel.run_until_idle();

    let seqs: Vec<u16> = worker.handled.lock().unwrap().iter().map(|h| h.1).collect();
    assert_eq!(seqs, vec![1, 3]);
}

#[test]
fn full_deferred_queue_drops_the_excess() {
    let (fw, mut kernel, worker) = running_worker();

    send(&fw, BEGIN, 0);
    for seq in 1..=(DEFER_QUEUE_COUNT as u16 + 2) {
        send(&fw, WORK, seq);
    }
    send(&fw, DONE, 100);
    kernel.run_until_idle();

    let seqs: Vec<u16> = worker.handled.lock().unwrap().iter().map(|h| h.1).collect();
    let expected: Vec<u16> = (1..=DEFER_QUEUE_COUNT as u16).collect();
    assert_eq!(seqs, expected);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever is deferred during one busy period comes back in order,
    /// ahead of anything queued after the recall.
    #[test]
    fn recall_preserves_defer_order(
        deferred in prop::collection::vec(prop::bool::ANY, 1..DEFER_QUEUE_COUNT),
        later in 0usize..4,
    ) {
        let (fw, mut kernel, worker) = running_worker();

        send(&fw, BEGIN, 0);
        let mut expected = Vec::new();
        for (i, is_stop) in deferred.iter().enumerate() {
            let signal = if *is_stop { STOP_REQ } else { WORK };
            let seq = i as u16 + 1;
            send(&fw, signal, seq);
            expected.push((signal, seq));
        }
        kernel.run_until_idle();
        send(&fw, DONE, 500);
        for j in 0..later {
            let seq = 1000 + j as u16;
            send(&fw, WORK, seq);
            expected.push((WORK, seq));
        }
        kernel.run_until_idle();

        prop_assert_eq!(worker.handled.lock().unwrap().clone(), expected);
    }
}
