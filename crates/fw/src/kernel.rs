//! Scheduling of execution contexts.
//!
//! The same set of contexts can be run two ways: cooperatively on the
//! caller's thread, always serving the highest-priority context with pending
//! events, or preemptively with one OS thread per context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::active::ActiveRunnable;
use crate::error::{FwError, FwResult};
use crate::framework::Framework;

/// How long a context thread waits for an event before checking for stop.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct KernelBuilder {
    fw: Arc<Framework>,
    objects: Vec<Box<dyn ActiveRunnable>>,
}

impl KernelBuilder {
    pub fn new(fw: &Arc<Framework>) -> Self {
        Self {
            fw: Arc::clone(fw),
            objects: Vec::new(),
        }
    }

    pub fn register(mut self, object: impl ActiveRunnable + 'static) -> Self {
        self.objects.push(Box::new(object));
        self
    }

    pub fn build(mut self) -> FwResult<Kernel> {
        self.objects.sort_by_key(|ao| ao.priority());
        if let Some(pair) = self
            .objects
            .windows(2)
            .find(|w| w[0].priority() == w[1].priority())
        {
            return Err(FwError::DuplicatePriority(pair[0].priority()));
        }
        Ok(Kernel {
            fw: self.fw,
            objects: self.objects,
            started: false,
        })
    }
}

pub struct Kernel {
    fw: Arc<Framework>,
    objects: Vec<Box<dyn ActiveRunnable>>,
    started: bool,
}

impl Kernel {
    pub fn builder(fw: &Arc<Framework>) -> KernelBuilder {
        KernelBuilder::new(fw)
    }

    pub fn fw(&self) -> &Arc<Framework> {
        &self.fw
    }

    /// Registers and initializes every context, lowest priority first.
    /// Idempotent.
    pub fn start(&mut self) -> FwResult<()> {
        if self.started {
            return Ok(());
        }
        for ao in self.objects.iter_mut() {
            ao.start()?;
        }
        self.started = true;
        Ok(())
    }

    /// Dispatches one event of the highest-priority context with pending
    /// events. Returns `false` when all queues are empty.
    pub fn dispatch_once(&mut self) -> bool {
        match self.objects.iter_mut().rev().find(|ao| ao.has_events()) {
            Some(ao) => ao.dispatch_one(),
            None => false,
        }
    }

    pub fn run_until_idle(&mut self) {
        while self.dispatch_once() {}
        if let Some(idle) = self.fw.config().idle_callback {
            idle();
        }
    }

    /// Advances timers by one tick and runs until idle.
    pub fn tick_and_run(&mut self) {
        self.fw.tick();
        self.run_until_idle();
    }

    /// Starts the contexts if needed and moves each onto its own thread.
    pub fn spawn(mut self) -> FwResult<KernelHandle> {
        self.start()?;
        let running = Arc::new(AtomicBool::new(true));
        let mut threads = Vec::with_capacity(self.objects.len());
        for mut ao in self.objects {
            let flag = Arc::clone(&running);
            let name = ao.name();
            let handle = thread::Builder::new()
                .name(name.to_string())
                .spawn(move || {
                    let queue = Arc::clone(ao.queue());
                    while flag.load(Ordering::Acquire) {
                        if let Some(e) = queue.get_timeout(POLL_INTERVAL) {
                            ao.dispatch(e);
                        }
                    }
                    log::info!("{name} stopped");
                });
            match handle {
                Ok(handle) => threads.push(handle),
                Err(err) => {
                    log::error!("spawning {name}: {err}");
                    running.store(false, Ordering::Release);
                    return Err(FwError::Spawn(name));
                }
            }
        }
        Ok(KernelHandle { running, threads })
    }
}

/// Threads of a spawned kernel.
pub struct KernelHandle {
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl KernelHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Asks every context thread to stop after its current event.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    /// Stops and waits for every context thread.
    pub fn join(self) {
        self.stop();
        for t in self.threads {
            if t.join().is_err() {
                log::error!("context thread panicked");
            }
        }
    }
}
