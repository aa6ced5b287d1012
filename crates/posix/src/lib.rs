//! POSIX host port for the `fw` framework.
//!
//! Provides what a process needs around a kernel: logger installation, the
//! clock tick thread, Ctrl-C shutdown and a run loop that hosts every
//! execution context on its own OS thread.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fw::{Framework, FwError, Kernel};
use log::LevelFilter;
use thiserror::Error;

pub mod time;

pub use time::Ticker;

/// How often the run loop checks for shutdown.
const RUN_POLL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum PortError {
    #[error(transparent)]
    Fw(#[from] FwError),
    #[error("cannot start the tick thread: {0}")]
    Ticker(#[from] io::Error),
    #[error("cannot install the Ctrl-C handler: {0}")]
    CtrlC(#[from] ctrlc::Error),
}

/// Maps a verbosity of 0 to 5 onto a log level. Anything above 5 is
/// treated as 5.
pub fn verbosity_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Installs `env_logger` at the given verbosity. `RUST_LOG` still refines
/// the filter. Returns the level in effect.
pub fn init_logging(verbosity: u8) -> LevelFilter {
    let level = verbosity_level(verbosity);
    let installed = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
    if installed.is_err() {
        log::debug!("logger already installed");
    }
    level
}

/// Cloneable handle that stops a running [`PosixPort`] from any thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the process-level run state of one framework instance.
pub struct PosixPort {
    fw: Arc<Framework>,
    running: Arc<AtomicBool>,
}

impl PosixPort {
    pub fn new(fw: &Arc<Framework>) -> Self {
        Self {
            fw: Arc::clone(fw),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn fw(&self) -> &Arc<Framework> {
        &self.fw
    }

    /// Makes Ctrl-C stop the run loop. Can be installed once per process.
    pub fn handle_ctrl_c(&self) -> Result<(), PortError> {
        let running = Arc::clone(&self.running);
        ctrlc::set_handler(move || {
            log::info!("interrupted");
            running.store(false, Ordering::Release);
        })?;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Asks [`run`](Self::run) to return.
    pub fn stop(&self) {
        self.shutdown_handle().shutdown();
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.running))
    }

    /// Runs `kernel` with one thread per execution context until stopped.
    pub fn run(&self, kernel: Kernel) -> Result<(), PortError> {
        self.run_until(kernel, None)
    }

    /// Like [`run`](Self::run), but returns after `limit` at the latest.
    pub fn run_for(&self, kernel: Kernel, limit: Duration) -> Result<(), PortError> {
        self.run_until(kernel, Some(Instant::now() + limit))
    }

    fn run_until(&self, kernel: Kernel, deadline: Option<Instant>) -> Result<(), PortError> {
        let handle = kernel.spawn()?;
        let ticker = Ticker::start(&self.fw)?;
        log::info!("{} running", self.fw.config().name);

        while self.is_running() && deadline.map_or(true, |d| Instant::now() < d) {
            thread::sleep(RUN_POLL);
        }

        ticker.stop();
        handle.join();
        log::info!("{} stopped", self.fw.config().name);
        Ok(())
    }
}
