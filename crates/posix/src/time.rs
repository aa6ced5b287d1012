//! Clock tick service.
//!
//! A dedicated thread drives [`Framework::tick`] once per configured tick
//! period. It sleeps until the next absolute tick time rather than for a
//! relative duration, so ticks do not drift.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use fw::Framework;

/// Handle to a running tick thread. Dropping it stops the thread.
pub struct Ticker {
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Starts ticking `fw` every `ms_per_tick` milliseconds.
    pub fn start(fw: &Arc<Framework>) -> io::Result<Self> {
        let period = Duration::from_millis(u64::from(fw.config().ms_per_tick));
        let running = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicU64::new(0));

        let fw = Arc::clone(fw);
        let flag = Arc::clone(&running);
        let counter = Arc::clone(&ticks);
        let thread = thread::Builder::new()
            .name("tick".to_string())
            .spawn(move || tick_loop(&fw, period, &flag, &counter))?;
        log::info!("ticker started, period {period:?}");

        Ok(Self {
            running,
            ticks,
            thread: Some(thread),
        })
    }

    /// Number of ticks delivered so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stops the thread and waits for it.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("tick thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn tick_loop(fw: &Framework, period: Duration, running: &AtomicBool, ticks: &AtomicU64) {
    let mut next_tick = Instant::now();
    while running.load(Ordering::Acquire) {
        next_tick += period;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        }
        fw.tick();
        ticks.fetch_add(1, Ordering::Relaxed);
    }
    log::info!("ticker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use fw::FwConfig;

    #[test]
    fn ticker_counts_and_stops() {
        let fw = Framework::new(FwConfig::builder().ms_per_tick(1).build());
        let ticker = Ticker::start(&fw).unwrap();
        assert!(ticker.is_running());

        let deadline = Instant::now() + Duration::from_secs(2);
        while ticker.ticks() < 5 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(ticker.ticks() >= 5);
        ticker.stop();
    }
}
