//! Composite active object demo.
//!
//! A `System` active object starts a `Composite` active object, which fans
//! start requests out to three subsystem regions and waits for all of them.
//! After a short run the system stops the composite with two stop requests
//! back to back; the composite defers the second one until the first has
//! completed.

mod composite;
mod signals;
mod subsystem;
mod system;

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use fw::{ActiveObject, Framework, FwConfig, Kernel, Region};
use fw_posix::PosixPort;

use crate::composite::Composite;
use crate::signals::{subsystem_hsmn, COMPOSITE, SUBSYSTEM_COUNT, SYSTEM};
use crate::subsystem::Subsystem;
use crate::system::System;

const SUBSYSTEM_NAMES: [&str; SUBSYSTEM_COUNT as usize] = ["SubsystemA", "SubsystemB", "SubsystemC"];

#[derive(Parser, Debug)]
#[command(name = "composite")]
#[command(about = "Composite active object fanning out requests to regions", long_about = None)]
#[command(version)]
struct Args {
    /// Log verbosity, 0 (off) to 5 (trace)
    #[arg(short, long, default_value_t = 3)]
    verbosity: u8,

    /// Make the subsystem with this index (0-2) fail to start
    #[arg(short, long)]
    fail_region: Option<u8>,

    /// Upper bound on the run time in milliseconds
    #[arg(short, long, default_value_t = 5000)]
    run_ms: u64,

    /// How long the composite stays started, in milliseconds
    #[arg(long, default_value_t = 300)]
    hold_ms: u32,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(index) = args.fail_region {
        ensure!(
            index < SUBSYSTEM_COUNT,
            "--fail-region must be below {SUBSYSTEM_COUNT}"
        );
    }

    let level = fw_posix::init_logging(args.verbosity);
    let fw = Framework::new(FwConfig::builder().name("Composite").build());
    signals::register_names(&fw);
    if level >= log::LevelFilter::Debug {
        fw.log_on_all();
    }

    let port = PosixPort::new(&fw);
    port.handle_ctrl_c()?;

    let system = ActiveObject::new(
        &fw,
        SYSTEM,
        "System",
        1,
        System::new(args.hold_ms, port.shutdown_handle()),
    );
    let mut composite = ActiveObject::new(&fw, COMPOSITE, "Composite", 2, Composite::default());
    for (i, name) in (0..SUBSYSTEM_COUNT).zip(SUBSYSTEM_NAMES) {
        let delay_ms = 50 + 40 * u32::from(i);
        let fail = args.fail_region == Some(i);
        composite
            .add_region(Region::new(&fw, subsystem_hsmn(i), name, Subsystem::new(delay_ms, fail)))
            .with_context(|| format!("adding {name}"))?;
    }

    let kernel = Kernel::builder(&fw)
        .register(system)
        .register(composite)
        .build()?;
    port.run_for(kernel, Duration::from_millis(args.run_ms))?;

    for hsmn in [SYSTEM, COMPOSITE]
        .into_iter()
        .chain((0..SUBSYSTEM_COUNT).map(subsystem_hsmn))
    {
        log::info!(
            "{} ended in {}",
            fw.hsm_name(hsmn),
            fw.state_of(hsmn).unwrap_or("UNDEF")
        );
    }
    Ok(())
}
