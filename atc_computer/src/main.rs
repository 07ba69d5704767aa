//! # ATC Computer
//!
//! Analyzer process entry point: waits for the server subsystems to
//! register, attaches to the airspace store, command ring and the three
//! server mailboxes, then runs the pulse loop with the emergency
//! monitor on a side thread.

use atc_common::config::AtcConfig;
use atc_common::clock::SimClock;
use atc_common::consts::{
    SEG_COMMANDS, SEG_DISPLAY_MAILBOX, SEG_FLEET, SEG_LOGGER_MAILBOX, SEG_OPERATOR_MAILBOX,
    SEG_REGISTRY, SHM_ATTACH_ATTEMPTS, SHM_ATTACH_RETRY_MS,
};
use atc_common::logging::init_tracing;
use atc_common::shutdown::{
    install_emergency_handler, install_shutdown_handler, shutdown_requested,
};
use atc_common::wire::{FleetSnapshot, Subsystem};
use atc_computer::analyzer::{Analyzer, AnalyzerShared};
use atc_computer::emergency::EmergencyMonitor;
use atc_computer::scheduler::{pulse_channel, Scheduler};
use atc_shared_memory::{
    CommandRing, MailboxClient, SlotReader, SubsystemRegistry,
};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "atc_computer", about = "ATC separation analyzer")]
struct Args {
    /// Path to the shared atc.toml configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("computer failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = AtcConfig::load(args.config.as_deref())?;
    let _log_guard = init_tracing("computer", &config.log_dir);
    install_shutdown_handler()?;
    install_emergency_handler()?;

    info!(
        horizon_s = config.congestion_horizon_s,
        "computer starting"
    );

    let retry = Duration::from_millis(SHM_ATTACH_RETRY_MS);

    // Servers must be up before the analyzer can talk to anyone.
    let registry =
        SubsystemRegistry::attach_with_retry(SEG_REGISTRY, SHM_ATTACH_ATTEMPTS, retry)?;
    registry.wait_for(
        &[Subsystem::Operator, Subsystem::Display, Subsystem::Logger],
        config.registry_attempts,
        Duration::from_millis(config.registry_retry_ms),
    )?;
    registry.register(Subsystem::Computer);

    let ring = CommandRing::attach_with_retry(SEG_COMMANDS, SHM_ATTACH_ATTEMPTS, retry)?;
    let fleet_reader =
        SlotReader::<FleetSnapshot>::attach_with_retry(SEG_FLEET, SHM_ATTACH_ATTEMPTS, retry)?;
    let emergency_reader =
        SlotReader::<FleetSnapshot>::attach_with_retry(SEG_FLEET, SHM_ATTACH_ATTEMPTS, retry)?;

    let operator = MailboxClient::attach_with_retry(SEG_OPERATOR_MAILBOX, SHM_ATTACH_ATTEMPTS, retry)?;
    let display = MailboxClient::attach_with_retry(SEG_DISPLAY_MAILBOX, SHM_ATTACH_ATTEMPTS, retry)?;
    let logger = MailboxClient::attach_with_retry(SEG_LOGGER_MAILBOX, SHM_ATTACH_ATTEMPTS, retry)?;

    let shared = Arc::new(AnalyzerShared::new(operator, config.congestion_horizon_s));

    let mut emergency = EmergencyMonitor::new(Arc::clone(&shared), emergency_reader);
    let emergency_thread = std::thread::spawn(move || emergency.run(shutdown_requested));

    let (pulse_tx, pulse_rx) = pulse_channel();
    let scheduler = Scheduler::start(pulse_tx);

    let mut analyzer = Analyzer::new(
        shared,
        fleet_reader,
        ring,
        display,
        logger,
        SimClock::start_now(),
    );
    analyzer.run(&pulse_rx, shutdown_requested);

    // Orderly wind-down within one pulse period.
    analyzer.send_exit_records();
    scheduler.stop();
    let _ = emergency_thread.join();
    registry.deregister(Subsystem::Computer);

    info!("computer exited");
    Ok(())
}
