//! # ATC Radar
//!
//! Radar process entry point: loads the fleet seed file, attaches to the
//! shared airspace store and command ring, then runs the publisher loop
//! with the relay on a side thread and one integrator thread per
//! tracked aircraft.

use atc_common::config::AtcConfig;
use atc_common::consts::{SEG_COMMANDS, SEG_FLEET, SHM_ATTACH_ATTEMPTS, SHM_ATTACH_RETRY_MS};
use atc_common::logging::init_tracing;
use atc_common::shutdown::{install_shutdown_handler, shutdown_requested};
use atc_common::wire::FleetSnapshot;
use atc_common::clock::SimClock;
use atc_radar::fleet::Fleet;
use atc_radar::loader::load_fleet_file;
use atc_radar::radar::Radar;
use atc_radar::relay::Relay;
use atc_shared_memory::{CommandRing, SlotWriter};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "atc_radar", about = "ATC radar publisher and command relay")]
struct Args {
    /// Path to the shared atc.toml configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fleet seed file (overrides the config value).
    #[arg(short, long)]
    fleet_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("radar failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = AtcConfig::load(args.config.as_deref())?;
    let _log_guard = init_tracing("radar", &config.log_dir);
    install_shutdown_handler()?;

    info!("radar starting");

    let retry = Duration::from_millis(SHM_ATTACH_RETRY_MS);
    let writer =
        SlotWriter::<FleetSnapshot>::attach_with_retry(SEG_FLEET, SHM_ATTACH_ATTEMPTS, retry)?;
    let ring = CommandRing::attach_with_retry(SEG_COMMANDS, SHM_ATTACH_ATTEMPTS, retry)?;

    let fleet_path = args.fleet_file.or_else(|| config.fleet_file.clone());
    let schedule = match &fleet_path {
        Some(path) => {
            let schedule = load_fleet_file(path)?;
            info!(
                fleet_file = %path.display(),
                aircraft = schedule.len(),
                "fleet schedule loaded"
            );
            schedule
        }
        None => {
            warn!("no fleet file configured, starting with an empty airspace");
            Vec::new()
        }
    };

    let clock = SimClock::start_now();
    let fleet = Arc::new(Fleet::new());

    let relay = Relay::new(
        Arc::clone(&fleet),
        ring,
        Duration::from_millis(config.relay_idle_sleep_ms),
    );
    let relay_thread = std::thread::spawn(move || relay.run(shutdown_requested));

    let mut radar = Radar::new(Arc::clone(&fleet), writer, clock, schedule);
    radar.run(shutdown_requested);

    // Orderly wind-down: integrators first, then the relay.
    fleet.stop_all();
    if relay_thread.join().is_err() {
        warn!("relay thread panicked during shutdown");
    }

    info!("radar exited");
    Ok(())
}
