//! # ATC Data Display
//!
//! Server process entry point: creates the display mailbox, registers
//! in the subsystem registry, and serves analyzer records until told to
//! stop.

use atc_common::config::AtcConfig;
use atc_common::consts::{SEG_DISPLAY_MAILBOX, SEG_REGISTRY, SHM_ATTACH_ATTEMPTS, SHM_ATTACH_RETRY_MS};
use atc_common::logging::init_tracing;
use atc_common::shutdown::{install_shutdown_handler, shutdown_requested};
use atc_common::wire::Subsystem;
use atc_display::server::DisplayServer;
use atc_shared_memory::{MailboxServer, SubsystemRegistry};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "atc_display", about = "ATC data display server")]
struct Args {
    /// Path to the shared atc.toml configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("display failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = AtcConfig::load(args.config.as_deref())?;
    let _log_guard = init_tracing("display", &config.log_dir);
    install_shutdown_handler()?;

    info!("display starting");

    let mut server = MailboxServer::create(SEG_DISPLAY_MAILBOX)?;

    let registry = SubsystemRegistry::attach_with_retry(
        SEG_REGISTRY,
        SHM_ATTACH_ATTEMPTS,
        Duration::from_millis(SHM_ATTACH_RETRY_MS),
    )?;
    registry.register(Subsystem::Display);

    let display = DisplayServer::new(&config.log_dir.join("airspacelog.txt"));
    display.run(&mut server, shutdown_requested);

    registry.deregister(Subsystem::Display);
    info!("display exited");
    Ok(())
}
