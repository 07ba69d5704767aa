//! # ATC Airspace Logger
//!
//! Server process entry point: creates the logger mailbox, registers in
//! the subsystem registry, and appends shipped snapshots to the history
//! log until told to stop.

use atc_common::config::AtcConfig;
use atc_common::consts::{SEG_LOGGER_MAILBOX, SEG_REGISTRY, SHM_ATTACH_ATTEMPTS, SHM_ATTACH_RETRY_MS};
use atc_common::logging::init_tracing;
use atc_common::shutdown::{install_shutdown_handler, shutdown_requested};
use atc_common::wire::Subsystem;
use atc_logger::history::HistoryLogger;
use atc_shared_memory::{MailboxServer, SubsystemRegistry};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "atc_logger", about = "ATC airspace history logger")]
struct Args {
    /// Path to the shared atc.toml configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("logger failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = AtcConfig::load(args.config.as_deref())?;
    let _log_guard = init_tracing("logger", &config.log_dir);
    install_shutdown_handler()?;

    info!("airspace logger starting");

    let mut server = MailboxServer::create(SEG_LOGGER_MAILBOX)?;

    let registry = SubsystemRegistry::attach_with_retry(
        SEG_REGISTRY,
        SHM_ATTACH_ATTEMPTS,
        Duration::from_millis(SHM_ATTACH_RETRY_MS),
    )?;
    registry.register(Subsystem::Logger);

    let logger = HistoryLogger::new(&config.log_dir.join("historylog.txt"));
    logger.run(&mut server, shutdown_requested);

    registry.deregister(Subsystem::Logger);
    info!("airspace logger exited");
    Ok(())
}
