//! # ATC Supervisor
//!
//! Central coordinator for the simulator. Creates and zero-initializes
//! every shared segment before any child runs, launches the subsystem
//! processes in dependency order (servers before clients, with settle
//! pauses), monitors registry population and child liveness, and tears
//! the system down in reverse order on SIGINT/SIGTERM.

mod supervisor;

use atc_common::config::AtcConfig;
use atc_common::logging::init_tracing;
use atc_common::shutdown::install_shutdown_handler;
use clap::Parser;
use std::path::PathBuf;
use supervisor::Supervisor;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "atc", about = "ATC simulator supervisor and launcher")]
struct Args {
    /// Path to the shared atc.toml configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fleet seed file, forwarded to the radar process.
    #[arg(short, long)]
    fleet_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("supervisor failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = AtcConfig::load(args.config.as_deref())?;
    let _log_guard = init_tracing("supervisor", &config.log_dir);
    install_shutdown_handler()?;

    info!("supervisor starting");

    let mut supervisor = Supervisor::create(&config, args.config.clone(), args.fleet_file.clone())?;
    supervisor.launch_all()?;
    supervisor.monitor_until_shutdown();
    supervisor.shutdown_all();

    info!("supervisor exited");
    Ok(())
}
