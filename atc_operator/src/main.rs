//! # ATC Operator Console
//!
//! Server process entry point: creates the operator mailbox, registers
//! in the subsystem registry, then serves analyzer requests with a
//! stdin reader thread feeding the pending-command FIFO.

use atc_common::config::AtcConfig;
use atc_common::consts::SEG_OPERATOR_MAILBOX;
use atc_common::logging::init_tracing;
use atc_common::shutdown::{install_shutdown_handler, shutdown_requested};
use atc_common::wire::Subsystem;
use atc_operator::console::OperatorConsole;
use atc_shared_memory::{MailboxServer, SubsystemRegistry};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "atc_operator", about = "ATC operator console server")]
struct Args {
    /// Path to the shared atc.toml configuration.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("operator failed: {e}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = AtcConfig::load(args.config.as_deref())?;
    let _log_guard = init_tracing("operator", &config.log_dir);
    install_shutdown_handler()?;

    info!("operator console starting");

    // Creating our own channel is the one fatal startup step.
    let mut server = MailboxServer::create(SEG_OPERATOR_MAILBOX)?;

    let registry = SubsystemRegistry::attach_with_retry(
        atc_common::consts::SEG_REGISTRY,
        atc_common::consts::SHM_ATTACH_ATTEMPTS,
        Duration::from_millis(atc_common::consts::SHM_ATTACH_RETRY_MS),
    )?;
    registry.register(Subsystem::Operator);

    let console = Arc::new(OperatorConsole::new(Some(
        &config.log_dir.join("commandlog.txt"),
    )));

    // The stdin reader blocks on input for its whole life; it dies with
    // the process.
    let reader_console = Arc::clone(&console);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        reader_console.run_stdin_reader(stdin.lock());
    });

    console.run_server(&mut server, shutdown_requested);

    registry.deregister(Subsystem::Operator);
    info!("operator console exited");
    Ok(())
}
