//! Process lifecycle management.
//!
//! The supervisor owns the shared segments for their whole life: it
//! creates them zero-filled before any child starts and unlinks them on
//! drop, so children can attach by fixed name with bounded retry in any
//! launch order.

use atc_common::config::AtcConfig;
use atc_common::consts::{
    SEG_COMMANDS, SEG_DISPLAY_MAILBOX, SEG_FLEET, SEG_LOGGER_MAILBOX, SEG_OPERATOR_MAILBOX,
    SEG_REGISTRY,
};
use atc_common::shutdown::shutdown_requested;
use atc_common::wire::{FleetSnapshot, Subsystem};
use atc_shared_memory::{CommandRing, Segment, ShmError, SubsystemRegistry};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::path::PathBuf;
use std::process::{Child, Command};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Registry/liveness sweep interval.
const MONITOR_PERIOD: Duration = Duration::from_secs(5);

/// Grace period between SIGTERM and SIGKILL at shutdown.
const TERM_GRACE: Duration = Duration::from_secs(5);

/// Subsystems expected in the registry once the system is up.
const REQUIRED: [Subsystem; 4] = [
    Subsystem::Operator,
    Subsystem::Display,
    Subsystem::Logger,
    Subsystem::Computer,
];

/// Launch phases in dependency order: servers first, the radar last so
/// aircraft only fly once someone is watching.
const LAUNCH_ORDER: [&str; 5] = [
    "atc_operator",
    "atc_display",
    "atc_logger",
    "atc_computer",
    "atc_radar",
];

/// A launched subsystem process.
struct ManagedChild {
    name: &'static str,
    child: Child,
}

/// The supervisor: segment owner and process manager.
pub struct Supervisor {
    // Segments live exactly as long as the supervisor; dropping them
    // unlinks the backing files.
    _fleet: Segment,
    _ring: CommandRing,
    registry: SubsystemRegistry,
    children: Vec<ManagedChild>,
    config_path: Option<PathBuf>,
    fleet_file: Option<PathBuf>,
    settle: Duration,
}

impl Supervisor {
    /// Create all shared segments. Fatal if any cannot be established.
    pub fn create(
        config: &AtcConfig,
        config_path: Option<PathBuf>,
        fleet_file: Option<PathBuf>,
    ) -> Result<Self, ShmError> {
        // A crashed previous run leaves segment files behind; the
        // supervisor owns the namespace, so sweep them first.
        for name in [
            SEG_FLEET,
            SEG_COMMANDS,
            SEG_REGISTRY,
            SEG_OPERATOR_MAILBOX,
            SEG_DISPLAY_MAILBOX,
            SEG_LOGGER_MAILBOX,
        ] {
            atc_shared_memory::platform::unlink_segment(name);
        }

        let fleet = Segment::create(SEG_FLEET, core::mem::size_of::<FleetSnapshot>())?;
        let ring = CommandRing::create(SEG_COMMANDS)?;
        let registry = SubsystemRegistry::create(SEG_REGISTRY)?;
        info!("shared segments created");

        Ok(Self {
            _fleet: fleet,
            _ring: ring,
            registry,
            children: Vec::new(),
            config_path,
            fleet_file: fleet_file.or_else(|| config.fleet_file.clone()),
            settle: Duration::from_millis(config.launch_settle_ms),
        })
    }

    /// Launch every subsystem in dependency order.
    ///
    /// A failed spawn aborts the launch; already-running children are
    /// torn down by the caller via `shutdown_all`.
    pub fn launch_all(&mut self) -> Result<(), std::io::Error> {
        let bin_dir = std::env::current_exe()?
            .parent()
            .map(PathBuf::from)
            .unwrap_or_default();

        for name in LAUNCH_ORDER {
            match self.spawn(&bin_dir, name) {
                Ok(child) => {
                    info!(subsystem = name, pid = child.id(), "launched");
                    self.children.push(ManagedChild { name, child });
                }
                Err(e) => {
                    error!(subsystem = name, "spawn failed: {e}");
                    return Err(e);
                }
            }
            // Give servers a moment to create their mailboxes and
            // register before their clients start attaching.
            std::thread::sleep(self.settle);
        }
        Ok(())
    }

    fn spawn(&self, bin_dir: &PathBuf, name: &str) -> Result<Child, std::io::Error> {
        let mut command = Command::new(bin_dir.join(name));
        if let Some(config) = &self.config_path {
            command.arg("--config").arg(config);
        }
        if name == "atc_radar" {
            if let Some(fleet) = &self.fleet_file {
                command.arg("--fleet-file").arg(fleet);
            }
        }
        command.spawn()
    }

    /// Periodic sweep until a shutdown signal arrives: warn on vacant
    /// or dead registry entries and on children that exited on their
    /// own.
    pub fn monitor_until_shutdown(&mut self) {
        info!("monitoring subsystems");
        let mut next_sweep = Instant::now() + MONITOR_PERIOD;
        while !shutdown_requested() {
            std::thread::sleep(Duration::from_millis(200));
            if Instant::now() < next_sweep {
                continue;
            }
            next_sweep = Instant::now() + MONITOR_PERIOD;

            let unhealthy = self.registry.validate(&REQUIRED);
            if !unhealthy.is_empty() {
                warn!(
                    missing = unhealthy.len(),
                    "registry validation found unhealthy subsystems"
                );
            }

            for managed in &mut self.children {
                match managed.child.try_wait() {
                    Ok(Some(status)) => {
                        warn!(
                            subsystem = managed.name,
                            %status,
                            "child exited unexpectedly"
                        );
                    }
                    Ok(None) => {}
                    Err(e) => warn!(subsystem = managed.name, "wait failed: {e}"),
                }
            }
        }
    }

    /// Terminate every child in reverse launch order: SIGTERM, bounded
    /// grace, SIGKILL escalation, then reap.
    pub fn shutdown_all(&mut self) {
        info!("shutting down subsystems");
        for managed in self.children.iter_mut().rev() {
            let pid = Pid::from_raw(managed.child.id() as i32);
            if let Err(e) = kill(pid, Signal::SIGTERM) {
                // Already gone is fine.
                if e != nix::Error::ESRCH {
                    warn!(subsystem = managed.name, "SIGTERM failed: {e}");
                }
            }

            let deadline = Instant::now() + TERM_GRACE;
            let exited = loop {
                match managed.child.try_wait() {
                    Ok(Some(_)) => break true,
                    Ok(None) if Instant::now() >= deadline => break false,
                    Ok(None) => std::thread::sleep(Duration::from_millis(100)),
                    Err(_) => break true,
                }
            };

            if !exited {
                warn!(subsystem = managed.name, "unresponsive, escalating to SIGKILL");
                let _ = kill(pid, Signal::SIGKILL);
                let _ = managed.child.wait();
            }
            info!(subsystem = managed.name, "stopped");
        }
        self.children.clear();
    }
}
