//! Emergency fast path.
//!
//! A dedicated thread watches the edge-triggered emergency flag
//! (raised by SIGUSR1). On each event it runs an immediate violation
//! sweep — bypassing the 1 s cadence — and delivers the system-wide
//! `(-1, -1, 0)` alert. Triggers arriving while one event is being
//! processed coalesce into a single follow-up.

use crate::analyzer::AnalyzerShared;
use atc_common::shutdown::take_emergency;
use atc_common::wire::FleetSnapshot;
use atc_shared_memory::SlotReader;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Interval between flag polls. Signal handlers can only flip an
/// atomic, so the monitor wakes briefly to observe it.
const FLAG_POLL: Duration = Duration::from_millis(100);

/// The emergency monitor task.
pub struct EmergencyMonitor {
    shared: Arc<AnalyzerShared>,
    fleet_reader: SlotReader<FleetSnapshot>,
}

impl EmergencyMonitor {
    pub fn new(shared: Arc<AnalyzerShared>, fleet_reader: SlotReader<FleetSnapshot>) -> Self {
        Self {
            shared,
            fleet_reader,
        }
    }

    /// Poll the emergency flag until `should_stop` turns true.
    pub fn run(&mut self, should_stop: impl Fn() -> bool) {
        while !should_stop() {
            std::thread::sleep(FLAG_POLL);
            if take_emergency() {
                self.handle_event();
            }
        }
    }

    /// Service one emergency event.
    pub fn handle_event(&mut self) {
        warn!("emergency event received, running immediate violation check");
        self.shared.checked_violation_sweep(&mut self.fleet_reader);
        if self.shared.send_emergency_alert() {
            warn!("system-wide emergency alert delivered");
        }
    }
}
