//! System-wide constants for the ATC workspace.
//!
//! Single source of truth for all numeric limits, cadences and default
//! paths. Imported by all crates — no duplication permitted.

/// Western airspace boundary [ft].
pub const AIRSPACE_X_MIN: f64 = 0.0;

/// Eastern airspace boundary [ft].
pub const AIRSPACE_X_MAX: f64 = 100_000.0;

/// Southern airspace boundary [ft].
pub const AIRSPACE_Y_MIN: f64 = 0.0;

/// Northern airspace boundary [ft].
pub const AIRSPACE_Y_MAX: f64 = 100_000.0;

/// Floor of the controlled volume [ft].
pub const AIRSPACE_Z_MIN: f64 = 0.0;

/// Ceiling of the controlled volume [ft].
pub const AIRSPACE_Z_MAX: f64 = 25_000.0;

/// Maximum number of concurrently tracked aircraft.
pub const MAX_FLEET: usize = 10;

/// Command ring slot count. Usable capacity is `MAX_COMMANDS - 1`.
pub const MAX_COMMANDS: usize = 10;

/// Minimum lateral separation between aircraft [ft].
pub const MIN_HORIZONTAL_SEPARATION_FT: f64 = 3000.0;

/// Minimum vertical separation between aircraft [ft].
pub const MIN_VERTICAL_SEPARATION_FT: f64 = 1000.0;

/// Initial forward prediction window for violation checks [s].
pub const DEFAULT_CONGESTION_HORIZON_S: u32 = 120;

/// `|Δv|²` below this is treated as zero relative motion.
pub const RELATIVE_VELOCITY_EPSILON: f64 = 1e-3;

// ─── Cadences ───────────────────────────────────────────────────────

/// Violation prediction period [s].
pub const VIOLATION_CHECK_PERIOD_S: u64 = 1;

/// Operator command poll period [s].
pub const OPERATOR_POLL_PERIOD_S: u64 = 1;

/// Console grid emission period [s].
pub const CONSOLE_LOG_PERIOD_S: u64 = 5;

/// File log emission period [s].
pub const FILE_LOG_PERIOD_S: u64 = 20;

/// Airspace-logger snapshot shipping period [s].
pub const AIRSPACE_LOG_PERIOD_S: u64 = 20;

/// Radar snapshot publication period [s].
pub const RADAR_PUBLISH_PERIOD_S: u64 = 1;

/// Relay sleep while the command ring is empty [ms].
pub const RELAY_IDLE_SLEEP_MS: u64 = 100;

// ─── Retry policy ───────────────────────────────────────────────────

/// Registry population wait: attempt count.
pub const REGISTRY_WAIT_ATTEMPTS: u32 = 30;

/// Registry population wait: interval between attempts [ms].
pub const REGISTRY_WAIT_INTERVAL_MS: u64 = 1000;

/// Shared-memory attach: attempt count.
pub const SHM_ATTACH_ATTEMPTS: u32 = 5;

/// Shared-memory attach: interval between attempts [ms].
pub const SHM_ATTACH_RETRY_MS: u64 = 500;

// ─── Segment names (supervisor-owned, fixed) ────────────────────────

/// Fleet snapshot slot segment.
pub const SEG_FLEET: &str = "fleet";

/// Command ring segment.
pub const SEG_COMMANDS: &str = "commands";

/// Subsystem registry segment.
pub const SEG_REGISTRY: &str = "registry";

/// Analyzer → operator console mailbox segment.
pub const SEG_OPERATOR_MAILBOX: &str = "operator_mbx";

/// Analyzer → data display mailbox segment.
pub const SEG_DISPLAY_MAILBOX: &str = "display_mbx";

/// Analyzer → airspace logger mailbox segment.
pub const SEG_LOGGER_MAILBOX: &str = "logger_mbx";

// ─── Paths ──────────────────────────────────────────────────────────

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "/tmp/atc/logs";

/// Whether a position lies inside the airspace box (boundaries included).
#[inline]
pub fn within_airspace(x: f64, y: f64, z: f64) -> bool {
    x >= AIRSPACE_X_MIN
        && x <= AIRSPACE_X_MAX
        && y >= AIRSPACE_Y_MIN
        && y <= AIRSPACE_Y_MAX
        && z >= AIRSPACE_Z_MIN
        && z <= AIRSPACE_Z_MAX
}

/// Clamp a position onto the airspace box.
#[inline]
pub fn clamp_into_airspace(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    (
        x.clamp(AIRSPACE_X_MIN, AIRSPACE_X_MAX),
        y.clamp(AIRSPACE_Y_MIN, AIRSPACE_Y_MAX),
        z.clamp(AIRSPACE_Z_MIN, AIRSPACE_Z_MAX),
    )
}
