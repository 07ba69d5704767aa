//! Fleet seed file loader.
//!
//! One aircraft per whitespace-separated line:
//!
//! ```text
//! enterTimeSec  id  x  y  z  vx  vy  vz
//! ```
//!
//! An optional header line and malformed lines are warned about and
//! skipped; a bad line never aborts the load. Aircraft with enter time 0
//! are admitted immediately, the rest are held in the radar's backlog
//! until simulated time reaches their second.

use atc_common::geometry::Vec3;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Fleet file loading errors. Per-line problems are skipped, not raised.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("failed to read fleet file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// One aircraft awaiting admission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledAircraft {
    /// Simulated second at which the aircraft enters the airspace.
    pub enter_time: f64,
    pub id: i32,
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Parse one seed line. `None` for comments and blank lines, `Err` with
/// a reason for malformed ones.
fn parse_line(line: &str) -> Result<Option<ScheduledAircraft>, String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = trimmed.split_whitespace().collect();
    if fields.len() != 8 {
        return Err(format!("expected 8 fields, found {}", fields.len()));
    }

    let enter_time: f64 = fields[0]
        .parse()
        .map_err(|_| format!("bad enter time '{}'", fields[0]))?;
    let id: i32 = fields[1]
        .parse()
        .map_err(|_| format!("bad plane id '{}'", fields[1]))?;

    let mut values = [0.0f64; 6];
    for (i, field) in fields[2..].iter().enumerate() {
        values[i] = field
            .parse()
            .map_err(|_| format!("bad numeric field '{field}'"))?;
    }

    if enter_time < 0.0 || !enter_time.is_finite() {
        return Err(format!("enter time {enter_time} out of range"));
    }
    if id < 0 {
        return Err(format!("plane id {id} out of range"));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err("non-finite position or velocity".to_string());
    }

    Ok(Some(ScheduledAircraft {
        enter_time,
        id,
        position: Vec3::new(values[0], values[1], values[2]),
        velocity: Vec3::new(values[3], values[4], values[5]),
    }))
}

/// Parse a whole seed document, skipping bad lines with a warning.
/// Entries come back sorted by enter time.
pub fn parse_fleet(text: &str) -> Vec<ScheduledAircraft> {
    let mut schedule = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(aircraft)) => schedule.push(aircraft),
            Ok(None) => {}
            Err(reason) => {
                // The first line is commonly a header; anything else
                // malformed is worth a louder note either way.
                warn!(line = lineno + 1, "skipping fleet line: {reason}");
            }
        }
    }
    schedule.sort_by(|a, b| a.enter_time.total_cmp(&b.enter_time));
    schedule
}

/// Load and parse a fleet seed file.
pub fn load_fleet_file(path: &Path) -> Result<Vec<ScheduledAircraft>, LoaderError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoaderError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_fleet(&text))
}
