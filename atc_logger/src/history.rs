//! History log formatting and serving.

use atc_common::wire::{Ack, AirspaceLogRecord, LoggerKind};
use atc_shared_memory::MailboxServer;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Interval between mailbox polls in the server loop.
const SERVE_POLL: Duration = Duration::from_millis(5);

/// Format one shipped snapshot as history-log text.
pub fn format_record(record: &AirspaceLogRecord) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "t={:.1}s {} aircraft\n",
        record.timestamp,
        record.len()
    ));
    for i in 0..record.len() {
        let p = record.positions[i];
        let v = record.velocities[i];
        out.push_str(&format!(
            "  plane {:>3}  pos ({:>9.1}, {:>9.1}, {:>8.1})  vel ({:>7.1}, {:>7.1}, {:>6.1})\n",
            p.plane_id, p.x, p.y, p.z, v.vx, v.vy, v.vz
        ));
    }
    out
}

/// The history logger task.
pub struct HistoryLogger {
    history_log: PathBuf,
}

impl HistoryLogger {
    pub fn new(history_log: &Path) -> Self {
        Self {
            history_log: history_log.to_path_buf(),
        }
    }

    /// Handle one record. Returns `false` on `EXIT`.
    pub fn handle_record(&self, record: &AirspaceLogRecord) -> bool {
        match record.logger_kind() {
            Some(LoggerKind::LogAirspace) => {
                let entry = format_record(record);
                let result = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&self.history_log)
                    .and_then(|mut file| file.write_all(entry.as_bytes()));
                if let Err(e) = result {
                    warn!("history log write failed: {e}");
                }
            }
            Some(LoggerKind::Exit) => {
                info!("logger received exit record");
                return false;
            }
            None => warn!(kind = record.kind, "unknown logger record kind"),
        }
        true
    }

    /// Mailbox serving loop; acknowledges every record.
    pub fn run(
        &self,
        server: &mut MailboxServer<AirspaceLogRecord, Ack>,
        should_stop: impl Fn() -> bool,
    ) {
        info!("airspace logger serving");
        while !should_stop() {
            match server.try_receive() {
                Some(record) => {
                    let keep_going = self.handle_record(&record);
                    server.reply(&Ack::ok());
                    if !keep_going {
                        break;
                    }
                }
                None => std::thread::sleep(SERVE_POLL),
            }
        }
        info!("airspace logger stopping");
    }
}
