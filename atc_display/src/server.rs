//! Display record dispatch.
//!
//! `GRID`, `ONE_PLANE` and `MULTIPLE_PLANE` records print to the
//! console; `LOG` records append the same fleet content to the airspace
//! log file; `EXIT` winds the server down.

use crate::grid::{render_grid, render_one_plane, render_table};
use atc_common::clock::wall_seconds;
use atc_common::wire::{Ack, DisplayKind, DisplayRecord};
use atc_shared_memory::MailboxServer;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Interval between mailbox polls in the server loop.
const SERVE_POLL: Duration = Duration::from_millis(5);

/// The display server task.
pub struct DisplayServer {
    airspace_log: PathBuf,
}

impl DisplayServer {
    pub fn new(airspace_log: &Path) -> Self {
        Self {
            airspace_log: airspace_log.to_path_buf(),
        }
    }

    /// Handle one record. Returns `false` on `EXIT`.
    pub fn handle_record(&self, record: &DisplayRecord) -> bool {
        match record.display_kind() {
            Some(DisplayKind::OnePlane) => print!("{}", render_one_plane(record)),
            Some(DisplayKind::MultiplePlane) => print!("{}", render_table(record)),
            Some(DisplayKind::Grid) => print!("{}", render_grid(record)),
            Some(DisplayKind::Log) => self.append_log(record),
            Some(DisplayKind::Exit) => {
                info!("display received exit record");
                return false;
            }
            None => warn!(kind = record.kind, "unknown display record kind"),
        }
        true
    }

    fn append_log(&self, record: &DisplayRecord) {
        let entry = format!("[{}]\n{}", wall_seconds(), render_table(record));
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.airspace_log)
            .and_then(|mut file| file.write_all(entry.as_bytes()));
        if let Err(e) = result {
            warn!("airspace log write failed: {e}");
        }
    }

    /// Mailbox serving loop; acknowledges every record.
    pub fn run(
        &self,
        server: &mut MailboxServer<DisplayRecord, Ack>,
        should_stop: impl Fn() -> bool,
    ) {
        info!("display serving");
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
        info!("display stopping");
    }
}
