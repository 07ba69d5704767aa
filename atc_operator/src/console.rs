//! Operator console server state.
//!
//! Pending user commands sit in a bounded FIFO fed by the stdin reader;
//! the analyzer's `GET_USER_COMMAND` polls drain it oldest-first.
//! Incoming alerts are printed for the human, logged, and acknowledged.
//! Every accepted command is appended to the command log file.

use crate::parser::{parse_command, UserCommand};
use atc_common::clock::wall_seconds;
use atc_common::wire::{
    OperatorReply, OperatorRequest, OperatorRequestKind, EMERGENCY_PLANE_ID,
};
use atc_shared_memory::MailboxServer;
use heapless::Deque;
use parking_lot::Mutex;
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Pending commands the console will hold before shedding new ones.
/// The analyzer drains at 1 Hz; a deeper backlog means the operator is
/// typing faster than the system can act.
pub const PENDING_CAPACITY: usize = 16;

/// Interval between mailbox polls in the server loop.
const SERVE_POLL: Duration = Duration::from_millis(5);

/// Shared console state.
pub struct OperatorConsole {
    pending: Mutex<Deque<UserCommand, PENDING_CAPACITY>>,
    command_log: Mutex<Option<std::fs::File>>,
}

impl OperatorConsole {
    /// Open the console. A missing command log is a warning, not a
    /// failure.
    pub fn new(command_log: Option<&Path>) -> Self {
        let log = command_log.and_then(|path| {
            match std::fs::OpenOptions::new().create(true).append(true).open(path) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!("cannot open command log {}: {e}", path.display());
                    None
                }
            }
        });
        Self {
            pending: Mutex::new(Deque::new()),
            command_log: Mutex::new(log),
        }
    }

    /// Queue a parsed command. Full queue sheds the newcomer.
    pub fn push_command(&self, command: UserCommand) -> bool {
        let mut pending = self.pending.lock();
        if pending.push_back(command).is_err() {
            warn!("pending command queue full, dropping input");
            return false;
        }
        true
    }

    /// Oldest pending command, if any.
    pub fn pop_command(&self) -> Option<UserCommand> {
        self.pending.lock().pop_front()
    }

    /// Number of commands waiting.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Answer one analyzer request.
    pub fn handle_request(&self, request: &OperatorRequest) -> OperatorReply {
        match request.request_kind() {
            Some(OperatorRequestKind::GetUserCommand) => match self.pop_command() {
                Some(command) => command.to_reply(),
                None => OperatorReply::none(),
            },
            Some(OperatorRequestKind::Alert) => {
                self.show_alert(request);
                OperatorReply::none()
            }
            None => {
                warn!(kind = request.kind, "unknown operator request kind");
                OperatorReply::none()
            }
        }
    }

    fn show_alert(&self, alert: &OperatorRequest) {
        if alert.plane1 == EMERGENCY_PLANE_ID && alert.plane2 == EMERGENCY_PLANE_ID {
            println!("*** EMERGENCY: system-wide alert, take control immediately ***");
            warn!("system-wide emergency alert received");
        } else {
            println!(
                "*** ALERT: planes {} and {} reach minimum separation in {:.1} s ***",
                alert.plane1, alert.plane2, alert.seconds_to_closest
            );
            warn!(
                plane1 = alert.plane1,
                plane2 = alert.plane2,
                seconds = alert.seconds_to_closest,
                "separation alert received"
            );
        }
        self.append_log(&format!(
            "alert planes={},{} t={:.1}",
            alert.plane1, alert.plane2, alert.seconds_to_closest
        ));
    }

    fn append_log(&self, entry: &str) {
        if let Some(file) = self.command_log.lock().as_mut() {
            if let Err(e) = writeln!(file, "[{}] {entry}", wall_seconds()) {
                warn!("command log write failed: {e}");
            }
        }
    }

    /// Consume one input line: parse, queue, log. Returns whether a
    /// command was accepted.
    pub fn accept_line(&self, line: &str) -> bool {
        match parse_command(line) {
            Ok(Some(command)) => {
                let accepted = self.push_command(command);
                if accepted {
                    info!(?command, "user command queued");
                    self.append_log(line.trim());
                }
                accepted
            }
            Ok(None) => false,
            Err(e) => {
                warn!("bad command line: {e}");
                println!("? {e}");
                false
            }
        }
    }

    /// Blocking stdin reader. Returns at end of input.
    pub fn run_stdin_reader(&self, input: impl BufRead) {
        for line in input.lines() {
            match line {
                Ok(line) => {
                    self.accept_line(&line);
                }
                Err(e) => {
                    warn!("stdin read failed: {e}");
                    break;
                }
            }
        }
        info!("operator input closed");
    }

    /// Mailbox serving loop.
    pub fn run_server(
        &self,
        server: &mut MailboxServer<OperatorRequest, OperatorReply>,
        should_stop: impl Fn() -> bool,
    ) {
        info!("operator console serving");
        while !should_stop() {
            match server.try_receive() {
                Some(request) => {
                    let reply = self.handle_request(&request);
                    server.reply(&reply);
                }
                None => std::thread::sleep(SERVE_POLL),
            }
        }
        info!("operator console stopping");
    }
}
