//! Command relay.
//!
//! Drains the shared command ring and applies each mutation to the
//! target aircraft: `SET_VELOCITY` replaces the velocity vector,
//! `SET_POSITION` moves the aircraft and halts it. Commands addressed
//! to untracked aircraft are discarded with a warning — retirement may
//! race an operator's command and that is not an error.

use crate::fleet::Fleet;
use atc_common::wire::{CommandKind, CommandRecord};
use atc_shared_memory::CommandRing;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The relay task.
pub struct Relay {
    fleet: Arc<Fleet>,
    ring: CommandRing,
    idle_sleep: Duration,
}

impl Relay {
    pub fn new(fleet: Arc<Fleet>, ring: CommandRing, idle_sleep: Duration) -> Self {
        Self {
            fleet,
            ring,
            idle_sleep,
        }
    }

    /// Dequeue and apply one command. Returns `false` when the ring was
    /// empty.
    pub fn step(&self) -> bool {
        match self.ring.dequeue() {
            Some(command) => {
                self.apply(&command);
                true
            }
            None => false,
        }
    }

    /// Tight consume loop; sleeps briefly whenever the ring runs dry.
    pub fn run(&self, should_stop: impl Fn() -> bool) {
        while !should_stop() {
            if !self.step() {
                std::thread::sleep(self.idle_sleep);
            }
        }
        info!("relay stopping");
    }

    fn apply(&self, command: &CommandRecord) {
        let plane = match self.fleet.get(command.plane_id) {
            Some(plane) => plane,
            None => {
                warn!(
                    plane = command.plane_id,
                    "command for untracked aircraft discarded"
                );
                return;
            }
        };

        match command.command_kind() {
            Some(CommandKind::SetVelocity) => {
                plane.set_velocity(command.value.into());
                info!(
                    plane = command.plane_id,
                    "applied velocity ({:.1}, {:.1}, {:.1})",
                    command.value[0],
                    command.value[1],
                    command.value[2]
                );
            }
            Some(CommandKind::SetPosition) => {
                plane.set_position(command.value.into());
                info!(
                    plane = command.plane_id,
                    "applied position correction ({:.0}, {:.0}, {:.0})",
                    command.value[0],
                    command.value[1],
                    command.value[2]
                );
            }
            None => {
                warn!(
                    plane = command.plane_id,
                    kind = command.kind,
                    "unknown command kind discarded"
                );
            }
        }
    }
}
