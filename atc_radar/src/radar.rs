//! Radar publisher.
//!
//! Once per second: admit backlogged aircraft whose enter time has
//! arrived, retire aircraft that left the airspace or halted on a
//! boundary, then publish a coherent fleet snapshot to the shared
//! airspace store.

use atc_common::clock::{wall_seconds, SimClock};
use crate::fleet::Fleet;
use crate::loader::ScheduledAircraft;
use crate::plane::Plane;
use atc_common::consts::MAX_FLEET;
use atc_common::wire::FleetSnapshot;
use atc_shared_memory::SlotWriter;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, warn};

/// Why an aircraft was removed from tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetirementReason {
    /// Integrated position left the airspace box.
    LeftAirspace,
    /// Clipped at a boundary with zero velocity.
    HaltedAtBoundary,
}

/// One retirement event, kept for the containment audit trail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retirement {
    pub plane_id: i32,
    pub time: f64,
    pub reason: RetirementReason,
}

/// The radar publisher task.
pub struct Radar {
    fleet: Arc<Fleet>,
    writer: SlotWriter<FleetSnapshot>,
    clock: SimClock,
    /// Aircraft waiting for their enter time, soonest first.
    backlog: VecDeque<ScheduledAircraft>,
    retirements: Vec<Retirement>,
}

impl Radar {
    /// Build a radar over a (sorted or unsorted) admission schedule.
    pub fn new(
        fleet: Arc<Fleet>,
        writer: SlotWriter<FleetSnapshot>,
        clock: SimClock,
        mut schedule: Vec<ScheduledAircraft>,
    ) -> Self {
        schedule.sort_by(|a, b| a.enter_time.total_cmp(&b.enter_time));
        Self {
            fleet,
            writer,
            clock,
            backlog: schedule.into(),
            retirements: Vec::new(),
        }
    }

    /// Queue another aircraft for admission at its enter time.
    pub fn schedule(&mut self, aircraft: ScheduledAircraft) {
        let at = self
            .backlog
            .iter()
            .position(|s| s.enter_time > aircraft.enter_time)
            .unwrap_or(self.backlog.len());
        self.backlog.insert(at, aircraft);
    }

    /// One radar period at simulated time `now`.
    pub fn tick(&mut self, now: f64) {
        self.admit_due(now);
        self.retire_departed(now);
        self.publish(now);
    }

    /// Run the 1 s tick loop until `should_stop` turns true.
    pub fn run(&mut self, should_stop: impl Fn() -> bool) {
        while !should_stop() {
            self.tick(self.clock.now());
            std::thread::sleep(std::time::Duration::from_secs(1));
        }
        info!("radar publisher stopping");
    }

    /// Retirement events observed so far.
    pub fn retirements(&self) -> &[Retirement] {
        &self.retirements
    }

    /// Aircraft still awaiting admission.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    fn admit_due(&mut self, now: f64) {
        while let Some(next) = self.backlog.front() {
            if next.enter_time > now {
                break;
            }
            let scheduled = self.backlog.pop_front().expect("front checked above");
            let plane = Arc::new(Plane::new(
                scheduled.id,
                scheduled.position,
                scheduled.velocity,
            ));
            if self.fleet.insert(Arc::clone(&plane)) {
                plane.start(self.clock.clone());
                info!(
                    plane = scheduled.id,
                    enter_time = scheduled.enter_time,
                    "tracking aircraft"
                );
            }
        }
    }

    fn retire_departed(&mut self, now: f64) {
        for plane in self.fleet.handles() {
            let reason = if !plane.within_bounds() {
                Some(RetirementReason::LeftAirspace)
            } else if plane.halted_at_boundary() {
                Some(RetirementReason::HaltedAtBoundary)
            } else {
                None
            };

            if let Some(reason) = reason {
                plane.stop();
                self.fleet.remove(plane.id());
                warn!(plane = plane.id(), ?reason, time = now, "retiring aircraft");
                self.retirements.push(Retirement {
                    plane_id: plane.id(),
                    time: now,
                    reason,
                });
            }
        }
    }

    fn publish(&mut self, _now: f64) {
        let stamp = wall_seconds();
        let mut snapshot = FleetSnapshot::empty();
        for plane in self.fleet.handles().into_iter().take(MAX_FLEET) {
            let (position, velocity) = plane.sample();
            snapshot.push(plane.id(), position, velocity, stamp);
        }
        self.writer.publish(&snapshot);
    }
}
