//! Per-aircraft concurrent object.
//!
//! Each plane guards its six state scalars and `last_update` with one
//! lock; every read or mutation happens in a single critical section, so
//! the radar always samples a coherent `(position, velocity)` tuple.
//! The integrator thread advances the state roughly once per simulated
//! second.

use atc_common::consts::{
    clamp_into_airspace, within_airspace, AIRSPACE_X_MAX, AIRSPACE_X_MIN, AIRSPACE_Y_MAX,
    AIRSPACE_Y_MIN, AIRSPACE_Z_MAX, AIRSPACE_Z_MIN,
};
use atc_common::geometry::Vec3;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, warn};

use atc_common::clock::SimClock;

/// Minimum elapsed simulated time before a position step [s].
const MIN_STEP_S: f64 = 1.0;

/// Result of one integration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Less than one second elapsed since the last step.
    NotDue,
    /// Position advanced within the airspace.
    Advanced,
    /// Position crossed the airspace boundary: clipped and halted.
    ClippedAtBoundary,
}

/// Guarded kinematic state.
#[derive(Debug, Clone, Copy)]
struct PlaneState {
    position: Vec3,
    velocity: Vec3,
    last_update: f64,
}

/// A single tracked aircraft.
pub struct Plane {
    id: i32,
    state: Mutex<PlaneState>,
    running: AtomicBool,
    integrator: Mutex<Option<JoinHandle<()>>>,
}

impl Plane {
    /// Create a plane, clamping the initial position into the airspace.
    pub fn new(id: i32, position: Vec3, velocity: Vec3) -> Self {
        let (x, y, z) = clamp_into_airspace(position.x, position.y, position.z);
        let clamped = Vec3::new(x, y, z);
        if clamped != position {
            warn!(
                plane = id,
                "initial position out of bounds, clamped to ({x:.0}, {y:.0}, {z:.0})"
            );
        }
        Self {
            id,
            state: Mutex::new(PlaneState {
                position: clamped,
                velocity,
                last_update: 0.0,
            }),
            running: AtomicBool::new(false),
            integrator: Mutex::new(None),
        }
    }

    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Coherent `(position, velocity)` sample.
    pub fn sample(&self) -> (Vec3, Vec3) {
        let state = self.state.lock();
        (state.position, state.velocity)
    }

    /// Simulated time of the last completed integration step.
    pub fn last_update(&self) -> f64 {
        self.state.lock().last_update
    }

    /// Replace the velocity vector.
    pub fn set_velocity(&self, velocity: Vec3) {
        let mut state = self.state.lock();
        state.velocity = velocity;
        debug!(
            plane = self.id,
            "velocity set to ({:.1}, {:.1}, {:.1})", velocity.x, velocity.y, velocity.z
        );
    }

    /// Apply a position correction. The new position is clamped into
    /// the airspace and the aircraft is halted, per the relay contract
    /// for `SET_POSITION` commands.
    pub fn set_position(&self, position: Vec3) {
        let (x, y, z) = clamp_into_airspace(position.x, position.y, position.z);
        let mut state = self.state.lock();
        state.position = Vec3::new(x, y, z);
        state.velocity = Vec3::ZERO;
        debug!(plane = self.id, "position set to ({x:.0}, {y:.0}, {z:.0})");
    }

    /// Advance the aircraft to simulated time `now`.
    ///
    /// Integrates with the actual elapsed time, but only once at least
    /// one second has passed, so updates occur at most once per second.
    /// A step that leaves the airspace is clipped to the crossed
    /// boundary and the velocity zeroed; the radar retires the aircraft
    /// on its next sweep.
    pub fn advance(&self, now: f64) -> StepOutcome {
        let mut state = self.state.lock();
        let dt = now - state.last_update;
        if dt < MIN_STEP_S {
            return StepOutcome::NotDue;
        }

        let next = state.position + state.velocity * dt;
        state.last_update = now;

        if within_airspace(next.x, next.y, next.z) {
            state.position = next;
            return StepOutcome::Advanced;
        }

        // Halt exactly on the crossed boundary.
        state.position = Vec3::new(
            next.x.clamp(AIRSPACE_X_MIN, AIRSPACE_X_MAX),
            next.y.clamp(AIRSPACE_Y_MIN, AIRSPACE_Y_MAX),
            next.z.clamp(AIRSPACE_Z_MIN, AIRSPACE_Z_MAX),
        );
        state.velocity = Vec3::ZERO;
        StepOutcome::ClippedAtBoundary
    }

    /// Whether the aircraft sits on a boundary with zero velocity — the
    /// post-clip state that triggers retirement.
    pub fn halted_at_boundary(&self) -> bool {
        let state = self.state.lock();
        let p = state.position;
        let stopped = state.velocity == Vec3::ZERO;
        let on_wall = p.x == AIRSPACE_X_MIN
            || p.x == AIRSPACE_X_MAX
            || p.y == AIRSPACE_Y_MIN
            || p.y == AIRSPACE_Y_MAX
            || p.z == AIRSPACE_Z_MIN
            || p.z == AIRSPACE_Z_MAX;
        stopped && on_wall
    }

    /// Whether the position lies inside the airspace box.
    pub fn within_bounds(&self) -> bool {
        let state = self.state.lock();
        within_airspace(state.position.x, state.position.y, state.position.z)
    }

    /// Start the integrator thread. Idempotent.
    pub fn start(self: &Arc<Self>, clock: SimClock) {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!(plane = self.id, "integrator already running");
            return;
        }

        {
            let mut state = self.state.lock();
            state.last_update = clock.now();
        }

        let plane = Arc::clone(self);
        let handle = std::thread::spawn(move || {
            debug!(plane = plane.id, "integrator started");
            while plane.running.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_secs(1));
                match plane.advance(clock.now()) {
                    StepOutcome::ClippedAtBoundary => {
                        warn!(plane = plane.id, "crossed airspace boundary, halted");
                    }
                    StepOutcome::Advanced | StepOutcome::NotDue => {}
                }
            }
            debug!(plane = plane.id, "integrator stopped");
        });
        *self.integrator.lock() = Some(handle);
    }

    /// Stop the integrator thread and join it. Idempotent; returns
    /// within one integration period.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            if let Some(handle) = self.integrator.lock().take() {
                let _ = handle.join();
            }
        }
    }

    /// Whether the integrator thread is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for Plane {
    fn drop(&mut self) {
        self.stop();
    }
}
