//! Closed-form separation prediction.
//!
//! For two aircraft in uniform linear motion, the squared distance
//! `‖Δp + Δv·t‖²` is a parabola in `t`; its minimum sits at
//! `t* = −(Δp·Δv) / |Δv|²`, clamped at zero because a closest approach
//! in the past is no longer actionable. A pair violates separation only
//! when **both** the lateral and the vertical minima are breached at
//! the same instant.

use atc_common::consts::{
    MIN_HORIZONTAL_SEPARATION_FT, MIN_VERTICAL_SEPARATION_FT, RELATIVE_VELOCITY_EPSILON,
};
use atc_common::geometry::Vec3;
use atc_common::wire::FleetSnapshot;
use tracing::error;

/// Lateral and vertical distance between two aircraft at some instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    pub horizontal: f64,
    pub vertical: f64,
}

impl Separation {
    /// Conjunctive violation predicate: both minima must be breached
    /// simultaneously.
    #[inline]
    pub fn is_violation(&self) -> bool {
        self.horizontal < MIN_HORIZONTAL_SEPARATION_FT
            && self.vertical < MIN_VERTICAL_SEPARATION_FT
    }
}

/// A predicted violation within the horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedViolation {
    pub plane1: i32,
    pub plane2: i32,
    /// Seconds until the pair reaches minimum distance.
    pub seconds_to_closest: f64,
}

/// Time of minimum 3-D distance for two uniformly-moving aircraft.
///
/// `|Δv|²` below [`RELATIVE_VELOCITY_EPSILON`] counts as zero relative
/// motion: the separation is constant and "now" is as close as they
/// get. A negative root means the closest approach already happened, so
/// the result is clamped to zero.
pub fn time_to_closest_approach(p1: Vec3, v1: Vec3, p2: Vec3, v2: Vec3) -> f64 {
    let dp = p1 - p2;
    let dv = v1 - v2;
    let denom = dv.norm_sq();
    if denom < RELATIVE_VELOCITY_EPSILON {
        return 0.0;
    }
    (-(dp.dot(&dv)) / denom).max(0.0)
}

/// Separation of the pair at `p(t) = p + v·t`.
pub fn separation_at(p1: Vec3, v1: Vec3, p2: Vec3, v2: Vec3, t: f64) -> Separation {
    let a = p1 + v1 * t;
    let b = p2 + v2 * t;
    Separation {
        horizontal: a.horizontal_distance(&b),
        vertical: (a.z - b.z).abs(),
    }
}

/// Predict whether a pair violates separation within `horizon_s`.
///
/// Pairs whose closest approach lies beyond the horizon are safe by
/// definition; otherwise the conjunctive predicate is evaluated at the
/// closest approach (which is the current instant when the pair is
/// already diverging or co-moving).
pub fn predict_violation(
    id1: i32,
    p1: Vec3,
    v1: Vec3,
    id2: i32,
    p2: Vec3,
    v2: Vec3,
    horizon_s: f64,
) -> Option<PredictedViolation> {
    let t_star = time_to_closest_approach(p1, v1, p2, v2);
    if t_star > horizon_s {
        return None;
    }
    let separation = separation_at(p1, v1, p2, v2, t_star);
    if separation.is_violation() {
        Some(PredictedViolation {
            plane1: id1,
            plane2: id2,
            seconds_to_closest: t_star,
        })
    } else {
        None
    }
}

/// Scan every unordered pair in a snapshot.
///
/// Entries with non-finite values or a position/velocity id mismatch
/// are treated as non-existent and logged; a corrupt entry must not
/// poison the rest of the sweep.
pub fn scan_snapshot(snapshot: &FleetSnapshot, horizon_s: f64) -> Vec<PredictedViolation> {
    let mut valid = Vec::with_capacity(snapshot.len());
    for i in 0..snapshot.len() {
        let pos = snapshot.positions[i];
        let vel = snapshot.velocities[i];
        if pos.plane_id != vel.plane_id {
            error!(
                index = i,
                pos_id = pos.plane_id,
                vel_id = vel.plane_id,
                "snapshot id mismatch, dropping entry"
            );
            continue;
        }
        if !pos.position().is_finite() || !vel.velocity().is_finite() {
            error!(plane = pos.plane_id, "non-finite snapshot entry, dropping");
            continue;
        }
        valid.push((pos.plane_id, pos.position(), vel.velocity()));
    }

    let mut violations = Vec::new();
    for i in 0..valid.len() {
        for j in (i + 1)..valid.len() {
            let (id1, p1, v1) = valid[i];
            let (id2, p2, v2) = valid[j];
            if let Some(v) = predict_violation(id1, p1, v1, id2, p2, v2, horizon_s) {
                violations.push(v);
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot_of(entries: &[(i32, Vec3, Vec3)]) -> FleetSnapshot {
        let mut snap = FleetSnapshot::empty();
        for &(id, p, v) in entries {
            snap.push(id, p, v, 0);
        }
        snap
    }

    #[test]
    fn parallel_traffic_never_alerts() {
        // Two aircraft 40 000 ft apart flying identical vectors.
        let p1 = Vec3::new(10_000.0, 10_000.0, 5_000.0);
        let p2 = Vec3::new(10_000.0, 50_000.0, 5_000.0);
        let v = Vec3::new(100.0, 0.0, 0.0);

        assert_eq!(time_to_closest_approach(p1, v, p2, v), 0.0);
        assert!(predict_violation(1, p1, v, 2, p2, v, 120.0).is_none());

        let snap = snapshot_of(&[(1, p1, v), (2, p2, v)]);
        assert!(scan_snapshot(&snap, 120.0).is_empty());
    }

    #[test]
    fn head_on_conflict_honors_horizon() {
        // Head-on at the same altitude, co-altitude collision at t = 500 s.
        let p1 = Vec3::new(0.0, 50_000.0, 20_000.0);
        let v1 = Vec3::new(100.0, 0.0, 0.0);
        let p2 = Vec3::new(100_000.0, 50_000.0, 20_000.0);
        let v2 = Vec3::new(-100.0, 0.0, 0.0);

        let t_star = time_to_closest_approach(p1, v1, p2, v2);
        assert!((t_star - 500.0).abs() < 1.0);

        // Beyond a 120 s horizon: safe for now.
        assert!(predict_violation(1, p1, v1, 2, p2, v2, 120.0).is_none());

        // A 600 s horizon sees it immediately.
        let violation = predict_violation(1, p1, v1, 2, p2, v2, 600.0).unwrap();
        assert!((violation.seconds_to_closest - 500.0).abs() < 1.0);
    }

    #[test]
    fn widening_horizon_reveals_conflict() {
        // Closest approach at ~200 s, inside a 300 s horizon but not 120 s.
        let p1 = Vec3::new(0.0, 50_000.0, 10_000.0);
        let v1 = Vec3::new(200.0, 0.0, 0.0);
        let p2 = Vec3::new(80_000.0, 50_000.0, 10_000.0);
        let v2 = Vec3::new(-200.0, 0.0, 0.0);

        let snap = snapshot_of(&[(1, p1, v1), (2, p2, v2)]);
        assert!(scan_snapshot(&snap, 120.0).is_empty());
        let found = scan_snapshot(&snap, 300.0);
        assert_eq!(found.len(), 1);
        assert!((found[0].seconds_to_closest - 200.0).abs() < 1.0);
    }

    #[test]
    fn violation_requires_both_minima_breached() {
        let v = Vec3::ZERO;
        // Laterally close but vertically separated: safe.
        let sep = separation_at(
            Vec3::new(0.0, 0.0, 10_000.0),
            v,
            Vec3::new(1_000.0, 0.0, 5_000.0),
            v,
            0.0,
        );
        assert!(sep.horizontal < MIN_HORIZONTAL_SEPARATION_FT);
        assert!(!sep.is_violation());

        // Vertically close but laterally separated: safe.
        let sep = separation_at(
            Vec3::new(0.0, 0.0, 10_000.0),
            v,
            Vec3::new(10_000.0, 0.0, 10_500.0),
            v,
            0.0,
        );
        assert!(sep.vertical < MIN_VERTICAL_SEPARATION_FT);
        assert!(!sep.is_violation());

        // Both breached: violation.
        let sep = separation_at(
            Vec3::new(0.0, 0.0, 10_000.0),
            v,
            Vec3::new(1_000.0, 0.0, 10_500.0),
            v,
            0.0,
        );
        assert!(sep.is_violation());
    }

    #[test]
    fn diverging_pair_clamps_to_now() {
        // Already moving apart: closest approach was in the past.
        let p1 = Vec3::new(10_000.0, 10_000.0, 5_000.0);
        let v1 = Vec3::new(-100.0, 0.0, 0.0);
        let p2 = Vec3::new(20_000.0, 10_000.0, 5_000.0);
        let v2 = Vec3::new(100.0, 0.0, 0.0);
        assert_eq!(time_to_closest_approach(p1, v1, p2, v2), 0.0);
    }

    #[test]
    fn corrupt_entries_are_dropped_not_fatal() {
        let mut snap = snapshot_of(&[
            (1, Vec3::new(0.0, 0.0, 10_000.0), Vec3::ZERO),
            (2, Vec3::new(500.0, 0.0, 10_200.0), Vec3::ZERO),
            (3, Vec3::new(700.0, 0.0, 10_300.0), Vec3::ZERO),
        ]);
        // Poison entry 2 with NaN and entry 1's velocity id.
        snap.positions[2].x = f64::NAN;
        snap.velocities[1].plane_id = 9;

        // Only plane 1 survives validation: no pairs, no panic.
        assert!(scan_snapshot(&snap, 120.0).is_empty());
    }

    proptest! {
        /// The predicate is symmetric in its arguments.
        #[test]
        fn prediction_is_symmetric(
            x1 in 0.0..100_000.0f64, y1 in 0.0..100_000.0f64, z1 in 0.0..25_000.0f64,
            x2 in 0.0..100_000.0f64, y2 in 0.0..100_000.0f64, z2 in 0.0..25_000.0f64,
            vx1 in -500.0..500.0f64, vy1 in -500.0..500.0f64, vz1 in -100.0..100.0f64,
            vx2 in -500.0..500.0f64, vy2 in -500.0..500.0f64, vz2 in -100.0..100.0f64,
        ) {
            let p1 = Vec3::new(x1, y1, z1);
            let v1 = Vec3::new(vx1, vy1, vz1);
            let p2 = Vec3::new(x2, y2, z2);
            let v2 = Vec3::new(vx2, vy2, vz2);

            let forward = predict_violation(1, p1, v1, 2, p2, v2, 120.0);
            let reverse = predict_violation(2, p2, v2, 1, p1, v1, 120.0);
            prop_assert_eq!(forward.is_some(), reverse.is_some());
            if let (Some(f), Some(r)) = (forward, reverse) {
                prop_assert!((f.seconds_to_closest - r.seconds_to_closest).abs() < 1e-9);
            }
        }

        /// At an interior minimum the derivative of the squared distance
        /// vanishes: d/dt ‖Δp + Δv·t‖² = 2(Δp·Δv) + 2t|Δv|² = 0.
        #[test]
        fn closest_approach_is_stationary(
            x1 in 0.0..100_000.0f64, y1 in 0.0..100_000.0f64, z1 in 0.0..25_000.0f64,
            x2 in 0.0..100_000.0f64, y2 in 0.0..100_000.0f64, z2 in 0.0..25_000.0f64,
            vx1 in -500.0..500.0f64, vy1 in -500.0..500.0f64, vz1 in -100.0..100.0f64,
            vx2 in -500.0..500.0f64, vy2 in -500.0..500.0f64, vz2 in -100.0..100.0f64,
        ) {
            let p1 = Vec3::new(x1, y1, z1);
            let v1 = Vec3::new(vx1, vy1, vz1);
            let p2 = Vec3::new(x2, y2, z2);
            let v2 = Vec3::new(vx2, vy2, vz2);

            let dp = p1 - p2;
            let dv = v1 - v2;
            prop_assume!(dv.norm_sq() >= RELATIVE_VELOCITY_EPSILON);

            let t_star = time_to_closest_approach(p1, v1, p2, v2);
            prop_assume!(t_star > 0.0); // clamped roots are not stationary

            let derivative = 2.0 * (dp.dot(&dv) + t_star * dv.norm_sq());
            let scale = 1.0 + dp.dot(&dv).abs();
            prop_assert!(derivative.abs() <= 1e-6 * scale);
        }

        /// t* is never negative and never exceeds the point where the
        /// pair would meet head-on across the whole airspace.
        #[test]
        fn t_star_is_nonnegative(
            x1 in 0.0..100_000.0f64, x2 in 0.0..100_000.0f64,
            vx1 in -500.0..500.0f64, vx2 in -500.0..500.0f64,
        ) {
            let t = time_to_closest_approach(
                Vec3::new(x1, 0.0, 0.0),
                Vec3::new(vx1, 0.0, 0.0),
                Vec3::new(x2, 0.0, 0.0),
                Vec3::new(vx2, 0.0, 0.0),
            );
            prop_assert!(t >= 0.0);
            prop_assert!(t.is_finite());
        }
    }
}
