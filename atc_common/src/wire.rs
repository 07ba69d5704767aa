//! Wire-layout data structures shared across process boundaries.
//!
//! Every struct here is `#[repr(C)]`, `Copy`, and composed of numeric
//! fields only, so an all-zeros bit pattern is always valid and the
//! layout is pinned by the static assertions at the bottom of this file.
//! These are the payloads carried in shared-memory segments and
//! mailboxes; changing a field is a cross-process protocol change.

use crate::consts::MAX_FLEET;
use crate::geometry::Vec3;
use static_assertions::const_assert_eq;

/// Plane-id pair value that encodes a system-wide emergency alert.
pub const EMERGENCY_PLANE_ID: i32 = -1;

// ─── Subsystem identities ───────────────────────────────────────────

/// Identifies a registered subsystem in the shared registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Subsystem {
    /// Operator console server.
    Operator = 0,
    /// Data display server.
    Display = 1,
    /// Airspace history logger.
    Logger = 2,
    /// Separation analyzer.
    Computer = 3,
}

/// Number of registry slots.
pub const SUBSYSTEM_COUNT: usize = 4;

impl Subsystem {
    /// All registry slots in index order.
    pub const ALL: [Subsystem; SUBSYSTEM_COUNT] = [
        Subsystem::Operator,
        Subsystem::Display,
        Subsystem::Logger,
        Subsystem::Computer,
    ];

    /// Registry slot index.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Well-known channel id written into the registry on registration.
    #[inline]
    pub const fn channel_id(self) -> i32 {
        match self {
            Subsystem::Operator => 11,
            Subsystem::Display => 12,
            Subsystem::Logger => 13,
            Subsystem::Computer => 14,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(self) -> &'static str {
        match self {
            Subsystem::Operator => "operator",
            Subsystem::Display => "display",
            Subsystem::Logger => "logger",
            Subsystem::Computer => "computer",
        }
    }
}

// ─── Fleet snapshot ─────────────────────────────────────────────────

/// One aircraft's position entry in a published snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct PositionRecord {
    /// Aircraft identity; `-1` marks an unused slot.
    pub plane_id: i32,
    _pad: u32,
    /// Position [ft].
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Wall-clock seconds at capture.
    pub timestamp: i64,
}

impl PositionRecord {
    pub fn new(plane_id: i32, pos: Vec3, timestamp: i64) -> Self {
        Self {
            plane_id,
            _pad: 0,
            x: pos.x,
            y: pos.y,
            z: pos.z,
            timestamp,
        }
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl Default for PositionRecord {
    fn default() -> Self {
        Self::new(-1, Vec3::ZERO, 0)
    }
}

/// One aircraft's velocity entry in a published snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct VelocityRecord {
    /// Aircraft identity; `-1` marks an unused slot.
    pub plane_id: i32,
    _pad: u32,
    /// Velocity [ft/s].
    pub vx: f64,
    pub vy: f64,
    pub vz: f64,
    /// Wall-clock seconds at capture.
    pub timestamp: i64,
}

impl VelocityRecord {
    pub fn new(plane_id: i32, vel: Vec3, timestamp: i64) -> Self {
        Self {
            plane_id,
            _pad: 0,
            vx: vel.x,
            vy: vel.y,
            vz: vel.z,
            timestamp,
        }
    }

    #[inline]
    pub fn velocity(&self) -> Vec3 {
        Vec3::new(self.vx, self.vy, self.vz)
    }
}

impl Default for VelocityRecord {
    fn default() -> Self {
        Self::new(-1, Vec3::ZERO, 0)
    }
}

/// Coherent point-in-time copy of the tracked fleet.
///
/// Invariant: `positions[i].plane_id == velocities[i].plane_id` for
/// every `i < num_planes`. Written whole by the radar publisher.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct FleetSnapshot {
    /// Number of valid entries.
    pub num_planes: i32,
    _pad: u32,
    pub positions: [PositionRecord; MAX_FLEET],
    pub velocities: [VelocityRecord; MAX_FLEET],
}

impl FleetSnapshot {
    /// An empty snapshot with all slots marked unused.
    pub fn empty() -> Self {
        Self {
            num_planes: 0,
            _pad: 0,
            positions: [PositionRecord::default(); MAX_FLEET],
            velocities: [VelocityRecord::default(); MAX_FLEET],
        }
    }

    /// Number of valid entries, clamped into `0..=MAX_FLEET`.
    #[inline]
    pub fn len(&self) -> usize {
        (self.num_planes.max(0) as usize).min(MAX_FLEET)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one aircraft. Returns `false` when the snapshot is full.
    pub fn push(&mut self, plane_id: i32, pos: Vec3, vel: Vec3, timestamp: i64) -> bool {
        let n = self.len();
        if n >= MAX_FLEET {
            return false;
        }
        self.positions[n] = PositionRecord::new(plane_id, pos, timestamp);
        self.velocities[n] = VelocityRecord::new(plane_id, vel, timestamp);
        self.num_planes = (n + 1) as i32;
        true
    }

    /// Look up an aircraft by id.
    pub fn find(&self, plane_id: i32) -> Option<(PositionRecord, VelocityRecord)> {
        (0..self.len())
            .find(|&i| self.positions[i].plane_id == plane_id)
            .map(|i| (self.positions[i], self.velocities[i]))
    }
}

impl Default for FleetSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

// ─── Commands ───────────────────────────────────────────────────────

/// Mutation kind carried in a [`CommandRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CommandKind {
    /// Replace the target aircraft's velocity vector.
    SetVelocity = 1,
    /// Replace the target aircraft's position (velocity is zeroed).
    SetPosition = 2,
}

impl CommandKind {
    /// Convert from the wire value. Returns `None` for unknown codes.
    #[inline]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::SetVelocity),
            2 => Some(Self::SetPosition),
            _ => None,
        }
    }
}

/// One pending aircraft mutation in the command ring.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct CommandRecord {
    /// Target aircraft.
    pub plane_id: i32,
    /// Wire value of [`CommandKind`].
    pub kind: i32,
    /// Velocity or position triple depending on `kind`.
    pub value: [f64; 3],
    /// Wall-clock seconds at creation.
    pub timestamp: i64,
}

impl CommandRecord {
    pub fn new(plane_id: i32, kind: CommandKind, value: Vec3, timestamp: i64) -> Self {
        Self {
            plane_id,
            kind: kind as i32,
            value: value.into(),
            timestamp,
        }
    }

    /// Decoded command kind, if the wire value is valid.
    #[inline]
    pub fn command_kind(&self) -> Option<CommandKind> {
        CommandKind::from_i32(self.kind)
    }
}

impl Default for CommandRecord {
    fn default() -> Self {
        Self {
            plane_id: -1,
            kind: 0,
            value: [0.0; 3],
            timestamp: 0,
        }
    }
}

// ─── Operator channel messages ──────────────────────────────────────

/// Request kinds sent from the analyzer to the operator console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum OperatorRequestKind {
    /// Ask for the oldest pending user command.
    GetUserCommand = 1,
    /// Deliver a separation alert (acknowledged by the console).
    Alert = 2,
}

impl OperatorRequestKind {
    #[inline]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::GetUserCommand),
            2 => Some(Self::Alert),
            _ => None,
        }
    }
}

/// Analyzer → operator request.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct OperatorRequest {
    /// Wire value of [`OperatorRequestKind`].
    pub kind: i32,
    /// First aircraft of an alert pair, or [`EMERGENCY_PLANE_ID`].
    pub plane1: i32,
    /// Second aircraft of an alert pair, or [`EMERGENCY_PLANE_ID`].
    pub plane2: i32,
    _pad: u32,
    /// Predicted seconds to closest approach (alerts only).
    pub seconds_to_closest: f64,
}

impl OperatorRequest {
    pub fn get_user_command() -> Self {
        Self {
            kind: OperatorRequestKind::GetUserCommand as i32,
            plane1: -1,
            plane2: -1,
            _pad: 0,
            seconds_to_closest: 0.0,
        }
    }

    pub fn alert(plane1: i32, plane2: i32, seconds_to_closest: f64) -> Self {
        Self {
            kind: OperatorRequestKind::Alert as i32,
            plane1,
            plane2,
            _pad: 0,
            seconds_to_closest,
        }
    }

    /// System-wide emergency alert: `(-1, -1, 0)`.
    pub fn emergency_alert() -> Self {
        Self::alert(EMERGENCY_PLANE_ID, EMERGENCY_PLANE_ID, 0.0)
    }

    #[inline]
    pub fn request_kind(&self) -> Option<OperatorRequestKind> {
        OperatorRequestKind::from_i32(self.kind)
    }
}

impl Default for OperatorRequest {
    fn default() -> Self {
        Self::get_user_command()
    }
}

/// User command kinds returned by the operator console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum UserCommandKind {
    /// No pending command.
    None = 0,
    /// Emit a display record for one aircraft.
    ShowPlane = 1,
    /// Change an aircraft's velocity via the command bus.
    SetVelocity = 2,
    /// Change the analyzer's prediction window.
    SetCongestionHorizon = 3,
}

impl UserCommandKind {
    #[inline]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::ShowPlane),
            2 => Some(Self::SetVelocity),
            3 => Some(Self::SetCongestionHorizon),
            _ => None,
        }
    }
}

/// Operator → analyzer reply. Doubles as the alert acknowledgement
/// (kind = `None`).
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct OperatorReply {
    /// Wire value of [`UserCommandKind`].
    pub kind: i32,
    /// Target aircraft for `ShowPlane` / `SetVelocity`.
    pub plane_id: i32,
    /// New velocity for `SetVelocity` [ft/s].
    pub velocity: [f64; 3],
    /// New prediction window for `SetCongestionHorizon` [s].
    pub congestion_s: f64,
}

impl OperatorReply {
    pub fn none() -> Self {
        Self {
            kind: UserCommandKind::None as i32,
            plane_id: -1,
            velocity: [0.0; 3],
            congestion_s: 0.0,
        }
    }

    pub fn show_plane(plane_id: i32) -> Self {
        Self {
            kind: UserCommandKind::ShowPlane as i32,
            plane_id,
            ..Self::none()
        }
    }

    pub fn set_velocity(plane_id: i32, velocity: Vec3) -> Self {
        Self {
            kind: UserCommandKind::SetVelocity as i32,
            plane_id,
            velocity: velocity.into(),
            congestion_s: 0.0,
        }
    }

    pub fn set_congestion_horizon(seconds: f64) -> Self {
        Self {
            kind: UserCommandKind::SetCongestionHorizon as i32,
            plane_id: -1,
            velocity: [0.0; 3],
            congestion_s: seconds,
        }
    }

    #[inline]
    pub fn user_command_kind(&self) -> Option<UserCommandKind> {
        UserCommandKind::from_i32(self.kind)
    }
}

impl Default for OperatorReply {
    fn default() -> Self {
        Self::none()
    }
}

// ─── Display protocol ───────────────────────────────────────────────

/// Record kinds sent from the analyzer to the data display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DisplayKind {
    /// Single-aircraft info record.
    OnePlane = 1,
    /// Plain multi-aircraft table.
    MultiplePlane = 2,
    /// Console grid rendering of the airspace.
    Grid = 3,
    /// Same content as `Grid`, appended to the display's log file.
    Log = 4,
    /// Orderly shutdown of the display server.
    Exit = 5,
}

impl DisplayKind {
    #[inline]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::OnePlane),
            2 => Some(Self::MultiplePlane),
            3 => Some(Self::Grid),
            4 => Some(Self::Log),
            5 => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Analyzer → display record. Fixed-capacity inline arrays; `count`
/// says how many leading entries are valid.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct DisplayRecord {
    /// Wire value of [`DisplayKind`].
    pub kind: i32,
    /// Valid entry count (1 for `OnePlane`).
    pub count: i32,
    pub ids: [i32; MAX_FLEET],
    pub positions: [[f64; 3]; MAX_FLEET],
    pub velocities: [[f64; 3]; MAX_FLEET],
}

impl DisplayRecord {
    fn blank(kind: DisplayKind) -> Self {
        Self {
            kind: kind as i32,
            count: 0,
            ids: [-1; MAX_FLEET],
            positions: [[0.0; 3]; MAX_FLEET],
            velocities: [[0.0; 3]; MAX_FLEET],
        }
    }

    pub fn one_plane(plane_id: i32, pos: Vec3, vel: Vec3) -> Self {
        let mut rec = Self::blank(DisplayKind::OnePlane);
        rec.count = 1;
        rec.ids[0] = plane_id;
        rec.positions[0] = pos.into();
        rec.velocities[0] = vel.into();
        rec
    }

    /// Build a multi-aircraft record from a snapshot.
    pub fn from_snapshot(kind: DisplayKind, snapshot: &FleetSnapshot) -> Self {
        let mut rec = Self::blank(kind);
        for i in 0..snapshot.len() {
            rec.ids[i] = snapshot.positions[i].plane_id;
            rec.positions[i] = snapshot.positions[i].position().into();
            rec.velocities[i] = snapshot.velocities[i].velocity().into();
        }
        rec.count = snapshot.len() as i32;
        rec
    }

    pub fn exit() -> Self {
        Self::blank(DisplayKind::Exit)
    }

    #[inline]
    pub fn display_kind(&self) -> Option<DisplayKind> {
        DisplayKind::from_i32(self.kind)
    }

    /// Valid entry count, clamped into `0..=MAX_FLEET`.
    #[inline]
    pub fn len(&self) -> usize {
        (self.count.max(0) as usize).min(MAX_FLEET)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DisplayRecord {
    fn default() -> Self {
        Self::blank(DisplayKind::MultiplePlane)
    }
}

/// Minimal acknowledgement payload for one-way mailbox protocols.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Ack {
    /// Nonzero on success.
    pub status: i32,
    _pad: u32,
}

impl Ack {
    pub fn ok() -> Self {
        Self { status: 1, _pad: 0 }
    }
}

// ─── Logger protocol ────────────────────────────────────────────────

/// Record kinds sent from the analyzer to the airspace logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum LoggerKind {
    /// Full snapshot dump for the history log.
    LogAirspace = 1,
    /// Orderly shutdown of the logger server.
    Exit = 2,
}

impl LoggerKind {
    #[inline]
    pub const fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::LogAirspace),
            2 => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Analyzer → airspace logger record.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
pub struct AirspaceLogRecord {
    /// Wire value of [`LoggerKind`].
    pub kind: i32,
    /// Valid entry count.
    pub num_planes: i32,
    /// Simulated seconds at shipping time.
    pub timestamp: f64,
    pub positions: [PositionRecord; MAX_FLEET],
    pub velocities: [VelocityRecord; MAX_FLEET],
}

impl AirspaceLogRecord {
    pub fn from_snapshot(timestamp: f64, snapshot: &FleetSnapshot) -> Self {
        Self {
            kind: LoggerKind::LogAirspace as i32,
            num_planes: snapshot.len() as i32,
            timestamp,
            positions: snapshot.positions,
            velocities: snapshot.velocities,
        }
    }

    pub fn exit() -> Self {
        Self {
            kind: LoggerKind::Exit as i32,
            num_planes: 0,
            timestamp: 0.0,
            positions: [PositionRecord::default(); MAX_FLEET],
            velocities: [VelocityRecord::default(); MAX_FLEET],
        }
    }

    #[inline]
    pub fn logger_kind(&self) -> Option<LoggerKind> {
        LoggerKind::from_i32(self.kind)
    }

    /// Valid entry count, clamped into `0..=MAX_FLEET`.
    #[inline]
    pub fn len(&self) -> usize {
        (self.num_planes.max(0) as usize).min(MAX_FLEET)
    }
}

impl Default for AirspaceLogRecord {
    fn default() -> Self {
        Self::exit()
    }
}

// ─── Layout pins ────────────────────────────────────────────────────

const_assert_eq!(core::mem::size_of::<PositionRecord>(), 40);
const_assert_eq!(core::mem::size_of::<VelocityRecord>(), 40);
const_assert_eq!(core::mem::size_of::<FleetSnapshot>(), 808);
const_assert_eq!(core::mem::size_of::<CommandRecord>(), 40);
const_assert_eq!(core::mem::size_of::<OperatorRequest>(), 24);
const_assert_eq!(core::mem::size_of::<OperatorReply>(), 40);
const_assert_eq!(core::mem::size_of::<DisplayRecord>(), 528);
const_assert_eq!(core::mem::size_of::<Ack>(), 8);
const_assert_eq!(core::mem::size_of::<AirspaceLogRecord>(), 816);
const_assert_eq!(core::mem::align_of::<FleetSnapshot>(), 8);
const_assert_eq!(core::mem::align_of::<CommandRecord>(), 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_push_and_alignment() {
        let mut snap = FleetSnapshot::empty();
        assert!(snap.is_empty());

        for i in 0..MAX_FLEET {
            let ok = snap.push(
                i as i32,
                Vec3::new(1000.0 * i as f64, 0.0, 5000.0),
                Vec3::new(100.0, 0.0, 0.0),
                42,
            );
            assert!(ok);
        }
        assert_eq!(snap.len(), MAX_FLEET);
        assert!(!snap.push(99, Vec3::ZERO, Vec3::ZERO, 42));

        for i in 0..snap.len() {
            assert_eq!(snap.positions[i].plane_id, snap.velocities[i].plane_id);
        }
    }

    #[test]
    fn snapshot_find() {
        let mut snap = FleetSnapshot::empty();
        snap.push(7, Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0), 0);
        let (p, v) = snap.find(7).unwrap();
        assert_eq!(p.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(v.velocity(), Vec3::new(4.0, 5.0, 6.0));
        assert!(snap.find(8).is_none());
    }

    #[test]
    fn snapshot_len_clamps_corrupt_count() {
        let mut snap = FleetSnapshot::empty();
        snap.num_planes = 99;
        assert_eq!(snap.len(), MAX_FLEET);
        snap.num_planes = -3;
        assert_eq!(snap.len(), 0);
    }

    #[test]
    fn command_kind_round_trip() {
        assert_eq!(CommandKind::from_i32(1), Some(CommandKind::SetVelocity));
        assert_eq!(CommandKind::from_i32(2), Some(CommandKind::SetPosition));
        assert_eq!(CommandKind::from_i32(0), None);
        assert_eq!(CommandKind::from_i32(3), None);

        let cmd = CommandRecord::new(4, CommandKind::SetVelocity, Vec3::new(0.0, 100.0, 0.0), 10);
        assert_eq!(cmd.command_kind(), Some(CommandKind::SetVelocity));
        assert_eq!(cmd.value, [0.0, 100.0, 0.0]);
    }

    #[test]
    fn operator_messages() {
        let req = OperatorRequest::get_user_command();
        assert_eq!(req.request_kind(), Some(OperatorRequestKind::GetUserCommand));

        let alert = OperatorRequest::alert(1, 2, 35.5);
        assert_eq!(alert.request_kind(), Some(OperatorRequestKind::Alert));
        assert_eq!(alert.seconds_to_closest, 35.5);

        let emergency = OperatorRequest::emergency_alert();
        assert_eq!(emergency.plane1, EMERGENCY_PLANE_ID);
        assert_eq!(emergency.plane2, EMERGENCY_PLANE_ID);
        assert_eq!(emergency.seconds_to_closest, 0.0);

        let reply = OperatorReply::set_velocity(3, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(reply.user_command_kind(), Some(UserCommandKind::SetVelocity));
        assert_eq!(reply.velocity, [1.0, 2.0, 3.0]);
    }

    #[test]
    fn display_record_from_snapshot() {
        let mut snap = FleetSnapshot::empty();
        snap.push(1, Vec3::new(10.0, 20.0, 30.0), Vec3::new(1.0, 0.0, 0.0), 0);
        snap.push(2, Vec3::new(40.0, 50.0, 60.0), Vec3::new(0.0, 1.0, 0.0), 0);

        let rec = DisplayRecord::from_snapshot(DisplayKind::Grid, &snap);
        assert_eq!(rec.display_kind(), Some(DisplayKind::Grid));
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.ids[0], 1);
        assert_eq!(rec.positions[1], [40.0, 50.0, 60.0]);
        assert_eq!(rec.ids[2], -1);
    }

    #[test]
    fn logger_record_from_snapshot() {
        let mut snap = FleetSnapshot::empty();
        snap.push(5, Vec3::new(1.0, 1.0, 1.0), Vec3::ZERO, 7);
        let rec = AirspaceLogRecord::from_snapshot(123.0, &snap);
        assert_eq!(rec.logger_kind(), Some(LoggerKind::LogAirspace));
        assert_eq!(rec.len(), 1);
        assert_eq!(rec.timestamp, 123.0);
        assert_eq!(rec.positions[0].plane_id, 5);
    }

    #[test]
    fn subsystem_slots_are_distinct() {
        for a in Subsystem::ALL {
            for b in Subsystem::ALL {
                if a != b {
                    assert_ne!(a.index(), b.index());
                    assert_ne!(a.channel_id(), b.channel_id());
                }
            }
        }
    }
}
