//! Analyzer main loop and pulse dispatch.
//!
//! The analyzer owns the reading end of the airspace store, the
//! producing end of the command ring, and the client end of the three
//! server mailboxes. Pulses from the scheduler drive it; every handler
//! finishes well inside one period, and the two heavyweight paths
//! (violation sweep, display logging) carry an in-progress flag so a
//! tick arriving mid-run is skipped instead of queued.

use crate::scheduler::Pulse;
use crate::separation::scan_snapshot;
use atc_common::clock::{wall_seconds, SimClock};
use atc_common::wire::{
    Ack, AirspaceLogRecord, CommandKind, CommandRecord, DisplayKind, DisplayRecord, FleetSnapshot,
    OperatorReply, OperatorRequest, UserCommandKind,
};
use atc_shared_memory::{CommandRing, MailboxClient, ShmError, SlotReader};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Widest accepted congestion horizon [s]. A day of lookahead is far
/// beyond any meaningful prediction; larger values are operator typos.
const MAX_HORIZON_S: f64 = 86_400.0;

/// State shared between the pulse loop and the emergency monitor.
pub struct AnalyzerShared {
    /// Operator console channel; alerts and polls both go through it.
    operator: Mutex<MailboxClient<OperatorRequest, OperatorReply>>,
    /// Forward prediction window [s], operator-tunable. Stored as
    /// `f64` bits so fractional updates survive intact.
    congestion_horizon_bits: AtomicU64,
    /// Non-blocking reentrancy guard for the violation sweep.
    violation_in_progress: AtomicBool,
}

impl AnalyzerShared {
    pub fn new(
        operator: MailboxClient<OperatorRequest, OperatorReply>,
        initial_horizon_s: u32,
    ) -> Self {
        Self {
            operator: Mutex::new(operator),
            congestion_horizon_bits: AtomicU64::new(f64::from(initial_horizon_s).to_bits()),
            violation_in_progress: AtomicBool::new(false),
        }
    }

    /// Current prediction window [s].
    pub fn horizon_s(&self) -> f64 {
        f64::from_bits(self.congestion_horizon_bits.load(Ordering::Acquire))
    }

    /// Update the prediction window. Already-delivered alerts are
    /// unaffected.
    pub fn set_horizon_s(&self, seconds: f64) {
        self.congestion_horizon_bits
            .store(seconds.to_bits(), Ordering::Release);
        info!(seconds, "congestion horizon updated");
    }

    /// Run one violation sweep unless another is already in flight.
    /// Returns the number of alerts delivered, or `None` when skipped.
    pub fn checked_violation_sweep(
        &self,
        reader: &mut SlotReader<FleetSnapshot>,
    ) -> Option<usize> {
        if self.violation_in_progress.swap(true, Ordering::SeqCst) {
            debug!("violation check already in progress, skipping tick");
            return None;
        }
        let delivered = self.violation_sweep(reader);
        self.violation_in_progress.store(false, Ordering::SeqCst);
        Some(delivered)
    }

    fn violation_sweep(&self, reader: &mut SlotReader<FleetSnapshot>) -> usize {
        let snapshot = match reader.read() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("cannot read fleet snapshot for violation check: {e}");
                return 0;
            }
        };

        let violations = scan_snapshot(&snapshot, self.horizon_s());
        let mut delivered = 0;
        for violation in &violations {
            warn!(
                plane1 = violation.plane1,
                plane2 = violation.plane2,
                seconds = violation.seconds_to_closest,
                "separation violation predicted"
            );
            let alert = OperatorRequest::alert(
                violation.plane1,
                violation.plane2,
                violation.seconds_to_closest,
            );
            // One attempt per alert; a failed send is logged, never
            // retried in-line.
            match self.operator.lock().call(&alert) {
                Ok(_ack) => delivered += 1,
                Err(e) => warn!("alert delivery failed: {e}"),
            }
        }
        delivered
    }

    /// Deliver the system-wide emergency alert `(-1, -1, 0)`.
    pub fn send_emergency_alert(&self) -> bool {
        match self.operator.lock().call(&OperatorRequest::emergency_alert()) {
            Ok(_ack) => true,
            Err(e) => {
                warn!("emergency alert delivery failed: {e}");
                false
            }
        }
    }

    /// Ask the operator console for its oldest pending command.
    fn poll_operator(&self) -> Result<OperatorReply, ShmError> {
        self.operator.lock().call(&OperatorRequest::get_user_command())
    }
}

/// The pulse-driven analyzer task.
pub struct Analyzer {
    shared: Arc<AnalyzerShared>,
    fleet_reader: SlotReader<FleetSnapshot>,
    ring: CommandRing,
    display: MailboxClient<DisplayRecord, Ack>,
    logger: MailboxClient<AirspaceLogRecord, Ack>,
    /// Non-blocking reentrancy guard shared by the two logging cadences.
    log_in_progress: AtomicBool,
    clock: SimClock,
}

impl Analyzer {
    pub fn new(
        shared: Arc<AnalyzerShared>,
        fleet_reader: SlotReader<FleetSnapshot>,
        ring: CommandRing,
        display: MailboxClient<DisplayRecord, Ack>,
        logger: MailboxClient<AirspaceLogRecord, Ack>,
        clock: SimClock,
    ) -> Self {
        Self {
            shared,
            fleet_reader,
            ring,
            display,
            logger,
            log_in_progress: AtomicBool::new(false),
            clock,
        }
    }

    /// Block on the pulse channel until `should_stop` turns true.
    pub fn run(&mut self, pulses: &Receiver<Pulse>, should_stop: impl Fn() -> bool) {
        info!("analyzer pulse loop running");
        while !should_stop() {
            match pulses.recv_timeout(Duration::from_millis(200)) {
                Ok(pulse) => self.handle_pulse(pulse),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("analyzer pulse loop stopping");
    }

    /// Dispatch one scheduler pulse. Failure of any handler never
    /// stalls the others.
    pub fn handle_pulse(&mut self, pulse: Pulse) {
        match pulse {
            Pulse::ViolationCheck => {
                self.shared.checked_violation_sweep(&mut self.fleet_reader);
            }
            Pulse::OperatorPoll => self.operator_poll(),
            Pulse::ConsoleGrid => self.emit_display(DisplayKind::Grid),
            Pulse::FileLog => self.emit_display(DisplayKind::Log),
            Pulse::ShipAirspaceLog => self.ship_airspace_log(),
        }
    }

    /// 1 s cadence: fetch and dispatch the oldest pending user command.
    pub fn operator_poll(&mut self) {
        let reply = match self.shared.poll_operator() {
            Ok(reply) => reply,
            Err(e) => {
                // Missing or busy peer; next cadence retries naturally.
                info!("operator poll failed: {e}");
                return;
            }
        };

        match reply.user_command_kind() {
            Some(UserCommandKind::None) => {}
            Some(UserCommandKind::ShowPlane) => self.show_plane(reply.plane_id),
            Some(UserCommandKind::SetCongestionHorizon) => {
                let seconds = reply.congestion_s;
                if seconds.is_finite() && seconds >= 1.0 && seconds <= MAX_HORIZON_S {
                    self.shared.set_horizon_s(seconds);
                } else {
                    warn!(seconds, "ignoring out-of-range congestion horizon");
                }
            }
            Some(UserCommandKind::SetVelocity) => {
                let command = CommandRecord::new(
                    reply.plane_id,
                    CommandKind::SetVelocity,
                    reply.velocity.into(),
                    wall_seconds(),
                );
                match self.ring.enqueue(&command) {
                    Ok(()) => info!(plane = reply.plane_id, "velocity change queued"),
                    Err(ShmError::QueueFull) => {
                        // Surfaced, dropped, never blocks the poll loop.
                        warn!(
                            plane = reply.plane_id,
                            "command queue full, dropping velocity change"
                        );
                    }
                    Err(e) => warn!("command enqueue failed: {e}"),
                }
            }
            None => warn!(kind = reply.kind, "unknown user command kind"),
        }
    }

    fn show_plane(&mut self, plane_id: i32) {
        let snapshot = match self.fleet_reader.read() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("cannot read fleet snapshot for display request: {e}");
                return;
            }
        };

        match snapshot.find(plane_id) {
            Some((position, velocity)) => {
                let record =
                    DisplayRecord::one_plane(plane_id, position.position(), velocity.velocity());
                self.send_display(&record);
            }
            None => warn!(plane = plane_id, "not tracked, dropping display request"),
        }
    }

    /// 5 s / 20 s cadences: ship the current fleet to the display.
    pub fn emit_display(&mut self, kind: DisplayKind) {
        if self.log_in_progress.swap(true, Ordering::SeqCst) {
            debug!(?kind, "log emission already in progress, skipping tick");
            return;
        }

        if let Ok(snapshot) = self.fleet_reader.read() {
            let record = DisplayRecord::from_snapshot(kind, &snapshot);
            self.send_display(&record);
        } else {
            error!("cannot read fleet snapshot for display emission");
        }

        self.log_in_progress.store(false, Ordering::SeqCst);
    }

    fn send_display(&mut self, record: &DisplayRecord) {
        match self.display.call(record) {
            Ok(ack) if ack.status != 0 => {}
            Ok(_) => warn!("display rejected record"),
            Err(e) => warn!("display send failed: {e}"),
        }
    }

    /// Tell the display and logger servers to wind down. Best-effort:
    /// a peer that is already gone only costs a logged timeout.
    pub fn send_exit_records(&mut self) {
        if let Err(e) = self.display.call(&DisplayRecord::exit()) {
            info!("display exit record not delivered: {e}");
        }
        if let Err(e) = self.logger.call(&AirspaceLogRecord::exit()) {
            info!("logger exit record not delivered: {e}");
        }
    }

    /// 20 s cadence: ship a full snapshot to the airspace logger.
    pub fn ship_airspace_log(&mut self) {
        let snapshot = match self.fleet_reader.read() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("cannot read fleet snapshot for history log: {e}");
                return;
            }
        };

        let record = AirspaceLogRecord::from_snapshot(self.clock.now(), &snapshot);
        match self.logger.call(&record) {
            Ok(ack) if ack.status != 0 => debug!("airspace log shipped"),
            Ok(_) => warn!("airspace logger rejected record"),
            Err(e) => warn!("airspace log send failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atc_common::consts::DEFAULT_CONGESTION_HORIZON_S;
    use atc_common::geometry::Vec3;
    use atc_common::wire::{LoggerKind, OperatorRequestKind};
    use atc_shared_memory::{MailboxServer, SlotWriter};
    use std::sync::mpsc;

    fn unique(name: &str) -> String {
        format!("{name}_{}", std::process::id())
    }

    /// Scripted operator console: pops replies front-first, records
    /// every alert it acknowledges, serves until stopped.
    fn spawn_operator(
        name: &str,
        script: Vec<OperatorReply>,
        stop: Arc<AtomicBool>,
    ) -> std::thread::JoinHandle<Vec<OperatorRequest>> {
        let mut server = MailboxServer::<OperatorRequest, OperatorReply>::create(name).unwrap();
        std::thread::spawn(move || {
            let mut script = std::collections::VecDeque::from(script);
            let mut alerts = Vec::new();
            while !stop.load(Ordering::SeqCst) {
                if let Some(request) = server.try_receive() {
                    match request.request_kind() {
                        Some(OperatorRequestKind::GetUserCommand) => {
                            let reply = script.pop_front().unwrap_or_else(OperatorReply::none);
                            server.reply(&reply);
                        }
                        _ => {
                            alerts.push(request);
                            server.reply(&OperatorReply::none());
                        }
                    }
                } else {
                    std::thread::sleep(Duration::from_millis(1));
                }
            }
            alerts
        })
    }

    struct Fixture {
        analyzer: Analyzer,
        shared: Arc<AnalyzerShared>,
        fleet_writer: SlotWriter<FleetSnapshot>,
        ring: CommandRing,
        operator_thread: std::thread::JoinHandle<Vec<OperatorRequest>>,
        display_rx: mpsc::Receiver<DisplayRecord>,
        logger_rx: mpsc::Receiver<AirspaceLogRecord>,
        operator_stop: Arc<AtomicBool>,
        display_stop: Arc<AtomicBool>,
        logger_stop: Arc<AtomicBool>,
        display_thread: std::thread::JoinHandle<()>,
        logger_thread: std::thread::JoinHandle<()>,
    }

    fn fixture(tag: &str, script: Vec<OperatorReply>) -> Fixture {
        let fleet_seg = unique(&format!("an_fleet_{tag}"));
        let ring_seg = unique(&format!("an_ring_{tag}"));
        let op_seg = unique(&format!("an_op_{tag}"));
        let disp_seg = unique(&format!("an_disp_{tag}"));
        let log_seg = unique(&format!("an_log_{tag}"));

        let fleet_writer = SlotWriter::<FleetSnapshot>::create(&fleet_seg).unwrap();
        let fleet_reader = SlotReader::<FleetSnapshot>::attach(&fleet_seg).unwrap();
        let ring_producer = CommandRing::create(&ring_seg).unwrap();
        let ring_observer = CommandRing::attach(&ring_seg).unwrap();

        let operator_stop = Arc::new(AtomicBool::new(false));
        let operator_thread = spawn_operator(&op_seg, script, Arc::clone(&operator_stop));
        let operator = MailboxClient::<OperatorRequest, OperatorReply>::attach(&op_seg)
            .unwrap()
            .with_timeout(Duration::from_millis(500));

        let mut display_server = MailboxServer::<DisplayRecord, Ack>::create(&disp_seg).unwrap();
        let (display_tx, display_rx) = mpsc::channel();
        let display_stop = Arc::new(AtomicBool::new(false));
        let display_thread = {
            let stop = Arc::clone(&display_stop);
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    if let Some(record) = display_server.try_receive() {
                        display_server.reply(&Ack::ok());
                        let _ = display_tx.send(record);
                    } else {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                }
            })
        };

        let mut logger_server = MailboxServer::<AirspaceLogRecord, Ack>::create(&log_seg).unwrap();
        let (logger_tx, logger_rx) = mpsc::channel();
        let logger_stop = Arc::new(AtomicBool::new(false));
        let logger_thread = {
            let stop = Arc::clone(&logger_stop);
            std::thread::spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    if let Some(record) = logger_server.try_receive() {
                        logger_server.reply(&Ack::ok());
                        let _ = logger_tx.send(record);
                    } else {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                }
            })
        };

        let shared = Arc::new(AnalyzerShared::new(operator, DEFAULT_CONGESTION_HORIZON_S));
        let analyzer = Analyzer::new(
            Arc::clone(&shared),
            fleet_reader,
            ring_producer,
            MailboxClient::attach(&disp_seg)
                .unwrap()
                .with_timeout(Duration::from_millis(500)),
            MailboxClient::attach(&log_seg)
                .unwrap()
                .with_timeout(Duration::from_millis(500)),
            SimClock::start_now(),
        );

        Fixture {
            analyzer,
            shared,
            fleet_writer,
            ring: ring_observer,
            operator_thread,
            display_rx,
            logger_rx,
            operator_stop,
            display_stop,
            logger_stop,
            display_thread,
            logger_thread,
        }
    }

    impl Fixture {
        fn publish(&mut self, entries: &[(i32, Vec3, Vec3)]) {
            let mut snapshot = FleetSnapshot::empty();
            for &(id, p, v) in entries {
                snapshot.push(id, p, v, 0);
            }
            self.fleet_writer.publish(&snapshot);
        }

        fn finish(self) -> Vec<OperatorRequest> {
            self.operator_stop.store(true, Ordering::SeqCst);
            self.display_stop.store(true, Ordering::SeqCst);
            self.logger_stop.store(true, Ordering::SeqCst);
            self.display_thread.join().unwrap();
            self.logger_thread.join().unwrap();
            self.operator_thread.join().unwrap()
        }
    }

    #[test]
    fn set_velocity_reply_lands_on_the_ring() {
        let mut fx = fixture(
            "vel",
            vec![OperatorReply::set_velocity(1, Vec3::new(0.0, 100.0, 0.0))],
        );
        fx.publish(&[(1, Vec3::new(10_000.0, 10_000.0, 5_000.0), Vec3::new(100.0, 0.0, 0.0))]);

        fx.analyzer.operator_poll();

        let queued = fx.ring.dequeue().expect("command should be queued");
        assert_eq!(queued.plane_id, 1);
        assert_eq!(queued.command_kind(), Some(CommandKind::SetVelocity));
        assert_eq!(queued.value, [0.0, 100.0, 0.0]);
        fx.finish();
    }

    #[test]
    fn congestion_update_takes_effect_next_sweep() {
        let mut fx = fixture(
            "horizon",
            vec![OperatorReply::set_congestion_horizon(300.0)],
        );
        // Closest approach at ~200 s: invisible at 120 s horizon.
        fx.publish(&[
            (
                1,
                Vec3::new(0.0, 50_000.0, 10_000.0),
                Vec3::new(200.0, 0.0, 0.0),
            ),
            (
                2,
                Vec3::new(80_000.0, 50_000.0, 10_000.0),
                Vec3::new(-200.0, 0.0, 0.0),
            ),
        ]);

        let before = fx
            .shared
            .checked_violation_sweep(&mut fx.analyzer.fleet_reader)
            .unwrap();
        assert_eq!(before, 0);

        fx.analyzer.operator_poll();
        assert_eq!(fx.shared.horizon_s(), 300.0);

        let after = fx
            .shared
            .checked_violation_sweep(&mut fx.analyzer.fleet_reader)
            .unwrap();
        assert_eq!(after, 1);

        let alerts = fx.finish();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].plane1, 1);
        assert_eq!(alerts[0].plane2, 2);
        assert!((alerts[0].seconds_to_closest - 200.0).abs() < 1.0);
    }

    #[test]
    fn fractional_horizon_survives_intact() {
        let mut fx = fixture(
            "fraction",
            vec![OperatorReply::set_congestion_horizon(90.5)],
        );
        fx.publish(&[]);

        fx.analyzer.operator_poll();
        assert_eq!(fx.shared.horizon_s(), 90.5);
        fx.finish();
    }

    #[test]
    fn show_plane_emits_one_plane_record() {
        let mut fx = fixture(
            "show",
            vec![
                OperatorReply::show_plane(2),
                OperatorReply::show_plane(42),
            ],
        );
        fx.publish(&[
            (1, Vec3::new(1_000.0, 1_000.0, 5_000.0), Vec3::ZERO),
            (
                2,
                Vec3::new(30_000.0, 40_000.0, 7_000.0),
                Vec3::new(-50.0, 100.0, 0.0),
            ),
        ]);

        fx.analyzer.operator_poll();
        let record = fx
            .display_rx
            .recv_timeout(Duration::from_secs(1))
            .expect("display record expected");
        assert_eq!(record.display_kind(), Some(DisplayKind::OnePlane));
        assert_eq!(record.ids[0], 2);
        assert_eq!(record.positions[0], [30_000.0, 40_000.0, 7_000.0]);

        // Unknown plane: logged and dropped, nothing reaches the display.
        fx.analyzer.operator_poll();
        assert!(fx
            .display_rx
            .recv_timeout(Duration::from_millis(100))
            .is_err());
        fx.finish();
    }

    #[test]
    fn grid_and_log_cadences_ship_the_fleet() {
        let mut fx = fixture("grid", vec![]);
        fx.publish(&[
            (1, Vec3::new(1_000.0, 1_000.0, 5_000.0), Vec3::ZERO),
            (2, Vec3::new(9_000.0, 9_000.0, 9_000.0), Vec3::ZERO),
        ]);

        fx.analyzer.handle_pulse(Pulse::ConsoleGrid);
        let grid = fx.display_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(grid.display_kind(), Some(DisplayKind::Grid));
        assert_eq!(grid.len(), 2);

        fx.analyzer.handle_pulse(Pulse::FileLog);
        let log = fx.display_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(log.display_kind(), Some(DisplayKind::Log));

        fx.analyzer.handle_pulse(Pulse::ShipAirspaceLog);
        let shipped = fx.logger_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(shipped.logger_kind(), Some(LoggerKind::LogAirspace));
        assert_eq!(shipped.len(), 2);
        fx.finish();
    }

    #[test]
    fn violation_sweep_skips_when_already_running() {
        let mut fx = fixture("skip", vec![]);
        fx.publish(&[]);

        fx.shared
            .violation_in_progress
            .store(true, Ordering::SeqCst);
        assert!(fx
            .shared
            .checked_violation_sweep(&mut fx.analyzer.fleet_reader)
            .is_none());

        fx.shared
            .violation_in_progress
            .store(false, Ordering::SeqCst);
        assert_eq!(
            fx.shared
                .checked_violation_sweep(&mut fx.analyzer.fleet_reader),
            Some(0)
        );
        fx.finish();
    }
}
