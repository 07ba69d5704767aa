//! Periodic pulse scheduler.
//!
//! One timer thread per cadence delivers code-tagged pulses onto a
//! bounded channel. Timers run on the monotonic clock with no catch-up:
//! a tick that cannot be delivered (channel full) or that was missed
//! under overload is dropped, never accumulated. Delivery order between
//! timers firing in the same instant is unspecified and the analyzer is
//! insensitive to it.

use atc_common::consts::{
    AIRSPACE_LOG_PERIOD_S, CONSOLE_LOG_PERIOD_S, FILE_LOG_PERIOD_S, OPERATOR_POLL_PERIOD_S,
    VIOLATION_CHECK_PERIOD_S,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

/// Code-tagged notification delivered to the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pulse {
    /// 1 s: run the pairwise violation prediction.
    ViolationCheck,
    /// 1 s: poll the operator console for a command.
    OperatorPoll,
    /// 5 s: emit a console grid record to the display.
    ConsoleGrid,
    /// 20 s: emit a file log record to the display.
    FileLog,
    /// 20 s: ship a full snapshot to the airspace logger.
    ShipAirspaceLog,
}

impl Pulse {
    /// The cadence of this pulse.
    pub const fn period(self) -> Duration {
        let seconds = match self {
            Pulse::ViolationCheck => VIOLATION_CHECK_PERIOD_S,
            Pulse::OperatorPoll => OPERATOR_POLL_PERIOD_S,
            Pulse::ConsoleGrid => CONSOLE_LOG_PERIOD_S,
            Pulse::FileLog => FILE_LOG_PERIOD_S,
            Pulse::ShipAirspaceLog => AIRSPACE_LOG_PERIOD_S,
        };
        Duration::from_secs(seconds)
    }

    /// Every cadence the scheduler drives.
    pub const ALL: [Pulse; 5] = [
        Pulse::ViolationCheck,
        Pulse::OperatorPoll,
        Pulse::ConsoleGrid,
        Pulse::FileLog,
        Pulse::ShipAirspaceLog,
    ];
}

/// Longest sleep before a timer re-checks its stop flag.
const STOP_POLL: Duration = Duration::from_millis(200);

/// Handle on the five running timers.
pub struct Scheduler {
    stop: Arc<AtomicBool>,
    timers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Start every cadence, delivering onto `tx`.
    pub fn start(tx: Sender<Pulse>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let timers = Pulse::ALL
            .iter()
            .map(|&pulse| {
                let tx = tx.clone();
                let stop = Arc::clone(&stop);
                std::thread::spawn(move || timer_loop(pulse, pulse.period(), tx, &stop))
            })
            .collect();
        Self { stop, timers }
    }

    /// Stop and join every timer thread.
    pub fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        for timer in self.timers {
            let _ = timer.join();
        }
    }
}

/// Create the pulse channel. Small and bounded: a stalled analyzer
/// sheds ticks instead of building a backlog.
pub fn pulse_channel() -> (Sender<Pulse>, Receiver<Pulse>) {
    bounded(16)
}

/// One timer cadence. Public for tests, which run it at millisecond
/// periods.
pub fn timer_loop(pulse: Pulse, period: Duration, tx: Sender<Pulse>, stop: &AtomicBool) {
    let mut next = Instant::now() + period;
    while !stop.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now < next {
            std::thread::sleep((next - now).min(STOP_POLL));
            continue;
        }

        match tx.try_send(pulse) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                debug!(?pulse, "pulse channel full, tick dropped");
            }
            Err(TrySendError::Disconnected(_)) => return,
        }

        next += period;
        let now = Instant::now();
        if next <= now {
            // Missed ticks are dropped, not accumulated.
            next = now + period;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_match_the_five_cadences() {
        assert_eq!(Pulse::ViolationCheck.period(), Duration::from_secs(1));
        assert_eq!(Pulse::OperatorPoll.period(), Duration::from_secs(1));
        assert_eq!(Pulse::ConsoleGrid.period(), Duration::from_secs(5));
        assert_eq!(Pulse::FileLog.period(), Duration::from_secs(20));
        assert_eq!(Pulse::ShipAirspaceLog.period(), Duration::from_secs(20));
        assert_eq!(Pulse::ALL.len(), 5);
    }

    #[test]
    fn timer_delivers_at_cadence() {
        let (tx, rx) = bounded(64);
        let stop = Arc::new(AtomicBool::new(false));
        let timer = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                timer_loop(Pulse::ViolationCheck, Duration::from_millis(10), tx, &stop)
            })
        };

        let mut received = 0;
        let deadline = Instant::now() + Duration::from_millis(500);
        while received < 5 && Instant::now() < deadline {
            if rx.recv_timeout(Duration::from_millis(50)).is_ok() {
                received += 1;
            }
        }
        stop.store(true, Ordering::SeqCst);
        timer.join().unwrap();
        assert!(received >= 5, "expected at least 5 ticks, got {received}");
    }

    #[test]
    fn full_channel_sheds_ticks_without_backlog() {
        // Capacity-1 channel, nobody draining: ticks must be dropped.
        let (tx, rx) = bounded(1);
        let stop = Arc::new(AtomicBool::new(false));
        let timer = {
            let stop = Arc::clone(&stop);
            std::thread::spawn(move || {
                timer_loop(Pulse::OperatorPoll, Duration::from_millis(5), tx, &stop)
            })
        };

        std::thread::sleep(Duration::from_millis(100));
        stop.store(true, Ordering::SeqCst);
        timer.join().unwrap();

        // Only the single buffered tick survives; the ~20 fired during
        // the sleep were shed.
        let mut drained = 0;
        while rx.try_recv().is_ok() {
            drained += 1;
        }
        assert_eq!(drained, 1);
    }

    #[test]
    fn scheduler_starts_and_stops_cleanly() {
        let (tx, rx) = pulse_channel();
        let scheduler = Scheduler::start(tx);
        // The two 1 s cadences fire within a generous window.
        let first = rx.recv_timeout(Duration::from_secs(3)).unwrap();
        assert!(Pulse::ALL.contains(&first));
        scheduler.stop();
    }
}
