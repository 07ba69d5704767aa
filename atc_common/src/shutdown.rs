//! Signal-driven shutdown and emergency flags.
//!
//! Handlers only flip process-wide atomics (async-signal-safe); worker
//! loops poll the flags between iterations and wind down in order:
//! finish the current iteration, release locks, join threads, return.

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);
static EMERGENCY: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_shutdown(_sig: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

extern "C" fn handle_emergency(_sig: libc::c_int) {
    EMERGENCY.store(true, Ordering::SeqCst);
}

/// Install SIGINT + SIGTERM handlers that request shutdown.
pub fn install_shutdown_handler() -> Result<(), nix::Error> {
    let action = SigAction::new(
        SigHandler::Handler(handle_shutdown),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe {
        sigaction(Signal::SIGINT, &action)?;
        sigaction(Signal::SIGTERM, &action)?;
    }
    Ok(())
}

/// Install the SIGUSR1 handler that raises the emergency flag.
pub fn install_emergency_handler() -> Result<(), nix::Error> {
    let action = SigAction::new(
        SigHandler::Handler(handle_emergency),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe {
        sigaction(Signal::SIGUSR1, &action)?;
    }
    Ok(())
}

/// Whether a shutdown signal has been received.
#[inline]
pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Request shutdown from within the process.
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Consume the emergency flag. Multiple triggers before consumption
/// coalesce into one.
#[inline]
pub fn take_emergency() -> bool {
    EMERGENCY.swap(false, Ordering::SeqCst)
}

/// Raise the emergency flag from within the process.
pub fn trigger_emergency() {
    EMERGENCY.store(true, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_flag_coalesces_and_clears() {
        trigger_emergency();
        trigger_emergency();
        assert!(take_emergency());
        assert!(!take_emergency());
    }

    #[test]
    fn shutdown_flag_latches() {
        assert!(!shutdown_requested() || SHUTDOWN.load(Ordering::SeqCst));
        request_shutdown();
        assert!(shutdown_requested());
        // Reset so other tests in this process see a clean flag.
        SHUTDOWN.store(false, Ordering::SeqCst);
    }
}
