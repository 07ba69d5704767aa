//! Per-subsystem tracing initialization.
//!
//! Every ATC binary logs to the console (filtered by `RUST_LOG`, `info`
//! default) and appends to its own file in the configured log directory.
//! The file layer is non-blocking so logging never stalls a periodic
//! task; the returned guard must be held for the life of the process or
//! tail-end records are lost.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize tracing for one subsystem binary.
///
/// On any file-layer failure (unwritable log directory) the console
/// layer still comes up and a warning is printed; logging problems are
/// never fatal to the simulation.
pub fn init_tracing(subsystem: &str, log_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let appender =
                tracing_appender::rolling::never(log_dir, format!("{subsystem}.log"));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            Some((layer, guard))
        }
        Err(e) => {
            eprintln!("[{subsystem}] cannot create log dir {}: {e}", log_dir.display());
            None
        }
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(true);

    match file_layer {
        Some((layer, guard)) => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .with(layer)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .try_init();
            None
        }
    }
}
