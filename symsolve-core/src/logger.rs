//! `tracing-subscriber` setup for binaries and examples.
//!
//! The library itself only emits events through [`TracingJournal`](crate::TracingJournal);
//! installing a subscriber is left to the application.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber at INFO level (overridable via `RUST_LOG`).
///
/// ```no_run
/// symsolve_core::init_logger();
/// tracing::info!("ready");
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Install a fmt subscriber with a custom default level.
///
/// Use `RUST_LOG=symsolve::linear_algebra=debug` to see singular and
/// wrong-inertia diagnostics. Calling this twice is harmless; the second
/// installation is ignored.
pub fn init_logger_with_level(default_level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .try_init();
}
