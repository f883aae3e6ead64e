//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Logs go to stderr so stdout stays clean for JSON output. `RUST_LOG`
//! overrides the level chosen on the command line.

use std::io;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
pub fn init_logging(level: LevelFilter) {
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(level))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Build an `EnvFilter` from the given level, respecting `RUST_LOG`.
fn build_env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.to_string().to_lowercase();
        // Dependencies stay at warn to keep transport noise out.
        EnvFilter::new(format!("warn,fmr_core={level},fmr={level}"))
    })
}
