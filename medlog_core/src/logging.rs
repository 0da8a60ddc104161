//! Tracing setup for the `medlog` binary.
//!
//! Diagnostics such as skipped registry files or daily-cap decisions are
//! tracing events written to stderr, leaving stdout to command output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the subscriber at WARN, so only skipped records and lines show up
/// unless RUST_LOG asks for more
pub fn init() {
    init_with_level("warn")
}

/// Install the subscriber with `default_level` as the filter
///
/// The CLI passes `debug` for `--verbose` and `error` for `--quiet`. A set
/// RUST_LOG takes precedence over both.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Route events from unit tests through the test harness's captured output
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
