//! Diagnostic logging setup.
//!
//! User-facing output goes through [`crate::output::OutputFormatter`]; this
//! subscriber carries the `tracing` events emitted by the engine to stderr.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Environment variable holding an explicit filter directive, e.g. `datetidy=debug`.
pub const LOG_ENV: &str = "DATETIDY_LOG";

/// Maps the `-v` count to a default level.
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global subscriber.
///
/// `DATETIDY_LOG` wins over the verbosity flag when set. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter)
        .try_init();
}
