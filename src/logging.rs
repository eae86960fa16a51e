//! Diagnostic logging setup.
//!
//! Diagnostics go to stderr through `tracing`; stdout carries only rendered
//! entries so output can be piped.

use std::io::{self, IsTerminal};

use tracing_subscriber::{fmt, EnvFilter};

/// Filter directive for a `-v` count when `RUST_LOG` is unset.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "ddtail=warn",
        1 => "ddtail=info",
        2 => "ddtail=debug",
        _ => "ddtail=trace",
    }
}

/// Install the global subscriber. Safe to call more than once; later calls
/// are ignored.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(verbosity > 1)
        .without_time()
        .try_init();
}
