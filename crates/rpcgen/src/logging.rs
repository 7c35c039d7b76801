//! Tracing subscriber setup.
//!
//! Logs go to stderr in a compact, timestamp-free format. `RPCGEN_LOG`
//! takes an `EnvFilter` directive and wins over `--log-level`; `--quiet`
//! wins over both.

use std::io::IsTerminal;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive.
pub const LOG_ENV: &str = "RPCGEN_LOG";

/// Accepted `--log-level` values.
pub const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(&self, _w: &mut Writer<'_>) -> std::fmt::Result {
        Ok(())
    }
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init(level: &str, quiet: bool, color: bool) {
    let filter = if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level))
    };
    let use_ansi =
        color && std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_timer(NoTimestamp)
        .with_ansi(use_ansi)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
