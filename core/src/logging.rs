//! Tracing setup shared by the CLI and the API server.
//!
//! Diagnostics go to stderr so `--json` output on stdout stays clean.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default level used when neither `RUST_LOG` nor `--verbose` is given.
pub const DEFAULT_LEVEL: &str = "warn";

pub fn init() {
    init_with_level(DEFAULT_LEVEL);
}

/// Initialize logging with a specific default level.
///
/// `RUST_LOG` still takes precedence. Calling this more than once is a no-op.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
