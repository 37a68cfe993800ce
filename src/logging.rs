//! Diagnostic logging setup.

use std::env;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable holding the log filter, e.g. `mediatidy=debug`.
pub const LOG_ENV: &str = "MEDIATIDY_LOG";

/// Installs a stderr subscriber filtered by `MEDIATIDY_LOG`.
///
/// Defaults to `warn`, or `info` when `verbose` is set. Calling it again is a
/// no-op.
pub fn init_logger(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    let filter = env::var(LOG_ENV).unwrap_or_else(|_| default_filter.to_string());
    let filter_layer = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(filter_layer)
        .try_init();
}
