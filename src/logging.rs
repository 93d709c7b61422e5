//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize logging for the process, honouring `RUST_LOG` (default `info`).
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter);
}

/// Initialize logging with an explicit filter directive, e.g. from
/// [`SchedulerConfig::log_filter`](crate::config::SchedulerConfig::log_filter).
pub fn init_with(directive: &str) {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));
    install(filter);
}

fn install(filter: EnvFilter) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
