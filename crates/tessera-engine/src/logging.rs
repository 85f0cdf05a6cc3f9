//! `tracing` subscriber setup for binaries and demos.

use tracing_subscriber::EnvFilter;

use crate::tick::TickConfig;

/// Install a formatting subscriber filtered by `RUST_LOG`, or by
/// `default_directive` when `RUST_LOG` is unset or invalid.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

/// [`init`] with the directive from `config`.
pub fn init_from_config(config: &TickConfig) -> bool {
    init(&config.log_filter)
}
