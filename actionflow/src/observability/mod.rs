//! Tracing setup helpers.
//!
//! The engine logs through the `tracing` facade with structured fields
//! (`run_id`, `index`, `context`). These helpers wire up a subscriber for
//! binaries and tests that do not bring their own.

use tracing_subscriber::EnvFilter;

/// Initializes a global `fmt` subscriber honoring `RUST_LOG`, defaulting
/// to `info`. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    init_tracing_with_filter("info");
}

/// Initializes a global `fmt` subscriber with the given default filter,
/// still overridable through `RUST_LOG`.
pub fn init_tracing_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
