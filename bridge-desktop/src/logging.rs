//! Logging initialization for desktop hosts
//!
//! The core crates emit `tracing` events and spans; the host decides how
//! they are rendered. This module wires a `tracing-subscriber` with an
//! environment-driven filter (`RUST_LOG`).

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging with `RUST_LOG` filtering, defaulting to `info`.
///
/// Safe to call once per process; subsequent calls are ignored.
pub fn init() {
    init_with_default_filter("info");
}

/// Initialize logging with an explicit default filter string, still
/// overridable through `RUST_LOG`.
pub fn init_with_default_filter(default: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
