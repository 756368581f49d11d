//! Tracing setup for binaries and tests embedding devlink.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the application, which can use [`init_tracing`] for the common case.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::error::{Error, Result};

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"info"` or `"devlink_device=debug"`).
///
/// # Errors
///
/// Returns [`Error::Logging`] if a global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_error() {
        // The first call may race with other tests; the second always fails.
        let _ = init_tracing("debug");
        assert!(matches!(init_tracing("debug"), Err(Error::Logging(_))));
    }
}
