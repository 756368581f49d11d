//! Transport configuration.

use std::time::Duration;

use devlink_core::constants::{
    DEFAULT_CLOSE_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_IO_TIMEOUT_MS,
    DEFAULT_SERIAL_BAUD_RATE,
};
use serde::{Deserialize, Serialize};

/// Timeouts and line settings applied to every transport a factory creates.
///
/// # Example
///
/// ```
/// use devlink_transport::TransportConfig;
/// use std::time::Duration;
///
/// let config = TransportConfig {
///     io_timeout: Duration::from_millis(5000),
///     ..TransportConfig::default()
/// };
/// assert_eq!(config.connect_timeout.as_millis(), 3000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,

    /// Timeout for a single send or receive.
    pub io_timeout: Duration,

    /// Upper bound for flush and shutdown when closing.
    pub close_timeout: Duration,

    /// Line speed for serial transports.
    pub serial_baud_rate: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            io_timeout: Duration::from_millis(DEFAULT_IO_TIMEOUT_MS),
            close_timeout: Duration::from_millis(DEFAULT_CLOSE_TIMEOUT_MS),
            serial_baud_rate: DEFAULT_SERIAL_BAUD_RATE,
        }
    }
}
