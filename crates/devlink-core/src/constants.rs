//! Shared constants for addressing, timeouts and device bookkeeping.
//!
//! # Usage
//!
//! ```
//! use devlink_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(SCHEME_TCP, "tcp");
//! let timeout = Duration::from_millis(DEFAULT_IO_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 3);
//! ```

// ============================================================================
// Transport schemes
// ============================================================================

/// Scheme for raw TCP byte-stream transports.
pub const SCHEME_TCP: &str = "tcp";

/// Scheme for devices reached through an in-process vendor library.
pub const SCHEME_SDK: &str = "sdk";

/// Scheme for serial ports.
pub const SCHEME_SERIAL: &str = "serial";

// ============================================================================
// Network defaults
// ============================================================================

/// Raw printing port used by most network receipt printers (JetDirect).
pub const DEFAULT_RAW_PRINT_PORT: u16 = 9100;

/// Default timeout for establishing a connection, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3000;

/// Default timeout for a single send or receive, in milliseconds.
pub const DEFAULT_IO_TIMEOUT_MS: u64 = 3000;

/// Upper bound for flush/shutdown when a transport is closed, in milliseconds.
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 500;

/// Default serial line speed.
pub const DEFAULT_SERIAL_BAUD_RATE: u32 = 9600;

// ============================================================================
// Device bookkeeping
// ============================================================================

/// Number of status transitions each device keeps for diagnostics.
pub const STATUS_HISTORY_SIZE: usize = 32;

/// Image format reported for JPEG camera frames.
pub const FRAME_FORMAT_JPEG: &str = "jpeg";
