//! Error types for transport operations.

use std::time::Duration;

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while opening or using a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No transport is registered for the scheme.
    #[error("Unsupported transport scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// Send or receive issued before `open`.
    #[error("Transport is not open")]
    NotOpen,

    /// `open` issued on a transport that is already open.
    #[error("Transport is already open to {target}")]
    AlreadyOpen { target: String },

    /// The address lacks what this transport needs.
    #[error("Invalid address for {scheme} transport: {reason}")]
    InvalidAddress { scheme: String, reason: String },

    /// The remote end refused or could not be reached.
    #[error("Connection to {target} failed: {source}")]
    ConnectionFailed {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// Connection attempt timed out.
    #[error("Connection timeout after {0}ms")]
    ConnectTimeout(u64),

    /// Read operation timed out.
    #[error("Read timeout after {0}ms")]
    ReadTimeout(u64),

    /// Write operation timed out.
    #[error("Write timeout after {0}ms")]
    WriteTimeout(u64),

    /// The remote end closed the connection.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The caller's cancellation signal fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// Serial port driver error.
    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Low-level I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Create a new unsupported scheme error.
    pub fn unsupported_scheme(scheme: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
        }
    }

    /// Create a new invalid address error.
    pub fn invalid_address(scheme: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            scheme: scheme.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn connect_timeout(timeout: Duration) -> Self {
        Self::ConnectTimeout(timeout.as_millis() as u64)
    }

    pub(crate) fn read_timeout(timeout: Duration) -> Self {
        Self::ReadTimeout(timeout.as_millis() as u64)
    }

    pub(crate) fn write_timeout(timeout: Duration) -> Self {
        Self::WriteTimeout(timeout.as_millis() as u64)
    }

    /// Whether the error came from the caller's cancellation signal.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether the error is one of the timeout variants.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout(_) | Self::ReadTimeout(_) | Self::WriteTimeout(_)
        )
    }
}
