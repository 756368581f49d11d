//! Error types for device operations.
//!
//! Every variant that a caller can act on carries the offending identifier
//! (plugin id, device id, backend device name) so failures can be reported
//! without extra context.

use devlink_core::{Capability, DeviceState};
use devlink_transport::TransportError;

/// Result type alias for device operations.
pub type Result<T> = std::result::Result<T, DeviceError>;

/// Errors that can occur while resolving, connecting or operating devices.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The plugin catalog has no plugin with this id.
    #[error("Plugin not found: {plugin_id}")]
    PluginNotFound { plugin_id: String },

    /// The plugin produced a device that lacks the requested capability.
    #[error("Plugin {plugin_id} does not provide a {requested} (offers {offered:?})")]
    CapabilityMismatch {
        plugin_id: String,
        requested: Capability,
        offered: Vec<Capability>,
    },

    /// Operation invoked while the device was not in the state it requires.
    #[error("Device {device_id} is not ready (state: {state})")]
    NotReady {
        device_id: String,
        state: DeviceState,
    },

    /// A lifecycle transition outside the allowed table was requested.
    #[error("Device {device_id} cannot move from {from} to {to}")]
    InvalidTransition {
        device_id: String,
        from: DeviceState,
        to: DeviceState,
    },

    /// The platform backend reports the device as absent.
    #[error("Device unavailable: {name}")]
    DeviceUnavailable { name: String },

    /// The platform backend does not implement the operation.
    #[error("Not implemented by platform backend: {operation}")]
    NotImplemented { operation: String },

    /// The device kind does not support the operation.
    #[error("Device {device_id} does not support {operation}")]
    Unsupported { device_id: String, operation: String },

    /// Capture or scan options were rejected by the device.
    #[error("Invalid options for {device_id}: {reason}")]
    InvalidOptions { device_id: String, reason: String },

    /// The device sent data that does not follow its protocol.
    #[error("Protocol error on {device_id}: {reason}")]
    Protocol { device_id: String, reason: String },

    /// The platform backend failed.
    #[error("Backend error: {message}")]
    Backend { message: String },

    /// No device is registered under this id.
    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    /// A fan-out task panicked or was aborted.
    #[error("Device task failed: {reason}")]
    TaskFailed { reason: String },

    /// The caller's cancellation signal fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// Transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Invalid address, profile or options.
    #[error(transparent)]
    Core(#[from] devlink_core::Error),

    /// Filesystem error while reading or writing device data.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    /// Create a new plugin not found error.
    pub fn plugin_not_found(plugin_id: impl Into<String>) -> Self {
        Self::PluginNotFound {
            plugin_id: plugin_id.into(),
        }
    }

    /// Create a new not ready error.
    pub fn not_ready(device_id: impl Into<String>, state: DeviceState) -> Self {
        Self::NotReady {
            device_id: device_id.into(),
            state,
        }
    }

    /// Create a new device unavailable error.
    pub fn unavailable(name: impl Into<String>) -> Self {
        Self::DeviceUnavailable { name: name.into() }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(device_id: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Unsupported {
            device_id: device_id.into(),
            operation: operation.into(),
        }
    }

    /// Create a new invalid options error.
    pub fn invalid_options(device_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            device_id: device_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a new protocol error.
    pub fn protocol(device_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Protocol {
            device_id: device_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a new device not found error.
    pub fn device_not_found(device_id: impl Into<String>) -> Self {
        Self::DeviceNotFound {
            device_id: device_id.into(),
        }
    }

    /// Whether the error came from a cancellation signal, at any layer.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Transport(e) => e.is_cancelled(),
            _ => false,
        }
    }
}
