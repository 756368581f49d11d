//! Common value types shared by transports, devices and callers.
//!
//! This module defines the capability tags, device status, device information
//! snapshots and the data objects exchanged with cameras and scanners.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::FRAME_FORMAT_JPEG;
use crate::error::{Error, Result};

/// Operation contract a device exposes to callers.
///
/// Every device carries the list of capabilities it satisfies; connection
/// resolution compares the requested tag against that list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Frame-producing camera.
    Camera,

    /// Receipt or document printer.
    Printer,

    /// Document scanner.
    Scanner,

    /// Barrier, turnstile or door actuator.
    Gate,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera => write!(f, "camera"),
            Self::Printer => write!(f, "printer"),
            Self::Scanner => write!(f, "scanner"),
            Self::Gate => write!(f, "gate"),
        }
    }
}

/// Lifecycle state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    /// No transport open. Initial state.
    Disconnected,

    /// Transport opening and device initialising.
    Connecting,

    /// Idle and operable.
    Ready,

    /// An operation (or a capture session) is in progress.
    Busy,

    /// Failed; stays here until reset or disconnect.
    Error,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Ready => "Ready",
            Self::Busy => "Busy",
            Self::Error => "Error",
        };
        write!(f, "{}", name)
    }
}

/// Device state plus the human-readable reason for entering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Current lifecycle state.
    pub state: DeviceState,

    /// Explanation recorded with the transition.
    pub message: String,

    /// When the state was entered.
    pub changed_at: DateTime<Utc>,
}

impl DeviceStatus {
    /// Create a status stamped with the current time.
    pub fn new(state: DeviceState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
            changed_at: Utc::now(),
        }
    }

    /// Initial status of every device.
    pub fn disconnected() -> Self {
        Self::new(DeviceState::Disconnected, "not connected")
    }

    /// Whether the device accepts new operations.
    pub fn is_ready(&self) -> bool {
        self.state == DeviceState::Ready
    }
}

/// Read-only snapshot describing a device.
///
/// Produced on demand from the device profile; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Unique device identifier.
    pub device_id: String,

    /// Display name.
    pub device_name: String,

    /// Primary capability of the device.
    pub device_type: Capability,

    /// Manufacturer name.
    pub manufacturer: String,

    /// Model name.
    pub model: String,

    /// Firmware version, if known.
    pub firmware_version: Option<String>,

    /// Serial number, if known.
    pub serial_number: Option<String>,
}

impl DeviceInfo {
    /// Create a DeviceInfo with the required fields.
    pub fn new(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        device_type: Capability,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            device_type,
            manufacturer: String::new(),
            model: String::new(),
            firmware_version: None,
            serial_number: None,
        }
    }

    /// Set manufacturer and model.
    pub fn with_model(mut self, manufacturer: impl Into<String>, model: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self.model = model.into();
        self
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, firmware_version: impl Into<String>) -> Self {
        self.firmware_version = Some(firmware_version.into());
        self
    }

    /// Set the serial number.
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }
}

/// A single captured camera frame.
///
/// Frames are immutable once produced; the consumer owns them after they
/// are yielded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFrame {
    /// Capture time.
    pub timestamp: DateTime<Utc>,

    /// Encoded image bytes.
    pub data: Bytes,

    /// Image format, e.g. `"jpeg"`.
    pub format: String,
}

impl CameraFrame {
    /// Create a frame stamped with the current time.
    pub fn new(data: Bytes, format: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            data,
            format: format.into(),
        }
    }

    /// Create a JPEG frame stamped with the current time.
    pub fn jpeg(data: Bytes) -> Self {
        Self::new(data, FRAME_FORMAT_JPEG)
    }

    /// Size of the encoded image in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame carries no image bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension matching the frame format.
    pub fn file_extension(&self) -> &str {
        match self.format.as_str() {
            FRAME_FORMAT_JPEG => "jpg",
            other => other,
        }
    }
}

/// Requested capture geometry and rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraStartOptions {
    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Frames per second.
    pub fps: u32,
}

impl CameraStartOptions {
    /// Create capture options.
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }

    /// Check that every field is a positive integer.
    ///
    /// Device-specific limits are enforced by the device itself.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOptions`] if any field is zero.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid_options(format!(
                "resolution must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(Error::invalid_options("fps must be positive"));
        }
        Ok(())
    }
}

impl Default for CameraStartOptions {
    fn default() -> Self {
        Self::new(1280, 720, 30)
    }
}

/// Scanner colour mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Full colour.
    Color,

    /// 8-bit grayscale.
    Grayscale,

    /// 1-bit black and white.
    BlackWhite,
}

/// Settings for a single scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerSettings {
    /// Resolution in dots per inch.
    pub resolution_dpi: u32,

    /// Colour mode.
    pub color_mode: ColorMode,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            resolution_dpi: 300,
            color_mode: ColorMode::Color,
        }
    }
}

/// Image produced by a scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedImage {
    /// Encoded image bytes.
    pub data: Bytes,

    /// Settings the image was scanned with.
    pub settings: ScannerSettings,
}
