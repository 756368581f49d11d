//! Capability trait definitions.
//!
//! These traits are the operation contracts callers request by type. Every
//! device implements [`Device`] plus exactly the capability traits listed by
//! [`Device::capabilities`].
//!
//! All traits use native `async fn` methods (Edition 2024), so they are
//! dispatched through the enums in [`devices`](crate::devices) rather than
//! through trait objects.

#![allow(async_fn_in_trait)]

use std::path::Path;
use std::time::Duration;

use devlink_core::{
    Capability, CameraFrame, CameraStartOptions, DeviceInfo, DeviceProfile, DeviceStatus,
    ScannedImage, ScannerSettings,
};
use devlink_escpos::{BarcodeType, QrErrorLevel};
use devlink_transport::CancellationToken;
use futures::stream::BoxStream;
use tokio::sync::watch;

use crate::error::Result;

/// Lazy sequence of frames borrowed from a streaming camera.
pub type FrameStream<'a> = BoxStream<'a, Result<CameraFrame>>;

/// Behaviour shared by every device.
pub trait Device: Send {
    /// Unique id of this device instance.
    fn device_id(&self) -> &str;

    /// Capabilities this device implements.
    fn capabilities(&self) -> &'static [Capability];

    /// Snapshot of the current status.
    fn status(&self) -> DeviceStatus;

    /// Receiver that observes every future status change.
    fn subscribe_status(&self) -> watch::Receiver<DeviceStatus>;

    /// Descriptive snapshot, built on demand from the device profile.
    fn info(&self) -> DeviceInfo;

    /// Open the transport and initialise the device.
    ///
    /// # Errors
    ///
    /// Returns the transport or initialisation error; the device is
    /// `Disconnected` afterwards.
    async fn connect(&mut self, cancel: &CancellationToken) -> Result<()>;

    /// Close the transport. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if closing failed; the device is `Disconnected`
    /// regardless.
    async fn disconnect(&mut self) -> Result<()>;

    /// Clear `Error` back to `Ready` if the device-specific check passes.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` outside `Error`/`Ready`, or the reset failure.
    async fn reset(&mut self, cancel: &CancellationToken) -> Result<()>;
}

/// Frame-producing camera.
///
/// # Example
///
/// ```no_run
/// use devlink_core::CameraStartOptions;
/// use devlink_device::{Camera, CancellationToken};
/// use futures::StreamExt;
///
/// # async fn example(camera: &mut impl Camera) -> devlink_device::Result<()> {
/// let cancel = CancellationToken::new();
/// camera.connect(&cancel).await?;
/// camera.start(CameraStartOptions::new(1280, 720, 30), &cancel).await?;
///
/// let mut frames = camera.frames(&cancel);
/// if let Some(frame) = frames.next().await {
///     println!("{} bytes", frame?.len());
/// }
/// drop(frames);
///
/// camera.stop(&cancel).await?;
/// # Ok(())
/// # }
/// ```
pub trait Camera: Device {
    /// Validate `options` and enter the streaming session (`Busy`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidOptions` if the device does not accept the geometry or
    /// rate, or `NotReady` outside `Ready`.
    async fn start(&mut self, options: CameraStartOptions, cancel: &CancellationToken)
    -> Result<()>;

    /// Lazy, potentially infinite frame sequence.
    ///
    /// Nothing is captured until the stream is polled. The stream ends once
    /// `cancel` fires; it never closes the transport. Outside a streaming
    /// session the stream yields a single `NotReady` error.
    fn frames<'a>(&'a mut self, cancel: &CancellationToken) -> FrameStream<'a>;

    /// Leave the streaming session and return to `Ready`.
    ///
    /// # Errors
    ///
    /// Returns an error if the device-specific stop command failed; the
    /// session is over either way.
    async fn stop(&mut self, cancel: &CancellationToken) -> Result<()>;

    /// Options of the active streaming session, if any.
    fn streaming(&self) -> Option<CameraStartOptions>;
}

/// Outcome of a print operation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrintJob {
    /// Job id assigned by a spooler, if any.
    pub job_id: Option<String>,

    /// Bytes handed to the printer or spooler.
    pub bytes: usize,
}

/// Receipt or document printer.
pub trait Printer: Device {
    /// Print text followed by the profile's feed and cut.
    async fn print_text(&mut self, text: &str, cancel: &CancellationToken) -> Result<PrintJob>;

    /// Send a file to the printer.
    async fn print_file(&mut self, path: &Path, cancel: &CancellationToken) -> Result<PrintJob>;

    /// Send bytes verbatim.
    async fn print_raw(&mut self, bytes: &[u8], cancel: &CancellationToken) -> Result<PrintJob>;

    /// Print a one-dimensional barcode.
    async fn print_barcode(
        &mut self,
        data: &str,
        kind: BarcodeType,
        height: i32,
        width: i32,
        cancel: &CancellationToken,
    ) -> Result<PrintJob>;

    /// Print a QR code.
    async fn print_qr(
        &mut self,
        data: &str,
        size: i32,
        level: QrErrorLevel,
        cancel: &CancellationToken,
    ) -> Result<PrintJob>;

    /// Feed `lines` lines.
    async fn feed(&mut self, lines: u8, cancel: &CancellationToken) -> Result<()>;

    /// Cut the paper, partial or full per the profile.
    async fn cut(&mut self, cancel: &CancellationToken) -> Result<()>;
}

/// Document scanner.
pub trait Scanner: Device {
    /// Scan one page.
    async fn scan(
        &mut self,
        settings: ScannerSettings,
        cancel: &CancellationToken,
    ) -> Result<ScannedImage>;
}

/// Barrier, turnstile or door actuator.
pub trait Gate: Device {
    /// Release the barrier.
    async fn open(&mut self, cancel: &CancellationToken) -> Result<()>;

    /// Lock the barrier.
    async fn close(&mut self, cancel: &CancellationToken) -> Result<()>;

    /// Open, hold for `hold`, then close.
    async fn pulse(&mut self, hold: Duration, cancel: &CancellationToken) -> Result<()>;

    /// Last commanded position, `true` when open.
    fn is_open(&self) -> bool;
}

/// Build a [`DeviceInfo`] from a profile.
///
/// The display name comes from the `name` option, falling back to
/// manufacturer and model; `serial_number` is read from options as well.
pub fn describe(device_id: &str, capability: Capability, profile: &DeviceProfile) -> DeviceInfo {
    let name = profile
        .option("name")
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} {}", profile.manufacturer, profile.model).trim().to_string());

    let mut info = DeviceInfo::new(device_id, name, capability)
        .with_model(&profile.manufacturer, &profile.model);
    if !profile.version.is_empty() {
        info = info.with_firmware_version(&profile.version);
    }
    if let Some(serial) = profile.option("serial_number") {
        info = info.with_serial_number(serial);
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_from_profile() {
        let profile = DeviceProfile::new("Acme", "X", "sdk")
            .with_version("2.1")
            .with_option("serial_number", "SN-9");
        let info = describe("cam-1", Capability::Camera, &profile);

        assert_eq!(info.device_id, "cam-1");
        assert_eq!(info.device_name, "Acme X");
        assert_eq!(info.device_type, Capability::Camera);
        assert_eq!(info.firmware_version.as_deref(), Some("2.1"));
        assert_eq!(info.serial_number.as_deref(), Some("SN-9"));
    }

    #[test]
    fn test_describe_prefers_name_option() {
        let profile = DeviceProfile::new("Acme", "X", "sdk").with_option("name", "Lobby cam");
        let info = describe("cam-1", Capability::Camera, &profile);
        assert_eq!(info.device_name, "Lobby cam");
        assert_eq!(info.firmware_version, None);
    }
}
