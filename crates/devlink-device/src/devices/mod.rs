//! Concrete devices and the enums that dispatch over them.
//!
//! Capability traits use native `async fn`, which is not object-safe, so
//! heterogeneous devices travel as enums: one per capability ([`AnyCamera`],
//! [`AnyPrinter`], [`AnyScanner`], [`AnyGate`]) and [`AnyDevice`] over all
//! of them. Adding a device kind means adding a variant here and a plugin
//! that constructs it.

use std::path::Path;
use std::time::Duration;

use devlink_core::{
    Capability, CameraStartOptions, DeviceInfo, DeviceStatus, ScannedImage, ScannerSettings,
};
use devlink_escpos::{BarcodeType, QrErrorLevel};
use devlink_transport::CancellationToken;
use tokio::sync::watch;

use crate::error::Result;
use crate::traits::{Camera, Device, FrameStream, Gate, PrintJob, Printer, Scanner};

mod escpos_printer;
mod limits;
mod mjpeg_camera;
mod relay_gate;
mod scanner;
mod sdk_camera;
mod spooler_printer;

pub use escpos_printer::EscPosPrinter;
pub use limits::CameraLimits;
pub use mjpeg_camera::MjpegCamera;
pub use relay_gate::{RelayGate, parse_hex};
pub use scanner::BackendScanner;
pub use sdk_camera::SdkCamera;
pub use spooler_printer::SpoolerPrinter;

/// Implement [`Device`] for a dispatch enum by delegating to each variant.
macro_rules! delegate_device {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        impl Device for $name {
            fn device_id(&self) -> &str {
                match self {
                    $(Self::$variant(d) => d.device_id(),)+
                }
            }

            fn capabilities(&self) -> &'static [Capability] {
                match self {
                    $(Self::$variant(d) => d.capabilities(),)+
                }
            }

            fn status(&self) -> DeviceStatus {
                match self {
                    $(Self::$variant(d) => d.status(),)+
                }
            }

            fn subscribe_status(&self) -> watch::Receiver<DeviceStatus> {
                match self {
                    $(Self::$variant(d) => d.subscribe_status(),)+
                }
            }

            fn info(&self) -> DeviceInfo {
                match self {
                    $(Self::$variant(d) => d.info(),)+
                }
            }

            async fn connect(&mut self, cancel: &CancellationToken) -> Result<()> {
                match self {
                    $(Self::$variant(d) => d.connect(cancel).await,)+
                }
            }

            async fn disconnect(&mut self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => d.disconnect().await,)+
                }
            }

            async fn reset(&mut self, cancel: &CancellationToken) -> Result<()> {
                match self {
                    $(Self::$variant(d) => d.reset(cancel).await,)+
                }
            }
        }
    };
}

/// Implement `From<$inner>` for a dispatch enum.
macro_rules! variant_from {
    ($name:ident :: $variant:ident ($inner:ty)) => {
        impl From<$inner> for $name {
            fn from(device: $inner) -> Self {
                Self::$variant(device)
            }
        }
    };
}

/// Any camera.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyCamera {
    /// Motion-JPEG over a byte stream.
    Mjpeg(MjpegCamera),

    /// In-process vendor SDK.
    Sdk(SdkCamera),
}

delegate_device!(AnyCamera { Mjpeg, Sdk });
variant_from!(AnyCamera::Mjpeg(MjpegCamera));
variant_from!(AnyCamera::Sdk(SdkCamera));

impl Camera for AnyCamera {
    async fn start(
        &mut self,
        options: CameraStartOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match self {
            Self::Mjpeg(c) => c.start(options, cancel).await,
            Self::Sdk(c) => c.start(options, cancel).await,
        }
    }

    fn frames<'a>(&'a mut self, cancel: &CancellationToken) -> FrameStream<'a> {
        match self {
            Self::Mjpeg(c) => c.frames(cancel),
            Self::Sdk(c) => c.frames(cancel),
        }
    }

    async fn stop(&mut self, cancel: &CancellationToken) -> Result<()> {
        match self {
            Self::Mjpeg(c) => c.stop(cancel).await,
            Self::Sdk(c) => c.stop(cancel).await,
        }
    }

    fn streaming(&self) -> Option<CameraStartOptions> {
        match self {
            Self::Mjpeg(c) => c.streaming(),
            Self::Sdk(c) => c.streaming(),
        }
    }
}

/// Any printer.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyPrinter {
    /// ESC/POS over a byte transport.
    EscPos(EscPosPrinter),

    /// Host print spooler.
    Spooler(SpoolerPrinter),
}

delegate_device!(AnyPrinter { EscPos, Spooler });
variant_from!(AnyPrinter::EscPos(EscPosPrinter));
variant_from!(AnyPrinter::Spooler(SpoolerPrinter));

impl Printer for AnyPrinter {
    async fn print_text(&mut self, text: &str, cancel: &CancellationToken) -> Result<PrintJob> {
        match self {
            Self::EscPos(p) => p.print_text(text, cancel).await,
            Self::Spooler(p) => p.print_text(text, cancel).await,
        }
    }

    async fn print_file(&mut self, path: &Path, cancel: &CancellationToken) -> Result<PrintJob> {
        match self {
            Self::EscPos(p) => p.print_file(path, cancel).await,
            Self::Spooler(p) => p.print_file(path, cancel).await,
        }
    }

    async fn print_raw(&mut self, bytes: &[u8], cancel: &CancellationToken) -> Result<PrintJob> {
        match self {
            Self::EscPos(p) => p.print_raw(bytes, cancel).await,
            Self::Spooler(p) => p.print_raw(bytes, cancel).await,
        }
    }

    async fn print_barcode(
        &mut self,
        data: &str,
        kind: BarcodeType,
        height: i32,
        width: i32,
        cancel: &CancellationToken,
    ) -> Result<PrintJob> {
        match self {
            Self::EscPos(p) => p.print_barcode(data, kind, height, width, cancel).await,
            Self::Spooler(p) => p.print_barcode(data, kind, height, width, cancel).await,
        }
    }

    async fn print_qr(
        &mut self,
        data: &str,
        size: i32,
        level: QrErrorLevel,
        cancel: &CancellationToken,
    ) -> Result<PrintJob> {
        match self {
            Self::EscPos(p) => p.print_qr(data, size, level, cancel).await,
            Self::Spooler(p) => p.print_qr(data, size, level, cancel).await,
        }
    }

    async fn feed(&mut self, lines: u8, cancel: &CancellationToken) -> Result<()> {
        match self {
            Self::EscPos(p) => p.feed(lines, cancel).await,
            Self::Spooler(p) => p.feed(lines, cancel).await,
        }
    }

    async fn cut(&mut self, cancel: &CancellationToken) -> Result<()> {
        match self {
            Self::EscPos(p) => p.cut(cancel).await,
            Self::Spooler(p) => p.cut(cancel).await,
        }
    }
}

/// Any scanner.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyScanner {
    /// Host scanning stack.
    Backend(BackendScanner),
}

delegate_device!(AnyScanner { Backend });
variant_from!(AnyScanner::Backend(BackendScanner));

impl Scanner for AnyScanner {
    async fn scan(
        &mut self,
        settings: ScannerSettings,
        cancel: &CancellationToken,
    ) -> Result<ScannedImage> {
        match self {
            Self::Backend(s) => s.scan(settings, cancel).await,
        }
    }
}

/// Any gate.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyGate {
    /// Relay board.
    Relay(RelayGate),
}

delegate_device!(AnyGate { Relay });
variant_from!(AnyGate::Relay(RelayGate));

impl Gate for AnyGate {
    async fn open(&mut self, cancel: &CancellationToken) -> Result<()> {
        match self {
            Self::Relay(g) => g.open(cancel).await,
        }
    }

    async fn close(&mut self, cancel: &CancellationToken) -> Result<()> {
        match self {
            Self::Relay(g) => g.close(cancel).await,
        }
    }

    async fn pulse(&mut self, hold: Duration, cancel: &CancellationToken) -> Result<()> {
        match self {
            Self::Relay(g) => g.pulse(hold, cancel).await,
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Relay(g) => g.is_open(),
        }
    }
}

/// Any device, grouped by capability.
#[derive(Debug)]
pub enum AnyDevice {
    /// A camera.
    Camera(AnyCamera),

    /// A printer.
    Printer(AnyPrinter),

    /// A scanner.
    Scanner(AnyScanner),

    /// A gate.
    Gate(AnyGate),
}

delegate_device!(AnyDevice {
    Camera,
    Printer,
    Scanner,
    Gate
});
variant_from!(AnyDevice::Camera(AnyCamera));
variant_from!(AnyDevice::Printer(AnyPrinter));
variant_from!(AnyDevice::Scanner(AnyScanner));
variant_from!(AnyDevice::Gate(AnyGate));

macro_rules! device_from {
    ($group:ident ($inner:ty)) => {
        impl From<$inner> for AnyDevice {
            fn from(device: $inner) -> Self {
                Self::$group(device.into())
            }
        }
    };
}

device_from!(Camera(MjpegCamera));
device_from!(Camera(SdkCamera));
device_from!(Printer(EscPosPrinter));
device_from!(Printer(SpoolerPrinter));
device_from!(Scanner(BackendScanner));
device_from!(Gate(RelayGate));

impl AnyDevice {
    /// Capability group this device belongs to.
    pub fn capability(&self) -> Capability {
        match self {
            Self::Camera(_) => Capability::Camera,
            Self::Printer(_) => Capability::Printer,
            Self::Scanner(_) => Capability::Scanner,
            Self::Gate(_) => Capability::Gate,
        }
    }

    /// The camera, if this is one.
    pub fn as_camera_mut(&mut self) -> Option<&mut AnyCamera> {
        match self {
            Self::Camera(c) => Some(c),
            _ => None,
        }
    }

    /// The printer, if this is one.
    pub fn as_printer_mut(&mut self) -> Option<&mut AnyPrinter> {
        match self {
            Self::Printer(p) => Some(p),
            _ => None,
        }
    }

    /// The scanner, if this is one.
    pub fn as_scanner_mut(&mut self) -> Option<&mut AnyScanner> {
        match self {
            Self::Scanner(s) => Some(s),
            _ => None,
        }
    }

    /// The gate, if this is one.
    pub fn as_gate_mut(&mut self) -> Option<&mut AnyGate> {
        match self {
            Self::Gate(g) => Some(g),
            _ => None,
        }
    }
}

/// A capability a caller can request by type.
///
/// [`DeviceManager::connect`](crate::DeviceManager::connect) uses this to
/// turn the device a plugin built into the handle the caller asked for.
pub trait CapabilityHandle: Device + Sized {
    /// Capability tag the type stands for.
    const CAPABILITY: Capability;

    /// Take the handle out of `device`, or give the device back unchanged.
    fn from_device(device: AnyDevice) -> std::result::Result<Self, AnyDevice>;
}

impl CapabilityHandle for AnyCamera {
    const CAPABILITY: Capability = Capability::Camera;

    fn from_device(device: AnyDevice) -> std::result::Result<Self, AnyDevice> {
        match device {
            AnyDevice::Camera(c) => Ok(c),
            other => Err(other),
        }
    }
}

impl CapabilityHandle for AnyPrinter {
    const CAPABILITY: Capability = Capability::Printer;

    fn from_device(device: AnyDevice) -> std::result::Result<Self, AnyDevice> {
        match device {
            AnyDevice::Printer(p) => Ok(p),
            other => Err(other),
        }
    }
}

impl CapabilityHandle for AnyScanner {
    const CAPABILITY: Capability = Capability::Scanner;

    fn from_device(device: AnyDevice) -> std::result::Result<Self, AnyDevice> {
        match device {
            AnyDevice::Scanner(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl CapabilityHandle for AnyGate {
    const CAPABILITY: Capability = Capability::Gate;

    fn from_device(device: AnyDevice) -> std::result::Result<Self, AnyDevice> {
        match device {
            AnyDevice::Gate(g) => Ok(g),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlink_core::{DeviceProfile, EndpointAddress};
    use devlink_transport::SdkTransport;

    fn sdk_camera() -> AnyDevice {
        SdkCamera::new(
            "cam-1",
            EndpointAddress::sdk(Some("acme"), None).unwrap(),
            SdkTransport::new().into(),
            DeviceProfile::new("Acme", "X", "sdk"),
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_capability_handles() {
        let device = sdk_camera();
        assert_eq!(device.capability(), Capability::Camera);
        assert_eq!(device.capabilities(), &[Capability::Camera]);

        let device = AnyPrinter::from_device(device).unwrap_err();
        let camera = AnyCamera::from_device(device).unwrap();
        assert_eq!(camera.device_id(), "cam-1");
    }

    #[tokio::test]
    async fn test_dispatch_reaches_device() {
        let cancel = CancellationToken::new();
        let mut device = sdk_camera();
        device.connect(&cancel).await.unwrap();

        let camera = device.as_camera_mut().unwrap();
        camera
            .start(CameraStartOptions::new(640, 480, 30), &cancel)
            .await
            .unwrap();
        assert_eq!(camera.streaming(), Some(CameraStartOptions::new(640, 480, 30)));
        camera.stop(&cancel).await.unwrap();

        assert!(device.as_gate_mut().is_none());
        assert!(device.status().is_ready());
    }
}
