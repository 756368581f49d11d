//! # devlink-device
//!
//! Device lifecycle, capability traits, concrete devices and the manager
//! that resolves plugins into capability-typed handles.
//!
//! # Components
//!
//! - **Lifecycle**: state machine every device embeds ([`lifecycle`])
//! - **Capability traits**: [`Camera`], [`Printer`], [`Scanner`], [`Gate`]
//! - **Devices**: ESC/POS and spooler printers, backend scanner, MJPEG and
//!   SDK cameras, relay gate, plus `Any*` enum dispatch ([`devices`])
//! - **Plugins**: [`DevicePlugin`] and [`PluginCatalog`]
//! - **Manager**: [`DeviceManager`] with its device registry
//! - **Capture**: [`capture_snapshot`] and [`record_frames`]
//!
//! # Example
//!
//! ```no_run
//! use devlink_core::{CameraStartOptions, DeviceProfile, EndpointAddress};
//! use devlink_device::{
//!     AnyCamera, CancellationToken, Device, DeviceManager, SdkCameraPlugin, StaticPluginCatalog,
//!     capture_snapshot,
//! };
//!
//! # async fn example() -> devlink_device::Result<()> {
//! let manager = DeviceManager::new(
//!     StaticPluginCatalog::builtin()
//!         .with(SdkCameraPlugin::new("AcmeX", DeviceProfile::new("Acme", "X", "sdk"))),
//! );
//! let cancel = CancellationToken::new();
//!
//! let address: EndpointAddress = "sdk://acme/cam0".parse()?;
//! let mut camera: AnyCamera = manager.connect(&address, "AcmeX", &cancel).await?;
//! camera.connect(&cancel).await?;
//!
//! let frame = capture_snapshot(&mut camera, CameraStartOptions::new(1280, 720, 30), &cancel).await?;
//! println!("{} byte {} frame", frame.len(), frame.format);
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod capture;
pub mod devices;
mod error;
pub mod lifecycle;
mod manager;
pub mod plugin;
mod registry;
pub mod traits;

pub use backend::{BackendError, PrinterBackend, ScannerBackend, UnsupportedPlatform};
pub use capture::{RecordOptions, RecordSummary, capture_snapshot, record_frames};
pub use devices::{
    AnyCamera, AnyDevice, AnyGate, AnyPrinter, AnyScanner, BackendScanner, CameraLimits,
    CapabilityHandle, EscPosPrinter, MjpegCamera, RelayGate, SdkCamera, SpoolerPrinter,
};
pub use error::{DeviceError, Result};
pub use lifecycle::{DeviceCore, DeviceHooks, Lifecycle, OperationGuard, StatusTransition};
pub use manager::{DEFAULT_FAN_OUT_LIMIT, DeviceManager, FanOutReport, ManagerConfig};
pub use plugin::{
    DevicePlugin, EscPosPlugin, MjpegCameraPlugin, PluginCatalog, RelayGatePlugin, ScannerPlugin,
    SdkCameraPlugin, SpoolerPlugin, StaticPluginCatalog,
};
pub use registry::DeviceHandle;
pub use traits::{Camera, Device, FrameStream, Gate, PrintJob, Printer, Scanner, describe};

/// Cancellation signal accepted by every suspension point.
pub use devlink_transport::CancellationToken;
