//! Document scanner reached through the host's scanning stack.

use std::sync::Arc;

use devlink_core::{
    Capability, DeviceInfo, DeviceProfile, DeviceStatus, EndpointAddress, ScannedImage,
    ScannerSettings,
};
use devlink_transport::{AnyTransport, CancellationToken};
use tokio::sync::watch;
use tracing::info;

use crate::backend::{ScannerBackend, run_backend};
use crate::error::{DeviceError, Result};
use crate::lifecycle::{DeviceCore, DeviceHooks};
use crate::traits::{Device, Scanner, describe};

const CAPABILITIES: &[Capability] = &[Capability::Scanner];

/// Resolution ceiling when the profile sets no `max_dpi`.
const DEFAULT_MAX_DPI: u32 = 1200;

#[derive(Debug)]
struct ScannerHooks {
    profile: DeviceProfile,
    scanner_name: String,
    max_dpi: u32,
    backend: Arc<dyn ScannerBackend>,
}

impl ScannerHooks {
    async fn check_available(&self, cancel: &CancellationToken) -> Result<()> {
        let name = self.scanner_name.clone();
        let available = run_backend(&self.backend, cancel, move |b| b.is_available(&name)).await?;
        if available {
            Ok(())
        } else {
            Err(DeviceError::unavailable(&self.scanner_name))
        }
    }
}

impl DeviceHooks for ScannerHooks {
    async fn on_initialize(
        &mut self,
        _transport: &mut AnyTransport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.check_available(cancel).await
    }

    async fn on_reset(
        &mut self,
        _transport: &mut AnyTransport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.check_available(cancel).await
    }
}

/// Scanner driven through a [`ScannerBackend`].
///
/// The scanner name comes from the profile option `scanner_name`, falling
/// back to the address path. `max_dpi` caps the accepted resolution.
#[derive(Debug)]
pub struct BackendScanner {
    core: DeviceCore<ScannerHooks>,
}

impl BackendScanner {
    /// Create a disconnected scanner.
    ///
    /// # Errors
    ///
    /// Returns an invalid profile error if no scanner name can be derived or
    /// `max_dpi` does not parse.
    pub fn new(
        device_id: impl Into<String>,
        address: EndpointAddress,
        transport: AnyTransport,
        profile: DeviceProfile,
        backend: Arc<dyn ScannerBackend>,
    ) -> Result<Self> {
        let scanner_name = profile
            .option("scanner_name")
            .or_else(|| address.path())
            .map(|name| name.trim_start_matches('/').to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| devlink_core::Error::invalid_profile("scanner_name is required"))?;
        let max_dpi = profile.option_parsed("max_dpi")?.unwrap_or(DEFAULT_MAX_DPI);

        let hooks = ScannerHooks {
            profile,
            scanner_name,
            max_dpi,
            backend,
        };
        Ok(Self {
            core: DeviceCore::new(device_id, address, transport, hooks),
        })
    }

    /// Backend name of this scanner.
    pub fn scanner_name(&self) -> &str {
        &self.core.hooks().scanner_name
    }
}

impl Device for BackendScanner {
    fn device_id(&self) -> &str {
        self.core.device_id()
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    fn status(&self) -> DeviceStatus {
        self.core.status()
    }

    fn subscribe_status(&self) -> watch::Receiver<DeviceStatus> {
        self.core.subscribe_status()
    }

    fn info(&self) -> DeviceInfo {
        describe(
            self.core.device_id(),
            Capability::Scanner,
            &self.core.hooks().profile,
        )
    }

    async fn connect(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.core.connect(cancel).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.core.disconnect().await
    }

    async fn reset(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.core.reset(cancel).await
    }
}

impl Scanner for BackendScanner {
    async fn scan(
        &mut self,
        settings: ScannerSettings,
        cancel: &CancellationToken,
    ) -> Result<ScannedImage> {
        let max_dpi = self.core.hooks().max_dpi;
        if settings.resolution_dpi == 0 || settings.resolution_dpi > max_dpi {
            return Err(DeviceError::invalid_options(
                self.core.device_id(),
                format!(
                    "resolution {} dpi outside 1..={} dpi",
                    settings.resolution_dpi, max_dpi
                ),
            ));
        }

        let op = self.core.begin("scan")?;
        let backend = Arc::clone(&op.hooks().backend);
        let name = op.hooks().scanner_name.clone();

        let scanned = run_backend(&backend, cancel, move |b| b.scan(&name, &settings)).await;
        let image = op.finish(scanned)?;

        info!(
            device_id = %self.core.device_id(),
            dpi = settings.resolution_dpi,
            bytes = image.data.len(),
            "Page scanned"
        );
        Ok(image)
    }
}
