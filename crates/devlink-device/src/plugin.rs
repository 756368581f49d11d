//! Device plugins and the catalog that resolves them.
//!
//! A plugin knows how to build one device kind from an address and a
//! transport. The [`DeviceManager`](crate::DeviceManager) only ever sees
//! plugins through a [`PluginCatalog`]; how plugins get into the catalog
//! (static registration here, directory scanning elsewhere) is the
//! composition root's business.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use devlink_core::{Capability, DeviceProfile, EndpointAddress, PrinterProfile};
use devlink_transport::AnyTransport;
use tracing::debug;

use crate::backend::{PrinterBackend, ScannerBackend, UnsupportedPlatform};
use crate::devices::{
    AnyDevice, BackendScanner, EscPosPrinter, MjpegCamera, RelayGate, SdkCamera, SpoolerPrinter,
};
use crate::error::{DeviceError, Result};

/// Builds devices of one kind.
pub trait DevicePlugin: Send + Sync + fmt::Debug {
    /// Identifier the plugin is resolved by.
    fn id(&self) -> &str;

    /// Capabilities of the devices this plugin builds.
    fn capabilities(&self) -> &'static [Capability];

    /// Build a disconnected device bound to `transport`.
    ///
    /// Nothing is opened here; the device opens its transport on connect.
    fn create_device(
        &self,
        device_id: &str,
        address: &EndpointAddress,
        transport: AnyTransport,
    ) -> Result<AnyDevice>;
}

/// Resolves plugin ids to plugins.
pub trait PluginCatalog: Send + Sync {
    /// Look up a plugin.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::PluginNotFound`] if no plugin has this id.
    fn resolve(&self, plugin_id: &str) -> Result<Arc<dyn DevicePlugin>>;

    /// Ids of every plugin the catalog can resolve.
    fn plugin_ids(&self) -> Vec<String>;
}

/// Catalog populated at composition time.
///
/// # Example
///
/// ```
/// use devlink_core::DeviceProfile;
/// use devlink_device::{PluginCatalog, SdkCameraPlugin, StaticPluginCatalog};
///
/// let catalog = StaticPluginCatalog::builtin()
///     .with(SdkCameraPlugin::new("AcmeX", DeviceProfile::new("Acme", "X", "sdk")));
///
/// assert!(catalog.resolve("AcmeX").is_ok());
/// assert!(catalog.resolve("nope").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticPluginCatalog {
    plugins: HashMap<String, Arc<dyn DevicePlugin>>,
}

impl StaticPluginCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with one generic plugin per built-in device kind:
    /// `escpos`, `spooler`, `scanner`, `mjpeg`, `sdk-camera` and
    /// `relay-gate`.
    ///
    /// The spooler and scanner plugins use [`UnsupportedPlatform`]; register
    /// replacements carrying a real backend under the same ids.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog
            .register(EscPosPlugin::new("escpos", PrinterProfile::generic_escpos()))
            .register(SpoolerPlugin::new(
                "spooler",
                DeviceProfile::new("Generic", "Spooler", "spooler"),
                Arc::new(UnsupportedPlatform),
            ))
            .register(ScannerPlugin::new(
                "scanner",
                DeviceProfile::new("Generic", "Scanner", "scanner"),
                Arc::new(UnsupportedPlatform),
            ))
            .register(MjpegCameraPlugin::new(
                "mjpeg",
                DeviceProfile::new("Generic", "MJPEG camera", "mjpeg"),
            ))
            .register(SdkCameraPlugin::new(
                "sdk-camera",
                DeviceProfile::new("Generic", "SDK camera", "sdk"),
            ))
            .register(RelayGatePlugin::new(
                "relay-gate",
                DeviceProfile::new("Generic", "Relay gate", "relay"),
            ));
        catalog
    }

    /// Register `plugin`, replacing any plugin with the same id.
    pub fn register(&mut self, plugin: impl DevicePlugin + 'static) -> &mut Self {
        let id = plugin.id().to_string();
        debug!(plugin_id = %id, capabilities = ?plugin.capabilities(), "Registering plugin");
        self.plugins.insert(id, Arc::new(plugin));
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, plugin: impl DevicePlugin + 'static) -> Self {
        self.register(plugin);
        self
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugin is registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl PluginCatalog for StaticPluginCatalog {
    fn resolve(&self, plugin_id: &str) -> Result<Arc<dyn DevicePlugin>> {
        self.plugins
            .get(plugin_id)
            .cloned()
            .ok_or_else(|| DeviceError::plugin_not_found(plugin_id))
    }

    fn plugin_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.plugins.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

/// Plugin for [`EscPosPrinter`].
#[derive(Debug, Clone)]
pub struct EscPosPlugin {
    id: String,
    profile: PrinterProfile,
}

impl EscPosPlugin {
    /// Create a plugin building printers with `profile`.
    pub fn new(id: impl Into<String>, profile: PrinterProfile) -> Self {
        Self {
            id: id.into(),
            profile,
        }
    }
}

impl DevicePlugin for EscPosPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Printer]
    }

    fn create_device(
        &self,
        device_id: &str,
        address: &EndpointAddress,
        transport: AnyTransport,
    ) -> Result<AnyDevice> {
        EscPosPrinter::new(device_id, address.clone(), transport, self.profile.clone())
            .map(Into::into)
    }
}

/// Plugin for [`SpoolerPrinter`].
#[derive(Debug, Clone)]
pub struct SpoolerPlugin {
    id: String,
    profile: DeviceProfile,
    backend: Arc<dyn PrinterBackend>,
}

impl SpoolerPlugin {
    /// Create a plugin whose printers submit through `backend`.
    pub fn new(
        id: impl Into<String>,
        profile: DeviceProfile,
        backend: Arc<dyn PrinterBackend>,
    ) -> Self {
        Self {
            id: id.into(),
            profile,
            backend,
        }
    }
}

impl DevicePlugin for SpoolerPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Printer]
    }

    fn create_device(
        &self,
        device_id: &str,
        address: &EndpointAddress,
        transport: AnyTransport,
    ) -> Result<AnyDevice> {
        SpoolerPrinter::new(
            device_id,
            address.clone(),
            transport,
            self.profile.clone(),
            Arc::clone(&self.backend),
        )
        .map(Into::into)
    }
}

/// Plugin for [`BackendScanner`].
#[derive(Debug, Clone)]
pub struct ScannerPlugin {
    id: String,
    profile: DeviceProfile,
    backend: Arc<dyn ScannerBackend>,
}

impl ScannerPlugin {
    /// Create a plugin whose scanners use `backend`.
    pub fn new(
        id: impl Into<String>,
        profile: DeviceProfile,
        backend: Arc<dyn ScannerBackend>,
    ) -> Self {
        Self {
            id: id.into(),
            profile,
            backend,
        }
    }
}

impl DevicePlugin for ScannerPlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Scanner]
    }

    fn create_device(
        &self,
        device_id: &str,
        address: &EndpointAddress,
        transport: AnyTransport,
    ) -> Result<AnyDevice> {
        BackendScanner::new(
            device_id,
            address.clone(),
            transport,
            self.profile.clone(),
            Arc::clone(&self.backend),
        )
        .map(Into::into)
    }
}

/// Plugins that need nothing but an id and a [`DeviceProfile`].
macro_rules! profile_plugin {
    ($(#[$doc:meta])* $plugin:ident => $device:ident, $capability:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $plugin {
            id: String,
            profile: DeviceProfile,
        }

        impl $plugin {
            /// Create a plugin building devices with `profile`.
            pub fn new(id: impl Into<String>, profile: DeviceProfile) -> Self {
                Self {
                    id: id.into(),
                    profile,
                }
            }
        }

        impl DevicePlugin for $plugin {
            fn id(&self) -> &str {
                &self.id
            }

            fn capabilities(&self) -> &'static [Capability] {
                &[$capability]
            }

            fn create_device(
                &self,
                device_id: &str,
                address: &EndpointAddress,
                transport: AnyTransport,
            ) -> Result<AnyDevice> {
                $device::new(device_id, address.clone(), transport, self.profile.clone())
                    .map(Into::into)
            }
        }
    };
}

profile_plugin!(
    /// Plugin for [`MjpegCamera`].
    MjpegCameraPlugin => MjpegCamera, Capability::Camera
);
profile_plugin!(
    /// Plugin for [`SdkCamera`].
    SdkCameraPlugin => SdkCamera, Capability::Camera
);
profile_plugin!(
    /// Plugin for [`RelayGate`].
    RelayGatePlugin => RelayGate, Capability::Gate
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Device;
    use devlink_transport::SdkTransport;

    #[test]
    fn test_builtin_ids() {
        let catalog = StaticPluginCatalog::builtin();
        assert_eq!(
            catalog.plugin_ids(),
            vec![
                "escpos",
                "mjpeg",
                "relay-gate",
                "scanner",
                "sdk-camera",
                "spooler"
            ]
        );
    }

    #[test]
    fn test_resolve_missing() {
        let catalog = StaticPluginCatalog::new();
        assert!(catalog.is_empty());
        assert!(matches!(
            catalog.resolve("AcmeX"),
            Err(DeviceError::PluginNotFound { plugin_id }) if plugin_id == "AcmeX"
        ));
    }

    #[test]
    fn test_register_replaces_same_id() {
        let catalog = StaticPluginCatalog::new()
            .with(SdkCameraPlugin::new("cam", DeviceProfile::default()))
            .with(RelayGatePlugin::new("cam", DeviceProfile::default()));

        assert_eq!(catalog.len(), 1);
        let plugin = catalog.resolve("cam").unwrap();
        assert_eq!(plugin.capabilities(), &[Capability::Gate]);
    }

    #[test]
    fn test_plugin_builds_disconnected_device() {
        let plugin = SdkCameraPlugin::new("AcmeX", DeviceProfile::new("Acme", "X", "sdk"));
        let address = EndpointAddress::sdk(Some("acme"), None).unwrap();
        let device = plugin
            .create_device("cam-1", &address, SdkTransport::new().into())
            .unwrap();

        assert_eq!(device.capability(), Capability::Camera);
        assert_eq!(device.device_id(), "cam-1");
        assert!(!device.status().is_ready());
    }
}
