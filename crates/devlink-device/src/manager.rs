//! Capability-typed device connection and the device registry.
//!
//! The [`DeviceManager`] depends only on a [`PluginCatalog`] and a
//! [`TransportFactory`]; it knows nothing about concrete device kinds.
//!
//! ```text
//! caller ──connect::<AnyCamera>(address, "AcmeX")──► DeviceManager
//!                                                     │
//!          PluginCatalog::resolve("AcmeX") ◄──────────┤
//!          TransportFactory::create(scheme) ◄─────────┤
//!          DevicePlugin::create_device(..) ◄──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use devlink_core::{CameraStartOptions, DeviceProfile, EndpointAddress};
//! use devlink_device::{
//!     AnyCamera, Camera, CancellationToken, Device, DeviceManager, SdkCameraPlugin,
//!     StaticPluginCatalog,
//! };
//! use futures::StreamExt;
//!
//! # async fn example() -> devlink_device::Result<()> {
//! let catalog = StaticPluginCatalog::new()
//!     .with(SdkCameraPlugin::new("AcmeX", DeviceProfile::new("Acme", "X", "sdk")));
//! let manager = DeviceManager::new(catalog);
//! let cancel = CancellationToken::new();
//!
//! let address: EndpointAddress = "sdk://acme/cam0".parse()?;
//! let mut camera: AnyCamera = manager.connect(&address, "AcmeX", &cancel).await?;
//!
//! camera.connect(&cancel).await?;
//! camera.start(CameraStartOptions::new(1280, 720, 30), &cancel).await?;
//! let frame = camera.frames(&cancel).next().await;
//! assert!(frame.is_some());
//! camera.stop(&cancel).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use devlink_core::EndpointAddress;
use devlink_transport::{CancellationToken, TransportConfig, TransportFactory};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::devices::{AnyDevice, CapabilityHandle};
use crate::error::{DeviceError, Result};
use crate::plugin::PluginCatalog;
use crate::registry::{DeviceHandle, DeviceRegistry};
use crate::traits::Device;

/// Default number of devices connected or disconnected in parallel.
pub const DEFAULT_FAN_OUT_LIMIT: usize = 8;

/// Manager settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Settings for every transport the manager creates.
    pub transport: TransportConfig,

    /// Parallelism of [`DeviceManager::connect_all`] and
    /// [`DeviceManager::disconnect_all`].
    pub fan_out_limit: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            fan_out_limit: DEFAULT_FAN_OUT_LIMIT,
        }
    }
}

/// Per-device outcome of a fan-out operation.
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Devices the operation succeeded on, sorted by id.
    pub succeeded: Vec<String>,

    /// Devices the operation failed on, with their errors, sorted by id.
    pub failed: Vec<(String, DeviceError)>,
}

impl FanOutReport {
    /// Whether every device succeeded.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// Ids of the devices that failed.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failed.iter().map(|(id, _)| id.as_str()).collect()
    }
}

/// Resolves plugins into capability-typed devices and owns the registry.
pub struct DeviceManager {
    catalog: Arc<dyn PluginCatalog>,
    factory: TransportFactory,
    registry: DeviceRegistry,
    config: ManagerConfig,
}

impl std::fmt::Debug for DeviceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceManager")
            .field("plugins", &self.catalog.plugin_ids())
            .field("schemes", &self.factory.schemes())
            .field("devices", &self.registry.ids())
            .field("config", &self.config)
            .finish()
    }
}

impl DeviceManager {
    /// Create a manager with default configuration and the default
    /// transports.
    pub fn new(catalog: impl PluginCatalog + 'static) -> Self {
        Self::with_config(catalog, ManagerConfig::default())
    }

    /// Create a manager with the default transports configured by `config`.
    pub fn with_config(catalog: impl PluginCatalog + 'static, config: ManagerConfig) -> Self {
        let factory = TransportFactory::with_defaults(config.transport.clone());
        Self::with_factory(catalog, factory, config)
    }

    /// Create a manager with a custom transport table.
    pub fn with_factory(
        catalog: impl PluginCatalog + 'static,
        factory: TransportFactory,
        config: ManagerConfig,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            factory,
            registry: DeviceRegistry::new(),
            config,
        }
    }

    /// The plugin catalog.
    pub fn catalog(&self) -> &dyn PluginCatalog {
        self.catalog.as_ref()
    }

    /// The transport table.
    pub fn factory(&self) -> &TransportFactory {
        &self.factory
    }

    /// Manager settings.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Build a device of capability `C` from `plugin_id`, bound to a
    /// transport for `address`.
    ///
    /// The device gets a fresh UUID as its id. Its transport is *not*
    /// opened: call [`Device::connect`] (or start using it) to pay the
    /// connection cost. The device is not registered.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::PluginNotFound`] if the catalog has no such plugin
    /// - [`DeviceError::CapabilityMismatch`] if the plugin's devices are not a `C`
    /// - [`DeviceError::Transport`] with `UnsupportedScheme` for an unknown scheme
    ///
    /// Nothing is created or opened when any of these is returned.
    pub async fn connect<C: CapabilityHandle>(
        &self,
        address: &EndpointAddress,
        plugin_id: &str,
        cancel: &CancellationToken,
    ) -> Result<C> {
        if cancel.is_cancelled() {
            return Err(DeviceError::Cancelled);
        }

        let plugin = self.catalog.resolve(plugin_id)?;
        let offered = plugin.capabilities();
        if !offered.contains(&C::CAPABILITY) {
            return Err(DeviceError::CapabilityMismatch {
                plugin_id: plugin_id.to_string(),
                requested: C::CAPABILITY,
                offered: offered.to_vec(),
            });
        }

        let device_id = Uuid::new_v4().to_string();
        let device = self.build(&device_id, address, plugin_id)?;
        let handle = C::from_device(device).map_err(|device| DeviceError::CapabilityMismatch {
            plugin_id: plugin_id.to_string(),
            requested: C::CAPABILITY,
            offered: device.capabilities().to_vec(),
        })?;

        info!(%device_id, %plugin_id, %address, capability = %C::CAPABILITY, "Device resolved");
        Ok(handle)
    }

    /// Build a disconnected device with an explicit id, without registering
    /// it.
    ///
    /// # Errors
    ///
    /// Returns the address, plugin or transport error.
    pub fn create(
        &self,
        device_id: &str,
        address: &EndpointAddress,
        plugin_id: &str,
    ) -> Result<AnyDevice> {
        self.build(device_id, address, plugin_id)
    }

    fn build(
        &self,
        device_id: &str,
        address: &EndpointAddress,
        plugin_id: &str,
    ) -> Result<AnyDevice> {
        address.validate()?;
        let plugin = self.catalog.resolve(plugin_id)?;
        let transport = self.factory.create(address.scheme())?;
        let device = plugin.create_device(device_id, address, transport)?;
        debug!(%device_id, %plugin_id, scheme = %address.scheme(), "Device created");
        Ok(device)
    }

    /// Build a device and register it under `device_id`.
    ///
    /// # Errors
    ///
    /// Returns the address, plugin or transport error; the registry is
    /// unchanged in that case.
    pub async fn add(
        &self,
        device_id: &str,
        address: &EndpointAddress,
        plugin_id: &str,
    ) -> Result<DeviceHandle> {
        let device = self.build(device_id, address, plugin_id)?;
        let handle: DeviceHandle = Arc::new(tokio::sync::Mutex::new(device));
        if let Some(displaced) = self.insert(device_id, Arc::clone(&handle)) {
            release_displaced(device_id, displaced).await;
        }
        Ok(handle)
    }

    /// Register `device` under its own id.
    ///
    /// If another device was registered under that id it is replaced, then
    /// disconnected, and returned.
    pub async fn register(&self, device: impl Into<AnyDevice>) -> Option<DeviceHandle> {
        let device = device.into();
        let device_id = device.device_id().to_string();
        let displaced = self.insert(&device_id, Arc::new(tokio::sync::Mutex::new(device)))?;
        release_displaced(&device_id, Arc::clone(&displaced)).await;
        Some(displaced)
    }

    fn insert(&self, device_id: &str, handle: DeviceHandle) -> Option<DeviceHandle> {
        let displaced = self.registry.insert(device_id.to_string(), handle);
        debug!(%device_id, replaced = displaced.is_some(), "Device registered");
        displaced
    }

    /// Unregister `device_id` and disconnect it.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::DeviceNotFound`] if nothing is registered
    /// under the id (including a second release of the same id), or the
    /// disconnect error. The device is unregistered in both cases.
    pub async fn release(&self, device_id: &str) -> Result<()> {
        let handle = self
            .registry
            .remove(device_id)
            .ok_or_else(|| DeviceError::device_not_found(device_id))?;

        let result = handle.lock().await.disconnect().await;
        info!(%device_id, "Device released");
        result
    }

    /// Handle of a registered device.
    pub fn get(&self, device_id: &str) -> Option<DeviceHandle> {
        self.registry.get(device_id)
    }

    /// Whether a device is registered under `device_id`.
    pub fn contains(&self, device_id: &str) -> bool {
        self.registry.contains(device_id)
    }

    /// Registered ids, sorted.
    pub fn device_ids(&self) -> Vec<String> {
        self.registry.ids()
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether no device is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Connect every registered device.
    ///
    /// One device failing does not stop the others; every failure is logged
    /// and reported.
    pub async fn connect_all(&self, cancel: &CancellationToken) -> FanOutReport {
        let cancel = cancel.clone();
        self.fan_out("connect", move |handle| {
            let cancel = cancel.clone();
            async move {
                let mut device = handle.lock().await;
                device.connect(&cancel).await
            }
        })
        .await
    }

    /// Disconnect every registered device, keeping them registered.
    pub async fn disconnect_all(&self) -> FanOutReport {
        self.fan_out("disconnect", |handle| async move {
            let mut device = handle.lock().await;
            device.disconnect().await
        })
        .await
    }

    /// Disconnect and unregister every device.
    pub async fn shutdown(&self) -> FanOutReport {
        let entries = self.registry.drain();
        info!(devices = entries.len(), "Shutting down device manager");
        self.run_fan_out("disconnect", entries, |handle| async move {
            let mut device = handle.lock().await;
            device.disconnect().await
        })
        .await
    }

    async fn fan_out<F, Fut>(&self, operation: &'static str, op: F) -> FanOutReport
    where
        F: Fn(DeviceHandle) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let entries = self.registry.snapshot();
        self.run_fan_out(operation, entries, op).await
    }

    async fn run_fan_out<F, Fut>(
        &self,
        operation: &'static str,
        entries: Vec<(String, DeviceHandle)>,
        op: F,
    ) -> FanOutReport
    where
        F: Fn(DeviceHandle) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let limit = Arc::new(Semaphore::new(self.config.fan_out_limit.max(1)));
        let mut tasks = JoinSet::new();
        let mut ids = HashMap::with_capacity(entries.len());

        for (device_id, handle) in entries {
            let limit = Arc::clone(&limit);
            let future = op(handle);
            let task = tasks.spawn(async move {
                let _permit = limit.acquire_owned().await;
                future.await
            });
            ids.insert(task.id(), device_id);
        }

        let mut report = FanOutReport::default();
        while let Some(joined) = tasks.join_next_with_id().await {
            let (task_id, result) = match joined {
                Ok((task_id, result)) => (task_id, result),
                Err(e) => (
                    e.id(),
                    Err(DeviceError::TaskFailed {
                        reason: e.to_string(),
                    }),
                ),
            };
            let device_id = ids.remove(&task_id).unwrap_or_default();
            match result {
                Ok(()) => report.succeeded.push(device_id),
                Err(e) => {
                    warn!(%device_id, operation, "Device {} failed: {}", operation, e);
                    report.failed.push((device_id, e));
                }
            }
        }

        report.succeeded.sort_unstable();
        report.failed.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        info!(
            operation,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Fan-out finished"
        );
        report
    }
}

async fn release_displaced(device_id: &str, displaced: DeviceHandle) {
    if let Err(e) = displaced.lock().await.disconnect().await {
        warn!(%device_id, "Error disconnecting displaced device: {}", e);
    }
    debug!(%device_id, "Displaced device disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{RelayGatePlugin, SdkCameraPlugin, StaticPluginCatalog};
    use devlink_core::DeviceProfile;

    fn manager() -> DeviceManager {
        let catalog = StaticPluginCatalog::new()
            .with(SdkCameraPlugin::new("AcmeX", DeviceProfile::new("Acme", "X", "sdk")))
            .with(RelayGatePlugin::new("gate", DeviceProfile::default()));
        DeviceManager::new(catalog)
    }

    fn sdk_address() -> EndpointAddress {
        EndpointAddress::sdk(Some("acme"), Some("cam0")).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let config = ManagerConfig::default();
        assert_eq!(config.fan_out_limit, DEFAULT_FAN_OUT_LIMIT);

        let parsed: ManagerConfig = serde_json::from_str(r#"{"fan_out_limit": 2}"#).unwrap();
        assert_eq!(parsed.fan_out_limit, 2);
        assert_eq!(parsed.transport, TransportConfig::default());
    }

    #[tokio::test]
    async fn test_add_release() {
        let manager = manager();
        manager.add("cam", &sdk_address(), "AcmeX").await.unwrap();
        assert_eq!(manager.device_ids(), vec!["cam"]);

        manager.release("cam").await.unwrap();
        assert!(manager.is_empty());
        assert!(matches!(
            manager.release("cam").await,
            Err(DeviceError::DeviceNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_unknown_plugin_leaves_registry() {
        let manager = manager();
        let result = manager.add("cam", &sdk_address(), "nope").await;
        assert!(matches!(result, Err(DeviceError::PluginNotFound { .. })));
        assert!(manager.is_empty());
    }

    #[tokio::test]
    async fn test_fan_out_reports_failures() {
        let manager = manager();
        manager.add("cam", &sdk_address(), "AcmeX").await.unwrap();
        // nothing listens on port 1
        let unreachable = EndpointAddress::tcp("127.0.0.1", 1).unwrap();
        manager.add("gate", &unreachable, "gate").await.unwrap();

        let report = manager.connect_all(&CancellationToken::new()).await;
        assert_eq!(report.succeeded, vec!["cam"]);
        assert_eq!(report.failed_ids(), vec!["gate"]);
        assert!(!report.is_success());

        let report = manager.disconnect_all().await;
        assert!(report.is_success());
        assert_eq!(report.succeeded, vec!["cam", "gate"]);
        assert_eq!(manager.len(), 2);

        let report = manager.shutdown().await;
        assert_eq!(report.succeeded.len(), 2);
        assert!(manager.is_empty());
    }
}
