//! Concurrent id → device map owned by the manager.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::devices::AnyDevice;

/// Shared handle to a registered device.
///
/// The outer lock serialises callers; the device's own `Busy` state still
/// decides whether an operation may start.
pub type DeviceHandle = Arc<tokio::sync::Mutex<AnyDevice>>;

/// Mutex-guarded map from device id to handle.
///
/// The map lock is only ever held for the map operation itself, never
/// across an `.await`.
#[derive(Debug, Default)]
pub(crate) struct DeviceRegistry {
    devices: Mutex<HashMap<String, DeviceHandle>>,
}

impl DeviceRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DeviceHandle>> {
        // every critical section is a single map call, so poisoning is ignored
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert `handle`, returning the handle it displaced.
    pub(crate) fn insert(&self, device_id: String, handle: DeviceHandle) -> Option<DeviceHandle> {
        self.lock().insert(device_id, handle)
    }

    pub(crate) fn remove(&self, device_id: &str) -> Option<DeviceHandle> {
        self.lock().remove(device_id)
    }

    pub(crate) fn get(&self, device_id: &str) -> Option<DeviceHandle> {
        self.lock().get(device_id).cloned()
    }

    pub(crate) fn contains(&self, device_id: &str) -> bool {
        self.lock().contains_key(device_id)
    }

    /// Registered ids, sorted.
    pub(crate) fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Every entry, sorted by id, for fan-out outside the lock.
    pub(crate) fn snapshot(&self) -> Vec<(String, DeviceHandle)> {
        let mut entries: Vec<(String, DeviceHandle)> = self
            .lock()
            .iter()
            .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    /// Remove and return every entry.
    pub(crate) fn drain(&self) -> Vec<(String, DeviceHandle)> {
        self.lock().drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::SdkCamera;
    use devlink_core::{DeviceProfile, EndpointAddress};
    use devlink_transport::SdkTransport;

    fn handle(device_id: &str) -> DeviceHandle {
        let camera = SdkCamera::new(
            device_id,
            EndpointAddress::sdk(Some("acme"), None).unwrap(),
            SdkTransport::new().into(),
            DeviceProfile::default(),
        )
        .unwrap();
        Arc::new(tokio::sync::Mutex::new(camera.into()))
    }

    #[test]
    fn test_last_insert_wins() {
        let registry = DeviceRegistry::new();
        let first = handle("a");
        let second = handle("b");

        assert!(registry.insert("dev".into(), Arc::clone(&first)).is_none());
        let displaced = registry.insert("dev".into(), Arc::clone(&second)).unwrap();

        assert!(Arc::ptr_eq(&displaced, &first));
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&registry.get("dev").unwrap(), &second));
    }

    #[test]
    fn test_remove_once() {
        let registry = DeviceRegistry::new();
        registry.insert("dev".into(), handle("dev"));

        assert!(registry.contains("dev"));
        assert!(registry.remove("dev").is_some());
        assert!(registry.remove("dev").is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_concurrent_inserts() {
        let registry = Arc::new(DeviceRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for j in 0..16 {
                        let id = format!("dev-{}", (i * 16 + j) % 32);
                        registry.insert(id.clone(), handle(&id));
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(registry.len(), 32);
        assert_eq!(registry.ids().len(), 32);
        assert_eq!(registry.snapshot()[0].0, "dev-0");
        assert_eq!(registry.drain().len(), 32);
        assert_eq!(registry.len(), 0);
    }
}
