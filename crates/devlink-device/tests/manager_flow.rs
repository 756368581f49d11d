//! End-to-end tests for plugin resolution and the device registry.

mod common;

use std::time::Duration;

use devlink_core::{Capability, CameraStartOptions, DeviceState, EndpointAddress};
use devlink_device::{
    AnyCamera, AnyGate, AnyPrinter, Camera, CancellationToken, Device, DeviceError, SdkCameraPlugin,
};
use devlink_transport::TransportError;
use futures::StreamExt;

fn acme_address() -> EndpointAddress {
    "sdk://acme/cam0".parse().unwrap()
}

/// Resolve "AcmeX", connect as camera, take one frame, stop.
#[tokio::test]
async fn test_acmex_single_frame() {
    let manager = common::manager();
    let cancel = CancellationToken::new();

    let mut camera: AnyCamera = manager
        .connect(&acme_address(), "AcmeX", &cancel)
        .await
        .unwrap();
    assert_eq!(camera.status().state, DeviceState::Disconnected);
    assert_eq!(camera.info().firmware_version.as_deref(), Some("4.2"));

    camera.connect(&cancel).await.unwrap();
    camera
        .start(CameraStartOptions::new(1280, 720, 30), &cancel)
        .await
        .unwrap();
    assert_eq!(camera.status().state, DeviceState::Busy);

    let frames: Vec<_> = camera.frames(&cancel).take(1).collect().await;
    assert_eq!(frames.len(), 1);
    let frame = frames.into_iter().next().unwrap().unwrap();
    assert_eq!(frame.format, "jpeg");
    assert_eq!(&frame.data[..2], &[0xFF, 0xD8]);

    camera.stop(&cancel).await.unwrap();
    assert_eq!(camera.status().state, DeviceState::Ready);
    assert_eq!(camera.streaming(), None);

    // no frames after stop
    let after: Vec<_> = camera.frames(&cancel).collect().await;
    assert_eq!(after.len(), 1);
    assert!(matches!(after[0], Err(DeviceError::NotReady { .. })));
}

#[tokio::test]
async fn test_capability_mismatch_has_no_side_effects() {
    let manager = common::manager();
    let result = manager
        .connect::<AnyGate>(&acme_address(), "AcmeX", &CancellationToken::new())
        .await;

    match result {
        Err(DeviceError::CapabilityMismatch {
            plugin_id,
            requested,
            offered,
        }) => {
            assert_eq!(plugin_id, "AcmeX");
            assert_eq!(requested, Capability::Gate);
            assert_eq!(offered, vec![Capability::Camera]);
        }
        other => panic!("expected CapabilityMismatch, got {:?}", other.map(|_| ())),
    }
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_unknown_plugin() {
    let manager = common::manager();
    let result = manager
        .connect::<AnyCamera>(&acme_address(), "Nope", &CancellationToken::new())
        .await;
    assert!(matches!(
        result,
        Err(DeviceError::PluginNotFound { plugin_id }) if plugin_id == "Nope"
    ));
}

#[tokio::test]
async fn test_unknown_scheme() {
    let manager = common::manager();
    let address: EndpointAddress = "usb://0483/5740".parse().unwrap();
    let result = manager
        .connect::<AnyCamera>(&address, "AcmeX", &CancellationToken::new())
        .await;
    assert!(matches!(
        result,
        Err(DeviceError::Transport(TransportError::UnsupportedScheme { scheme })) if scheme == "usb"
    ));
}

#[tokio::test]
async fn test_connect_does_not_open_transport() {
    // nothing listens here; resolution must still succeed
    let manager = common::manager();
    let address = EndpointAddress::tcp("127.0.0.1", 1).unwrap();
    let mut printer: AnyPrinter = manager
        .connect(&address, "escpos", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(printer.status().state, DeviceState::Disconnected);
    assert!(printer.connect(&CancellationToken::new()).await.is_err());
    assert_eq!(printer.status().state, DeviceState::Disconnected);
}

#[tokio::test]
async fn test_cancelled_stream_yields_nothing_more() {
    let manager = common::manager();
    let cancel = CancellationToken::new();
    let mut camera: AnyCamera = manager
        .connect(&acme_address(), "AcmeX", &cancel)
        .await
        .unwrap();
    camera.connect(&cancel).await.unwrap();
    camera
        .start(CameraStartOptions::new(640, 480, 50), &cancel)
        .await
        .unwrap();

    let stream_cancel = CancellationToken::new();
    let mut received = 0;
    {
        let mut frames = camera.frames(&stream_cancel);
        while let Some(frame) = frames.next().await {
            frame.unwrap();
            received += 1;
            if received == 2 {
                stream_cancel.cancel();
            }
        }
    }
    assert_eq!(received, 2);
    assert_eq!(camera.status().state, DeviceState::Busy);

    camera.stop(&cancel).await.unwrap();
    assert_eq!(camera.status().state, DeviceState::Ready);
}

#[tokio::test]
async fn test_registry_last_writer_wins() {
    let manager = common::manager();
    let cancel = CancellationToken::new();

    let first = manager.add("lobby", &acme_address(), "AcmeX").await.unwrap();
    first.lock().await.connect(&cancel).await.unwrap();

    let second = manager.add("lobby", &acme_address(), "AcmeX").await.unwrap();
    assert_eq!(manager.device_ids(), vec!["lobby"]);
    assert_eq!(
        first.lock().await.status().state,
        DeviceState::Disconnected,
        "displaced device is disconnected"
    );
    assert!(std::sync::Arc::ptr_eq(&manager.get("lobby").unwrap(), &second));

    second.lock().await.connect(&cancel).await.unwrap();
    manager.release("lobby").await.unwrap();
    assert_eq!(second.lock().await.status().state, DeviceState::Disconnected);
    assert!(matches!(
        manager.release("lobby").await,
        Err(DeviceError::DeviceNotFound { .. })
    ));
}

#[tokio::test]
async fn test_register_returns_displaced() {
    let manager = common::manager();
    let cancel = CancellationToken::new();
    let plugin_camera = |id: &str| manager.create(id, &acme_address(), "AcmeX").unwrap();

    assert!(manager.register(plugin_camera("cam")).await.is_none());
    manager
        .get("cam")
        .unwrap()
        .lock()
        .await
        .connect(&cancel)
        .await
        .unwrap();

    let displaced = manager.register(plugin_camera("cam")).await.unwrap();
    assert_eq!(displaced.lock().await.status().state, DeviceState::Disconnected);
    assert_eq!(manager.len(), 1);
}

#[tokio::test]
async fn test_connect_all_survives_failures() {
    let manager = common::manager();
    manager.add("cam-a", &acme_address(), "AcmeX").await.unwrap();
    manager.add("cam-b", &acme_address(), "AcmeX").await.unwrap();
    manager
        .add("gate", &EndpointAddress::tcp("127.0.0.1", 1).unwrap(), "relay-gate")
        .await
        .unwrap();

    let report = manager.connect_all(&CancellationToken::new()).await;
    assert_eq!(report.succeeded, vec!["cam-a", "cam-b"]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "gate");
    assert!(matches!(report.failed[0].1, DeviceError::Transport(_)));

    let report = manager.shutdown().await;
    assert!(report.is_success());
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_status_subscription() {
    let manager = common::manager();
    let cancel = CancellationToken::new();
    let mut camera: AnyCamera = manager
        .connect(&acme_address(), "AcmeX", &cancel)
        .await
        .unwrap();
    let mut status = camera.subscribe_status();

    camera.connect(&cancel).await.unwrap();
    tokio::time::timeout(Duration::from_secs(1), status.changed())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.borrow_and_update().state, DeviceState::Ready);
}

#[tokio::test]
async fn test_custom_plugin_profile_limits() {
    let catalog = common::catalog().with(SdkCameraPlugin::new(
        "AcmeLite",
        devlink_core::DeviceProfile::new("Acme", "Lite", "sdk").with_option("max_fps", "10"),
    ));
    let manager = devlink_device::DeviceManager::new(catalog);
    let cancel = CancellationToken::new();

    let mut camera: AnyCamera = manager
        .connect(&acme_address(), "AcmeLite", &cancel)
        .await
        .unwrap();
    camera.connect(&cancel).await.unwrap();

    let result = camera
        .start(CameraStartOptions::new(1280, 720, 30), &cancel)
        .await;
    assert!(matches!(result, Err(DeviceError::InvalidOptions { .. })));
    assert_eq!(camera.status().state, DeviceState::Ready);
}
