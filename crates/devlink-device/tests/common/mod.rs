//! Shared fixtures for device integration tests.

#![allow(dead_code)]

use std::time::Duration;

use devlink_core::{DeviceProfile, EndpointAddress};
use devlink_device::{DeviceManager, ManagerConfig, SdkCameraPlugin, StaticPluginCatalog};
use devlink_transport::TransportConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Bind a listener on an ephemeral local port.
pub async fn listener() -> (TcpListener, EndpointAddress) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, EndpointAddress::tcp("127.0.0.1", port).unwrap())
}

/// Accept one connection and collect everything the client sends until it
/// closes the connection.
pub async fn recording_peer() -> (EndpointAddress, JoinHandle<Vec<u8>>) {
    let (listener, address) = listener().await;
    let task = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).await.unwrap();
        received
    });
    (address, task)
}

/// Accept one connection, write `chunks` with a short pause between them,
/// then keep the connection open until the client goes away.
pub async fn streaming_peer(chunks: Vec<Vec<u8>>) -> EndpointAddress {
    let (listener, address) = listener().await;
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        for chunk in chunks {
            if stream.write_all(&chunk).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let mut sink = Vec::new();
        let _ = stream.read_to_end(&mut sink).await;
    });
    address
}

/// Minimal JPEG image: start marker, `body`, end marker.
pub fn jpeg(body: &[u8]) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend_from_slice(body);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

/// Transport settings that keep failing tests fast.
pub fn short_timeouts() -> TransportConfig {
    TransportConfig {
        connect_timeout: Duration::from_millis(1000),
        io_timeout: Duration::from_millis(1000),
        ..TransportConfig::default()
    }
}

/// Built-in catalog plus the "AcmeX" SDK camera.
pub fn catalog() -> StaticPluginCatalog {
    StaticPluginCatalog::builtin().with(SdkCameraPlugin::new(
        "AcmeX",
        DeviceProfile::new("Acme", "X", "sdk").with_version("4.2"),
    ))
}

pub fn manager() -> DeviceManager {
    DeviceManager::with_config(
        catalog(),
        ManagerConfig {
            transport: short_timeouts(),
            ..ManagerConfig::default()
        },
    )
}
