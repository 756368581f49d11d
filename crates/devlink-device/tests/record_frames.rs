//! Snapshot and recording helpers driven through the SDK camera.

mod common;

use std::time::Duration;

use devlink_core::{CameraStartOptions, DeviceState, EndpointAddress};
use devlink_device::{
    AnyCamera, Camera, CancellationToken, Device, DeviceError, RecordOptions, capture_snapshot,
    record_frames,
};

async fn acme_camera() -> AnyCamera {
    let address: EndpointAddress = "sdk://acme/cam0".parse().unwrap();
    let cancel = CancellationToken::new();
    let mut camera: AnyCamera = common::manager()
        .connect(&address, "AcmeX", &cancel)
        .await
        .unwrap();
    camera.connect(&cancel).await.unwrap();
    camera
}

#[tokio::test]
async fn test_record_max_frames() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = acme_camera().await;
    let options = RecordOptions::new(dir.path().join("session"))
        .with_capture(CameraStartOptions::new(640, 480, 60))
        .with_max_frames(3);

    let summary = record_frames(&mut camera, &options, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.frames(), 3);
    let names: Vec<_> = summary
        .files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["frame-000001.jpg", "frame-000002.jpg", "frame-000003.jpg"]
    );

    let mut total = 0;
    for path in &summary.files {
        let data = std::fs::read(path).unwrap();
        assert_eq!(&data[..2], &[0xFF, 0xD8]);
        assert_eq!(&data[data.len() - 2..], &[0xFF, 0xD9]);
        total += data.len() as u64;
    }
    assert_eq!(total, summary.bytes);

    let leftovers = std::fs::read_dir(dir.path().join("session"))
        .unwrap()
        .filter(|e| {
            e.as_ref()
                .unwrap()
                .path()
                .extension()
                .is_some_and(|ext| ext == "part")
        })
        .count();
    assert_eq!(leftovers, 0);
    assert_eq!(camera.status().state, DeviceState::Ready);
}

#[tokio::test]
async fn test_record_duration() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = acme_camera().await;
    let options = RecordOptions::new(dir.path())
        .with_capture(CameraStartOptions::new(320, 240, 20))
        .with_duration(Duration::from_millis(200));

    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        record_frames(&mut camera, &options, &CancellationToken::new()),
    )
    .await
    .unwrap()
    .unwrap();

    // 20 fps for 200 ms, with generous slack for slow machines
    assert!(summary.frames() >= 1);
    assert!(summary.frames() <= 10);
    assert_eq!(camera.streaming(), None);
    assert_eq!(camera.status().state, DeviceState::Ready);
}

#[tokio::test]
async fn test_record_stops_on_caller_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let mut camera = acme_camera().await;
    let options =
        RecordOptions::new(dir.path()).with_capture(CameraStartOptions::new(320, 240, 30));

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        record_frames(&mut camera, &options, &cancel),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(summary.frames() >= 1);
    assert_eq!(camera.status().state, DeviceState::Ready);
}

#[tokio::test]
async fn test_snapshot() {
    let mut camera = acme_camera().await;
    let frame = capture_snapshot(
        &mut camera,
        CameraStartOptions::new(1280, 720, 30),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(frame.format, "jpeg");
    assert!(
        String::from_utf8_lossy(&frame.data).contains("1280x720@30"),
        "frame carries capture geometry"
    );
    assert_eq!(camera.status().state, DeviceState::Ready);
}

#[tokio::test]
async fn test_snapshot_cancelled() {
    let mut camera = acme_camera().await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = capture_snapshot(&mut camera, CameraStartOptions::new(640, 480, 30), &cancel).await;
    assert!(matches!(result, Err(DeviceError::Cancelled)));
    assert_eq!(camera.status().state, DeviceState::Ready);
}
