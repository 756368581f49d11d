//! Camera driven by an in-process vendor library.
//!
//! The vendor SDK owns the capture pipeline and the transport is a
//! pass-through. This build carries no vendor SDK, so the camera produces
//! placeholder JPEG images on the SDK's frame clock: each one is a minimal
//! start/comment/end sequence whose comment names the frame number and the
//! negotiated geometry.

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use devlink_core::{
    Capability, CameraFrame, CameraStartOptions, DeviceInfo, DeviceProfile, DeviceState,
    DeviceStatus, EndpointAddress,
};
use devlink_transport::{AnyTransport, CancellationToken, Transport};
use futures::StreamExt;
use futures::stream;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::devices::limits::CameraLimits;
use crate::error::{DeviceError, Result};
use crate::lifecycle::{DeviceCore, DeviceHooks};
use crate::traits::{Camera, Device, FrameStream, describe};

const CAPABILITIES: &[Capability] = &[Capability::Camera];

/// Limits for SDK cameras whose profile sets none.
pub const DEFAULT_LIMITS: CameraLimits = CameraLimits::new(3840, 2160, 60);

/// Build the placeholder image for frame `sequence`.
fn placeholder_frame(sequence: u64, options: &CameraStartOptions) -> Bytes {
    let comment = format!(
        "devlink frame={} {}x{}@{}",
        sequence, options.width, options.height, options.fps
    );
    let segment_len = u16::try_from(comment.len() + 2).unwrap_or(u16::MAX);

    let mut data = BytesMut::with_capacity(comment.len() + 8);
    data.put_slice(&[0xFF, 0xD8]);
    data.put_slice(&[0xFF, 0xFE]);
    data.put_u16(segment_len);
    data.put_slice(comment.as_bytes());
    data.put_slice(&[0xFF, 0xD9]);
    data.freeze()
}

#[derive(Debug)]
struct SdkCameraHooks {
    profile: DeviceProfile,
    limits: CameraLimits,
}

impl DeviceHooks for SdkCameraHooks {
    async fn on_initialize(
        &mut self,
        transport: &mut AnyTransport,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        if !transport.is_open() {
            return Err(DeviceError::unavailable(format!(
                "{} {}",
                self.profile.manufacturer, self.profile.model
            )));
        }
        debug!(
            manufacturer = %self.profile.manufacturer,
            model = %self.profile.model,
            "SDK camera session opened"
        );
        Ok(())
    }
}

/// SDK-backed camera.
///
/// Frames are paced at the requested rate; a consumer that falls behind
/// gets the next frame immediately rather than a burst of stale ones.
#[derive(Debug)]
pub struct SdkCamera {
    core: DeviceCore<SdkCameraHooks>,
    streaming: Option<CameraStartOptions>,
    sequence: u64,
    next_due: Option<Instant>,
}

impl SdkCamera {
    /// Create a disconnected camera.
    ///
    /// # Errors
    ///
    /// Returns an invalid profile error if a limit option does not parse.
    pub fn new(
        device_id: impl Into<String>,
        address: EndpointAddress,
        transport: AnyTransport,
        profile: DeviceProfile,
    ) -> Result<Self> {
        let limits = CameraLimits::from_profile(&profile, DEFAULT_LIMITS)?;
        Ok(Self {
            core: DeviceCore::new(device_id, address, transport, SdkCameraHooks { profile, limits }),
            streaming: None,
            sequence: 0,
            next_due: None,
        })
    }

    /// Accepted capture limits.
    pub fn limits(&self) -> CameraLimits {
        self.core.hooks().limits
    }

    /// Frames produced since the camera was created.
    pub fn frames_captured(&self) -> u64 {
        self.sequence
    }

    async fn next_frame(&mut self, cancel: &CancellationToken) -> Option<Result<CameraFrame>> {
        let options = self.streaming?;
        let due = self.next_due.unwrap_or_else(Instant::now);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep_until(due) => {}
        }

        let period = Duration::from_secs(1) / options.fps;
        let now = Instant::now();
        self.next_due = Some(if due + period > now {
            due + period
        } else {
            now + period
        });

        self.sequence += 1;
        trace!(device_id = %self.core.device_id(), sequence = self.sequence, "Frame captured");
        Some(Ok(CameraFrame::jpeg(placeholder_frame(
            self.sequence,
            &options,
        ))))
    }
}

impl Device for SdkCamera {
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
            Capability::Camera,
            &self.core.hooks().profile,
        )
    }

    async fn connect(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.core.connect(cancel).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.streaming = None;
        self.next_due = None;
        self.core.disconnect().await
    }

    async fn reset(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.core.reset(cancel).await
    }
}

impl Camera for SdkCamera {
    async fn start(
        &mut self,
        options: CameraStartOptions,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.core
            .hooks()
            .limits
            .check(self.core.device_id(), &options)?;
        self.core.begin("streaming")?.keep_busy();

        self.streaming = Some(options);
        self.next_due = None;
        info!(
            device_id = %self.core.device_id(),
            width = options.width,
            height = options.height,
            fps = options.fps,
            "Capture started"
        );
        Ok(())
    }

    fn frames<'a>(&'a mut self, cancel: &CancellationToken) -> FrameStream<'a> {
        if self.streaming.is_none() {
            let error = DeviceError::not_ready(self.core.device_id(), self.core.state());
            return stream::once(futures::future::ready(Err(error))).boxed();
        }

        let cancel = cancel.clone();
        stream::unfold(self, move |camera| {
            let cancel = cancel.clone();
            async move {
                let item = camera.next_frame(&cancel).await?;
                Some((item, camera))
            }
        })
        .boxed()
    }

    async fn stop(&mut self, _cancel: &CancellationToken) -> Result<()> {
        if self.streaming.take().is_none() {
            return Ok(());
        }
        self.next_due = None;

        if self.core.state() == DeviceState::Busy {
            self.core.set_status(DeviceState::Ready, "capture stopped")?;
        }
        info!(device_id = %self.core.device_id(), frames = self.sequence, "Capture stopped");
        Ok(())
    }

    fn streaming(&self) -> Option<CameraStartOptions> {
        self.streaming
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devlink_transport::SdkTransport;
    use futures::StreamExt;

    fn camera() -> SdkCamera {
        SdkCamera::new(
            "cam-1",
            EndpointAddress::sdk(Some("acme"), Some("cam0")).unwrap(),
            SdkTransport::new().into(),
            DeviceProfile::new("Acme", "X", "sdk"),
        )
        .unwrap()
    }

    #[test]
    fn test_placeholder_frame_is_jpeg() {
        let data = placeholder_frame(7, &CameraStartOptions::new(640, 480, 10));
        assert_eq!(&data[..4], &[0xFF, 0xD8, 0xFF, 0xFE]);
        assert_eq!(&data[data.len() - 2..], &[0xFF, 0xD9]);

        let segment_len = u16::from_be_bytes([data[4], data[5]]) as usize;
        assert_eq!(segment_len, data.len() - 6);
        let comment = std::str::from_utf8(&data[6..data.len() - 2]).unwrap();
        assert_eq!(comment, "devlink frame=7 640x480@10");
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_are_paced() {
        let cancel = CancellationToken::new();
        let mut camera = camera();
        camera.connect(&cancel).await.unwrap();
        camera
            .start(CameraStartOptions::new(1280, 720, 10), &cancel)
            .await
            .unwrap();

        let started = Instant::now();
        let frames: Vec<_> = camera.frames(&cancel).take(3).collect().await;
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(Result::is_ok));
        assert!(started.elapsed() >= Duration::from_millis(200));

        camera.stop(&cancel).await.unwrap();
        assert_eq!(camera.frames_captured(), 3);
        assert_eq!(camera.status().state, DeviceState::Ready);
    }

    #[tokio::test]
    async fn test_start_rejects_over_limit() {
        let cancel = CancellationToken::new();
        let mut camera = camera();
        camera.connect(&cancel).await.unwrap();

        let result = camera
            .start(CameraStartOptions::new(7680, 4320, 30), &cancel)
            .await;
        assert!(matches!(result, Err(DeviceError::InvalidOptions { .. })));
        assert_eq!(camera.status().state, DeviceState::Ready);
        assert_eq!(camera.streaming(), None);
    }

    #[tokio::test]
    async fn test_frames_outside_session() {
        let mut camera = camera();
        let items: Vec<_> = camera.frames(&CancellationToken::new()).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(DeviceError::NotReady { .. })));
    }

    #[tokio::test]
    async fn test_disconnect_ends_session() {
        let cancel = CancellationToken::new();
        let mut camera = camera();
        camera.connect(&cancel).await.unwrap();
        camera.start(CameraStartOptions::default(), &cancel).await.unwrap();

        camera.disconnect().await.unwrap();
        assert_eq!(camera.streaming(), None);
        assert_eq!(camera.status().state, DeviceState::Disconnected);
    }
}
