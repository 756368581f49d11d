//! Network camera streaming Motion-JPEG over a byte transport.
//!
//! The camera sends back-to-back JPEG images. Frames are cut out of the
//! byte stream at the start-of-image (`FF D8`) and end-of-image (`FF D9`)
//! markers; anything before a start marker (multipart boundaries, HTTP
//! headers) is discarded.

use bytes::{Buf, Bytes, BytesMut};
use devlink_core::{
    Capability, CameraFrame, CameraStartOptions, DeviceInfo, DeviceProfile, DeviceState,
    DeviceStatus, EndpointAddress,
};
use devlink_transport::{AnyTransport, CancellationToken, Transport};
use futures::StreamExt;
use futures::stream;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::devices::limits::CameraLimits;
use crate::error::{DeviceError, Result};
use crate::lifecycle::{DeviceCore, DeviceHooks};
use crate::traits::{Camera, Device, FrameStream, describe};

const CAPABILITIES: &[Capability] = &[Capability::Camera];

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Bytes requested from the transport per read.
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Largest accepted frame; a stream without an end marker inside this
/// window is treated as corrupt.
pub const MAX_FRAME_SIZE: usize = 4 * 1024 * 1024;

/// Limits for cameras whose profile sets none.
pub const DEFAULT_LIMITS: CameraLimits = CameraLimits::new(1920, 1080, 30);

fn find_marker(haystack: &[u8], marker: &[u8; 2], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(2)
        .position(|w| w == marker.as_slice())
        .map(|pos| pos + from)
}

/// Remove and return the first complete JPEG image in `buf`.
///
/// Bytes before the first start marker are dropped. A trailing `FF` is kept
/// when no start marker was found, since it may begin a marker split across
/// reads.
pub(crate) fn extract_frame(buf: &mut BytesMut) -> Option<Bytes> {
    let Some(start) = find_marker(buf, &SOI, 0) else {
        let keep = usize::from(buf.last() == Some(&0xFF));
        let discard = buf.len() - keep;
        buf.advance(discard);
        return None;
    };
    buf.advance(start);

    let end = find_marker(buf, &EOI, SOI.len())?;
    Some(buf.split_to(end + EOI.len()).freeze())
}

#[derive(Debug)]
struct MjpegHooks {
    profile: DeviceProfile,
    limits: CameraLimits,
}

impl MjpegHooks {
    fn command(&self, key: &str) -> Option<Vec<u8>> {
        self.profile.option(key).map(|c| c.as_bytes().to_vec())
    }
}

impl DeviceHooks for MjpegHooks {
    async fn on_initialize(
        &mut self,
        transport: &mut AnyTransport,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        debug!(scheme = transport.scheme(), "MJPEG camera transport ready");
        Ok(())
    }
}

/// Motion-JPEG camera.
///
/// Optional profile options:
///
/// - `start_command` / `stop_command`: bytes sent when a session starts or
///   stops (an HTTP `GET` for cameras that need one)
/// - `max_width`, `max_height`, `max_fps`: accepted limits, see
///   [`DEFAULT_LIMITS`]
#[derive(Debug)]
pub struct MjpegCamera {
    core: DeviceCore<MjpegHooks>,
    buffer: BytesMut,
    streaming: Option<CameraStartOptions>,
}

impl MjpegCamera {
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
            core: DeviceCore::new(device_id, address, transport, MjpegHooks { profile, limits }),
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            streaming: None,
        })
    }

    /// Accepted capture limits.
    pub fn limits(&self) -> CameraLimits {
        self.core.hooks().limits
    }

    fn fail_stream(&mut self, error: &DeviceError) {
        self.streaming = None;
        self.buffer.clear();
        warn!(device_id = %self.core.device_id(), "Capture failed: {}", error);
        if let Err(e) = self
            .core
            .set_status(DeviceState::Error, format!("capture failed: {}", error))
        {
            warn!(device_id = %self.core.device_id(), "Failed to record capture error: {}", e);
        }
    }

    /// Next frame, or `None` once `cancel` fired.
    async fn next_frame(&mut self, cancel: &CancellationToken) -> Option<Result<CameraFrame>> {
        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            if cancel.is_cancelled() {
                return None;
            }
            if let Some(data) = extract_frame(&mut self.buffer) {
                trace!(device_id = %self.core.device_id(), bytes = data.len(), "Frame captured");
                return Some(Ok(CameraFrame::jpeg(data)));
            }
            if self.buffer.len() > MAX_FRAME_SIZE {
                let error = DeviceError::protocol(
                    self.core.device_id(),
                    format!("no end-of-image marker within {} bytes", MAX_FRAME_SIZE),
                );
                self.fail_stream(&error);
                return Some(Err(error));
            }

            match self.core.transport_mut().receive(&mut chunk, cancel).await {
                Ok(0) => {
                    let error =
                        DeviceError::protocol(self.core.device_id(), "transport produced no data");
                    self.fail_stream(&error);
                    return Some(Err(error));
                }
                Ok(read) => self.buffer.extend_from_slice(&chunk[..read]),
                Err(e) if e.is_cancelled() => return None,
                Err(e) => {
                    let error = DeviceError::from(e);
                    self.fail_stream(&error);
                    return Some(Err(error));
                }
            }
        }
    }
}

impl Device for MjpegCamera {
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
        self.buffer.clear();
        self.core.disconnect().await
    }

    async fn reset(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.core.reset(cancel).await
    }
}

impl Camera for MjpegCamera {
    async fn start(
        &mut self,
        options: CameraStartOptions,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.core
            .hooks()
            .limits
            .check(self.core.device_id(), &options)?;
        let start_command = self.core.hooks().command("start_command");

        let mut op = self.core.begin("streaming")?;
        if let Some(command) = start_command {
            if let Err(e) = op.transport().send(&command, cancel).await {
                return op.finish(Err(e.into()));
            }
        }
        op.keep_busy();

        self.buffer.clear();
        self.streaming = Some(options);
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
        stream::unfold(Some(self), move |camera| {
            let cancel = cancel.clone();
            async move {
                let camera = camera?;
                let item = camera.next_frame(&cancel).await?;
                let next = if item.is_ok() { Some(camera) } else { None };
                Some((item, next))
            }
        })
        .boxed()
    }

    async fn stop(&mut self, cancel: &CancellationToken) -> Result<()> {
        if self.streaming.take().is_none() {
            return Ok(());
        }
        self.buffer.clear();

        let stop_command = self.core.hooks().command("stop_command");
        let sent = match stop_command {
            Some(command) => self
                .core
                .transport_mut()
                .send(&command, cancel)
                .await
                .map(drop)
                .map_err(DeviceError::from),
            None => Ok(()),
        };

        if self.core.state() == DeviceState::Busy {
            self.core.set_status(DeviceState::Ready, "capture stopped")?;
        }
        info!(device_id = %self.core.device_id(), "Capture stopped");
        sent
    }

    fn streaming(&self) -> Option<CameraStartOptions> {
        self.streaming
    }
}
