//! Snapshot and recording helpers built on [`Camera`].
//!
//! Both helpers own the whole session: they start the camera, consume the
//! frame stream and stop the camera again on every exit path. The stop
//! runs under a fresh token so a cancelled caller still leaves the camera
//! `Ready`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use devlink_core::{CameraFrame, CameraStartOptions};
use devlink_transport::CancellationToken;
use futures::StreamExt;
use tracing::{debug, info};

use crate::error::{DeviceError, Result};
use crate::traits::Camera;

/// Start `camera`, take its first frame and stop it.
///
/// # Errors
///
/// Returns the start or frame error, [`DeviceError::Cancelled`] if `cancel`
/// fired before a frame arrived, or the stop error.
pub async fn capture_snapshot<C: Camera>(
    camera: &mut C,
    options: CameraStartOptions,
    cancel: &CancellationToken,
) -> Result<CameraFrame> {
    camera.start(options, cancel).await?;

    let first = camera.frames(cancel).next().await;
    let stopped = camera.stop(&CancellationToken::new()).await;

    let frame = first.ok_or(DeviceError::Cancelled)??;
    stopped?;
    debug!(device_id = %camera.device_id(), bytes = frame.len(), "Snapshot captured");
    Ok(frame)
}

/// Settings for [`record_frames`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOptions {
    /// Capture geometry and rate.
    pub capture: CameraStartOptions,

    /// Directory frames are written to; created if missing.
    pub directory: PathBuf,

    /// Stop after this long.
    pub duration: Option<Duration>,

    /// Stop after this many frames.
    pub max_frames: Option<usize>,
}

impl RecordOptions {
    /// Record into `directory` with default capture options and no limit.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            capture: CameraStartOptions::default(),
            directory: directory.into(),
            duration: None,
            max_frames: None,
        }
    }

    /// Set the capture options.
    pub fn with_capture(mut self, capture: CameraStartOptions) -> Self {
        self.capture = capture;
        self
    }

    /// Stop after `duration`.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Stop after `max_frames` frames.
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames = Some(max_frames);
        self
    }
}

/// What [`record_frames`] wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSummary {
    /// Files written, in capture order.
    pub files: Vec<PathBuf>,

    /// Total image bytes written.
    pub bytes: u64,
}

impl RecordSummary {
    /// Number of frames written.
    pub fn frames(&self) -> usize {
        self.files.len()
    }
}

/// Write frames from `camera` to `options.directory` as
/// `frame-000001.jpg`, `frame-000002.jpg`, ...
///
/// Recording ends when `cancel` fires, when `options.duration` elapses or
/// after `options.max_frames` frames, whichever comes first. Each file is
/// written under a temporary name and renamed into place, so a frame file is
/// either complete or absent.
///
/// # Errors
///
/// Returns the start, frame, file system or stop error. Frames already
/// written stay on disk.
pub async fn record_frames<C: Camera>(
    camera: &mut C,
    options: &RecordOptions,
    cancel: &CancellationToken,
) -> Result<RecordSummary> {
    tokio::fs::create_dir_all(&options.directory).await?;

    let session = cancel.child_token();
    camera.start(options.capture, &session).await?;
    info!(
        device_id = %camera.device_id(),
        directory = %options.directory.display(),
        "Recording started"
    );

    let recorded = write_frames(camera, options, &session).await;
    let stopped = camera.stop(&CancellationToken::new()).await;

    let summary = recorded?;
    stopped?;
    info!(
        device_id = %camera.device_id(),
        frames = summary.frames(),
        bytes = summary.bytes,
        "Recording finished"
    );
    Ok(summary)
}

async fn write_frames<C: Camera>(
    camera: &mut C,
    options: &RecordOptions,
    session: &CancellationToken,
) -> Result<RecordSummary> {
    let mut summary = RecordSummary::default();
    let mut frames = camera.frames(session);

    let timer = tokio::time::sleep(options.duration.unwrap_or(Duration::MAX));
    tokio::pin!(timer);

    loop {
        if options
            .max_frames
            .is_some_and(|max| summary.frames() >= max)
        {
            break;
        }

        let frame = tokio::select! {
            biased;
            _ = &mut timer, if options.duration.is_some() && !session.is_cancelled() => {
                debug!("Recording duration elapsed");
                session.cancel();
                continue;
            }
            next = frames.next() => match next {
                Some(frame) => frame?,
                None => break,
            },
        };

        let index = summary.frames() + 1;
        let path = options
            .directory
            .join(format!("frame-{:06}.{}", index, frame.file_extension()));
        write_frame_file(&path, &frame.data).await?;

        summary.bytes += frame.len() as u64;
        summary.files.push(path);
    }

    Ok(summary)
}

/// Write `data` to `path` through a temporary sibling and a rename.
async fn write_frame_file(path: &Path, data: &[u8]) -> Result<()> {
    let partial = path.with_extension("part");
    if let Err(e) = tokio::fs::write(&partial, data).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(e.into());
    }
    tokio::fs::rename(&partial, path).await?;
    Ok(())
}
