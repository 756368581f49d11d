//! Platform printer and scanner backends.
//!
//! Spoolers and scanner stacks (CUPS, WIA, SANE, vendor drivers) are reached
//! through these traits. Their APIs are blocking, so devices call them on
//! Tokio's blocking pool through [`run_backend`].
//!
//! No platform backend ships with this crate. [`UnsupportedPlatform`] reports
//! every operation as not implemented, which devices surface as a hard
//! [`DeviceError::NotImplemented`] failure rather than a silent success.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use devlink_core::{ScannedImage, ScannerSettings};
use devlink_transport::CancellationToken;

use crate::error::{DeviceError, Result};

/// Errors reported by a platform backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend does not implement the operation on this platform.
    #[error("Not implemented: {operation}")]
    NotImplemented { operation: String },

    /// No printer or scanner with this name is installed.
    #[error("Device not found: {name}")]
    DeviceNotFound { name: String },

    /// The backend call failed.
    #[error("{0}")]
    Failed(String),
}

impl BackendError {
    /// Create a new not implemented error.
    pub fn not_implemented(operation: impl Into<String>) -> Self {
        Self::NotImplemented {
            operation: operation.into(),
        }
    }
}

impl From<BackendError> for DeviceError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::NotImplemented { operation } => Self::NotImplemented { operation },
            BackendError::DeviceNotFound { name } => Self::DeviceUnavailable { name },
            BackendError::Failed(message) => Self::Backend { message },
        }
    }
}

/// Host printing system.
pub trait PrinterBackend: Send + Sync + fmt::Debug {
    /// Names of installed printers.
    fn available_printers(&self) -> std::result::Result<Vec<String>, BackendError>;

    /// Whether `name` is currently installed and reachable.
    fn is_available(&self, name: &str) -> std::result::Result<bool, BackendError>;

    /// Submit `text` to printer `name`, returning the spooler job id.
    fn print_text(&self, name: &str, text: &str) -> std::result::Result<String, BackendError>;

    /// Submit the file at `path` to printer `name`, returning the job id.
    fn print_file(&self, name: &str, path: &Path) -> std::result::Result<String, BackendError>;
}

/// Host scanning system.
pub trait ScannerBackend: Send + Sync + fmt::Debug {
    /// Names of attached scanners.
    fn available_scanners(&self) -> std::result::Result<Vec<String>, BackendError>;

    /// Whether `name` is currently attached.
    fn is_available(&self, name: &str) -> std::result::Result<bool, BackendError>;

    /// Scan one page from scanner `name`.
    fn scan(
        &self,
        name: &str,
        settings: &ScannerSettings,
    ) -> std::result::Result<ScannedImage, BackendError>;
}

/// Backend for platforms without printing or scanning support.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedPlatform;

impl PrinterBackend for UnsupportedPlatform {
    fn available_printers(&self) -> std::result::Result<Vec<String>, BackendError> {
        Err(BackendError::not_implemented("available_printers"))
    }

    fn is_available(&self, _name: &str) -> std::result::Result<bool, BackendError> {
        Err(BackendError::not_implemented("is_available"))
    }

    fn print_text(&self, _name: &str, _text: &str) -> std::result::Result<String, BackendError> {
        Err(BackendError::not_implemented("print_text"))
    }

    fn print_file(&self, _name: &str, _path: &Path) -> std::result::Result<String, BackendError> {
        Err(BackendError::not_implemented("print_file"))
    }
}

impl ScannerBackend for UnsupportedPlatform {
    fn available_scanners(&self) -> std::result::Result<Vec<String>, BackendError> {
        Err(BackendError::not_implemented("available_scanners"))
    }

    fn is_available(&self, _name: &str) -> std::result::Result<bool, BackendError> {
        Err(BackendError::not_implemented("is_available"))
    }

    fn scan(
        &self,
        _name: &str,
        _settings: &ScannerSettings,
    ) -> std::result::Result<ScannedImage, BackendError> {
        Err(BackendError::not_implemented("scan"))
    }
}

/// Run a blocking backend call on the blocking pool, bounded by `cancel`.
///
/// Cancellation abandons the call; the backend finishes it in the background.
pub(crate) async fn run_backend<B, T, F>(
    backend: &Arc<B>,
    cancel: &CancellationToken,
    call: F,
) -> Result<T>
where
    B: ?Sized + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&B) -> std::result::Result<T, BackendError> + Send + 'static,
{
    let backend = Arc::clone(backend);
    let task = tokio::task::spawn_blocking(move || call(&*backend));

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeviceError::Cancelled),
        joined = task => match joined {
            Ok(result) => result.map_err(Into::into),
            Err(e) => Err(DeviceError::TaskFailed { reason: e.to_string() }),
        },
    }
}
