//! Printer reached through the host's print spooler.

use std::path::Path;
use std::sync::Arc;

use devlink_core::{Capability, DeviceInfo, DeviceProfile, DeviceStatus, EndpointAddress};
use devlink_escpos::{BarcodeType, QrErrorLevel};
use devlink_transport::{AnyTransport, CancellationToken};
use tokio::sync::watch;
use tracing::info;

use crate::backend::{PrinterBackend, run_backend};
use crate::error::{DeviceError, Result};
use crate::lifecycle::{DeviceCore, DeviceHooks};
use crate::traits::{Device, PrintJob, Printer, describe};

const CAPABILITIES: &[Capability] = &[Capability::Printer];

#[derive(Debug)]
struct SpoolerHooks {
    profile: DeviceProfile,
    printer_name: String,
    backend: Arc<dyn PrinterBackend>,
}

impl SpoolerHooks {
    async fn check_available(&self, cancel: &CancellationToken) -> Result<()> {
        let name = self.printer_name.clone();
        let available = run_backend(&self.backend, cancel, move |b| b.is_available(&name)).await?;
        if available {
            Ok(())
        } else {
            Err(DeviceError::unavailable(&self.printer_name))
        }
    }
}

impl DeviceHooks for SpoolerHooks {
    async fn on_initialize(
        &mut self,
        _transport: &mut AnyTransport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.check_available(cancel).await
    }

    async fn on_reset(
        &mut self,
        _transport: &mut AnyTransport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.check_available(cancel).await
    }
}

/// Document printer driven through a [`PrinterBackend`].
///
/// The spooler renders text and files itself, so raw ESC/POS operations
/// (barcodes, QR codes, feed and cut) are unsupported.
///
/// The spooler queue name comes from the profile option `printer_name`,
/// falling back to the address path (`sdk://spooler/Kitchen`).
#[derive(Debug)]
pub struct SpoolerPrinter {
    core: DeviceCore<SpoolerHooks>,
}

impl SpoolerPrinter {
    /// Create a disconnected spooler printer.
    ///
    /// # Errors
    ///
    /// Returns an invalid profile error if no printer name can be derived.
    pub fn new(
        device_id: impl Into<String>,
        address: EndpointAddress,
        transport: AnyTransport,
        profile: DeviceProfile,
        backend: Arc<dyn PrinterBackend>,
    ) -> Result<Self> {
        let printer_name = profile
            .option("printer_name")
            .or_else(|| address.path())
            .map(|name| name.trim_start_matches('/').to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| devlink_core::Error::invalid_profile("printer_name is required"))?;

        let hooks = SpoolerHooks {
            profile,
            printer_name,
            backend,
        };
        Ok(Self {
            core: DeviceCore::new(device_id, address, transport, hooks),
        })
    }

    /// Spooler queue this printer submits to.
    pub fn printer_name(&self) -> &str {
        &self.core.hooks().printer_name
    }

    fn unsupported<T>(&self, operation: &str) -> Result<T> {
        Err(DeviceError::unsupported(self.core.device_id(), operation))
    }
}

impl Device for SpoolerPrinter {
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
            Capability::Printer,
            &self.core.hooks().profile,
        )
    }

    async fn connect(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.core.connect(cancel).await
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.core.disconnect().await
    }

    async fn reset(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.core.reset(cancel).await
    }
}

impl Printer for SpoolerPrinter {
    async fn print_text(&mut self, text: &str, cancel: &CancellationToken) -> Result<PrintJob> {
        let op = self.core.begin("print_text")?;
        let backend = Arc::clone(&op.hooks().backend);
        let name = op.hooks().printer_name.clone();
        let payload = text.to_string();

        let submitted = run_backend(&backend, cancel, move |b| b.print_text(&name, &payload)).await;
        let job_id = op.finish(submitted)?;

        info!(device_id = %self.core.device_id(), %job_id, "Text submitted to spooler");
        Ok(PrintJob {
            job_id: Some(job_id),
            bytes: text.len(),
        })
    }

    async fn print_file(&mut self, path: &Path, cancel: &CancellationToken) -> Result<PrintJob> {
        self.core.ensure_ready()?;
        let bytes = tokio::fs::metadata(path).await?.len();

        let op = self.core.begin("print_file")?;
        let backend = Arc::clone(&op.hooks().backend);
        let name = op.hooks().printer_name.clone();
        let file = path.to_path_buf();

        let submitted = run_backend(&backend, cancel, move |b| b.print_file(&name, &file)).await;
        let job_id = op.finish(submitted)?;

        info!(device_id = %self.core.device_id(), %job_id, path = %path.display(), "File submitted to spooler");
        Ok(PrintJob {
            job_id: Some(job_id),
            bytes: usize::try_from(bytes).unwrap_or(usize::MAX),
        })
    }

    async fn print_raw(&mut self, _bytes: &[u8], _cancel: &CancellationToken) -> Result<PrintJob> {
        self.unsupported("print_raw")
    }

    async fn print_barcode(
        &mut self,
        _data: &str,
        _kind: BarcodeType,
        _height: i32,
        _width: i32,
        _cancel: &CancellationToken,
    ) -> Result<PrintJob> {
        self.unsupported("print_barcode")
    }

    async fn print_qr(
        &mut self,
        _data: &str,
        _size: i32,
        _level: QrErrorLevel,
        _cancel: &CancellationToken,
    ) -> Result<PrintJob> {
        self.unsupported("print_qr")
    }

    async fn feed(&mut self, _lines: u8, _cancel: &CancellationToken) -> Result<()> {
        self.unsupported("feed")
    }

    async fn cut(&mut self, _cancel: &CancellationToken) -> Result<()> {
        self.unsupported("cut")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, UnsupportedPlatform};
    use devlink_core::DeviceState;
    use devlink_transport::SdkTransport;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeSpooler {
        jobs: Mutex<Vec<(String, String)>>,
    }

    impl PrinterBackend for FakeSpooler {
        fn available_printers(&self) -> std::result::Result<Vec<String>, BackendError> {
            Ok(vec!["Front Desk".to_string()])
        }

        fn is_available(&self, name: &str) -> std::result::Result<bool, BackendError> {
            Ok(name == "Front Desk")
        }

        fn print_text(&self, name: &str, text: &str) -> std::result::Result<String, BackendError> {
            let mut jobs = self.jobs.lock().unwrap();
            jobs.push((name.to_string(), text.to_string()));
            Ok(format!("job-{}", jobs.len()))
        }

        fn print_file(&self, _name: &str, _path: &Path) -> std::result::Result<String, BackendError> {
            Err(BackendError::Failed("paper jam".to_string()))
        }
    }

    fn spooler(name: &str, backend: Arc<dyn PrinterBackend>) -> SpoolerPrinter {
        SpoolerPrinter::new(
            "printer-2",
            EndpointAddress::sdk(Some("spooler"), None).unwrap(),
            SdkTransport::new().into(),
            DeviceProfile::new("Generic", "Spooler", "spooler").with_option("printer_name", name),
            backend,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_print_text_returns_job_id() {
        let cancel = CancellationToken::new();
        let backend = Arc::new(FakeSpooler::default());
        let mut printer = spooler("Front Desk", backend.clone());

        printer.connect(&cancel).await.unwrap();
        let job = printer.print_text("hello", &cancel).await.unwrap();

        assert_eq!(job.job_id.as_deref(), Some("job-1"));
        assert_eq!(job.bytes, 5);
        assert_eq!(printer.status().state, DeviceState::Ready);
        assert_eq!(
            backend.jobs.lock().unwrap().as_slice(),
            &[("Front Desk".to_string(), "hello".to_string())]
        );
    }

    #[tokio::test]
    async fn test_missing_queue_fails_connect() {
        let mut printer = spooler("Back Office", Arc::new(FakeSpooler::default()));
        let result = printer.connect(&CancellationToken::new()).await;
        assert!(matches!(result, Err(DeviceError::DeviceUnavailable { .. })));
        assert_eq!(printer.status().state, DeviceState::Disconnected);
    }

    #[tokio::test]
    async fn test_unsupported_platform_fails_connect() {
        let mut printer = spooler("Front Desk", Arc::new(UnsupportedPlatform));
        let result = printer.connect(&CancellationToken::new()).await;
        assert!(matches!(result, Err(DeviceError::NotImplemented { .. })));
    }

    #[tokio::test]
    async fn test_backend_failure_sets_error() {
        let cancel = CancellationToken::new();
        let mut printer = spooler("Front Desk", Arc::new(FakeSpooler::default()));
        printer.connect(&cancel).await.unwrap();

        let file = tempfile::NamedTempFile::new().unwrap();
        let result = printer.print_file(file.path(), &cancel).await;
        assert!(matches!(result, Err(DeviceError::Backend { .. })));
        assert_eq!(printer.status().state, DeviceState::Error);

        printer.reset(&cancel).await.unwrap();
        assert_eq!(printer.status().state, DeviceState::Ready);
    }

    #[tokio::test]
    async fn test_raw_operations_unsupported() {
        let cancel = CancellationToken::new();
        let mut printer = spooler("Front Desk", Arc::new(FakeSpooler::default()));
        printer.connect(&cancel).await.unwrap();

        assert!(matches!(
            printer.print_raw(&[0x1B, 0x40], &cancel).await,
            Err(DeviceError::Unsupported { .. })
        ));
        assert!(matches!(
            printer.cut(&cancel).await,
            Err(DeviceError::Unsupported { .. })
        ));
        assert_eq!(printer.status().state, DeviceState::Ready);
    }

    #[test]
    fn test_printer_name_from_address_path() {
        let printer = SpoolerPrinter::new(
            "printer-3",
            EndpointAddress::sdk(Some("spooler"), Some("Kitchen")).unwrap(),
            SdkTransport::new().into(),
            DeviceProfile::new("Generic", "Spooler", "spooler"),
            Arc::new(UnsupportedPlatform),
        )
        .unwrap();
        assert_eq!(printer.printer_name(), "Kitchen");
    }
}
