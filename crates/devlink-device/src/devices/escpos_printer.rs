//! Receipt printer speaking ESC/POS over a byte transport.
//!
//! Connecting sends `ESC @` followed by the profile's `ESC t n`, so the
//! printer starts every session from its power-on state with the codepage
//! the text encoding assumes.

use std::path::Path;

use devlink_core::{Capability, DeviceInfo, DeviceStatus, EndpointAddress, PrinterProfile};
use devlink_escpos::{BarcodeType, QrErrorLevel, ReceiptBuilder, TextEncoding, commands};
use devlink_transport::{AnyTransport, CancellationToken, Transport};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{DeviceError, Result};
use crate::lifecycle::{DeviceCore, DeviceHooks};
use crate::traits::{Device, PrintJob, Printer, describe};

const CAPABILITIES: &[Capability] = &[Capability::Printer];

#[derive(Debug)]
struct EscPosHooks {
    profile: PrinterProfile,
    encoding: TextEncoding,
}

impl EscPosHooks {
    fn init_sequence(&self) -> Vec<u8> {
        let builder = ReceiptBuilder::new(self.encoding).initialize();
        match self.profile.esc_pos_codepage {
            Some(n) => builder.codepage(n).build(),
            None => builder.build(),
        }
    }

    /// Feed and optional cut appended to every text job.
    fn trailer(&self) -> Vec<u8> {
        let builder = ReceiptBuilder::new(self.encoding).feed(self.profile.default_feed_lines);
        if self.profile.supports_cut {
            builder.cut(self.profile.partial_cut).build()
        } else {
            builder.build()
        }
    }
}

impl DeviceHooks for EscPosHooks {
    async fn on_initialize(
        &mut self,
        transport: &mut AnyTransport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        transport.send(&self.init_sequence(), cancel).await?;
        debug!(codepage = self.encoding.codepage(), "Printer initialised");
        Ok(())
    }

    async fn on_reset(
        &mut self,
        transport: &mut AnyTransport,
        cancel: &CancellationToken,
    ) -> Result<()> {
        transport.send(&self.init_sequence(), cancel).await?;
        Ok(())
    }
}

/// ESC/POS receipt printer.
///
/// Every operation encodes its command bytes first and then sends them in a
/// single write, so a job is either handed to the transport as a whole or
/// fails as a whole.
#[derive(Debug)]
pub struct EscPosPrinter {
    core: DeviceCore<EscPosHooks>,
}

impl EscPosPrinter {
    /// Create a disconnected printer.
    ///
    /// # Errors
    ///
    /// Returns an invalid profile error if the profile's codepage is not
    /// supported.
    pub fn new(
        device_id: impl Into<String>,
        address: EndpointAddress,
        transport: AnyTransport,
        profile: PrinterProfile,
    ) -> Result<Self> {
        profile.validate()?;
        let encoding = TextEncoding::from_codepage(profile.default_codepage).ok_or_else(|| {
            devlink_core::Error::invalid_profile(format!(
                "no text encoding for codepage {}",
                profile.default_codepage
            ))
        })?;

        let hooks = EscPosHooks { profile, encoding };
        Ok(Self {
            core: DeviceCore::new(device_id, address, transport, hooks),
        })
    }

    /// Profile the printer was configured with.
    pub fn profile(&self) -> &PrinterProfile {
        &self.core.hooks().profile
    }

    /// Encoding applied to text.
    pub fn encoding(&self) -> TextEncoding {
        self.core.hooks().encoding
    }

    async fn send_job(
        &mut self,
        operation: &str,
        bytes: &[u8],
        cancel: &CancellationToken,
    ) -> Result<PrintJob> {
        let mut op = self.core.begin(operation)?;
        let sent = op
            .transport()
            .send(bytes, cancel)
            .await
            .map(|written| PrintJob {
                job_id: None,
                bytes: written,
            })
            .map_err(DeviceError::from);
        let job = op.finish(sent)?;

        debug!(device_id = %self.core.device_id(), operation, bytes = job.bytes, "Print job sent");
        Ok(job)
    }
}

impl Device for EscPosPrinter {
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
            &self.core.hooks().profile.device,
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

impl Printer for EscPosPrinter {
    async fn print_text(&mut self, text: &str, cancel: &CancellationToken) -> Result<PrintJob> {
        let hooks = self.core.hooks();
        let mut bytes = commands::text(text, hooks.encoding);
        bytes.extend(hooks.trailer());
        self.send_job("print_text", &bytes, cancel).await
    }

    async fn print_file(&mut self, path: &Path, cancel: &CancellationToken) -> Result<PrintJob> {
        self.core.ensure_ready()?;
        let bytes = tokio::fs::read(path).await?;
        info!(device_id = %self.core.device_id(), path = %path.display(), bytes = bytes.len(), "Printing file");
        self.send_job("print_file", &bytes, cancel).await
    }

    async fn print_raw(&mut self, bytes: &[u8], cancel: &CancellationToken) -> Result<PrintJob> {
        self.send_job("print_raw", bytes, cancel).await
    }

    async fn print_barcode(
        &mut self,
        data: &str,
        kind: BarcodeType,
        height: i32,
        width: i32,
        cancel: &CancellationToken,
    ) -> Result<PrintJob> {
        let bytes = devlink_escpos::barcode(data, kind, height, width);
        self.send_job("print_barcode", &bytes, cancel).await
    }

    async fn print_qr(
        &mut self,
        data: &str,
        size: i32,
        level: QrErrorLevel,
        cancel: &CancellationToken,
    ) -> Result<PrintJob> {
        let bytes = devlink_escpos::qr_code(data, size, level);
        self.send_job("print_qr", &bytes, cancel).await
    }

    async fn feed(&mut self, lines: u8, cancel: &CancellationToken) -> Result<()> {
        self.send_job("feed", &commands::feed_lines(lines), cancel)
            .await
            .map(drop)
    }

    async fn cut(&mut self, cancel: &CancellationToken) -> Result<()> {
        if !self.core.hooks().profile.supports_cut {
            return Err(DeviceError::unsupported(self.core.device_id(), "cut"));
        }
        let bytes = commands::cut(self.core.hooks().profile.partial_cut);
        self.send_job("cut", &bytes, cancel).await.map(drop)
    }
}
