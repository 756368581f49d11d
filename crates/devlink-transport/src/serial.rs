//! Serial port transport built on the `serialport` crate.
//!
//! The `serialport` driver is blocking, so every operation runs on Tokio's
//! blocking pool. The port sits behind an `Arc<Mutex<..>>` so an operation
//! abandoned through cancellation can finish on the pool without holding
//! the transport hostage; its next call simply waits for the lock.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serialport::SerialPort;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use devlink_core::EndpointAddress;
use devlink_core::constants::SCHEME_SERIAL;

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::transport::Transport;

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// Serial transport (`serial:///dev/ttyUSB0`, `serial://COM3`).
pub struct SerialTransport {
    config: TransportConfig,
    port: Option<SharedPort>,
    path: Option<String>,
}

impl SerialTransport {
    /// Create a closed serial transport.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            port: None,
            path: None,
        }
    }

    /// Device path while open.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .field("baud_rate", &self.config.serial_baud_rate)
            .field("open", &self.port.is_some())
            .finish()
    }
}

fn lock_port(port: &SharedPort) -> io::Result<std::sync::MutexGuard<'_, Box<dyn SerialPort>>> {
    port.lock()
        .map_err(|_| io::Error::other("serial port lock poisoned"))
}

async fn run_blocking<T: Send + 'static>(
    cancel: &CancellationToken,
    timeout: Duration,
    on_timeout: fn(Duration) -> TransportError,
    task: JoinHandle<io::Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        joined = task => match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => Err(on_timeout(timeout)),
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(io::Error::other(e).into()),
        },
    }
}

impl Transport for SerialTransport {
    fn scheme(&self) -> &'static str {
        SCHEME_SERIAL
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    async fn open(
        &mut self,
        address: &EndpointAddress,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(path) = &self.path {
            return Err(TransportError::AlreadyOpen {
                target: path.clone(),
            });
        }

        let path = address
            .path()
            .ok_or_else(|| TransportError::invalid_address(SCHEME_SERIAL, "port path required"))?
            .to_string();
        let baud_rate = self.config.serial_baud_rate;
        let timeout = self.config.io_timeout;

        info!(%path, baud_rate, "Opening serial transport");

        let builder_path = path.clone();
        let task = tokio::task::spawn_blocking(move || {
            serialport::new(builder_path, baud_rate)
                .timeout(timeout)
                .open()
        });

        let port = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            joined = task => joined.map_err(io::Error::other)??,
        };

        debug!(%path, "Serial transport open");
        self.port = Some(Arc::new(Mutex::new(port)));
        self.path = Some(path);
        Ok(())
    }

    async fn send(&mut self, data: &[u8], cancel: &CancellationToken) -> Result<usize> {
        let port = self.port.clone().ok_or(TransportError::NotOpen)?;
        let payload = data.to_vec();

        let task = tokio::task::spawn_blocking(move || -> io::Result<usize> {
            let mut port = lock_port(&port)?;
            port.write_all(&payload)?;
            port.flush()?;
            Ok(payload.len())
        });

        let written = run_blocking(
            cancel,
            self.config.io_timeout,
            TransportError::write_timeout,
            task,
        )
        .await?;
        trace!(bytes = written, "Serial send");
        Ok(written)
    }

    async fn receive(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<usize> {
        let port = self.port.clone().ok_or(TransportError::NotOpen)?;
        let capacity = buf.len();

        let task = tokio::task::spawn_blocking(move || -> io::Result<Vec<u8>> {
            let mut port = lock_port(&port)?;
            let mut chunk = vec![0u8; capacity];
            let read = port.read(&mut chunk)?;
            chunk.truncate(read);
            Ok(chunk)
        });

        let chunk = run_blocking(
            cancel,
            self.config.io_timeout,
            TransportError::read_timeout,
            task,
        )
        .await?;
        buf[..chunk.len()].copy_from_slice(&chunk);
        trace!(bytes = chunk.len(), "Serial receive");
        Ok(chunk.len())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(port) = self.port.take() else {
            return Ok(());
        };
        let path = self.path.take().unwrap_or_default();
        info!(%path, "Closing serial transport");

        let flush = tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut port = lock_port(&port)?;
            port.flush()
        });
        match tokio::time::timeout(self.config.close_timeout, flush).await {
            Ok(Ok(Ok(()))) => debug!("Flush completed successfully"),
            Ok(Ok(Err(e))) => warn!("Error flushing during close: {}", e),
            Ok(Err(e)) => warn!("Flush task failed during close: {}", e),
            Err(_) => warn!(
                "Flush timeout during close ({}ms)",
                self.config.close_timeout.as_millis()
            ),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_receive_before_open() {
        let cancel = CancellationToken::new();
        let mut transport = SerialTransport::new(TransportConfig::default());
        let mut buf = [0u8; 4];

        assert!(matches!(
            transport.send(b"x", &cancel).await,
            Err(TransportError::NotOpen)
        ));
        assert!(matches!(
            transport.receive(&mut buf, &cancel).await,
            Err(TransportError::NotOpen)
        ));
    }

    #[tokio::test]
    async fn test_open_requires_path() {
        let mut transport = SerialTransport::new(TransportConfig::default());
        let address = EndpointAddress::tcp("localhost", 1).unwrap();
        let result = transport.open(&address, &CancellationToken::new()).await;
        assert!(matches!(result, Err(TransportError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_open_missing_device_fails() {
        let mut transport = SerialTransport::new(TransportConfig::default());
        let address = EndpointAddress::serial("/dev/devlink-no-such-port").unwrap();
        let result = transport.open(&address, &CancellationToken::new()).await;
        assert!(result.is_err());
        assert!(!transport.is_open());
    }

    #[tokio::test]
    async fn test_close_when_not_open() {
        let mut transport = SerialTransport::new(TransportConfig::default());
        transport.close().await.unwrap();
        transport.close().await.unwrap();
    }
}
