//! Raw TCP byte-stream transport.
//!
//! Used by network receipt printers (port 9100), IP cameras streaming MJPEG
//! and network relay boards. The transport performs a real TCP handshake and
//! writes bytes verbatim; it never frames or buffers payloads.
//!
//! # Design Principles
//!
//! - **No automatic retry**: caller decides retry strategy
//! - **One connection per device**: transports are never shared
//! - **TCP_NODELAY**: small command writes go out immediately

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use devlink_core::EndpointAddress;
use devlink_core::constants::SCHEME_TCP;

use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::transport::{Transport, guarded};

/// TCP transport.
///
/// # Example
///
/// ```no_run
/// use devlink_core::EndpointAddress;
/// use devlink_transport::{TcpTransport, Transport, TransportConfig};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cancel = CancellationToken::new();
/// let mut transport = TcpTransport::new(TransportConfig::default());
///
/// transport.open(&"tcp://192.168.0.50:9100".parse()?, &cancel).await?;
/// transport.send(&[0x1B, 0x40], &cancel).await?;
/// transport.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TcpTransport {
    config: TransportConfig,

    /// Connected stream (None if not open)
    stream: Option<TcpStream>,

    /// `host:port` of the open connection, for logging
    peer: Option<String>,
}

impl TcpTransport {
    /// Create a closed TCP transport.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            stream: None,
            peer: None,
        }
    }

    /// Remote `host:port` while open.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }
}

impl Transport for TcpTransport {
    fn scheme(&self) -> &'static str {
        SCHEME_TCP
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn open(
        &mut self,
        address: &EndpointAddress,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if let Some(peer) = &self.peer {
            return Err(TransportError::AlreadyOpen {
                target: peer.clone(),
            });
        }

        let (host, port) = address
            .socket_target()
            .ok_or_else(|| TransportError::invalid_address(SCHEME_TCP, "host and port required"))?;
        let target = format!("{}:{}", host, port);

        info!(%target, "Opening TCP transport");

        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            result = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect((host, port))) => {
                match result {
                    Ok(Ok(stream)) => stream,
                    Ok(Err(source)) => {
                        error!(%target, "Connection failed: {}", source);
                        return Err(TransportError::ConnectionFailed { target, source });
                    }
                    Err(_) => {
                        warn!(%target, "Connection timeout after {}ms", self.config.connect_timeout.as_millis());
                        return Err(TransportError::connect_timeout(self.config.connect_timeout));
                    }
                }
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {} - command latency may be impacted", e);
        }

        debug!(%target, "TCP transport open");
        self.stream = Some(stream);
        self.peer = Some(target);
        Ok(())
    }

    async fn send(&mut self, data: &[u8], cancel: &CancellationToken) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotOpen)?;

        guarded(
            cancel,
            self.config.io_timeout,
            TransportError::write_timeout,
            stream.write_all(data),
        )
        .await?;

        trace!(bytes = data.len(), "TCP send");
        Ok(data.len())
    }

    async fn receive(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotOpen)?;

        let read = guarded(
            cancel,
            self.config.io_timeout,
            TransportError::read_timeout,
            stream.read(buf),
        )
        .await?;

        if read == 0 && !buf.is_empty() {
            warn!(peer = ?self.peer, "Connection closed by peer");
            return Err(TransportError::ConnectionLost(
                "peer closed connection".to_string(),
            ));
        }

        trace!(bytes = read, "TCP receive");
        Ok(read)
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        let peer = self.peer.take().unwrap_or_default();
        info!(%peer, "Closing TCP transport");

        let close_timeout = self.config.close_timeout;
        match tokio::time::timeout(close_timeout, stream.flush()).await {
            Ok(Ok(())) => debug!("Flush completed successfully"),
            Ok(Err(e)) => warn!("Error flushing during close: {}", e),
            Err(_) => warn!("Flush timeout during close ({}ms)", close_timeout.as_millis()),
        }

        match tokio::time::timeout(close_timeout, stream.shutdown()).await {
            Ok(Ok(())) => debug!("Shutdown completed successfully"),
            Ok(Err(e)) => warn!("Error during shutdown: {}", e),
            Err(_) => warn!(
                "Shutdown timeout during close ({}ms)",
                close_timeout.as_millis()
            ),
        }

        Ok(())
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.stream.is_some() {
            debug!(peer = ?self.peer, "TcpTransport dropped while open - socket will be closed");
        }
    }
}
