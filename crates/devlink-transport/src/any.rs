//! Enum wrapper for transport dispatch.
//!
//! Native `async fn` in traits is not object-safe, so devices hold an
//! [`AnyTransport`] instead of `Box<dyn Transport>`. Adding a transport means
//! adding a variant here and registering a constructor with the
//! [`TransportFactory`](crate::TransportFactory).

use devlink_core::EndpointAddress;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
#[cfg(feature = "serial")]
use crate::serial::SerialTransport;
use crate::sdk::SdkTransport;
use crate::tcp::TcpTransport;
use crate::transport::Transport;

/// Any transport known to this crate.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyTransport {
    /// Raw TCP socket.
    Tcp(TcpTransport),

    /// In-process vendor library pass-through.
    Sdk(SdkTransport),

    /// Serial port.
    #[cfg(feature = "serial")]
    Serial(SerialTransport),
}

impl Transport for AnyTransport {
    fn scheme(&self) -> &'static str {
        match self {
            Self::Tcp(t) => t.scheme(),
            Self::Sdk(t) => t.scheme(),
            #[cfg(feature = "serial")]
            Self::Serial(t) => t.scheme(),
        }
    }

    fn is_open(&self) -> bool {
        match self {
            Self::Tcp(t) => t.is_open(),
            Self::Sdk(t) => t.is_open(),
            #[cfg(feature = "serial")]
            Self::Serial(t) => t.is_open(),
        }
    }

    async fn open(
        &mut self,
        address: &EndpointAddress,
        cancel: &CancellationToken,
    ) -> Result<()> {
        match self {
            Self::Tcp(t) => t.open(address, cancel).await,
            Self::Sdk(t) => t.open(address, cancel).await,
            #[cfg(feature = "serial")]
            Self::Serial(t) => t.open(address, cancel).await,
        }
    }

    async fn send(&mut self, data: &[u8], cancel: &CancellationToken) -> Result<usize> {
        match self {
            Self::Tcp(t) => t.send(data, cancel).await,
            Self::Sdk(t) => t.send(data, cancel).await,
            #[cfg(feature = "serial")]
            Self::Serial(t) => t.send(data, cancel).await,
        }
    }

    async fn receive(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<usize> {
        match self {
            Self::Tcp(t) => t.receive(buf, cancel).await,
            Self::Sdk(t) => t.receive(buf, cancel).await,
            #[cfg(feature = "serial")]
            Self::Serial(t) => t.receive(buf, cancel).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Tcp(t) => t.close().await,
            Self::Sdk(t) => t.close().await,
            #[cfg(feature = "serial")]
            Self::Serial(t) => t.close().await,
        }
    }
}

impl From<TcpTransport> for AnyTransport {
    fn from(transport: TcpTransport) -> Self {
        Self::Tcp(transport)
    }
}

impl From<SdkTransport> for AnyTransport {
    fn from(transport: SdkTransport) -> Self {
        Self::Sdk(transport)
    }
}

#[cfg(feature = "serial")]
impl From<SerialTransport> for AnyTransport {
    fn from(transport: SerialTransport) -> Self {
        Self::Serial(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportConfig;

    #[tokio::test]
    async fn test_any_transport_dispatch() {
        let cancel = CancellationToken::new();
        let mut transport = AnyTransport::from(SdkTransport::new());
        assert_eq!(transport.scheme(), "sdk");
        assert!(!transport.is_open());

        let address = EndpointAddress::sdk(None, None).unwrap();
        transport.open(&address, &cancel).await.unwrap();
        assert_eq!(transport.send(b"abc", &cancel).await.unwrap(), 3);
        transport.close().await.unwrap();
        assert!(!transport.is_open());
    }

    #[test]
    fn test_tcp_variant() {
        let transport = AnyTransport::from(TcpTransport::new(TransportConfig::default()));
        assert_eq!(transport.scheme(), "tcp");
    }
}
