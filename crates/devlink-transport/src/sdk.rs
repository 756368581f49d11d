//! Pass-through transport for devices driven by an in-process vendor library.
//!
//! The vendor SDK owns the real connection, so this transport only tracks
//! open/closed state: `send` reports the full payload length immediately and
//! `receive` returns zero bytes.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use devlink_core::EndpointAddress;
use devlink_core::constants::SCHEME_SDK;

use crate::error::{Result, TransportError};
use crate::transport::Transport;

/// No-op transport for SDK-backed devices.
#[derive(Debug, Default)]
pub struct SdkTransport {
    address: Option<EndpointAddress>,
}

impl SdkTransport {
    /// Create a closed SDK transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Address passed to `open`, while open.
    pub fn address(&self) -> Option<&EndpointAddress> {
        self.address.as_ref()
    }
}

impl Transport for SdkTransport {
    fn scheme(&self) -> &'static str {
        SCHEME_SDK
    }

    fn is_open(&self) -> bool {
        self.address.is_some()
    }

    async fn open(
        &mut self,
        address: &EndpointAddress,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        if self.address.is_some() {
            return Err(TransportError::AlreadyOpen {
                target: address.to_string(),
            });
        }
        debug!(%address, "SDK transport open");
        self.address = Some(address.clone());
        Ok(())
    }

    async fn send(&mut self, data: &[u8], cancel: &CancellationToken) -> Result<usize> {
        if self.address.is_none() {
            return Err(TransportError::NotOpen);
        }
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        Ok(data.len())
    }

    async fn receive(&mut self, _buf: &mut [u8], cancel: &CancellationToken) -> Result<usize> {
        if self.address.is_none() {
            return Err(TransportError::NotOpen);
        }
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        Ok(0)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(address) = self.address.take() {
            debug!(%address, "SDK transport closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> EndpointAddress {
        EndpointAddress::sdk(Some("acme"), Some("cam0")).unwrap()
    }

    #[tokio::test]
    async fn test_send_receive_before_open() {
        let cancel = CancellationToken::new();
        let mut transport = SdkTransport::new();
        let mut buf = [0u8; 8];

        assert!(matches!(
            transport.send(b"abc", &cancel).await,
            Err(TransportError::NotOpen)
        ));
        assert!(matches!(
            transport.receive(&mut buf, &cancel).await,
            Err(TransportError::NotOpen)
        ));
    }

    #[tokio::test]
    async fn test_pass_through_semantics() {
        let cancel = CancellationToken::new();
        let mut transport = SdkTransport::new();
        transport.open(&address(), &cancel).await.unwrap();
        assert!(transport.is_open());

        assert_eq!(transport.send(&[1, 2, 3, 4, 5], &cancel).await.unwrap(), 5);

        let mut buf = [0xAAu8; 8];
        assert_eq!(transport.receive(&mut buf, &cancel).await.unwrap(), 0);
        assert_eq!(buf, [0xAA; 8]);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let cancel = CancellationToken::new();
        let mut transport = SdkTransport::new();
        transport.open(&address(), &cancel).await.unwrap();

        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_open());
        assert!(matches!(
            transport.send(b"x", &cancel).await,
            Err(TransportError::NotOpen)
        ));
    }

    #[tokio::test]
    async fn test_open_twice_rejected() {
        let cancel = CancellationToken::new();
        let mut transport = SdkTransport::new();
        transport.open(&address(), &cancel).await.unwrap();
        assert!(matches!(
            transport.open(&address(), &cancel).await,
            Err(TransportError::AlreadyOpen { .. })
        ));
    }
}
