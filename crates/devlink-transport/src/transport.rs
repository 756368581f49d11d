//! The byte-level transport contract.
//!
//! A transport opens a connection to an [`EndpointAddress`], moves raw byte
//! buffers in both directions and releases its resources on close. It imposes
//! no framing; the device protocol riding on top owns the byte layout.
//!
//! All methods use native `async fn` in traits (Edition 2024), so transports
//! are dispatched through the [`AnyTransport`](crate::AnyTransport) enum
//! rather than trait objects.

#![allow(async_fn_in_trait)]

use std::future::Future;
use std::time::Duration;

use devlink_core::EndpointAddress;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TransportError};

/// Byte-level connection to a device.
///
/// # Contract
///
/// - `send`/`receive` before `open` fail with [`TransportError::NotOpen`].
/// - Every suspension point returns [`TransportError::Cancelled`] promptly
///   once `cancel` fires.
/// - `close` is idempotent, and dropping an open transport releases the
///   underlying handle.
pub trait Transport: Send {
    /// Scheme this transport serves (e.g. `"tcp"`).
    fn scheme(&self) -> &'static str;

    /// Whether `open` has succeeded and `close` has not been called since.
    fn is_open(&self) -> bool;

    /// Connect to `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address lacks the parts this transport needs,
    /// the endpoint is unreachable, the attempt times out or is cancelled.
    async fn open(&mut self, address: &EndpointAddress, cancel: &CancellationToken)
    -> Result<()>;

    /// Write `data`, returning the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotOpen`] before `open`, or an I/O, timeout
    /// or cancellation error.
    async fn send(&mut self, data: &[u8], cancel: &CancellationToken) -> Result<usize>;

    /// Read into `buf`, returning the number of bytes read.
    ///
    /// `Ok(0)` means the transport has nothing to deliver (the SDK
    /// pass-through never carries bytes). A byte stream closed by its peer
    /// is not reported as `Ok(0)`: it fails with
    /// [`TransportError::ConnectionLost`], so a zero count never stands for
    /// end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotOpen`] before `open`,
    /// [`TransportError::ConnectionLost`] once the peer closed the stream, or
    /// an I/O, timeout or cancellation error.
    async fn receive(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> Result<usize>;

    /// Release the connection. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error only if releasing fails in a way the caller should
    /// know about; the handle is dropped either way.
    async fn close(&mut self) -> Result<()>;
}

/// Run an I/O future bounded by a timeout and a cancellation signal.
///
/// Cancellation wins over a simultaneously completed operation so that a
/// fired signal is always observed.
pub(crate) async fn guarded<T, F>(
    cancel: &CancellationToken,
    timeout: Duration,
    on_timeout: fn(Duration) -> TransportError,
    operation: F,
) -> Result<T>
where
    F: Future<Output = std::io::Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled),
        result = tokio::time::timeout(timeout, operation) => match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(on_timeout(timeout)),
        },
    }
}
