//! Byte-level transports for devlink devices.
//!
//! This crate hides the differences between TCP sockets, serial ports and
//! in-process vendor SDKs behind one [`Transport`] contract, and maps scheme
//! strings to concrete transports through the [`TransportFactory`].
//!
//! # Components
//!
//! - **TcpTransport**: raw TCP byte stream (receipt printers on 9100, IP cameras)
//! - **SerialTransport**: serial ports via the `serialport` crate (feature `serial`)
//! - **SdkTransport**: no-op pass-through for SDK-driven devices
//! - **AnyTransport**: enum dispatch over the above
//! - **TransportFactory**: closed scheme → transport table
//!
//! # Example
//!
//! ```no_run
//! use devlink_core::EndpointAddress;
//! use devlink_transport::{Transport, TransportFactory};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let address: EndpointAddress = "tcp://192.168.0.50:9100".parse()?;
//! let cancel = CancellationToken::new();
//!
//! let mut transport = TransportFactory::default().create(address.scheme())?;
//! transport.open(&address, &cancel).await?;
//! transport.send(b"\x1b@Hello\r\n", &cancel).await?;
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

mod any;
mod config;
mod error;
mod factory;
mod sdk;
#[cfg(feature = "serial")]
mod serial;
mod tcp;
mod transport;

pub use any::AnyTransport;
pub use config::TransportConfig;
pub use error::{Result, TransportError};
pub use factory::{TransportConstructor, TransportFactory};
pub use sdk::SdkTransport;
#[cfg(feature = "serial")]
pub use serial::SerialTransport;
pub use tcp::TcpTransport;
pub use transport::Transport;

/// Cancellation signal accepted by every suspension point.
pub use tokio_util::sync::CancellationToken;
