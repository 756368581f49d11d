//! Core value types for the devlink device abstraction layer.
//!
//! This crate holds everything the transport, protocol and device crates
//! share: endpoint addresses, capability tags, device status, profiles and
//! the data objects exchanged with cameras and scanners.

pub mod address;
pub mod constants;
pub mod error;
pub mod logging;
pub mod profile;
pub mod types;

pub use address::EndpointAddress;
pub use error::{Error, Result};
pub use profile::{DeviceProfile, PrinterProfile, SUPPORTED_CODEPAGES};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
