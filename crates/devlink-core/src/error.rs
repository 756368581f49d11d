//! Error types shared by every devlink crate.
//!
//! This module covers failures that do not belong to a particular transport
//! or device: malformed endpoint addresses, inconsistent profiles, rejected
//! capture options and logging setup.

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or validating core value types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An endpoint address could not be parsed or violates its scheme rules.
    #[error("Invalid endpoint address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// A device or printer profile is inconsistent.
    #[error("Invalid profile: {reason}")]
    InvalidProfile { reason: String },

    /// Capture or scan options were rejected.
    #[error("Invalid options: {reason}")]
    InvalidOptions { reason: String },

    /// The tracing subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

impl Error {
    /// Create a new invalid address error.
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid profile error.
    pub fn invalid_profile(reason: impl Into<String>) -> Self {
        Self::InvalidProfile {
            reason: reason.into(),
        }
    }

    /// Create a new invalid options error.
    pub fn invalid_options(reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            reason: reason.into(),
        }
    }
}
