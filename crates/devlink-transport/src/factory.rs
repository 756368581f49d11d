//! Scheme-to-transport mapping.
//!
//! The factory is a closed, explicit table populated at composition time.
//! There is no dynamic discovery: a scheme nobody registered is an error.

use std::collections::HashMap;

#[cfg(feature = "serial")]
use devlink_core::constants::SCHEME_SERIAL;
use devlink_core::constants::{SCHEME_SDK, SCHEME_TCP};
use tracing::debug;

use crate::any::AnyTransport;
use crate::config::TransportConfig;
use crate::error::{Result, TransportError};
use crate::sdk::SdkTransport;
#[cfg(feature = "serial")]
use crate::serial::SerialTransport;
use crate::tcp::TcpTransport;

/// Constructor registered for a scheme.
pub type TransportConstructor = fn(&TransportConfig) -> AnyTransport;

/// Maps scheme strings to transport constructors.
///
/// # Example
///
/// ```
/// use devlink_transport::{Transport, TransportError, TransportFactory};
///
/// let factory = TransportFactory::with_defaults(Default::default());
///
/// let transport = factory.create("tcp").unwrap();
/// assert_eq!(transport.scheme(), "tcp");
///
/// assert!(matches!(
///     factory.create("carrier-pigeon"),
///     Err(TransportError::UnsupportedScheme { .. })
/// ));
/// ```
#[derive(Debug, Clone)]
pub struct TransportFactory {
    config: TransportConfig,
    constructors: HashMap<String, TransportConstructor>,
}

impl TransportFactory {
    /// Create a factory with no schemes registered.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            config,
            constructors: HashMap::new(),
        }
    }

    /// Create a factory with `tcp`, `sdk` and (with the `serial` feature)
    /// `serial` registered.
    pub fn with_defaults(config: TransportConfig) -> Self {
        let mut factory = Self::new(config);
        factory.register(SCHEME_TCP, |config| {
            TcpTransport::new(config.clone()).into()
        });
        factory.register(SCHEME_SDK, |_| SdkTransport::new().into());
        #[cfg(feature = "serial")]
        factory.register(SCHEME_SERIAL, |config| {
            SerialTransport::new(config.clone()).into()
        });
        factory
    }

    /// Register (or replace) the constructor for `scheme`.
    ///
    /// Schemes are case-insensitive.
    pub fn register(&mut self, scheme: &str, constructor: TransportConstructor) -> &mut Self {
        self.constructors
            .insert(scheme.to_ascii_lowercase(), constructor);
        self
    }

    /// Create a closed transport for `scheme`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::UnsupportedScheme`] if no constructor is
    /// registered for the scheme. No transport is created in that case.
    pub fn create(&self, scheme: &str) -> Result<AnyTransport> {
        let constructor = self
            .constructors
            .get(&scheme.to_ascii_lowercase())
            .ok_or_else(|| TransportError::unsupported_scheme(scheme))?;

        debug!(%scheme, "Creating transport");
        Ok(constructor(&self.config))
    }

    /// Whether a constructor is registered for `scheme`.
    pub fn supports(&self, scheme: &str) -> bool {
        self.constructors
            .contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes in sorted order.
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Configuration handed to every constructor.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Default for TransportFactory {
    fn default() -> Self {
        Self::with_defaults(TransportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Transport;
    use rstest::rstest;

    #[rstest]
    #[case("tcp", "tcp")]
    #[case("TCP", "tcp")]
    #[case("sdk", "sdk")]
    fn test_create_registered(#[case] scheme: &str, #[case] expected: &str) {
        let factory = TransportFactory::default();
        let transport = factory.create(scheme).unwrap();
        assert_eq!(transport.scheme(), expected);
        assert!(!transport.is_open());
    }

    #[rstest]
    #[case("")]
    #[case("usb")]
    #[case("bluetooth")]
    #[case("http")]
    fn test_create_unknown_scheme(#[case] scheme: &str) {
        let factory = TransportFactory::default();
        match factory.create(scheme) {
            Err(TransportError::UnsupportedScheme { scheme: reported }) => {
                assert_eq!(reported, scheme)
            }
            other => panic!("expected UnsupportedScheme, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_factory_rejects_everything() {
        let factory = TransportFactory::new(TransportConfig::default());
        assert!(factory.schemes().is_empty());
        assert!(factory.create("tcp").is_err());
    }

    #[test]
    fn test_register_custom_scheme() {
        let mut factory = TransportFactory::new(TransportConfig::default());
        factory.register("vendor-x", |_| SdkTransport::new().into());

        assert!(factory.supports("VENDOR-X"));
        assert_eq!(factory.create("vendor-x").unwrap().scheme(), "sdk");
    }

    #[cfg(feature = "serial")]
    #[test]
    fn test_default_schemes() {
        let factory = TransportFactory::default();
        assert_eq!(factory.schemes(), vec!["sdk", "serial", "tcp"]);
    }
}
