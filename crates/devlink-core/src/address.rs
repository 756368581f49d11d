//! Endpoint addresses identifying how a device is reached.
//!
//! An [`EndpointAddress`] is a scheme plus an optional host, port and path.
//! The scheme selects the transport; the remaining parts are interpreted by
//! that transport:
//!
//! | Scheme   | Example                        | Required parts |
//! |----------|--------------------------------|----------------|
//! | `tcp`    | `tcp://192.168.1.50:9100`      | host, port     |
//! | `serial` | `serial:///dev/ttyUSB0`        | path           |
//! | `sdk`    | `sdk://acme/camera-0`          | none           |
//!
//! Unknown schemes still parse so that the transport factory, not the parser,
//! decides whether a scheme is supported.
//!
//! # Examples
//!
//! ```
//! use devlink_core::EndpointAddress;
//!
//! let address: EndpointAddress = "tcp://10.0.0.7:9100".parse().unwrap();
//! assert_eq!(address.scheme(), "tcp");
//! assert_eq!(address.host(), Some("10.0.0.7"));
//! assert_eq!(address.port(), Some(9100));
//! assert_eq!(address.to_string(), "tcp://10.0.0.7:9100");
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{SCHEME_SDK, SCHEME_SERIAL, SCHEME_TCP};
use crate::error::{Error, Result};

/// Scheme plus host/port/path triple identifying how to reach a device.
///
/// Addresses are immutable once built. Every constructor validates the
/// per-scheme invariant, so a value in hand is always usable by the transport
/// its scheme names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EndpointAddress {
    scheme: String,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
}

impl EndpointAddress {
    /// Build an address from its parts, validating the scheme rules.
    ///
    /// The scheme is normalised to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the scheme is empty or the parts
    /// required by the scheme are missing.
    pub fn new(
        scheme: impl Into<String>,
        host: Option<String>,
        port: Option<u16>,
        path: Option<String>,
    ) -> Result<Self> {
        let address = Self {
            scheme: scheme.into().trim().to_ascii_lowercase(),
            host: host.filter(|h| !h.is_empty()),
            port,
            path: path.filter(|p| !p.is_empty()),
        };
        address.validate()?;
        Ok(address)
    }

    /// Address of a TCP endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is empty.
    pub fn tcp(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::new(SCHEME_TCP, Some(host.into()), Some(port), None)
    }

    /// Address of a serial port such as `/dev/ttyUSB0` or `COM3`.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty.
    pub fn serial(path: impl Into<String>) -> Result<Self> {
        Self::new(SCHEME_SERIAL, None, None, Some(path.into()))
    }

    /// Address of a device reached through an in-process vendor library.
    ///
    /// `vendor` lands in the host slot and `name` in the path slot; both are
    /// optional and opaque to the core.
    pub fn sdk(vendor: Option<&str>, name: Option<&str>) -> Result<Self> {
        Self::new(
            SCHEME_SDK,
            vendor.map(str::to_string),
            None,
            name.map(str::to_string),
        )
    }

    /// Check the per-scheme invariant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] when the scheme is empty or contains
    /// characters outside `[a-z0-9+.-]`, when a TCP address lacks a host or
    /// port, or when a serial address lacks a path.
    pub fn validate(&self) -> Result<()> {
        if self.scheme.is_empty() {
            return Err(Error::invalid_address(self.to_string(), "scheme is empty"));
        }
        if !self
            .scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(Error::invalid_address(
                self.to_string(),
                format!("scheme '{}' contains invalid characters", self.scheme),
            ));
        }

        match self.scheme.as_str() {
            SCHEME_TCP => {
                if self.host.is_none() {
                    return Err(Error::invalid_address(
                        self.to_string(),
                        "tcp address requires a host",
                    ));
                }
                if self.port.is_none() {
                    return Err(Error::invalid_address(
                        self.to_string(),
                        "tcp address requires a port",
                    ));
                }
            }
            SCHEME_SERIAL => {
                if self.path.is_none() {
                    return Err(Error::invalid_address(
                        self.to_string(),
                        "serial address requires a port path",
                    ));
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Transport scheme, always lowercase and non-empty.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host name or IP address, if any.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Port number, if any.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Path component, if any.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// `(host, port)` pair for socket transports.
    pub fn socket_target(&self) -> Option<(&str, u16)> {
        Some((self.host.as_deref()?, self.port?))
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;

        if self.scheme == SCHEME_SERIAL {
            return write!(f, "{}", self.path.as_deref().unwrap_or_default());
        }

        if let Some(host) = &self.host {
            if host.contains(':') {
                write!(f, "[{}]", host)?;
            } else {
                write!(f, "{}", host)?;
            }
        }
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        if let Some(path) = &self.path {
            write!(f, "/{}", path)?;
        }
        Ok(())
    }
}

impl FromStr for EndpointAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let input = s.trim();
        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| Error::invalid_address(input, "expected '<scheme>://'"))?;

        if scheme.eq_ignore_ascii_case(SCHEME_SERIAL) {
            return Self::new(scheme, None, None, Some(rest.to_string()));
        }

        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, Some(path.to_string())),
            None => (rest, None),
        };

        let (host, port) = parse_authority(input, authority)?;
        Self::new(scheme, host, port, path)
    }
}

fn parse_authority(input: &str, authority: &str) -> Result<(Option<String>, Option<u16>)> {
    if authority.is_empty() {
        return Ok((None, None));
    }

    // Bracketed IPv6 literal: [::1]:9100
    if let Some(stripped) = authority.strip_prefix('[') {
        let (host, tail) = stripped
            .split_once(']')
            .ok_or_else(|| Error::invalid_address(input, "unterminated IPv6 literal"))?;
        let port = match tail.strip_prefix(':') {
            Some(port) => Some(parse_port(input, port)?),
            None if tail.is_empty() => None,
            None => return Err(Error::invalid_address(input, "unexpected text after host")),
        };
        return Ok((Some(host.to_string()), port));
    }

    match authority.rsplit_once(':') {
        Some((host, port)) => Ok((Some(host.to_string()), Some(parse_port(input, port)?))),
        None => Ok((Some(authority.to_string()), None)),
    }
}

fn parse_port(input: &str, port: &str) -> Result<u16> {
    port.parse::<u16>()
        .map_err(|_| Error::invalid_address(input, format!("invalid port '{}'", port)))
}

impl TryFrom<String> for EndpointAddress {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<EndpointAddress> for String {
    fn from(address: EndpointAddress) -> Self {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("tcp://192.168.1.50:9100", "tcp", Some("192.168.1.50"), Some(9100), None)]
    #[case("TCP://printer.local:9100", "tcp", Some("printer.local"), Some(9100), None)]
    #[case("tcp://[::1]:8080", "tcp", Some("::1"), Some(8080), None)]
    #[case("serial:///dev/ttyUSB0", "serial", None, None, Some("/dev/ttyUSB0"))]
    #[case("serial://COM3", "serial", None, None, Some("COM3"))]
    #[case("sdk://acme/camera-0", "sdk", Some("acme"), None, Some("camera-0"))]
    #[case("sdk://", "sdk", None, None, None)]
    fn test_parse_valid(
        #[case] input: &str,
        #[case] scheme: &str,
        #[case] host: Option<&str>,
        #[case] port: Option<u16>,
        #[case] path: Option<&str>,
    ) {
        let address: EndpointAddress = input.parse().unwrap();
        assert_eq!(address.scheme(), scheme);
        assert_eq!(address.host(), host);
        assert_eq!(address.port(), port);
        assert_eq!(address.path(), path);
    }

    #[rstest]
    #[case("192.168.1.50:9100")] // no scheme
    #[case("://host:1")] // empty scheme
    #[case("tcp://host")] // missing port
    #[case("tcp://:9100")] // missing host
    #[case("tcp://host:99999")] // port out of range
    #[case("serial://")] // missing path
    #[case("t p://host:1")] // bad scheme chars
    fn test_parse_invalid(#[case] input: &str) {
        let result: Result<EndpointAddress> = input.parse();
        assert!(matches!(result, Err(Error::InvalidAddress { .. })));
    }

    #[test]
    fn test_unknown_scheme_parses() {
        let address: EndpointAddress = "usb://0483:5740".parse().unwrap();
        assert_eq!(address.scheme(), "usb");
        assert_eq!(address.port(), Some(5740));
    }

    #[rstest]
    #[case("tcp://10.0.0.7:9100")]
    #[case("tcp://[fe80::1]:9100")]
    #[case("serial:///dev/ttyS0")]
    #[case("sdk://acme/cam")]
    fn test_display_matches_input(#[case] input: &str) {
        let address: EndpointAddress = input.parse().unwrap();
        assert_eq!(address.to_string(), input);
    }

    #[test]
    fn test_constructors() {
        let tcp = EndpointAddress::tcp("10.1.1.1", 9100).unwrap();
        assert_eq!(tcp.socket_target(), Some(("10.1.1.1", 9100)));

        let serial = EndpointAddress::serial("COM4").unwrap();
        assert_eq!(serial.socket_target(), None);
        assert_eq!(serial.path(), Some("COM4"));

        let sdk = EndpointAddress::sdk(Some("acme"), None).unwrap();
        assert_eq!(sdk.host(), Some("acme"));

        assert!(EndpointAddress::tcp("", 9100).is_err());
        assert!(EndpointAddress::serial("").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let address = EndpointAddress::tcp("printer", 9100).unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, "\"tcp://printer:9100\"");

        let back: EndpointAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);

        let bad: std::result::Result<EndpointAddress, _> = serde_json::from_str("\"tcp://x\"");
        assert!(bad.is_err());
    }
}
