//! Static device descriptors.
//!
//! Profiles are loaded once by an external loader (JSON on disk in most
//! deployments) and handed to the device that is configured with them. They
//! are never mutated afterwards.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Windows codepage ids printers may be configured with.
///
/// 437 (OEM US), 1252 (Western European), 20127 (US-ASCII),
/// 28591 (ISO-8859-1) and 65001 (UTF-8).
pub const SUPPORTED_CODEPAGES: [u16; 5] = [437, 1252, 20127, 28591, 65001];

/// Static descriptor shared by every device kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceProfile {
    /// Manufacturer name.
    pub manufacturer: String,

    /// Model name.
    pub model: String,

    /// Firmware or profile version.
    pub version: String,

    /// Wire protocol spoken by the device (e.g. `"escpos"`, `"mjpeg"`).
    pub protocol: String,

    /// Free-form device-specific settings.
    pub options: BTreeMap<String, String>,
}

impl DeviceProfile {
    /// Create a profile with manufacturer, model and protocol.
    pub fn new(
        manufacturer: impl Into<String>,
        model: impl Into<String>,
        protocol: impl Into<String>,
    ) -> Self {
        Self {
            manufacturer: manufacturer.into(),
            model: model.into(),
            protocol: protocol.into(),
            ..Self::default()
        }
    }

    /// Set the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add a device-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Raw option value.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Option value parsed into `T`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProfile`] when the value does not parse.
    pub fn option_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.option(key) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                Error::invalid_profile(format!("option '{}' has invalid value '{}'", key, raw))
            }),
        }
    }
}

/// Descriptor for a receipt printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterProfile {
    /// Fields shared with every device.
    #[serde(flatten)]
    pub device: DeviceProfile,

    /// Codepage used to encode text (see [`SUPPORTED_CODEPAGES`]).
    pub default_codepage: u16,

    /// Value sent with `ESC t n` on initialisation, if any.
    #[serde(default)]
    pub esc_pos_codepage: Option<u8>,

    /// Lines fed after each printed text job.
    pub default_feed_lines: u8,

    /// Whether the printer has an auto-cutter.
    pub supports_cut: bool,

    /// Use a partial instead of a full cut.
    #[serde(default)]
    pub partial_cut: bool,
}

impl PrinterProfile {
    /// Profile for a generic 80mm ESC/POS printer using codepage 437.
    pub fn generic_escpos() -> Self {
        Self {
            device: DeviceProfile::new("Generic", "ESC/POS 80mm", "escpos"),
            default_codepage: 437,
            esc_pos_codepage: Some(0),
            default_feed_lines: 3,
            supports_cut: true,
            partial_cut: false,
        }
    }

    /// Check codepage support.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProfile`] if `default_codepage` is not one of
    /// [`SUPPORTED_CODEPAGES`].
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_CODEPAGES.contains(&self.default_codepage) {
            return Err(Error::invalid_profile(format!(
                "unsupported codepage {} for {} {}",
                self.default_codepage, self.device.manufacturer, self.device.model
            )));
        }
        Ok(())
    }
}

impl Default for PrinterProfile {
    fn default() -> Self {
        Self::generic_escpos()
    }
}
