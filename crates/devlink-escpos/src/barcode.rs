//! One-dimensional barcodes (`GS k`, function B).
//!
//! A barcode is printed as four commands:
//!
//! ```text
//! GS h n        bar height in dots, clamped to 1..=255
//! GS w n        module width, clamped to 2..=6
//! GS H 2        HRI text below the bars
//! GS k m n d..  symbology m, data length n, data bytes
//! ```
//!
//! Out-of-range parameters are clamped rather than rejected: printers treat
//! malformed parameter bytes as data, which corrupts the rest of the job.

use serde::{Deserialize, Serialize};

use crate::commands::GS;
use crate::encoding::TextEncoding;

/// Minimum bar height in dots.
pub const MIN_HEIGHT: i32 = 1;

/// Maximum bar height in dots.
pub const MAX_HEIGHT: i32 = 255;

/// Minimum module width.
pub const MIN_WIDTH: i32 = 2;

/// Maximum module width.
pub const MAX_WIDTH: i32 = 6;

/// Longest payload the one-byte length field can describe.
pub const MAX_DATA_LEN: usize = 255;

/// HRI characters printed below the barcode.
const HRI_BELOW: u8 = 0x02;

/// Barcode symbology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeType {
    /// UPC-A.
    UpcA,

    /// UPC-E.
    UpcE,

    /// EAN-13 (JAN-13).
    Ean13,

    /// EAN-8 (JAN-8).
    Ean8,

    /// Code 39, also the fallback for unknown names.
    #[default]
    Code39,

    /// Interleaved 2 of 5.
    Itf,

    /// Codabar (NW-7).
    Codabar,

    /// Code 128.
    Code128,
}

impl BarcodeType {
    /// Symbology byte `m` for `GS k m n`.
    pub fn code(self) -> u8 {
        match self {
            Self::UpcA => 0x00,
            Self::UpcE => 0x01,
            Self::Ean13 => 0x02,
            Self::Ean8 => 0x03,
            Self::Code39 => 0x04,
            Self::Itf => 0x05,
            Self::Codabar => 0x06,
            Self::Code128 => 0x49,
        }
    }

    /// Look up a symbology by name, ignoring case, `-` and `_`.
    ///
    /// Unknown names fall back to Code 39.
    ///
    /// ```
    /// use devlink_escpos::BarcodeType;
    ///
    /// assert_eq!(BarcodeType::from_name("EAN-13"), BarcodeType::Ean13);
    /// assert_eq!(BarcodeType::from_name("upc_a"), BarcodeType::UpcA);
    /// assert_eq!(BarcodeType::from_name("pdf417"), BarcodeType::Code39);
    /// ```
    pub fn from_name(name: &str) -> Self {
        let key: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "upca" => Self::UpcA,
            "upce" => Self::UpcE,
            "ean13" | "jan13" => Self::Ean13,
            "ean8" | "jan8" => Self::Ean8,
            "itf" => Self::Itf,
            "codabar" | "nw7" => Self::Codabar,
            "code128" => Self::Code128,
            _ => Self::Code39,
        }
    }
}

/// Build the byte sequence for a barcode.
///
/// `height` is clamped to `1..=255` and `width` to `2..=6`. Payload
/// characters outside ASCII are sent as `?`, and payloads longer than 255
/// bytes are truncated so the length byte matches the data that follows.
///
/// ```
/// use devlink_escpos::{BarcodeType, barcode};
///
/// let bytes = barcode::barcode("123", BarcodeType::Code39, 0, 100);
/// assert_eq!(
///     bytes,
///     vec![
///         0x1D, 0x68, 1,          // height clamped up
///         0x1D, 0x77, 6,          // width clamped down
///         0x1D, 0x48, 0x02,
///         0x1D, 0x6B, 0x04, 3, b'1', b'2', b'3',
///     ]
/// );
/// ```
pub fn barcode(data: &str, kind: BarcodeType, height: i32, width: i32) -> Vec<u8> {
    let mut payload = TextEncoding::Ascii.encode(data);
    payload.truncate(MAX_DATA_LEN);

    let mut bytes = Vec::with_capacity(13 + payload.len());
    bytes.extend_from_slice(&[GS, b'h', clamp_byte(height, MIN_HEIGHT, MAX_HEIGHT)]);
    bytes.extend_from_slice(&[GS, b'w', clamp_byte(width, MIN_WIDTH, MAX_WIDTH)]);
    bytes.extend_from_slice(&[GS, b'H', HRI_BELOW]);
    bytes.extend_from_slice(&[GS, b'k', kind.code(), payload.len() as u8]);
    bytes.extend_from_slice(&payload);
    bytes
}

fn clamp_byte(value: i32, min: i32, max: i32) -> u8 {
    value.clamp(min, max) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BarcodeType::Code39, 0x04)]
    #[case(BarcodeType::Code128, 0x49)]
    #[case(BarcodeType::Ean13, 0x02)]
    #[case(BarcodeType::Ean8, 0x03)]
    #[case(BarcodeType::UpcA, 0x00)]
    #[case(BarcodeType::UpcE, 0x01)]
    #[case(BarcodeType::Itf, 0x05)]
    #[case(BarcodeType::Codabar, 0x06)]
    fn test_type_codes(#[case] kind: BarcodeType, #[case] code: u8) {
        assert_eq!(kind.code(), code);
    }

    #[test]
    fn test_default_is_code39() {
        assert_eq!(BarcodeType::default(), BarcodeType::Code39);
        assert_eq!(BarcodeType::from_name(""), BarcodeType::Code39);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(-20, 1)]
    #[case(1, 1)]
    #[case(80, 80)]
    #[case(255, 255)]
    #[case(1000, 255)]
    fn test_height_clamped(#[case] height: i32, #[case] expected: u8) {
        let bytes = barcode("1", BarcodeType::Code39, height, 3);
        assert_eq!(&bytes[0..3], &[0x1D, 0x68, expected]);
    }

    #[rstest]
    #[case(0, 2)]
    #[case(2, 2)]
    #[case(4, 4)]
    #[case(6, 6)]
    #[case(7, 6)]
    fn test_width_clamped(#[case] width: i32, #[case] expected: u8) {
        let bytes = barcode("1", BarcodeType::Code39, 80, width);
        assert_eq!(&bytes[3..6], &[0x1D, 0x77, expected]);
    }

    #[test]
    fn test_full_sequence_code128() {
        let bytes = barcode("AB12", BarcodeType::Code128, 100, 3);
        assert_eq!(
            bytes,
            vec![
                0x1D, 0x68, 100, 0x1D, 0x77, 3, 0x1D, 0x48, 0x02, 0x1D, 0x6B, 0x49, 4, b'A', b'B',
                b'1', b'2',
            ]
        );
    }

    #[test]
    fn test_non_ascii_payload_replaced() {
        let bytes = barcode("1é", BarcodeType::Code39, 80, 3);
        assert_eq!(&bytes[12..], &[2, b'1', b'?']);
    }

    #[test]
    fn test_long_payload_truncated() {
        let data = "9".repeat(300);
        let bytes = barcode(&data, BarcodeType::Code128, 80, 3);
        assert_eq!(bytes[12], 255);
        assert_eq!(bytes.len(), 13 + 255);
    }
}
