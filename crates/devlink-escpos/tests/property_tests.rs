//! Property-based tests for the ESC/POS parameter clamping rules.
//!
//! Printers treat out-of-range parameter bytes as data, so every numeric
//! input must land inside the accepted range no matter what the caller
//! passes.

use devlink_escpos::{BarcodeType, QrErrorLevel, TextEncoding, barcode, qr_code, text};
use proptest::prelude::*;

fn barcode_type() -> impl Strategy<Value = BarcodeType> {
    prop_oneof![
        Just(BarcodeType::UpcA),
        Just(BarcodeType::UpcE),
        Just(BarcodeType::Ean13),
        Just(BarcodeType::Ean8),
        Just(BarcodeType::Code39),
        Just(BarcodeType::Itf),
        Just(BarcodeType::Codabar),
        Just(BarcodeType::Code128),
    ]
}

fn qr_level() -> impl Strategy<Value = QrErrorLevel> {
    prop_oneof![
        Just(QrErrorLevel::L),
        Just(QrErrorLevel::M),
        Just(QrErrorLevel::Q),
        Just(QrErrorLevel::H),
    ]
}

proptest! {
    /// Property: barcode height lands in 1..=255 and width in 2..=6.
    #[test]
    fn prop_barcode_dimensions_clamped(
        height in any::<i32>(),
        width in any::<i32>(),
        kind in barcode_type(),
    ) {
        let bytes = barcode("0123456789", kind, height, width);

        prop_assert_eq!(&bytes[0..2], &[0x1D, 0x68]);
        prop_assert!(bytes[2] >= 1);
        prop_assert_eq!(i32::from(bytes[2]), height.clamp(1, 255));

        prop_assert_eq!(&bytes[3..5], &[0x1D, 0x77]);
        prop_assert!((2..=6).contains(&bytes[5]));
        prop_assert_eq!(i32::from(bytes[5]), width.clamp(2, 6));
    }

    /// Property: the barcode length byte always equals the bytes that follow.
    #[test]
    fn prop_barcode_length_byte_truthful(data in "\\PC{0,400}", kind in barcode_type()) {
        let bytes = barcode(&data, kind, 80, 3);

        prop_assert_eq!(&bytes[9..12], &[0x1D, 0x6B, kind.code()]);
        let declared = usize::from(bytes[12]);
        prop_assert_eq!(bytes.len() - 13, declared);
        prop_assert_eq!(declared, data.chars().count().min(255));
        prop_assert!(bytes[13..].iter().all(u8::is_ascii));
    }

    /// Property: QR module size lands in 1..=16.
    #[test]
    fn prop_qr_module_size_clamped(size in any::<i32>(), level in qr_level()) {
        let bytes = qr_code("https://example.com", size, level);

        prop_assert!((1..=16).contains(&bytes[16]));
        prop_assert_eq!(i32::from(bytes[16]), size.clamp(1, 16));
        prop_assert_eq!(bytes[24], level.code());
    }

    /// Property: QR store-frame length equals payload + 3, little-endian.
    #[test]
    fn prop_qr_length_prefix(data in "\\PC{0,500}") {
        let bytes = qr_code(&data, 4, QrErrorLevel::M);

        let declared = usize::from(u16::from_le_bytes([bytes[28], bytes[29]]));
        prop_assert_eq!(declared, data.len() + 3);
        prop_assert_eq!(&bytes[33..33 + data.len()], data.as_bytes());
        prop_assert_eq!(bytes.len(), 41 + data.len());
    }

    /// Property: encoded text never contains a bare LF.
    #[test]
    fn prop_text_has_no_bare_lf(s in "[a-z\\r\\n]{0,64}") {
        let bytes = text(&s, TextEncoding::Ascii);
        for (i, b) in bytes.iter().enumerate() {
            if *b == b'\n' {
                prop_assert!(i > 0 && bytes[i - 1] == b'\r');
            }
        }
    }
}
