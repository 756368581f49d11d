//! QR codes (`GS ( k`, function 165..181 family, `cn = 49`).
//!
//! A QR code is five function frames:
//!
//! | Frame                | Bytes                                    |
//! |----------------------|------------------------------------------|
//! | Select model 2       | `1D 28 6B 04 00 31 41 32 00`             |
//! | Module size          | `1D 28 6B 03 00 31 43 n` (n in 1..=16)   |
//! | Error correction     | `1D 28 6B 03 00 31 45 n` (n in 48..=51)  |
//! | Store data           | `1D 28 6B pL pH 31 50 30 d..`            |
//! | Print symbol         | `1D 28 6B 03 00 31 51 30`                |
//!
//! `pL pH` is the little-endian length of the payload plus the three
//! `31 50 30` bytes that follow it.

use serde::{Deserialize, Serialize};

use crate::commands::GS;

/// Smallest module size in dots.
pub const MIN_MODULE_SIZE: i32 = 1;

/// Largest module size in dots.
pub const MAX_MODULE_SIZE: i32 = 16;

/// Largest payload a model 2 symbol can hold (numeric mode, level L).
pub const MAX_DATA_LEN: usize = 7089;

const FUNCTION_PREFIX: [u8; 3] = [GS, b'(', b'k'];
const CN_QR: u8 = 0x31;

/// Error-correction level of a QR symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QrErrorLevel {
    /// ~7% recovery.
    L,

    /// ~15% recovery.
    #[default]
    M,

    /// ~25% recovery.
    Q,

    /// ~30% recovery.
    H,
}

impl QrErrorLevel {
    /// Value of `n` in the error-correction frame.
    pub fn code(self) -> u8 {
        match self {
            Self::L => 48,
            Self::M => 49,
            Self::Q => 50,
            Self::H => 51,
        }
    }
}

/// Build the full byte sequence for a QR code holding `data` as UTF-8.
///
/// `size` is clamped to `1..=16`. Payloads longer than 7089 bytes are
/// truncated.
///
/// ```
/// use devlink_escpos::{QrErrorLevel, qr_code};
///
/// let bytes = qr_code("hi", 40, QrErrorLevel::L);
/// // module size frame carries the clamped value
/// assert_eq!(&bytes[9..17], &[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, 16]);
/// ```
pub fn qr_code(data: &str, size: i32, level: QrErrorLevel) -> Vec<u8> {
    let payload = truncate_utf8(data, MAX_DATA_LEN);
    let module_size = size.clamp(MIN_MODULE_SIZE, MAX_MODULE_SIZE) as u8;
    let [p_l, p_h] = ((payload.len() + 3) as u16).to_le_bytes();

    let mut bytes = Vec::with_capacity(41 + payload.len());
    frame(&mut bytes, &[0x04, 0x00, CN_QR, 0x41, 0x32, 0x00]);
    frame(&mut bytes, &[0x03, 0x00, CN_QR, 0x43, module_size]);
    frame(&mut bytes, &[0x03, 0x00, CN_QR, 0x45, level.code()]);
    frame(&mut bytes, &[p_l, p_h, CN_QR, 0x50, 0x30]);
    bytes.extend_from_slice(payload);
    frame(&mut bytes, &[0x03, 0x00, CN_QR, 0x51, 0x30]);
    bytes
}

fn frame(out: &mut Vec<u8>, body: &[u8]) {
    out.extend_from_slice(&FUNCTION_PREFIX);
    out.extend_from_slice(body);
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_utf8(s: &str, max: usize) -> &[u8] {
    if s.len() <= max {
        return s.as_bytes();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s.as_bytes()[..end]
}
