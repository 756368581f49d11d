//! Text encodings understood by receipt printers.
//!
//! Printers interpret text bytes through the codepage selected with `ESC t n`,
//! so text has to be encoded into the matching single-byte character set
//! before it is sent. Characters with no representation become `?`.

use serde::{Deserialize, Serialize};

/// Byte used for characters the encoding cannot represent.
pub const REPLACEMENT: u8 = b'?';

/// Supported text encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// UTF-8, for printers with native Unicode support.
    Utf8,

    /// 7-bit US-ASCII (codepage 20127).
    Ascii,

    /// ISO-8859-1 (codepage 28591).
    Latin1,

    /// Windows-1252 Western European (codepage 1252).
    Windows1252,

    /// OEM United States (codepage 437), the ESC/POS power-on default.
    #[default]
    Cp437,
}

impl TextEncoding {
    /// Encoding for a Windows codepage id.
    ///
    /// # Examples
    ///
    /// ```
    /// use devlink_escpos::TextEncoding;
    ///
    /// assert_eq!(TextEncoding::from_codepage(437), Some(TextEncoding::Cp437));
    /// assert_eq!(TextEncoding::from_codepage(65001), Some(TextEncoding::Utf8));
    /// assert_eq!(TextEncoding::from_codepage(932), None);
    /// ```
    pub fn from_codepage(codepage: u16) -> Option<Self> {
        match codepage {
            437 => Some(Self::Cp437),
            1252 => Some(Self::Windows1252),
            20127 => Some(Self::Ascii),
            28591 => Some(Self::Latin1),
            65001 => Some(Self::Utf8),
            _ => None,
        }
    }

    /// Windows codepage id of this encoding.
    pub fn codepage(&self) -> u16 {
        match self {
            Self::Cp437 => 437,
            Self::Windows1252 => 1252,
            Self::Ascii => 20127,
            Self::Latin1 => 28591,
            Self::Utf8 => 65001,
        }
    }

    /// Encode `text` into bytes, substituting [`REPLACEMENT`] for
    /// unrepresentable characters.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        if *self == Self::Utf8 {
            return text.as_bytes().to_vec();
        }

        text.chars()
            .map(|c| self.encode_char(c).unwrap_or(REPLACEMENT))
            .collect()
    }

    fn encode_char(&self, c: char) -> Option<u8> {
        if c.is_ascii() {
            return Some(c as u8);
        }
        match self {
            Self::Utf8 | Self::Ascii => None,
            Self::Latin1 => u8::try_from(u32::from(c)).ok(),
            Self::Windows1252 => WINDOWS_1252_HIGH
                .iter()
                .position(|&mapped| mapped == Some(c))
                .map(|i| 0x80 + i as u8)
                .or_else(|| match u32::from(c) {
                    code @ 0xA0..=0xFF => Some(code as u8),
                    _ => None,
                }),
            Self::Cp437 => CP437_HIGH
                .iter()
                .position(|&mapped| mapped == c)
                .map(|i| 0x80 + i as u8),
        }
    }
}

/// Windows-1252 bytes 0x80..=0x9F; `None` marks the unassigned positions.
const WINDOWS_1252_HIGH: [Option<char>; 32] = [
    Some('€'), None, Some('‚'), Some('ƒ'), Some('„'), Some('…'), Some('†'), Some('‡'),
    Some('ˆ'), Some('‰'), Some('Š'), Some('‹'), Some('Œ'), None, Some('Ž'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'), Some('\u{201D}'), Some('•'),
    Some('–'), Some('—'), Some('˜'), Some('™'), Some('š'), Some('›'), Some('œ'), None,
    Some('ž'), Some('Ÿ'),
];

/// Codepage 437 bytes 0x80..=0xFF.
const CP437_HIGH: [char; 128] = [
    // 0x80
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    // 0x90
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    // 0xA0
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    // 0xB0
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    // 0xC0
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    // 0xD0
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    // 0xE0
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    // 0xF0
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{A0}',
];
