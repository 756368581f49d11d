//! Basic ESC/POS printer commands.
//!
//! Every function returns the exact byte sequence for one command. None of
//! them share state, so they can be composed freely or tested in isolation.
//!
//! | Command        | Bytes            |
//! |----------------|------------------|
//! | Initialize     | `ESC @`          |
//! | Set codepage   | `ESC t n`        |
//! | Feed lines     | `ESC d n`        |
//! | Cut            | `GS V m`         |
//! | Justification  | `ESC a n`        |
//! | Emphasis       | `ESC E n`        |

use crate::encoding::TextEncoding;

/// Escape (0x1B), prefix of most printer commands.
pub const ESC: u8 = 0x1B;

/// Group separator (0x1D), prefix of graphics, barcode and cut commands.
pub const GS: u8 = 0x1D;

/// Line feed (0x0A).
pub const LF: u8 = 0x0A;

/// Carriage return (0x0D).
pub const CR: u8 = 0x0D;

/// Reset the printer to its power-on state (`ESC @`).
///
/// ```
/// assert_eq!(devlink_escpos::commands::initialize(), vec![0x1B, 0x40]);
/// ```
pub fn initialize() -> Vec<u8> {
    vec![ESC, b'@']
}

/// Select the character code table (`ESC t n`).
///
/// ```
/// assert_eq!(devlink_escpos::commands::set_codepage(17), vec![0x1B, 0x74, 17]);
/// ```
pub fn set_codepage(n: u8) -> Vec<u8> {
    vec![ESC, b't', n]
}

/// Print the buffer and feed `lines` lines (`ESC d n`).
pub fn feed_lines(lines: u8) -> Vec<u8> {
    vec![ESC, b'd', lines]
}

/// Cut the paper (`GS V m`): `m = 1` for a partial cut, `m = 0` for a full cut.
pub fn cut(partial: bool) -> Vec<u8> {
    vec![GS, b'V', if partial { 0x01 } else { 0x00 }]
}

/// Horizontal alignment for `ESC a n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Justification {
    /// Flush left (n = 0).
    #[default]
    Left,

    /// Centred (n = 1).
    Center,

    /// Flush right (n = 2).
    Right,
}

impl Justification {
    /// Value of `n` in `ESC a n`.
    pub fn code(self) -> u8 {
        match self {
            Self::Left => 0,
            Self::Center => 1,
            Self::Right => 2,
        }
    }
}

/// Set horizontal alignment (`ESC a n`).
pub fn justify(justification: Justification) -> Vec<u8> {
    vec![ESC, b'a', justification.code()]
}

/// Toggle emphasised (bold) printing (`ESC E n`).
pub fn emphasis(enabled: bool) -> Vec<u8> {
    vec![ESC, b'E', u8::from(enabled)]
}

/// Encode `s` for printing, with every line break sent as CR LF.
///
/// Existing `\r\n` pairs are kept as-is; bare `\n` becomes `\r\n`.
///
/// ```
/// use devlink_escpos::{TextEncoding, commands};
///
/// assert_eq!(commands::text("a\nb", TextEncoding::Ascii), b"a\r\nb".to_vec());
/// assert_eq!(commands::text("a\r\nb", TextEncoding::Ascii), b"a\r\nb".to_vec());
/// ```
pub fn text(s: &str, encoding: TextEncoding) -> Vec<u8> {
    let normalized = s.replace("\r\n", "\n").replace('\n', "\r\n");
    encoding.encode(&normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_initialize() {
        let bytes = initialize();
        assert_eq!(bytes, vec![0x1B, 0x40]);
        assert_eq!(bytes.len(), 2);
    }

    #[rstest]
    #[case(0)]
    #[case(16)]
    #[case(17)]
    #[case(255)]
    fn test_set_codepage(#[case] n: u8) {
        assert_eq!(set_codepage(n), vec![0x1B, 0x74, n]);
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(255)]
    fn test_feed_lines(#[case] n: u8) {
        assert_eq!(feed_lines(n), vec![0x1B, 0x64, n]);
    }

    #[test]
    fn test_cut() {
        assert_eq!(cut(true), vec![0x1D, 0x56, 0x01]);
        assert_eq!(cut(false), vec![0x1D, 0x56, 0x00]);
    }

    #[rstest]
    #[case(Justification::Left, 0)]
    #[case(Justification::Center, 1)]
    #[case(Justification::Right, 2)]
    fn test_justify(#[case] justification: Justification, #[case] n: u8) {
        assert_eq!(justify(justification), vec![0x1B, 0x61, n]);
    }

    #[test]
    fn test_emphasis() {
        assert_eq!(emphasis(true), vec![0x1B, 0x45, 1]);
        assert_eq!(emphasis(false), vec![0x1B, 0x45, 0]);
    }

    #[rstest]
    #[case("plain", b"plain".to_vec())]
    #[case("one\ntwo\n", b"one\r\ntwo\r\n".to_vec())]
    #[case("keep\r\nthis", b"keep\r\nthis".to_vec())]
    #[case("\n\n", b"\r\n\r\n".to_vec())]
    #[case("", Vec::new())]
    fn test_text_line_endings(#[case] input: &str, #[case] expected: Vec<u8>) {
        assert_eq!(text(input, TextEncoding::Cp437), expected);
    }

    #[test]
    fn test_text_uses_encoding() {
        assert_eq!(text("é\n", TextEncoding::Cp437), vec![0x82, CR, LF]);
        assert_eq!(text("é\n", TextEncoding::Latin1), vec![0xE9, CR, LF]);
    }
}
