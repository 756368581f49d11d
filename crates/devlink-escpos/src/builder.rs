use crate::barcode::{BarcodeType, barcode};
use crate::commands::{self, Justification};
use crate::encoding::TextEncoding;
use crate::qr::{QrErrorLevel, qr_code};

/// Fluent builder that concatenates ESC/POS commands into one buffer.
///
/// The builder adds nothing of its own: the output is exactly the
/// concatenation of the individual command builders, in call order.
///
/// # Example
/// ```
/// use devlink_escpos::{Justification, ReceiptBuilder, TextEncoding};
///
/// let job = ReceiptBuilder::new(TextEncoding::Cp437)
///     .initialize()
///     .justify(Justification::Center)
///     .line("TOTAL 12.50")
///     .feed(3)
///     .cut(false)
///     .build();
///
/// assert_eq!(&job[..2], &[0x1B, 0x40]);
/// assert_eq!(&job[job.len() - 3..], &[0x1D, 0x56, 0x00]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReceiptBuilder {
    encoding: TextEncoding,
    buf: Vec<u8>,
}

impl ReceiptBuilder {
    /// Create an empty builder that encodes text with `encoding`.
    pub fn new(encoding: TextEncoding) -> Self {
        ReceiptBuilder {
            encoding,
            buf: Vec::new(),
        }
    }

    /// Encoding used by [`text`](Self::text) and [`line`](Self::line).
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// `ESC @`
    pub fn initialize(mut self) -> Self {
        self.buf.extend(commands::initialize());
        self
    }

    /// `ESC t n`
    pub fn codepage(mut self, n: u8) -> Self {
        self.buf.extend(commands::set_codepage(n));
        self
    }

    /// Append text, line breaks normalised to CR LF.
    pub fn text(mut self, s: &str) -> Self {
        self.buf.extend(commands::text(s, self.encoding));
        self
    }

    /// Append text followed by a line break.
    pub fn line(self, s: &str) -> Self {
        let encoding = self.encoding;
        let mut this = self.text(s);
        this.buf.extend(commands::text("\n", encoding));
        this
    }

    /// `ESC d n`
    pub fn feed(mut self, lines: u8) -> Self {
        self.buf.extend(commands::feed_lines(lines));
        self
    }

    /// `GS V m`
    pub fn cut(mut self, partial: bool) -> Self {
        self.buf.extend(commands::cut(partial));
        self
    }

    /// `ESC a n`
    pub fn justify(mut self, justification: Justification) -> Self {
        self.buf.extend(commands::justify(justification));
        self
    }

    /// `ESC E n`
    pub fn emphasis(mut self, enabled: bool) -> Self {
        self.buf.extend(commands::emphasis(enabled));
        self
    }

    /// Append a barcode; see [`barcode`](crate::barcode::barcode) for clamping.
    pub fn barcode(mut self, data: &str, kind: BarcodeType, height: i32, width: i32) -> Self {
        self.buf.extend(barcode(data, kind, height, width));
        self
    }

    /// Append a QR code; see [`qr_code`](crate::qr::qr_code) for clamping.
    pub fn qr(mut self, data: &str, size: i32, level: QrErrorLevel) -> Self {
        self.buf.extend(qr_code(data, size, level));
        self
    }

    /// Append bytes verbatim.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish and return the job bytes.
    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}
