//! # devlink-escpos
//!
//! Byte-exact builders for the ESC/POS receipt-printer command language.
//!
//! Every builder is a pure function returning the bytes for one command.
//! Numeric parameters outside the range a printer accepts are clamped, never
//! rejected, so the output is always a well-formed command.
//!
//! ```
//! use devlink_escpos::{BarcodeType, ReceiptBuilder, TextEncoding};
//!
//! let job = ReceiptBuilder::new(TextEncoding::Cp437)
//!     .initialize()
//!     .line("Order #1042")
//!     .barcode("1042", BarcodeType::Code128, 80, 3)
//!     .feed(3)
//!     .cut(true)
//!     .build();
//! assert!(!job.is_empty());
//! ```

pub mod barcode;
pub mod builder;
pub mod commands;
pub mod encoding;
pub mod qr;

pub use barcode::{BarcodeType, barcode};
pub use builder::ReceiptBuilder;
pub use commands::{Justification, cut, emphasis, feed_lines, initialize, justify, set_codepage, text};
pub use encoding::TextEncoding;
pub use qr::{QrErrorLevel, qr_code};
