//! Zedxing multi-symbology barcode decoding library
//!
//! A pure Rust barcode reader covering linear, 2D matrix, postal
//! 4-state and stacked symbologies: QR / Micro QR / UPNQR, Data Matrix,
//! Aztec, PDF417, MaxiCode, Code One, DotCode, Grid Matrix, Han Xin,
//! the Code 39/93/128 families, EAN/UPC, ITF, DataBar, two-of-five
//! variants, Royal Mail, Australia Post, USPS Intelligent Mail and
//! more.
//!
//! # Quick Start
//!
//! ```no_run
//! use zedxing::{read_barcodes, ImageFormat, ImageView, ReaderOptions};
//!
//! let (width, height) = (640usize, 480usize);
//! let pixels = vec![255u8; width * height];
//! let image = ImageView::new(&pixels, width, height, ImageFormat::Lum).unwrap();
//!
//! for barcode in read_barcodes(&image, &ReaderOptions::new()).unwrap() {
//!     println!("{}: {}", barcode.format(), barcode.text());
//! }
//! ```
//!
//! # Configuration
//!
//! Decoding is driven by [`ReaderOptions`]:
//!
//! ```
//! use zedxing::{BarcodeFormat, ReaderOptions};
//!
//! let opts = ReaderOptions::new()
//!     .formats([BarcodeFormat::QRCode, BarcodeFormat::EAN13])
//!     .try_harder(true)
//!     .try_rotate(true)
//!     .return_errors(false)
//!     .max_number_of_symbols(4);
//! ```
//!
//! # Modules
//!
//! - [`format`] - the symbology registry and format-name parsing
//! - [`options`] - reader configuration
//! - [`barcode`] - decoded results and geometry
//! - [`content`] - payload assembly, ECI and text rendering
//! - [`image`] - pixel ingress and binarization
//! - [`error`] - error types

// Public modules
pub mod barcode;
pub mod content;
pub mod error;
pub mod format;
pub mod image;
pub mod options;

// Shared primitives
pub mod bits;
pub(crate) mod finder;
pub(crate) mod gf;
pub mod pattern;
pub(crate) mod rs;
pub(crate) mod transform;
pub mod verbosity;

// Per-family readers
pub(crate) mod oned;
pub(crate) mod reader;
#[cfg(feature = "aztec")]
pub(crate) mod aztec;
#[cfg(feature = "codeone")]
pub(crate) mod codeone;
#[cfg(feature = "datamatrix")]
pub(crate) mod datamatrix;
#[cfg(feature = "dotcode")]
pub(crate) mod dotcode;
#[cfg(feature = "gridmatrix")]
pub(crate) mod gridmatrix;
#[cfg(feature = "hanxin")]
pub(crate) mod hanxin;
#[cfg(feature = "maxicode")]
pub(crate) mod maxicode;
#[cfg(feature = "pdf417")]
pub(crate) mod pdf417;
#[cfg(feature = "postal")]
pub(crate) mod postal;
#[cfg(feature = "qrcode")]
pub(crate) mod qr;
#[cfg(feature = "stacked")]
pub(crate) mod stacked;

// Re-export the main types
pub use barcode::{Barcode, Point, Position};
pub use content::{ContentType, Eci, TextMode};
pub use error::{DecodeStatus, Error, Result};
pub use format::{BarcodeFormat, FormatSet};
pub use image::{ImageFormat, ImageView};
pub use options::{Binarizer, EanAddOnSymbol, ReaderOptions};
pub use reader::{available_formats, read_barcodes, read_bit_matrix};
pub use verbosity::set_verbosity;
