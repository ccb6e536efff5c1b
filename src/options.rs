//! Reader configuration
//!
//! [`ReaderOptions`] is a builder-style record consumed by
//! [`read_barcodes`](crate::read_barcodes). Chain the setters:
//!
//! ```
//! use zedxing::{BarcodeFormat, ReaderOptions};
//!
//! let opts = ReaderOptions::new()
//!     .formats([BarcodeFormat::QRCode, BarcodeFormat::EAN13])
//!     .try_harder(true)
//!     .try_rotate(true)
//!     .max_number_of_symbols(4);
//! ```

use crate::content::TextMode;
use crate::format::{BarcodeFormat, FormatSet};

/// How the incoming luminance plane is thresholded into a bit matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binarizer {
    /// Threshold against the mean of a local neighborhood. The most
    /// robust choice for camera images.
    #[default]
    LocalAverage,
    /// One global threshold from the luminance histogram.
    GlobalHistogram,
    /// Fixed threshold at mid grey (127).
    FixedThreshold,
    /// Input is already binary: any value below 128 is dark.
    PassThrough,
}

/// Policy for EAN-2/EAN-5 add-on symbols next to an EAN/UPC code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EanAddOnSymbol {
    /// Skip the add-on, return the main symbol alone.
    #[default]
    Ignore,
    /// Append the add-on digits when present.
    Read,
    /// Fail the main symbol unless an add-on is present.
    Require,
}

/// Options controlling a decode call. Field meanings follow the
/// documentation on each setter.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub(crate) formats: FormatSet,
    pub(crate) try_harder: bool,
    pub(crate) try_rotate: bool,
    pub(crate) try_invert: bool,
    pub(crate) try_downscale: bool,
    pub(crate) try_denoise: bool,
    pub(crate) is_pure: bool,
    pub(crate) return_errors: bool,
    pub(crate) binarizer: Binarizer,
    pub(crate) ean_addon: EanAddOnSymbol,
    pub(crate) text_mode: TextMode,
    pub(crate) min_line_count: u32,
    pub(crate) max_number_of_symbols: u32,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self {
            formats: FormatSet::EMPTY,
            try_harder: true,
            try_rotate: true,
            try_invert: true,
            try_downscale: true,
            try_denoise: false,
            is_pure: false,
            return_errors: false,
            binarizer: Binarizer::default(),
            ean_addon: EanAddOnSymbol::default(),
            text_mode: TextMode::default(),
            min_line_count: 2,
            max_number_of_symbols: 255,
        }
    }

    /// Restrict decoding to the given formats. An empty set means all
    /// formats available in this build.
    pub fn formats(mut self, formats: impl IntoIterator<Item = BarcodeFormat>) -> Self {
        self.formats = formats.into_iter().collect();
        self
    }

    pub fn format_set(mut self, formats: FormatSet) -> Self {
        self.formats = formats;
        self
    }

    /// Spend more time to find symbols: denser row scanning, smaller
    /// finder subsampling steps.
    pub fn try_harder(mut self, on: bool) -> Self {
        self.try_harder = on;
        self
    }

    /// Retry on the 90°-rotated image when nothing is found upright.
    pub fn try_rotate(mut self, on: bool) -> Self {
        self.try_rotate = on;
        self
    }

    /// Also look for light-on-dark symbols.
    pub fn try_invert(mut self, on: bool) -> Self {
        self.try_invert = on;
        self
    }

    /// Also scan a half-resolution image pyramid for large inputs.
    pub fn try_downscale(mut self, on: bool) -> Self {
        self.try_downscale = on;
        self
    }

    /// Run a closing filter over the bit matrix before 2D detection,
    /// which helps with dotted/inkjet prints.
    pub fn try_denoise(mut self, on: bool) -> Self {
        self.try_denoise = on;
        self
    }

    /// Assume the image is one perfectly aligned, cleanly printed symbol
    /// with nothing else; enables the fast axis-aligned extraction path.
    pub fn is_pure(mut self, on: bool) -> Self {
        self.is_pure = on;
        self
    }

    /// Include structurally matched but failed symbols in the result
    /// list, with `Barcode::error()` populated.
    pub fn return_errors(mut self, on: bool) -> Self {
        self.return_errors = on;
        self
    }

    pub fn binarizer(mut self, binarizer: Binarizer) -> Self {
        self.binarizer = binarizer;
        self
    }

    pub fn ean_addon(mut self, policy: EanAddOnSymbol) -> Self {
        self.ean_addon = policy;
        self
    }

    /// How `Barcode::text()` renders the payload.
    pub fn text_mode(mut self, mode: TextMode) -> Self {
        self.text_mode = mode;
        self
    }

    /// Number of scan lines that must confirm a 1D symbol. 1 accepts
    /// single-row sightings (more false positives).
    pub fn min_line_count(mut self, count: u32) -> Self {
        self.min_line_count = count.max(1);
        self
    }

    /// Stop after this many symbols have been confirmed.
    pub fn max_number_of_symbols(mut self, count: u32) -> Self {
        self.max_number_of_symbols = count.max(1);
        self
    }

    /// The effective format set: an empty requested set expands to every
    /// format.
    pub(crate) fn effective_formats(&self) -> FormatSet {
        if self.formats.is_empty() {
            FormatSet::all()
        } else {
            self.formats
        }
    }

    pub(crate) fn has_format(&self, format: BarcodeFormat) -> bool {
        self.effective_formats().contains(format)
    }
}
