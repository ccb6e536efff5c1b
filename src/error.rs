//! Error types and result handling
//!
//! Two layers of failure exist in this library:
//! - [`Error`] - hard failures of the public API (bad arguments, an image
//!   too small to hold pixel data, a format name that does not parse)
//! - [`DecodeStatus`] - the per-symbol outcome carried on a decoded
//!   [`Barcode`](crate::Barcode) when `return_errors` is requested
//!
//! Most fallible operations return [`Result`] to indicate success or failure.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A format name or format list could not be parsed.
    UnknownFormat(String),
    /// The requested format set contains no format this build can decode.
    UnsupportedFormats,
    /// The pixel buffer is smaller than width/height/stride imply.
    InvalidImageData,
    /// An option value is outside its legal range.
    InvalidOption(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFormat(name) => write!(f, "unknown barcode format: {name:?}"),
            Self::UnsupportedFormats => write!(f, "no requested format is available in this build"),
            Self::InvalidImageData => write!(f, "image buffer too small for given dimensions"),
            Self::InvalidOption(what) => write!(f, "invalid option value: {what}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Outcome of one symbol decode attempt.
///
/// `Format` means the input does not match the symbology's structure,
/// `Checksum` means the structure matched but error correction or a check
/// digit failed, `Unsupported` means the symbol requests a feature this
/// decoder does not implement. Failing results are silently dropped from
/// the output list unless `return_errors` is set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DecodeStatus {
    #[default]
    Ok,
    Format(String),
    Checksum(String),
    Unsupported(String),
}

impl DecodeStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn is_error(&self) -> bool {
        !self.is_ok()
    }

    /// The free-form message, empty for `Ok`.
    pub fn message(&self) -> &str {
        match self {
            Self::Ok => "",
            Self::Format(msg) | Self::Checksum(msg) | Self::Unsupported(msg) => msg,
        }
    }
}

impl fmt::Display for DecodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Checksum(msg) => write!(f, "checksum error: {msg}"),
            Self::Unsupported(msg) => write!(f, "unsupported: {msg}"),
        }
    }
}

/// Shorthand used throughout the per-format decoders.
pub(crate) fn format_error(msg: &str) -> DecodeStatus {
    DecodeStatus::Format(msg.to_string())
}

pub(crate) fn checksum_error(msg: &str) -> DecodeStatus {
    DecodeStatus::Checksum(msg.to_string())
}
