//! Decoded symbol results
//!
//! [`Barcode`] is the externally observable output: payload + geometry +
//! diagnostics. Internally it is assembled from a [`DecoderResult`]
//! (what the codewords said) and a [`DetectorResult`] (where the symbol
//! sat in the image).

use crate::bits::BitMatrix;
use crate::content::{Content, ContentType, SymbologyIdentifier, TextMode};
use crate::error::DecodeStatus;
use crate::format::BarcodeFormat;

/// An integer point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Four corners in order top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl Position {
    pub fn new(tl: Point, tr: Point, br: Point, bl: Point) -> Self {
        Self {
            top_left: tl,
            top_right: tr,
            bottom_right: br,
            bottom_left: bl,
        }
    }

    /// A flat 1D result spanning y from x_start to x_stop.
    pub fn from_row(y: i32, x_start: i32, x_stop: i32) -> Self {
        Self::new(
            Point::new(x_start, y),
            Point::new(x_stop, y),
            Point::new(x_stop, y),
            Point::new(x_start, y),
        )
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.top_left.x + self.top_right.x + self.bottom_right.x + self.bottom_left.x) / 4,
            (self.top_left.y + self.top_right.y + self.bottom_right.y + self.bottom_left.y) / 4,
        )
    }

    /// Orientation of the top edge in degrees, counter-clockwise.
    pub fn orientation(&self) -> i32 {
        let dx = (self.top_right.x - self.top_left.x) as f32;
        let dy = (self.top_right.y - self.top_left.y) as f32;
        (dy.atan2(dx).to_degrees()).round() as i32
    }

    fn bounds(&self) -> (i32, i32, i32, i32) {
        let xs = [
            self.top_left.x,
            self.top_right.x,
            self.bottom_right.x,
            self.bottom_left.x,
        ];
        let ys = [
            self.top_left.y,
            self.top_right.y,
            self.bottom_right.y,
            self.bottom_left.y,
        ];
        (
            *xs.iter().min().unwrap_or(&0),
            *ys.iter().min().unwrap_or(&0),
            *xs.iter().max().unwrap_or(&0),
            *ys.iter().max().unwrap_or(&0),
        )
    }

    /// Axis-aligned bounding box overlap test, used by dispatch to
    /// suppress double sightings.
    pub fn overlaps(&self, other: &Position) -> bool {
        let (l1, t1, r1, b1) = self.bounds();
        let (l2, t2, r2, b2) = other.bounds();
        l1 <= r2 && l2 <= r1 && t1 <= b2 && t2 <= b1
    }
}

/// What a detector hands to the bit extractor: the sampled module grid
/// plus where it came from.
#[derive(Debug, Clone)]
pub struct DetectorResult {
    pub bits: BitMatrix,
    pub position: Position,
}

impl DetectorResult {
    pub fn new(bits: BitMatrix, position: Position) -> Self {
        Self { bits, position }
    }
}

/// Structured append metadata: this symbol's place in a multi-symbol
/// message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredAppendInfo {
    /// Zero-based index, -1 when absent.
    pub index: i32,
    /// Total symbol count, -1 when unknown.
    pub count: i32,
    /// Parity / file id linking the parts.
    pub id: String,
}

impl StructuredAppendInfo {
    pub fn none() -> Self {
        Self {
            index: -1,
            count: -1,
            id: String::new(),
        }
    }
}

/// Outcome of the codeword-to-content stage for one symbol.
#[derive(Debug, Clone, Default)]
pub struct DecoderResult {
    pub content: Content,
    pub ec_level: String,
    pub version_number: i32,
    pub structured_append: StructuredAppendInfo,
    pub is_mirrored: bool,
    pub line_count: i32,
    pub error: DecodeStatus,
}

impl DecoderResult {
    pub fn new(content: Content) -> Self {
        Self {
            content,
            structured_append: StructuredAppendInfo::none(),
            ..Default::default()
        }
    }

    pub fn with_error(error: DecodeStatus) -> Self {
        Self {
            error,
            structured_append: StructuredAppendInfo::none(),
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_ok() && !self.content.is_empty()
    }

    pub fn ec_level(mut self, level: impl Into<String>) -> Self {
        self.ec_level = level.into();
        self
    }

    pub fn version_number(mut self, version: i32) -> Self {
        self.version_number = version;
        self
    }

    pub fn structured_append(mut self, info: StructuredAppendInfo) -> Self {
        self.structured_append = info;
        self
    }

    pub fn mirrored(mut self, mirrored: bool) -> Self {
        self.is_mirrored = mirrored;
        self
    }
}

/// A decoded symbol: the externally observable result of a scan.
#[derive(Debug, Clone)]
pub struct Barcode {
    format: BarcodeFormat,
    content: Content,
    ec_level: String,
    version_number: i32,
    structured_append: StructuredAppendInfo,
    position: Position,
    orientation: i32,
    is_mirrored: bool,
    is_inverted: bool,
    line_count: i32,
    error: DecodeStatus,
    text_mode: TextMode,
}

impl Barcode {
    pub(crate) fn new(
        format: BarcodeFormat,
        decoder_result: DecoderResult,
        position: Position,
    ) -> Self {
        let line_count = decoder_result.line_count.max(if format.is_linear() { 1 } else { 0 });
        Self {
            format,
            content: decoder_result.content,
            ec_level: decoder_result.ec_level,
            version_number: decoder_result.version_number,
            structured_append: decoder_result.structured_append,
            position,
            orientation: position.orientation(),
            is_mirrored: decoder_result.is_mirrored,
            is_inverted: false,
            line_count,
            error: decoder_result.error,
            text_mode: TextMode::default(),
        }
    }

    pub fn format(&self) -> BarcodeFormat {
        self.format
    }

    /// The payload rendered under the reader's text mode.
    pub fn text(&self) -> String {
        self.content.render(self.text_mode)
    }

    /// The payload rendered under an explicit text mode.
    pub fn text_with_mode(&self, mode: TextMode) -> String {
        self.content.render(mode)
    }

    pub fn bytes(&self) -> &[u8] {
        self.content.bytes()
    }

    /// Raw bytes with embedded ECI escape sequences.
    pub fn bytes_eci(&self) -> Vec<u8> {
        self.content.bytes_eci()
    }

    pub fn has_eci(&self) -> bool {
        self.content.has_eci()
    }

    pub fn content_type(&self) -> ContentType {
        self.content.content_type()
    }

    /// Error correction level as printed on the symbol ("M", "Q", "23%"...)
    /// empty when the symbology has none.
    pub fn ec_level(&self) -> &str {
        &self.ec_level
    }

    pub fn version_number(&self) -> i32 {
        self.version_number
    }

    /// Three-character AIM symbology identifier, e.g. `]Q1`.
    pub fn symbology_identifier(&self) -> String {
        let si = &self.content.symbology;
        let modifier = si.modifier
            + if self.content.has_eci() {
                si.eci_modifier_offset
            } else {
                0
            };
        format!("]{}{}", si.code as char, modifier)
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Rotation of the symbol in degrees, counter-clockwise.
    pub fn orientation(&self) -> i32 {
        self.orientation
    }

    pub fn is_mirrored(&self) -> bool {
        self.is_mirrored
    }

    pub fn is_inverted(&self) -> bool {
        self.is_inverted
    }

    /// Number of scan lines that confirmed this (1D) symbol.
    pub fn line_count(&self) -> i32 {
        self.line_count
    }

    pub fn sequence_index(&self) -> i32 {
        self.structured_append.index
    }

    pub fn sequence_size(&self) -> i32 {
        self.structured_append.count
    }

    pub fn sequence_id(&self) -> &str {
        &self.structured_append.id
    }

    pub fn error(&self) -> &DecodeStatus {
        &self.error
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_ok() && !self.content.is_empty()
    }

    // Dispatch-side mutators.

    pub(crate) fn set_inverted(&mut self, inverted: bool) {
        self.is_inverted = inverted;
    }

    pub(crate) fn set_text_mode(&mut self, mode: TextMode) {
        self.text_mode = mode;
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
        self.orientation = position.orientation();
    }

    pub(crate) fn set_orientation(&mut self, degrees: i32) {
        self.orientation = degrees;
    }

    pub(crate) fn add_line(&mut self, position: Position) {
        self.line_count += 1;
        // Grow the reported quadrilateral to the maximum y extent.
        let p = &mut self.position;
        if position.top_left.y < p.top_left.y {
            p.top_left = position.top_left;
            p.top_right = position.top_right;
        }
        if position.bottom_left.y > p.bottom_left.y {
            p.bottom_left = position.bottom_left;
            p.bottom_right = position.bottom_right;
        }
    }
}
