//! Data Matrix (ECC 200) reader
//!
//! The symbol is framed by an L-shaped solid finder on the left and
//! bottom edges and a dashed clock track on the other two. Data
//! codewords are descrambled through the standard ECC 200 placement
//! walk, corrected per interleaved Reed-Solomon block, and interpreted
//! by the ASCII / C40 / Text / X12 / EDIFACT / Base256 mode machine.

use crate::barcode::{Barcode, DecoderResult, Point, Position, StructuredAppendInfo};
use crate::bits::BitMatrix;
use crate::content::{Content, Eci, SymbologyIdentifier};
use crate::error::{checksum_error, format_error, DecodeStatus};
use crate::format::BarcodeFormat;
use crate::gf::gf256_data_matrix;
use crate::options::ReaderOptions;
use crate::rs::reed_solomon_decode;

// ============================================================================
// Symbol versions
// ============================================================================

/// One ECC 200 symbol size.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DmVersion {
    pub height: usize,
    pub width: usize,
    /// Data region count (vertical, horizontal).
    pub regions: (usize, usize),
    pub data_codewords: usize,
    pub ec_blocks: usize,
    pub ec_per_block: usize,
}

#[rustfmt::skip]
static VERSIONS: [DmVersion; 30] = [
    DmVersion { height: 10, width: 10, regions: (1, 1), data_codewords: 3, ec_blocks: 1, ec_per_block: 5 },
    DmVersion { height: 12, width: 12, regions: (1, 1), data_codewords: 5, ec_blocks: 1, ec_per_block: 7 },
    DmVersion { height: 14, width: 14, regions: (1, 1), data_codewords: 8, ec_blocks: 1, ec_per_block: 10 },
    DmVersion { height: 16, width: 16, regions: (1, 1), data_codewords: 12, ec_blocks: 1, ec_per_block: 12 },
    DmVersion { height: 18, width: 18, regions: (1, 1), data_codewords: 18, ec_blocks: 1, ec_per_block: 14 },
    DmVersion { height: 20, width: 20, regions: (1, 1), data_codewords: 22, ec_blocks: 1, ec_per_block: 18 },
    DmVersion { height: 22, width: 22, regions: (1, 1), data_codewords: 30, ec_blocks: 1, ec_per_block: 20 },
    DmVersion { height: 24, width: 24, regions: (1, 1), data_codewords: 36, ec_blocks: 1, ec_per_block: 24 },
    DmVersion { height: 26, width: 26, regions: (1, 1), data_codewords: 44, ec_blocks: 1, ec_per_block: 28 },
    DmVersion { height: 32, width: 32, regions: (2, 2), data_codewords: 62, ec_blocks: 1, ec_per_block: 36 },
    DmVersion { height: 36, width: 36, regions: (2, 2), data_codewords: 86, ec_blocks: 1, ec_per_block: 42 },
    DmVersion { height: 40, width: 40, regions: (2, 2), data_codewords: 114, ec_blocks: 1, ec_per_block: 48 },
    DmVersion { height: 44, width: 44, regions: (2, 2), data_codewords: 144, ec_blocks: 1, ec_per_block: 56 },
    DmVersion { height: 48, width: 48, regions: (2, 2), data_codewords: 174, ec_blocks: 1, ec_per_block: 68 },
    DmVersion { height: 52, width: 52, regions: (2, 2), data_codewords: 204, ec_blocks: 2, ec_per_block: 42 },
    DmVersion { height: 64, width: 64, regions: (4, 4), data_codewords: 280, ec_blocks: 2, ec_per_block: 56 },
    DmVersion { height: 72, width: 72, regions: (4, 4), data_codewords: 368, ec_blocks: 4, ec_per_block: 36 },
    DmVersion { height: 80, width: 80, regions: (4, 4), data_codewords: 456, ec_blocks: 4, ec_per_block: 48 },
    DmVersion { height: 88, width: 88, regions: (4, 4), data_codewords: 576, ec_blocks: 4, ec_per_block: 56 },
    DmVersion { height: 96, width: 96, regions: (4, 4), data_codewords: 696, ec_blocks: 4, ec_per_block: 68 },
    DmVersion { height: 104, width: 104, regions: (4, 4), data_codewords: 816, ec_blocks: 6, ec_per_block: 56 },
    DmVersion { height: 120, width: 120, regions: (6, 6), data_codewords: 1050, ec_blocks: 6, ec_per_block: 68 },
    DmVersion { height: 132, width: 132, regions: (6, 6), data_codewords: 1304, ec_blocks: 8, ec_per_block: 62 },
    DmVersion { height: 144, width: 144, regions: (6, 6), data_codewords: 1558, ec_blocks: 10, ec_per_block: 62 },
    DmVersion { height: 8, width: 18, regions: (1, 1), data_codewords: 5, ec_blocks: 1, ec_per_block: 7 },
    DmVersion { height: 8, width: 32, regions: (1, 2), data_codewords: 10, ec_blocks: 1, ec_per_block: 11 },
    DmVersion { height: 12, width: 26, regions: (1, 1), data_codewords: 16, ec_blocks: 1, ec_per_block: 14 },
    DmVersion { height: 12, width: 36, regions: (1, 2), data_codewords: 22, ec_blocks: 1, ec_per_block: 18 },
    DmVersion { height: 16, width: 36, regions: (1, 2), data_codewords: 32, ec_blocks: 1, ec_per_block: 24 },
    DmVersion { height: 16, width: 48, regions: (1, 2), data_codewords: 49, ec_blocks: 1, ec_per_block: 28 },
];

impl DmVersion {
    pub fn from_dimensions(height: usize, width: usize) -> Option<&'static DmVersion> {
        VERSIONS.iter().find(|v| v.height == height && v.width == width)
    }

    fn total_codewords(&self) -> usize {
        self.data_codewords + self.ec_blocks * self.ec_per_block
    }

    /// Mapping matrix size (symbol minus all finder/clock borders).
    fn mapping_size(&self) -> (usize, usize) {
        (
            self.height - 2 * self.regions.0,
            self.width - 2 * self.regions.1,
        )
    }
}

// ============================================================================
// ECC 200 placement
// ============================================================================

/// Bit positions of one codeword in the mapping matrix: the standard
/// placement walk, recorded as (row, col) per bit, MSB first.
pub(crate) fn placement_table(nrow: usize, ncol: usize) -> Vec<[(usize, usize); 8]> {
    let mut grid = vec![vec![false; ncol]; nrow];
    let mut table: Vec<[(usize, usize); 8]> = Vec::new();

    let module = |row: i32, col: i32| -> (usize, usize) {
        let (mut row, mut col) = (row, col);
        if row < 0 {
            row += nrow as i32;
            col += 4 - ((nrow as i32 + 4) % 8);
        }
        if col < 0 {
            col += ncol as i32;
            row += 4 - ((ncol as i32 + 4) % 8);
        }
        (row as usize, col as usize)
    };

    let mut place = |grid: &mut Vec<Vec<bool>>, table: &mut Vec<[(usize, usize); 8]>, positions: [(i32, i32); 8]| {
        let mut resolved = [(0usize, 0usize); 8];
        for (i, &(r, c)) in positions.iter().enumerate() {
            let (r, c) = module(r, c);
            grid[r][c] = true;
            resolved[i] = (r, c);
        }
        table.push(resolved);
    };

    let (mut row, mut col) = (4i32, 0i32);
    let (nrow_i, ncol_i) = (nrow as i32, ncol as i32);
    loop {
        if row == nrow_i && col == 0 {
            place(&mut grid, &mut table, [
                (nrow_i - 1, 0), (nrow_i - 1, 1), (nrow_i - 1, 2),
                (0, ncol_i - 2), (0, ncol_i - 1), (1, ncol_i - 1),
                (2, ncol_i - 1), (3, ncol_i - 1),
            ]);
        }
        if row == nrow_i - 2 && col == 0 && ncol_i % 4 != 0 {
            place(&mut grid, &mut table, [
                (nrow_i - 3, 0), (nrow_i - 2, 0), (nrow_i - 1, 0),
                (0, ncol_i - 4), (0, ncol_i - 3), (0, ncol_i - 2),
                (0, ncol_i - 1), (1, ncol_i - 1),
            ]);
        }
        if row == nrow_i - 2 && col == 0 && ncol_i % 8 == 4 {
            place(&mut grid, &mut table, [
                (nrow_i - 3, 0), (nrow_i - 2, 0), (nrow_i - 1, 0),
                (0, ncol_i - 2), (0, ncol_i - 1), (1, ncol_i - 1),
                (2, ncol_i - 1), (3, ncol_i - 1),
            ]);
        }
        if row == nrow_i + 4 && col == 2 && ncol_i % 8 == 0 {
            place(&mut grid, &mut table, [
                (nrow_i - 1, 0), (nrow_i - 1, ncol_i - 1),
                (0, ncol_i - 3), (0, ncol_i - 2), (0, ncol_i - 1),
                (1, ncol_i - 3), (1, ncol_i - 2), (1, ncol_i - 1),
            ]);
        }

        // Sweep up and to the right.
        loop {
            if row < nrow_i && col >= 0 && !grid[row as usize][col as usize] {
                place(&mut grid, &mut table, [
                    (row - 2, col - 2), (row - 2, col - 1),
                    (row - 1, col - 2), (row - 1, col - 1), (row - 1, col),
                    (row, col - 2), (row, col - 1), (row, col),
                ]);
            }
            row -= 2;
            col += 2;
            if row < 0 || col >= ncol_i {
                break;
            }
        }
        row += 1;
        col += 3;

        // Sweep down and to the left.
        loop {
            if row >= 0 && col < ncol_i && !grid[row as usize][col as usize] {
                place(&mut grid, &mut table, [
                    (row - 2, col - 2), (row - 2, col - 1),
                    (row - 1, col - 2), (row - 1, col - 1), (row - 1, col),
                    (row, col - 2), (row, col - 1), (row, col),
                ]);
            }
            row += 2;
            col -= 2;
            if row >= nrow_i || col < 0 {
                break;
            }
        }
        row += 3;
        col += 1;

        if row >= nrow_i && col >= ncol_i {
            break;
        }
    }
    table
}

/// Translate mapping-matrix coordinates to symbol coordinates, skipping
/// the finder/clock borders of each data region.
fn mapping_to_symbol(version: &DmVersion, row: usize, col: usize) -> (usize, usize) {
    let region_height = (version.height / version.regions.0) - 2;
    let region_width = (version.width / version.regions.1) - 2;
    let region_row = row / region_height;
    let region_col = col / region_width;
    (
        1 + region_row * (region_height + 2) + row % region_height,
        1 + region_col * (region_width + 2) + col % region_width,
    )
}

/// Read the codeword stream out of a sampled symbol matrix.
fn extract_codewords(matrix: &BitMatrix, version: &DmVersion) -> Option<Vec<u8>> {
    let (nrow, ncol) = version.mapping_size();
    let table = placement_table(nrow, ncol);
    if table.len() < version.total_codewords() {
        return None;
    }
    let mut codewords = Vec::with_capacity(version.total_codewords());
    for positions in table.iter().take(version.total_codewords()) {
        let mut value = 0u8;
        for &(r, c) in positions {
            let (y, x) = mapping_to_symbol(version, r, c);
            value = value << 1 | u8::from(matrix.get(x, y));
        }
        codewords.push(value);
    }
    Some(codewords)
}

// ============================================================================
// Error correction
// ============================================================================

fn correct_codewords(codewords: &[u8], version: &DmVersion) -> Result<Vec<u8>, DecodeStatus> {
    let blocks = version.ec_blocks;
    let field = gf256_data_matrix();
    let mut data = vec![0u8; version.data_codewords];
    for b in 0..blocks {
        // Codewords are interleaved across blocks; the 144x144 symbol
        // has two short trailing data blocks.
        let mut block: Vec<u32> = Vec::new();
        let mut data_positions = Vec::new();
        let mut i = b;
        while i < version.data_codewords {
            block.push(u32::from(codewords[i]));
            data_positions.push(i);
            i += blocks;
        }
        let mut i = version.data_codewords + b;
        while i < version.total_codewords() {
            block.push(u32::from(codewords[i]));
            i += blocks;
        }
        reed_solomon_decode(field, &mut block, version.ec_per_block)
            .map_err(|_| checksum_error("Reed-Solomon failure in a data block"))?;
        for (j, &pos) in data_positions.iter().enumerate() {
            data[pos] = block[j] as u8;
        }
    }
    Ok(data)
}

// ============================================================================
// Content decoding
// ============================================================================

const C40_BASIC: &[u8] = b"\x00\x01\x02 0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const C40_SHIFT2: &[u8] = b"!\"#$%&'()*+,-./:;<=>?@[\\]^_";
const TEXT_BASIC: &[u8] = b"\x00\x01\x02 0123456789abcdefghijklmnopqrstuvwxyz";

/// Shared by Code One, whose encodation scheme is the Data Matrix one.
pub(crate) fn decode_content(bytes: &[u8], symbology: SymbologyIdentifier) -> DecoderResult {
    let mut content = Content::new();
    content.symbology = symbology;
    let mut sa = StructuredAppendInfo::none();
    let mut pos = 0;
    let mut upper_shift = false;

    while pos < bytes.len() {
        let code = bytes[pos];
        pos += 1;
        match code {
            0 => return DecoderResult::with_error(format_error("invalid codeword 0")),
            1..=128 => {
                // ASCII data, offset by one.
                let mut c = code - 1;
                if upper_shift {
                    c = c.wrapping_add(128);
                    upper_shift = false;
                }
                content.push(c);
            }
            129 => break, // padding ends the stream
            130..=229 => {
                let value = code - 130;
                content.push(b'0' + value / 10);
                content.push(b'0' + value % 10);
            }
            230 => pos = decode_c40_like(bytes, pos, &mut content, false),
            231 => pos = decode_base256(bytes, pos, &mut content),
            232 => {
                if content.is_empty() {
                    content.apply_fnc1_in_first_position();
                } else {
                    content.push(0x1D);
                }
            }
            233 => {
                // Structured append: index/count nibble pair + 2 file id bytes.
                if pos + 2 < bytes.len() {
                    sa.index = i32::from(bytes[pos] >> 4);
                    sa.count = i32::from(bytes[pos] & 0x0F) + 1;
                    sa.id = format!("{}", (u32::from(bytes[pos + 1]) << 8) | u32::from(bytes[pos + 2]));
                    pos += 3;
                }
            }
            234 => {} // reader programming
            235 => upper_shift = true,
            236 => {
                content.append(b"[)>\x1e05\x1d");
                content.iso15434 = true;
            }
            237 => {
                content.append(b"[)>\x1e06\x1d");
                content.iso15434 = true;
            }
            238 => pos = decode_x12(bytes, pos, &mut content),
            239 => pos = decode_c40_like(bytes, pos, &mut content, true),
            240 => pos = decode_edifact(bytes, pos, &mut content),
            241 => {
                // ECI: one byte for the common range.
                if pos < bytes.len() {
                    let value = u32::from(bytes[pos]) - 1;
                    content.switch_encoding(Eci(value));
                    pos += 1;
                }
            }
            _ => return DecoderResult::with_error(format_error("unknown codeword")),
        }
    }

    let mut result = DecoderResult::new(content);
    result.structured_append = sa;
    result
}

/// C40 (or Text when `lower` is set): pairs of codewords pack three
/// 40-state values. Returns to ASCII on 254 or stream end.
fn decode_c40_like(bytes: &[u8], mut pos: usize, content: &mut Content, lower: bool) -> usize {
    let basic = if lower { TEXT_BASIC } else { C40_BASIC };
    let mut shift = 0usize;
    let mut upper_shift = false;
    while pos + 1 < bytes.len() {
        if bytes[pos] == 254 {
            return pos + 1;
        }
        let packed = usize::from(bytes[pos]) << 8 | usize::from(bytes[pos + 1]);
        pos += 2;
        let packed = packed.saturating_sub(1);
        let values = [packed / 1600, packed / 40 % 40, packed % 40];
        for &v in &values {
            let mut decoded: Option<u8> = None;
            match shift {
                1 => {
                    decoded = Some(v as u8); // control characters
                    shift = 0;
                }
                2 => {
                    if v < C40_SHIFT2.len() {
                        decoded = Some(C40_SHIFT2[v]);
                    } else if v == 27 {
                        content.push(0x1D); // FNC1 inside C40
                    } else if v == 30 {
                        upper_shift = true;
                    }
                    shift = 0;
                }
                3 => {
                    let base = if lower { 0x20u8 } else { 0x60 };
                    decoded = Some(base.wrapping_add(v as u8));
                    shift = 0;
                }
                _ => match v {
                    0..=2 => shift = v + 1,
                    _ => decoded = Some(basic[v]),
                },
            }
            if let Some(mut c) = decoded {
                if upper_shift {
                    c = c.wrapping_add(128);
                    upper_shift = false;
                }
                content.push(c);
            }
        }
    }
    bytes.len()
}

/// X12: the 40-state packing with the ANSI X12 terminal set.
fn decode_x12(bytes: &[u8], mut pos: usize, content: &mut Content) -> usize {
    while pos + 1 < bytes.len() {
        if bytes[pos] == 254 {
            return pos + 1;
        }
        let packed = (usize::from(bytes[pos]) << 8 | usize::from(bytes[pos + 1])).saturating_sub(1);
        pos += 2;
        for v in [packed / 1600, packed / 40 % 40, packed % 40] {
            let c = match v {
                0 => 0x0D,
                1 => b'*',
                2 => b'>',
                3 => b' ',
                4..=13 => b'0' + (v as u8 - 4),
                _ => b'A' + (v as u8 - 14),
            };
            content.push(c);
        }
    }
    bytes.len()
}

/// EDIFACT: four 6-bit values per three codewords; 0x1F returns to ASCII.
fn decode_edifact(bytes: &[u8], mut pos: usize, content: &mut Content) -> usize {
    let mut bit_buffer = 0u32;
    let mut bit_count = 0usize;
    loop {
        while bit_count < 6 {
            if pos >= bytes.len() {
                return pos;
            }
            bit_buffer = bit_buffer << 8 | u32::from(bytes[pos]);
            bit_count += 8;
            pos += 1;
        }
        let value = (bit_buffer >> (bit_count - 6)) as u8 & 0x3F;
        bit_count -= 6;
        if value == 0x1F {
            // Unlatch; remaining partial bits resume as ASCII codewords.
            return pos - bit_count / 8;
        }
        content.push(if value & 0x20 == 0 { value | 0x40 } else { value });
    }
}

/// Base256 with the 255-state pseudo-randomization undone.
fn decode_base256(bytes: &[u8], mut pos: usize, content: &mut Content) -> usize {
    let unrandomize = |value: u8, position: usize| -> u8 {
        let pseudo = ((149 * position) % 255 + 1) as u8;
        value.wrapping_sub(pseudo)
    };
    if pos >= bytes.len() {
        return pos;
    }
    let d1 = usize::from(unrandomize(bytes[pos], pos + 1));
    pos += 1;
    let length = if d1 == 0 {
        bytes.len() - pos
    } else if d1 < 250 {
        d1
    } else {
        let d2 = usize::from(unrandomize(bytes[pos], pos + 1));
        pos += 1;
        250 * (d1 - 249) + d2
    };
    for _ in 0..length {
        if pos >= bytes.len() {
            break;
        }
        content.push(unrandomize(bytes[pos], pos + 1));
        pos += 1;
    }
    pos
}

// ============================================================================
// Detection
// ============================================================================

/// Axis-aligned detection: the bounding box must show the solid L on
/// the left/bottom edges and the alternating clock track on the other
/// two; the clock period fixes the module size.
fn detect(image: &BitMatrix, _opts: &ReaderOptions) -> Option<(BitMatrix, Position, &'static DmVersion)> {
    let (left, top, width, height) = image.find_bounding_box(8)?;

    // Module size from the top clock track: runs alternate 1:1.
    let mut first_run = 0;
    while first_run < width && image.get(left + first_run, top) {
        first_run += 1;
    }
    if first_run == 0 || first_run >= width {
        return None;
    }
    let module = first_run as f32;
    for version in VERSIONS.iter() {
        let (h, w) = (version.height, version.width);
        let (mw, mh) = (
            (width as f32 / module).round() as usize,
            (height as f32 / module).round() as usize,
        );
        if mw != w || mh != h {
            continue;
        }
        let grid = BitMatrix::from_fn(w, h, |x, y| {
            let px = left + ((x as f32 + 0.5) * module) as usize;
            let py = top + ((y as f32 + 0.5) * module) as usize;
            image.get(px.min(image.width() - 1), py.min(image.height() - 1))
        });
        if !check_finder(&grid) {
            continue;
        }
        let position = Position::new(
            Point::new(left as i32, top as i32),
            Point::new((left + width) as i32, top as i32),
            Point::new((left + width) as i32, (top + height) as i32),
            Point::new(left as i32, (top + height) as i32),
        );
        return Some((grid, position, version));
    }
    None
}

/// Solid left column and bottom row, alternating top row and right
/// column, with a small error budget.
fn check_finder(grid: &BitMatrix) -> bool {
    let (w, h) = (grid.width(), grid.height());
    let mut errors = 0;
    for y in 0..h {
        errors += usize::from(!grid.get(0, y));
    }
    for x in 0..w {
        errors += usize::from(!grid.get(x, h - 1));
    }
    for x in 0..w {
        errors += usize::from(grid.get(x, 0) != (x % 2 == 0));
    }
    for y in 0..h {
        errors += usize::from(grid.get(w - 1, y) != (y % 2 == 1));
    }
    errors <= (w + h) / 8
}

/// Decode every Data Matrix symbol in the image.
pub(crate) fn read(image: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    if !opts.has_format(BarcodeFormat::DataMatrix) {
        return Vec::new();
    }
    let Some((grid, position, version)) = detect(image, opts) else {
        return Vec::new();
    };
    let mut result = match extract_codewords(&grid, version) {
        Some(codewords) => match correct_codewords(&codewords, version) {
            Ok(data) => decode_content(&data, SymbologyIdentifier::with_eci_offset(b'd', 1, 3)),
            Err(status) => DecoderResult::with_error(status),
        },
        None => DecoderResult::with_error(format_error("placement table mismatch")),
    };
    result.version_number = (VERSIONS
        .iter()
        .position(|v| v.height == version.height && v.width == version.width)
        .unwrap_or(0)
        + 1) as i32;
    if result.error.is_error() && !opts.return_errors {
        return Vec::new();
    }
    vec![Barcode::new(BarcodeFormat::DataMatrix, result, position)]
}
