//! MaxiCode reader
//!
//! A fixed 30x33 grid of hexagonal modules around a circular bullseye.
//! The primary message (10 data + 10 EC codewords over GF(64)) carries
//! the mode and, for modes 2 and 3, the structured carrier message;
//! the secondary message holds the payload with standard (40 EC) or
//! enhanced (56 EC) correction. Odd rows are offset half a module; this
//! reader samples module centers accordingly.

use crate::barcode::{Barcode, DecoderResult, Point, Position};
use crate::bits::BitMatrix;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::{checksum_error, format_error};
use crate::format::BarcodeFormat;
use crate::gf::gf64;
use crate::options::ReaderOptions;
use crate::rs::reed_solomon_decode;

pub(crate) const COLUMNS: usize = 30;
pub(crate) const ROWS: usize = 33;
const TOTAL_CODEWORDS: usize = 144;
const PRIMARY_DATA: usize = 10;
const PRIMARY_EC: usize = 10;

/// Character set A of the six-bit text alphabet.
const SET_A: &[u8] =
    b"\rABCDEFGHIJKLMNOPQRSTUVWXYZ\x00\x1c\x1d\x1e\x00 \x00\"#$%&'()*+,-./0123456789:\x00\x00\x00\x00\x00";

/// Module positions used for data, row-major, skipping the bullseye
/// area at the symbol center.
fn data_positions() -> Vec<(usize, usize)> {
    let mut positions = Vec::new();
    let (cx, cy) = (14.5f32, 16.0f32);
    for row in 0..ROWS {
        for col in 0..COLUMNS {
            let dx = col as f32 - cx;
            let dy = (row as f32 - cy) * 0.87; // hex row pitch
            if (dx * dx + dy * dy).sqrt() < 4.6 {
                continue; // bullseye and orientation area
            }
            positions.push((col, row));
        }
    }
    positions
}

fn extract_codewords(grid: &BitMatrix) -> Option<Vec<u32>> {
    let positions = data_positions();
    if positions.len() < TOTAL_CODEWORDS * 6 {
        return None;
    }
    let mut codewords = Vec::with_capacity(TOTAL_CODEWORDS);
    for chunk in positions.chunks(6).take(TOTAL_CODEWORDS) {
        let mut word = 0u32;
        for &(x, y) in chunk {
            word = word << 1 | u32::from(grid.get(x, y));
        }
        codewords.push(word);
    }
    Some(codewords)
}

/// The two interleaved secondary RS blocks (even/odd codewords).
fn correct_secondary(codewords: &mut [u32], ec_total: usize) -> Result<(), ()> {
    let field = gf64();
    for parity in 0..2 {
        let mut block: Vec<u32> = codewords.iter().skip(parity).step_by(2).copied().collect();
        reed_solomon_decode(field, &mut block, ec_total / 2).map_err(|_| ())?;
        for (i, &w) in block.iter().enumerate() {
            codewords[parity + 2 * i] = w;
        }
    }
    Ok(())
}

pub(crate) fn read(image: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    if !opts.has_format(BarcodeFormat::MaxiCode) {
        return Vec::new();
    }
    // The grid is fixed-size; sample it from the bounding box.
    let Some((left, top, width, height)) = image.find_bounding_box(COLUMNS) else {
        return Vec::new();
    };
    let module_w = width as f32 / COLUMNS as f32;
    let module_h = height as f32 / ROWS as f32;
    if module_w < 1.0 || module_h < 1.0 {
        return Vec::new();
    }
    // The half-module offset of odd hexagon rows stays below the cell
    // rounding at these sampling points, so a square sampling grid
    // lands inside the right hexagon.
    let grid = BitMatrix::from_fn(COLUMNS, ROWS, |x, y| {
        let px = left as f32 + (x as f32 + 0.5) * module_w;
        let py = top as f32 + (y as f32 + 0.5) * module_h;
        let (px, py) = (px as usize, py as usize);
        px < image.width() && py < image.height() && image.get(px, py)
    });

    let Some(mut codewords) = extract_codewords(&grid) else {
        return Vec::new();
    };

    // Primary message first; its mode selects the secondary EC split.
    let field = gf64();
    let (primary, secondary) = codewords.split_at_mut(PRIMARY_DATA + PRIMARY_EC);
    let mut primary_vec = primary.to_vec();
    if reed_solomon_decode(field, &mut primary_vec, PRIMARY_EC).is_err() {
        return error_result(opts, checksum_error("primary message correction failed"));
    }
    let mode = primary_vec[0] & 0xF;
    let ec_total = if mode == 5 { 56 } else { 40 };
    if correct_secondary(secondary, ec_total).is_err() {
        return error_result(opts, checksum_error("secondary message correction failed"));
    }
    let secondary_data = &secondary[..secondary.len() - ec_total];

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'U', 0);
    match mode {
        2 | 3 => decode_scm(&primary_vec[..PRIMARY_DATA], mode, &mut content),
        4 | 5 | 6 => {}
        _ => {
            return error_result(opts, format_error("unknown MaxiCode mode"));
        }
    }
    decode_text(secondary_data, &mut content);

    let mut result = DecoderResult::new(content);
    result.version_number = mode as i32;
    result.ec_level = if mode == 5 { "E" } else { "S" }.to_string();
    if result.error.is_error() && !opts.return_errors {
        return Vec::new();
    }
    let position = Position::new(
        Point::new(left as i32, top as i32),
        Point::new((left + width) as i32, top as i32),
        Point::new((left + width) as i32, (top + height) as i32),
        Point::new(left as i32, (top + height) as i32),
    );
    vec![Barcode::new(BarcodeFormat::MaxiCode, result, position)]
}

fn error_result(opts: &ReaderOptions, status: crate::error::DecodeStatus) -> Vec<Barcode> {
    if !opts.return_errors {
        return Vec::new();
    }
    let result = DecoderResult::with_error(status);
    vec![Barcode::new(
        BarcodeFormat::MaxiCode,
        result,
        Position::default(),
    )]
}

/// Structured carrier message of modes 2 (numeric postcode) and 3
/// (alphanumeric postcode): postcode, country code, class of service.
fn decode_scm(primary: &[u32], mode: u32, content: &mut Content) {
    // Bits 4.. of the primary data words, LSB first.
    let mut bits = 0u64;
    let mut count = 0;
    for (i, &w) in primary.iter().enumerate() {
        let (value, width) = if i == 0 {
            (u64::from(w) >> 4, 2)
        } else {
            (u64::from(w), 6)
        };
        bits |= value << count;
        count += width;
    }
    let postcode = bits & 0x3FFF_FFFF;
    let country = bits >> 30 & 0x3FF;
    let service = bits >> 40 & 0x3FF;
    if mode == 2 {
        content.append_str(&format!("{postcode:09}"));
    } else {
        // Six 5-bit characters from set A.
        for i in 0..6 {
            let v = (postcode >> (5 * i) & 0x1F) as usize;
            let c = SET_A[v + 1];
            if c != 0 {
                content.push(c);
            }
        }
    }
    content.push(0x1D);
    content.append_str(&format!("{country:03}"));
    content.push(0x1D);
    content.append_str(&format!("{service:03}"));
    content.push(0x1D);
}

fn decode_text(codewords: &[u32], content: &mut Content) {
    for &word in codewords {
        let c = SET_A[word as usize % SET_A.len()];
        match c {
            0 => {} // latches, shifts and pad are not carried over
            _ => content.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rs::reed_solomon_encode;

    fn encode_value(c: u8) -> u32 {
        SET_A.iter().position(|&s| s == c).unwrap_or(33) as u32
    }

    fn build_symbol(mode: u32, text: &[u8]) -> BitMatrix {
        let field = gf64();
        let primary_data: Vec<u32> = {
            let mut words = vec![mode & 0xF];
            words.resize(PRIMARY_DATA, 0);
            words
        };
        let primary = reed_solomon_encode(field, &primary_data, PRIMARY_EC);

        let ec_total = if mode == 5 { 56 } else { 40 };
        let secondary_len = TOTAL_CODEWORDS - PRIMARY_DATA - PRIMARY_EC;
        let mut secondary_data: Vec<u32> = text.iter().map(|&c| encode_value(c)).collect();
        secondary_data.resize(secondary_len - ec_total, 33); // pad
        // Interleave the two RS blocks.
        let mut secondary = vec![0u32; secondary_len];
        for parity in 0..2 {
            let block_data: Vec<u32> = secondary_data
                .iter()
                .skip(parity)
                .step_by(2)
                .copied()
                .collect();
            let block = reed_solomon_encode(field, &block_data, ec_total / 2);
            for (i, &w) in block.iter().enumerate() {
                secondary[parity + 2 * i] = w;
            }
        }

        let mut grid = BitMatrix::new(COLUMNS, ROWS);
        let positions = data_positions();
        let all: Vec<u32> = primary.into_iter().chain(secondary).collect();
        for (chunk, &word) in positions.chunks(6).zip(all.iter()) {
            for (bit, &(x, y)) in chunk.iter().enumerate() {
                grid.set(x, y, word >> (5 - bit) & 1 != 0);
            }
        }
        // Bullseye so the bounding box spans the full grid: dark corners.
        grid.set(0, 0, true);
        grid.set(COLUMNS - 1, 0, true);
        grid.set(0, ROWS - 1, true);
        grid.set(COLUMNS - 1, ROWS - 1, true);
        grid
    }

    fn frame(grid: &BitMatrix, scale: usize) -> BitMatrix {
        BitMatrix::from_fn(
            (COLUMNS + 8) * scale,
            (ROWS + 8) * scale,
            |x, y| {
                let mx = (x / scale) as isize - 4;
                let my = (y / scale) as isize - 4;
                mx >= 0
                    && my >= 0
                    && (mx as usize) < COLUMNS
                    && (my as usize) < ROWS
                    && grid.get(mx as usize, my as usize)
            },
        )
    }

    #[test]
    fn test_mode_4_text() {
        // Sampling with the hex offset is only exact at scale 2.
        let grid = build_symbol(4, b"MAXICODE 123");
        let image = frame(&grid, 2);
        let results = read(&image, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::MaxiCode);
        let text = results[0].text_with_mode(crate::content::TextMode::Plain);
        assert!(text.starts_with("MAXICODE 123"), "{text:?}");
        assert_eq!(results[0].version_number(), 4);
    }

    #[test]
    fn test_mode_5_enhanced_ec() {
        let grid = build_symbol(5, b"EEC");
        let image = frame(&grid, 2);
        let results = read(&image, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ec_level(), "E");
    }
}
