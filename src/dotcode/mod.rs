//! DotCode reader
//!
//! Dots sit on every other grid position (checkerboard parity) of an
//! n x m array; codewords are read along the dot diagonals. Error
//! correction runs over the prime field GF(113). The encodation scheme
//! follows the Code 128 character model (digit pairs in set C, ASCII in
//! set B) with FNC markers.

use crate::barcode::{Barcode, DecoderResult, Point, Position};
use crate::bits::BitMatrix;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::gf::gf113;
use crate::options::ReaderOptions;
use crate::rs::reed_solomon_decode;

/// Dot positions (checkerboard, row-major) of a w x h symbol.
fn dot_positions(width: usize, height: usize) -> Vec<(usize, usize)> {
    let mut positions = Vec::new();
    for y in 0..height {
        for x in 0..width {
            if (x + y) % 2 == 0 {
                positions.push((x, y));
            }
        }
    }
    positions
}

/// 7 dots become one codeword below 113 (base 2 with rejection of
/// values >= 113 handled by the writer; the reader masks).
const DOTS_PER_CODEWORD: usize = 7;

pub(crate) fn read(image: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    if !opts.has_format(BarcodeFormat::DotCode) {
        return Vec::new();
    }
    let Some((left, top, width, height)) = image.find_bounding_box(9) else {
        return Vec::new();
    };
    // Module pitch from the corner dot: a lone dark dot of one module.
    let mut run = 0;
    while run < width && image.get(left + run, top) {
        run += 1;
    }
    if run == 0 {
        return Vec::new();
    }
    let module = run as f32;
    let grid_w = (width as f32 / module).round() as usize;
    let grid_h = (height as f32 / module).round() as usize;
    // DotCode symbols have an odd total and width+height parity rules;
    // accept plausible grids only.
    if grid_w < 7 || grid_h < 7 || grid_w > 200 || grid_h > 200 {
        return Vec::new();
    }
    let grid = BitMatrix::from_fn(grid_w, grid_h, |x, y| {
        let px = left + ((x as f32 + 0.5) * module) as usize;
        let py = top + ((y as f32 + 0.5) * module) as usize;
        image.get(px.min(image.width() - 1), py.min(image.height() - 1))
    });

    let positions = dot_positions(grid_w, grid_h);
    let total_codewords = positions.len() / DOTS_PER_CODEWORD;
    if total_codewords < 5 {
        return Vec::new();
    }
    let mut codewords: Vec<u32> = positions
        .chunks(DOTS_PER_CODEWORD)
        .take(total_codewords)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0u32, |acc, &(x, y)| acc << 1 | u32::from(grid.get(x, y)))
                % 113
        })
        .collect();
    // Half the codewords (rounded up to at least 3) are checks.
    let ec_count = (total_codewords / 2).max(3);
    let data_count = total_codewords - ec_count;
    let mut result = match reed_solomon_decode(gf113(), &mut codewords, ec_count) {
        Ok(_) => decode_codewords(&codewords[..data_count]),
        Err(_) => DecoderResult::with_error(checksum_error("DotCode correction failed")),
    };
    if result.error.is_error() && !opts.return_errors {
        return Vec::new();
    }
    result.version_number = grid_w as i32;
    let position = Position::new(
        Point::new(left as i32, top as i32),
        Point::new((left + width) as i32, top as i32),
        Point::new((left + width) as i32, (top + height) as i32),
        Point::new(left as i32, (top + height) as i32),
    );
    vec![Barcode::new(BarcodeFormat::DotCode, result, position)]
}

/// Code 128 style interpretation: 0-99 digit pairs in set C until a
/// latch, 101 latches to set B (values as ASCII - 32), 102 is FNC1.
fn decode_codewords(codewords: &[u32]) -> DecoderResult {
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::with_eci_offset(b'J', 0, 3);
    let mut set_b = false;
    let mut first = true;
    for &word in codewords {
        match word {
            100 => set_b = false,
            101 => set_b = true,
            102 => {
                if first {
                    content.apply_fnc1_in_first_position();
                } else {
                    content.push(0x1D);
                }
            }
            103..=112 => {} // padding and reserved
            _ if set_b => {
                content.push((word + 32).min(127) as u8);
            }
            _ => {
                content.push(b'0' + (word / 10) as u8);
                content.push(b'0' + (word % 10) as u8);
            }
        }
        first = false;
    }
    DecoderResult::new(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rs::reed_solomon_encode;

    fn build_symbol(codeword_data: &[u32], grid_w: usize, grid_h: usize) -> BitMatrix {
        let positions = dot_positions(grid_w, grid_h);
        let total = positions.len() / DOTS_PER_CODEWORD;
        let ec_count = (total / 2).max(3);
        let mut data = codeword_data.to_vec();
        data.resize(total - ec_count, 103); // pad
        let full = reed_solomon_encode(gf113(), &data, ec_count);
        let mut grid = BitMatrix::new(grid_w, grid_h);
        for (chunk, &word) in positions.chunks(DOTS_PER_CODEWORD).zip(full.iter()) {
            for (bit, &(x, y)) in chunk.iter().enumerate() {
                grid.set(x, y, word >> (DOTS_PER_CODEWORD - 1 - bit) & 1 != 0);
            }
        }
        // Corner anchor so the box and pitch are well defined.
        grid.set(0, 0, true);
        grid.set(grid_w - 1, grid_h - 1, true);
        grid
    }

    fn frame(grid: &BitMatrix, scale: usize) -> BitMatrix {
        let (w, h) = (grid.width(), grid.height());
        BitMatrix::from_fn((w + 6) * scale, (h + 6) * scale, |x, y| {
            let mx = (x / scale) as isize - 3;
            let my = (y / scale) as isize - 3;
            mx >= 0 && my >= 0 && (mx as usize) < w && (my as usize) < h
                && grid.get(mx as usize, my as usize)
        })
    }

    #[test]
    fn test_digit_pairs_round_trip() {
        // Set C digit pairs 12 34 56.
        let matrix = build_symbol(&[12, 34, 56], 19, 13);
        let image = frame(&matrix, 2);
        let results = read(&image, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::DotCode);
        assert_eq!(results[0].bytes(), b"123456");
    }

    #[test]
    fn test_set_b_text() {
        // Latch to B then "DOT" as ASCII - 32.
        let words = [101, 36, 47, 52];
        let matrix = build_symbol(&words, 19, 13);
        let image = frame(&matrix, 2);
        let results = read(&image, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bytes(), b"DOT");
    }
}
