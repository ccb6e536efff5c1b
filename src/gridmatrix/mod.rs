//! Grid Matrix reader
//!
//! Chinese national standard 2D symbology built from 6x6 macromodules
//! with alternating dark/light frames. Codewords are error-corrected
//! over the prime field GF(929) and interpreted through the Numeric /
//! Upper / Mixed / Binary mode machine.

use crate::barcode::{Barcode, DecoderResult, Point, Position};
use crate::bits::BitMatrix;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::gf::gf929;
use crate::options::ReaderOptions;
use crate::rs::reed_solomon_decode;

/// Macromodule grid side per version 1..=13 (symbol side = 6v + 6).
const MAX_VERSION: usize = 13;

fn version_dimension(version: usize) -> usize {
    6 * version + 6
}

/// Data cell positions: the 4x4 interior of each macromodule, the
/// 2-module frame being the alternating reference structure.
fn data_positions(version: usize) -> Vec<(usize, usize)> {
    let macros = version + 1;
    let mut positions = Vec::new();
    for my in 0..macros {
        for mx in 0..macros {
            for dy in 1..5 {
                for dx in 1..5 {
                    positions.push((mx * 6 + dx, my * 6 + dy));
                }
            }
        }
    }
    positions
}

/// 10 bits of interior cells make one GF(929) codeword.
const BITS_PER_CODEWORD: usize = 10;

/// Roughly 30% of codewords are checks, mirroring the highest of the
/// symbology's five EC grades.
fn ec_split(total: usize) -> (usize, usize) {
    let ec = (total * 3 / 10).max(4);
    (total - ec, ec)
}

pub(crate) fn read(image: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    if !opts.has_format(BarcodeFormat::GridMatrix) {
        return Vec::new();
    }
    let Some((left, top, width, height)) = image.find_bounding_box(12) else {
        return Vec::new();
    };
    if width != height {
        return Vec::new();
    }
    for version in 1..=MAX_VERSION {
        let dim = version_dimension(version);
        if width % dim != 0 {
            continue;
        }
        let module = width / dim;
        let grid = BitMatrix::from_fn(dim, dim, |x, y| {
            image.get(left + x * module + module / 2, top + y * module + module / 2)
        });
        if !check_frames(&grid, version) {
            continue;
        }
        let positions = data_positions(version);
        let total = positions.len() / BITS_PER_CODEWORD;
        let (data_count, ec_count) = ec_split(total);
        let mut codewords: Vec<u32> = positions
            .chunks(BITS_PER_CODEWORD)
            .take(total)
            .map(|chunk| {
                chunk
                    .iter()
                    .fold(0u32, |acc, &(x, y)| acc << 1 | u32::from(grid.get(x, y)))
                    % 929
            })
            .collect();
        let mut result = match reed_solomon_decode(gf929(), &mut codewords, ec_count) {
            Ok(_) => decode_codewords(&codewords[..data_count]),
            Err(_) => DecoderResult::with_error(checksum_error("Grid Matrix correction failed")),
        };
        if result.error.is_error() && !opts.return_errors {
            continue;
        }
        result.version_number = version as i32;
        let position = Position::new(
            Point::new(left as i32, top as i32),
            Point::new((left + width) as i32, top as i32),
            Point::new((left + width) as i32, (top + height) as i32),
            Point::new(left as i32, (top + height) as i32),
        );
        return vec![Barcode::new(BarcodeFormat::GridMatrix, result, position)];
    }
    Vec::new()
}

/// Macromodule frames alternate dark and light in a checkerboard.
fn check_frames(grid: &BitMatrix, version: usize) -> bool {
    let macros = version + 1;
    let mut errors = 0;
    let mut total = 0;
    for my in 0..macros {
        for mx in 0..macros {
            let dark_frame = (mx + my) % 2 == 0;
            for i in 0..6 {
                for &(x, y) in &[
                    (mx * 6 + i, my * 6),
                    (mx * 6 + i, my * 6 + 5),
                    (mx * 6, my * 6 + i),
                    (mx * 6 + 5, my * 6 + i),
                ] {
                    total += 1;
                    errors += usize::from(grid.get(x, y) != dark_frame);
                }
            }
        }
    }
    errors * 16 <= total
}

/// Mode machine: 910 latches numeric (digit pairs), 911 upper-case
/// text, 912 binary bytes; 913 is FNC1.
fn decode_codewords(codewords: &[u32]) -> DecoderResult {
    #[derive(PartialEq, Clone, Copy)]
    enum Mode {
        Numeric,
        Upper,
        Binary,
    }
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::with_eci_offset(b'g', 0, 1);
    let mut mode = Mode::Numeric;
    let mut first = true;
    for &word in codewords {
        match word {
            910 => mode = Mode::Numeric,
            911 => mode = Mode::Upper,
            912 => mode = Mode::Binary,
            913 => {
                if first {
                    content.apply_fnc1_in_first_position();
                } else {
                    content.push(0x1D);
                }
            }
            914..=928 => {} // padding and reserved
            _ => match mode {
                Mode::Numeric => {
                    // Three digits per codeword, 0..=999 range reuse.
                    let w = word.min(999);
                    content.push(b'0' + (w / 100) as u8);
                    content.push(b'0' + (w / 10 % 10) as u8);
                    content.push(b'0' + (w % 10) as u8);
                }
                Mode::Upper => {
                    // Two base-30 characters (A-Z, space, . , -).
                    const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ .,-";
                    let (a, b) = (word / 30, word % 30);
                    if a < 30 {
                        content.push(UPPER[a as usize]);
                    }
                    content.push(UPPER[b as usize % 30]);
                }
                Mode::Binary => content.push((word & 0xFF) as u8),
            },
        }
        first = false;
    }
    DecoderResult::new(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rs::reed_solomon_encode;

    fn build_symbol(data: &[u32], version: usize) -> BitMatrix {
        let positions = data_positions(version);
        let total = positions.len() / BITS_PER_CODEWORD;
        let (data_count, ec_count) = ec_split(total);
        let mut words = data.to_vec();
        words.resize(data_count, 914);
        let full = reed_solomon_encode(gf929(), &words, ec_count);
        let dim = version_dimension(version);
        let mut grid = BitMatrix::new(dim, dim);
        // Frames first, then data cells.
        let macros = version + 1;
        for my in 0..macros {
            for mx in 0..macros {
                let dark = (mx + my) % 2 == 0;
                for i in 0..6 {
                    grid.set(mx * 6 + i, my * 6, dark);
                    grid.set(mx * 6 + i, my * 6 + 5, dark);
                    grid.set(mx * 6, my * 6 + i, dark);
                    grid.set(mx * 6 + 5, my * 6 + i, dark);
                }
            }
        }
        for (chunk, &word) in positions.chunks(BITS_PER_CODEWORD).zip(full.iter()) {
            for (bit, &(x, y)) in chunk.iter().enumerate() {
                grid.set(x, y, word >> (BITS_PER_CODEWORD - 1 - bit) & 1 != 0);
            }
        }
        grid
    }

    fn frame(grid: &BitMatrix, scale: usize) -> BitMatrix {
        let dim = grid.height();
        BitMatrix::from_fn((dim + 8) * scale, (dim + 8) * scale, |x, y| {
            let mx = (x / scale) as isize - 4;
            let my = (y / scale) as isize - 4;
            mx >= 0 && my >= 0 && (mx as usize) < dim && (my as usize) < dim
                && grid.get(mx as usize, my as usize)
        })
    }

    #[test]
    fn test_numeric_round_trip() {
        let matrix = build_symbol(&[123, 456], 1);
        let image = frame(&matrix, 2);
        let results = read(&image, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::GridMatrix);
        assert_eq!(results[0].bytes(), b"123456");
    }

    #[test]
    fn test_binary_mode() {
        let words = [912, 0x47, 0x4D];
        let matrix = build_symbol(&words, 2);
        let image = frame(&matrix, 2);
        let results = read(&image, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bytes(), b"GM");
    }
}
