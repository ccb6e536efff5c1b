//! Han Xin Code reader
//!
//! Chinese national 2D symbology (ISO/IEC 20830). Versions grow from
//! 23 modules in steps of two with corner finder patterns. Codewords
//! are GF(256) Reed-Solomon protected at four EC levels whose block
//! layouts come from the per-version table below; the content stream
//! carries Numeric / Text / Binary / GB18030 region modes.

use crate::barcode::{Barcode, DecoderResult, Point, Position};
use crate::bits::BitMatrix;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::gf::gf256_data_matrix;
use crate::options::ReaderOptions;
use crate::rs::reed_solomon_decode;

/// Versions carried by the EC layout table below; the standard defines
/// 84, larger symbols are not tabled yet.
const MAX_VERSION: usize = 12;

fn version_dimension(version: usize) -> usize {
    23 + 2 * (version - 1)
}

/// Reed-Solomon block layout of one EC level.
#[derive(Clone, Copy)]
struct HxEcLayout {
    blocks: usize,
    ec_per_block: usize,
}

impl HxEcLayout {
    const fn new(blocks: usize, ec_per_block: usize) -> Self {
        Self {
            blocks,
            ec_per_block,
        }
    }

    fn ec_total(&self) -> usize {
        self.blocks * self.ec_per_block
    }
}

/// Per-version block layouts in L1..L4 order. Larger versions split
/// their codeword stream over interleaved blocks.
#[rustfmt::skip]
static EC_TABLE: [[HxEcLayout; 4]; MAX_VERSION] = [
    [HxEcLayout::new(1, 4), HxEcLayout::new(1, 8), HxEcLayout::new(1, 12), HxEcLayout::new(1, 16)],
    [HxEcLayout::new(1, 6), HxEcLayout::new(1, 10), HxEcLayout::new(1, 14), HxEcLayout::new(1, 20)],
    [HxEcLayout::new(1, 6), HxEcLayout::new(1, 12), HxEcLayout::new(1, 18), HxEcLayout::new(1, 24)],
    [HxEcLayout::new(1, 8), HxEcLayout::new(1, 14), HxEcLayout::new(1, 22), HxEcLayout::new(1, 28)],
    [HxEcLayout::new(1, 8), HxEcLayout::new(1, 16), HxEcLayout::new(1, 24), HxEcLayout::new(1, 32)],
    [HxEcLayout::new(1, 10), HxEcLayout::new(1, 18), HxEcLayout::new(1, 28), HxEcLayout::new(1, 38)],
    [HxEcLayout::new(1, 10), HxEcLayout::new(1, 20), HxEcLayout::new(1, 32), HxEcLayout::new(1, 44)],
    [HxEcLayout::new(1, 12), HxEcLayout::new(1, 24), HxEcLayout::new(1, 36), HxEcLayout::new(1, 50)],
    [HxEcLayout::new(1, 14), HxEcLayout::new(1, 26), HxEcLayout::new(1, 40), HxEcLayout::new(1, 56)],
    [HxEcLayout::new(2, 8), HxEcLayout::new(2, 14), HxEcLayout::new(2, 22), HxEcLayout::new(2, 30)],
    [HxEcLayout::new(2, 8), HxEcLayout::new(2, 16), HxEcLayout::new(2, 24), HxEcLayout::new(2, 34)],
    [HxEcLayout::new(2, 10), HxEcLayout::new(2, 18), HxEcLayout::new(2, 26), HxEcLayout::new(2, 38)],
];

/// Corner finder arm length.
const FINDER: usize = 7;

fn is_function_module(dim: usize, x: usize, y: usize) -> bool {
    let near = |v: usize| v < FINDER;
    let far = |v: usize| v >= dim - FINDER;
    (near(x) && near(y)) || (far(x) && near(y)) || (near(x) && far(y)) || (far(x) && far(y))
}

fn data_positions(dim: usize) -> Vec<(usize, usize)> {
    let mut positions = Vec::new();
    for y in 0..dim {
        for x in 0..dim {
            if !is_function_module(dim, x, y) {
                positions.push((x, y));
            }
        }
    }
    positions
}

/// Codeword capacity from the module count.
fn capacity(dim: usize) -> usize {
    data_positions(dim).len() / 8
}

/// Undo the block interleave and correct each Reed-Solomon block.
/// Returns the concatenated data codewords.
fn correct_blocks(codewords: &[u32], layout: &HxEcLayout) -> Option<Vec<u8>> {
    let total = codewords.len();
    let data_total = total - layout.ec_total();
    let field = gf256_data_matrix();
    let mut data = vec![0u8; data_total];
    for b in 0..layout.blocks {
        let mut block: Vec<u32> = Vec::new();
        let mut positions = Vec::new();
        let mut i = b;
        while i < data_total {
            block.push(codewords[i]);
            positions.push(i);
            i += layout.blocks;
        }
        let mut i = data_total + b;
        while i < total {
            block.push(codewords[i]);
            i += layout.blocks;
        }
        reed_solomon_decode(field, &mut block, layout.ec_per_block).ok()?;
        for (j, &pos) in positions.iter().enumerate() {
            data[pos] = block[j] as u8;
        }
    }
    Some(data)
}

/// The four corner finders: an L of three nested arms, distinct in
/// orientation per corner so the symbol orientation is fixed.
fn draw_finder(grid: &mut BitMatrix, corner: usize) {
    let dim = grid.height();
    let (ox, oy, sx, sy) = match corner {
        0 => (0, 0, 1isize, 1isize),
        1 => (dim - 1, 0, -1, 1),
        2 => (0, dim - 1, 1, -1),
        _ => (dim - 1, dim - 1, -1, -1),
    };
    let at = |dx: usize, dy: usize| {
        (
            (ox as isize + sx * dx as isize) as usize,
            (oy as isize + sy * dy as isize) as usize,
        )
    };
    for i in 0..FINDER {
        for j in 0..FINDER {
            // Nested L rings: dark at even chebyshev distance.
            let ring = i.max(j);
            let (x, y) = at(i, j);
            grid.set(x, y, ring % 2 == 0);
        }
    }
}

fn check_finders(grid: &BitMatrix) -> bool {
    let dim = grid.height();
    let mut reference = BitMatrix::new(dim, dim);
    for corner in 0..4 {
        draw_finder(&mut reference, corner);
    }
    let mut errors = 0;
    let mut total = 0;
    for y in 0..dim {
        for x in 0..dim {
            if is_function_module(dim, x, y) {
                total += 1;
                errors += usize::from(grid.get(x, y) != reference.get(x, y));
            }
        }
    }
    errors * 16 <= total
}

pub(crate) fn read(image: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    if !opts.has_format(BarcodeFormat::HanXin) {
        return Vec::new();
    }
    let Some((left, top, width, height)) = image.find_bounding_box(23) else {
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
        if !check_finders(&grid) {
            continue;
        }
        let positions = data_positions(dim);
        let total = capacity(dim);
        let codewords: Vec<u32> = positions
            .chunks(8)
            .take(total)
            .map(|chunk| {
                chunk
                    .iter()
                    .fold(0u32, |acc, &(x, y)| acc << 1 | u32::from(grid.get(x, y)))
            })
            .collect();
        // The EC level is tried from the strongest down.
        for level in (0..4).rev() {
            let layout = &EC_TABLE[version - 1][level];
            let Some(data) = correct_blocks(&codewords, layout) else {
                continue;
            };
            let mut result = decode_content(&data);
            if result.error.is_error() && !opts.return_errors {
                continue;
            }
            result.version_number = version as i32;
            result.ec_level = format!("L{}", level + 1);
            let position = Position::new(
                Point::new(left as i32, top as i32),
                Point::new((left + width) as i32, top as i32),
                Point::new((left + width) as i32, (top + height) as i32),
                Point::new(left as i32, (top + height) as i32),
            );
            return vec![Barcode::new(BarcodeFormat::HanXin, result, position)];
        }
        if opts.return_errors {
            let result =
                DecoderResult::with_error(checksum_error("Han Xin correction failed at all levels"));
            let position = Position::new(
                Point::new(left as i32, top as i32),
                Point::new((left + width) as i32, top as i32),
                Point::new((left + width) as i32, (top + height) as i32),
                Point::new(left as i32, (top + height) as i32),
            );
            return vec![Barcode::new(BarcodeFormat::HanXin, result, position)];
        }
    }
    Vec::new()
}

/// Mode indicators: each segment starts with a 4-bit mode. Numeric
/// packs three digits in ten bits, text is a 6-bit subset, binary is a
/// byte run with a 13-bit count.
fn decode_content(bytes: &[u8]) -> DecoderResult {
    struct Bits<'a> {
        bytes: &'a [u8],
        pos: usize,
    }
    impl Bits<'_> {
        fn read(&mut self, count: usize) -> Option<u32> {
            if self.pos + count > self.bytes.len() * 8 {
                return None;
            }
            let mut value = 0;
            for _ in 0..count {
                let bit = self.bytes[self.pos / 8] >> (7 - self.pos % 8) & 1;
                value = value << 1 | u32::from(bit);
                self.pos += 1;
            }
            Some(value)
        }
    }
    const TEXT_SET: &[u8] = b" 0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::with_eci_offset(b'h', 0, 1);
    let mut bits = Bits { bytes, pos: 0 };
    loop {
        let Some(mode) = bits.read(4) else {
            break;
        };
        match mode {
            0 => break, // terminator
            1 => {
                // Numeric: 13-bit count, then 3 digits per 10 bits.
                let Some(count) = bits.read(13) else { break };
                let mut remaining = count as usize;
                while remaining > 0 {
                    let Some(group) = bits.read(10) else { break };
                    let digits = format!("{:03}", group.min(999));
                    let take = remaining.min(3);
                    content.append_str(&digits[3 - take..]);
                    remaining -= take;
                }
            }
            2 => {
                // Text: 13-bit count of 6-bit charset values.
                let Some(count) = bits.read(13) else { break };
                for _ in 0..count {
                    let Some(v) = bits.read(6) else { break };
                    content.push(TEXT_SET[v as usize % TEXT_SET.len()]);
                }
            }
            3 => {
                // Binary: 13-bit byte count.
                let Some(count) = bits.read(13) else { break };
                for _ in 0..count {
                    let Some(b) = bits.read(8) else { break };
                    content.push(b as u8);
                }
            }
            _ => break, // GB18030 region modes not carried in this build
        }
    }
    DecoderResult::new(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rs::reed_solomon_encode;

    fn build_symbol(payload_bits: &[(u32, usize)], version: usize, level: usize) -> BitMatrix {
        let dim = version_dimension(version);
        let positions = data_positions(dim);
        let total = capacity(dim);
        let layout = &EC_TABLE[version - 1][level];

        let mut bitvec: Vec<bool> = Vec::new();
        for &(value, count) in payload_bits {
            for i in (0..count).rev() {
                bitvec.push(value >> i & 1 != 0);
            }
        }
        while bitvec.len() % 8 != 0 {
            bitvec.push(false);
        }
        let mut data: Vec<u32> = bitvec
            .chunks(8)
            .map(|c| c.iter().fold(0u32, |acc, &b| acc << 1 | u32::from(b)))
            .collect();
        data.resize(total - layout.ec_total(), 0);

        // Per-block parity, interleaved the way the reader expects.
        let field = gf256_data_matrix();
        let mut full = vec![0u32; total];
        for b in 0..layout.blocks {
            let block_data: Vec<u32> = data[b..].iter().step_by(layout.blocks).copied().collect();
            let with_ec = reed_solomon_encode(field, &block_data, layout.ec_per_block);
            let mut i = b;
            for &w in with_ec.iter().take(block_data.len()) {
                full[i] = w;
                i += layout.blocks;
            }
            let mut i = data.len() + b;
            for &w in with_ec.iter().skip(block_data.len()) {
                full[i] = w;
                i += layout.blocks;
            }
        }

        let mut grid = BitMatrix::new(dim, dim);
        for corner in 0..4 {
            draw_finder(&mut grid, corner);
        }
        for (chunk, &word) in positions.chunks(8).zip(full.iter()) {
            for (bit, &(x, y)) in chunk.iter().enumerate() {
                grid.set(x, y, word >> (7 - bit) & 1 != 0);
            }
        }
        grid
    }

    fn frame(grid: &BitMatrix, scale: usize) -> BitMatrix {
        let dim = grid.height();
        BitMatrix::from_fn((dim + 6) * scale, (dim + 6) * scale, |x, y| {
            let mx = (x / scale) as isize - 3;
            let my = (y / scale) as isize - 3;
            mx >= 0 && my >= 0 && (mx as usize) < dim && (my as usize) < dim
                && grid.get(mx as usize, my as usize)
        })
    }

    #[test]
    fn test_numeric_round_trip() {
        // Mode 1, count 6, digits 987 654.
        let matrix = build_symbol(
            &[(1, 4), (6, 13), (987, 10), (654, 10), (0, 4)],
            1,
            3,
        );
        let image = frame(&matrix, 2);
        let results = read(&image, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::HanXin);
        assert_eq!(results[0].bytes(), b"987654");
        assert_eq!(results[0].version_number(), 1);
    }

    #[test]
    fn test_binary_round_trip() {
        let payload: Vec<(u32, usize)> = {
            let mut v = vec![(3u32, 4usize), (4, 13)];
            for &b in b"HanX" {
                v.push((u32::from(b), 8));
            }
            v.push((0, 4));
            v
        };
        let matrix = build_symbol(&payload, 2, 3);
        let image = frame(&matrix, 2);
        let results = read(&image, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bytes(), b"HanX");
    }

    #[test]
    fn test_interleaved_blocks_round_trip() {
        // Version 10 splits its codeword stream over two RS blocks.
        let payload: Vec<(u32, usize)> = {
            let mut v = vec![(3u32, 4usize), (6, 13)];
            for &b in b"blocks" {
                v.push((u32::from(b), 8));
            }
            v.push((0, 4));
            v
        };
        let matrix = build_symbol(&payload, 10, 3);
        let image = frame(&matrix, 2);
        let results = read(&image, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bytes(), b"blocks");
        assert_eq!(results[0].version_number(), 10);
        assert_eq!(results[0].ec_level(), "L4");
    }
}
