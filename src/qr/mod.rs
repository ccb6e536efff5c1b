//! QR Code family reader: QR, Micro QR and UPNQR
//!
//! Detection anchors on the three concentric 1:1:3:1:1 finder patterns;
//! the sampler projects the module grid through a perspective transform
//! fitted to the finder centers. Micro QR symbols carry a single finder
//! and are handled through the pure-symbol path. UPNQR is not a layout
//! of its own: a version 15, level M symbol whose first ECI selects
//! ISO-8859-2 is reported under the UPNQR tag when that format is
//! requested.

mod decode;
mod version;

pub(crate) use version::{EcLevel, MicroVersion, Version};

use crate::barcode::{Barcode, DecoderResult, Point, Position};
use crate::bits::BitMatrix;
use crate::content::Eci;
use crate::error::format_error;
use crate::finder::{find_concentric_patterns, FinderPattern};
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::transform::{sample_grid, PerspectiveTransform};
use crate::verbosity::zx_debug;

const FINDER_RATIOS: [u16; 5] = [1, 1, 3, 1, 1];

/// Decode every QR-family symbol in the image.
pub(crate) fn read(image: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    let mut results = Vec::new();
    if opts.is_pure {
        if let Some(barcode) = read_pure(image, opts) {
            results.push(barcode);
        }
        return results;
    }

    let centers = find_concentric_patterns(image, &FINDER_RATIOS, opts.try_harder);
    zx_debug!(1, "qr: {} finder candidates", centers.len());
    if centers.len() < 3 {
        // A lone finder may still be a Micro QR.
        if centers.len() == 1 && opts.has_format(BarcodeFormat::MicroQRCode) {
            if let Some(barcode) = read_pure(image, opts) {
                results.push(barcode);
            }
        }
        return results;
    }

    let mut used = vec![false; centers.len()];
    for triple in select_triples(&centers) {
        let [a, b, c] = triple.indices;
        if used[a] || used[b] || used[c] {
            continue;
        }
        if let Some(barcode) = decode_from_triple(image, &centers, &triple, opts) {
            used[a] = true;
            used[b] = true;
            used[c] = true;
            results.push(barcode);
            if results.len() >= opts.max_number_of_symbols as usize {
                break;
            }
        }
    }
    results
}

struct FinderTriple {
    indices: [usize; 3],
    top_left: FinderPattern,
    top_right: FinderPattern,
    bottom_left: FinderPattern,
}

/// All plausible triples ordered by module-size agreement: the three
/// centers must share a module size and form a right angle at one of
/// them.
fn select_triples(centers: &[FinderPattern]) -> Vec<FinderTriple> {
    let mut triples = Vec::new();
    let n = centers.len();
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                let (a, b, c) = (centers[i], centers[j], centers[k]);
                let sizes = [a.module_size, b.module_size, c.module_size];
                let min = sizes.iter().cloned().fold(f32::INFINITY, f32::min);
                let max = sizes.iter().cloned().fold(0.0f32, f32::max);
                if max > min * 1.5 {
                    continue;
                }
                if let Some(triple) = order_triple([i, j, k], [a, b, c]) {
                    triples.push(triple);
                }
            }
        }
    }
    triples
}

/// Identify the corner finder (top-left) as the one whose two edges are
/// the shortest and roughly perpendicular.
fn order_triple(indices: [usize; 3], patterns: [FinderPattern; 3]) -> Option<FinderTriple> {
    for corner in 0..3 {
        let p = patterns[corner];
        let q = patterns[(corner + 1) % 3];
        let r = patterns[(corner + 2) % 3];
        let (ux, uy) = (q.x - p.x, q.y - p.y);
        let (vx, vy) = (r.x - p.x, r.y - p.y);
        let du = (ux * ux + uy * uy).sqrt();
        let dv = (vx * vx + vy * vy).sqrt();
        if du == 0.0 || dv == 0.0 {
            continue;
        }
        let cos_angle = (ux * vx + uy * vy) / (du * dv);
        // The two edges from the corner are equal-length and orthogonal.
        if cos_angle.abs() > 0.25 || (du - dv).abs() > 0.25 * du.max(dv) {
            continue;
        }
        // Cross product sign puts top-right before bottom-left.
        let cross = ux * vy - uy * vx;
        let (tr, bl) = if cross > 0.0 { (q, r) } else { (r, q) };
        let (tri, bli) = if cross > 0.0 {
            ((corner + 1) % 3, (corner + 2) % 3)
        } else {
            ((corner + 2) % 3, (corner + 1) % 3)
        };
        return Some(FinderTriple {
            indices: [indices[corner], indices[tri], indices[bli]],
            top_left: p,
            top_right: tr,
            bottom_left: bl,
        });
    }
    None
}

fn decode_from_triple(
    image: &BitMatrix,
    _centers: &[FinderPattern],
    triple: &FinderTriple,
    opts: &ReaderOptions,
) -> Option<Barcode> {
    let tl = &triple.top_left;
    let tr = &triple.top_right;
    let bl = &triple.bottom_left;
    let module = (tl.module_size + tr.module_size + bl.module_size) / 3.0;
    let top = ((tr.x - tl.x).powi(2) + (tr.y - tl.y).powi(2)).sqrt();
    let mut dimension = (top / module).round() as usize + 7;
    // Snap to the nearest legal dimension.
    match dimension % 4 {
        0 => dimension += 1,
        2 => dimension -= 1,
        3 => dimension -= 2,
        _ => {}
    }
    Version::from_dimension(dimension)?;

    // Bottom-right estimated by parallelogram completion; larger
    // versions refine against the alignment pattern if it is there.
    let br = (tr.x + bl.x - tl.x, tr.y + bl.y - tl.y);

    let d = dimension as f32;
    let transform = PerspectiveTransform::quadrilateral_to_quadrilateral(
        [
            (3.5, 3.5),
            (d - 3.5, 3.5),
            (d - 3.5, d - 3.5),
            (3.5, d - 3.5),
        ],
        [(tl.x, tl.y), (tr.x, tr.y), (br.0, br.1), (bl.x, bl.y)],
    );
    let grid = sample_grid(image, &transform, dimension, dimension)?;

    let position = {
        let corner = |mx: f32, my: f32| {
            let (x, y) = transform.transform(mx, my);
            Point::new(x.round() as i32, y.round() as i32)
        };
        Position::new(
            corner(0.0, 0.0),
            corner(d, 0.0),
            corner(d, d),
            corner(0.0, d),
        )
    };

    finish_grid(grid, position, opts)
}

/// Pure-symbol path: the image is one axis-aligned symbol with only
/// quiet zone around it.
fn read_pure(image: &BitMatrix, opts: &ReaderOptions) -> Option<Barcode> {
    let (left, top, width, height) = image.find_bounding_box(11)?;
    if width != height {
        return None;
    }
    // Top-left finder: 7 modules of dark-edge run give the pitch.
    let mut run = 0;
    while run < width && image.get(left + run, top) {
        run += 1;
    }
    let module = run as f32 / 7.0;
    if module < 1.0 {
        return None;
    }
    let dimension = (width as f32 / module).round() as usize;
    let grid = BitMatrix::from_fn(dimension, dimension, |x, y| {
        let px = left + ((x as f32 + 0.5) * module) as usize;
        let py = top + ((y as f32 + 0.5) * module) as usize;
        image.get(px.min(image.width() - 1), py.min(image.height() - 1))
    });
    let position = Position::new(
        Point::new(left as i32, top as i32),
        Point::new((left + width) as i32, top as i32),
        Point::new((left + width) as i32, (top + height) as i32),
        Point::new(left as i32, (top + height) as i32),
    );
    finish_grid(grid, position, opts)
}

/// Decode a sampled grid, trying the mirror image when the first pass
/// cannot read valid format information.
fn finish_grid(grid: BitMatrix, position: Position, opts: &ReaderOptions) -> Option<Barcode> {
    if let Some(barcode) = decode_grid(&grid, position, false, opts) {
        return Some(barcode);
    }
    let mut mirrored = grid;
    mirrored.transpose();
    decode_grid(&mirrored, position, true, opts)
}

fn decode_grid(
    grid: &BitMatrix,
    position: Position,
    mirrored: bool,
    opts: &ReaderOptions,
) -> Option<Barcode> {
    let dimension = grid.height();
    if (11..=17).contains(&dimension) && dimension % 2 == 1 {
        return decode_micro_grid(grid, position, mirrored, opts);
    }
    let version = Version::from_dimension(dimension)?;
    let version = if version.number >= 7 {
        // The version information blocks override the plain dimension
        // estimate when they disagree by a step.
        decode::read_version_info(grid).unwrap_or(version)
    } else {
        version
    };
    if version.dimension() != dimension {
        return None;
    }
    let (level, mask) = decode::read_format_info(grid)?;
    let codewords = decode::extract_codewords(grid, &version, mask);
    let mut result = match decode::correct_blocks(&codewords, &version, level) {
        Ok(data) => decode::decode_content(&data, &version, level),
        Err(status) => DecoderResult::with_error(status),
    };
    result.is_mirrored = mirrored;
    if result.error.is_error() && !opts.return_errors {
        return None;
    }

    // UPNQR is a tagged interpretation, not a layout: version 15, level
    // M, first ECI ISO-8859-2.
    let upnqr = version.number == 15
        && level == EcLevel::M
        && result.content.first_eci() == Some(Eci::ISO8859_2);
    let format = if upnqr && opts.has_format(BarcodeFormat::UPNQR) {
        BarcodeFormat::UPNQR
    } else if opts.has_format(BarcodeFormat::QRCode) {
        BarcodeFormat::QRCode
    } else {
        return None;
    };
    Some(Barcode::new(format, result, position))
}

fn decode_micro_grid(
    grid: &BitMatrix,
    position: Position,
    mirrored: bool,
    opts: &ReaderOptions,
) -> Option<Barcode> {
    if !opts.has_format(BarcodeFormat::MicroQRCode) {
        return None;
    }
    let version = MicroVersion::from_dimension(grid.height())?;
    let mut bits = 0u32;
    for y in 1..=8 {
        bits = bits << 1 | u32::from(grid.get(8, y));
    }
    for x in (1..=7).rev() {
        bits = bits << 1 | u32::from(grid.get(x, 8));
    }
    let (symbol_number, mask) = decode::decode_micro_format_bits(bits)?;
    // Symbol numbers map onto (version, level-index) pairs.
    let (format_version, level_index, level_name) = match symbol_number {
        0 => (1, 0, "L"),
        1 => (2, 0, "L"),
        2 => (2, 1, "M"),
        3 => (3, 0, "L"),
        4 => (3, 1, "M"),
        5 => (4, 0, "L"),
        6 => (4, 1, "M"),
        _ => (4, 2, "Q"),
    };
    if format_version != version.number {
        return None;
    }
    let data_count = version.data_codewords(level_index)?;
    let ec_count = usize::from(version.ec_codewords(level_index));
    let codewords = decode::extract_micro_codewords(grid, &version, mask);
    if codewords.len() < data_count + ec_count {
        return None;
    }
    let field = crate::gf::gf256_qr();
    let mut block: Vec<u32> = codewords[..data_count + ec_count]
        .iter()
        .map(|&b| u32::from(b))
        .collect();
    let mut result = match crate::rs::reed_solomon_decode(field, &mut block, ec_count) {
        Ok(_) => {
            let data: Vec<u8> = block[..data_count].iter().map(|&w| w as u8).collect();
            decode::decode_micro_content(&data, &version, level_name)
        }
        Err(_) => DecoderResult::with_error(format_error("Micro QR error correction failed")),
    };
    result.is_mirrored = mirrored;
    if result.error.is_error() && !opts.return_errors {
        return None;
    }
    Some(Barcode::new(BarcodeFormat::MicroQRCode, result, position))
}

// ============================================================================
// Synthetic symbol construction for the test suite
// ============================================================================

#[cfg(test)]
pub(crate) mod encode {
    use super::decode::function_pattern_mask;
    use super::version::{EcLevel, Version};
    use crate::bits::{BitArray, BitMatrix};
    use crate::gf::gf256_qr;
    use crate::rs::reed_solomon_encode;

    fn encode_format_bits(data: u32) -> u32 {
        let mut rem = data << 10;
        for i in (10..15).rev() {
            if rem >> i & 1 != 0 {
                rem ^= 0x537 << (i - 10);
            }
        }
        ((data << 10) | rem) ^ 0x5412
    }

    fn encode_version_bits(version: u32) -> u32 {
        let mut rem = version << 12;
        for i in (12..18).rev() {
            if rem >> i & 1 != 0 {
                rem ^= 0x1F25 << (i - 12);
            }
        }
        (version << 12) | rem
    }

    fn mask_bit(mask: u32, x: usize, y: usize) -> bool {
        match mask {
            0 => (x + y) % 2 == 0,
            1 => y % 2 == 0,
            2 => x % 3 == 0,
            3 => (x + y) % 3 == 0,
            4 => (y / 2 + x / 3) % 2 == 0,
            5 => (x * y) % 2 + (x * y) % 3 == 0,
            6 => ((x * y) % 2 + (x * y) % 3) % 2 == 0,
            _ => ((x + y) % 2 + (x * y) % 3) % 2 == 0,
        }
    }

    /// A segment of pre-encoded header+payload bits.
    pub(crate) struct Segments {
        pub bits: BitArray,
    }

    impl Segments {
        pub(crate) fn new() -> Self {
            Self {
                bits: BitArray::default(),
            }
        }

        pub(crate) fn eci(mut self, value: u32) -> Self {
            self.bits.append_bits(0b0111, 4);
            assert!(value < 128);
            self.bits.append_bits(value, 8);
            self
        }

        pub(crate) fn structured_append(mut self, index: u32, total: u32, parity: u32) -> Self {
            self.bits.append_bits(0b0011, 4);
            self.bits.append_bits(index, 4);
            self.bits.append_bits(total - 1, 4);
            self.bits.append_bits(parity, 8);
            self
        }

        pub(crate) fn bytes(mut self, data: &[u8], version: usize) -> Self {
            self.bits.append_bits(0b0100, 4);
            let count_bits = if version <= 9 { 8 } else { 16 };
            self.bits.append_bits(data.len() as u32, count_bits);
            for &b in data {
                self.bits.append_bits(u32::from(b), 8);
            }
            self
        }
    }

    /// Build a complete standard QR symbol matrix.
    pub(crate) fn build_qr(
        segments: Segments,
        version_number: usize,
        level: EcLevel,
        mask: u32,
    ) -> BitMatrix {
        let version = Version::from_number(version_number).unwrap();
        let layout = version.ec_blocks(level);
        let data_capacity = layout.total_data_codewords();

        let mut bits = segments.bits;
        // Terminator and byte alignment.
        let remaining = data_capacity * 8 - bits.len();
        bits.append_bits(0, remaining.min(4));
        while bits.len() % 8 != 0 {
            bits.append_bits(0, 1);
        }
        let mut data_codewords = Vec::with_capacity(data_capacity);
        let mut i = 0;
        while i < bits.len() {
            data_codewords.push(bits.read_bits(i, 8));
            i += 8;
        }
        let mut pad = [0xECu32, 0x11].iter().cycle();
        while data_codewords.len() < data_capacity {
            data_codewords.push(*pad.next().unwrap());
        }

        // Per-block RS parity, then interleave.
        let field = gf256_qr();
        let ec_per_block = usize::from(layout.ec_codewords_per_block);
        let mut blocks: Vec<Vec<u32>> = Vec::new();
        let mut offset = 0;
        for run in &layout.runs {
            for _ in 0..run.count {
                let size = usize::from(run.data_codewords);
                let with_ec = reed_solomon_encode(
                    field,
                    &data_codewords[offset..offset + size],
                    ec_per_block,
                );
                blocks.push(with_ec);
                offset += size;
            }
        }
        let max_data = blocks
            .iter()
            .map(|b| b.len() - ec_per_block)
            .max()
            .unwrap_or(0);
        let mut interleaved = Vec::new();
        for round in 0..max_data {
            for block in &blocks {
                let data_len = block.len() - ec_per_block;
                if round < data_len {
                    interleaved.push(block[round] as u8);
                }
            }
        }
        for round in 0..ec_per_block {
            for block in &blocks {
                let data_len = block.len() - ec_per_block;
                interleaved.push(block[data_len + round] as u8);
            }
        }

        // Assemble the matrix.
        let dim = version.dimension();
        let mut matrix = BitMatrix::new(dim, dim);
        draw_function_patterns(&mut matrix, &version);
        draw_format_info(&mut matrix, level, mask);
        if version.number >= 7 {
            draw_version_info(&mut matrix, version.number as u32);
        }
        place_data(&mut matrix, &version, &interleaved, mask);
        matrix
    }

    fn draw_finder(matrix: &mut BitMatrix, left: usize, top: usize) {
        for y in 0..7 {
            for x in 0..7 {
                let dark = !(1..6).contains(&x)
                    || !(1..6).contains(&y)
                    || ((2..5).contains(&x) && (2..5).contains(&y));
                matrix.set(left + x, top + y, dark);
            }
        }
    }

    fn draw_function_patterns(matrix: &mut BitMatrix, version: &Version) {
        let dim = version.dimension();
        draw_finder(matrix, 0, 0);
        draw_finder(matrix, dim - 7, 0);
        draw_finder(matrix, 0, dim - 7);
        // Timing.
        for i in 8..dim - 8 {
            matrix.set(i, 6, i % 2 == 0);
            matrix.set(6, i, i % 2 == 0);
        }
        // Alignment patterns.
        let centers = version.alignment_centers();
        for &cy in centers {
            for &cx in centers {
                let corner = (cx <= 8 && cy <= 8)
                    || (cx >= dim - 9 && cy <= 8)
                    || (cx <= 8 && cy >= dim - 9);
                if corner {
                    continue;
                }
                for dy in 0..5usize {
                    for dx in 0..5usize {
                        let dark = dx == 0 || dx == 4 || dy == 0 || dy == 4 || (dx == 2 && dy == 2);
                        matrix.set(cx - 2 + dx, cy - 2 + dy, dark);
                    }
                }
            }
        }
        // Dark module.
        matrix.set(8, dim - 8, true);
    }

    fn draw_format_info(matrix: &mut BitMatrix, level: EcLevel, mask: u32) {
        let level_bits = match level {
            EcLevel::L => 0b01,
            EcLevel::M => 0b00,
            EcLevel::Q => 0b11,
            EcLevel::H => 0b10,
        };
        let word = encode_format_bits(level_bits << 3 | mask);
        let dim = matrix.height();
        // Copy 1 around the top-left finder, bit 14 first.
        let mut bit: i32 = 14;
        for x in 0..6 {
            matrix.set(x, 8, word >> bit & 1 != 0);
            bit -= 1;
        }
        matrix.set(7, 8, word >> bit & 1 != 0);
        bit -= 1;
        matrix.set(8, 8, word >> bit & 1 != 0);
        bit -= 1;
        matrix.set(8, 7, word >> bit & 1 != 0);
        if bit > 0 {
            bit -= 1;
        }
        for y in (0..6).rev() {
            matrix.set(8, y, word >> bit & 1 != 0);
            bit = bit.saturating_sub(1);
        }
        // Copy 2 split across the other finders.
        let mut bit = 14;
        for y in (dim - 7..dim).rev() {
            matrix.set(8, y, word >> bit & 1 != 0);
            bit -= 1;
        }
        for x in dim - 8..dim {
            matrix.set(x, 8, word >> bit & 1 != 0);
            if bit > 0 {
                bit -= 1;
            }
        }
    }

    fn draw_version_info(matrix: &mut BitMatrix, version: u32) {
        let word = encode_version_bits(version);
        let dim = matrix.height();
        let mut bit = 17;
        for y in (0..6).rev() {
            for x in (dim - 11..dim - 8).rev() {
                matrix.set(x, y, word >> bit & 1 != 0);
                matrix.set(y, x, word >> bit & 1 != 0);
                if bit > 0 {
                    bit -= 1;
                }
            }
        }
    }

    fn place_data(matrix: &mut BitMatrix, version: &Version, codewords: &[u8], mask: u32) {
        let dim = version.dimension();
        let function = function_pattern_mask(version);
        let mut bit_index = 0usize;
        let total_bits = codewords.len() * 8;
        let mut upward = true;
        let mut col = dim as isize - 1;
        while col > 0 {
            if col == 6 {
                col -= 1;
            }
            for i in 0..dim {
                let y = if upward { dim - 1 - i } else { i };
                for dx in 0..2usize {
                    let x = (col as usize) - dx;
                    if function.get(x, y) {
                        continue;
                    }
                    let bit = if bit_index < total_bits {
                        codewords[bit_index / 8] >> (7 - bit_index % 8) & 1 != 0
                    } else {
                        false
                    };
                    matrix.set(x, y, bit ^ mask_bit(mask, x, y));
                    bit_index += 1;
                }
            }
            upward = !upward;
            col -= 2;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::encode::{build_qr, Segments};
    use super::*;

    fn pure_opts() -> ReaderOptions {
        ReaderOptions::new().is_pure(true)
    }

    /// Surround a module matrix with a quiet zone and scale it up.
    pub(crate) fn frame(matrix: &BitMatrix, quiet: usize, scale: usize) -> BitMatrix {
        let dim = matrix.height();
        let size = (dim + 2 * quiet) * scale;
        BitMatrix::from_fn(size, size, |x, y| {
            let mx = (x / scale) as isize - quiet as isize;
            let my = (y / scale) as isize - quiet as isize;
            mx >= 0
                && my >= 0
                && (mx as usize) < dim
                && (my as usize) < dim
                && matrix.get(mx as usize, my as usize)
        })
    }

    #[test]
    fn test_pure_byte_mode_round_trip() {
        let matrix = build_qr(
            Segments::new().bytes(b"hello zedxing", 1),
            1,
            EcLevel::M,
            0,
        );
        let image = frame(&matrix, 4, 3);
        let results = read(&image, &pure_opts());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::QRCode);
        assert_eq!(results[0].bytes(), b"hello zedxing");
        assert_eq!(results[0].ec_level(), "M");
        assert_eq!(results[0].version_number(), 1);
        assert_eq!(results[0].symbology_identifier(), "]Q1");
    }

    #[test]
    fn test_detector_path_round_trip() {
        for mask in 0..8 {
            let matrix = build_qr(
                Segments::new().bytes(b"detector path", 2),
                2,
                EcLevel::L,
                mask,
            );
            let image = frame(&matrix, 6, 4);
            let results = read(&image, &ReaderOptions::new());
            assert_eq!(results.len(), 1, "mask {mask}");
            assert_eq!(results[0].bytes(), b"detector path");
        }
    }

    #[test]
    fn test_larger_version_with_version_info() {
        let matrix = build_qr(
            Segments::new().bytes(&[b'x'; 40], 7),
            7,
            EcLevel::Q,
            3,
        );
        let image = frame(&matrix, 4, 2);
        let results = read(&image, &pure_opts());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].version_number(), 7);
        assert_eq!(results[0].ec_level(), "Q");
    }

    #[test]
    fn test_upnqr_tagging() {
        let matrix = build_qr(
            Segments::new().eci(4).bytes(b"UPN", 15),
            15,
            EcLevel::M,
            1,
        );
        let image = frame(&matrix, 4, 2);

        let upn = ReaderOptions::new()
            .formats([BarcodeFormat::UPNQR])
            .is_pure(true);
        let results = read(&image, &upn);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::UPNQR);
        assert_eq!(results[0].bytes(), b"UPN");

        let qr = ReaderOptions::new()
            .formats([BarcodeFormat::QRCode])
            .is_pure(true);
        let results = read(&image, &qr);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::QRCode);
        assert_eq!(results[0].bytes(), b"UPN");
    }

    #[test]
    fn test_structured_append_pair() {
        for index in 0..2u32 {
            let matrix = build_qr(
                Segments::new()
                    .structured_append(index, 2, 0x55)
                    .bytes(if index == 0 { b"first " } else { b"second" }, 1),
                1,
                EcLevel::L,
                4,
            );
            let image = frame(&matrix, 4, 3);
            let results = read(&image, &pure_opts());
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].sequence_index(), index as i32);
            assert_eq!(results[0].sequence_size(), 2);
            assert_eq!(results[0].sequence_id(), "85");
        }
    }

    #[test]
    fn test_mirrored_symbol() {
        let matrix = build_qr(Segments::new().bytes(b"mirror", 1), 1, EcLevel::M, 2);
        let mut transposed = matrix.clone();
        transposed.transpose();
        let image = frame(&transposed, 4, 3);
        let results = read(&image, &pure_opts());
        assert_eq!(results.len(), 1);
        assert!(results[0].is_mirrored());
        assert_eq!(results[0].bytes(), b"mirror");
    }

    #[test]
    fn test_damaged_symbol_corrected() {
        let mut matrix = build_qr(Segments::new().bytes(b"damage test", 1), 1, EcLevel::H, 5);
        // Flip a handful of data modules; level H absorbs them.
        for (x, y) in [(12, 12), (13, 12), (12, 13)] {
            matrix.set(x, y, !matrix.get(x, y));
        }
        let image = frame(&matrix, 4, 3);
        let results = read(&image, &pure_opts());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bytes(), b"damage test");
    }
}
