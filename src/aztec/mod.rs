//! Aztec Code and Aztec Rune reader
//!
//! The bullseye finder sits at the symbol center; the mode message in
//! the ring around it carries the layer and codeword counts. Data bits
//! wind in a spiral of two-module layers around the core, bit-stuffed
//! into codewords whose size grows with the layer count. Full-range
//! symbols interleave a reference grid every sixteen modules. A Rune is
//! a compact symbol with zero layers whose mode message encodes one
//! byte.

use crate::barcode::{Barcode, DecoderResult, Point, Position};
use crate::bits::BitMatrix;
use crate::content::{Content, Eci, SymbologyIdentifier};
use crate::error::{checksum_error, format_error};
use crate::finder::find_concentric_patterns;
use crate::format::BarcodeFormat;
use crate::gf::{gf1024, gf16, gf256_data_matrix, gf4096, gf64, GaloisField};
use crate::options::ReaderOptions;
use crate::rs::reed_solomon_decode;

const COMPACT_BULLSEYE: [u16; 9] = [1, 1, 1, 1, 1, 1, 1, 1, 1];

fn codeword_size(layers: usize) -> usize {
    match layers {
        1..=2 => 6,
        3..=8 => 8,
        9..=22 => 10,
        _ => 12,
    }
}

fn data_field(layers: usize) -> &'static GaloisField {
    match layers {
        1..=2 => gf64(),
        3..=8 => gf256_data_matrix(),
        9..=22 => gf1024(),
        _ => gf4096(),
    }
}

fn total_bits(layers: usize, compact: bool) -> usize {
    if compact {
        (88 + 16 * layers) * layers
    } else {
        (112 + 16 * layers) * layers
    }
}

/// Base matrix size before the reference grid is inserted.
fn base_size(layers: usize, compact: bool) -> usize {
    if compact {
        11 + 4 * layers
    } else {
        14 + 4 * layers
    }
}

/// Actual symbol dimension including the reference grid.
pub(crate) fn symbol_dimension(layers: usize, compact: bool) -> usize {
    let base = base_size(layers, compact);
    if compact {
        base
    } else {
        base + 1 + 2 * ((base / 2 - 1) / 15)
    }
}

/// Map base-matrix coordinates onto symbol coordinates, stepping over
/// the reference grid lines of full-range symbols.
fn alignment_map(layers: usize, compact: bool) -> Vec<usize> {
    let base = base_size(layers, compact);
    let mut map = vec![0usize; base];
    if compact {
        for (i, slot) in map.iter_mut().enumerate() {
            *slot = i;
        }
    } else {
        let matrix_size = symbol_dimension(layers, compact);
        let orig_center = base / 2;
        let center = matrix_size / 2;
        for i in 0..orig_center {
            let offset = i + i / 15;
            map[orig_center - i - 1] = center - offset - 1;
            map[orig_center + i] = center + offset + 1;
        }
    }
    map
}

// ============================================================================
// Mode message
// ============================================================================

/// Positions of the mode message bits, clockwise from the top-left.
fn mode_message_positions(center: usize, compact: bool) -> Vec<(usize, usize)> {
    let mut positions = Vec::new();
    let (radius, offsets): (isize, Vec<isize>) = if compact {
        (5, (-3..=3).collect())
    } else {
        (7, (-5..=5).filter(|&i| i != 0).collect())
    };
    let c = center as isize;
    for &i in &offsets {
        positions.push(((c + i) as usize, (c - radius) as usize));
    }
    for &i in &offsets {
        positions.push(((c + radius) as usize, (c + i) as usize));
    }
    for &i in &offsets {
        positions.push(((c - i) as usize, (c + radius) as usize));
    }
    for &i in &offsets {
        positions.push(((c - radius) as usize, (c - i) as usize));
    }
    positions
}

/// Correct the mode words and unpack (layers, data codeword count).
/// Layers == 0 flags a Rune, whose byte is returned in the count.
fn decode_mode_message(matrix: &BitMatrix, compact: bool) -> Option<(usize, usize)> {
    let center = matrix.height() / 2;
    let positions = mode_message_positions(center, compact);
    let word_count = positions.len() / 4;
    let mut words: Vec<u32> = Vec::with_capacity(word_count);
    for chunk in positions.chunks(4) {
        let mut word = 0u32;
        for &(x, y) in chunk {
            word = word << 1 | u32::from(matrix.get(x, y));
        }
        words.push(word);
    }
    let ec = if compact { 5 } else { 6 };
    reed_solomon_decode(gf16(), &mut words, ec).ok()?;
    let data_words = words.len() - ec;
    let mut bits = 0u32;
    for &w in &words[..data_words] {
        bits = bits << 4 | w;
    }
    if compact {
        let layers = (bits >> 6 & 0b11) as usize + 1;
        let count = (bits & 0x3F) as usize + 1;
        Some((layers, count))
    } else {
        let layers = (bits >> 11 & 0b11111) as usize + 1;
        let count = (bits & 0x7FF) as usize + 1;
        Some((layers, count))
    }
}

/// A Rune's mode message carries the value directly, marked by an
/// inverted bit sense on the check words.
fn decode_rune_message(matrix: &BitMatrix) -> Option<u32> {
    let center = matrix.height() / 2;
    let positions = mode_message_positions(center, true);
    let mut words: Vec<u32> = Vec::new();
    for chunk in positions.chunks(4) {
        let mut word = 0u32;
        for &(x, y) in chunk {
            word = word << 1 | u32::from(matrix.get(x, y));
        }
        // Rune mode words are complemented.
        words.push(word ^ 0xF);
    }
    reed_solomon_decode(gf16(), &mut words, 5).ok()?;
    Some(words[0] << 4 | words[1])
}

// ============================================================================
// Bit extraction
// ============================================================================

/// Read the raw data bits of all layers, outermost first.
fn extract_bits(matrix: &BitMatrix, layers: usize, compact: bool) -> Vec<bool> {
    let base = base_size(layers, compact);
    let map = alignment_map(layers, compact);
    let mut raw = vec![false; total_bits(layers, compact)];
    let mut row_offset = 0;
    for i in 0..layers {
        let row_size = (layers - i) * 4 + if compact { 9 } else { 12 };
        let low = i * 2;
        let high = base - 1 - low;
        for j in 0..row_size {
            let column_offset = j * 2;
            for k in 0..2 {
                raw[row_offset + column_offset + k] = matrix.get(map[low + k], map[low + j]);
                raw[row_offset + 2 * row_size + column_offset + k] =
                    matrix.get(map[low + j], map[high - k]);
                raw[row_offset + 4 * row_size + column_offset + k] =
                    matrix.get(map[high - k], map[high - j]);
                raw[row_offset + 6 * row_size + column_offset + k] =
                    matrix.get(map[high - j], map[low + k]);
            }
        }
        row_offset += row_size * 8;
    }
    raw
}

/// RS-correct the codeword stream and unstuff back into data bits.
fn correct_and_unstuff(
    raw: &[bool],
    layers: usize,
    data_codewords: usize,
) -> Result<Vec<bool>, crate::error::DecodeStatus> {
    let word_size = codeword_size(layers);
    let num_codewords = raw.len() / word_size;
    if data_codewords > num_codewords {
        return Err(format_error("mode message codeword count too large"));
    }
    let mut words: Vec<u32> = Vec::with_capacity(num_codewords);
    // The stream is padded at the front; codewords count from the end.
    let offset = raw.len() - num_codewords * word_size;
    for i in 0..num_codewords {
        let mut word = 0u32;
        for bit in 0..word_size {
            word = word << 1 | u32::from(raw[offset + i * word_size + bit]);
        }
        words.push(word);
    }
    let ec_count = num_codewords - data_codewords;
    reed_solomon_decode(data_field(layers), &mut words, ec_count)
        .map_err(|_| checksum_error("Aztec error correction failed"))?;

    let all_ones = (1u32 << word_size) - 1;
    let mut bits = Vec::with_capacity(data_codewords * word_size);
    for &word in &words[..data_codewords] {
        if word == 0 || word == all_ones {
            return Err(format_error("illegal all-same data codeword"));
        }
        if word == 1 || word == all_ones - 1 {
            // Stuffed bit: the stored word holds word_size-1 data bits.
            let fill = word != 1;
            for _ in 0..word_size - 1 {
                bits.push(fill);
            }
        } else {
            for bit in (0..word_size).rev() {
                bits.push(word >> bit & 1 != 0);
            }
        }
    }
    Ok(bits)
}

// ============================================================================
// Mode machine
// ============================================================================

const UPPER_TABLE: [&str; 32] = [
    "CTRL_PS", " ", "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O",
    "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z", "CTRL_LL", "CTRL_ML", "CTRL_DL",
    "CTRL_BS",
];
const LOWER_TABLE: [&str; 32] = [
    "CTRL_PS", " ", "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o",
    "p", "q", "r", "s", "t", "u", "v", "w", "x", "y", "z", "CTRL_US", "CTRL_ML", "CTRL_DL",
    "CTRL_BS",
];
const MIXED_TABLE: [&str; 32] = [
    "CTRL_PS", " ", "\x01", "\x02", "\x03", "\x04", "\x05", "\x06", "\x07", "\x08", "\x09",
    "\x0a", "\x0b", "\x0c", "\x0d", "\x1b", "\x1c", "\x1d", "\x1e", "\x1f", "@", "\\", "^", "_",
    "`", "|", "~", "\x7f", "CTRL_LL", "CTRL_UL", "CTRL_PL", "CTRL_BS",
];
const PUNCT_TABLE: [&str; 32] = [
    "FLG(n)", "\r", "\r\n", ". ", ", ", ": ", "!", "\"", "#", "$", "%", "&", "'", "(", ")", "*",
    "+", ",", "-", ".", "/", ":", ";", "<", "=", ">", "?", "[", "]", "{", "}", "CTRL_UL",
];
const DIGIT_TABLE: [&str; 16] = [
    "CTRL_PS", " ", "0", "1", "2", "3", "4", "5", "6", "7", "8", "9", ",", ".", "CTRL_UL",
    "CTRL_US",
];

#[derive(Clone, Copy, PartialEq)]
enum Table {
    Upper,
    Lower,
    Mixed,
    Punct,
    Digit,
}

struct BitCursor<'a> {
    bits: &'a [bool],
    pos: usize,
}

impl BitCursor<'_> {
    fn available(&self) -> usize {
        self.bits.len() - self.pos
    }

    fn read(&mut self, count: usize) -> Option<u32> {
        if count > self.available() {
            return None;
        }
        let mut value = 0;
        for _ in 0..count {
            value = value << 1 | u32::from(self.bits[self.pos]);
            self.pos += 1;
        }
        Some(value)
    }
}

fn table_entry(table: Table, code: usize) -> &'static str {
    match table {
        Table::Upper => UPPER_TABLE[code],
        Table::Lower => LOWER_TABLE[code],
        Table::Mixed => MIXED_TABLE[code],
        Table::Punct => PUNCT_TABLE[code],
        Table::Digit => DIGIT_TABLE[code],
    }
}

fn decode_bits(bits: &[bool]) -> DecoderResult {
    let mut cursor = BitCursor { bits, pos: 0 };
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::with_eci_offset(b'z', 0, 3);
    let mut latched = Table::Upper;
    let mut shifted: Option<Table> = None;

    loop {
        let table = shifted.take().unwrap_or(latched);
        let size = if table == Table::Digit { 4 } else { 5 };
        let Some(code) = cursor.read(size) else {
            break;
        };
        let entry = table_entry(table, code as usize);
        if entry == "FLG(n)" {
            let Some(n) = cursor.read(3) else {
                break;
            };
            match n {
                0 => content.apply_fnc1_in_first_position(),
                1..=6 => {
                    let mut eci = 0u32;
                    for _ in 0..n {
                        match cursor.read(4) {
                            // ECI digits use the digit table encoding.
                            Some(d) if (2..=11).contains(&d) => eci = eci * 10 + (d - 2),
                            _ => return DecoderResult::with_error(format_error("bad ECI digits")),
                        }
                    }
                    content.switch_encoding(Eci(eci));
                }
                _ => return DecoderResult::with_error(format_error("FLG(7) is reserved")),
            }
        } else if entry == "CTRL_BS" {
            // Binary shift: 5-bit length, 0 extends to 11 bits + 31.
            // Truncation here is the trailing codeword padding, not an
            // error.
            let Some(mut length) = cursor.read(5).map(|l| l as usize) else {
                break;
            };
            if length == 0 {
                match cursor.read(11) {
                    Some(l) => length = l as usize + 31,
                    None => break,
                }
            }
            if length * 8 > cursor.available() {
                break;
            }
            for _ in 0..length {
                if let Some(byte) = cursor.read(8) {
                    content.push(byte as u8);
                }
            }
        } else if let Some(ctrl) = entry.strip_prefix("CTRL_") {
            let target = match &ctrl[..1] {
                "U" => Table::Upper,
                "L" => Table::Lower,
                "M" => Table::Mixed,
                "P" => Table::Punct,
                _ => Table::Digit,
            };
            if ctrl.ends_with('S') {
                shifted = Some(target);
            } else {
                latched = target;
            }
        } else {
            content.append_str(entry);
        }
        if cursor.available() < 4 {
            break;
        }
    }

    DecoderResult::new(content)
}

// ============================================================================
// Reader
// ============================================================================

pub(crate) fn read(image: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    if !(opts.has_format(BarcodeFormat::Aztec) || opts.has_format(BarcodeFormat::AztecRune)) {
        return Vec::new();
    }
    // Locate candidate symbol centers, then let successful mode-message
    // decoding arbitrate both the center and the dimension.
    for (cx, cy, module, box_width) in locate(image, opts) {
        for dim in plausible_dimensions() {
            let span = dim as f32 * module;
            if box_width > 0.0 && (span - box_width).abs() > module {
                continue;
            }
            let left = cx - span / 2.0;
            let top = cy - span / 2.0;
            if left < -module || top < -module {
                continue;
            }
            let grid = BitMatrix::from_fn(dim, dim, |x, y| {
                let px = (left + (x as f32 + 0.5) * module) as isize;
                let py = (top + (y as f32 + 0.5) * module) as isize;
                px >= 0
                    && py >= 0
                    && (px as usize) < image.width()
                    && (py as usize) < image.height()
                    && image.get(px as usize, py as usize)
            });
            if !grid_has_bullseye(&grid) {
                continue;
            }
            let position = Position::new(
                Point::new(left as i32, top as i32),
                Point::new((left + span) as i32, top as i32),
                Point::new((left + span) as i32, (top + span) as i32),
                Point::new(left as i32, (top + span) as i32),
            );
            if let Some(barcode) = decode_grid(&grid, position, opts) {
                return vec![barcode];
            }
        }
    }
    Vec::new()
}

fn decode_grid(grid: &BitMatrix, position: Position, opts: &ReaderOptions) -> Option<Barcode> {
    // Rune: an 11x11 compact frame with no data layers.
    if grid.height() == 11 && opts.has_format(BarcodeFormat::AztecRune) {
        if let Some(value) = decode_rune_message(grid) {
            if value < 256 {
                let mut content = Content::new();
                content.symbology = SymbologyIdentifier::new(b'z', 0);
                content.append_str(&value.to_string());
                let result = DecoderResult::new(content);
                return Some(Barcode::new(BarcodeFormat::AztecRune, result, position));
            }
        }
    }
    if !opts.has_format(BarcodeFormat::Aztec) {
        return None;
    }
    let dim = grid.height();
    // Compact and full-range frames can share a dimension; try both.
    for compact in [true, false] {
        let Some(layers) =
            (1..=if compact { 4 } else { 32 }).find(|&l| symbol_dimension(l, compact) == dim)
        else {
            continue;
        };
        let Some((msg_layers, data_codewords)) = decode_mode_message(grid, compact) else {
            continue;
        };
        if msg_layers != layers {
            continue;
        }
        let raw = extract_bits(grid, layers, compact);
        let total_codewords = raw.len() / codeword_size(layers);
        let mut result = match correct_and_unstuff(&raw, layers, data_codewords) {
            Ok(bits) => decode_bits(&bits),
            Err(status) => DecoderResult::with_error(status),
        };
        result.version_number = layers as i32;
        result.ec_level = format!(
            "{}%",
            100 * (total_codewords - data_codewords) / total_codewords
        );
        if result.error.is_error() && !opts.return_errors {
            continue;
        }
        return Some(Barcode::new(BarcodeFormat::Aztec, result, position));
    }
    None
}

/// Candidate symbols: (center x, center y, module size, bounding width;
/// 0 when the extent is unknown).
fn locate(image: &BitMatrix, opts: &ReaderOptions) -> Vec<(f32, f32, f32, f32)> {
    if opts.is_pure {
        let Some((left, top, width, height)) = image.find_bounding_box(11) else {
            return Vec::new();
        };
        if width != height {
            return Vec::new();
        }
        // Derive the module from the first dimension dividing the box.
        let Some(dim) = plausible_dimensions().find(|d| width % d == 0) else {
            return Vec::new();
        };
        return vec![(
            left as f32 + width as f32 / 2.0,
            top as f32 + height as f32 / 2.0,
            (width / dim) as f32,
            width as f32,
        )];
    }
    find_concentric_patterns(image, &COMPACT_BULLSEYE, opts.try_harder)
        .into_iter()
        .map(|c| (c.x, c.y, c.module_size, 0.0))
        .collect()
}

fn plausible_dimensions() -> impl Iterator<Item = usize> {
    let compact = (0..=4usize).map(|l| symbol_dimension(l.max(1), true));
    let full = (1..=32usize).map(|l| symbol_dimension(l, false));
    let mut dims: Vec<usize> = std::iter::once(11).chain(compact).chain(full).collect();
    dims.sort_unstable();
    dims.dedup();
    dims.into_iter()
}

/// Verify the alternating bullseye rings at the grid center.
fn grid_has_bullseye(grid: &BitMatrix) -> bool {
    let c = grid.height() / 2;
    if !grid.get(c, c) {
        return false;
    }
    for ring in 1..=4usize {
        let want_dark = ring % 2 == 0;
        // Probe the four axis points of the ring.
        for (dx, dy) in [(ring as isize, 0), (0, ring as isize), (-(ring as isize), 0), (0, -(ring as isize))] {
            let x = (c as isize + dx) as usize;
            let y = (c as isize + dy) as usize;
            if grid.get(x, y) != want_dark {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rs::reed_solomon_encode;

    /// Build a compact or full symbol from data bits in byte mode.
    fn build_symbol(data: &[u8], layers: usize, compact: bool) -> BitMatrix {
        // Byte mode: B/S latch from upper, 5-bit length (assume < 32).
        assert!(data.len() < 32);
        let mut bits: Vec<bool> = Vec::new();
        let push_bits = |bits: &mut Vec<bool>, value: u32, count: usize| {
            for i in (0..count).rev() {
                bits.push(value >> i & 1 != 0);
            }
        };
        push_bits(&mut bits, 31, 5);
        push_bits(&mut bits, data.len() as u32, 5);
        for &b in data {
            push_bits(&mut bits, u32::from(b), 8);
        }

        // Stuff into codewords.
        let word_size = codeword_size(layers);
        let all_ones = (1u32 << word_size) - 1;
        let mut words: Vec<u32> = Vec::new();
        let mut i = 0;
        while i < bits.len() {
            let mut word = 0u32;
            let mut taken = 0;
            while taken < word_size - 1 && i < bits.len() {
                word = word << 1 | u32::from(bits[i]);
                i += 1;
                taken += 1;
            }
            // Last bit: stuff the complement when the word so far is
            // uniform, otherwise take the next data bit.
            let low_mask = (1u32 << taken) - 1;
            if taken == word_size - 1 && (word == 0 || word == low_mask) {
                word = word << 1 | u32::from(word == 0);
            } else if i < bits.len() {
                word = word << 1 | u32::from(bits[i]);
                i += 1;
                taken += 1;
                if taken < word_size {
                    word <<= word_size - taken;
                    word |= (1 << (word_size - taken)) - 1; // pad with ones
                }
            } else {
                word <<= word_size - taken;
                word |= (1 << (word_size - taken)) - 1;
                if word == all_ones {
                    word &= !1;
                }
            }
            words.push(word);
        }
        let data_codewords = words.len();

        // Reed-Solomon over the data field.
        let total_codewords = total_bits(layers, compact) / word_size;
        let ec = total_codewords - data_codewords;
        let full = reed_solomon_encode(data_field(layers), &words, ec);

        // Serialize back to the raw bit stream (front padding zeroed).
        let mut raw = vec![false; total_bits(layers, compact)];
        let offset = raw.len() - total_codewords * word_size;
        for (w, &word) in full.iter().enumerate() {
            for bit in 0..word_size {
                raw[offset + w * word_size + bit] = word >> (word_size - 1 - bit) & 1 != 0;
            }
        }

        // Lay out the matrix: data spiral, bullseye, mode message.
        let dim = symbol_dimension(layers, compact);
        let mut matrix = BitMatrix::new(dim, dim);
        place_raw_bits(&mut matrix, &raw, layers, compact);
        draw_bullseye(&mut matrix, compact);
        draw_mode_message(&mut matrix, layers, data_codewords, compact);
        matrix
    }

    fn place_raw_bits(matrix: &mut BitMatrix, raw: &[bool], layers: usize, compact: bool) {
        let base = base_size(layers, compact);
        let map = alignment_map(layers, compact);
        let mut row_offset = 0;
        for i in 0..layers {
            let row_size = (layers - i) * 4 + if compact { 9 } else { 12 };
            let low = i * 2;
            let high = base - 1 - low;
            for j in 0..row_size {
                let column_offset = j * 2;
                for k in 0..2 {
                    matrix.set(map[low + k], map[low + j], raw[row_offset + column_offset + k]);
                    matrix.set(
                        map[low + j],
                        map[high - k],
                        raw[row_offset + 2 * row_size + column_offset + k],
                    );
                    matrix.set(
                        map[high - k],
                        map[high - j],
                        raw[row_offset + 4 * row_size + column_offset + k],
                    );
                    matrix.set(
                        map[high - j],
                        map[low + k],
                        raw[row_offset + 6 * row_size + column_offset + k],
                    );
                }
            }
            row_offset += row_size * 8;
        }
        // Reference grid for full symbols.
        if !compact {
            let dim = matrix.height();
            let center = dim / 2;
            let mut line = center as isize;
            while line >= 0 {
                for i in 0..dim {
                    matrix.set(line as usize, i, i % 2 == 0);
                    matrix.set(i, line as usize, i % 2 == 0);
                }
                line -= 16;
            }
            let mut line = center + 16;
            while line < dim {
                for i in 0..dim {
                    matrix.set(line, i, i % 2 == 0);
                    matrix.set(i, line, i % 2 == 0);
                }
                line += 16;
            }
        }
    }

    fn draw_bullseye(matrix: &mut BitMatrix, compact: bool) {
        let c = matrix.height() / 2;
        let rings = if compact { 4 } else { 6 };
        for ring in 0..=rings as isize {
            let dark = ring % 2 == 0;
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs().max(dy.abs()) == ring {
                        matrix.set(
                            (c as isize + dx) as usize,
                            (c as isize + dy) as usize,
                            dark,
                        );
                    }
                }
            }
        }
    }

    fn draw_mode_message(matrix: &mut BitMatrix, layers: usize, data_codewords: usize, compact: bool) {
        let bits = if compact {
            ((layers - 1) as u32) << 6 | (data_codewords - 1) as u32
        } else {
            ((layers - 1) as u32) << 11 | (data_codewords - 1) as u32
        };
        let data_words: Vec<u32> = if compact {
            vec![bits >> 4 & 0xF, bits & 0xF]
        } else {
            vec![bits >> 12 & 0xF, bits >> 8 & 0xF, bits >> 4 & 0xF, bits & 0xF]
        };
        let ec = if compact { 5 } else { 6 };
        let words = reed_solomon_encode(gf16(), &data_words, ec);
        let positions = mode_message_positions(matrix.height() / 2, compact);
        for (chunk, &word) in positions.chunks(4).zip(words.iter()) {
            for (bit, &(x, y)) in chunk.iter().enumerate() {
                matrix.set(x, y, word >> (3 - bit) & 1 != 0);
            }
        }
    }

    fn frame(matrix: &BitMatrix, quiet: usize, scale: usize) -> BitMatrix {
        let dim = matrix.height();
        BitMatrix::from_fn((dim + 2 * quiet) * scale, (dim + 2 * quiet) * scale, |x, y| {
            let mx = (x / scale) as isize - quiet as isize;
            let my = (y / scale) as isize - quiet as isize;
            mx >= 0 && my >= 0 && (mx as usize) < dim && (my as usize) < dim
                && matrix.get(mx as usize, my as usize)
        })
    }

    #[test]
    fn test_compact_round_trip() {
        let matrix = build_symbol(b"Aztec!", 2, true);
        let image = frame(&matrix, 4, 2);
        let results = read(&image, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::Aztec);
        assert_eq!(results[0].bytes(), b"Aztec!");
        assert_eq!(results[0].version_number(), 2);
    }

    #[test]
    fn test_full_range_round_trip() {
        let matrix = build_symbol(b"full range layers", 5, false);
        let image = frame(&matrix, 4, 2);
        let results = read(&image, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bytes(), b"full range layers");
    }

    #[test]
    fn test_rune() {
        let mut matrix = BitMatrix::new(11, 11);
        draw_bullseye(&mut matrix, true);
        // Rune 77: mode words are the complemented RS stream.
        let words = reed_solomon_encode(gf16(), &[77 >> 4, 77 & 0xF], 5);
        let positions = mode_message_positions(5, true);
        for (chunk, &word) in positions.chunks(4).zip(words.iter()) {
            for (bit, &(x, y)) in chunk.iter().enumerate() {
                matrix.set(x, y, (word ^ 0xF) >> (3 - bit) & 1 != 0);
            }
        }
        let image = frame(&matrix, 4, 3);
        let opts = ReaderOptions::new().formats([BarcodeFormat::AztecRune]);
        let results = read(&image, &opts);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::AztecRune);
        assert_eq!(results[0].bytes(), b"77");
    }
}
