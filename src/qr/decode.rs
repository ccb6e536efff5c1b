//! QR bit extraction and content decoding
//!
//! From a sampled module grid to a DecoderResult: read and error-check
//! the format information, unmask the data area, serialize the zigzag
//! module walk into codewords, de-interleave and Reed-Solomon-correct
//! the blocks, then run the mode machine over the data stream.

use super::version::{EcLevel, MicroVersion, Version};
use crate::barcode::{DecoderResult, StructuredAppendInfo};
use crate::bits::BitMatrix;
use crate::content::{Content, Eci, SymbologyIdentifier};
use crate::error::{checksum_error, format_error, DecodeStatus};
use crate::gf::gf256_qr;
use crate::rs::reed_solomon_decode;

// ============================================================================
// Format and version information
// ============================================================================

const FORMAT_INFO_MASK: u32 = 0x5412;

/// BCH-protected 15-bit format word for (ec bits << 3 | mask).
fn encode_format_bits(data: u32) -> u32 {
    let mut rem = data << 10;
    for i in (10..15).rev() {
        if rem >> i & 1 != 0 {
            rem ^= 0x537 << (i - 10);
        }
    }
    ((data << 10) | rem) ^ FORMAT_INFO_MASK
}

/// 18-bit version word for version 7..=40.
fn encode_version_bits(version: u32) -> u32 {
    let mut rem = version << 12;
    for i in (12..18).rev() {
        if rem >> i & 1 != 0 {
            rem ^= 0x1F25 << (i - 12);
        }
    }
    (version << 12) | rem
}

/// Decode 15 format bits with up to 3 bit errors tolerated.
pub(super) fn decode_format_bits(bits: u32) -> Option<(EcLevel, u32)> {
    let mut best = (4, 0u32);
    for data in 0..32 {
        let distance = (encode_format_bits(data) ^ bits).count_ones();
        if distance < best.0 {
            best = (distance, data);
        }
    }
    (best.0 <= 3).then(|| (EcLevel::from_bits(best.1 >> 3), best.1 & 7))
}

/// Decode 18 version bits with up to 3 bit errors tolerated.
pub(super) fn decode_version_bits(bits: u32) -> Option<Version> {
    let mut best = (4, 0usize);
    for version in 7..=40u32 {
        let distance = (encode_version_bits(version) ^ bits).count_ones();
        if distance < best.0 {
            best = (distance, version as usize);
        }
    }
    (best.0 <= 3).then(|| Version::from_number(best.1))?
}

/// Read the two format info copies from a standard QR matrix and return
/// the first that error-checks.
pub(super) fn read_format_info(matrix: &BitMatrix) -> Option<(EcLevel, u32)> {
    let dim = matrix.height();
    // Copy 1: around the top-left finder.
    let mut bits1 = 0u32;
    for x in 0..6 {
        bits1 = bits1 << 1 | u32::from(matrix.get(x, 8));
    }
    bits1 = bits1 << 1 | u32::from(matrix.get(7, 8));
    bits1 = bits1 << 1 | u32::from(matrix.get(8, 8));
    bits1 = bits1 << 1 | u32::from(matrix.get(8, 7));
    for y in (0..6).rev() {
        bits1 = bits1 << 1 | u32::from(matrix.get(8, y));
    }
    // Copy 2: split between the other two finders.
    let mut bits2 = 0u32;
    for y in (dim - 7..dim).rev() {
        bits2 = bits2 << 1 | u32::from(matrix.get(8, y));
    }
    for x in dim - 8..dim {
        bits2 = bits2 << 1 | u32::from(matrix.get(x, 8));
    }
    decode_format_bits(bits1).or_else(|| decode_format_bits(bits2))
}

/// Read the version info blocks of a matrix large enough to carry them.
pub(super) fn read_version_info(matrix: &BitMatrix) -> Option<Version> {
    let dim = matrix.height();
    let mut bits1 = 0u32;
    let mut bits2 = 0u32;
    for y in (0..6).rev() {
        for x in (dim - 11..dim - 8).rev() {
            bits1 = bits1 << 1 | u32::from(matrix.get(x, y));
            bits2 = bits2 << 1 | u32::from(matrix.get(y, x));
        }
    }
    decode_version_bits(bits1).or_else(|| decode_version_bits(bits2))
}

// ============================================================================
// Data extraction
// ============================================================================

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

/// Function modules of a standard symbol (finders, timing, alignment,
/// format/version areas, dark module).
pub(super) fn function_pattern_mask(version: &Version) -> BitMatrix {
    let dim = version.dimension();
    let mut mask = BitMatrix::new(dim, dim);
    let mut fill = |x0: usize, y0: usize, w: usize, h: usize| {
        for y in y0..(y0 + h).min(dim) {
            for x in x0..(x0 + w).min(dim) {
                mask.set(x, y, true);
            }
        }
    };
    // Finders + separators + format info areas.
    fill(0, 0, 9, 9);
    fill(dim - 8, 0, 8, 9);
    fill(0, dim - 8, 9, 8);
    // Timing.
    fill(8, 6, dim - 16, 1);
    fill(6, 8, 1, dim - 16);
    // Alignment patterns.
    let centers = version.alignment_centers();
    for &cy in centers {
        for &cx in centers {
            let corner = (cx <= 8 && cy <= 8)
                || (cx >= dim - 9 && cy <= 8)
                || (cx <= 8 && cy >= dim - 9);
            if !corner {
                fill(cx - 2, cy - 2, 5, 5);
            }
        }
    }
    // Version info.
    if version.number >= 7 {
        fill(dim - 11, 0, 3, 6);
        fill(0, dim - 11, 6, 3);
    }
    mask
}

/// Unmask and serialize the data modules in placement order.
pub(super) fn extract_codewords(matrix: &BitMatrix, version: &Version, mask: u32) -> Vec<u8> {
    let dim = version.dimension();
    let function = function_pattern_mask(version);
    let mut codewords = Vec::with_capacity(version.total_codewords());
    let mut current = 0u32;
    let mut bit_count = 0;
    let mut upward = true;
    let mut col = dim as isize - 1;
    while col > 0 {
        if col == 6 {
            // The vertical timing column is skipped entirely.
            col -= 1;
        }
        for i in 0..dim {
            let y = if upward { dim - 1 - i } else { i };
            for dx in 0..2usize {
                let x = (col as usize) - dx;
                if function.get(x, y) {
                    continue;
                }
                let bit = matrix.get(x, y) ^ mask_bit(mask, x, y);
                current = current << 1 | u32::from(bit);
                bit_count += 1;
                if bit_count == 8 {
                    codewords.push(current as u8);
                    current = 0;
                    bit_count = 0;
                }
            }
        }
        upward = !upward;
        col -= 2;
    }
    codewords
}

/// Undo the block interleave and correct each RS block. Returns the
/// concatenated data codewords.
pub(super) fn correct_blocks(
    codewords: &[u8],
    version: &Version,
    level: EcLevel,
) -> Result<Vec<u8>, DecodeStatus> {
    let layout = version.ec_blocks(level);
    if codewords.len() < layout.total_codewords() {
        return Err(format_error("codeword stream shorter than the version holds"));
    }
    let ec_per_block = usize::from(layout.ec_codewords_per_block);
    let mut blocks: Vec<Vec<u32>> = Vec::with_capacity(layout.total_blocks());
    for run in &layout.runs {
        for _ in 0..run.count {
            blocks.push(Vec::with_capacity(
                usize::from(run.data_codewords) + ec_per_block,
            ));
        }
    }
    let data_sizes: Vec<usize> = {
        let mut sizes = Vec::new();
        for run in &layout.runs {
            for _ in 0..run.count {
                sizes.push(usize::from(run.data_codewords));
            }
        }
        sizes
    };
    let max_data = data_sizes.iter().copied().max().unwrap_or(0);

    // Data codewords round-robin, short blocks skipping the final round.
    let mut index = 0;
    for round in 0..max_data {
        for (b, &size) in data_sizes.iter().enumerate() {
            if round < size {
                blocks[b].push(u32::from(codewords[index]));
                index += 1;
            }
        }
    }
    // EC codewords round-robin.
    for _ in 0..ec_per_block {
        for block in blocks.iter_mut() {
            block.push(u32::from(codewords[index]));
            index += 1;
        }
    }

    let field = gf256_qr();
    let mut data = Vec::with_capacity(layout.total_data_codewords());
    for (block, &size) in blocks.iter_mut().zip(&data_sizes) {
        reed_solomon_decode(field, block, ec_per_block)
            .map_err(|_| checksum_error("Reed-Solomon failure in a data block"))?;
        data.extend(block[..size].iter().map(|&w| w as u8));
    }
    Ok(data)
}

// ============================================================================
// Mode machine
// ============================================================================

struct BitSource<'a> {
    bytes: &'a [u8],
    byte_offset: usize,
    bit_offset: usize,
}

impl<'a> BitSource<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    fn available(&self) -> usize {
        8 * (self.bytes.len() - self.byte_offset) - self.bit_offset
    }

    fn read(&mut self, count: usize) -> Option<u32> {
        if count > self.available() || count > 32 {
            return None;
        }
        let mut result = 0u32;
        for _ in 0..count {
            let bit = self.bytes[self.byte_offset] >> (7 - self.bit_offset) & 1;
            result = result << 1 | u32::from(bit);
            self.bit_offset += 1;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_offset += 1;
            }
        }
        Some(result)
    }
}

const ALPHANUMERIC_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ $%*+-./:";

fn character_count_bits(mode: u32, version: usize) -> usize {
    let range = match version {
        1..=9 => 0,
        10..=26 => 1,
        _ => 2,
    };
    match mode {
        0b0001 => [10, 12, 14][range], // numeric
        0b0010 => [9, 11, 13][range],  // alphanumeric
        0b0100 => [8, 16, 16][range],  // byte
        0b1000 => [8, 10, 12][range],  // kanji
        _ => 0,
    }
}

/// Decode the data stream of a standard QR symbol.
pub(super) fn decode_content(bytes: &[u8], version: &Version, level: EcLevel) -> DecoderResult {
    let mut source = BitSource::new(bytes);
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::with_eci_offset(b'Q', 1, 1);
    let mut sa = StructuredAppendInfo::none();

    loop {
        let mode = match source.read(4) {
            None | Some(0) => break,
            Some(m) => m,
        };
        match mode {
            0b0011 => {
                // Structured append: index, total, parity.
                let Some(header) = source.read(16) else {
                    return DecoderResult::with_error(format_error("truncated structured append"));
                };
                sa.index = (header >> 12) as i32;
                sa.count = (header >> 8 & 0xF) as i32 + 1;
                sa.id = (header & 0xFF).to_string();
            }
            0b0111 => {
                // ECI designator, 1-3 bytes by prefix.
                let Some(first) = source.read(8) else {
                    return DecoderResult::with_error(format_error("truncated ECI"));
                };
                let value = if first & 0x80 == 0 {
                    first & 0x7F
                } else if first & 0xC0 == 0x80 {
                    match source.read(8) {
                        Some(second) => (first & 0x3F) << 8 | second,
                        None => return DecoderResult::with_error(format_error("truncated ECI")),
                    }
                } else {
                    match source.read(16) {
                        Some(rest) => (first & 0x1F) << 16 | rest,
                        None => return DecoderResult::with_error(format_error("truncated ECI")),
                    }
                };
                content.switch_encoding(Eci(value));
            }
            0b0101 => content.apply_fnc1_in_first_position(),
            0b1001 => {
                // FNC1 second position, application indicator follows.
                let _ = source.read(8);
            }
            0b0001 => {
                let count = source.read(character_count_bits(mode, version.number) as usize);
                let Some(count) = count else {
                    return DecoderResult::with_error(format_error("truncated numeric segment"));
                };
                if !decode_numeric(&mut source, count as usize, &mut content) {
                    return DecoderResult::with_error(format_error("bad numeric segment"));
                }
            }
            0b0010 => {
                let count = source.read(character_count_bits(mode, version.number) as usize);
                let Some(count) = count else {
                    return DecoderResult::with_error(format_error("truncated alphanumeric segment"));
                };
                if !decode_alphanumeric(&mut source, count as usize, &mut content) {
                    return DecoderResult::with_error(format_error("bad alphanumeric segment"));
                }
            }
            0b0100 => {
                let count = source.read(character_count_bits(mode, version.number) as usize);
                let Some(count) = count else {
                    return DecoderResult::with_error(format_error("truncated byte segment"));
                };
                for _ in 0..count {
                    match source.read(8) {
                        Some(byte) => content.push(byte as u8),
                        None => {
                            return DecoderResult::with_error(format_error("truncated byte segment"))
                        }
                    }
                }
            }
            0b1000 => {
                let count = source.read(character_count_bits(mode, version.number) as usize);
                let Some(count) = count else {
                    return DecoderResult::with_error(format_error("truncated kanji segment"));
                };
                if !decode_kanji(&mut source, count as usize, &mut content) {
                    return DecoderResult::with_error(format_error("bad kanji segment"));
                }
            }
            _ => return DecoderResult::with_error(format_error("unknown mode indicator")),
        }
        if source.available() < 4 {
            break;
        }
    }

    let mut result = DecoderResult::new(content);
    result.ec_level = level.name().to_string();
    result.version_number = version.number as i32;
    result.structured_append = sa;
    result
}

fn decode_numeric(source: &mut BitSource<'_>, mut count: usize, content: &mut Content) -> bool {
    while count >= 3 {
        let Some(group) = source.read(10) else {
            return false;
        };
        if group >= 1000 {
            return false;
        }
        content.push(b'0' + (group / 100) as u8);
        content.push(b'0' + (group / 10 % 10) as u8);
        content.push(b'0' + (group % 10) as u8);
        count -= 3;
    }
    match count {
        2 => match source.read(7) {
            Some(group) if group < 100 => {
                content.push(b'0' + (group / 10) as u8);
                content.push(b'0' + (group % 10) as u8);
                true
            }
            _ => false,
        },
        1 => match source.read(4) {
            Some(digit) if digit < 10 => {
                content.push(b'0' + digit as u8);
                true
            }
            _ => false,
        },
        _ => true,
    }
}

fn decode_alphanumeric(source: &mut BitSource<'_>, mut count: usize, content: &mut Content) -> bool {
    while count >= 2 {
        let Some(pair) = source.read(11) else {
            return false;
        };
        let (a, b) = (pair / 45, pair % 45);
        if a >= 45 {
            return false;
        }
        content.push(ALPHANUMERIC_CHARS[a as usize]);
        content.push(ALPHANUMERIC_CHARS[b as usize]);
        count -= 2;
    }
    if count == 1 {
        match source.read(6) {
            Some(index) if index < 45 => content.push(ALPHANUMERIC_CHARS[index as usize]),
            _ => return false,
        }
    }
    true
}

/// Kanji segments hold 13-bit compacted Shift-JIS values; they are
/// re-expanded and transcoded to UTF-8 on the way into the content.
fn decode_kanji(source: &mut BitSource<'_>, count: usize, content: &mut Content) -> bool {
    let mut sjis = Vec::with_capacity(2 * count);
    for _ in 0..count {
        let Some(value) = source.read(13) else {
            return false;
        };
        let assembled = (value / 0xC0) << 8 | (value % 0xC0);
        let char_value = if assembled < 0x1F00 {
            assembled + 0x8140
        } else {
            assembled + 0xC140
        };
        sjis.push((char_value >> 8) as u8);
        sjis.push((char_value & 0xFF) as u8);
    }
    let (text, _, had_errors) = encoding_rs::SHIFT_JIS.decode(&sjis);
    if had_errors {
        return false;
    }
    content.append_str(&text);
    true
}

// ============================================================================
// Micro QR
// ============================================================================

/// Micro QR format word: 3-bit symbol number + 2-bit mask, BCH encoded
/// and XORed with 0x4445.
fn encode_micro_format_bits(data: u32) -> u32 {
    let mut rem = data << 10;
    for i in (10..15).rev() {
        if rem >> i & 1 != 0 {
            rem ^= 0x537 << (i - 10);
        }
    }
    ((data << 10) | rem) ^ 0x4445
}

pub(super) fn decode_micro_format_bits(bits: u32) -> Option<(u32, u32)> {
    let mut best = (4, 0u32);
    for data in 0..32 {
        let distance = (encode_micro_format_bits(data) ^ bits).count_ones();
        if distance < best.0 {
            best = (distance, data);
        }
    }
    (best.0 <= 3).then_some((best.1 >> 2, best.1 & 3))
}

/// Micro QR data masks.
fn micro_mask_bit(mask: u32, x: usize, y: usize) -> bool {
    match mask {
        0 => y % 2 == 0,
        1 => (y / 2 + x / 3) % 2 == 0,
        2 => ((x * y) % 2 + (x * y) % 3) % 2 == 0,
        _ => ((x + y) % 2 + (x * y) % 3) % 2 == 0,
    }
}

pub(super) fn micro_function_pattern_mask(dimension: usize) -> BitMatrix {
    let mut mask = BitMatrix::new(dimension, dimension);
    for y in 0..9.min(dimension) {
        for x in 0..9.min(dimension) {
            mask.set(x, y, true);
        }
    }
    for i in 0..dimension {
        mask.set(i, 0, true);
        mask.set(0, i, true);
    }
    mask
}

/// Extract the codeword stream of a Micro QR symbol. The final partial
/// codeword of M1/M3 symbols is padded into a full byte.
pub(super) fn extract_micro_codewords(
    matrix: &BitMatrix,
    version: &MicroVersion,
    mask: u32,
) -> Vec<u8> {
    let dim = version.dimension();
    let function = micro_function_pattern_mask(dim);
    let mut codewords = Vec::with_capacity(version.total_codewords());
    let mut current = 0u32;
    let mut bit_count = 0;
    let mut upward = true;
    let mut col = dim as isize - 1;
    while col > 0 {
        for i in 0..dim {
            let y = if upward { dim - 1 - i } else { i };
            for dx in 0..2usize {
                let x = (col as usize) - dx;
                if function.get(x, y) {
                    continue;
                }
                let bit = matrix.get(x, y) ^ micro_mask_bit(mask, x, y);
                current = current << 1 | u32::from(bit);
                bit_count += 1;
                if bit_count == 8 {
                    codewords.push(current as u8);
                    current = 0;
                    bit_count = 0;
                }
            }
        }
        upward = !upward;
        col -= 2;
    }
    if bit_count > 0 {
        codewords.push((current << (8 - bit_count)) as u8);
    }
    codewords
}

/// Micro QR mode machine: modes shrink with the symbol number.
pub(super) fn decode_micro_content(
    bytes: &[u8],
    version: &MicroVersion,
    level_name: &str,
) -> DecoderResult {
    let mut source = BitSource::new(bytes);
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::with_eci_offset(b'Q', 1, 1);
    let mode_bits = version.number - 1;

    loop {
        if source.available() < mode_bits.max(1) {
            break;
        }
        let mode = if mode_bits == 0 {
            0 // M1 is numeric-only with no mode indicator.
        } else {
            match source.read(mode_bits) {
                Some(m) => m,
                None => break,
            }
        };
        // Count field width by version and mode.
        let count_bits = match (version.number, mode) {
            (1, _) => 3,
            (2, 0) => 4,
            (2, _) => 3,
            (3, 0) => 5,
            (3, 1) => 4,
            (3, 2) => 4,
            (3, _) => 3,
            (4, 0) => 6,
            (4, 1) => 5,
            (4, 2) => 5,
            _ => 4,
        };
        let Some(count) = source.read(count_bits) else {
            break;
        };
        if count == 0 {
            break;
        }
        let ok = match mode {
            0 => decode_numeric(&mut source, count as usize, &mut content),
            1 => decode_alphanumeric(&mut source, count as usize, &mut content),
            2 => (0..count).all(|_| match source.read(8) {
                Some(byte) => {
                    content.push(byte as u8);
                    true
                }
                None => false,
            }),
            _ => decode_kanji(&mut source, count as usize, &mut content),
        };
        if !ok {
            return DecoderResult::with_error(format_error("bad Micro QR segment"));
        }
    }

    let mut result = DecoderResult::new(content);
    result.ec_level = level_name.to_string();
    result.version_number = version.number as i32;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bits_round_trip() {
        for data in 0..32 {
            let encoded = encode_format_bits(data);
            let (level, mask) = decode_format_bits(encoded).unwrap();
            assert_eq!(level, EcLevel::from_bits(data >> 3));
            assert_eq!(mask, data & 7);
            // Up to three errors correct back.
            let (level2, mask2) = decode_format_bits(encoded ^ 0b101).unwrap();
            assert_eq!((level2, mask2), (level, mask));
        }
    }

    #[test]
    fn test_known_format_word() {
        // Level M, mask 5 is the worked example from the standard.
        assert_eq!(encode_format_bits(0b00101), 0x40CE);
    }

    #[test]
    fn test_version_bits_round_trip() {
        for version in 7..=40u32 {
            let encoded = encode_version_bits(version);
            assert_eq!(
                decode_version_bits(encoded).unwrap().number,
                version as usize
            );
            assert_eq!(
                decode_version_bits(encoded ^ 0b1001).unwrap().number,
                version as usize
            );
        }
        assert_eq!(encode_version_bits(7), 0x07C94);
    }

    #[test]
    fn test_numeric_segment() {
        // Mode 0001, count 8, digits 01234567 from the standard example.
        let bytes = [0b0001_0000, 0b0010_0000, 0b0000_1100, 0b0101_0110, 0b0110_0001, 0b1000_0000];
        let version = Version::from_number(1).unwrap();
        let result = decode_content(&bytes, &version, EcLevel::M);
        assert_eq!(result.content.bytes(), b"01234567");
        assert_eq!(result.ec_level, "M");
    }

    #[test]
    fn test_alphanumeric_segment() {
        // "AC-42" encoded in alphanumeric mode, version 1.
        // A=10 C=12 -> 10*45+12=462; -=41 4=4 -> 41*45+4=1849; 2=2
        let mut bits = crate::bits::BitArray::default();
        bits.append_bits(0b0010, 4);
        bits.append_bits(5, 9);
        bits.append_bits(462, 11);
        bits.append_bits(1849, 11);
        bits.append_bits(2, 6);
        bits.append_bits(0, 4);
        let mut bytes = Vec::new();
        let mut i = 0;
        while i + 8 <= bits.len() {
            bytes.push(bits.read_bits(i, 8) as u8);
            i += 8;
        }
        if i < bits.len() {
            let rest = bits.len() - i;
            bytes.push((bits.read_bits(i, rest) << (8 - rest)) as u8);
        }
        let version = Version::from_number(1).unwrap();
        let result = decode_content(&bytes, &version, EcLevel::L);
        assert_eq!(result.content.bytes(), b"AC-42");
    }

    #[test]
    fn test_structured_append_header() {
        // SA mode: index 1 of 2, parity 0xAB, then numeric "7".
        let bytes = [
            0b0011_0001,
            0b0001_1010,
            0b1011_0001,
            0b0000_0000,
            0b0101_1100,
        ];
        let version = Version::from_number(1).unwrap();
        let result = decode_content(&bytes, &version, EcLevel::L);
        assert_eq!(result.structured_append.index, 1);
        assert_eq!(result.structured_append.count, 2);
        assert_eq!(result.structured_append.id, "171");
        assert_eq!(result.content.bytes(), b"7");
    }

    #[test]
    fn test_function_mask_counts() {
        let v1 = Version::from_number(1).unwrap();
        let mask = function_pattern_mask(&v1);
        let mut function_modules = 0;
        for y in 0..21 {
            for x in 0..21 {
                if mask.get(x, y) {
                    function_modules += 1;
                }
            }
        }
        // 441 total - 208 data bits = 233 function modules.
        assert_eq!(function_modules, 233);
    }
}
