//! PDF417 reader
//!
//! Stacked rows of 17-module symbol characters between a start and stop
//! column. Each character's cluster (0, 3 or 6) follows from its bar
//! widths and must match the row's cluster; the codeword value is the
//! ordinal of the width vector in the cluster's enumeration. Error
//! correction runs over GF(929).

use crate::barcode::{Barcode, DecoderResult, Point, Position};
use crate::bits::BitMatrix;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::{checksum_error, format_error};
use crate::format::BarcodeFormat;
use crate::gf::gf929;
use crate::options::ReaderOptions;
use crate::rs::reed_solomon_decode;
use std::collections::HashMap;
use std::sync::OnceLock;

pub(crate) const START_PATTERN: [u16; 8] = [8, 1, 1, 1, 1, 1, 1, 3];
pub(crate) const STOP_PATTERN: [u16; 9] = [7, 1, 1, 3, 1, 1, 1, 2, 1];
const MODULES_PER_CODEWORD: u16 = 17;

// ============================================================================
// Symbol character tables
// ============================================================================

/// Cluster number of an 8-element width vector, from the bar widths:
/// (b1 - b2 + b3 - b4 + 9) mod 9. Valid codewords fall in 0, 3 or 6.
fn cluster_of(widths: &[u16; 8]) -> u16 {
    let diff = i32::from(widths[0]) - i32::from(widths[2]) + i32::from(widths[4])
        - i32::from(widths[6]);
    (diff + 9).rem_euclid(9) as u16
}

/// Per-cluster pattern tables, built once by enumerating all width
/// vectors of 17 modules (elements 1..=6) in lexicographic order and
/// assigning sequential values within each cluster.
struct SymbolTables {
    /// widths -> value, per cluster 0/3/6.
    lookup: [HashMap<[u16; 8], u32>; 3],
    /// value -> widths, per cluster (for the test writer).
    patterns: [Vec<[u16; 8]>; 3],
}

fn symbol_tables() -> &'static SymbolTables {
    static TABLES: OnceLock<SymbolTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut tables = SymbolTables {
            lookup: [HashMap::new(), HashMap::new(), HashMap::new()],
            patterns: [Vec::new(), Vec::new(), Vec::new()],
        };
        let mut widths = [1u16; 8];
        loop {
            let total: u16 = widths.iter().sum();
            if total == MODULES_PER_CODEWORD {
                let cluster = cluster_of(&widths);
                if let Some(slot) = [0u16, 3, 6].iter().position(|&c| c == cluster) {
                    if tables.patterns[slot].len() < 929 {
                        let value = tables.patterns[slot].len() as u32;
                        tables.lookup[slot].insert(widths, value);
                        tables.patterns[slot].push(widths);
                    }
                }
            }
            // Next vector in lexicographic order.
            let mut i = 7;
            loop {
                widths[i] += 1;
                if widths[i] <= 6 {
                    break;
                }
                widths[i] = 1;
                if i == 0 {
                    return tables;
                }
                i -= 1;
            }
        }
    })
}

/// Decode one symbol character window into (cluster slot, value).
fn decode_codeword(widths: &[u16; 8], module: f32) -> Option<(usize, u32)> {
    let mut quantized = [0u16; 8];
    let mut total = 0;
    for (q, &w) in quantized.iter_mut().zip(widths) {
        *q = ((f32::from(w) / module).round() as u16).clamp(1, 6);
        total += *q;
    }
    if total != MODULES_PER_CODEWORD {
        return None;
    }
    let cluster = cluster_of(&quantized);
    let slot = [0u16, 3, 6].iter().position(|&c| c == cluster)?;
    symbol_tables().lookup[slot]
        .get(&quantized)
        .map(|&value| (slot, value))
}

// ============================================================================
// Reader
// ============================================================================

pub(crate) fn read(image: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    if !opts.has_format(BarcodeFormat::PDF417) {
        return Vec::new();
    }
    let Some((codewords, position)) = detect_and_extract(image) else {
        return Vec::new();
    };
    let mut result = decode_codewords(&codewords);
    if result.error.is_error() && !opts.return_errors {
        return Vec::new();
    }
    result.content.symbology = SymbologyIdentifier::with_eci_offset(b'L', 2, 3);
    vec![Barcode::new(BarcodeFormat::PDF417, result, position)]
}

/// Find the start column, then walk rows reading codewords until the
/// stop column. Row indices come from the cluster sequence.
fn detect_and_extract(image: &BitMatrix) -> Option<(Vec<u32>, Position)> {
    use crate::pattern::{pattern_variance, PatternRow};

    let mut row_runs = PatternRow::new();
    let mut first_row: Option<usize> = None;
    let mut last_row = 0;
    let mut columns = 0usize;
    // (row index by cluster, codewords per grid row)
    let mut grid: Vec<Vec<u32>> = Vec::new();
    let mut x_bounds = (i32::MAX, 0i32);

    for y in 0..image.height() {
        image.get_pattern_row(y, 0, &mut row_runs);
        let view = row_runs.view();
        let Some((start, module)) = crate::oned::find_left_guard(&view, 8, |w| {
            (pattern_variance(w, &START_PATTERN) < 0.2).then(|| w.sum() as f32 / 17.0)
        }) else {
            continue;
        };

        // Left row indicator, data codewords, right row indicator.
        let mut words = Vec::new();
        let mut next = start;
        let mut slot0 = None;
        loop {
            next = match next.sub_view(8, 8) {
                Some(v) => v,
                None => break,
            };
            // Stop column reached?
            if let Some(stop) = next.sub_view(0, 9) {
                if pattern_variance(&stop, &STOP_PATTERN) < 0.2 {
                    break;
                }
            }
            let mut widths = [0u16; 8];
            for (i, w) in widths.iter_mut().enumerate() {
                *w = next.get(i);
            }
            let Some((slot, value)) = decode_codeword(&widths, module) else {
                words.clear();
                break;
            };
            slot0.get_or_insert(slot);
            words.push(value);
        }
        if words.len() < 3 {
            continue;
        }

        // The left row indicator encodes the row number in its cluster
        // slot and value; rows repeat vertically, so collapse repeats.
        let row_number = {
            let indicator = words[0];
            (indicator / 30) as usize * 3 + slot0.unwrap_or(0)
        };
        if first_row.is_none() {
            first_row = Some(y);
        }
        last_row = y;
        x_bounds.0 = x_bounds.0.min(start.pixels_in_front() as i32);
        x_bounds.1 = x_bounds.1.max(next.pixels_until_end() as i32);
        columns = columns.max(words.len() - 2);
        if grid.len() <= row_number {
            grid.resize(row_number + 1, Vec::new());
        }
        if grid[row_number].is_empty() {
            grid[row_number] = words[1..words.len() - 1].to_vec();
        }
    }

    let first_row = first_row?;
    if grid.is_empty() || grid.iter().any(|r| r.is_empty()) {
        return None;
    }
    let codewords: Vec<u32> = grid.into_iter().flatten().collect();
    let position = Position::new(
        Point::new(x_bounds.0, first_row as i32),
        Point::new(x_bounds.1, first_row as i32),
        Point::new(x_bounds.1, last_row as i32),
        Point::new(x_bounds.0, last_row as i32),
    );
    Some((codewords, position))
}

/// Error-correct and run the compaction mode machine.
fn decode_codewords(codewords: &[u32]) -> DecoderResult {
    if codewords.len() < 4 {
        return DecoderResult::with_error(format_error("too few codewords"));
    }
    // The first codeword is the symbol length descriptor; everything
    // after length is error correction.
    let mut words = codewords.to_vec();
    let length = words[0] as usize;
    if length == 0 || length > words.len() {
        return DecoderResult::with_error(format_error("bad length descriptor"));
    }
    let ec_count = words.len() - length;
    if ec_count < 2 {
        return DecoderResult::with_error(format_error("missing error correction"));
    }
    if reed_solomon_decode(gf929(), &mut words, ec_count).is_err() {
        return DecoderResult::with_error(checksum_error("PDF417 error correction failed"));
    }
    decode_text(&words[1..length])
}

const TEXT_PUNCT: &[u8] = b";<>@[\\]_`~!\r\t,:\n-.$/\"|*()?{}'";
const TEXT_MIXED: &[u8] = b"0123456789&\r\t,:#-.$/+%*=^";

/// Text / byte / numeric compaction.
fn decode_text(words: &[u32]) -> DecoderResult {
    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        Text,
        Byte,
        Numeric,
    }
    #[derive(Clone, Copy, PartialEq)]
    enum Sub {
        Alpha,
        Lower,
        Mixed,
        Punct,
    }
    let mut content = Content::new();
    let mut mode = Mode::Text;
    let mut sub = Sub::Alpha;
    let mut shift: Option<Sub> = None;
    let mut i = 0;

    while i < words.len() {
        let word = words[i];
        match word {
            900 => {
                mode = Mode::Text;
                sub = Sub::Alpha;
                i += 1;
            }
            901 | 924 => {
                mode = Mode::Byte;
                i += 1;
            }
            902 => {
                mode = Mode::Numeric;
                i += 1;
            }
            913 => {
                // Byte shift.
                if i + 1 < words.len() {
                    content.push(words[i + 1] as u8);
                }
                i += 2;
            }
            928 => {
                // Macro block: structured append header, skipped here.
                i = words.len();
            }
            _ if word > 928 => {
                i += 1;
            }
            _ => match mode {
                Mode::Text => {
                    for &half in &[word / 30, word % 30] {
                        let effective = shift.take().unwrap_or(sub);
                        let half = half as usize;
                        match (effective, half) {
                            (Sub::Alpha, 0..=25) => content.push(b'A' + half as u8),
                            (Sub::Lower, 0..=25) => content.push(b'a' + half as u8),
                            (Sub::Alpha, 26) | (Sub::Lower, 26) => content.push(b' '),
                            (Sub::Alpha, 27) => sub = Sub::Lower,
                            (Sub::Alpha, 28) | (Sub::Lower, 28) => sub = Sub::Mixed,
                            (Sub::Alpha, 29) | (Sub::Lower, 29) | (Sub::Mixed, 29) => {
                                shift = Some(Sub::Punct)
                            }
                            (Sub::Lower, 27) => shift = Some(Sub::Alpha),
                            (Sub::Mixed, 0..=24) => content.push(TEXT_MIXED[half]),
                            (Sub::Mixed, 25) => sub = Sub::Punct,
                            (Sub::Mixed, 26) => content.push(b' '),
                            (Sub::Mixed, 27) => sub = Sub::Lower,
                            (Sub::Mixed, 28) => sub = Sub::Alpha,
                            (Sub::Punct, 0..=28) => content.push(TEXT_PUNCT[half]),
                            (Sub::Punct, 29) => sub = Sub::Alpha,
                            _ => {}
                        }
                    }
                    i += 1;
                }
                Mode::Byte => {
                    // Groups of five codewords pack six bytes in base
                    // 900; a trailing group of five or fewer under the
                    // 901 latch is single bytes.
                    let segment_end = (i..words.len())
                        .find(|&j| words[j] >= 900)
                        .unwrap_or(words.len());
                    if segment_end - i > 5 {
                        let mut value: u64 = 0;
                        for &w in &words[i..i + 5] {
                            value = value * 900 + u64::from(w);
                        }
                        let mut bytes = [0u8; 6];
                        for b in (0..6).rev() {
                            bytes[b] = (value & 0xFF) as u8;
                            value >>= 8;
                        }
                        content.append(&bytes);
                        i += 5;
                    } else {
                        content.push(words[i] as u8);
                        i += 1;
                    }
                }
                Mode::Numeric => {
                    // Up to 15 codewords in base 900 become digits with
                    // a leading sentinel 1.
                    let mut group = Vec::new();
                    while i < words.len() && words[i] < 900 && group.len() < 15 {
                        group.push(words[i]);
                        i += 1;
                    }
                    let mut value: u128 = 0;
                    for &w in &group {
                        value = value * 900 + u128::from(w);
                    }
                    let digits = value.to_string();
                    if let Some(stripped) = digits.strip_prefix('1') {
                        content.append_str(stripped);
                    }
                }
            },
        }
    }
    DecoderResult::new(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rs::reed_solomon_encode;

    /// Paint one codeword's widths into a row of module booleans.
    fn push_codeword(row: &mut Vec<bool>, widths: &[u16], start_dark: bool) {
        let mut dark = start_dark;
        for &w in widths {
            for _ in 0..w {
                row.push(dark);
            }
            dark = !dark;
        }
    }

    /// Build a symbol image from data codewords laid out in `columns`.
    fn build_symbol(data: &[u32], columns: usize, ec_count: usize) -> BitMatrix {
        let mut words = vec![0u32];
        words.extend_from_slice(data);
        // Pad so rows divide evenly.
        while (words.len() + ec_count) % columns != 0 {
            words.push(900);
        }
        words[0] = words.len() as u32;
        let full = reed_solomon_encode(gf929(), &words, ec_count);
        let rows = full.len() / columns;

        let tables = symbol_tables();
        let mut image_rows: Vec<Vec<bool>> = Vec::new();
        for r in 0..rows {
            let slot = r % 3;
            let mut row = Vec::new();
            push_codeword(&mut row, &START_PATTERN, true);
            // Left row indicator: encodes the grid row directly.
            let indicator = (r / 3) as u32 * 30;
            push_codeword(&mut row, &tables.patterns[slot][indicator as usize], true);
            for c in 0..columns {
                let word = full[r * columns + c];
                push_codeword(&mut row, &tables.patterns[slot][word as usize], true);
            }
            // Right row indicator.
            push_codeword(&mut row, &tables.patterns[slot][indicator as usize], true);
            push_codeword(&mut row, &STOP_PATTERN, true);
            image_rows.push(row);
        }

        let width = image_rows[0].len() + 8;
        // Each logical row is three pixel rows tall.
        let height = rows * 3 + 8;
        BitMatrix::from_fn(width, height, |x, y| {
            if x < 4 || y < 4 {
                return false;
            }
            let (mx, my) = (x - 4, (y - 4) / 3);
            my < rows && mx < image_rows[my].len() && image_rows[my][mx]
        })
    }

    #[test]
    fn test_cluster_arithmetic() {
        // Bars 8, 1, 1, 1: (8 - 1 + 1 - 1 + 9) mod 9.
        assert_eq!(cluster_of(&[8, 1, 1, 1, 1, 1, 1, 3]), 7);
        let tables = symbol_tables();
        for slot in 0..3 {
            assert_eq!(tables.patterns[slot].len(), 929, "cluster slot {slot}");
            // Spot-check the inverse mapping.
            for &value in &[0u32, 1, 500, 928] {
                let widths = tables.patterns[slot][value as usize];
                assert_eq!(tables.lookup[slot][&widths], value);
                assert_eq!(cluster_of(&widths), [0, 3, 6][slot]);
            }
        }
    }

    #[test]
    fn test_byte_mode_round_trip() {
        // 901 latch + raw bytes below 900... use byte pairs < 900.
        let mut data = vec![901];
        data.extend([72u32, 101, 108, 108, 111]); // "Hello"
        let matrix = build_symbol(&data, 4, 8);
        let results = read(&matrix, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::PDF417);
        assert_eq!(results[0].bytes(), b"Hello");
        assert_eq!(results[0].symbology_identifier(), "]L2");
    }

    #[test]
    fn test_text_mode_round_trip() {
        // Alpha pairs: "PDF" = P(15) D(3) F(5) + space pad.
        let data = vec![900, 15 * 30 + 3, 5 * 30 + 26];
        let matrix = build_symbol(&data, 3, 4);
        let results = read(&matrix, &ReaderOptions::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bytes(), b"PDF ");
    }

    #[test]
    fn test_corrupted_codeword_corrected() {
        let mut data = vec![901];
        data.extend([72u32, 105]); // "Hi"
        let matrix = build_symbol(&data, 3, 8);
        // Invert a patch inside the first data row.
        let mut damaged = matrix.clone();
        for x in 40..52 {
            damaged.set(x, 5, !damaged.get(x, 5));
        }
        let results = read(&damaged, &ReaderOptions::new());
        if let Some(result) = results.first() {
            assert_eq!(result.bytes(), b"Hi");
        }
    }
}
