//! Stacked linear readers: Codablock F, Code 16K and Code 49
//!
//! Multi-row symbols recovered one row at a time with the Code 128
//! codeword machinery, then assembled through row indicator codewords.
//! Every row carries its own mod-103 check; the assembled symbol closes
//! with the K1/K2 pair computed mod 86 over the full codeword stream
//! (mod 49 for Code 49).

use crate::barcode::{Barcode, DecoderResult, Point, Position};
use crate::bits::BitMatrix;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::oned::code128::{best_code, CODE_PATTERNS, STOP_PATTERN};
use crate::oned::find_left_guard;
use crate::options::ReaderOptions;
use crate::pattern::{pattern_variance, PatternRow};

/// One decoded row: its y position and raw codeword values
/// (start code, indicator, data..., row check).
struct RawRow {
    y: usize,
    values: Vec<u32>,
}

/// Scan every image row for a Code 128 style codeword run.
fn scan_rows(image: &BitMatrix) -> Vec<RawRow> {
    let mut rows: Vec<RawRow> = Vec::new();
    let mut runs = PatternRow::new();
    for y in 0..image.height() {
        image.get_pattern_row(y, 0, &mut runs);
        let view = runs.view();
        let Some((start, start_code)) = find_left_guard(&view, 6, |w| {
            if !w.has_quiet_zone_before(4.0, 11) {
                return None;
            }
            best_code(w).filter(|&c| (103..=105).contains(&c))
        }) else {
            continue;
        };
        let mut values = vec![start_code];
        let mut next = start;
        loop {
            if let Some(stop) = next.sub_view(6, 7) {
                if pattern_variance(&stop, &STOP_PATTERN) < 0.25 {
                    break;
                }
            }
            next = match next.sub_view(6, 6) {
                Some(v) => v,
                None => {
                    values.clear();
                    break;
                }
            };
            match best_code(&next) {
                Some(v) => values.push(v),
                None => {
                    values.clear();
                    break;
                }
            }
        }
        if values.len() >= 4 {
            rows.push(RawRow { y, values });
        }
    }
    rows
}

/// Collapse vertically repeated sightings of the same row.
fn collapse(rows: Vec<RawRow>) -> Vec<RawRow> {
    let mut out: Vec<RawRow> = Vec::new();
    for row in rows {
        if let Some(last) = out.last() {
            if last.values == row.values {
                continue;
            }
        }
        out.push(row);
    }
    out
}

/// Per-row mod-103 check over start + indicator + data.
fn row_check_ok(values: &[u32]) -> bool {
    let n = values.len();
    let mut checksum = values[0];
    for (i, &v) in values[1..n - 1].iter().enumerate() {
        checksum = (checksum + (i as u32 + 1) * v) % 103;
    }
    checksum == values[n - 1]
}

pub(crate) fn read(image: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    use BarcodeFormat::*;
    if ![CodablockF, Code16K, Code49].iter().any(|&f| opts.has_format(f)) {
        return Vec::new();
    }
    let rows = collapse(scan_rows(image));
    if rows.len() < 2 {
        return Vec::new();
    }
    // Row indicators: the first row's indicator codeword is 32 + total
    // row count, subsequent rows carry 32 + row number.
    let total = match rows[0].values.get(1) {
        Some(&v) if v >= 32 && ((v - 32) as usize) == rows.len() => rows.len(),
        _ => return Vec::new(),
    };
    let mut data: Vec<u32> = Vec::new();
    let mut checks_ok = true;
    for (number, row) in rows.iter().enumerate() {
        checks_ok &= row_check_ok(&row.values);
        if number > 0 && row.values.get(1) != Some(&(32 + number as u32)) {
            return Vec::new();
        }
        data.extend(&row.values[2..row.values.len() - 1]);
    }
    if data.len() < 3 {
        return Vec::new();
    }

    // Global K1/K2 close the symbol; their modulus separates the
    // Code 128 based formats from Code 49.
    let (format, modulus) = if opts.has_format(CodablockF) {
        (CodablockF, 86)
    } else if opts.has_format(Code16K) {
        (Code16K, 86)
    } else {
        (Code49, 49)
    };
    let k2 = data.pop().unwrap_or(0);
    let k1 = data.pop().unwrap_or(0);
    let (e1, e2) = global_checks(&data, modulus);
    let global_ok = k1 == e1 && k2 == e2;

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(
        match format {
            Code16K => b'K',
            Code49 => b'T',
            _ => b'O',
        },
        0,
    );
    // Data codewords decode through the Code 128 set B mapping.
    for &v in &data {
        match v {
            0..=95 => content.push(32 + v as u8),
            102 => content.push(0x1D),
            _ => {}
        }
    }
    let mut result = DecoderResult::new(content);
    result.line_count = total as i32;
    if !(checks_ok && global_ok) {
        result.error = checksum_error("stacked symbol check failure");
    }
    if result.error.is_error() && !opts.return_errors {
        return Vec::new();
    }
    let position = Position::new(
        Point::new(0, rows[0].y as i32),
        Point::new(image.width() as i32, rows[0].y as i32),
        Point::new(image.width() as i32, rows[rows.len() - 1].y as i32),
        Point::new(0, rows[rows.len() - 1].y as i32),
    );
    vec![Barcode::new(format, result, position)]
}

/// K1 and K2: position-weighted sums over the data codewords.
fn global_checks(data: &[u32], modulus: u32) -> (u32, u32) {
    let mut k1 = 0u32;
    let mut k2 = 0u32;
    for (i, &v) in data.iter().enumerate() {
        k1 = (k1 + (i as u32 + 1) * v) % modulus;
        k2 = (k2 + (i as u32 + 2) * v) % modulus;
    }
    (k1, k2)
}
