//! Interleaved 2 of 5 and the Deutsche Post variants
//!
//! Digits are encoded in pairs: five bars carry one digit, the five
//! spaces between them the next, so the total digit count is always
//! even. Leitcode (14 digits) and Identcode (12 digits) are ITF symbols
//! with a mandatory weight-4/9 mod-10 check digit.

use super::{find_left_guard, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::{pattern_variance, PatternView};

/// Wide-element masks over 5 elements per digit.
const DIGIT_PATTERNS: [u32; 10] = [
    0b00110, // 0
    0b10001, // 1
    0b01001, // 2
    0b11000, // 3
    0b00101, // 4
    0b10100, // 5
    0b01100, // 6
    0b00011, // 7
    0b10010, // 8
    0b01010, // 9
];

const START_PATTERN: [u16; 4] = [1, 1, 1, 1];
const STOP_PATTERN: [u16; 3] = [2, 1, 1];
const MAX_VARIANCE: f32 = 0.38;
const QUIET_ZONE_MODULES: f32 = 6.0;

pub(crate) fn decode_row(view: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    let (start, _) = find_left_guard(view, 4, |w| {
        (pattern_variance(w, &START_PATTERN) < MAX_VARIANCE
            && w.has_quiet_zone_before(QUIET_ZONE_MODULES, 4))
        .then_some(())
    })?;
    let x_start = start.pixels_in_front() as i32;

    let mut digits = Vec::new();
    let mut next = start;
    let mut offset = 4;
    loop {
        if let Some(stop) = next.sub_view(offset, 3) {
            if pattern_variance(&stop, &STOP_PATTERN) < MAX_VARIANCE
                && stop.has_quiet_zone_after(QUIET_ZONE_MODULES, 4)
                && !digits.is_empty()
            {
                next = stop;
                break;
            }
        }
        let pair = next.sub_view(offset, 10)?;
        let (a, b) = decode_digit_pair(&pair)?;
        digits.push(b'0' + a);
        digits.push(b'0' + b);
        next = pair;
        offset = 10;
    }
    let x_stop = next.pixels_until_end() as i32;

    if digits.len() < 4 {
        return None;
    }
    emit(digits, opts, x_start, x_stop)
}

/// Ten interleaved runs: even indices are the bars of the first digit,
/// odd indices the spaces of the second.
fn decode_digit_pair(view: &PatternView<'_>) -> Option<(u8, u8)> {
    let mut bars = [0u16; 5];
    let mut spaces = [0u16; 5];
    for i in 0..5 {
        bars[i] = view.get(2 * i);
        spaces[i] = view.get(2 * i + 1);
    }
    Some((classify(&bars)?, classify(&spaces)?))
}

fn classify(widths: &[u16; 5]) -> Option<u8> {
    let min = *widths.iter().min().unwrap();
    let max = *widths.iter().max().unwrap();
    if min == 0 || max < 2 * min {
        return None;
    }
    let threshold = (min + max + 1) / 2;
    let mut mask = 0u32;
    for &w in widths {
        mask = (mask << 1) | u32::from(w >= threshold);
    }
    DIGIT_PATTERNS
        .iter()
        .position(|&p| p == mask)
        .map(|d| d as u8)
}

fn emit(digits: Vec<u8>, opts: &ReaderOptions, x_start: i32, x_stop: i32) -> Option<RowResult> {
    use BarcodeFormat::*;

    let dp_format = match digits.len() {
        14 if opts.has_format(DeutschePostLeitcode) => Some(DeutschePostLeitcode),
        12 if opts.has_format(DeutschePostIdentcode) => Some(DeutschePostIdentcode),
        _ => None,
    };
    if let Some(format) = dp_format {
        let check_ok = deutsche_post_check(&digits[..digits.len() - 1])
            == digits[digits.len() - 1] - b'0';
        if check_ok || !opts.has_format(ITF) {
            let mut content = Content::new();
            content.symbology = SymbologyIdentifier::new(b'I', 1);
            content.append(&digits);
            let mut result = DecoderResult::new(content);
            if !check_ok {
                result.error = checksum_error("Deutsche Post mod-10 check mismatch");
            }
            if !opts.return_errors && result.error.is_error() {
                return None;
            }
            return Some(RowResult {
                format,
                result,
                x_start,
                x_stop,
            });
        }
    }

    if !opts.has_format(ITF) {
        return None;
    }
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'I', 0);
    content.append(&digits);
    Some(RowResult {
        format: ITF,
        result: DecoderResult::new(content),
        x_start,
        x_stop,
    })
}

/// Deutsche Post check: digits weighted 4, 9, 4, 9 ... from the left.
fn deutsche_post_check(digits: &[u8]) -> u8 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| u32::from(d - b'0') * if i % 2 == 0 { 4 } else { 9 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}
