//! EAN-13, EAN-8, UPC-A and UPC-E, plus the EAN-2/EAN-5 add-ons
//!
//! One reader covers the whole retail family; the variants share digit
//! patterns and differ in guard structure and parity use. UPC-A is an
//! EAN-13 with leading zero, reported as its own format when requested.
//! Add-on symbols to the right of the main code are handled according to
//! the `ean_addon` option.

use super::{find_left_guard, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::format::BarcodeFormat;
use crate::options::{EanAddOnSymbol, ReaderOptions};
use crate::pattern::{pattern_variance, PatternView};

/// L-code element widths per digit; R codes share the widths (bar-first
/// instead of space-first) and G codes are the reverse.
const L_PATTERNS: [[u16; 4]; 10] = [
    [3, 2, 1, 1], [2, 2, 2, 1], [2, 1, 2, 2], [1, 4, 1, 1], [1, 1, 3, 2],
    [1, 2, 3, 1], [1, 1, 1, 4], [1, 3, 1, 2], [1, 2, 1, 3], [3, 1, 1, 2],
];

/// EAN-13 first digit from the parity (bit set = G) of the left half.
const FIRST_DIGIT_PARITIES: [u32; 10] = [
    0b000000, 0b001011, 0b001101, 0b001110, 0b010011,
    0b011001, 0b011100, 0b010101, 0b010110, 0b011010,
];

/// UPC-E parity patterns for number system 0, indexed by check digit
/// (bit set = G); number system 1 uses the complement.
const UPCE_PARITIES: [u32; 10] = [
    0b111000, 0b110100, 0b110010, 0b110001, 0b101100,
    0b100110, 0b100011, 0b101010, 0b101001, 0b100101,
];

/// EAN-5 add-on parity (bit set = G), indexed by the mod-10 check.
const EAN5_PARITIES: [u32; 10] = [
    0b11000, 0b10100, 0b10010, 0b10001, 0b01100,
    0b00110, 0b00011, 0b01010, 0b01001, 0b00101,
];

const START_GUARD: [u16; 3] = [1, 1, 1];
const MIDDLE_GUARD: [u16; 5] = [1, 1, 1, 1, 1];
const UPCE_END_GUARD: [u16; 6] = [1, 1, 1, 1, 1, 1];
const ADDON_GUARD: [u16; 3] = [1, 1, 2];
const ADDON_DELIMITER: [u16; 2] = [1, 1];

const MAX_VARIANCE: f32 = 0.35;
const MAX_GUARD_VARIANCE: f32 = 0.4;

/// Decode one 4-run digit window. Returns (digit, used G code).
fn decode_digit(view: &PatternView<'_>) -> Option<(u8, bool)> {
    let mut best = MAX_VARIANCE;
    let mut winner = None;
    let mut reversed = [0u16; 4];
    for (digit, widths) in L_PATTERNS.iter().enumerate() {
        let v = pattern_variance(view, widths);
        if v < best {
            best = v;
            winner = Some((digit as u8, false));
        }
        for i in 0..4 {
            reversed[i] = widths[3 - i];
        }
        let v = pattern_variance(view, &reversed);
        if v < best {
            best = v;
            winner = Some((digit as u8, true));
        }
    }
    winner
}

fn guard_matches(view: &PatternView<'_>, weights: &[u16]) -> bool {
    pattern_variance(view, weights) < MAX_GUARD_VARIANCE
}

fn check_digit_valid(digits: &[u8]) -> bool {
    let sum: u32 = digits[..digits.len() - 1]
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| u32::from(d - b'0') * if i % 2 == 0 { 3 } else { 1 })
        .sum();
    ((10 - sum % 10) % 10) as u8 == digits[digits.len() - 1] - b'0'
}

pub(crate) fn decode_row(view: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    let (start, _) = find_left_guard(view, 3, |w| {
        (guard_matches(w, &START_GUARD) && w.has_quiet_zone_before(6.0, 3)).then_some(())
    })?;

    decode_ean13(&start, opts)
        .or_else(|| decode_ean8(&start, opts))
        .or_else(|| decode_upce(&start, opts))
}

fn decode_ean13(start: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    use BarcodeFormat::*;
    if !(opts.has_format(EAN13) || opts.has_format(UPCA)) {
        return None;
    }
    let mut digits = vec![0u8];
    let mut parity = 0u32;
    let mut pos = 3;
    for _ in 0..6 {
        let window = start.sub_view(pos, 4)?;
        let (digit, g) = decode_digit(&window)?;
        digits.push(b'0' + digit);
        parity = parity << 1 | u32::from(g);
        pos += 4;
    }
    let middle = start.sub_view(pos, 5)?;
    if !guard_matches(&middle, &MIDDLE_GUARD) {
        return None;
    }
    pos += 5;
    for _ in 0..6 {
        let window = start.sub_view(pos, 4)?;
        let (digit, g) = decode_digit(&window)?;
        if g {
            return None;
        }
        digits.push(b'0' + digit);
        pos += 4;
    }
    let end = start.sub_view(pos, 3)?;
    if !guard_matches(&end, &START_GUARD) || !end.has_quiet_zone_after(6.0, 3) {
        return None;
    }

    let first = FIRST_DIGIT_PARITIES.iter().position(|&p| p == parity)? as u8;
    digits[0] = b'0' + first;
    if !check_digit_valid(&digits) {
        return None;
    }

    let upca = first == 0 && opts.has_format(UPCA);
    if !upca && !opts.has_format(EAN13) {
        return None;
    }
    let text: Vec<u8> = if upca {
        digits[1..].to_vec()
    } else {
        digits.clone()
    };
    finish(
        if upca { UPCA } else { EAN13 },
        text,
        start,
        &end,
        opts,
        0,
    )
}

fn decode_ean8(start: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    if !opts.has_format(BarcodeFormat::EAN8) {
        return None;
    }
    let mut digits = Vec::with_capacity(8);
    let mut pos = 3;
    for _ in 0..4 {
        let window = start.sub_view(pos, 4)?;
        let (digit, g) = decode_digit(&window)?;
        if g {
            return None;
        }
        digits.push(b'0' + digit);
        pos += 4;
    }
    let middle = start.sub_view(pos, 5)?;
    if !guard_matches(&middle, &MIDDLE_GUARD) {
        return None;
    }
    pos += 5;
    for _ in 0..4 {
        let window = start.sub_view(pos, 4)?;
        let (digit, g) = decode_digit(&window)?;
        if g {
            return None;
        }
        digits.push(b'0' + digit);
        pos += 4;
    }
    let end = start.sub_view(pos, 3)?;
    if !guard_matches(&end, &START_GUARD) || !end.has_quiet_zone_after(6.0, 3) {
        return None;
    }
    if !check_digit_valid(&digits) {
        return None;
    }
    finish(BarcodeFormat::EAN8, digits, start, &end, opts, 4)
}

fn decode_upce(start: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    if !opts.has_format(BarcodeFormat::UPCE) {
        return None;
    }
    let mut digits = Vec::with_capacity(6);
    let mut parity = 0u32;
    let mut pos = 3;
    for _ in 0..6 {
        let window = start.sub_view(pos, 4)?;
        let (digit, g) = decode_digit(&window)?;
        digits.push(digit);
        parity = parity << 1 | u32::from(g);
        pos += 4;
    }
    let end = start.sub_view(pos, 6)?;
    if !guard_matches(&end, &UPCE_END_GUARD) || !end.has_quiet_zone_after(6.0, 6) {
        return None;
    }

    // The parity pattern carries the number system and the check digit.
    let (number_system, check) = UPCE_PARITIES
        .iter()
        .position(|&p| p == parity)
        .map(|check| (0u8, check as u8))
        .or_else(|| {
            UPCE_PARITIES
                .iter()
                .position(|&p| p == parity ^ 0b111111)
                .map(|check| (1u8, check as u8))
        })?;

    let mut upca = upce_to_upca(number_system, &digits);
    upca.push(b'0' + check);
    if !check_digit_valid(&upca) {
        return None;
    }

    let mut text = vec![b'0' + number_system];
    text.extend(digits.iter().map(|&d| b'0' + d));
    text.push(b'0' + check);
    finish(BarcodeFormat::UPCE, text, start, &end, opts, 0)
}

/// Expand the six UPC-E digits to the 11 UPC-A data digits.
fn upce_to_upca(number_system: u8, d: &[u8]) -> Vec<u8> {
    let mut out = vec![number_system];
    match d[5] {
        0..=2 => {
            out.extend_from_slice(&[d[0], d[1], d[5], 0, 0, 0, 0, d[2], d[3], d[4]]);
        }
        3 => {
            out.extend_from_slice(&[d[0], d[1], d[2], 0, 0, 0, 0, 0, d[3], d[4]]);
        }
        4 => {
            out.extend_from_slice(&[d[0], d[1], d[2], d[3], 0, 0, 0, 0, 0, d[4]]);
        }
        _ => {
            out.extend_from_slice(&[d[0], d[1], d[2], d[3], d[4], 0, 0, 0, 0, d[5]]);
        }
    }
    out.iter().map(|&d| b'0' + d).collect()
}

fn finish(
    format: BarcodeFormat,
    mut text: Vec<u8>,
    start: &PatternView<'_>,
    end: &PatternView<'_>,
    opts: &ReaderOptions,
    base_modifier: u8,
) -> Option<RowResult> {
    let mut modifier = base_modifier;
    let mut x_stop = end.pixels_until_end() as i32;

    match opts.ean_addon {
        EanAddOnSymbol::Ignore => {}
        policy => {
            let addon = decode_addon(end);
            match (&addon, policy) {
                (None, EanAddOnSymbol::Require) => return None,
                (Some((digits, addon_end)), _) => {
                    text.push(b' ');
                    text.extend_from_slice(digits);
                    modifier = 3;
                    x_stop = *addon_end;
                }
                (None, _) => {}
            }
        }
    }

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'E', modifier);
    content.append(&text);
    Some(RowResult {
        format,
        result: DecoderResult::new(content),
        x_start: start.pixels_in_front() as i32,
        x_stop,
    })
}

/// EAN-2 / EAN-5 add-on right of the main symbol, separated by a small
/// quiet zone.
fn decode_addon(end: &PatternView<'_>) -> Option<(Vec<u8>, i32)> {
    // Add-on guard starts 7..12 modules after the main symbol.
    let guard = end.sub_view(end.len() + 1, 3)?;
    if !guard_matches(&guard, &ADDON_GUARD) || guard.space_in_front() < 4 {
        return None;
    }
    let mut digits = Vec::new();
    let mut parity = 0u32;
    let mut pos = 3;
    let mut last_end = guard.pixels_until_end() as i32;
    for i in 0..5 {
        let Some(window) = guard.sub_view(pos, 4) else {
            break;
        };
        let Some((digit, g)) = decode_digit(&window) else {
            break;
        };
        digits.push(b'0' + digit);
        parity = parity << 1 | u32::from(g);
        last_end = window.pixels_until_end() as i32;
        pos += 4;
        if i == 4 {
            break;
        }
        // Delimiter between add-on digits.
        match guard.sub_view(pos, 2) {
            Some(delim) if guard_matches(&delim, &ADDON_DELIMITER) => pos += 2,
            _ => break,
        }
    }
    match digits.len() {
        2 => {
            let value = (digits[0] - b'0') * 10 + (digits[1] - b'0');
            (u32::from(value % 4) == parity).then_some((digits, last_end))
        }
        5 => {
            let sum: u32 = digits
                .iter()
                .enumerate()
                .map(|(i, &d)| u32::from(d - b'0') * if i % 2 == 0 { 3 } else { 9 })
                .sum();
            (EAN5_PARITIES[(sum % 10) as usize] == parity).then_some((digits, last_end))
        }
        _ => None,
    }
}
