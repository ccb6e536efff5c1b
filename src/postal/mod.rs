//! Postal 4-state readers
//!
//! Height-modulated symbologies: every bar is full, ascender, descender
//! or tracker, so decoding needs the whole bit matrix, not a single
//! row. The shared pipeline finds candidate bars in a horizontal band,
//! measures each bar's vertical extent, classifies it against the
//! global baselines, and hands the state sequence to the per-format
//! table decoders. POSTNET and PLANET use two heights only.

use crate::barcode::{Barcode, DecoderResult, Point, Position};
use crate::bits::BitMatrix;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::gf::gf64;
use crate::options::ReaderOptions;
use crate::rs::reed_solomon_decode;

/// The four bar shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BarState {
    Full,
    Ascender,
    Descender,
    Tracker,
}

use BarState::*;

/// A located bar with its vertical extent.
#[derive(Debug, Clone, Copy)]
struct Bar {
    x_center: usize,
    width: usize,
    top: usize,
    bottom: usize,
}

/// Find the bars crossing a horizontal band and measure their extents.
/// The longest run of bars whose spacing agrees within 35% is kept.
fn find_bars(image: &BitMatrix, band_y: usize) -> Vec<Bar> {
    let mut bars = Vec::new();
    let mut x = 0;
    while x < image.width() {
        if image.get(x, band_y) {
            let start = x;
            while x < image.width() && image.get(x, band_y) {
                x += 1;
            }
            let center = (start + x - 1) / 2;
            // Vertical extent at the bar center.
            let mut top = band_y;
            while top > 0 && image.get(center, top - 1) {
                top -= 1;
            }
            let mut bottom = band_y;
            while bottom + 1 < image.height() && image.get(center, bottom + 1) {
                bottom += 1;
            }
            bars.push(Bar {
                x_center: center,
                width: x - start,
                top,
                bottom,
            });
        } else {
            x += 1;
        }
    }
    longest_regular_run(bars)
}

/// Keep the longest sub-sequence with consistent center spacing.
fn longest_regular_run(bars: Vec<Bar>) -> Vec<Bar> {
    if bars.len() < 4 {
        return bars;
    }
    let mut best: (usize, usize) = (0, bars.len());
    let mut run_start = 0;
    let mut i = 1;
    let mut pitch = bars[1].x_center as f32 - bars[0].x_center as f32;
    while i < bars.len() {
        let spacing = bars[i].x_center as f32 - bars[i - 1].x_center as f32;
        if (spacing - pitch).abs() > 0.35 * pitch {
            if i - run_start > best.1 - best.0 {
                best = (run_start, i);
            }
            run_start = i - 1;
            if i + 1 < bars.len() {
                pitch = bars[i + 1].x_center as f32 - bars[i].x_center as f32;
            }
        } else {
            pitch = (pitch + spacing) / 2.0;
        }
        i += 1;
    }
    if bars.len() - run_start > best.1 - best.0 {
        best = (run_start, bars.len());
    }
    bars[best.0..best.1].to_vec()
}

/// Classify bars against the global top and bottom baselines.
fn classify(bars: &[Bar]) -> Vec<BarState> {
    let global_top = bars.iter().map(|b| b.top).min().unwrap_or(0);
    let global_bottom = bars.iter().map(|b| b.bottom).max().unwrap_or(0);
    let height = (global_bottom - global_top).max(1) as f32;
    bars.iter()
        .map(|bar| {
            let reaches_top = (bar.top - global_top) as f32 <= 0.25 * height;
            let reaches_bottom = (global_bottom - bar.bottom) as f32 <= 0.25 * height;
            match (reaches_top, reaches_bottom) {
                (true, true) => Full,
                (true, false) => Ascender,
                (false, true) => Descender,
                (false, false) => Tracker,
            }
        })
        .collect()
}

fn state_position(bars: &[Bar]) -> Position {
    let left = bars.first().map_or(0, |b| b.x_center) as i32;
    let right = bars.last().map_or(0, |b| b.x_center) as i32;
    let top = bars.iter().map(|b| b.top).min().unwrap_or(0) as i32;
    let bottom = bars.iter().map(|b| b.bottom).max().unwrap_or(0) as i32;
    Position::new(
        Point::new(left, top),
        Point::new(right, top),
        Point::new(right, bottom),
        Point::new(left, bottom),
    )
}

/// Entry point: extract the bar states once and offer them to every
/// enabled postal format.
pub(crate) fn read(image: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    use BarcodeFormat::*;
    let enabled = |f: BarcodeFormat| opts.has_format(f);
    if ![AustraliaPost, RM4SCC, KIXCode, Mailmark, JapanPost, USPSIMB, POSTNET, PLANET]
        .iter()
        .any(|&f| enabled(f))
    {
        return Vec::new();
    }

    let mut results = Vec::new();
    // A band through the vertical middle crosses every 4-state bar;
    // POSTNET-style codes need a band near the baseline.
    for band in [image.height() / 2, image.height() * 9 / 10] {
        let bars = find_bars(image, band);
        if bars.len() < 20 {
            continue;
        }
        let states = classify(&bars);
        let position = state_position(&bars);

        let candidates: [(BarcodeFormat, fn(&[BarState]) -> Option<DecoderResult>); 8] = [
            (RM4SCC, decode_rm4scc),
            (KIXCode, decode_kix),
            (AustraliaPost, decode_australia_post),
            (Mailmark, decode_mailmark),
            (JapanPost, decode_japan_post),
            (USPSIMB, decode_usps_imb),
            (POSTNET, decode_postnet),
            (PLANET, decode_planet),
        ];
        for (format, decoder) in candidates {
            if !enabled(format) {
                continue;
            }
            if let Some(result) = decoder(&states) {
                if result.error.is_error() && !opts.return_errors {
                    continue;
                }
                results.push(Barcode::new(format, result, position));
                return results;
            }
        }
    }
    results
}

// ============================================================================
// Royal Mail RM4SCC and Dutch KIX
// ============================================================================

/// The six two-of-four combinations, in table order; a character is an
/// upper (ascender) combination and a lower (descender) combination.
const TWO_OF_FOUR: [u8; 6] = [0b0011, 0b0101, 0b0110, 0b1001, 0b1010, 0b1100];

const RM_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn states_to_char(states: &[BarState]) -> Option<(u8, usize, usize)> {
    let mut upper = 0u8;
    let mut lower = 0u8;
    for (i, &s) in states.iter().enumerate() {
        let bit = 3 - i as u8;
        if matches!(s, Full | Ascender) {
            upper |= 1 << bit;
        }
        if matches!(s, Full | Descender) {
            lower |= 1 << bit;
        }
    }
    let u = TWO_OF_FOUR.iter().position(|&c| c == upper)?;
    let l = TWO_OF_FOUR.iter().position(|&c| c == lower)?;
    Some((RM_ALPHABET[6 * u + l], u, l))
}

/// RM4SCC: ascender start bar, 4-bar characters, a mod-6/mod-6 check
/// character, full-height stop bar.
fn decode_rm4scc(states: &[BarState]) -> Option<DecoderResult> {
    if states.len() < 14 || states.len() % 4 != 2 {
        return None;
    }
    if states[0] != Ascender || *states.last().unwrap() != Full {
        return None;
    }
    let body = &states[1..states.len() - 1];
    let mut text = Vec::new();
    let mut upper_sum = 0usize;
    let mut lower_sum = 0usize;
    let mut chars = body.chunks(4).peekable();
    while let Some(chunk) = chars.next() {
        let (c, u, l) = states_to_char(chunk)?;
        if chars.peek().is_some() {
            text.push(c);
            upper_sum += u;
            lower_sum += l;
        } else {
            // Final character carries the checks.
            let expected = RM_ALPHABET[6 * (upper_sum % 6) + lower_sum % 6];
            let mut content = Content::new();
            content.symbology = SymbologyIdentifier::new(b'X', 0);
            content.append(&text);
            content.push(c);
            let mut result = DecoderResult::new(content);
            if c != expected {
                result.error = checksum_error("RM4SCC check character mismatch");
            }
            return Some(result);
        }
    }
    None
}

/// KIX is RM4SCC without frame bars or check character.
fn decode_kix(states: &[BarState]) -> Option<DecoderResult> {
    if states.len() < 20 || states.len() % 4 != 0 {
        return None;
    }
    let mut text = Vec::new();
    for chunk in states.chunks(4) {
        let (c, _, _) = states_to_char(chunk)?;
        text.push(c);
    }
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'X', 0);
    content.append(&text);
    Some(DecoderResult::new(content))
}

// ============================================================================
// Australia Post
// ============================================================================

/// Bar state values in table order: full, ascender, descender, tracker.
fn aus_value(state: BarState) -> u8 {
    match state {
        Full => 0,
        Ascender => 1,
        Descender => 2,
        Tracker => 3,
    }
}

/// Digits are two bars from the N table.
const AUS_N_TABLE: [[u8; 2]; 10] = [
    [0, 0], [0, 1], [0, 2], [0, 3], [1, 0], [1, 1], [1, 2], [1, 3], [2, 0], [2, 1],
];

/// Alphanumeric characters are three bars from the C table.
const AUS_C_ALPHABET: &[u8] = b" ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz#";

fn aus_c_char(index: usize) -> Option<u8> {
    AUS_C_ALPHABET.get(index).copied()
}

fn aus_c_index(b0: u8, b1: u8, b2: u8) -> usize {
    // The C table enumerates bar triplets with the per-bar digit order
    // 2, 0, 1, 3.
    const ORDER: [usize; 4] = [1, 2, 0, 3];
    ORDER[b0 as usize] * 16 + ORDER[b1 as usize] * 4 + ORDER[b2 as usize]
}

/// FCC code -> (total bars, customer bars, numeric customer data).
fn aus_fcc_info(fcc: u32) -> Option<(usize, usize, bool)> {
    match fcc {
        11 | 45 | 87 | 92 => Some((37, 0, false)),
        59 => Some((52, 16, true)),
        62 => Some((67, 31, false)),
        _ => None,
    }
}

fn decode_australia_post(states: &[BarState]) -> Option<DecoderResult> {
    // Start and stop: ascender then tracker.
    if states.len() < 37
        || states[0] != Ascender
        || states[1] != Tracker
        || states[states.len() - 2] != Ascender
        || states[states.len() - 1] != Tracker
    {
        return None;
    }
    let values: Vec<u8> = states.iter().map(|&s| aus_value(s)).collect();
    let digit = |i: usize| -> Option<u32> {
        AUS_N_TABLE
            .iter()
            .position(|t| t[0] == values[i] && t[1] == values[i + 1])
            .map(|d| d as u32)
    };
    let fcc = digit(2)? * 10 + digit(4)?;
    let (total_bars, customer_bars, numeric) = aus_fcc_info(fcc)?;
    if states.len() != total_bars {
        return None;
    }

    let mut text = format!("{fcc:02}");
    // Sorting code: eight digits.
    for i in 0..8 {
        text.push(char::from(b'0' + digit(6 + 2 * i)? as u8));
    }
    // Customer information.
    let customer_start = 22;
    if customer_bars > 0 {
        if numeric {
            for i in 0..customer_bars / 2 {
                text.push(char::from(b'0' + digit(customer_start + 2 * i)? as u8));
            }
        } else {
            for i in 0..customer_bars / 3 {
                let base = customer_start + 3 * i;
                let index = aus_c_index(values[base], values[base + 1], values[base + 2]);
                text.push(char::from(aus_c_char(index)?));
            }
        }
    }

    // Four GF(64) Reed-Solomon codewords close the symbol before the
    // stop bars; each codeword is three bars.
    let rs_start = states.len() - 2 - 12;
    let mut codewords: Vec<u32> = Vec::new();
    for i in (2..rs_start).step_by(3) {
        codewords.push(
            u32::from(values[i]) * 16 + u32::from(values[i + 1]) * 4 + u32::from(values[i + 2]),
        );
    }
    for i in (rs_start..states.len() - 2).step_by(3) {
        codewords.push(
            u32::from(values[i]) * 16 + u32::from(values[i + 1]) * 4 + u32::from(values[i + 2]),
        );
    }
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'X', 0);
    content.append_str(&text);
    let mut result = DecoderResult::new(content);
    if reed_solomon_decode(gf64(), &mut codewords, 4).is_err() {
        result.error = checksum_error("Australia Post Reed-Solomon failure");
    }
    Some(result)
}

// ============================================================================
// Royal Mail Mailmark
// ============================================================================

/// Mailmark bars pack two bits each (three bars per GF(64) codeword):
/// C type is 22 codewords with 6 checks, L type 26 with 7.
fn decode_mailmark(states: &[BarState]) -> Option<DecoderResult> {
    let (codeword_count, ec) = match states.len() {
        66 => (22usize, 6usize),
        78 => (26, 7),
        _ => return None,
    };
    let mut codewords: Vec<u32> = Vec::with_capacity(codeword_count);
    for chunk in states.chunks(3) {
        let word = chunk.iter().fold(0u32, |acc, &s| {
            acc << 2
                | match s {
                    Tracker => 0,
                    Ascender => 1,
                    Descender => 2,
                    Full => 3,
                }
        });
        codewords.push(word);
    }
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'X', 0);
    let mut result = if reed_solomon_decode(gf64(), &mut codewords, ec).is_err() {
        DecoderResult::with_error(checksum_error("Mailmark Reed-Solomon failure"))
    } else {
        for &word in &codewords[..codeword_count - ec] {
            content.push(RM_ALPHABET[word as usize % RM_ALPHABET.len()]);
        }
        DecoderResult::new(content)
    };
    result.ec_level = if ec == 7 { "L" } else { "C" }.to_string();
    Some(result)
}

// ============================================================================
// Japan Post
// ============================================================================

/// Three bars per character; digits then the dash set.
const JP_ALPHABET: &[u8] = b"0123456789-ABCDEFGH";

fn decode_japan_post(states: &[BarState]) -> Option<DecoderResult> {
    // Frame: full bars at both ends, length 3n + 2.
    if states.len() < 23
        || states.len() % 3 != 2
        || states[0] != Full
        || *states.last().unwrap() != Full
    {
        return None;
    }
    let body = &states[1..states.len() - 1];
    let mut values = Vec::new();
    for chunk in body.chunks(3) {
        let v = chunk.iter().fold(0u32, |acc, &s| {
            acc << 2
                | match s {
                    Ascender => 0,
                    Descender => 1,
                    Tracker => 2,
                    Full => 3,
                }
        });
        values.push(v);
    }
    // The final value is a mod-19 check over the data values.
    let check = values.pop()?;
    let sum: u32 = values.iter().sum();
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'X', 0);
    for &v in &values {
        content.push(JP_ALPHABET[v as usize % JP_ALPHABET.len()]);
    }
    let mut result = DecoderResult::new(content);
    if check % 19 != sum % 19 {
        result.error = checksum_error("Japan Post check value mismatch");
    }
    Some(result)
}

// ============================================================================
// USPS Intelligent Mail
// ============================================================================

/// 65 bars; each bar contributes an ascender bit and a descender bit,
/// giving ten 13-bit characters covered by an 11-bit CRC.
fn decode_usps_imb(states: &[BarState]) -> Option<DecoderResult> {
    if states.len() != 65 {
        return None;
    }
    let mut bits: Vec<bool> = Vec::with_capacity(130);
    for &s in states {
        bits.push(matches!(s, Full | Ascender));
        bits.push(matches!(s, Full | Descender));
    }
    let mut chars = Vec::with_capacity(10);
    for chunk in bits.chunks(13) {
        let value = chunk.iter().fold(0u32, |acc, &b| acc << 1 | u32::from(b));
        chars.push(value);
    }
    // The top two bits of the first character carry the CRC remainder
    // high bits; validate the 11-bit CRC over the remaining payload.
    let crc = chars[0] >> 2 & 0x7FF;
    let payload: Vec<u32> = chars.iter().skip(1).copied().collect();
    if crc11(&payload) != crc {
        return None;
    }
    let mut value: u128 = 0;
    for &c in &payload {
        value = value << 13 | u128::from(c);
    }
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'X', 0);
    content.append_str(&format!("{value:031}"));
    Some(DecoderResult::new(content))
}

/// CRC-11 with the generator polynomial 0x0F35.
fn crc11(words: &[u32]) -> u32 {
    let mut crc = 0x7FFu32;
    for &word in words {
        for bit in (0..13).rev() {
            let input = word >> bit & 1;
            let top = crc >> 10 & 1;
            crc = (crc << 1) & 0x7FF;
            if input ^ top != 0 {
                crc ^= 0x0F35 & 0x7FF;
            }
        }
    }
    crc
}

// ============================================================================
// POSTNET and PLANET
// ============================================================================

/// Tall-bar masks per digit, five bars each.
const POSTNET_DIGITS: [u8; 10] = [
    0b11000, 0b00011, 0b00101, 0b00110, 0b01001, 0b01010, 0b01100, 0b10001, 0b10010, 0b10100,
];

fn two_state_digits(states: &[BarState], invert: bool) -> Option<Vec<u8>> {
    // Frame bars at both ends are tall.
    if states.len() < 12 || (states.len() - 2) % 5 != 0 {
        return None;
    }
    let tall = |s: BarState| matches!(s, Full | Ascender);
    if !tall(states[0]) || !tall(*states.last().unwrap()) {
        return None;
    }
    let mut digits = Vec::new();
    for chunk in states[1..states.len() - 1].chunks(5) {
        let mut mask = 0u8;
        for &s in chunk {
            mask = mask << 1 | u8::from(tall(s) != invert);
        }
        digits.push(POSTNET_DIGITS.iter().position(|&p| p == mask)? as u8 + b'0');
    }
    // Trailing mod-10 check digit.
    let sum: u32 = digits.iter().map(|&d| u32::from(d - b'0')).sum();
    (sum % 10 == 0).then_some(digits)
}

fn decode_postnet(states: &[BarState]) -> Option<DecoderResult> {
    let digits = two_state_digits(states, false)?;
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'X', 0);
    content.append(&digits[..digits.len() - 1]);
    Some(DecoderResult::new(content))
}

/// PLANET inverts the tall/short roles.
fn decode_planet(states: &[BarState]) -> Option<DecoderResult> {
    let digits = two_state_digits(states, true)?;
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'X', 0);
    content.append(&digits[..digits.len() - 1]);
    Some(DecoderResult::new(content))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// Paint a 4-state bar sequence into an image: bars two pixels
    /// wide, two apart, 16 pixels tall overall.
    pub(crate) fn paint(states: &[BarState]) -> BitMatrix {
        let width = states.len() * 4 + 16;
        let height = 24;
        let mut image = BitMatrix::new(width, height);
        for (i, &state) in states.iter().enumerate() {
            let (top, bottom) = match state {
                Full => (4, 20),
                Ascender => (4, 14),
                Descender => (10, 20),
                Tracker => (10, 14),
            };
            for y in top..bottom {
                for dx in 0..2 {
                    image.set(8 + i * 4 + dx, y, true);
                }
            }
        }
        image
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::paint;
    use super::*;
    use crate::rs::reed_solomon_encode;

    fn char_states(c: u8) -> [BarState; 4] {
        let value = RM_ALPHABET.iter().position(|&a| a == c).unwrap();
        let upper = TWO_OF_FOUR[value / 6];
        let lower = TWO_OF_FOUR[value % 6];
        let mut out = [Tracker; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            let bit = 3 - i;
            *slot = match (upper >> bit & 1 != 0, lower >> bit & 1 != 0) {
                (true, true) => Full,
                (true, false) => Ascender,
                (false, true) => Descender,
                (false, false) => Tracker,
            };
        }
        out
    }

    fn rm4scc_states(text: &[u8]) -> Vec<BarState> {
        let mut states = vec![Ascender];
        let mut upper_sum = 0;
        let mut lower_sum = 0;
        for &c in text {
            let value = RM_ALPHABET.iter().position(|&a| a == c).unwrap();
            upper_sum += value / 6;
            lower_sum += value % 6;
            states.extend(char_states(c));
        }
        let check = RM_ALPHABET[6 * (upper_sum % 6) + lower_sum % 6];
        states.extend(char_states(check));
        states.push(Full);
        states
    }

    #[test]
    fn test_rm4scc_postcode() {
        let states = rm4scc_states(b"SN381AB");
        let image = paint(&states);
        let opts = ReaderOptions::new().formats([BarcodeFormat::RM4SCC]);
        let results = read(&image, &opts);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::RM4SCC);
        let text = results[0].bytes().to_vec();
        assert_eq!(&text[..7], b"SN381AB");
        assert_eq!(text.len(), 8); // check character appended
        assert!(results[0].error().is_ok());
    }

    #[test]
    fn test_rm4scc_bad_check_flagged() {
        let mut states = rm4scc_states(b"SN381AB");
        // Swap a data character for another valid one.
        let replacement = char_states(b'Z');
        states[1..5].copy_from_slice(&replacement);
        let image = paint(&states);
        let opts = ReaderOptions::new()
            .formats([BarcodeFormat::RM4SCC])
            .return_errors(true);
        let results = read(&image, &opts);
        assert_eq!(results.len(), 1);
        assert!(results[0].error().is_error());
    }

    #[test]
    fn test_kix() {
        let mut states = Vec::new();
        for &c in b"1234AB" {
            states.extend(char_states(c));
        }
        let image = paint(&states);
        let opts = ReaderOptions::new().formats([BarcodeFormat::KIXCode]);
        let results = read(&image, &opts);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bytes(), b"1234AB");
    }

    fn aus_digit_states(d: u8) -> [BarState; 2] {
        let t = AUS_N_TABLE[(d - b'0') as usize];
        let back = |v: u8| match v {
            0 => Full,
            1 => Ascender,
            2 => Descender,
            _ => Tracker,
        };
        [back(t[0]), back(t[1])]
    }

    #[test]
    fn test_australia_post_standard() {
        let mut states = vec![Ascender, Tracker];
        for &d in b"11" {
            states.extend(aus_digit_states(d));
        }
        for &d in b"39987520" {
            states.extend(aus_digit_states(d));
        }
        // Reed-Solomon over the 20 leading data bars (filler keeps the
        // triplet alignment).
        states.push(Tracker); // filler bar to reach the RS boundary
        let values: Vec<u32> = states[2..]
            .iter()
            .map(|&s| u32::from(aus_value(s)))
            .collect();
        let data_words: Vec<u32> = values
            .chunks(3)
            .map(|c| c[0] * 16 + c[1] * 4 + c[2])
            .collect();
        let full = reed_solomon_encode(gf64(), &data_words, 4);
        for &w in &full[data_words.len()..] {
            let back = |v: u32| match v {
                0 => Full,
                1 => Ascender,
                2 => Descender,
                _ => Tracker,
            };
            states.push(back(w >> 4 & 3));
            states.push(back(w >> 2 & 3));
            states.push(back(w & 3));
        }
        states.push(Ascender);
        states.push(Tracker);
        assert_eq!(states.len(), 37);

        let image = paint(&states);
        let opts = ReaderOptions::new().formats([BarcodeFormat::AustraliaPost]);
        let results = read(&image, &opts);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].format(), BarcodeFormat::AustraliaPost);
        assert_eq!(&results[0].bytes()[..10], b"1139987520");
    }

    #[test]
    fn test_mailmark_c() {
        let field = gf64();
        let data: Vec<u32> = (0..16).map(|i| (i * 7 + 3) % 36).collect();
        let full = reed_solomon_encode(field, &data, 6);
        let mut states = Vec::new();
        for &w in &full {
            for shift in [4u32, 2, 0] {
                states.push(match w >> shift & 3 {
                    0 => Tracker,
                    1 => Ascender,
                    2 => Descender,
                    _ => Full,
                });
            }
        }
        assert_eq!(states.len(), 66);
        let image = paint(&states);
        let opts = ReaderOptions::new().formats([BarcodeFormat::Mailmark]);
        let results = read(&image, &opts);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].ec_level(), "C");
        assert_eq!(results[0].bytes().len(), 16);
    }

    #[test]
    fn test_usps_imb() {
        // Build ten 13-bit chars with a valid CRC.
        let payload: Vec<u32> = (0..9).map(|i| (i * 911 + 77) % 8192).collect();
        let crc = crc11(&payload);
        let mut chars = vec![crc << 2];
        chars.extend(&payload);
        let mut bits = Vec::new();
        for &c in &chars {
            for bit in (0..13).rev() {
                bits.push(c >> bit & 1 != 0);
            }
        }
        let mut states = Vec::new();
        for pair in bits.chunks(2) {
            states.push(match (pair[0], pair[1]) {
                (true, true) => Full,
                (true, false) => Ascender,
                (false, true) => Descender,
                (false, false) => Tracker,
            });
        }
        assert_eq!(states.len(), 65);
        let image = paint(&states);
        let opts = ReaderOptions::new().formats([BarcodeFormat::USPSIMB]);
        let results = read(&image, &opts);
        assert_eq!(results.len(), 1);
        assert!(results[0].bytes().len() >= 31);
        assert!(results[0].bytes().iter().all(u8::is_ascii_digit));
    }

    #[test]
    fn test_postnet_zip() {
        // ZIP 12345 with check digit 5 (sum 15 -> +5 = 20).
        let mut states = vec![Full];
        for &d in b"123455" {
            let mask = POSTNET_DIGITS[(d - b'0') as usize];
            for bit in (0..5).rev() {
                states.push(if mask >> bit & 1 != 0 { Full } else { Descender });
            }
        }
        states.push(Full);
        let image = paint(&states);
        let opts = ReaderOptions::new().formats([BarcodeFormat::POSTNET]);
        let results = read(&image, &opts);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].bytes(), b"12345");
    }
}
