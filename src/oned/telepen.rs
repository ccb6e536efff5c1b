//! Telepen
//!
//! Full-ASCII symbology with even-parity byte encoding: each character's
//! parity byte is read LSB first and its bit runs map onto narrow/wide
//! element pairs. The trailing mod-127 check character is validated and
//! stripped.

use super::{find_left_guard, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::{pattern_variance, PatternView};

/// `_` (ASCII 95): five narrow pairs and one wide pair.
const START_PATTERN: [u16; 12] = [1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 3, 3];
/// `z` (ASCII 122): one wide pair and five narrow pairs.
const STOP_PATTERN: [u16; 12] = [3, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1];

const MAX_VARIANCE: f32 = 0.3;
const QUIET_ZONE_MODULES: f32 = 4.0;

fn even_parity(ascii: u8) -> u8 {
    if ascii.count_ones() % 2 == 1 {
        ascii | 0x80
    } else {
        ascii
    }
}

/// Element widths for one character. Bit runs of the parity byte (LSB
/// first) produce pairs: single bit (1,1), double (1,3), triple+ (3,3).
fn compute_pattern(ascii: u8, out: &mut Vec<u16>) {
    out.clear();
    let byte = even_parity(ascii);
    let mut i = 0;
    while i < 8 {
        let bit = byte >> i & 1;
        let mut run = 1;
        while i + run < 8 && byte >> (i + run) & 1 == bit {
            run += 1;
        }
        match run {
            1 => out.extend_from_slice(&[1, 1]),
            2 => out.extend_from_slice(&[1, 3]),
            _ => out.extend_from_slice(&[3, 3]),
        }
        i += run;
    }
}

pub(crate) fn decode_row(view: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    let (start, _) = find_left_guard(view, 12, |w| {
        (pattern_variance(w, &START_PATTERN) < MAX_VARIANCE
            && w.has_quiet_zone_before(QUIET_ZONE_MODULES, 16))
        .then_some(())
    })?;
    let x_start = start.pixels_in_front() as i32;

    let mut text = Vec::new();
    let mut next = start.sub_view(12, 0)?.rest_of_row();
    let mut scratch = Vec::with_capacity(16);
    loop {
        if let Some(stop) = next.sub_view(0, 12) {
            if pattern_variance(&stop, &STOP_PATTERN) < MAX_VARIANCE {
                if !stop.has_quiet_zone_after(QUIET_ZONE_MODULES, 16) {
                    return None;
                }
                next = stop;
                break;
            }
        }
        let (ascii, len) = decode_char(&next, &mut scratch)?;
        text.push(ascii);
        next = next.sub_view(len, 0)?.rest_of_row();
    }
    let x_stop = next.pixels_until_end() as i32;

    // At least one data character plus the check character.
    if text.len() < 2 {
        return None;
    }
    let data = &text[..text.len() - 1];
    let sum: u32 = data.iter().map(|&c| u32::from(c)).sum();
    let expected = (127 - sum % 127) % 127;
    let check_ok = u32::from(text[text.len() - 1]) == expected;

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'B', 0);
    content.append(data);
    let mut result = DecoderResult::new(content);
    if !check_ok {
        result.error = checksum_error("Telepen mod-127 check mismatch");
    }
    if !opts.return_errors && result.error.is_error() {
        return None;
    }
    Some(RowResult {
        format: BarcodeFormat::Telepen,
        result,
        x_start,
        x_stop,
    })
}

/// Best ASCII match at the current position; returns the character and
/// the number of elements it spans.
fn decode_char(view: &PatternView<'_>, scratch: &mut Vec<u16>) -> Option<(u8, usize)> {
    let mut best = MAX_VARIANCE;
    let mut winner = None;
    for ascii in 0..128u8 {
        // The frame characters never appear as data.
        if ascii == 95 || ascii == 122 {
            continue;
        }
        compute_pattern(ascii, scratch);
        let Some(window) = view.sub_view(0, scratch.len()) else {
            continue;
        };
        let v = pattern_variance(&window, scratch);
        if v < best {
            best = v;
            winner = Some((ascii, scratch.len()));
        }
    }
    winner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oned::test_util::row_with_quiet;

    fn encode(data: &[u8]) -> Vec<u16> {
        let mut elements = Vec::new();
        elements.extend_from_slice(&START_PATTERN);
        let mut scratch = Vec::new();
        let sum: u32 = data.iter().map(|&c| u32::from(c)).sum();
        let check = ((127 - sum % 127) % 127) as u8;
        for &c in data.iter().chain([&check]) {
            compute_pattern(c, &mut scratch);
            elements.extend_from_slice(&scratch);
        }
        elements.extend_from_slice(&STOP_PATTERN);
        elements
    }

    #[test]
    fn test_numeric_data() {
        let row = row_with_quiet(&encode(b"466933"), 12);
        let result = decode_row(&row.view(), &ReaderOptions::new()).unwrap();
        assert_eq!(result.format, BarcodeFormat::Telepen);
        assert_eq!(result.result.content.bytes(), b"466933");
    }

    #[test]
    fn test_quiet_zone_enforced() {
        let row = row_with_quiet(&encode(b"466933"), 2);
        assert!(decode_row(&row.view(), &ReaderOptions::new()).is_none());
    }

    #[test]
    fn test_check_mismatch_flagged() {
        let mut elements = Vec::new();
        elements.extend_from_slice(&START_PATTERN);
        let mut scratch = Vec::new();
        for &c in b"AB" {
            compute_pattern(c, &mut scratch);
            elements.extend_from_slice(&scratch);
        }
        // 'B' is not the check character for "A".
        elements.extend_from_slice(&STOP_PATTERN);
        let row = row_with_quiet(&elements, 12);
        assert!(decode_row(&row.view(), &ReaderOptions::new()).is_none());
        let opts = ReaderOptions::new().return_errors(true);
        let result = decode_row(&row.view(), &opts).unwrap();
        assert!(result.result.error.is_error());
    }
}
