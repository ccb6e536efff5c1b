//! MSI (Modified Plessey)
//!
//! Each digit is four bits, each bit one bar/space pair: 0 = narrow bar
//! wide space, 1 = wide bar narrow space. Guarded by a 21 start and a
//! 121 stop. The trailing mod-10 digit is validated and kept in the
//! output.

use super::{find_left_guard, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::{pattern_variance, PatternView};

const START_PATTERN: [u16; 2] = [2, 1];
const STOP_PATTERN: [u16; 3] = [1, 2, 1];
const MAX_VARIANCE: f32 = 0.25;
const QUIET_ZONE_MODULES: f32 = 4.0;

/// Element widths per digit: bit 1 = wide bar + narrow space.
fn digit_pattern(digit: u8) -> [u16; 8] {
    let mut out = [0u16; 8];
    for bit in 0..4 {
        let one = digit >> (3 - bit) & 1 != 0;
        out[2 * bit] = if one { 2 } else { 1 };
        out[2 * bit + 1] = if one { 1 } else { 2 };
    }
    out
}

fn best_digit(view: &PatternView<'_>) -> Option<u8> {
    let mut best = MAX_VARIANCE;
    let mut winner = None;
    for digit in 0..10u8 {
        let v = pattern_variance(view, &digit_pattern(digit));
        if v < best {
            best = v;
            winner = Some(digit);
        }
    }
    winner
}

pub(crate) fn decode_row(view: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    let (start, _) = find_left_guard(view, 2, |w| {
        (pattern_variance(w, &START_PATTERN) < MAX_VARIANCE
            && w.has_quiet_zone_before(QUIET_ZONE_MODULES, 3))
        .then_some(())
    })?;
    let x_start = start.pixels_in_front() as i32;

    let mut digits = Vec::new();
    let mut next = start;
    let mut offset = 2;
    loop {
        if let Some(stop) = next.sub_view(offset, 3) {
            if pattern_variance(&stop, &STOP_PATTERN) < MAX_VARIANCE
                && stop.has_quiet_zone_after(QUIET_ZONE_MODULES, 4)
                && digits.len() >= 2
            {
                next = stop;
                break;
            }
        }
        let window = next.sub_view(offset, 8)?;
        digits.push(b'0' + best_digit(&window)?);
        next = window;
        offset = 8;
    }
    let x_stop = next.pixels_until_end() as i32;

    let valid = mod10_check(&digits[..digits.len() - 1]) == digits[digits.len() - 1] - b'0';
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'M', 0);
    content.append(&digits);
    let mut result = DecoderResult::new(content);
    if !valid {
        result.error = checksum_error("MSI mod-10 check mismatch");
    }
    if !opts.return_errors && result.error.is_error() {
        return None;
    }
    Some(RowResult {
        format: BarcodeFormat::MSI,
        result,
        x_start,
        x_stop,
    })
}

/// Luhn-style mod 10: digits in the odd positions (from the right) are
/// doubled with digit-sum reduction.
fn mod10_check(digits: &[u8]) -> u8 {
    let mut sum = 0u32;
    for (i, &d) in digits.iter().rev().enumerate() {
        let mut v = u32::from(d - b'0');
        if i % 2 == 0 {
            v *= 2;
            if v > 9 {
                v -= 9;
            }
        }
        sum += v;
    }
    ((10 - sum % 10) % 10) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oned::test_util::row_with_quiet;

    fn encode(digits: &[u8]) -> Vec<u16> {
        let mut elements = Vec::new();
        elements.extend_from_slice(&START_PATTERN);
        for &d in digits {
            elements.extend_from_slice(&digit_pattern(d - b'0'));
        }
        elements.extend_from_slice(&STOP_PATTERN);
        elements
    }

    fn with_check(data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        out.push(b'0' + mod10_check(data));
        out
    }

    #[test]
    fn test_decode_with_valid_check() {
        // 1234567 -> Luhn check digit 4.
        let digits = with_check(b"1234567");
        assert_eq!(digits.last(), Some(&b'4'));
        let row = row_with_quiet(&encode(&digits), 12);
        let result = decode_row(&row.view(), &ReaderOptions::new()).unwrap();
        assert_eq!(result.format, BarcodeFormat::MSI);
        assert_eq!(result.result.content.bytes(), b"12345674");
    }

    #[test]
    fn test_bad_check_rejected() {
        let row = row_with_quiet(&encode(b"12345675"), 12);
        assert!(decode_row(&row.view(), &ReaderOptions::new()).is_none());
    }
}
