//! Code 11 (USD-8)
//!
//! Digits and dash only, five elements per character. One mod-11 check
//! digit (C) is mandatory; a second (K) is added when the data part is
//! ten characters or longer. Both are validated and stripped.

use super::{find_left_guard, narrow_wide_mask, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::PatternView;

const ALPHABET: &[u8] = b"0123456789-*";

/// Wide-element masks over 5 elements, first element at bit 4.
const CHARACTER_ENCODINGS: [u32; 12] = [
    0b00001, // 0: NNNNW
    0b10001, // 1: WNNNW
    0b01001, // 2: NWNNW
    0b11000, // 3: WWNNN
    0b00101, // 4: NNWNW
    0b10100, // 5: WNWNN
    0b01100, // 6: NWWNN
    0b00011, // 7: NNNWW
    0b10010, // 8: WNNWN
    0b10000, // 9: WNNNN
    0b00100, // -: NNWNN
    0b00110, // *: NNWWN (start/stop)
];

const START_STOP: u32 = 0b00110;
const QUIET_ZONE_MODULES: f32 = 5.0;
const CHAR_MODULES: u32 = 7;

fn lookup(mask: u32) -> Option<usize> {
    CHARACTER_ENCODINGS.iter().position(|&enc| enc == mask)
}

fn value_of(c: u8) -> u32 {
    if c == b'-' {
        10
    } else {
        u32::from(c - b'0')
    }
}

pub(crate) fn decode_row(view: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    let (start, _) = find_left_guard(view, 5, |w| {
        (narrow_wide_mask(w, false) == Some(START_STOP)
            && w.has_quiet_zone_before(QUIET_ZONE_MODULES, CHAR_MODULES))
        .then_some(())
    })?;
    let x_start = start.pixels_in_front() as i32;

    let mut chars = Vec::new();
    let mut next = start;
    loop {
        next = next.sub_view(6, 5)?;
        let idx = lookup(narrow_wide_mask(&next, true)?)?;
        if ALPHABET[idx] == b'*' {
            break;
        }
        chars.push(ALPHABET[idx]);
    }
    if chars.len() < 2 || !next.has_quiet_zone_after(QUIET_ZONE_MODULES, CHAR_MODULES) {
        return None;
    }
    let x_stop = next.pixels_until_end() as i32;

    // The K check is present once data length (incl. C) reaches 10.
    let check_count = if chars.len() >= 11 { 2 } else { 1 };
    let data_len = chars.len() - check_count;
    let c_ok = mod11_check(&chars[..data_len], 10) == value_of(chars[data_len]);
    let k_ok = check_count == 1
        || mod11_check(&chars[..data_len + 1], 9) == value_of(chars[data_len + 1]);

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'H', 0);
    content.append(&chars[..data_len]);
    let mut result = DecoderResult::new(content);
    if !(c_ok && k_ok) {
        result.error = checksum_error("Code 11 C/K check mismatch");
    }
    if !opts.return_errors && result.error.is_error() {
        return None;
    }
    Some(RowResult {
        format: BarcodeFormat::Code11,
        result,
        x_start,
        x_stop,
    })
}

/// Mod-11 weighted sum, weights cycling 1..=max_weight from the right.
fn mod11_check(chars: &[u8], max_weight: u32) -> u32 {
    chars
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &c)| (i as u32 % max_weight + 1) * value_of(c))
        .sum::<u32>()
        % 11
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oned::test_util::row_with_quiet;

    fn encode(chars: &[u8]) -> Vec<u16> {
        let mut elements = Vec::new();
        let mut framed = vec![b'*'];
        framed.extend_from_slice(chars);
        framed.push(b'*');
        for (i, &c) in framed.iter().enumerate() {
            if i > 0 {
                elements.push(1);
            }
            let idx = ALPHABET.iter().position(|&a| a == c).unwrap();
            let mask = CHARACTER_ENCODINGS[idx];
            for bit in (0..5).rev() {
                elements.push(if mask >> bit & 1 != 0 { 2 } else { 1 });
            }
        }
        elements
    }

    fn with_check(data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        let c = mod11_check(data, 10);
        out.push(ALPHABET[c as usize]);
        if out.len() >= 11 {
            let k = mod11_check(&out, 9);
            out.push(ALPHABET[k as usize]);
        }
        out
    }

    #[test]
    fn test_short_symbol_single_check() {
        let chars = with_check(b"123-45");
        let row = row_with_quiet(&encode(&chars), 15);
        let result = decode_row(&row.view(), &ReaderOptions::new()).unwrap();
        assert_eq!(result.format, BarcodeFormat::Code11);
        assert_eq!(result.result.content.bytes(), b"123-45");
    }

    #[test]
    fn test_long_symbol_double_check() {
        let chars = with_check(b"0123456789");
        assert_eq!(chars.len(), 12);
        let row = row_with_quiet(&encode(&chars), 15);
        let result = decode_row(&row.view(), &ReaderOptions::new()).unwrap();
        assert_eq!(result.result.content.bytes(), b"0123456789");
    }

    #[test]
    fn test_wrong_check_rejected() {
        let mut chars = with_check(b"123-45");
        let last = chars.len() - 1;
        chars[last] = if chars[last] == b'0' { b'1' } else { b'0' };
        let row = row_with_quiet(&encode(&chars), 15);
        assert!(decode_row(&row.view(), &ReaderOptions::new()).is_none());
    }
}
