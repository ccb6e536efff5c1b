//! Code 39 and its constrained variants (Code 32, LOGMARS, PZN)
//!
//! Nine elements per character, five bars and four spaces, exactly three
//! of them wide. The variants reuse the symbol structure and differ only
//! in the permitted alphabet and the mandatory check digit.

use super::{find_left_guard, narrow_wide_mask, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::PatternView;

/// Wide-element masks over the 9 elements, indexed by alphabet position.
const CHARACTER_ENCODINGS: [u32; 44] = [
    0x034, 0x121, 0x061, 0x160, 0x031, 0x130, 0x070, 0x025, 0x124, 0x064, // 0-9
    0x109, 0x049, 0x148, 0x019, 0x118, 0x058, 0x00D, 0x10C, 0x04C, 0x01C, // A-J
    0x103, 0x043, 0x142, 0x013, 0x112, 0x052, 0x007, 0x106, 0x046, 0x016, // K-T
    0x181, 0x0C1, 0x1C0, 0x091, 0x190, 0x0D0, 0x085, 0x184, 0x0C4, 0x0A8, // U-$
    0x0A2, 0x08A, 0x02A, 0x094, // / + % *
];

const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%*";
const ASTERISK: u32 = 0x094;

/// Code 32 value alphabet: base 32 without the vowels.
const BASE32_ALPHABET: &[u8] = b"0123456789BCDFGHJKLMNPQRSTUVWXYZ";

const QUIET_ZONE_MODULES: f32 = 5.0;
/// 6 narrow + 3 wide elements at the nominal 2:1 ratio.
const CHAR_MODULES: u32 = 12;

fn lookup(mask: u32) -> Option<u8> {
    CHARACTER_ENCODINGS
        .iter()
        .position(|&enc| enc == mask)
        .map(|i| ALPHABET[i])
}

pub(crate) fn decode_row(view: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    let (start, _) = find_left_guard(view, 9, |w| {
        (narrow_wide_mask(w, false) == Some(ASTERISK)
            && w.has_quiet_zone_before(QUIET_ZONE_MODULES, CHAR_MODULES))
        .then_some(())
    })?;
    let x_start = start.pixels_in_front() as i32;

    let mut raw = Vec::new();
    // Step over the start character and its inter-character gap.
    let mut next = start.sub_view(10, 9)?;
    loop {
        let mask = narrow_wide_mask(&next, false)?;
        if mask == ASTERISK {
            break;
        }
        raw.push(lookup(mask)?);
        next = next.sub_view(10, 9)?;
    }
    if raw.is_empty() || !next.has_quiet_zone_after(QUIET_ZONE_MODULES, CHAR_MODULES) {
        return None;
    }
    let x_stop = next.pixels_until_end() as i32;

    emit(raw, opts, x_start, x_stop)
}

/// Pick the most specific enabled variant for the raw character string.
fn emit(raw: Vec<u8>, opts: &ReaderOptions, x_start: i32, x_stop: i32) -> Option<RowResult> {
    use BarcodeFormat::*;

    if opts.has_format(Code32) && raw.len() == 6 && raw.iter().all(|c| base32_value(*c).is_some())
    {
        return Some(emit_code32(&raw, x_start, x_stop));
    }
    if opts.has_format(PZN) && raw.first() == Some(&b'-') && raw.len() >= 7 {
        if let Some(result) = emit_pzn(&raw, x_start, x_stop) {
            return Some(result);
        }
    }
    if opts.has_format(Code39) {
        let mut content = Content::new();
        content.symbology = SymbologyIdentifier::new(b'A', 0);
        match decode_extended(&raw) {
            Some(text) => content.append_str(&text),
            None => content.append(&raw),
        }
        return Some(RowResult {
            format: Code39,
            result: DecoderResult::new(content),
            x_start,
            x_stop,
        });
    }
    if opts.has_format(LOGMARS) && raw.len() >= 2 {
        // LOGMARS requires the mod-43 check character, stripped on output.
        let check = mod43_checksum(&raw[..raw.len() - 1]);
        let mut content = Content::new();
        content.symbology = SymbologyIdentifier::new(b'A', 3);
        content.append(&raw[..raw.len() - 1]);
        let mut result = DecoderResult::new(content);
        if ALPHABET[check as usize] != raw[raw.len() - 1] {
            result.error = checksum_error("LOGMARS mod-43 check mismatch");
        }
        return Some(RowResult {
            format: LOGMARS,
            result,
            x_start,
            x_stop,
        });
    }
    None
}

fn mod43_checksum(data: &[u8]) -> u32 {
    data.iter()
        .map(|&c| ALPHABET.iter().position(|&a| a == c).unwrap_or(0) as u32)
        .sum::<u32>()
        % 43
}

fn base32_value(c: u8) -> Option<u32> {
    BASE32_ALPHABET.iter().position(|&a| a == c).map(|i| i as u32)
}

/// Code 32: six base-32 characters encode a 9-digit number whose last
/// digit is an alternating-weight mod-10 check over the first eight.
/// The output carries the fixed `A` prefix of the Italian pharmacode.
fn emit_code32(raw: &[u8], x_start: i32, x_stop: i32) -> RowResult {
    let mut value: u64 = 0;
    for &c in raw {
        value = value * 32 + u64::from(base32_value(c).unwrap_or(0));
    }
    let digits: Vec<u8> = format!("{value:09}").into_bytes();

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'A', 3);
    content.push(b'A');
    content.append(&digits);

    let mut result = DecoderResult::new(content);
    if digits.len() != 9 || code32_check_digit(&digits[..8]) != digits[8] - b'0' {
        result.error = checksum_error("Code 32 check digit mismatch");
    }
    RowResult {
        format: BarcodeFormat::Code32,
        result,
        x_start,
        x_stop,
    }
}

/// Digits at odd positions count double (minus nine when they carry).
fn code32_check_digit(digits: &[u8]) -> u8 {
    let mut sum = 0u32;
    for (i, &d) in digits.iter().enumerate() {
        let mut v = u32::from(d - b'0');
        if i % 2 == 1 {
            v *= 2;
            if v > 9 {
                v -= 9;
            }
        }
        sum += v;
    }
    (sum % 10) as u8
}

/// PZN: `-` followed by 7 (PZN8) or 6 (PZN7) digits and a mod-11 check.
fn emit_pzn(raw: &[u8], x_start: i32, x_stop: i32) -> Option<RowResult> {
    let digits = &raw[1..];
    if !(digits.len() == 8 || digits.len() == 7) || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let first_weight = if digits.len() == 8 { 1 } else { 2 };
    let sum: u32 = digits[..digits.len() - 1]
        .iter()
        .enumerate()
        .map(|(i, &d)| (first_weight + i as u32) * u32::from(d - b'0'))
        .sum();
    let check = sum % 11;

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'A', 3);
    content.append(raw);
    let mut result = DecoderResult::new(content);
    if check == 10 || check as u8 != digits[digits.len() - 1] - b'0' {
        result.error = checksum_error("PZN mod-11 check mismatch");
    }
    Some(RowResult {
        format: BarcodeFormat::PZN,
        result,
        x_start,
        x_stop,
    })
}

/// Full-ASCII expansion of the `$`, `%`, `/`, `+` shift pairs. `None`
/// when the string contains an invalid pair, in which case the caller
/// keeps the literal characters.
fn decode_extended(raw: &[u8]) -> Option<String> {
    if !raw.iter().any(|c| matches!(c, b'$' | b'%' | b'/' | b'+')) {
        return Some(String::from_utf8_lossy(raw).into_owned());
    }
    let mut out = String::with_capacity(raw.len());
    let mut iter = raw.iter();
    while let Some(&c) = iter.next() {
        if matches!(c, b'$' | b'%' | b'/' | b'+') {
            let &next = iter.next()?;
            let decoded = match (c, next) {
                (b'$', b'A'..=b'Z') => (next - b'A' + 1) as char, // control chars
                (b'%', b'A'..=b'E') => char::from(next - b'A' + 0x1B),
                (b'%', b'F'..=b'J') => char::from(next - b'F' + b';'),
                (b'%', b'K'..=b'O') => char::from(next - b'K' + b'['),
                (b'%', b'P'..=b'T') => char::from(next - b'P' + b'{'),
                (b'%', b'U') => '\0',
                (b'%', b'V') => '@',
                (b'%', b'W') => '`',
                (b'%', b'X'..=b'Z') => '\x7F',
                (b'/', b'A'..=b'O') => char::from(next - b'A' + b'!'),
                (b'/', b'Z') => ':',
                (b'+', b'A'..=b'Z') => char::from(next + 32), // lower case
                _ => return None,
            };
            out.push(decoded);
        } else {
            out.push(c as char);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oned::test_util::row_with_quiet;

    /// Build the element widths for a Code 39 string (with start/stop).
    fn encode(text: &[u8]) -> Vec<u16> {
        let mut elements = Vec::new();
        let mut push_char = |c: u8| {
            let idx = ALPHABET.iter().position(|&a| a == c).unwrap();
            let mask = CHARACTER_ENCODINGS[idx];
            for bit in (0..9).rev() {
                elements.push(if mask >> bit & 1 != 0 { 2 } else { 1 });
            }
            elements.push(1); // inter-character gap
        };
        push_char(b'*');
        for &c in text {
            push_char(c);
        }
        push_char(b'*');
        elements.pop(); // no gap after the stop character
        elements
    }

    fn decode(text: &[u8], opts: &ReaderOptions) -> Option<RowResult> {
        let row = row_with_quiet(&encode(text), 20);
        decode_row(&row.view(), opts)
    }

    #[test]
    fn test_plain_code39() {
        let opts = ReaderOptions::new();
        let result = decode(b"CODE-39 OK", &opts).unwrap();
        assert_eq!(result.format, BarcodeFormat::Code39);
        assert_eq!(result.result.content.bytes(), b"CODE-39 OK");
        assert!(result.result.error.is_ok());
    }

    #[test]
    fn test_extended_pair() {
        let opts = ReaderOptions::new();
        // +A -> 'a'
        let result = decode(b"X+AY", &opts).unwrap();
        assert_eq!(result.result.content.bytes(), b"XaY");
    }

    #[test]
    fn test_quiet_zone_enforced() {
        let opts = ReaderOptions::new();
        let row = row_with_quiet(&encode(b"HI"), 2);
        assert!(decode_row(&row.view(), &opts).is_none());
    }

    #[test]
    fn test_code32_conversion() {
        let opts = ReaderOptions::new().formats([BarcodeFormat::Code32]);
        // "1B2C34" in base 32 = 44117092 -> digits 044117092; the check
        // over 04411709 is 9, not the trailing 2, so the error is flagged.
        let result = decode(b"1B2C34", &opts).unwrap();
        assert_eq!(result.format, BarcodeFormat::Code32);
        assert_eq!(result.result.content.bytes(), b"A044117092");
        assert!(result.result.error.is_error());
    }

    #[test]
    fn test_code32_valid_check() {
        let opts = ReaderOptions::new().formats([BarcodeFormat::Code32]);
        // "1B2C3C" = 44117099 -> digits 044117099, valid check digit 9.
        let result = decode(b"1B2C3C", &opts).unwrap();
        assert_eq!(result.result.content.bytes(), b"A044117099");
        assert!(result.result.error.is_ok(), "{:?}", result.result.error);
    }

    #[test]
    fn test_pzn_check() {
        let opts = ReaderOptions::new().formats([BarcodeFormat::PZN]);
        // PZN 03669112: 0*1+3*2+6*3+6*4+9*5+1*6+1*7 = 106, 106 % 11 = 7.
        // Deliberately use the wrong trailing digit first.
        let bad = decode(b"-03669113", &opts).unwrap();
        assert!(bad.result.error.is_error());
        let good = decode(b"-03669117", &opts).unwrap();
        assert_eq!(good.format, BarcodeFormat::PZN);
        assert_eq!(good.result.content.bytes(), b"-03669117");
        assert!(good.result.error.is_ok());
    }
}
