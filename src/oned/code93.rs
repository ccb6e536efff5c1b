//! Code 93
//!
//! Nine modules per character in three bars and three spaces. Two
//! mod-47 check characters (C then K) close every symbol and are always
//! validated and stripped. The four shift characters expand to full
//! ASCII.

use super::{find_left_guard, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::PatternView;

/// 9-bit module patterns (MSB = leftmost module), indexed by alphabet
/// position; the last entry is the start/stop character.
const CHARACTER_ENCODINGS: [u32; 48] = [
    0x114, 0x148, 0x144, 0x142, 0x128, 0x124, 0x122, 0x150, 0x112, 0x10A, // 0-9
    0x1A8, 0x1A4, 0x1A2, 0x194, 0x192, 0x18A, 0x168, 0x164, 0x162, 0x134, // A-J
    0x11A, 0x158, 0x14C, 0x146, 0x12C, 0x116, 0x1B4, 0x1B2, 0x1AC, 0x1A6, // K-T
    0x196, 0x19A, 0x16C, 0x166, 0x136, 0x13A, // U-Z
    0x12E, 0x1D4, 0x1D2, 0x1CA, 0x16E, 0x176, 0x1AE, // - . space $ / + %
    0x126, 0x1DA, 0x1D6, 0x132, 0x15E, // ($) (%) (/) (+) start/stop
];

/// `a`..`d` stand in for the four shift characters.
const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ-. $/+%abcd*";
const START_STOP: u32 = 0x15E;

const QUIET_ZONE_MODULES: f32 = 5.0;

/// Convert six runs into the 9-bit module pattern, or `None` when the
/// widths do not quantize cleanly.
fn to_module_pattern(view: &PatternView<'_>) -> Option<u32> {
    let total = view.sum();
    if total < 9 {
        return None;
    }
    let module = total as f32 / 9.0;
    let mut pattern = 0u32;
    let mut modules = 0u32;
    for i in 0..6 {
        let width = (f32::from(view.get(i)) / module).round() as u32;
        if !(1..=4).contains(&width) {
            return None;
        }
        modules += width;
        for _ in 0..width {
            pattern = (pattern << 1) | u32::from(i % 2 == 0);
        }
    }
    (modules == 9).then_some(pattern)
}

fn lookup(pattern: u32) -> Option<usize> {
    CHARACTER_ENCODINGS.iter().position(|&enc| enc == pattern)
}

pub(crate) fn decode_row(view: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    let (start, _) = find_left_guard(view, 6, |w| {
        (to_module_pattern(w) == Some(START_STOP)
            && w.has_quiet_zone_before(QUIET_ZONE_MODULES, 9))
        .then_some(())
    })?;
    let x_start = start.pixels_in_front() as i32;

    let mut values: Vec<usize> = Vec::new();
    let mut next = start.sub_view(6, 6)?;
    loop {
        let value = lookup(to_module_pattern(&next)?)?;
        if ALPHABET[value] == b'*' {
            break;
        }
        values.push(value);
        next = next.sub_view(6, 6)?;
    }
    // Termination bar after the stop character, then the quiet zone.
    let term = next.sub_view(6, 1)?;
    if !term.has_quiet_zone_after(QUIET_ZONE_MODULES, 1) {
        return None;
    }
    let x_stop = term.pixels_until_end() as i32;

    // Two check characters plus at least one data character.
    if values.len() < 3 {
        return None;
    }
    let checks_ok = validate_checks(&values);
    let data = &values[..values.len() - 2];

    let text = expand_shifts(data)?;
    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'G', 0);
    content.append_str(&text);
    let mut result = DecoderResult::new(content);
    if !checks_ok {
        result.error = checksum_error("Code 93 C/K check mismatch");
    }
    if !opts.return_errors && result.error.is_error() {
        return None;
    }
    Some(RowResult {
        format: BarcodeFormat::Code93,
        result,
        x_start,
        x_stop,
    })
}

/// Check character C covers the data with weights cycling 1..20 from the
/// right; K covers data + C with weights cycling 1..15.
fn validate_checks(values: &[usize]) -> bool {
    let n = values.len();
    weighted_check(&values[..n - 2], 20) == values[n - 2]
        && weighted_check(&values[..n - 1], 15) == values[n - 1]
}

fn weighted_check(values: &[usize], max_weight: usize) -> usize {
    values
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &v)| (i % max_weight + 1) * v)
        .sum::<usize>()
        % 47
}

fn expand_shifts(values: &[usize]) -> Option<String> {
    let mut out = String::with_capacity(values.len());
    let mut iter = values.iter();
    while let Some(&v) = iter.next() {
        let c = ALPHABET[v];
        if (b'a'..=b'd').contains(&c) {
            let &next = iter.next()?;
            let n = ALPHABET[next];
            if !n.is_ascii_uppercase() {
                return None;
            }
            let decoded = match c {
                b'a' => n - b'A' + 1,           // ($) control characters
                b'b' => match n {               // (%)
                    b'A'..=b'E' => n - b'A' + 0x1B,
                    b'F'..=b'J' => n - b'F' + b';',
                    b'K'..=b'O' => n - b'K' + b'[',
                    b'P'..=b'T' => n - b'P' + b'{',
                    b'U' => 0x00,
                    b'V' => b'@',
                    b'W' => b'`',
                    _ => 0x7F,
                },
                b'c' => n - b'A' + b'!',        // (/)
                _ => n + 32,                    // (+) lower case
            };
            out.push(decoded as char);
        } else {
            out.push(c as char);
        }
    }
    Some(out)
}
