//! Korea Post
//!
//! Seven digits (six data, one mod-10 check), four one-module bars per
//! digit with variable spacing carrying the information. The check digit
//! is validated but not returned to the caller.

use super::{find_left_guard, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::PatternView;

/// Inner space widths (between the four bars) per digit, in modules.
const INNER_SPACES: [[u16; 3]; 10] = [
    [3, 3, 11], // 0
    [3, 3, 3],  // 1
    [7, 3, 3],  // 2
    [11, 3, 3], // 3
    [3, 7, 3],  // 4
    [7, 7, 3],  // 5
    [3, 11, 3], // 6
    [3, 3, 7],  // 7
    [7, 3, 7],  // 8
    [3, 7, 7],  // 9
];

/// Leading space per digit in modules; merges into the previous digit's
/// trailing 3-module space at a boundary.
const LEAD_SPACES: [u16; 10] = [0, 7, 4, 0, 4, 0, 0, 4, 0, 0];
const TRAIL_SPACE: u16 = 3;

const TOTAL_DIGITS: usize = 7;
/// 28 bars and the 27 spaces between them.
const TOTAL_RUNS: usize = 2 * 4 * TOTAL_DIGITS - 1;

pub(crate) fn decode_row(view: &PatternView<'_>, _opts: &ReaderOptions) -> Option<RowResult> {
    let (symbol, module) = find_left_guard(view, TOTAL_RUNS, |w| {
        // Every bar is one module wide; use their mean as the module.
        let mut bar_sum = 0u32;
        for i in (0..TOTAL_RUNS).step_by(2) {
            bar_sum += u32::from(w.get(i));
        }
        let module = bar_sum as f32 / 28.0;
        let quiet_ok = f32::from(w.space_in_front()) >= 5.0 * module;
        (module >= 1.0 && quiet_ok).then_some(module)
    })?;
    if f32::from(symbol.space_behind().min(1000)) < 5.0 * module {
        return None;
    }

    let quantize = |w: u16| (f32::from(w) / module).round() as u16;

    let mut digits = Vec::with_capacity(TOTAL_DIGITS);
    for d in 0..TOTAL_DIGITS {
        let base = d * 8;
        // Four bars, all single-module.
        for b in 0..4 {
            if quantize(symbol.get(base + 2 * b)) != 1 {
                return None;
            }
        }
        let inner = [
            quantize(symbol.get(base + 1)),
            quantize(symbol.get(base + 3)),
            quantize(symbol.get(base + 5)),
        ];
        let digit = INNER_SPACES.iter().position(|s| *s == inner)? as u8;
        // The boundary space confirms the next digit's leading gap.
        if d + 1 < TOTAL_DIGITS {
            let boundary = quantize(symbol.get(base + 7));
            let next_inner = [
                quantize(symbol.get(base + 9)),
                quantize(symbol.get(base + 11)),
                quantize(symbol.get(base + 13)),
            ];
            let next = INNER_SPACES.iter().position(|s| *s == next_inner)? as u8;
            if boundary != TRAIL_SPACE + LEAD_SPACES[next as usize] {
                return None;
            }
        }
        digits.push(digit);
    }

    let sum: u32 = digits[..6].iter().map(|&d| u32::from(d)).sum();
    let check = ((10 - sum % 10) % 10) as u8;
    if digits[6] != check {
        return None;
    }

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'X', 0);
    content.append(&digits[..6].iter().map(|&d| b'0' + d).collect::<Vec<_>>());
    Some(RowResult {
        format: BarcodeFormat::KoreaPost,
        result: DecoderResult::new(content),
        x_start: symbol.pixels_in_front() as i32,
        x_stop: symbol.pixels_until_end() as i32,
    })
}
