//! Code 128
//!
//! Eleven modules per symbol character spread over three bars and three
//! spaces. Three start characters select the initial code set; CODE and
//! SHIFT characters switch between sets A/B/C mid-stream. FNC1 in first
//! position marks a GS1 payload and switches the symbology identifier to
//! `]C1`.

use super::{find_left_guard, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::{pattern_variance, PatternView};

/// Element widths for code values 0-105 (103..=105 are Start A/B/C).
/// Shared with the stacked derivatives (Codablock F, Code 16K).
pub(crate) const CODE_PATTERNS: [[u16; 6]; 106] = [
    [2, 1, 2, 2, 2, 2], [2, 2, 2, 1, 2, 2], [2, 2, 2, 2, 2, 1], [1, 2, 1, 2, 2, 3],
    [1, 2, 1, 3, 2, 2], [1, 3, 1, 2, 2, 2], [1, 2, 2, 2, 1, 3], [1, 2, 2, 3, 1, 2],
    [1, 3, 2, 2, 1, 2], [2, 2, 1, 2, 1, 3], [2, 2, 1, 3, 1, 2], [2, 3, 1, 2, 1, 2],
    [1, 1, 2, 2, 3, 2], [1, 2, 2, 1, 3, 2], [1, 2, 2, 2, 3, 1], [1, 1, 3, 2, 2, 2],
    [1, 2, 3, 1, 2, 2], [1, 2, 3, 2, 2, 1], [2, 2, 3, 2, 1, 1], [2, 2, 1, 1, 3, 2],
    [2, 2, 1, 2, 3, 1], [2, 1, 3, 2, 1, 2], [2, 2, 3, 1, 1, 2], [3, 1, 2, 1, 3, 1],
    [3, 1, 1, 2, 2, 2], [3, 2, 1, 1, 2, 2], [3, 2, 1, 2, 2, 1], [3, 1, 2, 2, 1, 2],
    [3, 2, 2, 1, 1, 2], [3, 2, 2, 2, 1, 1], [2, 1, 2, 1, 2, 3], [2, 1, 2, 3, 2, 1],
    [2, 3, 2, 1, 2, 1], [1, 1, 1, 3, 2, 3], [1, 3, 1, 1, 2, 3], [1, 3, 1, 3, 2, 1],
    [1, 1, 2, 3, 1, 3], [1, 3, 2, 1, 1, 3], [1, 3, 2, 3, 1, 1], [2, 1, 1, 3, 1, 3],
    [2, 3, 1, 1, 1, 3], [2, 3, 1, 3, 1, 1], [1, 1, 2, 1, 3, 3], [1, 1, 2, 3, 3, 1],
    [1, 3, 2, 1, 3, 1], [1, 1, 3, 1, 2, 3], [1, 1, 3, 3, 2, 1], [1, 3, 3, 1, 2, 1],
    [3, 1, 3, 1, 2, 1], [2, 1, 1, 3, 3, 1], [2, 3, 1, 1, 3, 1], [2, 1, 3, 1, 1, 3],
    [2, 1, 3, 3, 1, 1], [2, 1, 3, 1, 3, 1], [3, 1, 1, 1, 2, 3], [3, 1, 1, 3, 2, 1],
    [3, 3, 1, 1, 2, 1], [3, 1, 2, 1, 1, 3], [3, 1, 2, 3, 1, 1], [3, 3, 2, 1, 1, 1],
    [3, 1, 4, 1, 1, 1], [2, 2, 1, 4, 1, 1], [4, 3, 1, 1, 1, 1], [1, 1, 1, 2, 2, 4],
    [1, 1, 1, 4, 2, 2], [1, 2, 1, 1, 2, 4], [1, 2, 1, 4, 2, 1], [1, 4, 1, 1, 2, 2],
    [1, 4, 1, 2, 2, 1], [1, 1, 2, 2, 1, 4], [1, 1, 2, 4, 1, 2], [1, 2, 2, 1, 1, 4],
    [1, 2, 2, 4, 1, 1], [1, 4, 2, 1, 1, 2], [1, 4, 2, 2, 1, 1], [2, 4, 1, 2, 1, 1],
    [2, 2, 1, 1, 1, 4], [4, 1, 3, 1, 1, 1], [2, 4, 1, 1, 1, 2], [1, 3, 4, 1, 1, 1],
    [1, 1, 1, 2, 4, 2], [1, 2, 1, 1, 4, 2], [1, 2, 1, 2, 4, 1], [1, 1, 4, 2, 1, 2],
    [1, 2, 4, 1, 1, 2], [1, 2, 4, 2, 1, 1], [4, 1, 1, 2, 1, 2], [4, 2, 1, 1, 1, 2],
    [4, 2, 1, 2, 1, 1], [2, 1, 2, 1, 4, 1], [2, 1, 4, 1, 2, 1], [4, 1, 2, 1, 2, 1],
    [1, 1, 1, 1, 4, 3], [1, 1, 1, 3, 4, 1], [1, 3, 1, 1, 4, 1], [1, 1, 4, 1, 1, 3],
    [1, 1, 4, 3, 1, 1], [4, 1, 1, 1, 1, 3], [4, 1, 1, 3, 1, 1], [1, 1, 3, 1, 4, 1],
    [1, 1, 4, 1, 3, 1], [3, 1, 1, 1, 4, 1], [4, 1, 1, 1, 3, 1], [2, 1, 1, 4, 1, 2],
    [2, 1, 1, 2, 1, 4], [2, 1, 1, 2, 3, 2],
];

pub(crate) const STOP_PATTERN: [u16; 7] = [2, 3, 3, 1, 1, 1, 2];

const CODE_START_A: u32 = 103;
const CODE_START_B: u32 = 104;
const CODE_START_C: u32 = 105;
const CODE_SHIFT: u32 = 98;
const CODE_FNC1: u32 = 102;
const CODE_FNC2: u32 = 97;
const CODE_FNC3: u32 = 96;

const MAX_VARIANCE: f32 = 0.25;
const QUIET_ZONE_MODULES: f32 = 5.0;

#[derive(Clone, Copy, PartialEq, Eq)]
enum CodeSet {
    A,
    B,
    C,
}

pub(crate) fn best_code(view: &PatternView<'_>) -> Option<u32> {
    let mut best = MAX_VARIANCE;
    let mut winner = None;
    for (value, weights) in CODE_PATTERNS.iter().enumerate() {
        let v = pattern_variance(view, weights);
        if v < best {
            best = v;
            winner = Some(value as u32);
        }
    }
    winner
}

pub(crate) fn decode_row(view: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    let (start, start_code) = find_left_guard(view, 6, |w| {
        if !w.has_quiet_zone_before(QUIET_ZONE_MODULES, 11) {
            return None;
        }
        best_code(w).filter(|&c| (CODE_START_A..=CODE_START_C).contains(&c))
    })?;
    let x_start = start.pixels_in_front() as i32;

    // Collect raw code values until the stop pattern.
    let mut values = vec![start_code];
    let mut next = start;
    loop {
        if let Some(stop) = next.sub_view(6, 7) {
            if pattern_variance(&stop, &STOP_PATTERN) < MAX_VARIANCE {
                if !stop.has_quiet_zone_after(QUIET_ZONE_MODULES, 13) {
                    return None;
                }
                next = stop;
                break;
            }
        }
        next = next.sub_view(6, 6)?;
        values.push(best_code(&next)?);
    }
    let x_stop = next.pixels_until_end() as i32;

    // Start + at least one data symbol + check symbol.
    if values.len() < 3 {
        return None;
    }
    let check_symbol = values[values.len() - 1];
    let mut checksum = values[0];
    for (i, &v) in values[1..values.len() - 1].iter().enumerate() {
        checksum = (checksum + (i as u32 + 1) * v) % 103;
    }
    let checksum_ok = checksum == check_symbol;

    let result = decode_values(&values[..values.len() - 1], start_code);
    let mut decoder_result = match result {
        Some(r) => r,
        None => return None,
    };
    if !checksum_ok {
        decoder_result.error = checksum_error("Code 128 mod-103 checksum mismatch");
    }
    if !opts.return_errors && decoder_result.error.is_error() {
        return None;
    }
    Some(RowResult {
        format: BarcodeFormat::Code128,
        result: decoder_result,
        x_start,
        x_stop,
    })
}

/// Run the code-set state machine over the data symbols (start included,
/// check symbol excluded).
fn decode_values(values: &[u32], start_code: u32) -> Option<DecoderResult> {
    let mut set = match start_code {
        CODE_START_A => CodeSet::A,
        CODE_START_B => CodeSet::B,
        _ => CodeSet::C,
    };
    let mut content = Content::new();
    let mut shift: Option<CodeSet> = None;
    let mut fnc4_shift = false;
    let mut fnc4_latch = false;
    let mut first_data = true;

    for (pos, &value) in values.iter().enumerate().skip(1) {
        let effective = shift.take().unwrap_or(set);
        match (effective, value) {
            (CodeSet::C, 0..=99) => {
                content.push(b'0' + (value / 10) as u8);
                content.push(b'0' + (value % 10) as u8);
                first_data = false;
            }
            (CodeSet::C, 100) => set = CodeSet::B,
            (CodeSet::C, 101) => set = CodeSet::A,
            (_, CODE_FNC1) => {
                if first_data && pos == 1 {
                    content.apply_fnc1_in_first_position();
                } else {
                    // Field separator inside GS1 data.
                    content.push(0x1D);
                }
                first_data = false;
            }
            (CodeSet::A, 0..=63) => {
                emit_char(&mut content, 32 + value as u8, &mut fnc4_shift, fnc4_latch);
                first_data = false;
            }
            (CodeSet::A, 64..=95) => {
                emit_char(&mut content, (value - 64) as u8, &mut fnc4_shift, fnc4_latch);
                first_data = false;
            }
            (CodeSet::B, 0..=95) => {
                emit_char(&mut content, 32 + value as u8, &mut fnc4_shift, fnc4_latch);
                first_data = false;
            }
            (_, CODE_FNC2) | (_, CODE_FNC3) => {}
            (CodeSet::A, CODE_SHIFT) => shift = Some(CodeSet::B),
            (CodeSet::B, CODE_SHIFT) => shift = Some(CodeSet::A),
            (CodeSet::A, 99) | (CodeSet::B, 99) => set = CodeSet::C,
            (CodeSet::A, 100) => set = CodeSet::B,
            (CodeSet::B, 101) => set = CodeSet::A,
            // FNC4: high-byte shift (single) or latch (doubled).
            (CodeSet::A, 101) | (CodeSet::B, 100) => {
                if fnc4_shift {
                    fnc4_shift = false;
                    fnc4_latch = !fnc4_latch;
                } else {
                    fnc4_shift = true;
                }
            }
            _ => return None,
        }
    }

    let gs1 = content.gs1;
    content.symbology = if gs1 {
        SymbologyIdentifier::new(b'C', 1)
    } else {
        SymbologyIdentifier::new(b'C', 0)
    };
    Some(DecoderResult::new(content))
}

fn emit_char(content: &mut Content, c: u8, fnc4_shift: &mut bool, fnc4_latch: bool) {
    let high = fnc4_latch != *fnc4_shift;
    *fnc4_shift = false;
    content.push(if high { c | 0x80 } else { c });
}
