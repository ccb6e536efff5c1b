//! Pharmacode (Laetus one-track)
//!
//! No guards and no check digit: 2 to 16 bars, each narrow or wide
//! (three times the narrow width), read right to left. A narrow bar in
//! position n contributes 2^n, a wide bar twice that. Legal values span
//! 3 to 131070.

use super::{find_left_guard, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::PatternView;

const MIN_BARS: usize = 2;
const MAX_BARS: usize = 16;
const MIN_VALUE: u64 = 3;
const MAX_VALUE: u64 = 131_070;

pub(crate) fn decode_row(view: &PatternView<'_>, _opts: &ReaderOptions) -> Option<RowResult> {
    let (start, _) = find_left_guard(view, 1, |w| {
        // A symbol begins at a bar with a generous quiet zone before it.
        (f32::from(w.space_in_front()) >= 4.0 * f32::from(w.get(0))).then_some(())
    })?;

    // Collect bars until the inter-bar space stops looking like one.
    // The spaces are uniform and anchor the module size, which settles
    // the narrow/wide question even in all-wide symbols.
    let mut widths = vec![start.get(0)];
    let mut min_space = u16::MAX;
    let mut last = start;
    while widths.len() < MAX_BARS {
        let space = last.space_behind();
        let Some(next) = last.sub_view(2, 1) else {
            break;
        };
        let narrow = *widths.iter().min().unwrap();
        if space == u16::MAX || space > narrow * 3 {
            break;
        }
        min_space = min_space.min(space);
        widths.push(next.get(0));
        last = next;
    }
    if widths.len() < MIN_BARS
        || f32::from(last.space_behind().min(1000)) < 4.0 * f32::from(last.get(0))
    {
        return None;
    }

    let wide_threshold = min_space * 2;
    let mut value = 0u64;
    for (n, &w) in widths.iter().rev().enumerate() {
        if w > min_space * 6 {
            return None;
        }
        let contribution = 1u64 << n;
        value += if w > wide_threshold {
            contribution * 2
        } else {
            contribution
        };
    }
    if !(MIN_VALUE..=MAX_VALUE).contains(&value) {
        return None;
    }

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'X', 0);
    content.append_str(&value.to_string());
    Some(RowResult {
        format: BarcodeFormat::Pharmacode,
        result: DecoderResult::new(content),
        x_start: start.pixels_in_front() as i32,
        x_stop: last.pixels_until_end() as i32,
    })
}
