//! Channel Code
//!
//! A compact numeric symbology: a nine-module finder bar, a separating
//! space, then n bars with n-1 spaces between them (3 <= n <= 8, the
//! "channel"). The value is the ordinal of the observed width tuple in
//! the canonical enumeration over the channel's fixed data width.

use super::{find_left_guard, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::PatternView;

/// Largest encodable value per channel 3..=8.
const MAX_VALUES: [u64; 6] = [26, 292, 3493, 44072, 576688, 7742862];

/// Data width in modules per channel (bars plus inner spaces).
const CHANNEL_WIDTH: [u16; 6] = [11, 13, 15, 17, 19, 21];

/// Output digit count per channel.
const CHANNEL_DIGITS: [usize; 6] = [2, 3, 4, 5, 6, 7];

const FINDER_MODULES: u16 = 9;
/// Space between the finder bar and the first data bar.
const GAP_MODULES: u16 = 2;
const MAX_ELEMENT: u16 = 8;

pub(crate) fn decode_row(view: &PatternView<'_>, _opts: &ReaderOptions) -> Option<RowResult> {
    // The finder is a lone bar nine modules wide; its width fixes the
    // module size for the whole symbol.
    let (finder, module) = find_left_guard(view, 1, |w| {
        let width = f32::from(w.get(0));
        let module = width / f32::from(FINDER_MODULES);
        (module >= 1.0 && f32::from(w.space_in_front()) >= 6.0 * module).then_some(module)
    })?;
    let x_start = finder.pixels_in_front() as i32;

    for channel in 3..=8usize {
        if let Some(result) = decode_channel(&finder, module, channel, x_start) {
            return Some(result);
        }
    }
    None
}

fn decode_channel(
    finder: &PatternView<'_>,
    module: f32,
    channel: usize,
    x_start: i32,
) -> Option<RowResult> {
    let idx = channel - 3;
    let element_count = 2 * channel - 1;
    // Skip the finder bar and separating gap.
    let gap = finder.sub_view(1, 1)?;
    let gap_modules = (f32::from(gap.get(0)) / module).round() as u16;
    if gap_modules != GAP_MODULES {
        return None;
    }
    let data = finder.sub_view(2, element_count)?;
    if !data.has_quiet_zone_after(4.0, u32::from(CHANNEL_WIDTH[idx])) {
        return None;
    }

    let mut elements = Vec::with_capacity(element_count);
    let mut total = 0u16;
    for i in 0..element_count {
        let width = (f32::from(data.get(i)) / module).round() as u16;
        if !(1..=MAX_ELEMENT).contains(&width) {
            return None;
        }
        total += width;
        elements.push(width);
    }
    if total != CHANNEL_WIDTH[idx] {
        return None;
    }

    let value = tuple_rank(&elements, CHANNEL_WIDTH[idx])?;
    if value > MAX_VALUES[idx] {
        return None;
    }

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'X', 0);
    content.append_str(&format!("{:0width$}", value, width = CHANNEL_DIGITS[idx]));
    Some(RowResult {
        format: BarcodeFormat::ChannelCode,
        result: DecoderResult::new(content),
        x_start,
        x_stop: data.pixels_until_end() as i32,
    })
}

/// Number of ways to write `width` as `count` ordered elements of
/// 1..=MAX_ELEMENT, by dynamic programming over (elements, width).
fn compositions(count: usize, width: u16) -> u64 {
    let width = width as usize;
    let mut table = vec![0u64; width + 1];
    table[0] = 1;
    for _ in 0..count {
        let mut next = vec![0u64; width + 1];
        for w in 0..=width {
            if table[w] == 0 {
                continue;
            }
            for v in 1..=usize::from(MAX_ELEMENT).min(width - w) {
                next[w + v] += table[w];
            }
        }
        table = next;
    }
    table[width]
}

/// Ordinal of the element tuple in lexicographic enumeration of all
/// valid tuples with the same length and width.
fn tuple_rank(elements: &[u16], width: u16) -> Option<u64> {
    let mut rank = 0u64;
    let mut remaining = width;
    for (i, &e) in elements.iter().enumerate() {
        for v in 1..e {
            if remaining >= v {
                rank += compositions(elements.len() - i - 1, remaining - v);
            }
        }
        remaining = remaining.checked_sub(e)?;
    }
    Some(rank)
}

/// Inverse of [`tuple_rank`], used by the tests to synthesize symbols.
#[cfg(test)]
fn tuple_of_rank(mut rank: u64, count: usize, width: u16) -> Option<Vec<u16>> {
    let mut out = Vec::with_capacity(count);
    let mut remaining = width;
    for i in 0..count {
        let mut chosen = None;
        for v in 1..=MAX_ELEMENT.min(remaining) {
            let below = compositions(count - i - 1, remaining - v);
            if rank < below {
                chosen = Some(v);
                break;
            }
            rank -= below;
        }
        let v = chosen?;
        out.push(v);
        remaining -= v;
    }
    (remaining == 0).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oned::test_util::row_with_quiet;

    fn encode(channel: usize, value: u64) -> Vec<u16> {
        let idx = channel - 3;
        let elements =
            tuple_of_rank(value, 2 * channel - 1, CHANNEL_WIDTH[idx]).expect("encodable value");
        let mut out = vec![FINDER_MODULES, GAP_MODULES];
        out.extend(elements);
        out
    }

    #[test]
    fn test_rank_round_trip() {
        for rank in [0u64, 1, 25, 100, 292] {
            let tuple = tuple_of_rank(rank, 7, 13);
            if let Some(tuple) = tuple {
                assert_eq!(tuple_rank(&tuple, 13), Some(rank));
            }
        }
    }

    #[test]
    fn test_channel_3() {
        let row = row_with_quiet(&encode(3, 17), 12);
        let result = decode_row(&row.view(), &ReaderOptions::new()).unwrap();
        assert_eq!(result.format, BarcodeFormat::ChannelCode);
        assert_eq!(result.result.content.bytes(), b"17");
    }

    #[test]
    fn test_channel_4_padding() {
        let row = row_with_quiet(&encode(4, 7), 12);
        let result = decode_row(&row.view(), &ReaderOptions::new()).unwrap();
        assert_eq!(result.result.content.bytes(), b"007");
    }

    #[test]
    fn test_out_of_range_value_rejected() {
        // Channel 3 tuples beyond rank 26 exist geometrically but are
        // not legal Channel Code values.
        let row = row_with_quiet(&encode(3, 40), 12);
        assert!(decode_row(&row.view(), &ReaderOptions::new()).is_none());
    }
}
