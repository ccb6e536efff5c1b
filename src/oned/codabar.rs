//! Codabar
//!
//! Seven elements per character, four bars and three spaces. The four
//! start/stop letters A-D frame the symbol and are kept in the output,
//! the common convention for library and blood-bank applications.

use super::{find_left_guard, narrow_wide_mask, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::PatternView;

const ALPHABET: &[u8] = b"0123456789-$:/.+ABCD";

/// Wide-element masks over 7 elements, first element at bit 6.
const CHARACTER_ENCODINGS: [u32; 20] = [
    0x003, 0x006, 0x009, 0x060, 0x012, 0x042, 0x021, 0x024, 0x030, 0x048, // 0-9
    0x00C, 0x018, 0x045, 0x051, 0x054, 0x015, // - $ : / . +
    0x01A, 0x029, 0x00B, 0x00E, // A B C D
];

const QUIET_ZONE_MODULES: f32 = 5.0;
const CHAR_MODULES: u32 = 10;

fn lookup(mask: u32) -> Option<u8> {
    CHARACTER_ENCODINGS
        .iter()
        .position(|&enc| enc == mask)
        .map(|i| ALPHABET[i])
}

fn is_start_stop(c: u8) -> bool {
    (b'A'..=b'D').contains(&c)
}

pub(crate) fn decode_row(view: &PatternView<'_>, _opts: &ReaderOptions) -> Option<RowResult> {
    let (start, first) = find_left_guard(view, 7, |w| {
        if !w.has_quiet_zone_before(QUIET_ZONE_MODULES, CHAR_MODULES) {
            return None;
        }
        narrow_wide_mask(w, false)
            .and_then(lookup)
            .filter(|c| is_start_stop(*c))
    })?;
    let x_start = start.pixels_in_front() as i32;

    let mut text = vec![first];
    let mut next = start;
    loop {
        next = next.sub_view(8, 7)?;
        let c = lookup(narrow_wide_mask(&next, false)?)?;
        text.push(c);
        if is_start_stop(c) {
            break;
        }
    }
    if text.len() < 3 || !next.has_quiet_zone_after(QUIET_ZONE_MODULES, CHAR_MODULES) {
        return None;
    }
    let x_stop = next.pixels_until_end() as i32;

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'F', 0);
    content.append(&text);
    Some(RowResult {
        format: BarcodeFormat::Codabar,
        result: DecoderResult::new(content),
        x_start,
        x_stop,
    })
}
