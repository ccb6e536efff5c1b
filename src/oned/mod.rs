//! One-dimensional (row) readers
//!
//! Every reader in this module implements the same contract: given a
//! [`PatternView`] spanning one scan line, find and decode at most one
//! symbol, reporting the pixel range it covered so the dispatch layer can
//! continue behind it. Readers are pure functions of the view and the
//! options; per-row state (code set shifts, numeric compaction) lives in
//! local variables for the duration of one call.

use crate::barcode::DecoderResult;
use crate::format::{BarcodeFormat, FormatSet};
use crate::options::ReaderOptions;
use crate::pattern::PatternView;

pub(crate) mod channel;
pub(crate) mod codabar;
pub(crate) mod code11;
pub(crate) mod code128;
pub(crate) mod code39;
pub(crate) mod code93;
pub(crate) mod databar;
pub(crate) mod dxfilmedge;
pub(crate) mod itf;
pub(crate) mod koreapost;
pub(crate) mod msi;
pub(crate) mod pharmacode;
pub(crate) mod telepen;
pub(crate) mod twooffive;
pub(crate) mod upcean;

/// One decoded symbol on one row.
pub(crate) struct RowResult {
    pub format: BarcodeFormat,
    pub result: DecoderResult,
    /// Pixel column of the first bar (including none of the quiet zone).
    pub x_start: i32,
    /// Pixel column just past the last bar.
    pub x_stop: i32,
}

/// The per-reader entry point.
pub(crate) type RowDecodeFn = fn(&PatternView<'_>, &ReaderOptions) -> Option<RowResult>;

/// The row readers that can produce something from the enabled format
/// set, in fixed priority order.
pub(crate) fn row_readers(formats: FormatSet) -> Vec<RowDecodeFn> {
    use BarcodeFormat::*;
    let mut readers: Vec<RowDecodeFn> = Vec::new();
    let has = |list: &[BarcodeFormat]| list.iter().any(|f| formats.contains(*f));

    if has(&[EAN13, EAN8, UPCA, UPCE]) {
        readers.push(upcean::decode_row);
    }
    if has(&[Code39, Code32, LOGMARS, PZN]) {
        readers.push(code39::decode_row);
    }
    if has(&[Code93]) {
        readers.push(code93::decode_row);
    }
    if has(&[Code128]) {
        readers.push(code128::decode_row);
    }
    if has(&[Codabar]) {
        readers.push(codabar::decode_row);
    }
    if has(&[Code11]) {
        readers.push(code11::decode_row);
    }
    if has(&[ITF, DeutschePostLeitcode, DeutschePostIdentcode]) {
        readers.push(itf::decode_row);
    }
    if has(&[MSI]) {
        readers.push(msi::decode_row);
    }
    if has(&[Telepen]) {
        readers.push(telepen::decode_row);
    }
    if has(&[DataBar]) {
        readers.push(databar::decode_row);
    }
    if has(&[DataBarExpanded]) {
        readers.push(databar::decode_expanded_row);
    }
    if has(&[Matrix2of5, Industrial2of5, IATA2of5, Datalogic2of5]) {
        readers.push(twooffive::decode_row);
    }
    if has(&[ChannelCode]) {
        readers.push(channel::decode_row);
    }
    if has(&[KoreaPost]) {
        readers.push(koreapost::decode_row);
    }
    if has(&[DXFilmEdge]) {
        readers.push(dxfilmedge::decode_row);
    }
    if has(&[Pharmacode]) {
        readers.push(pharmacode::decode_row);
    }
    readers
}

// ============================================================================
// Shared row machinery
// ============================================================================

/// Slide a `len`-run window across the row, bar-aligned, until `test`
/// accepts one. The window and the test's payload are returned.
pub(crate) fn find_left_guard<'a, T>(
    view: &PatternView<'a>,
    len: usize,
    mut test: impl FnMut(&PatternView<'a>) -> Option<T>,
) -> Option<(PatternView<'a>, T)> {
    let mut offset = usize::from(!view.starts_on_bar());
    while let Some(window) = view.sub_view(offset, len) {
        if let Some(payload) = test(&window) {
            return Some((window, payload));
        }
        offset += 2;
    }
    None
}

/// Classify `n` runs into narrow/wide by splitting at the midpoint of the
/// extreme run widths. Returns a wide-element bitmask, first run at the
/// most significant bit, or `None` when the widths do not separate into
/// two groups (all-narrow windows yield mask 0 only when `allow_flat`).
pub(crate) fn narrow_wide_mask(view: &PatternView<'_>, allow_flat: bool) -> Option<u32> {
    let n = view.len();
    debug_assert!(n <= 32);
    let mut min = u16::MAX;
    let mut max = 0u16;
    for i in 0..n {
        let w = view.get(i);
        if w == 0 {
            return None;
        }
        min = min.min(w);
        max = max.max(w);
    }
    if max < 2 * min {
        // No credible wide element in the window.
        return allow_flat.then_some(0);
    }
    let threshold = (min + max + 1) / 2;
    let mut mask = 0u32;
    for i in 0..n {
        mask = (mask << 1) | u32::from(view.get(i) >= threshold);
    }
    Some(mask)
}

/// Standard weighted checksum: sum of digit × weight over `digits`
/// (rightmost digit gets the first weight), reduced mod `modulus`.
pub(crate) fn weighted_mod_checksum(digits: &[u8], weights: &[u32], modulus: u32) -> u32 {
    digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| u32::from(d - b'0') * weights[i % weights.len()])
        .sum::<u32>()
        % modulus
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::pattern::PatternRow;

    /// Build a pattern row from module widths: quiet zone, the given
    /// elements (starting on a bar), quiet zone.
    pub(crate) fn row_with_quiet(elements: &[u16], quiet: u16) -> PatternRow {
        let mut runs = Vec::with_capacity(elements.len() + 2);
        runs.push(quiet);
        runs.extend_from_slice(elements);
        if elements.len() % 2 == 1 {
            runs.push(quiet);
        } else {
            // Row must end after a bar for the trailing quiet zone to
            // be a distinct run.
            *runs.last_mut().unwrap() += quiet;
        }
        PatternRow::from(runs)
    }

    /// Scale every element by a constant pixel-per-module factor.
    pub(crate) fn scaled(elements: &[u16], scale: u16) -> Vec<u16> {
        elements.iter().map(|&e| e * scale).collect()
    }
}
