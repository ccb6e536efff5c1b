//! DX Film Edge barcode
//!
//! The data track along a 35mm film edge: a 10101 start signal, the DX
//! number (6 + 4 bits), optionally a frame number (6 bits plus a
//! half-frame flag), one even-parity bit, and a 101 stop signal. The
//! output renders as `DX1-DX2` with an optional `/frame` suffix.

use super::{find_left_guard, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::{pattern_variance, PatternView};

const START_PATTERN: [u16; 5] = [1, 1, 1, 1, 1];
/// Payload bits: DX part 1, DX part 2, parity.
const SHORT_BITS: usize = 11;
/// Payload bits including the frame number and half-frame flag.
const LONG_BITS: usize = 18;
const MAX_VARIANCE: f32 = 0.32;

pub(crate) fn decode_row(view: &PatternView<'_>, _opts: &ReaderOptions) -> Option<RowResult> {
    let (start, module) = find_left_guard(view, 5, |w| {
        if !w.has_quiet_zone_before(4.0, 5) {
            return None;
        }
        (pattern_variance(w, &START_PATTERN) < MAX_VARIANCE)
            .then(|| w.sum() as f32 / 5.0)
    })?;
    let x_start = start.pixels_in_front() as i32;

    for &bits in &[SHORT_BITS, LONG_BITS] {
        if let Some(result) = decode_payload(&start, module, bits, x_start) {
            return Some(result);
        }
    }
    None
}

fn decode_payload(
    start: &PatternView<'_>,
    module: f32,
    bit_count: usize,
    x_start: i32,
) -> Option<RowResult> {
    // Expand the runs after the start signal into module-sized bits.
    let rest = start.sub_view(5, 0)?.rest_of_row();
    let mut bits = Vec::with_capacity(bit_count + 3);
    let mut on_bar = true;
    let mut runs_used = 0;
    for i in 0..rest.len() {
        let count = (f32::from(rest.get(i)) / module).round() as usize;
        if count == 0 || count > bit_count {
            return None;
        }
        for _ in 0..count {
            bits.push(on_bar);
        }
        runs_used = i + 1;
        on_bar = !on_bar;
        if bits.len() >= bit_count + 3 {
            break;
        }
    }
    if bits.len() < bit_count + 3 {
        return None;
    }
    bits.truncate(bit_count + 3);

    // Stop signal 101 and the trailing quiet zone.
    if !(bits[bit_count] && !bits[bit_count + 1] && bits[bit_count + 2]) {
        return None;
    }
    let last = rest.sub_view(runs_used - 1, 1)?;
    if f32::from(last.space_behind().min(1000)) < 4.0 * module {
        return None;
    }
    let x_stop = (rest.pixels_in_front() as f32 + (bit_count + 3) as f32 * module) as i32;

    let read = |range: std::ops::Range<usize>| -> u32 {
        range.fold(0, |acc, i| acc << 1 | u32::from(bits[i]))
    };
    let dx1 = read(0..6);
    let dx2 = read(6..10);
    if dx1 == 0 {
        return None;
    }
    // Even parity over every payload bit.
    let ones = bits[..bit_count].iter().filter(|&&b| b).count();
    if ones % 2 != 0 {
        return None;
    }

    let mut text = format!("{dx1}-{dx2}");
    if bit_count == LONG_BITS {
        let frame = read(10..16);
        text.push_str(&format!("/{frame}"));
        if bits[16] {
            text.push('A');
        }
    }

    let mut content = Content::new();
    content.symbology = SymbologyIdentifier::new(b'X', 0);
    content.append_str(&text);
    Some(RowResult {
        format: BarcodeFormat::DXFilmEdge,
        result: DecoderResult::new(content),
        x_start,
        x_stop,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oned::test_util::row_with_quiet;
    use crate::pattern::PatternRow;

    fn encode(payload_bits: &[bool]) -> Vec<u16> {
        // Module stream: start 10101 + payload + parity slot already in
        // payload + stop 101, converted to runs.
        let mut modules = vec![true, false, true, false, true];
        modules.extend_from_slice(payload_bits);
        modules.extend_from_slice(&[true, false, true]);
        let mut elements = Vec::new();
        let mut run = 1u16;
        for i in 1..modules.len() {
            if modules[i] == modules[i - 1] {
                run += 1;
            } else {
                elements.push(run);
                run = 1;
            }
        }
        elements.push(run);
        elements
    }

    fn payload(dx1: u32, dx2: u32) -> Vec<bool> {
        let mut bits = Vec::new();
        for i in (0..6).rev() {
            bits.push(dx1 >> i & 1 != 0);
        }
        for i in (0..4).rev() {
            bits.push(dx2 >> i & 1 != 0);
        }
        let ones = bits.iter().filter(|&&b| b).count();
        bits.push(ones % 2 != 0); // even parity
        bits
    }

    fn decode(elements: &[u16]) -> Option<RowResult> {
        let row: PatternRow = row_with_quiet(elements, 10);
        decode_row(&row.view(), &ReaderOptions::new())
    }

    #[test]
    fn test_short_form() {
        let result = decode(&encode(&payload(23, 9))).unwrap();
        assert_eq!(result.format, BarcodeFormat::DXFilmEdge);
        assert_eq!(result.result.content.bytes(), b"23-9");
    }

    #[test]
    fn test_parity_rejects_flipped_bit() {
        let mut bits = payload(23, 9);
        bits[3] = !bits[3];
        assert!(decode(&encode(&bits)).is_none());
    }
}
