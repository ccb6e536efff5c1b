//! The discrete 2 of 5 family: Matrix, Industrial, IATA, Datalogic
//!
//! Numeric-only symbologies where two of five data elements per digit
//! are wide. Matrix and Datalogic encode into bars and spaces (six
//! elements per digit), Industrial and IATA into bars only with fixed
//! narrow spaces. They differ in their guard patterns.

use super::{find_left_guard, RowResult};
use crate::barcode::DecoderResult;
use crate::content::{Content, SymbologyIdentifier};
use crate::format::BarcodeFormat;
use crate::options::ReaderOptions;
use crate::pattern::{pattern_variance, PatternView};

/// Bar/space widths per digit for Matrix and Datalogic 2 of 5.
const MATRIX_DIGITS: [[u16; 6]; 10] = [
    [1, 1, 3, 3, 1, 1], [3, 1, 1, 1, 3, 1], [1, 3, 1, 1, 3, 1], [3, 3, 1, 1, 1, 1],
    [1, 1, 3, 1, 3, 1], [3, 1, 3, 1, 1, 1], [1, 3, 3, 1, 1, 1], [1, 1, 1, 3, 3, 1],
    [3, 1, 1, 3, 1, 1], [1, 3, 1, 3, 1, 1],
];

/// Bars-only encoding for Industrial and IATA: ten elements, spaces all
/// narrow.
const BARS_ONLY_DIGITS: [[u16; 10]; 10] = [
    [1, 1, 1, 1, 3, 1, 1, 3, 1, 1], [3, 1, 1, 1, 1, 1, 1, 1, 3, 1],
    [1, 1, 3, 1, 1, 1, 1, 1, 3, 1], [3, 1, 3, 1, 1, 1, 1, 1, 1, 1],
    [1, 1, 1, 1, 3, 1, 1, 1, 3, 1], [3, 1, 1, 1, 3, 1, 1, 1, 1, 1],
    [1, 1, 3, 1, 3, 1, 1, 1, 1, 1], [1, 1, 1, 1, 1, 1, 1, 3, 3, 1],
    [3, 1, 1, 1, 1, 1, 1, 3, 1, 1], [1, 1, 3, 1, 1, 1, 1, 3, 1, 1],
];

struct Variant {
    format: BarcodeFormat,
    start: &'static [u16],
    stop: &'static [u16],
    digit_len: usize,
    bars_only: bool,
}

const VARIANTS: [Variant; 4] = [
    Variant {
        format: BarcodeFormat::Matrix2of5,
        start: &[4, 1, 1, 1, 1, 1],
        stop: &[4, 1, 1, 1, 1],
        digit_len: 6,
        bars_only: false,
    },
    Variant {
        format: BarcodeFormat::Industrial2of5,
        start: &[3, 1, 3, 1, 1, 1],
        stop: &[3, 1, 3, 1, 1],
        digit_len: 10,
        bars_only: true,
    },
    Variant {
        format: BarcodeFormat::IATA2of5,
        start: &[1, 1, 1, 1],
        stop: &[3, 1, 1],
        digit_len: 10,
        bars_only: true,
    },
    Variant {
        format: BarcodeFormat::Datalogic2of5,
        start: &[1, 1, 1, 1],
        stop: &[3, 1, 1],
        digit_len: 6,
        bars_only: false,
    },
];

const MAX_VARIANCE: f32 = 0.35;
const QUIET_ZONE_MODULES: f32 = 6.0;

pub(crate) fn decode_row(view: &PatternView<'_>, opts: &ReaderOptions) -> Option<RowResult> {
    VARIANTS
        .iter()
        .filter(|v| opts.has_format(v.format))
        .find_map(|v| decode_variant(view, v))
}

fn decode_variant(view: &PatternView<'_>, variant: &Variant) -> Option<RowResult> {
    let start_modules: u16 = variant.start.iter().sum();
    let (start, _) = find_left_guard(view, variant.start.len(), |w| {
        (pattern_variance(w, variant.start) < MAX_VARIANCE
            && w.has_quiet_zone_before(QUIET_ZONE_MODULES, u32::from(start_modules)))
        .then_some(())
    })?;
    let x_start = start.pixels_in_front() as i32;

    let mut digits = Vec::new();
    let mut pos = variant.start.len();
    loop {
        if let Some(stop) = start.sub_view(pos, variant.stop.len()) {
            if pattern_variance(&stop, variant.stop) < MAX_VARIANCE
                && stop.has_quiet_zone_after(QUIET_ZONE_MODULES, 4)
                && !digits.is_empty()
            {
                if digits.len() < 3 {
                    return None;
                }
                let x_stop = stop.pixels_until_end() as i32;
                let mut content = Content::new();
                content.symbology = SymbologyIdentifier::new(b'S', 0);
                content.append(&digits);
                return Some(RowResult {
                    format: variant.format,
                    result: DecoderResult::new(content),
                    x_start,
                    x_stop,
                });
            }
        }
        let window = start.sub_view(pos, variant.digit_len)?;
        digits.push(b'0' + decode_digit(&window, variant)?);
        pos += variant.digit_len;
    }
}

fn decode_digit(view: &PatternView<'_>, variant: &Variant) -> Option<u8> {
    let mut best = MAX_VARIANCE;
    let mut winner = None;
    if variant.bars_only {
        for (digit, widths) in BARS_ONLY_DIGITS.iter().enumerate() {
            let v = pattern_variance(view, widths);
            if v < best {
                best = v;
                winner = Some(digit as u8);
            }
        }
    } else {
        for (digit, widths) in MATRIX_DIGITS.iter().enumerate() {
            let v = pattern_variance(view, widths);
            if v < best {
                best = v;
                winner = Some(digit as u8);
            }
        }
    }
    winner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oned::test_util::row_with_quiet;

    fn encode(variant: &Variant, digits: &[u8]) -> Vec<u16> {
        let mut elements = variant.start.to_vec();
        for &d in digits {
            let d = (d - b'0') as usize;
            if variant.bars_only {
                elements.extend_from_slice(&BARS_ONLY_DIGITS[d]);
            } else {
                elements.extend_from_slice(&MATRIX_DIGITS[d]);
            }
        }
        elements.extend_from_slice(variant.stop);
        elements
    }

    #[test]
    fn test_matrix_2of5() {
        let row = row_with_quiet(&encode(&VARIANTS[0], b"0123456789"), 20);
        let opts = ReaderOptions::new().formats([BarcodeFormat::Matrix2of5]);
        let result = decode_row(&row.view(), &opts).unwrap();
        assert_eq!(result.format, BarcodeFormat::Matrix2of5);
        assert_eq!(result.result.content.bytes(), b"0123456789");
    }

    #[test]
    fn test_industrial_2of5() {
        let row = row_with_quiet(&encode(&VARIANTS[1], b"777"), 20);
        let opts = ReaderOptions::new().formats([BarcodeFormat::Industrial2of5]);
        let result = decode_row(&row.view(), &opts).unwrap();
        assert_eq!(result.format, BarcodeFormat::Industrial2of5);
        assert_eq!(result.result.content.bytes(), b"777");
    }

    #[test]
    fn test_iata_2of5() {
        let row = row_with_quiet(&encode(&VARIANTS[2], b"16234"), 20);
        let opts = ReaderOptions::new().formats([BarcodeFormat::IATA2of5]);
        let result = decode_row(&row.view(), &opts).unwrap();
        assert_eq!(result.format, BarcodeFormat::IATA2of5);
        assert_eq!(result.result.content.bytes(), b"16234");
    }

    #[test]
    fn test_datalogic_2of5() {
        let row = row_with_quiet(&encode(&VARIANTS[3], b"90210"), 20);
        let opts = ReaderOptions::new().formats([BarcodeFormat::Datalogic2of5]);
        let result = decode_row(&row.view(), &opts).unwrap();
        assert_eq!(result.format, BarcodeFormat::Datalogic2of5);
        assert_eq!(result.result.content.bytes(), b"90210");
    }

    #[test]
    fn test_format_isolation() {
        // A Matrix symbol is not reported when only IATA is enabled.
        let row = row_with_quiet(&encode(&VARIANTS[0], b"0123456789"), 20);
        let opts = ReaderOptions::new().formats([BarcodeFormat::IATA2of5]);
        assert!(decode_row(&row.view(), &opts).is_none());
    }
}
