//! Reader dispatch
//!
//! Composes the per-format readers under one options object: the row
//! walker drives the 1D readers over scan lines alternating around the
//! vertical middle in both polarities, the 2D readers see the whole bit
//! matrix. Repeated sightings of the same linear symbol merge into one
//! result with a line count; inversion and rotation retries run when
//! the first pass comes up empty.

use crate::barcode::{Barcode, Position};
use crate::bits::BitMatrix;
use crate::error::{Error, Result};
use crate::format::{BarcodeFormat, FormatSet};
use crate::image::{binarize, denoise, downscale_by_2, ImageView};
use crate::oned::{row_readers, RowDecodeFn};
use crate::options::ReaderOptions;
use crate::pattern::PatternRow;
use crate::verbosity::zx_debug;

/// Formats this build can actually decode.
pub fn available_formats() -> FormatSet {
    let mut set = FormatSet::linear_codes();
    // Registered names with no decoder in any build yet: the stacked
    // and limited DataBar variants and two-track Pharmacode parse as
    // format names but requesting them alone reports an
    // unsupported-format error, the same contract rMQR follows below.
    for f in [
        BarcodeFormat::DataBarLimited,
        BarcodeFormat::DataBarStacked,
        BarcodeFormat::DataBarStackedOmnidirectional,
        BarcodeFormat::DataBarExpandedStacked,
        BarcodeFormat::PharmacodeTwoTrack,
    ] {
        set.remove(f);
    }
    #[cfg(not(feature = "postal"))]
    for f in [
        BarcodeFormat::AustraliaPost,
        BarcodeFormat::RM4SCC,
        BarcodeFormat::KIXCode,
        BarcodeFormat::Mailmark,
        BarcodeFormat::JapanPost,
        BarcodeFormat::USPSIMB,
        BarcodeFormat::POSTNET,
        BarcodeFormat::PLANET,
    ] {
        set.remove(f);
    }
    #[cfg(not(feature = "stacked"))]
    for f in [
        BarcodeFormat::CodablockF,
        BarcodeFormat::Code16K,
        BarcodeFormat::Code49,
    ] {
        set.remove(f);
    }
    macro_rules! matrix_feature {
        ($feature:literal, $($format:expr),+) => {
            #[cfg(feature = $feature)]
            {
                $(set.insert($format);)+
            }
        };
    }
    // rMQR is registered and parses, but its ISO/IEC 23941 version
    // tables are not carried by any build yet; requesting it alone
    // reports an unsupported-format error per the gating contract.
    matrix_feature!("qrcode", BarcodeFormat::QRCode, BarcodeFormat::MicroQRCode,
        BarcodeFormat::UPNQR);
    matrix_feature!("datamatrix", BarcodeFormat::DataMatrix);
    matrix_feature!("aztec", BarcodeFormat::Aztec, BarcodeFormat::AztecRune);
    matrix_feature!("pdf417", BarcodeFormat::PDF417);
    matrix_feature!("maxicode", BarcodeFormat::MaxiCode);
    matrix_feature!("codeone", BarcodeFormat::CodeOne);
    matrix_feature!("dotcode", BarcodeFormat::DotCode);
    matrix_feature!("gridmatrix", BarcodeFormat::GridMatrix);
    matrix_feature!("hanxin", BarcodeFormat::HanXin);
    set
}

/// Decode every symbol in the image under the given options.
pub fn read_barcodes(image: &ImageView<'_>, opts: &ReaderOptions) -> Result<Vec<Barcode>> {
    let requested = opts.effective_formats();
    if requested.intersection(available_formats()).is_empty() {
        return Err(Error::UnsupportedFormats);
    }
    let luma = image.to_luma_plane();
    let mut results = read_luma(&luma, image.width(), image.height(), opts);
    if results.is_empty() && opts.try_downscale && image.width().min(image.height()) >= 512 {
        let (small, w, h) = downscale_by_2(&luma, image.width(), image.height());
        results = read_luma(&small, w, h, opts);
        for barcode in &mut results {
            let p = barcode.position();
            barcode.set_position(scale_position(p, 2));
        }
    }
    Ok(results)
}

fn scale_position(p: Position, factor: i32) -> Position {
    let s = |pt: crate::barcode::Point| crate::barcode::Point::new(pt.x * factor, pt.y * factor);
    Position::new(
        s(p.top_left),
        s(p.top_right),
        s(p.bottom_right),
        s(p.bottom_left),
    )
}

fn read_luma(luma: &[u8], width: usize, height: usize, opts: &ReaderOptions) -> Vec<Barcode> {
    let mut matrix = binarize(luma, width, height, opts.binarizer);
    if opts.try_denoise {
        matrix = denoise(&matrix);
    }
    read_bit_matrix(&matrix, opts)
}

/// Decode from an already binarized matrix: the core §dispatch loop,
/// with inversion and rotation retries.
pub fn read_bit_matrix(matrix: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    let mut results = scan(matrix, opts);
    if results.is_empty() && opts.try_invert {
        let mut inverted = matrix.clone();
        inverted.invert();
        results = scan(&inverted, opts);
        for barcode in &mut results {
            barcode.set_inverted(true);
        }
    }
    if results.is_empty() && opts.try_rotate {
        let mut rotated = matrix.clone();
        rotated.rotate_90();
        results = scan(&rotated, opts);
        let h = matrix.height() as i32;
        for barcode in &mut results {
            let p = barcode.position();
            // Rotate corner coordinates back into the original frame.
            let back = |pt: crate::barcode::Point| crate::barcode::Point::new(h - 1 - pt.y, pt.x);
            barcode.set_position(Position::new(
                back(p.top_left),
                back(p.top_right),
                back(p.bottom_right),
                back(p.bottom_left),
            ));
            barcode.set_orientation(90);
        }
    }
    for barcode in &mut results {
        barcode.set_text_mode(opts.text_mode);
    }
    results
}

fn scan(matrix: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    let mut results = scan_linear(matrix, opts);
    if results.len() < opts.max_number_of_symbols as usize {
        results.extend(scan_matrix(matrix, opts));
    }
    // Overlapping sightings: the symbol confirmed by fewer lines loses.
    let mut keep = vec![true; results.len()];
    for i in 0..results.len() {
        for j in i + 1..results.len() {
            if keep[i]
                && keep[j]
                && results[i].position().overlaps(&results[j].position())
                && results[i].bytes() == results[j].bytes()
            {
                if results[i].line_count() >= results[j].line_count() {
                    keep[j] = false;
                } else {
                    keep[i] = false;
                }
            }
        }
    }
    let mut filtered: Vec<Barcode> = results
        .into_iter()
        .zip(keep)
        .filter_map(|(b, k)| k.then_some(b))
        .collect();
    filtered.truncate(opts.max_number_of_symbols as usize);
    filtered
}

/// The row walker: start at the vertical middle, alternate above and
/// below at a step that shrinks under `try_harder`, offering each row
/// to every enabled 1D reader in both polarities.
fn scan_linear(matrix: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    let readers: Vec<RowDecodeFn> = row_readers(opts.effective_formats()
        .intersection(available_formats()));
    let mut results: Vec<Barcode> = Vec::new();
    if !readers.is_empty() {
        let height = matrix.height();
        let step = if opts.try_harder {
            (height / 256).max(1)
        } else {
            (height / 32).max(1)
        };
        let middle = height / 2;
        let mut row_buffer = PatternRow::new();

        let mut offset = 0usize;
        loop {
            let (above, below) = (middle.checked_sub(offset), middle + offset);
            let mut rows = Vec::new();
            if let Some(y) = above {
                rows.push(y);
            }
            if offset > 0 && below < height {
                rows.push(below);
            }
            if rows.is_empty() {
                break;
            }
            for y in rows {
                matrix.get_pattern_row(y, 0, &mut row_buffer);
                for polarity in 0..2 {
                    if polarity == 1 {
                        row_buffer.reverse();
                    }
                    let view = row_buffer.view();
                    for reader in &readers {
                        let Some(row_result) = reader(&view, opts) else {
                            continue;
                        };
                        let (x_start, x_stop) = if polarity == 0 {
                            (row_result.x_start, row_result.x_stop)
                        } else {
                            let w = matrix.width() as i32;
                            (w - row_result.x_stop, w - row_result.x_start)
                        };
                        let position = Position::from_row(y as i32, x_start, x_stop);
                        merge_linear(&mut results, row_result, position, polarity == 1);
                        if confirmed_count(&results, opts) >= opts.max_number_of_symbols as usize {
                            return finish_linear(results, opts);
                        }
                    }
                }
            }
            if offset > height {
                break;
            }
            offset += step;
        }
    }
    finish_linear(results, opts)
}

fn confirmed_count(results: &[Barcode], opts: &ReaderOptions) -> usize {
    results
        .iter()
        .filter(|b| b.line_count() >= opts.min_line_count as i32)
        .count()
}

/// Merge a row sighting into the result set: same format and payload
/// in an overlapping x-range extends an existing symbol.
fn merge_linear(
    results: &mut Vec<Barcode>,
    row_result: crate::oned::RowResult,
    position: Position,
    upside_down: bool,
) {
    for existing in results.iter_mut() {
        if existing.format() == row_result.format
            && existing.bytes() == row_result.result.content.bytes()
            && existing.position().overlaps(&position)
        {
            existing.add_line(position);
            return;
        }
    }
    let mut barcode = Barcode::new(row_result.format, row_result.result, position);
    if upside_down {
        barcode.set_orientation(180);
    }
    results.push(barcode);
}

fn finish_linear(results: Vec<Barcode>, opts: &ReaderOptions) -> Vec<Barcode> {
    let min = opts.min_line_count as i32;
    results
        .into_iter()
        .filter(|b| b.line_count() >= min)
        .collect()
}

/// Drive every enabled 2D reader over the whole matrix.
fn scan_matrix(matrix: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    let mut results: Vec<Barcode> = Vec::new();
    let run = |sub: Vec<Barcode>, results: &mut Vec<Barcode>| {
        for barcode in sub {
            zx_debug!(1, "dispatch: {} symbol found", barcode.format());
            results.push(barcode);
        }
    };
    #[cfg(feature = "qrcode")]
    run(crate::qr::read(matrix, opts), &mut results);
    #[cfg(feature = "datamatrix")]
    run(crate::datamatrix::read(matrix, opts), &mut results);
    #[cfg(feature = "aztec")]
    run(crate::aztec::read(matrix, opts), &mut results);
    #[cfg(feature = "pdf417")]
    run(crate::pdf417::read(matrix, opts), &mut results);
    #[cfg(feature = "maxicode")]
    run(crate::maxicode::read(matrix, opts), &mut results);
    #[cfg(feature = "codeone")]
    run(crate::codeone::read(matrix, opts), &mut results);
    #[cfg(feature = "dotcode")]
    run(crate::dotcode::read(matrix, opts), &mut results);
    #[cfg(feature = "gridmatrix")]
    run(crate::gridmatrix::read(matrix, opts), &mut results);
    #[cfg(feature = "hanxin")]
    run(crate::hanxin::read(matrix, opts), &mut results);
    #[cfg(feature = "postal")]
    run(crate::postal::read(matrix, opts), &mut results);
    #[cfg(feature = "stacked")]
    run(crate::stacked::read(matrix, opts), &mut results);
    results
}
