//! End-to-end decode scenarios through the public API: images are
//! painted from the symbology definitions, never from the reader's own
//! tables.

use zedxing::{
    read_barcodes, BarcodeFormat, EanAddOnSymbol, ImageFormat, ImageView, ReaderOptions,
};

/// Paint a row of alternating bar/space element widths as a tall
/// luminance image with generous quiet zones.
fn paint(elements: &[u16], module_px: usize) -> (Vec<u8>, usize, usize) {
    let total: usize = elements.iter().map(|&e| e as usize).sum();
    let width = (total + 60) * module_px;
    let height = 50;
    let mut luma = vec![255u8; width * height];
    for y in 5..height - 5 {
        let mut x = 30 * module_px;
        let mut dark = true;
        for &e in elements {
            for _ in 0..(e as usize) * module_px {
                if dark {
                    luma[y * width + x] = 10;
                }
                x += 1;
            }
            dark = !dark;
        }
    }
    (luma, width, height)
}

/// EAN/UPC element widths for 13 digits, from the standard tables.
fn ean13_elements(digits: &str) -> Vec<u16> {
    const L: [[u16; 4]; 10] = [
        [3, 2, 1, 1], [2, 2, 2, 1], [2, 1, 2, 2], [1, 4, 1, 1], [1, 1, 3, 2],
        [1, 2, 3, 1], [1, 1, 1, 4], [1, 3, 1, 2], [1, 2, 1, 3], [3, 1, 1, 2],
    ];
    const PARITY: [u32; 10] = [
        0b000000, 0b001011, 0b001101, 0b001110, 0b010011,
        0b011001, 0b011100, 0b010101, 0b010110, 0b011010,
    ];
    let d: Vec<usize> = digits.bytes().map(|b| (b - b'0') as usize).collect();
    assert_eq!(d.len(), 13);
    let parity = PARITY[d[0]];
    let mut elements = vec![1, 1, 1];
    for (i, &digit) in d[1..7].iter().enumerate() {
        let widths = L[digit];
        if parity >> (5 - i) & 1 != 0 {
            elements.extend(widths.iter().rev());
        } else {
            elements.extend_from_slice(&widths);
        }
    }
    elements.extend_from_slice(&[1, 1, 1, 1, 1]);
    for &digit in &d[7..13] {
        elements.extend_from_slice(&L[digit]);
    }
    elements.extend_from_slice(&[1, 1, 1]);
    elements
}

#[test]
fn pure_upca_scenario() {
    // A UPC-A image encoding 036000291452 comes back as exactly one
    // symbol with the ]E0 identifier.
    let (luma, w, h) = paint(&ean13_elements("0036000291452"), 2);
    let view = ImageView::new(&luma, w, h, ImageFormat::Lum).unwrap();
    let opts = ReaderOptions::new().formats([BarcodeFormat::UPCA]);
    let results = read_barcodes(&view, &opts).unwrap();
    assert_eq!(results.len(), 1);
    let barcode = &results[0];
    assert_eq!(barcode.format(), BarcodeFormat::UPCA);
    assert_eq!(barcode.text(), "036000291452");
    assert_eq!(barcode.symbology_identifier(), "]E0");
}

#[test]
fn ean13_vs_upca_format_routing() {
    let (luma, w, h) = paint(&ean13_elements("0036000291452"), 2);
    let view = ImageView::new(&luma, w, h, ImageFormat::Lum).unwrap();
    let opts = ReaderOptions::new().formats([BarcodeFormat::EAN13]);
    let results = read_barcodes(&view, &opts).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].format(), BarcodeFormat::EAN13);
    assert_eq!(results[0].text(), "0036000291452");
}

#[test]
fn pharmacode_narrow_and_wide() {
    // Five narrow bars decode to 31, five wide bars to 62.
    let narrow: Vec<u16> = vec![1, 2, 1, 2, 1, 2, 1, 2, 1];
    let (luma, w, h) = paint(&narrow, 3);
    let view = ImageView::new(&luma, w, h, ImageFormat::Lum).unwrap();
    let opts = ReaderOptions::new()
        .formats([BarcodeFormat::Pharmacode])
        .try_invert(false)
        .try_rotate(false);
    let results = read_barcodes(&view, &opts).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text(), "31");

    let wide: Vec<u16> = vec![6, 2, 6, 2, 6, 2, 6, 2, 6];
    let (luma, w, h) = paint(&wide, 3);
    let view = ImageView::new(&luma, w, h, ImageFormat::Lum).unwrap();
    let results = read_barcodes(&view, &opts).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text(), "62");
}

#[test]
fn addon_policy_require() {
    // A bare EAN-13 with the add-on required yields nothing.
    let (luma, w, h) = paint(&ean13_elements("9780201379624"), 2);
    let view = ImageView::new(&luma, w, h, ImageFormat::Lum).unwrap();
    let opts = ReaderOptions::new()
        .formats([BarcodeFormat::EAN13])
        .ean_addon(EanAddOnSymbol::Require)
        .try_invert(false)
        .try_rotate(false);
    assert!(read_barcodes(&view, &opts).unwrap().is_empty());
}

#[test]
fn undecodable_format_request_errors() {
    // Formats without a decoder in this build must error up front, not
    // silently scan to an empty result.
    let luma = vec![255u8; 64 * 64];
    let view = ImageView::new(&luma, 64, 64, ImageFormat::Lum).unwrap();
    let opts = ReaderOptions::new().formats([BarcodeFormat::DataBarStacked]);
    assert!(read_barcodes(&view, &opts).is_err());
}

#[test]
fn max_number_of_symbols_caps_output() {
    let (luma, w, h) = paint(&ean13_elements("0036000291452"), 2);
    let view = ImageView::new(&luma, w, h, ImageFormat::Lum).unwrap();
    let opts = ReaderOptions::new()
        .formats([BarcodeFormat::UPCA, BarcodeFormat::EAN13])
        .max_number_of_symbols(1);
    let results = read_barcodes(&view, &opts).unwrap();
    assert_eq!(results.len(), 1);
}
