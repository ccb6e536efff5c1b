//! Code One reader
//!
//! Versions A-H are square-ish matrices with a horizontal finder bar
//! group across the middle and vertical bar extensions. Codewords use
//! the Data Matrix encodation scheme over GF(256) and are placed in
//! two-row by four-column tiles in row order, per the symbology
//! standard rather than a plain module scan.

use crate::barcode::{Barcode, DecoderResult, Point, Position};
use crate::bits::BitMatrix;
use crate::content::SymbologyIdentifier;
use crate::datamatrix::decode_content;
use crate::error::checksum_error;
use crate::format::BarcodeFormat;
use crate::gf::gf256_data_matrix;
use crate::options::ReaderOptions;
use crate::rs::reed_solomon_decode;

/// Version A-H geometry: overall size, finder rows, codeword counts.
#[derive(Clone, Copy)]
pub(crate) struct C1Version {
    pub name: char,
    pub height: usize,
    pub width: usize,
    /// Rows occupied by the center finder pattern.
    pub finder_rows: usize,
    pub data_codewords: usize,
    pub ec_codewords: usize,
}

static VERSIONS: [C1Version; 8] = [
    C1Version { name: 'A', height: 16, width: 18, finder_rows: 2, data_codewords: 10, ec_codewords: 4 },
    C1Version { name: 'B', height: 22, width: 22, finder_rows: 2, data_codewords: 19, ec_codewords: 8 },
    C1Version { name: 'C', height: 28, width: 32, finder_rows: 2, data_codewords: 44, ec_codewords: 11 },
    C1Version { name: 'D', height: 40, width: 42, finder_rows: 3, data_codewords: 91, ec_codewords: 16 },
    C1Version { name: 'E', height: 52, width: 54, finder_rows: 3, data_codewords: 182, ec_codewords: 22 },
    C1Version { name: 'F', height: 70, width: 76, finder_rows: 4, data_codewords: 370, ec_codewords: 30 },
    C1Version { name: 'G', height: 104, width: 98, finder_rows: 5, data_codewords: 732, ec_codewords: 46 },
    C1Version { name: 'H', height: 148, width: 134, finder_rows: 6, data_codewords: 1480, ec_codewords: 60 },
];

impl C1Version {
    /// Rows available to data: everything but the center finder band
    /// and the top/bottom edge tracks.
    fn data_rows(&self) -> usize {
        self.height - self.finder_rows - 2
    }

    fn finder_top(&self) -> usize {
        (self.height - self.finder_rows) / 2
    }

    /// Codeword tile positions: two rows by four columns, row-major,
    /// skipping the finder band and the edge tracks.
    pub(crate) fn tile_positions(&self) -> Vec<[(usize, usize); 8]> {
        let finder_top = self.finder_top();
        let mut rows: Vec<usize> = (1..self.height - 1)
            .filter(|&y| !(finder_top..finder_top + self.finder_rows).contains(&y))
            .collect();
        rows.truncate(self.data_rows());
        let mut tiles = Vec::new();
        for row_pair in rows.chunks(2) {
            if row_pair.len() < 2 {
                break;
            }
            for col in (0..self.width).step_by(4) {
                if col + 4 > self.width {
                    break;
                }
                let mut tile = [(0usize, 0usize); 8];
                for bit in 0..8 {
                    let y = row_pair[bit / 4];
                    let x = col + bit % 4;
                    tile[bit] = (x, y);
                }
                tiles.push(tile);
            }
        }
        tiles
    }
}

pub(crate) fn read(image: &BitMatrix, opts: &ReaderOptions) -> Vec<Barcode> {
    if !opts.has_format(BarcodeFormat::CodeOne) {
        return Vec::new();
    }
    let Some((left, top, width, height)) = image.find_bounding_box(16) else {
        return Vec::new();
    };
    for version in VERSIONS.iter() {
        let module_w = width as f32 / version.width as f32;
        let module_h = height as f32 / version.height as f32;
        if (module_w - module_h).abs() > 0.3 || module_w < 1.0 || module_w.fract() > 0.01 {
            continue;
        }
        let grid = BitMatrix::from_fn(version.width, version.height, |x, y| {
            let px = left + ((x as f32 + 0.5) * module_w) as usize;
            let py = top + ((y as f32 + 0.5) * module_h) as usize;
            image.get(px.min(image.width() - 1), py.min(image.height() - 1))
        });
        if !check_finder(&grid, version) {
            continue;
        }
        let tiles = version.tile_positions();
        let total = version.data_codewords + version.ec_codewords;
        if tiles.len() < total {
            continue;
        }
        let mut codewords: Vec<u32> = tiles[..total]
            .iter()
            .map(|tile| {
                tile.iter()
                    .fold(0u32, |acc, &(x, y)| acc << 1 | u32::from(grid.get(x, y)))
            })
            .collect();
        let mut result = match reed_solomon_decode(
            gf256_data_matrix(),
            &mut codewords,
            version.ec_codewords,
        ) {
            Ok(_) => {
                let data: Vec<u8> = codewords[..version.data_codewords]
                    .iter()
                    .map(|&w| w as u8)
                    .collect();
                decode_content(&data, SymbologyIdentifier::with_eci_offset(b'O', 4, 1))
            }
            Err(_) => DecoderResult::with_error(checksum_error("Code One correction failed")),
        };
        result.version_number = (version.name as u8 - b'A' + 1) as i32;
        if result.error.is_error() && !opts.return_errors {
            continue;
        }
        let position = Position::new(
            Point::new(left as i32, top as i32),
            Point::new((left + width) as i32, top as i32),
            Point::new((left + width) as i32, (top + height) as i32),
            Point::new(left as i32, (top + height) as i32),
        );
        return vec![Barcode::new(BarcodeFormat::CodeOne, result, position)];
    }
    Vec::new()
}

/// The center finder band (alternating solid and dashed rows) plus the
/// dashed edge tracks along the top and bottom.
fn check_finder(grid: &BitMatrix, version: &C1Version) -> bool {
    let finder_top = version.finder_top();
    let mut errors = 0;
    for r in 0..version.finder_rows {
        let y = finder_top + r;
        for x in 0..version.width {
            let want = if r % 2 == 0 { true } else { x % 2 == 0 };
            errors += usize::from(grid.get(x, y) != want);
        }
    }
    for x in 0..version.width {
        errors += usize::from(grid.get(x, 0) != (x % 2 == 0));
        errors += usize::from(grid.get(x, version.height - 1) != (x % 2 == 0));
    }
    errors <= version.width / 4
}
