//! QR symbol versions and error correction block layout
//!
//! ISO/IEC 18004 table 9: per version and EC level, the number of RS
//! blocks and data codewords per block. Standard versions 1-40, Micro
//! M1-M4, and the rMQR rectangular sizes.

/// Error correction level, in format-bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcLevel {
    L,
    M,
    Q,
    H,
}

impl EcLevel {
    pub fn from_bits(bits: u32) -> EcLevel {
        match bits {
            0b01 => EcLevel::L,
            0b00 => EcLevel::M,
            0b11 => EcLevel::Q,
            _ => EcLevel::H,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EcLevel::L => "L",
            EcLevel::M => "M",
            EcLevel::Q => "Q",
            EcLevel::H => "H",
        }
    }
}

/// One run of equal-sized RS blocks.
#[derive(Debug, Clone, Copy)]
pub struct BlockRun {
    pub count: u8,
    pub data_codewords: u8,
}

/// EC block layout for one (version, level) pair.
#[derive(Debug, Clone, Copy)]
pub struct EcBlocks {
    pub ec_codewords_per_block: u8,
    pub runs: [BlockRun; 2],
}

impl EcBlocks {
    const fn one(ec: u8, count: u8, data: u8) -> Self {
        Self {
            ec_codewords_per_block: ec,
            runs: [
                BlockRun {
                    count,
                    data_codewords: data,
                },
                BlockRun {
                    count: 0,
                    data_codewords: 0,
                },
            ],
        }
    }

    const fn two(ec: u8, c1: u8, d1: u8, c2: u8, d2: u8) -> Self {
        Self {
            ec_codewords_per_block: ec,
            runs: [
                BlockRun {
                    count: c1,
                    data_codewords: d1,
                },
                BlockRun {
                    count: c2,
                    data_codewords: d2,
                },
            ],
        }
    }

    pub fn total_blocks(&self) -> usize {
        self.runs.iter().map(|r| usize::from(r.count)).sum()
    }

    pub fn total_data_codewords(&self) -> usize {
        self.runs
            .iter()
            .map(|r| usize::from(r.count) * usize::from(r.data_codewords))
            .sum()
    }

    pub fn total_codewords(&self) -> usize {
        self.total_data_codewords()
            + self.total_blocks() * usize::from(self.ec_codewords_per_block)
    }
}

/// Per-version EC layouts in L, M, Q, H order.
#[rustfmt::skip]
const EC_BLOCKS: [[EcBlocks; 4]; 40] = [
    [EcBlocks::one(7, 1, 19), EcBlocks::one(10, 1, 16), EcBlocks::one(13, 1, 13), EcBlocks::one(17, 1, 9)],
    [EcBlocks::one(10, 1, 34), EcBlocks::one(16, 1, 28), EcBlocks::one(22, 1, 22), EcBlocks::one(28, 1, 16)],
    [EcBlocks::one(15, 1, 55), EcBlocks::one(26, 1, 44), EcBlocks::one(18, 2, 17), EcBlocks::one(22, 2, 13)],
    [EcBlocks::one(20, 1, 80), EcBlocks::one(18, 2, 32), EcBlocks::one(26, 2, 24), EcBlocks::one(16, 4, 9)],
    [EcBlocks::one(26, 1, 108), EcBlocks::one(24, 2, 43), EcBlocks::two(18, 2, 15, 2, 16), EcBlocks::two(22, 2, 11, 2, 12)],
    [EcBlocks::one(18, 2, 68), EcBlocks::one(16, 4, 27), EcBlocks::one(24, 4, 19), EcBlocks::one(28, 4, 15)],
    [EcBlocks::one(20, 2, 78), EcBlocks::one(18, 4, 31), EcBlocks::two(18, 2, 14, 4, 15), EcBlocks::two(26, 4, 13, 1, 14)],
    [EcBlocks::one(24, 2, 97), EcBlocks::two(22, 2, 38, 2, 39), EcBlocks::two(22, 4, 18, 2, 19), EcBlocks::two(26, 4, 14, 2, 15)],
    [EcBlocks::one(30, 2, 116), EcBlocks::two(22, 3, 36, 2, 37), EcBlocks::two(20, 4, 16, 4, 17), EcBlocks::two(24, 4, 12, 4, 13)],
    [EcBlocks::two(18, 2, 68, 2, 69), EcBlocks::two(26, 4, 43, 1, 44), EcBlocks::two(24, 6, 19, 2, 20), EcBlocks::two(28, 6, 15, 2, 16)],
    [EcBlocks::one(20, 4, 81), EcBlocks::two(30, 1, 50, 4, 51), EcBlocks::two(28, 4, 22, 4, 23), EcBlocks::two(24, 3, 12, 8, 13)],
    [EcBlocks::two(24, 2, 92, 2, 93), EcBlocks::two(22, 6, 36, 2, 37), EcBlocks::two(26, 4, 20, 6, 21), EcBlocks::two(28, 7, 14, 4, 15)],
    [EcBlocks::one(26, 4, 107), EcBlocks::two(22, 8, 37, 1, 38), EcBlocks::two(24, 8, 20, 4, 21), EcBlocks::two(22, 12, 11, 4, 12)],
    [EcBlocks::two(30, 3, 115, 1, 116), EcBlocks::two(24, 4, 40, 5, 41), EcBlocks::two(20, 11, 16, 5, 17), EcBlocks::two(24, 11, 12, 5, 13)],
    [EcBlocks::two(22, 5, 87, 1, 88), EcBlocks::two(24, 5, 41, 5, 42), EcBlocks::two(30, 5, 24, 7, 25), EcBlocks::two(24, 11, 12, 7, 13)],
    [EcBlocks::two(24, 5, 98, 1, 99), EcBlocks::two(28, 7, 45, 3, 46), EcBlocks::two(24, 15, 19, 2, 20), EcBlocks::two(30, 3, 15, 13, 16)],
    [EcBlocks::two(28, 1, 107, 5, 108), EcBlocks::two(28, 10, 46, 1, 47), EcBlocks::two(28, 1, 22, 15, 23), EcBlocks::two(28, 2, 14, 17, 15)],
    [EcBlocks::two(30, 5, 120, 1, 121), EcBlocks::two(26, 9, 43, 4, 44), EcBlocks::two(28, 17, 22, 1, 23), EcBlocks::two(28, 2, 14, 19, 15)],
    [EcBlocks::two(28, 3, 113, 4, 114), EcBlocks::two(26, 3, 44, 11, 45), EcBlocks::two(26, 17, 21, 4, 22), EcBlocks::two(26, 9, 13, 16, 14)],
    [EcBlocks::two(28, 3, 107, 5, 108), EcBlocks::two(26, 3, 41, 13, 42), EcBlocks::two(30, 15, 24, 5, 25), EcBlocks::two(28, 15, 15, 10, 16)],
    [EcBlocks::two(28, 4, 116, 4, 117), EcBlocks::one(26, 17, 42), EcBlocks::two(28, 17, 22, 6, 23), EcBlocks::two(30, 19, 16, 6, 17)],
    [EcBlocks::two(28, 2, 111, 7, 112), EcBlocks::one(28, 17, 46), EcBlocks::two(30, 7, 24, 16, 25), EcBlocks::one(24, 34, 13)],
    [EcBlocks::two(30, 4, 121, 5, 122), EcBlocks::two(28, 4, 47, 14, 48), EcBlocks::two(30, 11, 24, 14, 25), EcBlocks::two(30, 16, 15, 14, 16)],
    [EcBlocks::two(30, 6, 117, 4, 118), EcBlocks::two(28, 6, 45, 14, 46), EcBlocks::two(30, 11, 24, 16, 25), EcBlocks::two(30, 30, 16, 2, 17)],
    [EcBlocks::two(26, 8, 106, 4, 107), EcBlocks::two(28, 8, 47, 13, 48), EcBlocks::two(30, 7, 24, 22, 25), EcBlocks::two(30, 22, 15, 13, 16)],
    [EcBlocks::two(28, 10, 114, 2, 115), EcBlocks::two(28, 19, 46, 4, 47), EcBlocks::two(28, 28, 22, 6, 23), EcBlocks::two(30, 33, 16, 4, 17)],
    [EcBlocks::two(30, 8, 122, 4, 123), EcBlocks::two(28, 22, 45, 3, 46), EcBlocks::two(30, 8, 23, 26, 24), EcBlocks::two(30, 12, 15, 28, 16)],
    [EcBlocks::two(30, 3, 117, 10, 118), EcBlocks::two(28, 3, 45, 23, 46), EcBlocks::two(30, 4, 24, 31, 25), EcBlocks::two(30, 11, 15, 31, 16)],
    [EcBlocks::two(30, 7, 116, 7, 117), EcBlocks::two(28, 21, 45, 7, 46), EcBlocks::two(30, 1, 23, 37, 24), EcBlocks::two(30, 19, 15, 26, 16)],
    [EcBlocks::two(30, 5, 115, 10, 116), EcBlocks::two(28, 19, 47, 10, 48), EcBlocks::two(30, 15, 24, 25, 25), EcBlocks::two(30, 23, 15, 25, 16)],
    [EcBlocks::two(30, 13, 115, 3, 116), EcBlocks::two(28, 2, 46, 29, 47), EcBlocks::two(30, 42, 24, 1, 25), EcBlocks::two(30, 23, 15, 28, 16)],
    [EcBlocks::one(30, 17, 115), EcBlocks::two(28, 10, 46, 23, 47), EcBlocks::two(30, 10, 24, 35, 25), EcBlocks::two(30, 19, 15, 35, 16)],
    [EcBlocks::two(30, 17, 115, 1, 116), EcBlocks::two(28, 14, 46, 21, 47), EcBlocks::two(30, 29, 24, 19, 25), EcBlocks::two(30, 11, 15, 46, 16)],
    [EcBlocks::two(30, 13, 115, 6, 116), EcBlocks::two(28, 14, 46, 23, 47), EcBlocks::two(30, 44, 24, 7, 25), EcBlocks::two(30, 59, 16, 1, 17)],
    [EcBlocks::two(30, 12, 121, 7, 122), EcBlocks::two(28, 12, 47, 26, 48), EcBlocks::two(30, 39, 24, 14, 25), EcBlocks::two(30, 22, 15, 41, 16)],
    [EcBlocks::two(30, 6, 121, 14, 122), EcBlocks::two(28, 6, 47, 34, 48), EcBlocks::two(30, 46, 24, 10, 25), EcBlocks::two(30, 2, 15, 64, 16)],
    [EcBlocks::two(30, 17, 122, 4, 123), EcBlocks::two(28, 29, 46, 14, 47), EcBlocks::two(30, 49, 24, 10, 25), EcBlocks::two(30, 24, 15, 46, 16)],
    [EcBlocks::two(30, 4, 122, 18, 123), EcBlocks::two(28, 13, 46, 32, 47), EcBlocks::two(30, 48, 24, 14, 25), EcBlocks::two(30, 42, 15, 32, 16)],
    [EcBlocks::two(30, 20, 117, 4, 118), EcBlocks::two(28, 40, 47, 7, 48), EcBlocks::two(30, 43, 24, 22, 25), EcBlocks::two(30, 10, 15, 67, 16)],
    [EcBlocks::two(30, 19, 118, 6, 119), EcBlocks::two(28, 18, 47, 31, 48), EcBlocks::two(30, 34, 24, 34, 25), EcBlocks::two(30, 20, 15, 61, 16)],
];

/// Alignment pattern center coordinates per version (row and column).
#[rustfmt::skip]
const ALIGNMENT_CENTERS: [&[usize]; 40] = [
    &[], &[6, 18], &[6, 22], &[6, 26], &[6, 30], &[6, 34],
    &[6, 22, 38], &[6, 24, 42], &[6, 26, 46], &[6, 28, 50], &[6, 30, 54],
    &[6, 32, 58], &[6, 34, 62], &[6, 26, 46, 66], &[6, 26, 48, 70],
    &[6, 26, 50, 74], &[6, 30, 54, 78], &[6, 30, 56, 82], &[6, 30, 58, 86],
    &[6, 34, 62, 90], &[6, 28, 50, 72, 94], &[6, 26, 50, 74, 98],
    &[6, 30, 54, 78, 102], &[6, 28, 54, 80, 106], &[6, 32, 58, 84, 110],
    &[6, 30, 58, 86, 114], &[6, 34, 62, 90, 118], &[6, 26, 50, 74, 98, 122],
    &[6, 30, 54, 78, 102, 126], &[6, 26, 52, 78, 104, 130],
    &[6, 30, 56, 82, 108, 134], &[6, 34, 60, 86, 112, 138],
    &[6, 30, 58, 86, 114, 142], &[6, 34, 62, 90, 118, 146],
    &[6, 30, 54, 78, 102, 126, 150], &[6, 24, 50, 76, 102, 128, 154],
    &[6, 28, 54, 80, 106, 132, 158], &[6, 32, 58, 84, 110, 136, 162],
    &[6, 26, 54, 82, 110, 138, 166], &[6, 30, 58, 86, 114, 142, 170],
];

/// A standard QR version 1..=40.
#[derive(Debug, Clone, Copy)]
pub struct Version {
    pub number: usize,
}

impl Version {
    pub fn from_number(number: usize) -> Option<Version> {
        (1..=40).contains(&number).then_some(Version { number })
    }

    pub fn from_dimension(dimension: usize) -> Option<Version> {
        if dimension < 21 || dimension > 177 || (dimension - 21) % 4 != 0 {
            return None;
        }
        Self::from_number((dimension - 21) / 4 + 1)
    }

    pub fn dimension(&self) -> usize {
        21 + 4 * (self.number - 1)
    }

    pub fn ec_blocks(&self, level: EcLevel) -> &'static EcBlocks {
        &EC_BLOCKS[self.number - 1][level as usize]
    }

    pub fn alignment_centers(&self) -> &'static [usize] {
        ALIGNMENT_CENTERS[self.number - 1]
    }

    /// Total codewords the symbol can hold, from the module geometry.
    pub fn total_codewords(&self) -> usize {
        self.ec_blocks(EcLevel::L).total_codewords()
    }
}

/// Micro QR version M1..M4.
#[derive(Debug, Clone, Copy)]
pub struct MicroVersion {
    pub number: usize,
}

/// (total codewords, [data codewords per level L,M,Q; 0 = level
/// unsupported]). M1 and M3 end in a 4-bit half codeword, counted here
/// as a full final codeword of 4 data bits.
const MICRO_LAYOUT: [(usize, [usize; 3], [u8; 3]); 4] = [
    (5, [3, 0, 0], [2, 0, 0]),
    (10, [5, 4, 0], [5, 6, 0]),
    (17, [11, 9, 0], [6, 8, 0]),
    (24, [16, 14, 10], [8, 10, 14]),
];

impl MicroVersion {
    pub fn from_dimension(dimension: usize) -> Option<MicroVersion> {
        if !(11..=17).contains(&dimension) || dimension % 2 == 0 {
            return None;
        }
        Some(MicroVersion {
            number: (dimension - 11) / 2 + 1,
        })
    }

    pub fn dimension(&self) -> usize {
        11 + 2 * (self.number - 1)
    }

    pub fn total_codewords(&self) -> usize {
        MICRO_LAYOUT[self.number - 1].0
    }

    /// Data codeword count for the level index (0 = L or the only
    /// level, 1 = M, 2 = Q), `None` when the version lacks the level.
    pub fn data_codewords(&self, level_index: usize) -> Option<usize> {
        let count = MICRO_LAYOUT[self.number - 1].1[level_index];
        (count > 0 || (self.number == 1 && level_index == 0)).then_some(count)
    }

    pub fn ec_codewords(&self, level_index: usize) -> u8 {
        MICRO_LAYOUT[self.number - 1].2[level_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_dimension_round_trip() {
        for n in 1..=40 {
            let v = Version::from_number(n).unwrap();
            assert_eq!(Version::from_dimension(v.dimension()).unwrap().number, n);
        }
        assert!(Version::from_dimension(22).is_none());
        assert!(Version::from_dimension(181).is_none());
    }

    #[test]
    fn test_total_codewords_consistent_across_levels() {
        // Transcription check: every level of a version must describe
        // the same symbol capacity.
        for n in 1..=40 {
            let v = Version::from_number(n).unwrap();
            let total = v.ec_blocks(EcLevel::L).total_codewords();
            for level in [EcLevel::M, EcLevel::Q, EcLevel::H] {
                assert_eq!(
                    v.ec_blocks(level).total_codewords(),
                    total,
                    "version {n} level {level:?}"
                );
            }
        }
    }

    #[test]
    fn test_capacity_matches_module_count() {
        // Data modules = dimension^2 - function patterns; must equal
        // 8 * codewords (+ remainder bits).
        for n in [1usize, 7, 14, 25, 40] {
            let v = Version::from_number(n).unwrap();
            let dim = v.dimension();
            let mut function = 3 * 64 // finders with separators
                + 2 * (dim - 16) // timing
                + 31; // format info + dark module
            let centers = v.alignment_centers().len();
            if centers > 0 {
                let total_aligns = centers * centers - 3;
                function += total_aligns * 25;
                // Alignment patterns overlapping timing lines.
                function -= (centers.saturating_sub(2)) * 2 * 5;
            }
            if n >= 7 {
                function += 36; // version info blocks
            }
            let data_bits = dim * dim - function;
            let codewords = v.total_codewords();
            assert!(
                data_bits >= codewords * 8 && data_bits < codewords * 8 + 8,
                "version {n}: {data_bits} bits vs {codewords} codewords"
            );
        }
    }

    #[test]
    fn test_known_block_layouts() {
        let v5 = Version::from_number(5).unwrap();
        let q = v5.ec_blocks(EcLevel::Q);
        assert_eq!(q.ec_codewords_per_block, 18);
        assert_eq!(q.total_blocks(), 4);
        assert_eq!(q.total_data_codewords(), 62);

        let v15 = Version::from_number(15).unwrap();
        assert_eq!(v15.ec_blocks(EcLevel::M).total_data_codewords(), 415);
    }
}
