//! Barcode format registry
//!
//! Every symbology this library knows about is one [`BarcodeFormat`] value
//! backed by a single bit, so sets of formats ([`FormatSet`]) are cheap
//! bit unions. Names round-trip through [`BarcodeFormat::name`] and
//! [`FormatSet::parse`]; parsing is case-insensitive and `-`/`_` in names
//! are optional.

use crate::error::{Error, Result};
use std::fmt;

macro_rules! barcode_formats {
    ($(($variant:ident, $bit:expr, $name:literal, $linear:expr)),+ $(,)?) => {
        /// A single barcode symbology.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum BarcodeFormat {
            $($variant),+
        }

        impl BarcodeFormat {
            pub(crate) const ALL: &'static [BarcodeFormat] = &[$(Self::$variant),+];

            /// The canonical display name, e.g. `"DataBarExpandedStacked"`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name),+
                }
            }

            const fn bit(self) -> u64 {
                match self {
                    $(Self::$variant => 1u64 << $bit),+
                }
            }

            /// True for row-oriented symbologies (including the postal and
            /// stacked families, which scan as rows of a taller symbol).
            pub fn is_linear(self) -> bool {
                match self {
                    $(Self::$variant => $linear),+
                }
            }
        }
    };
}

barcode_formats! {
    (AustraliaPost, 0, "AustraliaPost", true),
    (Aztec, 1, "Aztec", false),
    (AztecRune, 2, "AztecRune", false),
    (ChannelCode, 3, "ChannelCode", true),
    (Codabar, 4, "Codabar", true),
    (CodablockF, 5, "CodablockF", true),
    (Code11, 6, "Code11", true),
    (Code128, 7, "Code128", true),
    (Code16K, 8, "Code16K", true),
    (Code32, 9, "Code32", true),
    (Code39, 10, "Code39", true),
    (Code49, 11, "Code49", true),
    (Code93, 12, "Code93", true),
    (CodeOne, 13, "CodeOne", false),
    (DataBar, 14, "DataBar", true),
    (DataBarExpanded, 15, "DataBarExpanded", true),
    (DataBarExpandedStacked, 16, "DataBarExpandedStacked", true),
    (DataBarLimited, 17, "DataBarLimited", true),
    (DataBarStacked, 18, "DataBarStacked", true),
    (DataBarStackedOmnidirectional, 19, "DataBarStackedOmnidirectional", true),
    (Datalogic2of5, 20, "Datalogic2of5", true),
    (DataMatrix, 21, "DataMatrix", false),
    (DeutschePostIdentcode, 22, "DeutschePostIdentcode", true),
    (DeutschePostLeitcode, 23, "DeutschePostLeitcode", true),
    (DotCode, 24, "DotCode", false),
    (DXFilmEdge, 25, "DXFilmEdge", true),
    (EAN13, 26, "EAN-13", true),
    (EAN8, 27, "EAN-8", true),
    (GridMatrix, 28, "GridMatrix", false),
    (HanXin, 29, "HanXin", false),
    (IATA2of5, 30, "IATA2of5", true),
    (Industrial2of5, 31, "Industrial2of5", true),
    (ITF, 32, "ITF", true),
    (JapanPost, 33, "JapanPost", true),
    (KIXCode, 34, "KIXCode", true),
    (KoreaPost, 35, "KoreaPost", true),
    (LOGMARS, 36, "LOGMARS", true),
    (Mailmark, 37, "Mailmark", true),
    (Matrix2of5, 38, "Matrix2of5", true),
    (MaxiCode, 39, "MaxiCode", false),
    (MicroQRCode, 40, "MicroQRCode", false),
    (MSI, 41, "MSI", true),
    (PDF417, 42, "PDF417", false),
    (Pharmacode, 43, "Pharmacode", true),
    (PharmacodeTwoTrack, 44, "PharmacodeTwoTrack", true),
    (PLANET, 45, "PLANET", true),
    (POSTNET, 46, "POSTNET", true),
    (PZN, 47, "PZN", true),
    (QRCode, 48, "QRCode", false),
    (RM4SCC, 49, "RM4SCC", true),
    (RMQRCode, 50, "RMQRCode", false),
    (Telepen, 51, "Telepen", true),
    (UPCA, 52, "UPC-A", true),
    (UPCE, 53, "UPC-E", true),
    (UPNQR, 54, "UPNQR", false),
    (USPSIMB, 55, "USPSIMB", true),
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl BarcodeFormat {
    /// Parse one format name. Case-insensitive, `-` and `_` are optional.
    pub fn from_name(name: &str) -> Result<Self> {
        let folded = fold_name(name);
        Self::ALL
            .iter()
            .copied()
            .find(|fmt| fold_name(fmt.name()) == folded)
            .ok_or_else(|| Error::UnknownFormat(name.to_string()))
    }
}

fn fold_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// A set of [`BarcodeFormat`]s stored as a bit mask.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FormatSet(u64);

impl FormatSet {
    pub const EMPTY: FormatSet = FormatSet(0);

    pub fn all() -> Self {
        BarcodeFormat::ALL.iter().copied().collect()
    }

    /// All row-oriented formats (spec name: `LinearCodes`).
    pub fn linear_codes() -> Self {
        BarcodeFormat::ALL
            .iter()
            .copied()
            .filter(|f| f.is_linear())
            .collect()
    }

    /// All 2D matrix formats (spec name: `MatrixCodes`).
    pub fn matrix_codes() -> Self {
        BarcodeFormat::ALL
            .iter()
            .copied()
            .filter(|f| !f.is_linear())
            .collect()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(self, format: BarcodeFormat) -> bool {
        self.0 & format.bit() != 0
    }

    pub fn insert(&mut self, format: BarcodeFormat) {
        self.0 |= format.bit();
    }

    pub fn remove(&mut self, format: BarcodeFormat) {
        self.0 &= !format.bit();
    }

    #[must_use]
    pub fn union(self, other: FormatSet) -> FormatSet {
        FormatSet(self.0 | other.0)
    }

    #[must_use]
    pub fn intersection(self, other: FormatSet) -> FormatSet {
        FormatSet(self.0 & other.0)
    }

    pub fn iter(self) -> impl Iterator<Item = BarcodeFormat> {
        BarcodeFormat::ALL
            .iter()
            .copied()
            .filter(move |f| self.contains(*f))
    }

    /// Parse a list of format names separated by any combination of `,`,
    /// `|` or whitespace. An empty input yields the empty set (which the
    /// reader interprets as "any"). Unknown names fail the whole parse.
    pub fn parse(input: &str) -> Result<Self> {
        let mut set = FormatSet::EMPTY;
        for name in input.split(|c: char| c == ',' || c == '|' || c.is_whitespace()) {
            if name.is_empty() {
                continue;
            }
            set.insert(BarcodeFormat::from_name(name)?);
        }
        Ok(set)
    }
}

impl FromIterator<BarcodeFormat> for FormatSet {
    fn from_iter<I: IntoIterator<Item = BarcodeFormat>>(iter: I) -> Self {
        let mut set = FormatSet::EMPTY;
        for format in iter {
            set.insert(format);
        }
        set
    }
}

impl From<BarcodeFormat> for FormatSet {
    fn from(format: BarcodeFormat) -> Self {
        let mut set = FormatSet::EMPTY;
        set.insert(format);
        set
    }
}

impl fmt::Display for FormatSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for format in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(format.name())?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Debug for FormatSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FormatSet[{self}]")
    }
}
