//! Decoded content assembly
//!
//! Every content decoder pushes its output through a [`Content`] value:
//! raw bytes, ECI transitions, an FNC1 marker when the payload is GS1,
//! and the symbology identifier. On finalization the byte ranges are
//! decoded under their effective character encodings (via `encoding_rs`),
//! defaulting to ISO-8859-1 when no ECI was declared.

use encoding_rs::{
    Encoding, BIG5, EUC_KR, GB18030, GBK, ISO_8859_10, ISO_8859_13, ISO_8859_14, ISO_8859_15,
    ISO_8859_16, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5, ISO_8859_6, ISO_8859_7,
    ISO_8859_8, SHIFT_JIS, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1250, WINDOWS_1251, WINDOWS_1252,
    WINDOWS_1256, WINDOWS_874,
};

/// Extended Channel Interpretation value as carried in a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Eci(pub u32);

impl Eci {
    pub const ISO8859_1: Eci = Eci(3);
    pub const ISO8859_2: Eci = Eci(4);
    pub const UTF8: Eci = Eci(26);
    pub const BINARY: Eci = Eci(899);

    /// The character encoding this ECI selects, `None` when it is not a
    /// character-set ECI (or one this build cannot decode).
    /// Note: encoding_rs follows WHATWG and treats ISO-8859-1 as
    /// windows-1252, which matches scanner practice.
    pub fn encoding(self) -> Option<&'static Encoding> {
        Some(match self.0 {
            0..=3 | 27 | 170 => WINDOWS_1252,
            4 => ISO_8859_2,
            5 => ISO_8859_3,
            6 => ISO_8859_4,
            7 => ISO_8859_5,
            8 => ISO_8859_6,
            9 => ISO_8859_7,
            10 => ISO_8859_8,
            11 => ISO_8859_10,
            13 => WINDOWS_874,
            15 => ISO_8859_13,
            16 => ISO_8859_14,
            17 => ISO_8859_15,
            18 => ISO_8859_16,
            20 => SHIFT_JIS,
            21 => WINDOWS_1250,
            22 => WINDOWS_1251,
            23 => WINDOWS_1252,
            24 => WINDOWS_1256,
            25 => UTF_16BE,
            26 => UTF_8,
            28 => BIG5,
            29 | 32 => GB18030,
            30 => EUC_KR,
            31 => GBK,
            33 => UTF_16LE,
            _ => return None,
        })
    }

    pub fn is_binary(self) -> bool {
        self.0 == 899
    }
}

/// AIM symbology identifier: `]` + letter + one-digit modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SymbologyIdentifier {
    pub code: u8,
    pub modifier: u8,
    /// Added to the modifier when the content carries an explicit ECI
    /// (several symbologies shift their modifier digit in that case).
    pub eci_modifier_offset: u8,
}

impl SymbologyIdentifier {
    pub const fn new(code: u8, modifier: u8) -> Self {
        Self {
            code,
            modifier,
            eci_modifier_offset: 0,
        }
    }

    pub const fn with_eci_offset(code: u8, modifier: u8, offset: u8) -> Self {
        Self {
            code,
            modifier,
            eci_modifier_offset: offset,
        }
    }
}

/// Broad classification of the assembled payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Text,
    Binary,
    Mixed,
    GS1,
    ISO15434,
    UnknownECI,
}

/// How `Barcode::text()` renders the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextMode {
    /// Bytes of a text-type payload, transcoded to unicode.
    #[default]
    Plain,
    /// Standard content following the ECI protocol.
    Eci,
    /// Human readable interpretation (GS1 AIs in parentheses, control
    /// characters as `<GS>` style angle tokens).
    Hri,
    /// Hex dump of the raw bytes.
    Hex,
    /// Like Plain with non-graphical characters escaped as `<U+XX>`.
    Escaped,
}

/// Incrementally assembled symbol payload.
#[derive(Debug, Clone, Default)]
pub struct Content {
    pub bytes: Vec<u8>,
    /// (byte offset, ECI) transitions, in append order.
    encodings: Vec<(usize, Eci)>,
    pub symbology: SymbologyIdentifier,
    /// FNC1 in first position: GS1 Application Identifier payload.
    pub gs1: bool,
    /// Leading ISO 15434 "[)>" envelope (format 05/06 Macro).
    pub iso15434: bool,
    has_eci: bool,
}

impl Content {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn push(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn append_str(&mut self, text: &str) {
        self.bytes.extend_from_slice(text.as_bytes());
    }

    /// Record an ECI taking effect at the current write position.
    pub fn switch_encoding(&mut self, eci: Eci) {
        self.encodings.push((self.bytes.len(), eci));
        self.has_eci = true;
    }

    /// FNC1 in first data position tags the payload GS1.
    pub fn apply_fnc1_in_first_position(&mut self) {
        if self.bytes.is_empty() {
            self.gs1 = true;
        }
    }

    pub fn has_eci(&self) -> bool {
        self.has_eci
    }

    /// The first declared ECI, if any.
    pub fn first_eci(&self) -> Option<Eci> {
        self.encodings.first().map(|&(_, eci)| eci)
    }

    pub fn content_type(&self) -> ContentType {
        if self.gs1 {
            return ContentType::GS1;
        }
        if self.iso15434 || self.bytes.starts_with(b"[)>\x1e") {
            return ContentType::ISO15434;
        }
        if self.encodings.iter().any(|(_, e)| e.encoding().is_none() && !e.is_binary()) {
            return ContentType::UnknownECI;
        }
        let mut has_text = false;
        let mut has_binary = false;
        for (range, eci) in self.ranges() {
            let binary = match eci {
                Some(e) => e.is_binary(),
                None => !looks_like_text(&self.bytes[range.clone()]),
            };
            if binary && !range.is_empty() {
                has_binary = true;
            } else if !range.is_empty() {
                has_text = true;
            }
        }
        match (has_text, has_binary) {
            (true, true) => ContentType::Mixed,
            (_, true) => ContentType::Binary,
            _ => ContentType::Text,
        }
    }

    /// Byte ranges with their effective ECI (None = default encoding).
    fn ranges(&self) -> Vec<(std::ops::Range<usize>, Option<Eci>)> {
        if self.encodings.is_empty() {
            return vec![(0..self.bytes.len(), None)];
        }
        let mut out = Vec::new();
        let first = self.encodings[0].0;
        if first > 0 {
            out.push((0..first, None));
        }
        for (i, &(start, eci)) in self.encodings.iter().enumerate() {
            let end = self
                .encodings
                .get(i + 1)
                .map_or(self.bytes.len(), |&(next, _)| next);
            out.push((start..end, Some(eci)));
        }
        out
    }

    /// The raw byte payload.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The payload with embedded ECI escape sequences (`\NNNNNN`), as
    /// defined for post-decode transmission; plain bytes when the symbol
    /// declared no ECI.
    pub fn bytes_eci(&self) -> Vec<u8> {
        if !self.has_eci {
            return self.bytes.clone();
        }
        let mut out = Vec::with_capacity(self.bytes.len() + 8 * self.encodings.len());
        for (range, eci) in self.ranges() {
            if let Some(eci) = eci {
                out.extend_from_slice(format!("\\{:06}", eci.0).as_bytes());
            }
            for &b in &self.bytes[range] {
                out.push(b);
                if b == b'\\' {
                    // Backslash data bytes are doubled in ECI transmission.
                    out.push(b);
                }
            }
        }
        out
    }

    /// Unicode text under the given rendering mode.
    pub fn render(&self, mode: TextMode) -> String {
        match mode {
            TextMode::Hex => self
                .bytes
                .iter()
                .map(|b| format!("{b:02X}"))
                .collect::<Vec<_>>()
                .join(" "),
            TextMode::Eci => String::from_utf8_lossy(&self.bytes_eci()).into_owned(),
            TextMode::Plain => self.decode_text(),
            TextMode::Escaped => escape_non_graphical(&self.decode_text()),
            TextMode::Hri => {
                let text = self.decode_text();
                if self.gs1 {
                    gs1_human_readable(&text)
                } else {
                    escape_non_graphical(&text)
                }
            }
        }
    }

    fn decode_text(&self) -> String {
        let mut out = String::new();
        for (range, eci) in self.ranges() {
            let chunk = &self.bytes[range];
            if chunk.is_empty() {
                continue;
            }
            let encoding = match eci {
                Some(e) if e.is_binary() => {
                    // Binary ECI passes through byte-per-char.
                    out.extend(chunk.iter().map(|&b| char::from(b)));
                    continue;
                }
                Some(e) => e.encoding().unwrap_or(WINDOWS_1252),
                None => {
                    // No ECI declared: valid UTF-8 is taken as such,
                    // anything else is ISO-8859-1. encoding_rs has no
                    // true latin-1 decoder (its "ISO-8859-1" is
                    // windows-1252, which remaps 0x80-0x9F), so the
                    // fallback maps bytes to code points directly.
                    match std::str::from_utf8(chunk) {
                        Ok(text) => out.push_str(text),
                        Err(_) => out.extend(chunk.iter().map(|&b| char::from(b))),
                    }
                    continue;
                }
            };
            let (text, _, _) = encoding.decode(chunk);
            out.push_str(&text);
        }
        out
    }
}

fn looks_like_text(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .all(|&b| b >= 0x20 || matches!(b, b'\t' | b'\n' | b'\r' | 0x1d | 0x1e | 0x1c))
}

fn escape_non_graphical(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() {
            let name = match c {
                '\x1d' => Some("<GS>"),
                '\x1e' => Some("<RS>"),
                '\x1c' => Some("<FS>"),
                '\x04' => Some("<EOT>"),
                '\n' => Some("<LF>"),
                '\r' => Some("<CR>"),
                '\t' => Some("<HT>"),
                _ => None,
            };
            match name {
                Some(n) => out.push_str(n),
                None => out.push_str(&format!("<U+{:02X}>", c as u32)),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Two, three and four digit GS1 Application Identifiers with fixed
/// lengths, enough to bracket the AI without a full AI dictionary.
fn gs1_human_readable(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut rest = text;
    while !rest.is_empty() {
        let digits: String = rest.chars().take(4).filter(|c| c.is_ascii_digit()).collect();
        if digits.len() < 2 {
            out.push_str(&rest.replace('\x1d', ""));
            break;
        }
        let (ai_len, field_len) = gs1_ai_field(&digits);
        if ai_len == 0 || rest.len() < ai_len {
            out.push_str(&rest.replace('\x1d', ""));
            break;
        }
        out.push('(');
        out.push_str(&rest[..ai_len]);
        out.push(')');
        rest = &rest[ai_len..];
        if field_len > 0 {
            let take = field_len.min(rest.len());
            out.push_str(&rest[..take]);
            rest = &rest[take..];
        } else {
            // Variable length field terminated by GS.
            match rest.find('\x1d') {
                Some(pos) => {
                    out.push_str(&rest[..pos]);
                    rest = &rest[pos + 1..];
                }
                None => {
                    out.push_str(rest);
                    break;
                }
            }
        }
        // Fixed-length fields may also carry a redundant separator.
        if let Some(stripped) = rest.strip_prefix('\x1d') {
            rest = stripped;
        }
    }
    out
}

/// (AI length, fixed field length or 0 for variable) for the common
/// fixed-length AIs from the GS1 general specification.
fn gs1_ai_field(digits: &str) -> (usize, usize) {
    let two: u32 = digits.get(..2).and_then(|d| d.parse().ok()).unwrap_or(999);
    match two {
        0 => (2, 18),
        1 | 2 | 3 => (2, 14),
        11..=17 => (2, 6),
        20 => (2, 2),
        31..=36 => (4, 6),
        41 => (3, 13),
        _ if two <= 99 => (2, 0),
        _ => (0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_latin1_default() {
        let mut c = Content::new();
        c.append(&[b'A', 0xE9, b'B']); // 0xE9 = e-acute in latin-1
        assert_eq!(c.render(TextMode::Plain), "AéB");
        assert_eq!(c.content_type(), ContentType::Text);
    }

    #[test]
    fn test_utf8_without_eci() {
        let mut c = Content::new();
        c.append("héllo".as_bytes());
        assert_eq!(c.render(TextMode::Plain), "héllo");
    }

    #[test]
    fn test_default_is_latin1_not_windows1252() {
        // 0x93 is a C1 control in ISO-8859-1; windows-1252 would turn
        // it into a curly quote.
        let mut c = Content::new();
        c.append(&[b'A', 0x93, 0x80, b'B']);
        let text: Vec<char> = c.render(TextMode::Plain).chars().collect();
        assert_eq!(text, vec!['A', '\u{93}', '\u{80}', 'B']);
    }

    #[test]
    fn test_eci_ranges() {
        let mut c = Content::new();
        c.switch_encoding(Eci::ISO8859_2);
        c.append(&[0xA9]); // latin-2 S-caron
        c.switch_encoding(Eci::UTF8);
        c.append("Ω".as_bytes());
        assert!(c.has_eci());
        assert_eq!(c.render(TextMode::Plain), "ŠΩ");
        let eci_bytes = c.bytes_eci();
        assert!(eci_bytes.starts_with(b"\\000004"));
    }

    #[test]
    fn test_gs1_flag_only_in_first_position() {
        let mut c = Content::new();
        c.apply_fnc1_in_first_position();
        c.append(b"0104912345678904");
        assert!(c.gs1);
        assert_eq!(c.content_type(), ContentType::GS1);

        let mut c2 = Content::new();
        c2.append(b"data");
        c2.apply_fnc1_in_first_position();
        assert!(!c2.gs1);
    }

    #[test]
    fn test_hri_brackets_ais() {
        let mut c = Content::new();
        c.apply_fnc1_in_first_position();
        c.append(b"010491234567890421987\x1d3103001750");
        let hri = c.render(TextMode::Hri);
        assert_eq!(hri, "(01)04912345678904(21)987(3103)001750");
    }

    #[test]
    fn test_hex_and_escaped() {
        let mut c = Content::new();
        c.append(&[0x48, 0x1d, 0x49]);
        assert_eq!(c.render(TextMode::Hex), "48 1D 49");
        assert_eq!(c.render(TextMode::Escaped), "H<GS>I");
    }

    #[test]
    fn test_binary_classification() {
        let mut c = Content::new();
        c.append(&[0x00, 0x01, 0x02]);
        assert_eq!(c.content_type(), ContentType::Binary);
    }
}
