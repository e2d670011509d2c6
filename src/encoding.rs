//! Encoding sniffing and decoding using simdutf8, chardetng and `encoding_rs`.
//!
//! Encodings are identified by Windows code page numbers so the identifier
//! survives a round trip through settings files and UI pickers.

use std::borrow::Cow;
use std::fmt;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use log::debug;
use serde::Serialize;
use simdutf8::compat::from_utf8;

use crate::descriptor::Detection;

/// Code page number identifying a text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CodePage(pub u32);

impl CodePage {
    pub const UTF8: CodePage = CodePage(65001);
    pub const UTF16_LE: CodePage = CodePage(1200);
    pub const UTF16_BE: CodePage = CodePage(1201);
    pub const UTF32_LE: CodePage = CodePage(12000);
    pub const UTF32_BE: CodePage = CodePage(12001);
    pub const WINDOWS_1252: CodePage = CodePage(1252);
    pub const US_ASCII: CodePage = CodePage(20127);

    /// The `encoding_rs` decoder for this code page.
    ///
    /// UTF-32 has no `encoding_rs` decoder and returns `None` even though
    /// [`CodePage::decode`] handles it.
    pub fn encoding(self) -> Option<&'static Encoding> {
        CODE_PAGES
            .iter()
            .find(|(cp, _)| *cp == self.0)
            .map(|(_, enc)| *enc)
    }

    /// Returns true if [`CodePage::decode`] can handle this code page.
    pub fn is_supported(self) -> bool {
        self.is_utf32() || self.encoding().is_some()
    }

    /// Returns true for the UTF-32 code pages.
    pub fn is_utf32(self) -> bool {
        self == CodePage::UTF32_LE || self == CodePage::UTF32_BE
    }

    /// Look up the code page for an `encoding_rs` encoding.
    pub fn for_encoding(encoding: &'static Encoding) -> Option<CodePage> {
        CODE_PAGES
            .iter()
            .find(|(_, enc)| *enc == encoding)
            .map(|(cp, _)| CodePage(*cp))
    }

    /// Human-readable encoding name.
    pub fn name(self) -> &'static str {
        match self {
            CodePage::UTF32_LE => "UTF-32LE",
            CodePage::UTF32_BE => "UTF-32BE",
            CodePage::US_ASCII => "US-ASCII",
            _ => self.encoding().map_or("unknown", Encoding::name),
        }
    }

    /// Decode bytes to text, dropping a leading byte-order mark that
    /// matches this encoding. Malformed input becomes U+FFFD.
    pub fn decode(self, data: &[u8]) -> Cow<'_, str> {
        match self {
            CodePage::UTF32_LE => Cow::Owned(decode_utf32(data, false)),
            CodePage::UTF32_BE => Cow::Owned(decode_utf32(data, true)),
            _ => {
                let encoding = self.encoding().unwrap_or(encoding_rs::WINDOWS_1252);
                let (text, _) = encoding.decode_with_bom_removal(data);
                text
            }
        }
    }
}

impl fmt::Display for CodePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.name())
    }
}

/// Code pages with an `encoding_rs` decoder. The first entry for an
/// encoding is the one reported by [`CodePage::for_encoding`].
/// Statics can't read other statics, hence the `_INIT` values.
static CODE_PAGES: &[(u32, &Encoding)] = &[
    (65001, &encoding_rs::UTF_8_INIT),
    (1200, &encoding_rs::UTF_16LE_INIT),
    (1201, &encoding_rs::UTF_16BE_INIT),
    (1252, &encoding_rs::WINDOWS_1252_INIT),
    (20127, &encoding_rs::WINDOWS_1252_INIT),
    (28591, &encoding_rs::WINDOWS_1252_INIT),
    (1250, &encoding_rs::WINDOWS_1250_INIT),
    (1251, &encoding_rs::WINDOWS_1251_INIT),
    (1253, &encoding_rs::WINDOWS_1253_INIT),
    (1254, &encoding_rs::WINDOWS_1254_INIT),
    (1255, &encoding_rs::WINDOWS_1255_INIT),
    (1256, &encoding_rs::WINDOWS_1256_INIT),
    (1257, &encoding_rs::WINDOWS_1257_INIT),
    (1258, &encoding_rs::WINDOWS_1258_INIT),
    (874, &encoding_rs::WINDOWS_874_INIT),
    (866, &encoding_rs::IBM866_INIT),
    (28592, &encoding_rs::ISO_8859_2_INIT),
    (28593, &encoding_rs::ISO_8859_3_INIT),
    (28594, &encoding_rs::ISO_8859_4_INIT),
    (28595, &encoding_rs::ISO_8859_5_INIT),
    (28596, &encoding_rs::ISO_8859_6_INIT),
    (28597, &encoding_rs::ISO_8859_7_INIT),
    (28598, &encoding_rs::ISO_8859_8_INIT),
    (28603, &encoding_rs::ISO_8859_13_INIT),
    (28605, &encoding_rs::ISO_8859_15_INIT),
    (20866, &encoding_rs::KOI8_R_INIT),
    (21866, &encoding_rs::KOI8_U_INIT),
    (10000, &encoding_rs::MACINTOSH_INIT),
    (932, &encoding_rs::SHIFT_JIS_INIT),
    (51932, &encoding_rs::EUC_JP_INIT),
    (50220, &encoding_rs::ISO_2022_JP_INIT),
    (936, &encoding_rs::GBK_INIT),
    (54936, &encoding_rs::GB18030_INIT),
    (949, &encoding_rs::EUC_KR_INIT),
    (950, &encoding_rs::BIG5_INIT),
];

/// What to report when the prefix is neither BOM-marked nor valid UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyFallback {
    /// Always report this single-byte code page.
    CodePage(CodePage),
    /// Let chardetng pick the most likely legacy encoding.
    Detect,
}

impl Default for LegacyFallback {
    fn default() -> Self {
        LegacyFallback::CodePage(CodePage::WINDOWS_1252)
    }
}

/// Byte-order marks, longest first so UTF-32LE wins over UTF-16LE.
const BOMS: &[(&[u8], CodePage)] = &[
    (&[0xFF, 0xFE, 0x00, 0x00], CodePage::UTF32_LE),
    (&[0x00, 0x00, 0xFE, 0xFF], CodePage::UTF32_BE),
    (&[0xEF, 0xBB, 0xBF], CodePage::UTF8),
    (&[0xFF, 0xFE], CodePage::UTF16_LE),
    (&[0xFE, 0xFF], CodePage::UTF16_BE),
];

/// Returns the code page announced by a leading byte-order mark.
pub fn bom_code_page(data: &[u8]) -> Option<CodePage> {
    BOMS.iter()
        .find(|(bom, _)| data.starts_with(bom))
        .map(|(_, cp)| *cp)
}

/// Check whether the prefix is valid UTF-8.
///
/// A multi-byte sequence cut off by the end of the prefix is not an error:
/// the prefix is an arbitrary slice of a longer stream.
pub fn is_utf8(prefix: &[u8]) -> bool {
    match from_utf8(prefix) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

/// Pick the encoding of a byte prefix.
///
/// A byte-order mark wins outright. Otherwise a prefix that is valid UTF-8
/// (including pure ASCII) is UTF-8. Anything else falls back to `fallback`.
/// Never fails: every classification is a best guess.
pub fn sniff_encoding(prefix: &[u8], fallback: LegacyFallback) -> Detection<CodePage> {
    if prefix.is_empty() {
        return Detection::Defaulted(CodePage::UTF8);
    }

    if let Some(cp) = bom_code_page(prefix) {
        debug!("byte-order mark found: {cp}");
        return Detection::Resolved(cp);
    }

    if is_utf8(prefix) {
        return Detection::Resolved(CodePage::UTF8);
    }

    match fallback {
        LegacyFallback::CodePage(cp) => {
            debug!("prefix is not UTF-8, falling back to {cp}");
            Detection::Defaulted(cp)
        }
        LegacyFallback::Detect => {
            let mut detector = EncodingDetector::new();
            detector.feed(prefix, false);
            let encoding = detector.guess(None, true);
            match CodePage::for_encoding(encoding) {
                Some(cp) => {
                    debug!("chardetng guessed {cp}");
                    Detection::Resolved(cp)
                }
                None => Detection::Defaulted(CodePage::WINDOWS_1252),
            }
        }
    }
}

fn decode_utf32(data: &[u8], big_endian: bool) -> String {
    let bom: &[u8] = if big_endian {
        &[0x00, 0x00, 0xFE, 0xFF]
    } else {
        &[0xFF, 0xFE, 0x00, 0x00]
    };
    let body = data.strip_prefix(bom).unwrap_or(data);

    let mut text = String::with_capacity(body.len() / 4);
    for unit in body.chunks(4) {
        let Ok(bytes) = <[u8; 4]>::try_from(unit) else {
            text.push(char::REPLACEMENT_CHARACTER);
            break;
        };
        let scalar = if big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        };
        text.push(char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_utf8() {
        assert!(is_utf8(b"Hello, World!"));
        assert!(is_utf8("こんにちは".as_bytes()));
        assert!(is_utf8(b""));
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(!is_utf8(&[0xFF, 0xFE]));
        assert!(!is_utf8(&[0x80, 0x81, 0x82]));
    }

    #[test]
    fn test_truncated_sequence_is_utf8() {
        // "é" is C3 A9; the prefix ends after the lead byte
        assert!(is_utf8(&[b'a', b'b', 0xC3]));
    }

    #[test]
    fn test_sniff_boms() {
        let fallback = LegacyFallback::default();
        assert_eq!(
            sniff_encoding(&[0xFF, 0xFE, b'a', 0x00], fallback),
            Detection::Resolved(CodePage::UTF16_LE)
        );
        assert_eq!(
            sniff_encoding(&[0xFE, 0xFF, 0x00, b'a'], fallback),
            Detection::Resolved(CodePage::UTF16_BE)
        );
        assert_eq!(
            sniff_encoding(&[0xEF, 0xBB, 0xBF, b'a'], fallback),
            Detection::Resolved(CodePage::UTF8)
        );
        assert_eq!(
            sniff_encoding(&[0xFF, 0xFE, 0x00, 0x00, b'a', 0, 0, 0], fallback),
            Detection::Resolved(CodePage::UTF32_LE)
        );
        assert_eq!(
            sniff_encoding(&[0x00, 0x00, 0xFE, 0xFF, 0, 0, 0, b'a'], fallback),
            Detection::Resolved(CodePage::UTF32_BE)
        );
    }

    #[test]
    fn test_utf16_bom_ignores_body() {
        // Body bytes are invalid in every encoding; the BOM still decides.
        let data = [0xFE, 0xFF, 0xC3, 0x28, 0xFF, 0xFF, 0x80];
        assert_eq!(
            sniff_encoding(&data, LegacyFallback::Detect),
            Detection::Resolved(CodePage::UTF16_BE)
        );
    }

    #[test]
    fn test_sniff_ascii_is_utf8() {
        assert_eq!(
            sniff_encoding(b"a,b,c\n1,2,3\n", LegacyFallback::default()),
            Detection::Resolved(CodePage::UTF8)
        );
    }

    #[test]
    fn test_sniff_fallback() {
        // Windows-1252 "café"
        let data = [b'c', b'a', b'f', 0xE9, b'\n'];
        assert_eq!(
            sniff_encoding(&data, LegacyFallback::default()),
            Detection::Defaulted(CodePage::WINDOWS_1252)
        );
        assert_eq!(
            sniff_encoding(&data, LegacyFallback::CodePage(CodePage(1250))),
            Detection::Defaulted(CodePage(1250))
        );
    }

    #[test]
    fn test_sniff_detect_windows1251() {
        // "Привет" in Windows-1251
        let data: &[u8] = &[0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2, b' ', 0xEC, 0xE8, 0xF0];
        let cp = sniff_encoding(data, LegacyFallback::Detect).value().unwrap();
        assert!(cp.is_supported());
        assert_ne!(cp, CodePage::UTF8);
    }

    #[test]
    fn test_sniff_empty() {
        assert_eq!(
            sniff_encoding(b"", LegacyFallback::default()),
            Detection::Defaulted(CodePage::UTF8)
        );
    }

    #[test]
    fn test_decode_strips_bom() {
        let data: &[u8] = &[0xFF, 0xFE, b'H', 0x00, b'i', 0x00];
        assert_eq!(CodePage::UTF16_LE.decode(data), "Hi");

        let data: &[u8] = &[0xEF, 0xBB, 0xBF, b'a', b','];
        assert_eq!(CodePage::UTF8.decode(data), "a,");
    }

    #[test]
    fn test_decode_utf32() {
        let data: &[u8] = &[0xFF, 0xFE, 0x00, 0x00, b'o', 0, 0, 0, b'k', 0, 0, 0];
        assert_eq!(CodePage::UTF32_LE.decode(data), "ok");
        let data: &[u8] = &[0, 0, 0, b'o', 0, 0, 0, b'k'];
        assert_eq!(CodePage::UTF32_BE.decode(data), "ok");
    }

    #[test]
    fn test_code_page_lookup() {
        assert_eq!(CodePage::UTF8.encoding(), Some(encoding_rs::UTF_8));
        assert_eq!(
            CodePage::for_encoding(encoding_rs::WINDOWS_1252),
            Some(CodePage::WINDOWS_1252)
        );
        assert!(CodePage::UTF32_LE.is_supported());
        assert!(!CodePage(4242).is_supported());
        assert_eq!(CodePage::US_ASCII.name(), "US-ASCII");
    }
}
