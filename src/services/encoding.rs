//! Decoding of uploaded character lists whose encoding is not declared.

use std::borrow::Cow;
use std::collections::HashSet;

use encoding_rs::GBK;
use thiserror::Error;

const BOM: char = '\u{FEFF}';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("上传的文件为空。")]
    Empty,
    #[error("文件编码无法识别，请确保为 UTF-8 或 GBK 编码。")]
    Undecodable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Utf8,
    Gbk,
}

impl SourceEncoding {
    pub const fn as_str(self) -> &'static str {
        match self {
            SourceEncoding::Utf8 => "UTF-8",
            SourceEncoding::Gbk => "GBK",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub filename: String,
    pub encoding: SourceEncoding,
}

/// CJK Unified Ideographs block.
pub fn is_cjk_glyph(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c)
}

/// Distinct CJK glyphs of `text` in first-occurrence order.
pub fn extract_unique_glyphs(text: &str) -> Vec<char> {
    let mut seen = HashSet::new();
    text.chars()
        .filter(|c| is_cjk_glyph(*c))
        .filter(|c| seen.insert(*c))
        .collect()
}

pub fn decode(raw: &[u8], filename: &str) -> Result<Decoded, EncodingError> {
    let filename = repair_filename(filename);
    let (text, encoding) = decode_content(raw)?;
    Ok(Decoded {
        text,
        filename,
        encoding,
    })
}

/// UTF-8 first (lossy, one leading BOM removed); GBK when that yields no CJK
/// glyph. Fails only when the bytes are malformed under both encodings.
pub fn decode_content(raw: &[u8]) -> Result<(String, SourceEncoding), EncodingError> {
    if raw.is_empty() {
        return Err(EncodingError::Empty);
    }

    let utf8_valid = std::str::from_utf8(raw).is_ok();
    let lossy = String::from_utf8_lossy(raw);
    let utf8_text = strip_bom(lossy);

    if utf8_text.chars().any(is_cjk_glyph) {
        return Ok((utf8_text, SourceEncoding::Utf8));
    }

    tracing::debug!(bytes = raw.len(), "no CJK glyphs after UTF-8 decoding, trying GBK");
    let (gbk_text, had_errors) = GBK.decode_without_bom_handling(raw);

    match (had_errors, utf8_valid) {
        (false, _) => Ok((strip_bom(gbk_text), SourceEncoding::Gbk)),
        (true, true) => Ok((utf8_text, SourceEncoding::Utf8)),
        (true, false) => Err(EncodingError::Undecodable),
    }
}

fn strip_bom(text: Cow<'_, str>) -> String {
    match text.strip_prefix(BOM) {
        Some(rest) => rest.to_string(),
        None => text.into_owned(),
    }
}

/// Latin-1 letters that show up when UTF-8 file names are read as Latin-1.
fn is_mojibake_indicator(c: char) -> bool {
    ('\u{C3}'..='\u{FF}').contains(&c) && c != '×' && c != '÷'
}

/// Undoes UTF-8 → Latin-1 mis-decoding of a file name. The repair is kept only
/// when it produces at least one CJK glyph.
pub fn repair_filename(filename: &str) -> String {
    if !filename.chars().any(is_mojibake_indicator) {
        return filename.to_string();
    }

    let bytes: Option<Vec<u8>> = filename.chars().map(|c| u8::try_from(c).ok()).collect();
    let Some(bytes) = bytes else {
        return filename.to_string();
    };

    let repaired = String::from_utf8_lossy(&bytes);
    if repaired.chars().any(is_cjk_glyph) {
        tracing::info!(original = filename, repaired = %repaired, "repaired file name encoding");
        repaired.into_owned()
    } else {
        filename.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_latin1(s: &str) -> String {
        s.as_bytes().iter().map(|&b| b as char).collect()
    }

    #[test]
    fn test_extract_unique_glyphs_keeps_first_occurrence_order() {
        let glyphs = extract_unique_glyphs("你\n好\r\n你 a,1 。好学");
        assert_eq!(glyphs, vec!['你', '好', '学']);
    }

    #[test]
    fn test_extract_skips_non_ideographs() {
        assert!(extract_unique_glyphs("abc 123 ，。！ ㄅ ぁ").is_empty());
    }

    #[test]
    fn test_bom_is_stripped_and_glyphs_unchanged() {
        let plain = "你\n好\n".as_bytes().to_vec();
        let mut with_bom = "\u{FEFF}".as_bytes().to_vec();
        with_bom.extend_from_slice(&plain);

        let (a, enc_a) = decode_content(&plain).unwrap();
        let (b, enc_b) = decode_content(&with_bom).unwrap();
        assert_eq!(a, b);
        assert_eq!(enc_a, SourceEncoding::Utf8);
        assert_eq!(enc_b, SourceEncoding::Utf8);
        assert_eq!(extract_unique_glyphs(&a), extract_unique_glyphs(&b));
    }

    #[test]
    fn test_only_one_bom_is_stripped() {
        let raw = "\u{FEFF}\u{FEFF}你".as_bytes();
        let (text, _) = decode_content(raw).unwrap();
        assert_eq!(text, "\u{FEFF}你");
    }

    #[test]
    fn test_gbk_fallback() {
        // "你好\n学" in GBK
        let raw = [0xC4, 0xE3, 0xBA, 0xC3, 0x0A, 0xD1, 0xA7];
        assert!(std::str::from_utf8(&raw).is_err());
        let (text, encoding) = decode_content(&raw).unwrap();
        assert_eq!(encoding, SourceEncoding::Gbk);
        assert_eq!(extract_unique_glyphs(&text), vec!['你', '好', '学']);
    }

    #[test]
    fn test_ascii_only_decodes_without_glyphs() {
        let (text, _) = decode_content(b"hello\nworld").unwrap();
        assert!(extract_unique_glyphs(&text).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode_content(b""), Err(EncodingError::Empty));
    }

    #[test]
    fn test_garbage_under_both_encodings_is_undecodable() {
        // 0xFF is never valid in UTF-8 and is not a GBK lead byte.
        assert_eq!(decode_content(&[0xFF, 0xFF, 0x80]), Err(EncodingError::Undecodable));
    }

    #[test]
    fn test_repair_filename_from_latin1_mojibake() {
        let broken = as_latin1("常用字.txt");
        assert_ne!(broken, "常用字.txt");
        assert_eq!(repair_filename(&broken), "常用字.txt");
    }

    #[test]
    fn test_repair_filename_keeps_genuine_latin1() {
        assert_eq!(repair_filename("café.txt"), "café.txt");
        assert_eq!(repair_filename("Übung.txt"), "Übung.txt");
    }

    #[test]
    fn test_repair_filename_leaves_clean_names() {
        assert_eq!(repair_filename("demo.txt"), "demo.txt");
        assert_eq!(repair_filename("常用字.txt"), "常用字.txt");
    }

    #[test]
    fn test_decode_repairs_filename_and_content() {
        let decoded = decode("好".as_bytes(), &as_latin1("字库.txt")).unwrap();
        assert_eq!(decoded.filename, "字库.txt");
        assert_eq!(decoded.text, "好");
        assert_eq!(decoded.encoding.as_str(), "UTF-8");
    }
}
