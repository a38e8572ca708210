//! PDF text string helpers

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8 with BOM, otherwise
/// PDFDocEncoding (treated as Latin-1).
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// WinAnsiEncoding code for `ch`. Line breaks and tabs draw as spaces.
fn winansi_byte(ch: char) -> Option<u8> {
    let byte = match ch {
        '\n' | '\r' | '\t' => b' ',
        c if (' '..='~').contains(&c) => c as u8,
        c if ('\u{A0}'..='\u{FF}').contains(&c) => c as u32 as u8,
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Whether every character of `text` can be drawn with a WinAnsi font
pub(crate) fn is_encodable(text: &str) -> bool {
    text.chars().all(|ch| winansi_byte(ch).is_some())
}

/// Encode text for a WinAnsi-encoded standard font inside a literal string,
/// escaping delimiters.
///
/// Caller-supplied values are checked with [`is_encodable`] first; anything
/// still unencodable (pre-existing field values) is drawn as `?`.
pub(crate) fn encode_literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 2);
    out.push(b'(');
    for ch in text.chars() {
        let byte = winansi_byte(ch).unwrap_or(b'?');
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out.push(b')');
    out
}
