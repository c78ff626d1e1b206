//! Byte decoding and header-row detection shared by both upload formats.

use std::borrow::Cow;

/// Column name whose presence on the first line marks that line as the header.
pub const HEADER_MARKER: &str = "RptDt";

const BOM: char = '\u{feff}';

/// Decode upload bytes as UTF-8, falling back to Latin-1 (ISO-8859-1).
///
/// Every byte sequence is valid Latin-1, so this never fails. A leading byte-order mark is dropped.
pub fn decode_content(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => match s.strip_prefix(BOM) {
            Some(rest) => Cow::Borrowed(rest),
            None => Cow::Borrowed(s),
        },
        Err(_) => Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Index of the header line among the first two lines of `text`.
///
/// Some exports prepend a one-line banner; the header is line 0 only when that line already
/// names the marker column.
pub fn header_offset(first_line: &str) -> usize {
    if first_line.contains(HEADER_MARKER) { 0 } else { 1 }
}

/// Drop the first `n` lines of `text` (handles both `\n` and `\r\n`).
pub fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(pos) => rest = &rest[pos + 1..],
            None => return "",
        }
    }
    rest
}
