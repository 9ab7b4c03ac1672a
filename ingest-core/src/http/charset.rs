//! Response body decoding.
//!
//! Vietnamese pages are almost always UTF-8, but older mirrors still serve
//! windows-1258 or declare the charset only in a meta tag.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;

/// Only the head of the document is scanned for a meta declaration.
const META_SCAN_BYTES: usize = 1024;

static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([A-Za-z0-9_.:\-]+)"#)
        .expect("Invalid regex")
});

/// Decode a body to UTF-8.
///
/// The `Content-Type` charset wins over a `<meta>` declaration. Without
/// either, valid UTF-8 passes through and anything else is decoded lossily.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(charset_from_content_type)
        .or_else(|| charset_from_meta(bytes));

    match declared {
        Some(encoding) if encoding != UTF_8 => {
            let (decoded, _, had_errors) = encoding.decode(bytes);
            if had_errors {
                tracing::debug!(encoding = encoding.name(), "malformed bytes in body");
            }
            decoded.into_owned()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches(|c| c == '"' || c == '\''))
        .filter(|label| !label.is_empty())
        .and_then(|label| Encoding::for_label(label.as_bytes()))
}

fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(META_SCAN_BYTES)];
    let label = META_CHARSET.captures(head)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_charset() {
        let enc = charset_from_content_type("text/html; Charset=\"windows-1258\"").unwrap();
        assert_eq!(enc.name(), "windows-1258");
        assert!(charset_from_content_type("text/html").is_none());
        assert!(charset_from_content_type("text/html; charset=").is_none());
    }

    #[test]
    fn meta_declarations() {
        let html5 = b"<html><head><meta charset='iso-8859-1'></head>";
        assert_eq!(charset_from_meta(html5).unwrap().name(), "windows-1252");

        let http_equiv = b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1258\">";
        assert_eq!(charset_from_meta(http_equiv).unwrap().name(), "windows-1258");

        let none = b"<meta name=\"viewport\" content=\"width=device-width\">";
        assert!(charset_from_meta(none).is_none());
    }

    #[test]
    fn utf8_passes_through() {
        let text = "Phở bò tái chín";
        assert_eq!(decode_body(text.as_bytes(), None), text);
        assert_eq!(
            decode_body(text.as_bytes(), Some("text/html; charset=utf-8")),
            text
        );
    }

    #[test]
    fn header_charset_beats_meta() {
        let bytes = b"<meta charset=\"utf-8\"><p>caf\xe9</p>";
        assert_eq!(
            decode_body(bytes, Some("text/html; charset=iso-8859-1")),
            "<meta charset=\"utf-8\"><p>café</p>"
        );
    }

    #[test]
    fn meta_charset_is_used_without_header() {
        let bytes = b"<meta charset=\"iso-8859-1\"><p>caf\xe9</p>";
        assert_eq!(
            decode_body(bytes, None),
            "<meta charset=\"iso-8859-1\"><p>café</p>"
        );
    }

    #[test]
    fn invalid_utf8_is_lossy() {
        assert_eq!(decode_body(b"a \xff b", None), "a \u{FFFD} b");
    }
}
