use std::sync::LazyLock;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use regex::bytes::Regex;

use chronicle_logging::chronicle_debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding_label: String,
    /// Malformed sequences were replaced with U+FFFD.
    pub lossy: bool,
}

// Both `<?xml encoding="...">` and `<meta charset="...">` live in the first
// kilobyte of a well-formed document.
static DECLARED_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:encoding|charset)\s*=\s*["']?([A-Za-z0-9._:-]+)"#)
        .expect("charset pattern is valid")
});

const SNIFF_BYTES: usize = 1024;

/// Decode a fetched body into UTF-8.
///
/// Order: byte-order mark, Content-Type charset, charset declared in the
/// document head (XML declaration or meta tag), then `chardetng`.
/// Malformed bytes never fail the decode; they come out as U+FFFD.
pub fn decode_text(bytes: &[u8], content_type: Option<&str>) -> DecodedText {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return decode_with(bytes, encoding);
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(enc) = Encoding::for_label(label.as_bytes()) {
            return decode_with(bytes, enc);
        }
    }

    let head = &bytes[..bytes.len().min(SNIFF_BYTES)];
    if let Some(enc) = DECLARED_CHARSET
        .captures(head)
        .and_then(|caps| caps.get(1))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return decode_with(bytes, enc);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            let (key, value) = part.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim_matches([' ', '"', '\''].as_ref()).to_string())
        })
        .next()
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedText {
    let (text, _, had_errors) = enc.decode(bytes);
    if had_errors {
        chronicle_debug!("Replaced malformed {} sequences while decoding", enc.name());
    }
    DecodedText {
        text: text.into_owned(),
        encoding_label: enc.name().to_string(),
        lossy: had_errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_charset_wins_over_declaration() {
        let body = b"<?xml version=\"1.0\" encoding=\"utf-8\"?><rss>caf\xe9</rss>";
        let decoded = decode_text(body, Some("application/xml; Charset=\"ISO-8859-1\""));
        assert_eq!(decoded.encoding_label, "windows-1252");
        assert!(decoded.text.contains("café"));
    }

    #[test]
    fn xml_declaration_is_honoured() {
        let body = b"<?xml version='1.0' encoding='windows-1252'?><rss>na\xefve</rss>";
        let decoded = decode_text(body, Some("text/xml"));
        assert!(decoded.text.contains("naïve"));
        assert!(!decoded.lossy);
    }

    #[test]
    fn invalid_utf8_under_declared_utf8_is_replaced() {
        let decoded = decode_text(b"abc \xc3\x28 def", Some("text/html; charset=utf-8"));
        assert_eq!(decoded.encoding_label, "UTF-8");
        assert!(decoded.lossy);
        assert_eq!(decoded.text, "abc \u{FFFD}( def");
    }
}
