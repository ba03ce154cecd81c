/// Heuristic Base64 detection and decoding for captured request/response
/// bodies.
///
/// Exported attack results mix plain-text bodies, Base64-encoded bodies with
/// a declared `encoding` attribute, and Base64-looking blobs with no marker
/// at all. Decoding never fails the run: a blob that will not decode comes
/// back unchanged, tagged so the report can say so.
use std::fmt::Write as _;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::debug;
use regex::Regex;

use crate::dom::XmlNode;

/// Minimum trimmed length before a blob is even considered Base64.
pub const BASE64_MIN_LEN: usize = 8;

/// Fraction of strict-alphabet characters the untrimmed blob must exceed.
pub const BASE64_CHAR_RATIO: f64 = 0.9;

/// Attribute that declares a body's encoding on the source element.
pub const ENCODING_ATTR: &str = "encoding";

fn alphabet_with_whitespace() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9+/=\s]+$").unwrap())
}

fn strict_alphabet() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9+/=]").unwrap())
}

/// How a payload body ended up in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// Readable text: never encoded, or decoded cleanly to UTF-8.
    Text,
    /// Decoded bytes that were not valid UTF-8, shown as lowercase hex.
    Hex,
    /// Decoding was attempted and failed; the original input, unchanged.
    Raw,
}

impl PayloadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadKind::Text => "text",
            PayloadKind::Hex => "hex",
            PayloadKind::Raw => "raw",
        }
    }
}

/// Result of decoding one raw blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub text: String,
    pub kind: PayloadKind,
}

/// Heuristic check that a blob looks like Base64.
///
/// All rules must hold: the trimmed blob is at least [`BASE64_MIN_LEN`]
/// characters of Base64 alphabet plus whitespace, its whitespace-free length
/// is a multiple of 4, and strict-alphabet characters make up more than
/// [`BASE64_CHAR_RATIO`] of the untrimmed input.
pub fn classify_as_base64(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() < BASE64_MIN_LEN {
        return false;
    }
    if !alphabet_with_whitespace().is_match(trimmed) {
        return false;
    }
    let compact_len = trimmed.chars().filter(|c| !c.is_whitespace()).count();
    if compact_len % 4 != 0 {
        return false;
    }
    let strict = strict_alphabet().find_iter(text).count();
    strict as f64 / text.chars().count() as f64 > BASE64_CHAR_RATIO
}

/// Strict Base64 decode with graceful fallbacks.
///
/// Whitespace is stripped first; anything else outside the alphabet, or bad
/// padding, rejects the decode. Decoded bytes that are not valid UTF-8 fall
/// back to lowercase hex. A rejected decode returns the input unchanged as
/// [`PayloadKind::Raw`]; this operation never errors.
pub fn decode_base64(text: &str) -> DecodedPayload {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    match BASE64.decode(compact.as_bytes()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(decoded) => DecodedPayload {
                text: decoded,
                kind: PayloadKind::Text,
            },
            Err(not_utf8) => DecodedPayload {
                text: to_hex(not_utf8.as_bytes()),
                kind: PayloadKind::Hex,
            },
        },
        Err(err) => {
            debug!("Base64 decode failed ({}); keeping payload as-is", err);
            DecodedPayload {
                text: text.to_string(),
                kind: PayloadKind::Raw,
            }
        }
    }
}

/// Decodes the body of a request/response element.
///
/// A declared `encoding="base64"` attribute (any case) forces decoding
/// regardless of what the blob looks like; otherwise the heuristic decides.
/// Unmarked plain text comes back trimmed.
pub fn extract_payload(node: &XmlNode) -> DecodedPayload {
    let raw = node.text();
    let declared_base64 = node
        .attr(ENCODING_ATTR)
        .is_some_and(|value| value.eq_ignore_ascii_case("base64"));
    if declared_base64 || classify_as_base64(&raw) {
        return decode_base64(&raw);
    }
    DecodedPayload {
        text: raw.trim().to_string(),
        kind: PayloadKind::Text,
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    #[test]
    fn test_classify_accepts_plain_base64() {
        assert!(classify_as_base64("aGVsbG8gd29ybGQhISE="));
        assert!(classify_as_base64("aGVsbG8gd29ybGQhISE=\n"));
    }

    #[test]
    fn test_classify_ratio_runs_over_untrimmed_input() {
        // The same blob passes bare but fails once surrounding whitespace
        // pushes the strict-character fraction under the threshold.
        assert!(classify_as_base64("aGVsbG8gd29ybGQhISE="));
        assert!(!classify_as_base64("  aGVsbG8gd29ybGQhISE=  "));
    }

    #[test]
    fn test_classify_rejects_short_input() {
        assert!(!classify_as_base64("aGk="));
        assert!(!classify_as_base64("abc"));
    }

    #[test]
    fn test_classify_rejects_empty_and_whitespace() {
        assert!(!classify_as_base64(""));
        assert!(!classify_as_base64("   \r\n  "));
    }

    #[test]
    fn test_classify_rejects_foreign_characters() {
        assert!(!classify_as_base64("not-base64-data!!"));
        assert!(!classify_as_base64("GET / HTTP/1.1"));
    }

    #[test]
    fn test_classify_rejects_length_not_multiple_of_four() {
        assert!(!classify_as_base64("aGVsbG8gd"));
    }

    #[test]
    fn test_classify_rejects_mostly_whitespace() {
        // Alphabet-only and a multiple of 4 once compacted, but whitespace
        // drags the strict-character ratio below the threshold.
        assert!(!classify_as_base64("AAAA    BBBB    "));
    }

    #[test]
    fn test_decode_utf8_round_trip() {
        let original = "hello world, this is a payload";
        let encoded = BASE64.encode(original);
        let decoded = decode_base64(&encoded);
        assert_eq!(decoded.kind, PayloadKind::Text);
        assert_eq!(decoded.text, original);
    }

    #[test]
    fn test_decode_ignores_embedded_whitespace() {
        let decoded = decode_base64("aGVs\r\nbG8=");
        assert_eq!(decoded.kind, PayloadKind::Text);
        assert_eq!(decoded.text, "hello");
    }

    #[test]
    fn test_decode_non_utf8_falls_back_to_hex() {
        let bytes = [0xffu8, 0xfe, 0xfd, 0xfc];
        let encoded = BASE64.encode(bytes);
        let decoded = decode_base64(&encoded);
        assert_eq!(decoded.kind, PayloadKind::Hex);
        assert_eq!(decoded.text, "fffefdfc");
    }

    #[test]
    fn test_decode_malformed_input_is_identity() {
        let input = "not-base64-data!!";
        let decoded = decode_base64(input);
        assert_eq!(decoded.kind, PayloadKind::Raw);
        assert_eq!(decoded.text, input);
    }

    #[test]
    fn test_decode_bad_padding_is_identity() {
        let decoded = decode_base64("aGVsbG8");
        assert_eq!(decoded.kind, PayloadKind::Raw);
        assert_eq!(decoded.text, "aGVsbG8");
    }

    #[test]
    fn test_extract_payload_honors_encoding_attribute() {
        // Too short for the heuristic, but the declared encoding forces it.
        let doc = dom::parse(r#"<request encoding="base64">aGk=</request>"#).unwrap();
        let decoded = extract_payload(doc.find_first("request").unwrap());
        assert_eq!(decoded.kind, PayloadKind::Text);
        assert_eq!(decoded.text, "hi");
    }

    #[test]
    fn test_extract_payload_encoding_attribute_is_case_insensitive() {
        let doc = dom::parse(r#"<request encoding="BASE64">aGVsbG8=</request>"#).unwrap();
        let decoded = extract_payload(doc.find_first("request").unwrap());
        assert_eq!(decoded.text, "hello");
    }

    #[test]
    fn test_extract_payload_unmarked_blob_uses_heuristic() {
        let doc = dom::parse("<response>aGVsbG8gd29ybGQhISE=</response>").unwrap();
        let decoded = extract_payload(doc.find_first("response").unwrap());
        assert_eq!(decoded.kind, PayloadKind::Text);
        assert_eq!(decoded.text, "hello world!!!");
    }

    #[test]
    fn test_extract_payload_plain_text_is_trimmed() {
        let doc = dom::parse("<request>\n  GET / HTTP/1.1\n</request>").unwrap();
        let decoded = extract_payload(doc.find_first("request").unwrap());
        assert_eq!(decoded.kind, PayloadKind::Text);
        assert_eq!(decoded.text, "GET / HTTP/1.1");
    }

    #[test]
    fn test_extract_payload_cdata_body() {
        let doc =
            dom::parse("<request encoding=\"base64\"><![CDATA[aGVsbG8=]]></request>").unwrap();
        let decoded = extract_payload(doc.find_first("request").unwrap());
        assert_eq!(decoded.text, "hello");
    }

    #[test]
    fn test_extract_payload_declared_but_malformed_stays_raw() {
        let doc = dom::parse(r#"<request encoding="base64">!!bad!!</request>"#).unwrap();
        let decoded = extract_payload(doc.find_first("request").unwrap());
        assert_eq!(decoded.kind, PayloadKind::Raw);
        assert_eq!(decoded.text, "!!bad!!");
    }
}
