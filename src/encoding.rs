//! Character encoding detection for raw page bytes.
//!
//! Saved product pages arrive in whatever charset the shop served: UTF-8
//! for most storefronts, Shift_JIS or windows-1252 on older regional sites.
//! Detection order is BOM, then an HTTP `Content-Type` charset when the
//! caller has one, then `<meta>` declarations, then UTF-8.

use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8};
use regex::Regex;

/// `<meta charset="...">` or `content="text/html; charset=..."`.
#[allow(clippy::expect_used)]
static META_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([A-Za-z0-9_\-:.]+)"#).expect("META_CHARSET regex")
});

#[allow(clippy::expect_used)]
static HEADER_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)charset\s*=\s*["']?([A-Za-z0-9_\-:.]+)"#).expect("HEADER_CHARSET regex")
});

/// Only the head of the document is scanned for declarations.
const SNIFF_LEN: usize = 2048;

/// Detect the encoding of `html`.
///
/// `content_type` is the HTTP header value, if the page was fetched.
#[must_use]
pub fn detect_encoding(html: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(html) {
        return encoding;
    }

    let from_header = content_type
        .and_then(|header| HEADER_CHARSET.captures(header))
        .and_then(|caps| caps.get(1))
        .and_then(|label| Encoding::for_label(label.as_str().as_bytes()));
    if let Some(encoding) = from_header {
        return encoding;
    }

    let head = String::from_utf8_lossy(&html[..html.len().min(SNIFF_LEN)]);
    META_CHARSET
        .captures(&head)
        .and_then(|caps| caps.get(1))
        .and_then(|label| Encoding::for_label(label.as_str().as_bytes()))
        .unwrap_or(UTF_8)
}

/// Decode page bytes to UTF-8, replacing invalid sequences with U+FFFD.
#[must_use]
pub fn decode_html(html: &[u8], content_type: Option<&str>) -> String {
    let encoding = detect_encoding(html, content_type);
    let (decoded, used, had_errors) = encoding.decode(html);
    if had_errors {
        tracing::debug!(encoding = used.name(), "page contained invalid byte sequences");
    }
    decoded.into_owned()
}
