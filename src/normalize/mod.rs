//! Normalization primitives shared by every site extractor.
//!
//! - [`price`]: locale-aware price, count and rating parsing
//! - [`currency`]: hostname and glyph based currency inference
//! - [`image`]: image URL canonicalization and asset-ID deduplication
//! - [`video`]: video URL deduplication and format detection
//!
//! Everything here is total: bad input produces an empty or zero value
//! rather than an error.

pub mod currency;
pub mod image;
pub mod price;
pub mod video;

pub use currency::{currency_for_host, currency_from_text, infer_currency};
pub use image::{canonicalize_image_url, dedup_key, ImageCandidate, ImageCollector};
pub use price::{parse_count, parse_price, parse_rating};
pub use video::{collect_videos, video_kind};

/// Undo the escaping that inline script payloads carry.
///
/// `\u002F` and `\/` become `/`, remaining backslashes are dropped.
#[must_use]
pub fn unescape_script_url(raw: &str) -> String {
    raw.replace("\\u002F", "/")
        .replace("\\u002f", "/")
        .replace("\\/", "/")
        .replace('\\', "")
}

/// Truncate to at most `max_chars` characters on a char boundary.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
