//! Compiled regex patterns shared across extractors.
//!
//! All patterns are compiled once on first use with `LazyLock`.
//! Site-specific probe patterns live next to their probes in `embedded`.

#![allow(clippy::expect_used)]

use std::sync::LazyLock;

use regex::Regex;

// =============================================================================
// Text Cleaning
// =============================================================================

/// Matches runs of whitespace for normalization.
pub static WHITESPACE_NORMALIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE_NORMALIZE regex"));

// =============================================================================
// Price Parsing
// =============================================================================

/// Currency glyph or ISO code next to a displayed amount.
pub static CURRENCY_MARK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[€$£¥₹₽]|\b(?:EUR|USD|GBP|CAD|AUD|JPY|INR|CHF)\b")
        .expect("CURRENCY_MARK regex")
});

/// Thousands gap inside a number: `1 234`, `1\u{a0}234`, `1'234`.
pub static DIGIT_GROUP_GAP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d)[ \u{a0}\u{202f}'](\d{3})\b").expect("DIGIT_GROUP_GAP regex")
});

/// European layout: `1.234,56`, `1 234,56`, `12,50`.
pub static EUROPEAN_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}([.\s']\d{3})*,\d{1,2}$").expect("EUROPEAN_PRICE regex")
});

/// US layout with thousands separators: `1,234.56`, `1,234`.
pub static US_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,3}(,\d{3})+(\.\d+)?$").expect("US_PRICE regex")
});

/// First number-looking run in a string.
pub static NUMERIC_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d.,]*").expect("NUMERIC_RUN regex"));

/// Rating such as `4.5` or `4,5`.
pub static RATING_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d[.,]?\d?)").expect("RATING_VALUE regex"));

/// CSS width percentage used by star widgets: `width: 80%`.
pub static WIDTH_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)%").expect("WIDTH_PERCENT regex"));

// =============================================================================
// Image URLs
// =============================================================================

/// Amazon size tokens: `._SX300_.`, `._AC_US40_.`, `._AC_SY300_SX300_.`.
pub static AMAZON_SIZE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\._(?:[A-Z]{2}[A-Z0-9,]*_)+\.")
        .expect("AMAZON_SIZE_TOKEN regex")
});

/// AliExpress size suffixes: `.jpg_220x220.jpg`, `_50x50q90.jpg`.
pub static ALICDN_SIZE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\.(?:jpe?g|png|webp))_\d+x\d+\w*\.(?:jpe?g|png|webp|avif)$")
        .expect("ALICDN_SIZE_SUFFIX regex")
});

/// Temu/kwcdn resize parameters embedded in the file name: `_300.jpg`.
pub static KWCDN_SIZE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)_\d{2,4}(\.(?:jpe?g|png|webp))$").expect("KWCDN_SIZE_SUFFIX regex")
});

/// Long alphanumeric asset identifier in a URL path segment.
/// Apply to the path only; hostnames can look like identifiers.
pub static ASSET_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/([A-Za-z0-9]{10,})\.").expect("ASSET_ID regex"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn european_price_matches_comma_decimal() {
        assert!(EUROPEAN_PRICE.is_match("1.234,56"));
        assert!(EUROPEAN_PRICE.is_match("12,50"));
        assert!(!EUROPEAN_PRICE.is_match("1,234.56"));
    }

    #[test]
    fn us_price_matches_thousands() {
        assert!(US_PRICE.is_match("1,234.56"));
        assert!(US_PRICE.is_match("12,000"));
        assert!(!US_PRICE.is_match("12,50"));
    }

    #[test]
    fn amazon_size_token_matches_common_forms() {
        assert!(AMAZON_SIZE_TOKEN.is_match("/I/71abc._SX300_.jpg"));
        assert!(AMAZON_SIZE_TOKEN.is_match("/I/71abc._AC_US40_.jpg"));
        assert!(AMAZON_SIZE_TOKEN.is_match("/I/71abc._SS64_.jpg"));
        assert!(AMAZON_SIZE_TOKEN.is_match("/I/71abc._AC_SY300_SX300_.jpg"));
        assert!(!AMAZON_SIZE_TOKEN.is_match("/I/71abc.jpg"));
    }

    #[test]
    fn whitespace_normalize_collapses_spaces() {
        let result = WHITESPACE_NORMALIZE.replace_all("hello \n  world", " ");
        assert_eq!(result, "hello world");
    }
}
