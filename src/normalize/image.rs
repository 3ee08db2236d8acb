//! Image URL canonicalization and asset-ID deduplication.

use std::collections::HashSet;

use regex::NoExpand;
use url::Url;

use crate::patterns::{ALICDN_SIZE_SUFFIX, AMAZON_SIZE_TOKEN, ASSET_ID, KWCDN_SIZE_SUFFIX};

/// A canonical image URL and the identity key it deduplicates under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    pub url: String,
    pub key: String,
}

impl ImageCandidate {
    /// Canonicalize `src` and derive its dedup key.
    #[must_use]
    pub fn new(src: &str, hi_res_token: &str) -> Option<Self> {
        let url = canonicalize_image_url(src, hi_res_token)?;
        let key = dedup_key(&url);
        Some(Self { url, key })
    }
}

/// Rewrite an image URL to its full-resolution, query-free form.
///
/// - protocol-relative URLs get an `https:` scheme
/// - query string and fragment are removed
/// - Amazon size tokens (`._SX300_.`) become `hi_res_token`
/// - AliExpress (`.jpg_220x220.jpg`) and kwcdn (`_300.jpg`) size suffixes are dropped
///
/// Returns `None` for empty, `data:` and non-http URLs.
#[must_use]
pub fn canonicalize_image_url(src: &str, hi_res_token: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }

    let mut url = if let Some(rest) = src.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        src.to_string()
    };
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return None;
    }

    if let Some(cut) = url.find(['?', '#']) {
        url.truncate(cut);
    }

    let url = AMAZON_SIZE_TOKEN.replace_all(&url, NoExpand(hi_res_token));
    let url = ALICDN_SIZE_SUFFIX.replace_all(&url, "$1");
    let url = if url.contains("kwcdn") {
        KWCDN_SIZE_SUFFIX.replace_all(&url, "$1").into_owned()
    } else {
        url.into_owned()
    };

    Some(url)
}

/// Identity key for an image: the asset ID in its path, or the URL itself.
///
/// Only the path is inspected, so the same asset served from two CDN hosts
/// yields the same key.
#[must_use]
pub fn dedup_key(url: &str) -> String {
    let path = Url::parse(url).map_or_else(|_| url.to_string(), |parsed| parsed.path().to_string());
    ASSET_ID
        .captures(&path)
        .and_then(|caps| caps.get(1))
        .map_or_else(|| url.to_string(), |id| id.as_str().to_string())
}

/// Collects image candidates from several sources in priority order.
///
/// Candidates are kept in insertion order. Exact duplicate URLs are dropped
/// on insert; asset-ID duplicates are removed by [`finish`](Self::finish).
#[derive(Debug, Default)]
pub struct ImageCollector {
    candidates: Vec<ImageCandidate>,
    seen_urls: HashSet<String>,
    hi_res_token: String,
}

impl ImageCollector {
    #[must_use]
    pub fn new(hi_res_token: &str) -> Self {
        Self {
            hi_res_token: hi_res_token.to_string(),
            ..Self::default()
        }
    }

    /// Add a raw URL if it canonicalizes and passes `accept`.
    pub fn push_if(&mut self, src: &str, accept: impl Fn(&str) -> bool) {
        let Some(candidate) = ImageCandidate::new(src, &self.hi_res_token) else {
            return;
        };
        if accept(&candidate.url) && self.seen_urls.insert(candidate.url.clone()) {
            self.candidates.push(candidate);
        }
    }

    /// Add a raw URL unconditionally (after canonicalization).
    pub fn push(&mut self, src: &str) {
        self.push_if(src, |_| true);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Filter by product ID, deduplicate by asset ID and cap.
    ///
    /// When `external_id` is given and at least `min_id_matches` URLs
    /// contain it, only those URLs are kept.
    #[must_use]
    pub fn finish(self, external_id: Option<&str>, min_id_matches: usize, cap: usize) -> Vec<String> {
        let mut candidates = self.candidates;

        if let Some(id) = external_id.filter(|id| !id.is_empty()) {
            let matching: Vec<ImageCandidate> = candidates
                .iter()
                .filter(|candidate| candidate.url.contains(id))
                .cloned()
                .collect();
            if matching.len() >= min_id_matches.max(1) {
                tracing::debug!(id, kept = matching.len(), "narrowed images to id matches");
                candidates = matching;
            }
        }

        let mut seen_keys = HashSet::new();
        candidates
            .into_iter()
            .filter(|candidate| seen_keys.insert(candidate.key.clone()))
            .map(|candidate| candidate.url)
            .take(cap)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "._AC_SL1500_.";

    #[test]
    fn test_amazon_size_token_upgraded() {
        let url = canonicalize_image_url(
            "https://m.media-amazon.com/images/I/71AbCdEfGhL._SX300_.jpg?foo=1",
            TOKEN,
        );
        assert_eq!(
            url.as_deref(),
            Some("https://m.media-amazon.com/images/I/71AbCdEfGhL._AC_SL1500_.jpg")
        );
    }

    #[test]
    fn test_protocol_relative_gets_scheme() {
        let url = canonicalize_image_url("//ae01.alicdn.com/kf/S1234abcd5678.jpg_220x220.jpg", TOKEN);
        assert_eq!(url.as_deref(), Some("https://ae01.alicdn.com/kf/S1234abcd5678.jpg"));
    }

    #[test]
    fn test_kwcdn_suffix_dropped() {
        let url = canonicalize_image_url("https://img.kwcdn.com/product/Fancyalgo1234567_300.jpg", TOKEN);
        assert_eq!(url.as_deref(), Some("https://img.kwcdn.com/product/Fancyalgo1234567.jpg"));
    }

    #[test]
    fn test_rejects_non_http() {
        assert!(canonicalize_image_url("", TOKEN).is_none());
        assert!(canonicalize_image_url("data:image/png;base64,AAAA", TOKEN).is_none());
        assert!(canonicalize_image_url("/relative.jpg", TOKEN).is_none());
    }

    #[test]
    fn test_dedup_key_ignores_host() {
        let a = dedup_key("https://m.media-amazon.com/images/I/71AbCdEfGhL._AC_SL1500_.jpg");
        let b = dedup_key("https://images-na.ssl-images-amazon.com/images/I/71AbCdEfGhL._AC_SL1500_.jpg");
        assert_eq!(a, "71AbCdEfGhL");
        assert_eq!(a, b);
    }

    #[test]
    fn test_dedup_key_falls_back_to_url() {
        let url = "https://cdn.example.com/a/b.jpg";
        assert_eq!(dedup_key(url), url);
    }

    #[test]
    fn test_collector_dedups_and_caps() {
        let mut collector = ImageCollector::new(TOKEN);
        collector.push("https://m.media-amazon.com/images/I/71AbCdEfGhL._SX300_.jpg");
        collector.push("https://images-na.ssl-images-amazon.com/images/I/71AbCdEfGhL._SY200_.jpg");
        for i in 0..40 {
            collector.push(&format!("https://cdn.example.com/images/I/{i:02}ZZZZZZZZZZ.jpg"));
        }

        let images = collector.finish(None, 2, 30);
        assert_eq!(images.len(), 30);
        assert_eq!(
            images.iter().filter(|url| url.contains("71AbCdEfGhL")).count(),
            1
        );
    }

    #[test]
    fn test_id_filter_requires_enough_matches() {
        let mut one_match = ImageCollector::new(TOKEN);
        one_match.push("https://cdn.example.com/p/B0ABCDEFGH/1111111111.jpg");
        one_match.push("https://cdn.example.com/p/other/2222222222.jpg");
        assert_eq!(one_match.finish(Some("B0ABCDEFGH"), 2, 30).len(), 2);

        let mut two_matches = ImageCollector::new(TOKEN);
        two_matches.push("https://cdn.example.com/p/B0ABCDEFGH/1111111111.jpg");
        two_matches.push("https://cdn.example.com/p/B0ABCDEFGH/3333333333.jpg");
        two_matches.push("https://cdn.example.com/p/other/2222222222.jpg");
        let kept = two_matches.finish(Some("B0ABCDEFGH"), 2, 30);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|url| url.contains("B0ABCDEFGH")));
    }
}
