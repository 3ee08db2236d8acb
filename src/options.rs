//! Configuration options for product extraction.
//!
//! The `Options` struct controls caps, thresholds and defaults shared by all
//! site extractors. Every field is public; start from `Options::default()`.

/// Configuration options for product extraction.
///
/// # Example
///
/// ```rust
/// use product_extract::Options;
///
/// let options = Options {
///     max_images: 12,
///     default_currency: "USD".to_string(),
///     ..Options::default()
/// };
/// assert_eq!(options.max_videos, 10);
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum number of images returned per product.
    ///
    /// Default: `30`
    pub max_images: usize,

    /// Maximum number of videos returned per product.
    ///
    /// Default: `10`
    pub max_videos: usize,

    /// Maximum number of reviews returned per product.
    ///
    /// Default: `50`
    pub max_reviews: usize,

    /// Maximum description length in characters.
    ///
    /// Default: `5000`
    pub max_description_len: usize,

    /// Minimum number of images whose URL contains the product ID before the
    /// image list is narrowed to those images only.
    ///
    /// Default: `2`
    pub min_id_matches: usize,

    /// Currency used when neither the hostname nor the page text reveals one.
    ///
    /// Default: `"EUR"`
    pub default_currency: String,

    /// Size token substituted into Amazon-style CDN URLs.
    ///
    /// Default: `"._AC_SL1500_."`
    pub hi_res_token: String,

    /// Additional URL substrings that mark a network response as relevant
    /// to the interceptor, on top of each extractor's own list.
    ///
    /// Default: empty
    pub extra_relevance_keywords: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_images: 30,
            max_videos: 10,
            max_reviews: 50,
            max_description_len: 5000,
            min_id_matches: 2,
            default_currency: "EUR".to_string(),
            hi_res_token: "._AC_SL1500_.".to_string(),
            extra_relevance_keywords: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = Options::default();

        assert_eq!(opts.max_images, 30);
        assert_eq!(opts.max_videos, 10);
        assert_eq!(opts.max_reviews, 50);
        assert_eq!(opts.max_description_len, 5000);
        assert_eq!(opts.min_id_matches, 2);
        assert_eq!(opts.default_currency, "EUR");
        assert_eq!(opts.hi_res_token, "._AC_SL1500_.");
        assert!(opts.extra_relevance_keywords.is_empty());
    }

    #[test]
    fn test_custom_caps() {
        let opts = Options {
            max_images: 5,
            max_reviews: 3,
            ..Options::default()
        };

        assert_eq!(opts.max_images, 5);
        assert_eq!(opts.max_reviews, 3);
        assert_eq!(opts.max_videos, 10);
    }
}
