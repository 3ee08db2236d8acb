//! # product-extract
//!
//! Product data extraction for e-commerce pages.
//!
//! Given a rendered product page (URL plus HTML) and, optionally, the JSON
//! responses the page fetched while loading, this library produces one
//! normalized [`ProductRecord`]: identity, title, brand, pricing, images,
//! videos, variants, reviews and specifications.
//!
//! ## Quick Start
//!
//! ```rust
//! use product_extract::extract;
//!
//! let html = r#"<html><body>
//!     <span id="productTitle">Steel Water Bottle</span>
//!     <div id="corePrice_feature_div"><span class="a-offscreen">$19.99</span></div>
//! </body></html>"#;
//!
//! let record = extract("https://www.amazon.com/dp/B0EXAMPLE1", html)?;
//! assert_eq!(record.external_id, "B0EXAMPLE1");
//! assert_eq!(record.price, 19.99);
//! assert_eq!(record.currency, "USD");
//! # Ok::<(), product_extract::Error>(())
//! ```
//!
//! ## Features
//!
//! - **Per-site extractors**: Amazon (all storefronts), Temu, AliExpress
//! - **Fallback chains**: every field tries structured data, embedded script
//!   state, intercepted payloads and DOM selectors in order
//! - **Network interception**: relevant JSON responses captured while the
//!   page loads are fed back into extraction
//! - **Failure isolation**: a broken category degrades to its empty default
//!   and never aborts the record

mod error;
mod options;
mod patterns;
mod result;

/// DOM helpers over `dom_query` that tolerate bad selectors.
pub mod dom;

/// Embedded-state recovery from inline scripts.
pub mod embedded;

/// Character encoding detection and transcoding.
pub mod encoding;

/// Ordered, short-circuiting field resolution.
pub mod fallback;

/// Passive network interception and the intercepted-payload cache.
pub mod intercept;

/// Structured data (JSON-LD, meta tags, microdata).
pub mod metadata;

/// Price, currency, image and video normalization.
pub mod normalize;

/// A parsed product page.
pub mod page;

/// Site extractors, the orchestrator and the registry.
pub mod extractor;

// Public API - re-exports
pub use error::{Error, Result};
pub use extractor::{extract_complete, extract_complete_blocking, Registry, SiteExtractor};
pub use options::Options;
pub use page::Page;
pub use result::{
    BasicInfo, Pricing, ProductRecord, RatingSummary, Review, ReviewSet, Specifications, Variant, Video,
    VideoKind,
};

/// Extracts a product record from a rendered page using default options.
///
/// The platform is detected from the URL's hostname.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] when `url` does not parse and
/// [`Error::UnsupportedPlatform`] when no extractor matches its hostname.
pub fn extract(url: &str, html: &str) -> Result<ProductRecord> {
    extract_with_options(url, html, &Options::default())
}

/// Extracts a product record with custom options.
///
/// # Example
///
/// ```rust
/// use product_extract::{extract_with_options, Options};
///
/// let options = Options {
///     default_currency: "USD".to_string(),
///     ..Options::default()
/// };
/// let html = r#"<h1>Tasse</h1><span class="product-price-current">3,20</span>"#;
/// let record = extract_with_options("https://www.aliexpress.com/item/1005001234567890.html", html, &options)?;
/// assert_eq!(record.title, "Tasse");
/// assert_eq!(record.currency, "USD");
/// # Ok::<(), product_extract::Error>(())
/// ```
///
/// # Errors
///
/// Same as [`extract`].
pub fn extract_with_options(url: &str, html: &str, options: &Options) -> Result<ProductRecord> {
    let page = Page::new(url, html)?;
    let registry = Registry::with_defaults(options.clone());
    let extractor = registry.create_for(&page)?;
    Ok(extract_complete_blocking(extractor.as_ref(), &page))
}

/// Extracts a product record from raw HTML bytes.
///
/// The encoding is taken from a byte-order mark, the `Content-Type`
/// charset, or a `<meta charset>` declaration, in that order, falling back
/// to UTF-8. Invalid sequences become U+FFFD.
///
/// # Errors
///
/// Same as [`extract`].
pub fn extract_bytes(url: &str, html: &[u8], content_type: Option<&str>) -> Result<ProductRecord> {
    let page = Page::from_bytes(url, html, content_type)?;
    let registry = Registry::default();
    let extractor = registry.create_for(&page)?;
    Ok(extract_complete_blocking(extractor.as_ref(), &page))
}
