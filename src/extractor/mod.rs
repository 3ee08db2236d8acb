//! Per-site extractors and the orchestrator that runs them.
//!
//! # Module Structure
//!
//! - `amazon`: Amazon product pages (all regional storefronts)
//! - `temu`: Temu goods pages
//! - `aliexpress`: AliExpress item pages
//! - `registry`: platform key to constructor mapping and hostname detection
//!
//! # Usage
//!
//! ```rust
//! use product_extract::extractor::{extract_complete_blocking, Registry};
//! use product_extract::{Options, Page};
//!
//! let page = Page::new(
//!     "https://www.amazon.de/dp/B0ABCDEFGH",
//!     r#"<span id="productTitle">Wasserkocher</span>
//!        <div id="corePrice_feature_div"><span class="a-offscreen">24,99 €</span></div>"#,
//! )?;
//! let registry = Registry::with_defaults(Options::default());
//! let extractor = registry.create_for(&page)?;
//! let record = extract_complete_blocking(extractor.as_ref(), &page);
//!
//! assert_eq!(record.title, "Wasserkocher");
//! assert_eq!(record.price, 24.99);
//! assert_eq!(record.currency, "EUR");
//! # Ok::<(), product_extract::Error>(())
//! ```

pub mod aliexpress;
pub mod amazon;
mod common;
pub mod registry;
pub mod temu;

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;

use crate::error::Result;
use crate::intercept::{InterceptedCache, Interceptor, NetworkHost, PayloadCategory};
use crate::normalize::infer_currency;
use crate::options::Options;
use crate::page::Page;
use crate::result::{BasicInfo, Pricing, ProductRecord, ReviewSet, Specifications, Variant, Video};

pub use aliexpress::AliExpressExtractor;
pub use amazon::AmazonExtractor;
pub use registry::Registry;
pub use temu::TemuExtractor;

/// Capability set every platform extractor implements.
///
/// Category methods are independent of each other: each reads the page
/// (and intercepted payloads) on its own and may fail without affecting
/// the rest. The orchestrator converts a failed category to its default.
#[async_trait(?Send)]
pub trait SiteExtractor {
    /// Platform key, e.g. `"amazon"`.
    fn platform(&self) -> &'static str;

    /// Extractor version recorded in every product record.
    fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    fn options(&self) -> &Options;

    /// Platform product identifier, empty when not found.
    fn external_id(&self, page: &Page) -> String;

    /// Payloads captured by this instance's interceptor.
    fn intercepted(&self) -> &Arc<InterceptedCache>;

    fn interceptor(&self) -> &Interceptor;

    /// Hook `host` so relevant responses reach this extractor. Idempotent.
    fn install_interception(&self, host: &dyn NetworkHost) -> bool {
        let observer: Arc<InterceptedCache> = Arc::clone(self.intercepted());
        self.interceptor().install(host, observer)
    }

    /// Feed one captured response through the relevance filter and cache.
    fn process_intercepted_data(&self, url: &str, json: serde_json::Value) {
        self.intercepted().process_intercepted_data(url, json);
    }

    async fn extract_basic_info(&self, page: &Page) -> Result<BasicInfo>;
    async fn extract_pricing(&self, page: &Page) -> Result<Pricing>;
    async fn extract_images(&self, page: &Page) -> Result<Vec<String>>;
    async fn extract_videos(&self, page: &Page) -> Result<Vec<Video>>;
    async fn extract_variants(&self, page: &Page) -> Result<Vec<Variant>>;
    async fn extract_reviews(&self, page: &Page) -> Result<ReviewSet>;
    async fn extract_specifications(&self, page: &Page) -> Result<Specifications>;
}

/// Run all seven categories concurrently and merge them into one record.
///
/// Never fails: a category that errors or panics contributes its default.
pub async fn extract_complete(extractor: &dyn SiteExtractor, page: &Page) -> ProductRecord {
    let platform = extractor.platform();
    tracing::info!(platform, url = page.url(), "extraction started");

    let external_id = panic::catch_unwind(AssertUnwindSafe(|| extractor.external_id(page)))
        .unwrap_or_else(|payload| {
            tracing::warn!(platform, reason = %panic_message(&*payload), "external id lookup panicked");
            String::new()
        });

    let (basic, pricing, images, videos, variants, reviews, specifications) = futures::join!(
        isolate("basic_info", extractor.extract_basic_info(page)),
        isolate("pricing", extractor.extract_pricing(page)),
        isolate("images", extractor.extract_images(page)),
        isolate("videos", extractor.extract_videos(page)),
        isolate("variants", extractor.extract_variants(page)),
        isolate("reviews", extractor.extract_reviews(page)),
        isolate("specifications", extractor.extract_specifications(page)),
    );

    let currency = if pricing.currency.is_empty() {
        infer_currency(page.hostname(), &page.body_text(), &extractor.options().default_currency)
    } else {
        pricing.currency
    };
    let price = if pricing.price.is_finite() && pricing.price > 0.0 { pricing.price } else { 0.0 };

    let record = ProductRecord {
        external_id,
        url: page.url().to_string(),
        platform: platform.to_string(),
        version: extractor.version().to_string(),
        extracted_at: Utc::now(),
        title: basic.title,
        brand: basic.brand,
        description: basic.description,
        sku: basic.sku,
        price,
        original_price: pricing.original_price.filter(|original| *original > price),
        currency,
        images,
        videos,
        variants,
        reviews: reviews.reviews,
        rating_summary: reviews.summary,
        specifications,
    };

    tracing::info!(
        platform,
        external_id = %record.external_id,
        images = record.images.len(),
        videos = record.videos.len(),
        variants = record.variants.len(),
        reviews = record.reviews.len(),
        specifications = record.specifications.len(),
        populated = record.populated_categories(),
        "extraction complete"
    );
    record
}

/// [`extract_complete`] on a local executor.
#[must_use]
pub fn extract_complete_blocking(extractor: &dyn SiteExtractor, page: &Page) -> ProductRecord {
    futures::executor::block_on(extract_complete(extractor, page))
}

/// Await one category, turning errors and panics into its default.
async fn isolate<T: Default>(category: &'static str, future: impl Future<Output = Result<T>>) -> T {
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(value)) => value,
        Ok(Err(err)) => {
            tracing::warn!(category, %err, "category failed; using default");
            T::default()
        }
        Err(payload) => {
            tracing::warn!(category, reason = %panic_message(&*payload), "category panicked; using default");
            T::default()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Shared state every built-in extractor owns.
#[derive(Debug)]
pub(crate) struct ExtractorCore {
    pub options: Options,
    pub interceptor: Interceptor,
    pub intercepted: Arc<InterceptedCache>,
}

impl ExtractorCore {
    pub fn new(options: Options, site_keywords: &[&str]) -> Self {
        let intercepted = Arc::new(InterceptedCache::new(site_keywords, &options.extra_relevance_keywords));
        Self {
            options,
            interceptor: Interceptor::new(),
            intercepted,
        }
    }

    pub fn payload(&self, category: PayloadCategory) -> Option<serde_json::Value> {
        self.intercepted.json(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::result::{RatingSummary, Review};

    struct Flaky {
        core: ExtractorCore,
    }

    #[async_trait(?Send)]
    impl SiteExtractor for Flaky {
        fn platform(&self) -> &'static str {
            "flaky"
        }

        fn options(&self) -> &Options {
            &self.core.options
        }

        fn external_id(&self, _page: &Page) -> String {
            "F1".to_string()
        }

        fn intercepted(&self) -> &Arc<InterceptedCache> {
            &self.core.intercepted
        }

        fn interceptor(&self) -> &Interceptor {
            &self.core.interceptor
        }

        async fn extract_basic_info(&self, _page: &Page) -> Result<BasicInfo> {
            Ok(BasicInfo {
                title: "Kettle".to_string(),
                ..BasicInfo::default()
            })
        }

        async fn extract_pricing(&self, _page: &Page) -> Result<Pricing> {
            Ok(Pricing {
                price: 10.0,
                original_price: Some(8.0),
                currency: String::new(),
            })
        }

        async fn extract_images(&self, _page: &Page) -> Result<Vec<String>> {
            Ok(vec!["https://cdn.example.com/a.jpg".to_string()])
        }

        async fn extract_videos(&self, _page: &Page) -> Result<Vec<Video>> {
            panic!("video probe exploded")
        }

        async fn extract_variants(&self, _page: &Page) -> Result<Vec<Variant>> {
            Err(Error::Category {
                category: "variants",
                reason: "boom".to_string(),
            })
        }

        async fn extract_reviews(&self, _page: &Page) -> Result<ReviewSet> {
            Ok(ReviewSet {
                reviews: vec![Review {
                    author: "Ada".to_string(),
                    rating: 4.0,
                    content: "Boils fast".to_string(),
                    ..Review::default()
                }],
                summary: Some(RatingSummary {
                    average_rating: 4.0,
                    total_count: 1,
                    ..RatingSummary::default()
                }),
            })
        }

        async fn extract_specifications(&self, _page: &Page) -> Result<Specifications> {
            Ok(Specifications::new())
        }
    }

    #[test]
    fn test_failures_isolated_per_category() {
        let page = Page::new("https://shop.example.co.uk/p/1", "<html></html>").expect("valid url");
        let extractor = Flaky {
            core: ExtractorCore::new(Options::default(), &[]),
        };

        let record = extract_complete_blocking(&extractor, &page);
        assert_eq!(record.external_id, "F1");
        assert_eq!(record.title, "Kettle");
        assert_eq!(record.price, 10.0);
        assert_eq!(record.images.len(), 1);
        assert!(record.videos.is_empty());
        assert!(record.variants.is_empty());
        assert_eq!(record.reviews.len(), 1);
        assert_eq!(record.reviews[0].content, "Boils fast");
        assert_eq!(record.rating_summary.map(|summary| summary.total_count), Some(1));
        // Not greater than price, so dropped.
        assert_eq!(record.original_price, None);
        // Filled from the hostname when pricing leaves it empty.
        assert_eq!(record.currency, "GBP");
    }

    #[test]
    fn test_missing_currency_read_from_body_text() {
        let html = "<html><body><p>Total: 12,00 £</p><script>var $ = window.jQuery;</script></body></html>";
        let page = Page::new("https://shop.example/p/1", html).expect("valid url");
        let extractor = Flaky {
            core: ExtractorCore::new(Options::default(), &[]),
        };

        let record = extract_complete_blocking(&extractor, &page);
        assert_eq!(record.currency, "GBP");
    }

    #[test]
    fn test_panic_message_variants() {
        let static_payload: Box<dyn Any + Send> = Box::new("static");
        let owned_payload: Box<dyn Any + Send> = Box::new("owned".to_string());
        assert_eq!(panic_message(&*static_payload), "static");
        assert_eq!(panic_message(&*owned_payload), "owned");
    }
}
