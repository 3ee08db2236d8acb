//! AliExpress item pages.
//!
//! Product data lives in the page data object (`window.runParams`,
//! `__INIT_DATA__`, or a bare `data: {...}` literal holding `priceModule`).
//! The object is split into modules (`titleModule`, `priceModule`,
//! `imageModule`, `skuModule`, `feedbackModule`, `specsModule`) which are
//! looked up by key wherever they are nested.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::common::{collect_key_value_items, field, json_strings, reviews_from_json, split_key_value};
use super::{ExtractorCore, SiteExtractor};
use crate::dom::{self, Selection};
use crate::embedded::{find_key, scalar_string, StatePattern};
use crate::error::Result;
use crate::fallback::FallbackChain;
use crate::intercept::{InterceptedCache, Interceptor, PayloadCategory};
use crate::normalize::{
    canonicalize_image_url, collect_videos, currency_from_text, infer_currency, parse_count, parse_price,
    parse_rating, truncate_chars, ImageCollector,
};
use crate::options::Options;
use crate::page::Page;
use crate::patterns::WIDTH_PERCENT;
use crate::result::{BasicInfo, Pricing, RatingSummary, Review, ReviewSet, Specifications, Variant, Video};

/// Platform key.
pub const PLATFORM: &str = "aliexpress";

#[allow(clippy::expect_used)]
static ITEM_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"/item/(\d+)\.html",
        r"/i/(\d+)\.html",
        r"/_p/(\d+)",
        r"[?&]productId=(\d+)",
        r"/(\d{10,})\.html",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("ITEM_ID_PATTERNS regex"))
    .collect()
});

const TITLE_SELECTORS: &[&str] = &[r#"h1[data-pl="product-title"]"#, ".product-title", "h1"];

const PRICE_SELECTORS: &[&str] = &[
    ".product-price-current",
    r#"[class*="price-current"]"#,
    ".uniform-banner-box-price",
    r#"[class*="product-price"] [class*="current"]"#,
];

const ORIGINAL_PRICE_SELECTORS: &[&str] = &[
    ".product-price-origin",
    r#"[class*="price-original"]"#,
    r#"[class*="del"]"#,
];

const DESCRIPTION_SELECTORS: &[&str] = &[".product-description", r#"[class*="description"]"#, "#product-description"];

const GALLERY_SELECTORS: &[&str] = &[
    r#"[class*="slider"] img"#,
    ".images-view img",
    r#"[class*="gallery"] img"#,
    ".image-view-magnifier img",
    ".pdp-info-right-image img",
    ".images-view-item img",
    r#"[class*="thumbnail"] img"#,
];

const VARIANT_ITEM_SELECTOR: &str = r#"[class*="sku-property"] [class*="item"], .sku-item, .sku-property-item"#;

const REVIEW_ITEM_SELECTOR: &str = r#".feedback-item, [class*="review-item"]"#;

/// Extractor for AliExpress item pages.
#[derive(Debug)]
pub struct AliExpressExtractor {
    core: ExtractorCore,
}

impl AliExpressExtractor {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            core: ExtractorCore::new(options, &["sku", "feedback"]),
        }
    }

    /// Numeric item ID from the URL, or `productId` in the page data.
    fn item_id(page: &Page) -> String {
        let url = page.url();
        FallbackChain::new("item_id")
            .page("url", || {
                ITEM_ID_PATTERNS
                    .iter()
                    .find_map(|re| re.captures(url).and_then(|caps| caps.get(1)))
                    .map(|m| m.as_str().to_string())
            })
            .script("page-data.productId", || {
                page_data(page).and_then(|data| find_key(data, "productId").and_then(scalar_string))
            })
            .resolve()
    }
}

impl Default for AliExpressExtractor {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

/// The page data object: `runParams`, `__INIT_DATA__`, then any `data:`
/// literal that carries a `priceModule`.
fn page_data(page: &Page) -> Option<&Value> {
    page.embedded()
        .recover_first_of(&[StatePattern::RunParams, StatePattern::InitData, StatePattern::DataModules])
        .map(|(pattern, value)| {
            tracing::trace!(pattern = pattern.name(), "aliexpress page data recovered");
            value
        })
}

fn module<'v>(data: Option<&'v Value>, name: &str) -> Option<&'v Value> {
    data.and_then(|data| find_key(data, name))
}

/// `{ "value": 12.5, "currency": "USD" }` or a bare number/string.
fn amount(module: &Value, key: &str) -> Option<f64> {
    let node = module.get(key)?;
    let raw = node.get("value").unwrap_or(node);
    scalar_string(raw).map(|text| parse_price(&text))
}

fn is_alicdn(url: &str) -> bool {
    url.contains("alicdn")
}

fn is_product_image(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    is_alicdn(&lower) && !lower.contains("avatar") && !lower.contains("icon")
}

fn price_from_text(text: String) -> Option<f64> {
    Some(parse_price(&text))
}

fn variants_from_sku_module(sku_module: &Value, hi_res_token: &str) -> Vec<Variant> {
    let Some(properties) = sku_module.get("productSKUPropertyList").and_then(Value::as_array) else {
        return Vec::new();
    };

    properties
        .iter()
        .flat_map(|property| {
            let kind = field(property, &["skuPropertyName"]);
            property
                .get("skuPropertyValues")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(move |value| {
                    let id = field(value, &["propertyValueId", "propertyValueIdLong"])?;
                    let title = field(value, &["propertyValueDisplayName", "propertyValueName"])
                        .unwrap_or_else(|| id.clone());
                    Some(Variant {
                        id,
                        options: vec![title.clone()],
                        title,
                        available: true,
                        kind: kind.clone(),
                        image: field(value, &["skuPropertyImagePath"])
                            .and_then(|src| canonicalize_image_url(&src, hi_res_token)),
                    })
                })
        })
        .collect()
}

fn variant_from_node(index: usize, node: &Selection, hi_res_token: &str) -> Option<Variant> {
    let title = dom::attr(node, "title").or_else(|| dom::non_empty_text(node))?;
    Some(Variant {
        id: dom::first_attr(node, &["data-sku-id", "data-value"]).unwrap_or_else(|| format!("var_{index}")),
        options: vec![title.clone()],
        title,
        available: !dom::class_contains(node, "disabled"),
        kind: None,
        image: dom::try_select_within(node, "img")
            .and_then(|img| dom::attr(&img, "src"))
            .and_then(|src| canonicalize_image_url(&src, hi_res_token)),
    })
}

/// Star rating from the filled-star width (`width: 80%` is 4 stars).
fn star_width_rating(node: &Selection) -> Option<f64> {
    dom::select_each_within(node, "[style]")
        .filter_map(|sel| dom::attr(&sel, "style"))
        .find_map(|style| {
            WIDTH_PERCENT
                .captures(&style)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok())
        })
        .map(|percent| (percent / 20.0).clamp(0.0, 5.0))
}

fn review_from_node(node: &Selection) -> Option<Review> {
    let content = dom::first_text_within(node, r#".buyer-feedback, [class*="content"]"#)?;
    Some(Review {
        author: dom::first_text_within(node, r#".user-name, [class*="reviewer"]"#)
            .unwrap_or_else(|| "Anonymous".to_string()),
        rating: star_width_rating(node).unwrap_or(5.0),
        content,
        date: dom::first_text_within(node, r#".r-time, [class*="date"]"#).unwrap_or_default(),
        country: dom::first_text_within(node, r#".user-country, [class*="country"]"#).unwrap_or_default(),
        images: dom::select_each_within(node, r#"img[src*="alicdn"]"#)
            .filter_map(|img| dom::attr(&img, "src"))
            .filter(|src| !src.contains("avatar"))
            .collect(),
        ..Review::default()
    })
}

fn rating_summary(feedback: &Value) -> Option<RatingSummary> {
    let average = field(feedback, &["evarageStar", "averageStar"])
        .and_then(|text| parse_rating(&text))
        .unwrap_or(0.0);
    let total_count = field(feedback, &["totalValidNum", "reviewCount"]).map_or(0, |text| parse_count(&text));
    (average > 0.0 || total_count > 0).then(|| RatingSummary {
        average_rating: average,
        total_count,
        positive_rate: field(feedback, &["positiveRate"]),
        ..RatingSummary::default()
    })
}

#[async_trait(?Send)]
impl SiteExtractor for AliExpressExtractor {
    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn options(&self) -> &Options {
        &self.core.options
    }

    fn external_id(&self, page: &Page) -> String {
        Self::item_id(page)
    }

    fn intercepted(&self) -> &Arc<InterceptedCache> {
        &self.core.intercepted
    }

    fn interceptor(&self) -> &Interceptor {
        &self.core.interceptor
    }

    async fn extract_basic_info(&self, page: &Page) -> Result<BasicInfo> {
        let doc = page.document();
        let structured = page.structured();
        let data = page_data(page);
        let title_module = module(data, "titleModule");

        let title = FallbackChain::new("title")
            .json_ld("product.name", || structured.product_field(|p| p.name.clone()))
            .script("titleModule.subject", || title_module.and_then(|m| field(m, &["subject"])))
            .selectors(doc, TITLE_SELECTORS, Some)
            .page("og:title", || structured.meta.title.clone())
            .resolve();

        let brand = FallbackChain::new("brand")
            .json_ld("product.brand", || structured.product_field(|p| p.brand.clone()))
            .script("storeModule.storeName", || {
                module(data, "storeModule").and_then(|m| field(m, &["storeName"]))
            })
            .dom("store-name", || dom::first_text(doc, r#"[class*="store-name"], [class*="shop-name"]"#))
            .page("meta.brand", || structured.meta.brand.clone())
            .resolve();

        let description = FallbackChain::new("description")
            .json_ld("product.description", || structured.product_field(|p| p.description.clone()))
            .selectors(doc, DESCRIPTION_SELECTORS, Some)
            .page("og:description", || structured.meta.description.clone())
            .resolve();

        let sku = FallbackChain::new("sku")
            .json_ld("product.sku", || structured.product_field(|p| p.sku.clone()))
            .page("item-id", || Some(Self::item_id(page)))
            .resolve();

        Ok(BasicInfo {
            title,
            brand,
            description: truncate_chars(&description, self.core.options.max_description_len),
            sku,
        })
    }

    async fn extract_pricing(&self, page: &Page) -> Result<Pricing> {
        let doc = page.document();
        let structured = page.structured();
        let data = page_data(page);
        let price_module = module(data, "priceModule");

        let price = FallbackChain::new("price")
            .script("priceModule.minAmount", || price_module.and_then(|m| amount(m, "minAmount")))
            .script("priceModule.activityAmount", || price_module.and_then(|m| amount(m, "activityAmount")))
            .script("priceModule.formattedActivityPrice", || {
                price_module
                    .and_then(|m| field(m, &["formattedActivityPrice", "formatedActivityPrice"]))
                    .map(|text| parse_price(&text))
            })
            .json_ld("offers.price", || {
                structured.product_field(|p| p.price.clone()).map(|text| parse_price(&text))
            })
            .selectors(doc, PRICE_SELECTORS, price_from_text)
            .page("product:price:amount", || structured.meta.price.as_deref().map(parse_price))
            .resolve();

        let original_price = FallbackChain::new("original_price")
            .script("priceModule.originalAmount", || price_module.and_then(|m| amount(m, "originalAmount")))
            .script("priceModule.maxAmount", || price_module.and_then(|m| amount(m, "maxAmount")))
            .selectors(doc, ORIGINAL_PRICE_SELECTORS, price_from_text)
            .resolve_where(|candidate| *candidate > price);

        let price_text = PRICE_SELECTORS
            .iter()
            .find_map(|selector| dom::first_text(doc, selector))
            .unwrap_or_default();
        let currency = FallbackChain::new("currency")
            .script("priceModule.minAmount.currency", || {
                price_module
                    .and_then(|m| m.get("minAmount"))
                    .and_then(|amount| field(amount, &["currency"]))
            })
            .script("currencyCode", || module(data, "currencyCode").and_then(scalar_string))
            .json_ld("offers.priceCurrency", || structured.product_field(|p| p.currency.clone()))
            .page("product:price:currency", || structured.meta.currency.clone())
            .dom("price-glyph", || currency_from_text(&price_text).map(str::to_string))
            .dom("body-glyph", || currency_from_text(&page.body_text()).map(str::to_string))
            .page("inferred", || {
                Some(infer_currency(page.hostname(), "", &self.core.options.default_currency))
            })
            .resolve();

        Ok(Pricing {
            price,
            original_price: (original_price > 0.0).then_some(original_price),
            currency,
        })
    }

    async fn extract_images(&self, page: &Page) -> Result<Vec<String>> {
        let doc = page.document();
        let options = &self.core.options;
        let mut images = ImageCollector::new(&options.hi_res_token);

        let data = page_data(page);
        if let Some(paths) = module(data, "imageModule")
            .and_then(|m| m.get("imagePathList"))
            .and_then(Value::as_array)
        {
            for src in paths.iter().filter_map(scalar_string) {
                images.push(&src);
            }
        }

        for selector in GALLERY_SELECTORS {
            for img in dom::select_each(doc, selector) {
                if let Some(src) = dom::first_attr(&img, &["data-src", "src"]) {
                    images.push_if(&src, is_product_image);
                }
            }
        }

        for src in page.embedded().recover_urls(StatePattern::ImagePathList) {
            images.push(&src);
        }

        let structured = page.structured();
        if let Some(product) = &structured.product {
            for src in &product.images {
                images.push(src);
            }
        }
        if let Some(src) = &structured.meta.image {
            images.push_if(src, is_product_image);
        }

        if let Some(payload) = self.core.payload(PayloadCategory::Images) {
            for src in json_strings(&payload, &|s| is_product_image(s)) {
                images.push(&src);
            }
        }

        let item_id = Self::item_id(page);
        Ok(images.finish(Some(item_id.as_str()), options.min_id_matches, options.max_images))
    }

    async fn extract_videos(&self, page: &Page) -> Result<Vec<Video>> {
        let doc = page.document();
        let item_id = Self::item_id(page);
        let data = page_data(page);

        let from_uid = module(data, "imageModule")
            .and_then(|m| field(m, &["videoUid"]))
            .filter(|uid| !uid.is_empty() && !item_id.is_empty())
            .map(|uid| format!("https://cloud.video.taobao.com/play/u/{uid}/p/1/e/6/t/1/{item_id}.mp4"));

        let urls = from_uid
            .into_iter()
            .chain(dom::select_each(doc, "video source, video").filter_map(|sel| dom::attr(&sel, "src")))
            .chain(page.embedded().recover_urls(StatePattern::Mp4VideoUrls))
            .chain(page.embedded().recover_urls(StatePattern::HlsVideoUrls));

        Ok(collect_videos(urls, PLATFORM, self.core.options.max_videos))
    }

    async fn extract_variants(&self, page: &Page) -> Result<Vec<Variant>> {
        let doc = page.document();
        let token = &self.core.options.hi_res_token;
        let data = page_data(page);

        let mut variants = module(data, "skuModule")
            .map(|m| variants_from_sku_module(m, token))
            .unwrap_or_default();

        if variants.is_empty() {
            if let Some(payload) = self.core.payload(PayloadCategory::Skus) {
                if let Some(m) = find_key(&payload, "skuModule") {
                    variants = variants_from_sku_module(m, token);
                }
            }
        }

        if variants.is_empty() {
            variants = dom::select_each(doc, VARIANT_ITEM_SELECTOR)
                .enumerate()
                .filter_map(|(index, node)| variant_from_node(index, &node, token))
                .collect();
        }

        let mut seen = HashSet::new();
        variants.retain(|variant| seen.insert(variant.id.clone()));
        Ok(variants)
    }

    async fn extract_reviews(&self, page: &Page) -> Result<ReviewSet> {
        let doc = page.document();
        let cap = self.core.options.max_reviews;
        let data = page_data(page);

        let mut reviews = self
            .core
            .payload(PayloadCategory::Reviews)
            .map(|payload| {
                let list = find_key(&payload, "evaViewList").unwrap_or(&payload);
                reviews_from_json(list, cap)
            })
            .unwrap_or_default();

        if reviews.is_empty() {
            reviews = dom::select_each(doc, REVIEW_ITEM_SELECTOR)
                .filter_map(|node| review_from_node(&node))
                .take(cap)
                .collect();
        }

        let summary = module(data, "feedbackModule").and_then(rating_summary).or_else(|| {
            let structured = page.structured();
            let average = structured
                .product_field(|p| p.rating_value.clone())
                .and_then(|text| parse_rating(&text))
                .unwrap_or(0.0);
            let total_count = structured
                .product_field(|p| p.review_count.clone())
                .map_or(0, |text| parse_count(&text));
            (average > 0.0 || total_count > 0).then(|| RatingSummary {
                average_rating: average,
                total_count,
                ..RatingSummary::default()
            })
        });

        Ok(ReviewSet { reviews, summary })
    }

    async fn extract_specifications(&self, page: &Page) -> Result<Specifications> {
        let doc = page.document();
        let mut specs = Specifications::new();

        let data = page_data(page);
        if let Some(props) = module(data, "specsModule")
            .and_then(|m| m.get("props"))
            .and_then(Value::as_array)
        {
            for prop in props {
                if let (Some(key), Some(value)) = (field(prop, &["attrName"]), field(prop, &["attrValue"])) {
                    specs.insert(key, value);
                }
            }
        }

        if specs.is_empty() {
            for item in dom::select_each(doc, r#"[class*="specification"] li, [class*="property-item"]"#) {
                let pair = match (
                    dom::first_text_within(&item, r#"[class*="name"], [class*="key"]"#),
                    dom::first_text_within(&item, r#"[class*="value"]"#),
                ) {
                    (Some(key), Some(value)) => split_key_value(&format!("{key}:{value}")),
                    _ => dom::non_empty_text(&item).as_deref().and_then(split_key_value),
                };
                if let Some((key, value)) = pair {
                    specs.insert(key, value);
                }
            }
        }

        if specs.is_empty() {
            collect_key_value_items(doc, r#"[class*="specs"] li"#, &mut specs);
        }

        Ok(specs)
    }
}
