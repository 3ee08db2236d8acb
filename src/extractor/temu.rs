//! Temu goods pages.
//!
//! Temu renders almost everything client-side from a hydration object
//! (`window.rawData` or `__INITIAL_STATE__`), so embedded state is the
//! primary source and the obfuscated DOM class names are the fallback.
//! Class names are matched by substring since their suffixes are hashed.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::common::{collect_key_value_items, collect_table, field, json_strings, reviews_from_json};
use super::{ExtractorCore, SiteExtractor};
use crate::dom::{self, Selection};
use crate::embedded::{find_key, scalar_string, StatePattern};
use crate::error::Result;
use crate::fallback::FallbackChain;
use crate::intercept::{InterceptedCache, Interceptor, PayloadCategory};
use crate::normalize::{
    canonicalize_image_url, collect_videos, currency_for_host, currency_from_text, parse_count, parse_price,
    parse_rating, truncate_chars, ImageCollector,
};
use crate::options::Options;
use crate::page::Page;
use crate::result::{BasicInfo, Pricing, RatingSummary, Review, ReviewSet, Specifications, Variant, Video};

/// Platform key.
pub const PLATFORM: &str = "temu";

#[allow(clippy::expect_used)]
static GOODS_ID_IN_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-g-(\d+)\.html").expect("GOODS_ID_IN_PATH regex"));

const TITLE_SELECTORS: &[&str] = &["h1", r#"[class*="ProductTitle"]"#, r#"[class*="goods-title"]"#];

const PRICE_SELECTORS: &[&str] = &[
    r#"[class*="sale-price"]"#,
    r#"[class*="goods-price"]"#,
    r#"[class*="price"]"#,
    r#"[class*="Price"]"#,
];

const ORIGINAL_PRICE_SELECTORS: &[&str] = &[
    r#"[class*="original-price"]"#,
    r#"[class*="market-price"]"#,
    r#"[class*="line-price"]"#,
    "del",
];

/// Extractor for Temu goods pages.
#[derive(Debug)]
pub struct TemuExtractor {
    core: ExtractorCore,
}

impl TemuExtractor {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            core: ExtractorCore::new(options, &["goods", "sku", "comment"]),
        }
    }

    /// Hydration state: `rawData` first, then `__INITIAL_STATE__`.
    fn state(page: &Page) -> Option<&Value> {
        page.embedded()
            .recover_first_of(&[StatePattern::RawData, StatePattern::InitialState])
            .map(|(_, value)| value)
    }

    fn goods_id(page: &Page, state: Option<&Value>) -> String {
        FallbackChain::new("goods_id")
            .page("url-path", || {
                GOODS_ID_IN_PATH
                    .captures(page.path())
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            })
            .page("query", || page.query_param("goods_id"))
            .script("state.goodsId", || state.and_then(|s| find_key(s, "goodsId")).and_then(scalar_string))
            .resolve()
    }
}

impl Default for TemuExtractor {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

fn is_goods_image(url: &str) -> bool {
    url.contains("kwcdn.com") && !url.contains("avatar") && !url.contains("icon")
}

fn looks_like_goods_image(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    is_goods_image(&lower)
        && [".jpg", ".jpeg", ".png", ".webp"].iter().any(|ext| lower.contains(ext))
}

fn state_string(state: Option<&Value>, keys: &[&str]) -> Option<String> {
    let state = state?;
    keys.iter().find_map(|key| find_key(state, key).and_then(scalar_string))
}

fn price_from_text(text: String) -> Option<f64> {
    Some(parse_price(&text))
}

/// One entry of `skcList`: id, spec values, thumbnail and stock flag.
fn variant_from_skc(item: &Value, hi_res_token: &str) -> Option<Variant> {
    let id = field(item, &["skuId", "skcId", "id"])?;
    let options: Vec<String> = item
        .get("specs")
        .or_else(|| item.get("specList"))
        .and_then(Value::as_array)
        .map(|specs| {
            specs
                .iter()
                .filter_map(|spec| field(spec, &["specValue", "spec_value", "value"]))
                .collect()
        })
        .unwrap_or_default();
    let kind = item
        .get("specs")
        .and_then(Value::as_array)
        .and_then(|specs| specs.first())
        .and_then(|spec| field(spec, &["specKey", "spec_key", "key"]));
    let available = match item.get("stockQuantity").or_else(|| item.get("stock")) {
        Some(stock) => stock.as_f64().is_none_or(|n| n > 0.0),
        None => item.get("isOnSale").and_then(Value::as_i64).is_none_or(|flag| flag != 0),
    };

    Some(Variant {
        title: if options.is_empty() { id.clone() } else { options.join(" / ") },
        id,
        available,
        options,
        kind,
        image: field(item, &["thumbUrl", "imageUrl", "image"])
            .and_then(|src| canonicalize_image_url(&src, hi_res_token)),
    })
}

fn review_from_node(node: &Selection) -> Option<Review> {
    let content = dom::first_text_within(node, r#"[class*="content"], [class*="text"]"#)?;
    let rating = dom::select_each_within(node, "[aria-label]")
        .filter_map(|sel| dom::attr(&sel, "aria-label"))
        .filter(|label| label.to_ascii_lowercase().contains("star"))
        .find_map(|label| parse_rating(&label))
        .unwrap_or(0.0);

    Some(Review {
        author: dom::first_text_within(node, r#"[class*="name"]"#).unwrap_or_else(|| "Anonymous".to_string()),
        rating,
        content,
        date: dom::first_text_within(node, r#"[class*="date"], [class*="time"]"#).unwrap_or_default(),
        images: dom::select_each_within(node, "img")
            .filter_map(|img| dom::first_attr(&img, &["data-src", "src"]))
            .filter(|src| is_goods_image(src))
            .collect(),
        ..Review::default()
    })
}

#[async_trait(?Send)]
impl SiteExtractor for TemuExtractor {
    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn options(&self) -> &Options {
        &self.core.options
    }

    fn external_id(&self, page: &Page) -> String {
        Self::goods_id(page, Self::state(page))
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
        let state = Self::state(page);
        let product = self.core.payload(PayloadCategory::Product);

        let title = FallbackChain::new("title")
            .json_ld("product.name", || structured.product_field(|p| p.name.clone()))
            .script("state.goodsName", || state_string(state, &["goodsName", "goods_name"]))
            .intercepted("product.goodsName", || state_string(product.as_ref(), &["goodsName", "goods_name"]))
            .selectors(doc, TITLE_SELECTORS, Some)
            .page("og:title", || structured.meta.title.clone())
            .resolve();

        let brand = FallbackChain::new("brand")
            .json_ld("product.brand", || structured.product_field(|p| p.brand.clone()))
            .script("state.brandName", || state_string(state, &["brandName", "mallName"]))
            .dom("mall-name", || dom::first_text(doc, r#"[class*="mall-name"], [class*="MallName"]"#))
            .resolve();

        let description = FallbackChain::new("description")
            .json_ld("product.description", || structured.product_field(|p| p.description.clone()))
            .script("state.goodsDesc", || state_string(state, &["goodsDesc", "goods_desc"]))
            .dom("goods-desc", || dom::first_text(doc, r#"[class*="goods-desc"], [class*="description"]"#))
            .page("og:description", || structured.meta.description.clone())
            .resolve();

        let sku = FallbackChain::new("sku")
            .json_ld("product.sku", || structured.product_field(|p| p.sku.clone()))
            .page("goods-id", || Some(Self::goods_id(page, state)))
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
        let state = Self::state(page);

        let price = FallbackChain::new("price")
            .json_ld("offers.price", || {
                structured.product_field(|p| p.price.clone()).map(|text| parse_price(&text))
            })
            .script("state.salePriceStr", || {
                state_string(state, &["salePriceStr", "minOnSalePriceStr", "priceStr"])
                    .map(|text| parse_price(&text))
            })
            .selectors(doc, PRICE_SELECTORS, price_from_text)
            .page("product:price:amount", || structured.meta.price.as_deref().map(parse_price))
            .resolve();

        let original_price = FallbackChain::new("original_price")
            .script("state.marketPriceStr", || {
                state_string(state, &["marketPriceStr", "linePriceStr"]).map(|text| parse_price(&text))
            })
            .selectors(doc, ORIGINAL_PRICE_SELECTORS, price_from_text)
            .resolve_where(|candidate| *candidate > price);

        // Temu serves every locale from temu.com, so the price glyph is a
        // better signal than the hostname.
        let price_text = PRICE_SELECTORS
            .iter()
            .find_map(|selector| dom::first_text(doc, selector))
            .unwrap_or_default();
        let currency = FallbackChain::new("currency")
            .json_ld("offers.priceCurrency", || structured.product_field(|p| p.currency.clone()))
            .page("product:price:currency", || structured.meta.currency.clone())
            .script("state.currency", || state_string(state, &["currency", "currencyCode"]))
            .dom("price-glyph", || currency_from_text(&price_text).map(str::to_string))
            .dom("body-glyph", || currency_from_text(&page.body_text()).map(str::to_string))
            .page("hostname", || currency_for_host(page.hostname()).map(str::to_string))
            .page("default", || Some(self.core.options.default_currency.clone()))
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

        let structured = page.structured();
        if let Some(product) = &structured.product {
            for src in &product.images {
                images.push(src);
            }
        }
        if let Some(src) = &structured.meta.image {
            images.push_if(src, is_goods_image);
        }

        for img in dom::select_each(doc, r#"img[src*="kwcdn.com"], img[data-src*="kwcdn.com"]"#) {
            if let Some(src) = dom::first_attr(&img, &["data-src", "src"]) {
                images.push_if(&src, is_goods_image);
            }
        }

        if let Some(state) = Self::state(page) {
            let gallery = find_key(state, "gallery").or_else(|| find_key(state, "goodsGallery"));
            for src in json_strings(gallery.unwrap_or(state), &looks_like_goods_image) {
                images.push_if(&src, is_goods_image);
            }
        }

        if let Some(payload) = self.core.payload(PayloadCategory::Images) {
            for src in json_strings(&payload, &looks_like_goods_image) {
                images.push_if(&src, is_goods_image);
            }
        }

        let goods_id = self.external_id(page);
        Ok(images.finish(Some(goods_id.as_str()), options.min_id_matches, options.max_images))
    }

    async fn extract_videos(&self, page: &Page) -> Result<Vec<Video>> {
        let doc = page.document();
        let embedded = page.embedded();

        let urls = embedded
            .recover_urls(StatePattern::Mp4VideoUrls)
            .into_iter()
            .chain(embedded.recover_urls(StatePattern::HlsVideoUrls))
            .chain(dom::select_each(doc, "video source, video[src]").filter_map(|sel| dom::attr(&sel, "src")));

        Ok(collect_videos(urls, PLATFORM, self.core.options.max_videos))
    }

    async fn extract_variants(&self, page: &Page) -> Result<Vec<Variant>> {
        let doc = page.document();
        let token = &self.core.options.hi_res_token;

        let skc_list = page
            .embedded()
            .recover(StatePattern::SkcList)
            .or_else(|| Self::state(page).and_then(|state| find_key(state, "skcList")))
            .cloned()
            .or_else(|| {
                self.core
                    .payload(PayloadCategory::Skus)
                    .and_then(|payload| find_key(&payload, "skcList").or_else(|| find_key(&payload, "skuList")).cloned())
            });

        let mut variants: Vec<Variant> = skc_list
            .as_ref()
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(|item| variant_from_skc(item, token)).collect())
            .unwrap_or_default();

        if variants.is_empty() {
            let items = dom::select_each(doc, r#"[class*="sku-item"], [class*="option-item"]"#);
            for (index, item) in items.enumerate() {
                let Some(title) = dom::non_empty_text(&item).or_else(|| dom::attr(&item, "title")) else {
                    continue;
                };
                if title.chars().count() >= 100 {
                    continue;
                }
                variants.push(Variant {
                    id: dom::first_attr(&item, &["data-sku-id", "data-id", "data-value"])
                        .unwrap_or_else(|| format!("option-{index}")),
                    available: !(dom::class_contains(&item, "disabled") || dom::class_contains(&item, "sold-out")),
                    options: vec![title.clone()],
                    title,
                    kind: Some("option".to_string()),
                    image: dom::try_select_within(&item, "img")
                        .and_then(|img| dom::attr(&img, "src"))
                        .and_then(|src| canonicalize_image_url(&src, token)),
                });
            }
        }

        let mut seen = HashSet::new();
        variants.retain(|variant| seen.insert(variant.id.clone()));
        Ok(variants)
    }

    async fn extract_reviews(&self, page: &Page) -> Result<ReviewSet> {
        let doc = page.document();
        let cap = self.core.options.max_reviews;
        let state = Self::state(page);

        let mut reviews = self
            .core
            .payload(PayloadCategory::Reviews)
            .map(|payload| reviews_from_json(&payload, cap))
            .unwrap_or_default();

        if reviews.is_empty() {
            if let Some(list) = state.and_then(|s| find_key(s, "reviewList").or_else(|| find_key(s, "comments"))) {
                reviews = reviews_from_json(list, cap);
            }
        }

        if reviews.is_empty() {
            reviews = dom::select_each(doc, r#"[class*="review-item"], [class*="ReviewItem"]"#)
                .filter_map(|node| review_from_node(&node))
                .take(cap)
                .collect();
        }

        let average = state_string(state, &["goodsScore", "averageScore"])
            .and_then(|text| parse_rating(&text))
            .or_else(|| structured_rating(page))
            .or_else(|| dom::first_text(doc, r#"[class*="rating"]"#).and_then(|text| parse_rating(&text)))
            .unwrap_or(0.0);
        let total_count = state_string(state, &["reviewNum", "commentNum"])
            .or_else(|| page.structured().product_field(|p| p.review_count.clone()))
            .or_else(|| dom::first_text(doc, r#"[class*="review-count"], [class*="Reviews"]"#))
            .map_or(0, |text| parse_count(&text));

        Ok(ReviewSet {
            reviews,
            summary: (average > 0.0 || total_count > 0).then(|| RatingSummary {
                average_rating: average,
                total_count,
                ..RatingSummary::default()
            }),
        })
    }

    async fn extract_specifications(&self, page: &Page) -> Result<Specifications> {
        let doc = page.document();
        let mut specs = Specifications::new();

        if let Some(properties) = Self::state(page)
            .and_then(|state| find_key(state, "goodsProperty"))
            .and_then(Value::as_array)
        {
            for property in properties {
                let Some(key) = field(property, &["key", "name"]) else {
                    continue;
                };
                let value = match property.get("values") {
                    Some(Value::Array(values)) => values.iter().filter_map(scalar_string).collect::<Vec<_>>().join(", "),
                    _ => field(property, &["value"]).unwrap_or_default(),
                };
                if !value.is_empty() {
                    specs.insert(key, value);
                }
            }
        }

        collect_table(doc, r#"[class*="spec"] tr"#, &mut specs);
        collect_key_value_items(
            doc,
            r#"[class*="goods-property"] li, [class*="specification"] li, [class*="property-item"]"#,
            &mut specs,
        );

        Ok(specs)
    }
}

fn structured_rating(page: &Page) -> Option<f64> {
    page.structured()
        .product_field(|p| p.rating_value.clone())
        .and_then(|text| parse_rating(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goods_id_from_path_and_query() {
        let page = Page::new("https://www.temu.com/fr/lampe-led-g-601099512345678.html", "").expect("valid url");
        assert_eq!(TemuExtractor::goods_id(&page, None), "601099512345678");

        let page = Page::new("https://www.temu.com/goods.html?goods_id=601099000000001", "").expect("valid url");
        assert_eq!(TemuExtractor::goods_id(&page, None), "601099000000001");
    }

    #[test]
    fn test_variant_from_skc() {
        let item = serde_json::json!({
            "skuId": 17592186044417_u64,
            "specs": [{"specKey": "Color", "specValue": "White"}, {"specKey": "Size", "specValue": "L"}],
            "thumbUrl": "https://img.kwcdn.com/product/Fancyalgo1234567_300.jpg",
            "stockQuantity": 0
        });

        let variant = variant_from_skc(&item, "._AC_SL1500_.").expect("skc variant");
        assert_eq!(variant.id, "17592186044417");
        assert_eq!(variant.title, "White / L");
        assert_eq!(variant.kind.as_deref(), Some("Color"));
        assert!(!variant.available);
        assert_eq!(
            variant.image.as_deref(),
            Some("https://img.kwcdn.com/product/Fancyalgo1234567.jpg")
        );
    }

    #[test]
    fn test_image_filters() {
        assert!(is_goods_image("https://img.kwcdn.com/product/a.jpg"));
        assert!(!is_goods_image("https://img.kwcdn.com/avatar/a.jpg"));
        assert!(!looks_like_goods_image("https://img.kwcdn.com/product/"));
    }
}
