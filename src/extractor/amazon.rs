//! Amazon product pages.
//!
//! Works across regional storefronts (`amazon.com`, `.de`, `.fr`, `.co.uk`,
//! ...). The product identifier is the ten-character ASIN. Most fields have
//! several DOM layouts in circulation at once, so every field is a fallback
//! chain ordered from structured data to legacy selectors.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::common::{collect_key_value_items, collect_table, json_strings, reviews_from_json, split_key_value};
use super::{ExtractorCore, SiteExtractor};
use crate::dom::{self, Document, Selection};
use crate::embedded::{scalar_string, StatePattern};
use crate::error::Result;
use crate::fallback::FallbackChain;
use crate::intercept::{InterceptedCache, Interceptor, PayloadCategory};
use crate::normalize::{
    canonicalize_image_url, collect_videos, currency_for_host, currency_from_text, parse_count, parse_price,
    parse_rating, truncate_chars, ImageCollector,
};
use crate::options::Options;
use crate::page::Page;
use crate::patterns::WIDTH_PERCENT;
use crate::result::{BasicInfo, Pricing, RatingSummary, Review, ReviewSet, Specifications, Variant, Video};

/// Platform key.
pub const PLATFORM: &str = "amazon";

#[allow(clippy::expect_used)]
static ASIN_IN_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(?:dp|gp/product|gp/aw/d)/([A-Z0-9]{10})").expect("ASIN_IN_PATH regex")
});

#[allow(clippy::expect_used)]
static BRAND_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:visit the|visitez la boutique|besuche den|marque\s*:|marke\s*:|brand\s*:?)\s*")
        .expect("BRAND_PREFIX regex")
});

#[allow(clippy::expect_used)]
static BRAND_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[\s-]+(?:store|shop)$").expect("BRAND_SUFFIX regex"));

#[allow(clippy::expect_used)]
static REVIEW_COUNTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)reviewed in (?:the )?(.+?) on ").expect("REVIEW_COUNTRY regex")
});

const TITLE_SELECTORS: &[&str] = &["#productTitle", "#title span", "h1.product-title-word-break"];

const BRAND_SELECTORS: &[&str] = &["#bylineInfo", ".po-brand .po-break-word"];

const PRICE_SELECTORS: &[&str] = &[
    "#corePrice_feature_div .a-offscreen",
    "#priceblock_ourprice, #priceblock_dealprice, #priceblock_saleprice",
    r#".a-price[data-a-color="price"] .a-offscreen"#,
    "#newBuyBoxPrice, #price_inside_buybox",
    ".a-price .a-offscreen",
];

const ORIGINAL_PRICE_SELECTORS: &[&str] = &[
    ".a-text-strike .a-offscreen",
    ".a-price[data-a-strike] .a-offscreen",
    "#listPrice",
    ".a-text-price .a-offscreen",
];

const SPEC_TABLE_SELECTORS: &[&str] = &[
    "#productOverview_feature_div tr",
    "#productDetails_techSpec_section_1 tr",
    "#productDetails_detailBullets_sections1 tr",
    "#prodDetails tr",
    "#tech-specs-desktop tr",
    "#technicalSpecifications_section_1 tr",
];

/// Image URL fragments that mark sprites, spacers and UI chrome.
const NON_PRODUCT_IMAGE_MARKERS: &[&str] = &["transparent-pixel", "grey-pixel", "sprite", "icon", "loading", "placeholder"];

/// Extractor for Amazon product pages.
#[derive(Debug)]
pub struct AmazonExtractor {
    core: ExtractorCore,
}

impl AmazonExtractor {
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            core: ExtractorCore::new(options, &[]),
        }
    }

    fn asin(page: &Page) -> Option<String> {
        let doc = page.document();
        let asin: String = FallbackChain::new("asin")
            .page("url-path", || {
                ASIN_IN_PATH
                    .captures(page.path())
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
            })
            .dom("input-asin", || {
                dom::try_select(doc, r#"input[name="ASIN"], input#ASIN"#).and_then(|input| dom::attr(&input, "value"))
            })
            .dom("data-asin", || {
                dom::select_each(doc, "[data-asin]").find_map(|sel| dom::attr(&sel, "data-asin"))
            })
            .resolve();
        (!asin.is_empty()).then_some(asin)
    }

    fn model_number(doc: &Document) -> Option<String> {
        let mut specs = Specifications::new();
        for selector in SPEC_TABLE_SELECTORS {
            collect_table(doc, selector, &mut specs);
        }
        collect_key_value_items(doc, "#detailBullets_feature_div li", &mut specs);

        specs.into_iter().find_map(|(key, value)| {
            let key = key.to_lowercase();
            (key.contains("model") || key.contains("modèle") || key.contains("modell") || key.contains("modelo"))
                .then_some(value)
        })
    }
}

impl Default for AmazonExtractor {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

fn clean_brand(text: String) -> Option<String> {
    let stripped = BRAND_PREFIX.replace(text.trim(), "");
    let stripped = BRAND_SUFFIX.replace(stripped.trim(), "");
    let brand = stripped.trim();
    (!brand.is_empty()).then(|| brand.to_string())
}

fn price_from_text(text: String) -> Option<f64> {
    Some(parse_price(&text))
}

fn is_product_image(url: &str) -> bool {
    (url.contains("images-amazon") || url.contains("m.media-amazon"))
        && !NON_PRODUCT_IMAGE_MARKERS.iter().any(|marker| url.contains(marker))
}

/// `.a-price-whole` + `.a-price-fraction` rendered separately.
fn split_price(doc: &Document) -> Option<f64> {
    let whole = dom::first_text(doc, ".a-price-whole")?;
    let fraction = dom::first_text(doc, ".a-price-fraction").unwrap_or_default();
    let whole = whole.trim_end_matches(['.', ',']);
    let separator = if whole.contains('.') && !whole.contains(',') && whole.len() > 3 { "," } else { "." };
    Some(parse_price(&format!("{whole}{separator}{fraction}")))
}

/// Keys of `data-a-dynamic-image`, a JSON object of URL to dimensions.
fn dynamic_image_urls(img: &Selection) -> Vec<String> {
    dom::attr(img, "data-a-dynamic-image")
        .and_then(|raw| serde_json::from_str::<serde_json::Map<String, Value>>(&raw).ok())
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

fn review_from_node(node: &Selection, hi_res_token: &str) -> Option<Review> {
    let content = dom::first_text_within(node, r#"[data-hook="review-body"]"#)?;
    let date = dom::first_text_within(node, r#"[data-hook="review-date"]"#).unwrap_or_default();
    let helpful_text = dom::first_text_within(node, r#"[data-hook="helpful-vote-statement"]"#);
    let helpful = helpful_text.as_deref().map_or(0, |text| match parse_count(text) {
        // "One person found this helpful"
        0 => 1,
        count => u32::try_from(count).unwrap_or(u32::MAX),
    });

    Some(Review {
        author: dom::first_text_within(node, ".a-profile-name").unwrap_or_else(|| "Anonymous".to_string()),
        rating: dom::first_text_within(
            node,
            r#"[data-hook="review-star-rating"] .a-icon-alt, [data-hook="cmps-review-star-rating"] .a-icon-alt"#,
        )
        .and_then(|text| parse_rating(&text))
        .unwrap_or(0.0),
        title: dom::first_text_within(node, r#"[data-hook="review-title"] > span:last-child"#)
            .or_else(|| dom::first_text_within(node, r#"[data-hook="review-title"]"#))
            .unwrap_or_default(),
        country: REVIEW_COUNTRY
            .captures(&date)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
        date,
        verified: dom::try_select_within(node, r#"[data-hook="avp-badge"]"#).is_some(),
        helpful,
        images: dom::select_each_within(node, ".review-image-tile")
            .filter_map(|img| dom::first_attr(&img, &["data-src", "src"]))
            .filter_map(|src| canonicalize_image_url(&src, hi_res_token))
            .collect(),
        content,
    })
}

fn rating_summary(doc: &Document) -> Option<RatingSummary> {
    let average = FallbackChain::new("average_rating")
        .dom("rating-out-of-text", || {
            dom::first_text(doc, r#"[data-hook="rating-out-of-text"]"#).and_then(|text| parse_rating(&text))
        })
        .dom("acr-popover", || {
            dom::try_select(doc, "#acrPopover")
                .and_then(|sel| dom::attr(&sel, "title").or_else(|| dom::non_empty_text(&sel)))
                .and_then(|text| parse_rating(&text))
        })
        .dom("average-star-rating", || {
            dom::first_text(doc, r#"[data-hook="average-star-rating"] .a-icon-alt"#).and_then(|text| parse_rating(&text))
        })
        .resolve();

    let total_count = dom::first_text(doc, r#"#acrCustomerReviewText, [data-hook="total-review-count"]"#)
        .map_or(0, |text| parse_count(&text));

    let mut distribution = BTreeMap::new();
    for row in dom::select_each(doc, "#histogramTable tr, #histogramTable li") {
        let text = dom::non_empty_text(&row).unwrap_or_default();
        let Some(star) = text
            .chars()
            .find(char::is_ascii_digit)
            .and_then(|c| c.to_digit(10))
            .and_then(|d| u8::try_from(d).ok())
            .filter(|star| (1..=5).contains(star))
        else {
            continue;
        };
        let percent = WIDTH_PERCENT
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .or_else(|| {
                dom::try_select_within(&row, "[aria-valuenow]")
                    .and_then(|bar| dom::attr(&bar, "aria-valuenow"))
                    .and_then(|value| value.parse::<f64>().ok())
            });
        if let Some(percent) = percent {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            distribution.insert(star, percent.round().clamp(0.0, 100.0) as u32);
        }
    }

    (average > 0.0 || total_count > 0).then_some(RatingSummary {
        average_rating: average,
        total_count,
        distribution,
        positive_rate: None,
    })
}

fn variant_from_values(id: &str, values: &Value) -> Option<Variant> {
    let options: Vec<String> = match values {
        Value::Array(items) => items.iter().filter_map(scalar_string).collect(),
        Value::Object(map) => map.values().filter_map(scalar_string).collect(),
        other => scalar_string(other).into_iter().collect(),
    };
    (!id.is_empty() && !options.is_empty()).then(|| Variant {
        id: id.to_string(),
        title: options.join(" - "),
        available: true,
        options,
        kind: None,
        image: None,
    })
}

fn variants_from_map(value: &Value) -> Vec<Variant> {
    value
        .as_object()
        .map(|map| map.iter().filter_map(|(id, values)| variant_from_values(id, values)).collect())
        .unwrap_or_default()
}

#[async_trait(?Send)]
impl SiteExtractor for AmazonExtractor {
    fn platform(&self) -> &'static str {
        PLATFORM
    }

    fn options(&self) -> &Options {
        &self.core.options
    }

    fn external_id(&self, page: &Page) -> String {
        Self::asin(page).unwrap_or_default()
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

        let title = FallbackChain::new("title")
            .json_ld("product.name", || structured.product_field(|p| p.name.clone()))
            .selectors(doc, TITLE_SELECTORS, Some)
            .page("og:title", || structured.meta.title.clone())
            .resolve();

        let brand = FallbackChain::new("brand")
            .json_ld("product.brand", || structured.product_field(|p| p.brand.clone()))
            .selectors(doc, BRAND_SELECTORS, clean_brand)
            .dom("data-brand", || {
                dom::try_select(doc, "[data-brand]").and_then(|sel| dom::attr(&sel, "data-brand"))
            })
            .page("product:brand", || structured.meta.brand.clone())
            .resolve();

        let description = FallbackChain::new("description")
            .json_ld("product.description", || structured.product_field(|p| p.description.clone()))
            .dom("feature-bullets", || {
                let bullets: Vec<String> = dom::select_each(doc, "#feature-bullets li")
                    .filter_map(|li| dom::non_empty_text(&li))
                    .collect();
                (!bullets.is_empty()).then(|| bullets.join("\n"))
            })
            .dom("product-description", || dom::first_text(doc, "#productDescription"))
            .dom("aplus", || dom::first_text(doc, "#aplus"))
            .page("og:description", || structured.meta.description.clone())
            .resolve();

        let sku = FallbackChain::new("sku")
            .json_ld("product.sku", || structured.product_field(|p| p.sku.clone()))
            .dom("model-number", || Self::model_number(doc))
            .page("asin", || Self::asin(page))
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

        let price = FallbackChain::new("price")
            .json_ld("offers.price", || {
                structured.product_field(|p| p.price.clone()).map(|text| parse_price(&text))
            })
            .selectors(doc, PRICE_SELECTORS, price_from_text)
            .dom("split-price", || split_price(doc))
            .page("product:price:amount", || structured.meta.price.as_deref().map(parse_price))
            .resolve();

        let original_price = FallbackChain::new("original_price")
            .selectors(doc, ORIGINAL_PRICE_SELECTORS, price_from_text)
            .resolve_where(|candidate| *candidate > price);

        let price_text = PRICE_SELECTORS
            .iter()
            .find_map(|selector| dom::first_text(doc, selector))
            .unwrap_or_default();
        let currency = FallbackChain::new("currency")
            .json_ld("offers.priceCurrency", || structured.product_field(|p| p.currency.clone()))
            .page("product:price:currency", || structured.meta.currency.clone())
            .page("hostname", || currency_for_host(page.hostname()).map(str::to_string))
            .dom("price-glyph", || currency_from_text(&price_text).map(str::to_string))
            .dom("body-glyph", || currency_from_text(&page.body_text()).map(str::to_string))
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

        for img in dom::select_each(doc, "#altImages img, #imageBlock img") {
            if let Some(src) = dom::first_attr(&img, &["data-old-hires", "data-a-hires", "src"]) {
                images.push_if(&src, is_product_image);
            }
        }

        for img in dom::select_each(doc, "#landingImage, #imgBlkFront") {
            if let Some(src) = dom::first_attr(&img, &["data-old-hires", "data-a-hires"]) {
                images.push_if(&src, is_product_image);
            }
            for src in dynamic_image_urls(&img) {
                images.push_if(&src, is_product_image);
            }
            if let Some(src) = dom::attr(&img, "src") {
                images.push_if(&src, is_product_image);
            }
        }

        let embedded = page.embedded();
        for src in embedded
            .recover_urls(StatePattern::ColorImages)
            .into_iter()
            .chain(embedded.recover_urls(StatePattern::ImageGalleryData))
        {
            images.push_if(&src, is_product_image);
        }

        for img in dom::select_each(doc, "#aplus img, .aplus-module img") {
            if let Some(src) = dom::first_attr(&img, &["data-src", "src"]) {
                images.push_if(&src, |url| url.contains("images-amazon") || url.contains("m.media-amazon"));
            }
        }

        let structured = page.structured();
        if let Some(product) = &structured.product {
            for src in &product.images {
                images.push_if(src, is_product_image);
            }
        }
        if let Some(src) = &structured.meta.image {
            images.push_if(src, is_product_image);
        }

        if let Some(payload) = self.core.payload(PayloadCategory::Images) {
            for src in json_strings(&payload, &is_product_image) {
                images.push_if(&src, is_product_image);
            }
        }

        let asin = Self::asin(page);
        Ok(images.finish(asin.as_deref(), options.min_id_matches, options.max_images))
    }

    async fn extract_videos(&self, page: &Page) -> Result<Vec<Video>> {
        let doc = page.document();
        let embedded = page.embedded();

        let urls = embedded
            .recover_urls(StatePattern::Mp4VideoUrls)
            .into_iter()
            .chain(embedded.recover_urls(StatePattern::HlsVideoUrls))
            .chain(dom::select_each(doc, "video source, video[src]").filter_map(|sel| dom::attr(&sel, "src")))
            .chain(dom::select_each(doc, "[data-video-url]").filter_map(|sel| dom::attr(&sel, "data-video-url")));

        Ok(collect_videos(urls, PLATFORM, self.core.options.max_videos))
    }

    async fn extract_variants(&self, page: &Page) -> Result<Vec<Variant>> {
        let doc = page.document();
        let embedded = page.embedded();

        let mut variants = embedded
            .recover(StatePattern::DimensionValuesDisplayData)
            .map(variants_from_map)
            .unwrap_or_default();

        if variants.is_empty() {
            variants = embedded
                .recover(StatePattern::AsinVariationValues)
                .map(variants_from_map)
                .unwrap_or_default();
        }

        if variants.is_empty() {
            for option in dom::select_each(doc, "#native_dropdown_selected_size_name option") {
                let Some(value) = dom::attr(&option, "value").filter(|value| value != "-1") else {
                    continue;
                };
                let Some(title) = dom::non_empty_text(&option) else {
                    continue;
                };
                let id = value.rsplit(',').next().unwrap_or(&value).to_string();
                variants.push(Variant {
                    id,
                    available: !dom::class_contains(&option, "Unavailable"),
                    options: vec![title.clone()],
                    title,
                    kind: Some("size".to_string()),
                    image: None,
                });
            }

            for item in dom::select_each(doc, "#variation_color_name li[data-asin]") {
                let Some(id) = dom::attr(&item, "data-asin") else {
                    continue;
                };
                let image = dom::try_select_within(&item, "img");
                let title = dom::attr(&item, "title")
                    .map(|title| {
                        title
                            .trim_start_matches("Click to select ")
                            .trim_start_matches("Cliquez pour sélectionner ")
                            .to_string()
                    })
                    .or_else(|| image.as_ref().and_then(|img| dom::attr(img, "alt")))
                    .unwrap_or_else(|| id.clone());
                variants.push(Variant {
                    available: !dom::class_contains(&item, "swatchUnavailable"),
                    options: vec![title.clone()],
                    title,
                    kind: Some("color".to_string()),
                    image: image
                        .and_then(|img| dom::attr(&img, "src"))
                        .and_then(|src| canonicalize_image_url(&src, &self.core.options.hi_res_token)),
                    id,
                });
            }
        }

        let mut seen = HashSet::new();
        variants.retain(|variant| seen.insert(variant.id.clone()));
        Ok(variants)
    }

    async fn extract_reviews(&self, page: &Page) -> Result<ReviewSet> {
        let doc = page.document();
        let options = &self.core.options;

        let mut reviews: Vec<Review> = dom::select_each(doc, r#"[data-hook="review"]"#)
            .filter_map(|node| review_from_node(&node, &options.hi_res_token))
            .collect();

        if let Some(payload) = self.core.payload(PayloadCategory::Reviews) {
            let seen: HashSet<String> = reviews.iter().map(|review| review.content.clone()).collect();
            reviews.extend(
                reviews_from_json(&payload, options.max_reviews)
                    .into_iter()
                    .filter(|review| !seen.contains(&review.content)),
            );
        }
        reviews.truncate(options.max_reviews);

        Ok(ReviewSet {
            reviews,
            summary: rating_summary(doc),
        })
    }

    async fn extract_specifications(&self, page: &Page) -> Result<Specifications> {
        let doc = page.document();
        let mut specs = Specifications::new();

        for selector in SPEC_TABLE_SELECTORS {
            collect_table(doc, selector, &mut specs);
        }
        collect_key_value_items(doc, "#detailBullets_feature_div li", &mut specs);

        for bullet in dom::select_each(doc, "#productFactsDesktopExpander li") {
            if let Some((key, value)) = dom::non_empty_text(&bullet).as_deref().and_then(split_key_value) {
                specs.insert(key, value);
            }
        }

        Ok(specs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_brand() {
        assert_eq!(clean_brand("Visit the Acme Store".to_string()).as_deref(), Some("Acme"));
        assert_eq!(clean_brand("Marque : Moulinex".to_string()).as_deref(), Some("Moulinex"));
        assert_eq!(clean_brand("Brand: Bosch".to_string()).as_deref(), Some("Bosch"));
        assert_eq!(clean_brand("   ".to_string()), None);
    }

    #[test]
    fn test_is_product_image() {
        assert!(is_product_image("https://m.media-amazon.com/images/I/71AbCdEfGhL.jpg"));
        assert!(!is_product_image("https://m.media-amazon.com/images/G/01/x-locale/transparent-pixel.gif"));
        assert!(!is_product_image("https://cdn.example.com/71AbCdEfGhL.jpg"));
    }

    #[test]
    fn test_asin_sources() {
        let from_url = Page::new("https://www.amazon.com/Kettle/dp/B0ABCDEFGH/ref=sr_1", "");
        assert_eq!(from_url.ok().and_then(|p| AmazonExtractor::asin(&p)).as_deref(), Some("B0ABCDEFGH"));

        let from_input = Page::new(
            "https://www.amazon.com/s?k=kettle",
            r#"<input type="hidden" name="ASIN" value="B0ZZZZZZZZ">"#,
        );
        assert_eq!(from_input.ok().and_then(|p| AmazonExtractor::asin(&p)).as_deref(), Some("B0ZZZZZZZZ"));
    }

    #[test]
    fn test_split_price() {
        let doc = Document::from(
            r#"<span class="a-price"><span class="a-price-whole">1.234,</span><span class="a-price-fraction">56</span></span>"#,
        );
        assert!((split_price(&doc).expect("split price") - 1234.56).abs() < 1e-9);

        let doc = Document::from(
            r#"<span class="a-price-whole">29.</span><span class="a-price-fraction">99</span>"#,
        );
        assert!((split_price(&doc).expect("split price") - 29.99).abs() < 1e-9);
    }

    #[test]
    fn test_variants_from_map() {
        let value = serde_json::json!({"B0AAAAAAAA": ["Red", "XL"], "B0BBBBBBBB": ["Blue"]});
        let variants = variants_from_map(&value);
        assert_eq!(variants.len(), 2);
        assert_eq!(variants[0].title, "Red - XL");
        assert!(variants.iter().all(|variant| variant.available));
    }
}
