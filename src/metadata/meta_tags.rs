//! Product meta tags.
//!
//! Reads Open Graph (`og:*`), the Facebook product namespace
//! (`product:price:amount`) and schema.org microdata `itemprop` attributes.
//! The first non-empty value for each field wins.

use crate::dom::{self, Document};

/// Product fields advertised through `<meta>` tags and microdata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaProduct {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub brand: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
}

/// Examine `<meta>` tags and `itemprop` microdata for product fields.
#[must_use]
pub fn examine_meta(doc: &Document) -> MetaProduct {
    let mut result = MetaProduct::default();

    for meta in dom::select_each(doc, "meta") {
        let name = dom::first_attr(&meta, &["property", "name", "itemprop"])
            .unwrap_or_default()
            .to_lowercase();
        let Some(content) = dom::attr(&meta, "content") else {
            continue;
        };

        let slot = match name.as_str() {
            "og:title" | "twitter:title" | "name" => &mut result.title,
            "og:description" | "twitter:description" | "description" => &mut result.description,
            "og:image" | "twitter:image" | "twitter:image:src" | "image" => &mut result.image,
            "product:brand" | "og:brand" | "brand" => &mut result.brand,
            "product:price:amount" | "og:price:amount" | "price" => &mut result.price,
            "product:price:currency" | "og:price:currency" | "pricecurrency" => &mut result.currency,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(content);
        }
    }

    // Microdata on visible elements: <span itemprop="price" content="12.99">
    if result.price.is_none() {
        result.price = dom::select_each(doc, r#"[itemprop="price"]"#)
            .find_map(|sel| dom::attr(&sel, "content").or_else(|| dom::non_empty_text(&sel)));
    }
    if result.currency.is_none() {
        result.currency = dom::select_each(doc, r#"[itemprop="priceCurrency"]"#)
            .find_map(|sel| dom::attr(&sel, "content").or_else(|| dom::non_empty_text(&sel)));
    }

    result
}
