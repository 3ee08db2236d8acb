//! Structured product metadata.
//!
//! The most reliable probes for basic info and pricing read data the shop
//! publishes for search engines:
//! 1. JSON-LD (`schema.org/Product`)
//! 2. Meta tags (Open Graph, `product:*`, microdata)
//!
//! Both are parsed once per page into [`StructuredData`] and shared by the
//! category probes.

pub mod json_ld;
pub mod meta_tags;

use crate::dom::Document;

pub use json_ld::{extract_product_schema, ProductSchema};
pub use meta_tags::{examine_meta, MetaProduct};

/// Structured product data found on one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredData {
    pub product: Option<ProductSchema>,
    pub meta: MetaProduct,
}

impl StructuredData {
    /// Parse JSON-LD and meta tags.
    #[must_use]
    pub fn extract(doc: &Document) -> Self {
        Self {
            product: extract_product_schema(doc),
            meta: examine_meta(doc),
        }
    }

    /// JSON-LD product field, e.g. `|p| p.name.clone()`.
    pub fn product_field(&self, get: impl Fn(&ProductSchema) -> Option<String>) -> Option<String> {
        self.product.as_ref().and_then(get)
    }
}
