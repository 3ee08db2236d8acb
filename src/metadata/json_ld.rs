//! JSON-LD Product parsing.
//!
//! Walks every `application/ld+json` block (including `@graph` arrays and
//! nested objects) and keeps the most relevant `Product` node. Shops often
//! nest `Product` inside `ItemPage` or `BreadcrumbList` containers, so depth
//! lowers relevance rather than excluding a node.

use serde_json::{Map, Value};

use crate::dom::{self, Document};
use crate::embedded::scalar_string;

/// A `Product` node with the fields extractors read from it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductSchema {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub images: Vec<String>,
    pub rating_value: Option<String>,
    pub review_count: Option<String>,
}

/// A typed node found while walking the JSON-LD tree.
#[derive(Debug, Clone)]
struct SchemaNode {
    data: Map<String, Value>,
    importance: i32,
}

/// Most relevant `Product` node across all JSON-LD blocks.
///
/// Blocks that fail to parse are skipped.
#[must_use]
pub fn extract_product_schema(doc: &Document) -> Option<ProductSchema> {
    let mut products = Vec::new();

    for text in dom::json_ld_scripts(doc) {
        match serde_json::from_str::<Value>(&text) {
            Ok(data) => collect_products(&data, 0, &mut products),
            Err(err) => tracing::trace!(%err, "skipping unparsable JSON-LD block"),
        }
    }

    products.sort_by(|a, b| b.importance.cmp(&a.importance));
    products.first().map(|node| product_from_map(&node.data))
}

fn collect_products(value: &Value, depth: i32, products: &mut Vec<SchemaNode>) {
    match value {
        Value::Object(map) => {
            let types = schema_types(map);
            let is_product = types
                .iter()
                .any(|t| matches!(t.as_str(), "product" | "productgroup" | "individualproduct"));

            if is_product {
                products.push(SchemaNode {
                    data: map.clone(),
                    importance: calculate_importance(map, depth),
                });
            }

            for child in map.values() {
                collect_products(child, depth + 1, products);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_products(item, depth, products);
            }
        }
        _ => {}
    }
}

fn schema_types(map: &Map<String, Value>) -> Vec<String> {
    match map.get("@type") {
        Some(Value::String(s)) => vec![s.to_lowercase()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_lowercase)
            .collect(),
        _ => Vec::new(),
    }
}

fn calculate_importance(map: &Map<String, Value>, depth: i32) -> i32 {
    let offer_bonus = if map.contains_key("offers") { 20 } else { 0 };
    let name_bonus = if map.contains_key("name") { 10 } else { 0 };
    100 - depth * 10 + offer_bonus + name_bonus
}

fn product_from_map(data: &Map<String, Value>) -> ProductSchema {
    let offer = first_offer(data);

    ProductSchema {
        name: single_string(data, "name"),
        brand: data.get("brand").and_then(named_value),
        description: single_string(data, "description"),
        sku: single_string(data, "sku").or_else(|| single_string(data, "mpn")),
        price: offer.and_then(|offer| {
            offer
                .get("price")
                .or_else(|| offer.get("lowPrice"))
                .and_then(scalar_string)
        }),
        currency: offer.and_then(|offer| single_string(offer, "priceCurrency")),
        images: data.get("image").map(image_urls).unwrap_or_default(),
        rating_value: data
            .get("aggregateRating")
            .and_then(|rating| rating.get("ratingValue"))
            .and_then(scalar_string),
        review_count: data
            .get("aggregateRating")
            .and_then(|rating| rating.get("reviewCount").or_else(|| rating.get("ratingCount")))
            .and_then(scalar_string),
    }
}

/// `offers` may be one `Offer`, an `AggregateOffer` or a list of offers.
fn first_offer(data: &Map<String, Value>) -> Option<&Map<String, Value>> {
    match data.get("offers")? {
        Value::Object(offer) => Some(offer),
        Value::Array(offers) => offers.iter().find_map(Value::as_object),
        _ => None,
    }
}

/// A string, or the `name` of an object such as `{"@type": "Brand", "name": ...}`.
fn named_value(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => single_string(map, "name"),
        Value::Array(items) => items.first().and_then(named_value),
        other => scalar_string(other),
    }
}

fn single_string(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::Array(items) => items.first().and_then(scalar_string),
        other => scalar_string(other),
    }
}

fn image_urls(image: &Value) -> Vec<String> {
    match image {
        Value::String(s) => vec![s.trim().to_string()],
        Value::Object(obj) => obj
            .get("url")
            .or_else(|| obj.get("contentUrl"))
            .and_then(Value::as_str)
            .map(|url| vec![url.trim().to_string()])
            .unwrap_or_default(),
        Value::Array(items) => items.iter().flat_map(image_urls).collect(),
        _ => Vec::new(),
    }
}
