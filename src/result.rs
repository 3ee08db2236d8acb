//! Result types for extraction output.
//!
//! `ProductRecord` is the single value produced by one
//! [`extract_complete`](crate::extractor::extract_complete) call. The smaller
//! types are the per-category results the record is merged from.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flat specification map. Inserting an existing key overwrites it.
pub type Specifications = BTreeMap<String, String>;

/// Normalized product record handed to the ingestion pipeline.
///
/// Fields that could not be resolved hold their empty default: `""`, `0.0`,
/// `None`, an empty list or an empty map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Platform-specific product identifier (ASIN, goods id, item id).
    pub external_id: String,

    /// URL of the page the record was extracted from.
    pub url: String,

    /// Platform key (`amazon`, `temu`, `aliexpress`).
    pub platform: String,

    /// Version of the extractor that produced the record.
    pub version: String,

    /// Extraction timestamp.
    #[serde(rename = "extractedAt")]
    pub extracted_at: DateTime<Utc>,

    pub title: String,
    pub brand: String,
    pub description: String,
    pub sku: String,

    /// Current price, `0.0` when unknown.
    pub price: f64,

    /// Strike-through price, only set when greater than `price`.
    #[serde(rename = "originalPrice")]
    pub original_price: Option<f64>,

    /// ISO 4217 currency code.
    pub currency: String,

    pub images: Vec<String>,
    pub videos: Vec<Video>,
    pub variants: Vec<Variant>,
    pub reviews: Vec<Review>,

    /// Aggregate rating, when the page exposes one.
    #[serde(rename = "ratingSummary", skip_serializing_if = "Option::is_none", default)]
    pub rating_summary: Option<RatingSummary>,

    pub specifications: Specifications,
}

/// Title, brand, description and SKU.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub title: String,
    pub brand: String,
    pub description: String,
    pub sku: String,
}

/// Current price, strike-through price and currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub price: f64,
    #[serde(rename = "originalPrice")]
    pub original_price: Option<f64>,
    pub currency: String,
}

/// One purchasable variation of a product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub title: String,
    pub available: bool,

    /// Dimension values, e.g. `["Red", "XL"]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// Dimension name (`color`, `size`, a site-specific label).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Swatch image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Container format of a product video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoKind {
    Mp4,
    Hls,
}

/// A product video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: VideoKind,
    pub platform: String,
}

/// A single customer review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    pub rating: f64,
    pub content: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub helpful: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Aggregate rating for a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    #[serde(rename = "averageRating")]
    pub average_rating: f64,
    #[serde(rename = "totalCount")]
    pub total_count: u64,
    /// Star level (1-5) to percentage of reviews.
    #[serde(default)]
    pub distribution: BTreeMap<u8, u32>,
    #[serde(rename = "positiveRate", default, skip_serializing_if = "Option::is_none")]
    pub positive_rate: Option<String>,
}

/// Output of the reviews category: individual reviews plus the aggregate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewSet {
    pub reviews: Vec<Review>,
    pub summary: Option<RatingSummary>,
}

impl ProductRecord {
    /// Number of populated categories, used for completion logging.
    #[must_use]
    pub fn populated_categories(&self) -> usize {
        [
            !self.title.is_empty(),
            self.price > 0.0,
            !self.images.is_empty(),
            !self.videos.is_empty(),
            !self.variants.is_empty(),
            !self.reviews.is_empty() || self.rating_summary.is_some(),
            !self.specifications.is_empty(),
        ]
        .into_iter()
        .filter(|populated| *populated)
        .count()
    }
}
