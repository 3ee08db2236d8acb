//! Helpers shared by the site extractors.

use serde_json::Value;

use crate::dom::{self, Document, Selection};
use crate::embedded::scalar_string;
use crate::normalize::parse_rating;
use crate::result::{Review, Specifications};

// === Specifications ===

/// Strip bidi marks, surrounding whitespace and a trailing colon.
pub(crate) fn clean_spec_key(key: &str) -> String {
    let key: String = key
        .chars()
        .filter(|c| !matches!(c, '\u{200e}' | '\u{200f}' | '\u{202a}'..='\u{202e}'))
        .collect();
    dom::clean_text(key.trim().trim_end_matches(':').trim())
}

fn clean_spec_value(value: &str) -> String {
    let value: String = value
        .chars()
        .filter(|c| !matches!(c, '\u{200e}' | '\u{200f}' | '\u{202a}'..='\u{202e}'))
        .collect();
    dom::clean_text(&value)
}

/// Split `"Key : Value"` at the first colon.
pub(crate) fn split_key_value(text: &str) -> Option<(String, String)> {
    let (key, value) = text.split_once(':')?;
    let key = clean_spec_key(key);
    let value = clean_spec_value(value);
    (!key.is_empty() && !value.is_empty()).then_some((key, value))
}

/// Key and value of a table row: `<th>` + `<td>`, or the first two `<td>`s.
pub(crate) fn row_pair(row: &Selection) -> Option<(String, String)> {
    let cells: Vec<Selection> = dom::select_each_within(row, "td").collect();
    let (key, value) = match dom::first_text_within(row, "th") {
        Some(key) => (key, cells.first().and_then(dom::non_empty_text)?),
        None => (
            cells.first().and_then(dom::non_empty_text)?,
            cells.get(1).and_then(dom::non_empty_text)?,
        ),
    };
    let key = clean_spec_key(&key);
    let value = clean_spec_value(&value);
    (!key.is_empty() && !value.is_empty()).then_some((key, value))
}

/// Insert every row pair matched by `selector`; later keys overwrite.
pub(crate) fn collect_table(doc: &Document, selector: &str, specs: &mut Specifications) {
    for row in dom::select_each(doc, selector) {
        if let Some((key, value)) = row_pair(&row) {
            specs.insert(key, value);
        }
    }
}

/// Insert every `Key: Value` line matched by `selector`.
pub(crate) fn collect_key_value_items(doc: &Document, selector: &str, specs: &mut Specifications) {
    for item in dom::select_each(doc, selector) {
        if let Some((key, value)) = dom::non_empty_text(&item).as_deref().and_then(split_key_value) {
            specs.insert(key, value);
        }
    }
}

// === JSON walking ===

/// Every string leaf in `value` accepted by `accept`, in document order.
pub(crate) fn json_strings(value: &Value, accept: &dyn Fn(&str) -> bool) -> Vec<String> {
    let mut found = Vec::new();
    walk_strings(value, accept, &mut found);
    found
}

fn walk_strings(value: &Value, accept: &dyn Fn(&str) -> bool, found: &mut Vec<String>) {
    match value {
        Value::String(s) if accept(s.as_str()) => found.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| walk_strings(item, accept, found)),
        Value::Object(map) => map.values().for_each(|item| walk_strings(item, accept, found)),
        _ => {}
    }
}

/// First string or number under any of `keys`.
pub(crate) fn field(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| obj.get(*key).and_then(scalar_string))
}

const AUTHOR_KEYS: &[&str] = &["author", "buyerName", "userName", "reviewerName", "nickname", "nick_name"];
const RATING_KEYS: &[&str] = &["rating", "buyerEval", "score", "stars", "overallRating", "star"];
const CONTENT_KEYS: &[&str] = &["content", "buyerFeedback", "reviewText", "text", "comment", "body"];
const TITLE_KEYS: &[&str] = &["title", "headline"];
const DATE_KEYS: &[&str] = &["date", "evalDate", "reviewDate", "commentTime", "createdAt"];
const COUNTRY_KEYS: &[&str] = &["country", "buyerCountry"];
const IMAGE_KEYS: &[&str] = &["images", "pictures", "reviewImages", "picList"];

/// Star rating on a 0-5 scale; percentages (`buyerEval: 100`) are divided by 20.
pub(crate) fn normalize_star_rating(raw: &str) -> f64 {
    let rating = parse_rating(raw).unwrap_or(0.0);
    let rating = match raw.trim().parse::<f64>() {
        Ok(value) if value > 5.0 && value <= 100.0 => value / 20.0,
        _ => rating,
    };
    rating.clamp(0.0, 5.0)
}

/// Reviews from the first array in `value` whose objects carry review text.
pub(crate) fn reviews_from_json(value: &Value, cap: usize) -> Vec<Review> {
    let Some(items) = find_review_array(value) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let content = field(item, CONTENT_KEYS)?;
            Some(Review {
                author: field(item, AUTHOR_KEYS).unwrap_or_else(|| "Anonymous".to_string()),
                rating: field(item, RATING_KEYS).map_or(0.0, |raw| normalize_star_rating(&raw)),
                content,
                title: field(item, TITLE_KEYS).unwrap_or_default(),
                date: field(item, DATE_KEYS).unwrap_or_default(),
                verified: false,
                helpful: 0,
                country: field(item, COUNTRY_KEYS).unwrap_or_default(),
                images: IMAGE_KEYS
                    .iter()
                    .find_map(|key| item.get(*key))
                    .map(|images| json_strings(images, &|s| s.contains("//")))
                    .unwrap_or_default(),
            })
        })
        .take(cap)
        .collect()
}

fn find_review_array(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items)
            if items
                .iter()
                .any(|item| CONTENT_KEYS.iter().any(|key| item.get(*key).is_some())) =>
        {
            Some(items)
        }
        Value::Array(items) => items.iter().find_map(find_review_array),
        Value::Object(map) => map.values().find_map(find_review_array),
        _ => None,
    }
}
