//! DOM query helpers.
//!
//! Thin wrappers over `dom_query` that every extractor uses. Selectors arrive
//! from hand-maintained probe lists, so every lookup goes through
//! `try_select`: a selector that fails to compile behaves like a selector
//! that matched nothing.

pub use dom_query::{Document, Matcher, Selection};

use crate::error::{Error, Result};
use crate::patterns::WHITESPACE_NORMALIZE;

// === Querying ===

/// Compile `selector`.
///
/// # Errors
///
/// Returns [`Error::InvalidSelector`] when the selector does not parse.
pub fn compile(selector: &str) -> Result<Matcher> {
    Matcher::new(selector).map_err(|err| Error::InvalidSelector(format!("`{selector}`: {err:?}")))
}

fn compiled(selector: &str) -> Option<Matcher> {
    compile(selector)
        .map_err(|err| tracing::debug!(%err, "skipping selector"))
        .ok()
}

/// Select all matches of `selector`, or `None` for no match or a selector
/// that does not compile.
#[must_use]
pub fn try_select<'a>(doc: &'a Document, selector: &str) -> Option<Selection<'a>> {
    let matcher = compiled(selector)?;
    Some(doc.select_matcher(&matcher)).filter(Selection::exists)
}

/// Select matches of `selector` below `sel`, tolerant of bad selectors.
#[must_use]
pub fn try_select_within<'a>(sel: &Selection<'a>, selector: &str) -> Option<Selection<'a>> {
    let matcher = compiled(selector)?;
    Some(sel.select_matcher(&matcher)).filter(Selection::exists)
}

/// Iterate over every element matching `selector`.
pub fn select_each<'a>(doc: &'a Document, selector: &str) -> impl Iterator<Item = Selection<'a>> {
    try_select(doc, selector).into_iter().flat_map(|sel| sel.iter().collect::<Vec<_>>())
}

/// Iterate over every element below `sel` matching `selector`.
pub fn select_each_within<'a>(
    sel: &Selection<'a>,
    selector: &str,
) -> impl Iterator<Item = Selection<'a>> {
    try_select_within(sel, selector)
        .into_iter()
        .flat_map(|found| found.iter().collect::<Vec<_>>())
}

// === Text Content ===

/// Collapse runs of whitespace and trim.
#[must_use]
pub fn clean_text(text: &str) -> String {
    WHITESPACE_NORMALIZE.replace_all(text, " ").trim().to_string()
}

/// Rendered text of a selection without `script` and `style` contents,
/// whitespace-collapsed.
#[must_use]
pub fn visible_text(sel: &Selection) -> String {
    clean_text(&sel.formatted_text())
}

/// Cleaned text of a selection, `None` when empty.
#[must_use]
pub fn non_empty_text(sel: &Selection) -> Option<String> {
    let text = clean_text(&sel.text());
    (!text.is_empty()).then_some(text)
}

/// Cleaned text of the first element matching `selector` that has any text.
#[must_use]
pub fn first_text(doc: &Document, selector: &str) -> Option<String> {
    select_each(doc, selector).find_map(|sel| non_empty_text(&sel))
}

/// Cleaned text of the first element below `sel` matching `selector`.
#[must_use]
pub fn first_text_within(sel: &Selection, selector: &str) -> Option<String> {
    select_each_within(sel, selector).find_map(|found| non_empty_text(&found))
}

// === Attributes ===

/// Trimmed, non-empty attribute value.
#[must_use]
pub fn attr(sel: &Selection, name: &str) -> Option<String> {
    sel.attr(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// First non-empty attribute among `names`.
#[must_use]
pub fn first_attr(sel: &Selection, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| attr(sel, name))
}

/// Whether the element's `class` attribute contains `fragment`.
#[must_use]
pub fn class_contains(sel: &Selection, fragment: &str) -> bool {
    sel.attr("class").is_some_and(|class| class.contains(fragment))
}

// === Scripts ===

/// Text of every inline (non-`src`) script element.
#[must_use]
pub fn inline_scripts(doc: &Document) -> Vec<String> {
    select_each(doc, "script:not([src])")
        .map(|script| script.text().to_string())
        .filter(|text| !text.trim().is_empty())
        .collect()
}

/// Text of every `application/ld+json` script.
#[must_use]
pub fn json_ld_scripts(doc: &Document) -> Vec<String> {
    select_each(doc, r#"script[type="application/ld+json"]"#)
        .map(|script| script.text().trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selector_is_none() {
        let doc = Document::from("<div class='a'>x</div>");
        assert!(try_select(&doc, "div[[[").is_none());
        assert!(try_select(&doc, ".a").is_some());
        assert!(try_select(&doc, ".missing").is_none());
        assert!(try_select_within(&doc.select("div"), "span[").is_none());
    }

    #[test]
    fn test_compile_reports_invalid_selector() {
        assert!(compile("div > .a").is_ok());
        let err = compile("div[[[").err().expect("invalid selector");
        assert!(matches!(err, Error::InvalidSelector(ref text) if text.contains("div[[[")));
    }

    #[test]
    fn test_visible_text_skips_scripts() {
        let doc = Document::from(
            "<body><p>Prix : 12,00 €</p><script>var $ = jQuery;</script><style>a{}</style></body>",
        );
        let text = visible_text(&doc.select("body"));
        assert!(text.contains("12,00 €"));
        assert!(!text.contains('$'));
    }

    #[test]
    fn test_first_text_skips_empty_matches() {
        let doc = Document::from("<h1>  </h1><h1> Real\n  Title </h1>");
        assert_eq!(first_text(&doc, "h1"), Some("Real Title".to_string()));
    }

    #[test]
    fn test_inline_scripts_exclude_external() {
        let doc = Document::from(
            r#"<script src="/app.js">ignored</script><script>var a = 1;</script><script>  </script>"#,
        );
        let scripts = inline_scripts(&doc);
        assert_eq!(scripts, vec!["var a = 1;".to_string()]);
    }

    #[test]
    fn test_attr_trims_and_filters_empty() {
        let doc = Document::from(r#"<img data-a=" x " data-b="">"#);
        let img = doc.select("img");
        assert_eq!(attr(&img, "data-a"), Some("x".to_string()));
        assert_eq!(attr(&img, "data-b"), None);
        assert_eq!(first_attr(&img, &["data-b", "data-a"]), Some("x".to_string()));
    }
}
