//! Embedded-state recovery from inline scripts.
//!
//! Client-rendered shops hydrate galleries, variants and prices from object
//! literals serialized into inline `<script>` tags. [`StatePattern`] names
//! each literal we know how to recover; [`EmbeddedState`] applies a pattern
//! to every inline script independently, so a script that defeats one
//! pattern is still offered to the others and one malformed script never
//! hides the rest.
//!
//! Everything here parses untrusted text. A pattern that stops matching
//! after a markup change yields nothing; callers treat that as "field
//! stays empty".

use std::cell::OnceCell;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::dom::{self, Document};
use crate::error::{Error, Result};
use crate::normalize::unescape_script_url;

#[allow(clippy::expect_used)]
static HI_RES_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?hiRes["']?\s*:\s*["']([^"']+)["']"#).expect("HI_RES_VALUE regex")
});

#[allow(clippy::expect_used)]
static LARGE_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?large["']?\s*:\s*["']([^"']+)["']"#).expect("LARGE_VALUE regex")
});

#[allow(clippy::expect_used)]
static MAIN_URL_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"["']?mainUrl["']?\s*:\s*["']([^"']+)["']"#).expect("MAIN_URL_VALUE regex")
});

#[allow(clippy::expect_used)]
static QUOTED_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"["']([^"']+)["']"#).expect("QUOTED_STRING regex"));

#[allow(clippy::expect_used)]
static MP4_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']?(?:videoUrl|video_url)["']?\s*:\s*["']([^"']+\.mp4[^"']*)["']"#)
        .expect("MP4_URL regex")
});

#[allow(clippy::expect_used)]
static HLS_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']?url["']?\s*:\s*["']([^"']+\.m3u8[^"']*)["']"#).expect("HLS_URL regex")
});

/// Key prefix (`"name": ` or `name = `) of every literal pattern, indexed
/// like [`StatePattern::ALL`].
#[allow(clippy::expect_used)]
static STATE_KEYS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    StatePattern::ALL
        .iter()
        .map(|pattern| Regex::new(&pattern.key_source()).expect("STATE_KEYS regex"))
        .collect()
});

/// A named object literal or value list recoverable from inline scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatePattern {
    /// Amazon `colorImages` gallery; yields `hiRes` (or `large`) URLs.
    ColorImages,
    /// Amazon `imageGalleryData`; yields `mainUrl` URLs.
    ImageGalleryData,
    /// Amazon `dimensionValuesDisplayData`: ASIN to dimension values.
    DimensionValuesDisplayData,
    /// Amazon `asinVariationValues`: ASIN to variation attributes.
    AsinVariationValues,
    /// Temu `skcList`: sellable colour/size combinations.
    SkcList,
    /// `__INITIAL_STATE__` SPA hydration state.
    InitialState,
    /// Temu `rawData` hydration state.
    RawData,
    /// AliExpress `runParams`.
    RunParams,
    /// AliExpress `__INIT_DATA__`.
    InitData,
    /// AliExpress `data: {...}` literal carrying the page modules
    /// (`priceModule` and friends), for `runParams` blocks that are not JSON.
    DataModules,
    /// AliExpress `imagePathList`.
    ImagePathList,
    /// `videoUrl` / `video_url` pointing at an `.mp4`.
    Mp4VideoUrls,
    /// `url` pointing at an `.m3u8` stream.
    HlsVideoUrls,
}

impl StatePattern {
    /// Every pattern, in declaration order.
    pub const ALL: [Self; 13] = [
        Self::ColorImages,
        Self::ImageGalleryData,
        Self::DimensionValuesDisplayData,
        Self::AsinVariationValues,
        Self::SkcList,
        Self::InitialState,
        Self::RawData,
        Self::RunParams,
        Self::InitData,
        Self::DataModules,
        Self::ImagePathList,
        Self::Mp4VideoUrls,
        Self::HlsVideoUrls,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ColorImages => "colorImages",
            Self::ImageGalleryData => "imageGalleryData",
            Self::DimensionValuesDisplayData => "dimensionValuesDisplayData",
            Self::AsinVariationValues => "asinVariationValues",
            Self::SkcList => "skcList",
            Self::InitialState => "__INITIAL_STATE__",
            Self::RawData => "rawData",
            Self::RunParams => "runParams",
            Self::InitData => "__INIT_DATA__",
            Self::DataModules => "data",
            Self::ImagePathList => "imagePathList",
            Self::Mp4VideoUrls => "videoUrl",
            Self::HlsVideoUrls => "m3u8",
        }
    }

    /// Apply the pattern to one script body.
    ///
    /// URL-list patterns return a JSON array of unescaped strings; object
    /// patterns return the parsed literal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScriptPattern`] when the pattern is absent or yields
    /// nothing, and [`Error::Json`] when the literal does not parse.
    pub fn apply(self, script: &str) -> Result<Value> {
        match self {
            Self::ColorImages => {
                let literal = self.literal_after_key(script)?;
                let mut urls = capture_all(&HI_RES_VALUE, literal);
                if urls.is_empty() {
                    urls = capture_all(&LARGE_VALUE, literal);
                }
                self.non_empty_urls(urls)
            }
            Self::ImageGalleryData => {
                let literal = self.literal_after_key(script)?;
                self.non_empty_urls(capture_all(&MAIN_URL_VALUE, literal))
            }
            Self::ImagePathList => {
                let literal = self.literal_after_key(script)?;
                self.non_empty_urls(capture_all(&QUOTED_STRING, literal))
            }
            Self::DataModules => {
                if !script.contains("priceModule") {
                    return Err(self.missing("no page modules"));
                }
                self.key()?
                    .find_iter(script)
                    .filter_map(|found| balanced_literal(script, found.end()))
                    .filter_map(|literal| parse_lenient(literal).ok())
                    .find(|value| find_key(value, "priceModule").is_some())
                    .ok_or_else(|| self.missing("no literal with page modules"))
            }
            Self::Mp4VideoUrls => self.non_empty_urls(capture_all(&MP4_URL, script)),
            Self::HlsVideoUrls => self.non_empty_urls(capture_all(&HLS_URL, script)),
            Self::DimensionValuesDisplayData
            | Self::AsinVariationValues
            | Self::SkcList
            | Self::InitialState
            | Self::RawData
            | Self::RunParams
            | Self::InitData => {
                let literal = self.literal_after_key(script)?;
                parse_lenient(literal)
            }
        }
    }

    fn key_source(self) -> String {
        match self {
            // Object key form only, never a `data =` assignment.
            Self::DataModules => r"\bdata\s*:\s*".to_string(),
            _ => format!(r#"["']?{}["']?\s*[:=]\s*"#, regex::escape(self.name())),
        }
    }

    fn key(self) -> Result<&'static Regex> {
        STATE_KEYS.get(self.index()).ok_or_else(|| self.missing("no key pattern"))
    }

    fn literal_after_key(self, script: &str) -> Result<&str> {
        self.key()?
            .find_iter(script)
            .find_map(|found| balanced_literal(script, found.end()))
            .ok_or_else(|| self.missing("no literal found"))
    }

    fn non_empty_urls(self, urls: Vec<String>) -> Result<Value> {
        if urls.is_empty() {
            return Err(self.missing("no urls found"));
        }
        Ok(Value::Array(urls.into_iter().map(Value::String).collect()))
    }

    fn missing(self, reason: &str) -> Error {
        Error::ScriptPattern {
            pattern: self.name(),
            reason: reason.to_string(),
        }
    }
}

fn capture_all(re: &Regex, text: &str) -> Vec<String> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| unescape_script_url(m.as_str()))
        .collect()
}

/// The `{...}` or `[...]` literal starting at `from` (after optional
/// whitespace), with string-aware bracket matching.
#[must_use]
pub fn balanced_literal(text: &str, from: usize) -> Option<&str> {
    let rest = text.get(from..)?;
    let offset = rest.find(|c: char| !c.is_whitespace())?;
    let start = from + offset;
    let bytes = text.as_bytes();
    if !matches!(bytes.get(start), Some(b'{' | b'[')) {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string: Option<u8> = None;
    let mut escaped = false;

    for (index, &byte) in bytes.iter().enumerate().skip(start) {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == quote {
                in_string = None;
            }
            continue;
        }
        match byte {
            b'"' | b'\'' => in_string = Some(byte),
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return text.get(start..=index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a JS object literal as JSON, retrying with single quotes swapped
/// for double quotes.
///
/// # Errors
///
/// Returns the first parse error when neither attempt succeeds.
pub fn parse_lenient(literal: &str) -> Result<Value> {
    match serde_json::from_str(literal) {
        Ok(value) => Ok(value),
        Err(first) => serde_json::from_str(&literal.replace('\'', "\"")).map_err(|_| Error::Json(first)),
    }
}

/// Depth-first search for the first value stored under `key`.
#[must_use]
pub fn find_key<'v>(value: &'v Value, key: &str) -> Option<&'v Value> {
    match value {
        Value::Object(map) => map
            .get(key)
            .or_else(|| map.values().find_map(|child| find_key(child, key))),
        Value::Array(items) => items.iter().find_map(|child| find_key(child, key)),
        _ => None,
    }
}

/// String view of a JSON scalar (`"12.5"` or `12.5` both give `"12.5"`).
#[must_use]
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Inline script bodies of one page, scanned pattern by pattern.
///
/// Each pattern runs over the scripts at most once; later calls reuse the
/// recovered values.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedState {
    scripts: Vec<String>,
    recovered: [OnceCell<Vec<Value>>; StatePattern::ALL.len()],
}

impl EmbeddedState {
    #[must_use]
    pub fn from_document(doc: &Document) -> Self {
        Self::from_scripts(dom::inline_scripts(doc))
    }

    #[must_use]
    pub fn from_scripts(scripts: Vec<String>) -> Self {
        Self {
            scripts,
            recovered: Default::default(),
        }
    }

    #[must_use]
    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    /// Every value `pattern` yields, one per script it applies to.
    #[must_use]
    pub fn recover_all(&self, pattern: StatePattern) -> &[Value] {
        self.recovered[pattern.index()].get_or_init(|| {
            self.scripts
                .iter()
                .enumerate()
                .filter_map(|(index, script)| match pattern.apply(script) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        tracing::trace!(pattern = pattern.name(), script = index, %err, "pattern did not apply");
                        None
                    }
                })
                .collect()
        })
    }

    /// First script that yields a value for `pattern`.
    #[must_use]
    pub fn recover(&self, pattern: StatePattern) -> Option<&Value> {
        self.recover_all(pattern).first()
    }

    /// Every URL produced by a URL-list pattern across all scripts.
    #[must_use]
    pub fn recover_urls(&self, pattern: StatePattern) -> Vec<String> {
        self.recover_all(pattern)
            .iter()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()
    }

    /// First of `patterns` that any script yields, in order.
    #[must_use]
    pub fn recover_first_of(&self, patterns: &[StatePattern]) -> Option<(StatePattern, &Value)> {
        patterns
            .iter()
            .find_map(|pattern| self.recover(*pattern).map(|value| (*pattern, value)))
    }
}
