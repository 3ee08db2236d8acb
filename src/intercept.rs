//! Passive network interception.
//!
//! Product data that never lands in the DOM (paginated reviews, lazy image
//! galleries, SKU matrices) travels over the page's own fetch and XHR calls.
//! An [`Interceptor`] hooks a [`NetworkHost`] exactly once and hands every
//! response to a [`NetworkObserver`]. The built-in observer,
//! [`InterceptedCache`], keeps relevant JSON bodies bucketed by
//! [`PayloadCategory`], last write wins.
//!
//! Observation is read-only: responses are never modified and failures to
//! parse a body are dropped without a trace above `trace!` level.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

/// URL substrings that mark a response as worth parsing.
pub const DEFAULT_RELEVANCE_KEYWORDS: &[&str] = &["/api/", "product", "review", "image", "goods"];

/// Receives every response the host observes.
pub trait NetworkObserver: Send + Sync {
    fn on_response(&self, url: &str, body: &str);
}

/// The page's networking surface: a fetch function and the XHR
/// `open`/`send` pair.
pub trait NetworkHost {
    /// Wrap fetch so every resolved response is also given to `observer`.
    fn hook_fetch(&self, observer: Arc<dyn NetworkObserver>);

    /// Wrap XHR `open`/`send` so every completed request is also given to
    /// `observer`.
    fn hook_xhr(&self, observer: Arc<dyn NetworkObserver>);
}

/// Installs an observer on a host at most once per instance.
#[derive(Debug, Default)]
pub struct Interceptor {
    installed: AtomicBool,
}

impl Interceptor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook fetch and XHR on `host`.
    ///
    /// Returns `false` without touching `host` when already installed.
    pub fn install(&self, host: &dyn NetworkHost, observer: Arc<dyn NetworkObserver>) -> bool {
        if self.installed.swap(true, Ordering::SeqCst) {
            tracing::debug!("network interception already installed");
            return false;
        }
        host.hook_fetch(Arc::clone(&observer));
        host.hook_xhr(observer);
        tracing::debug!("network interception installed");
        true
    }

    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }
}

/// Coarse bucket an intercepted payload is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadCategory {
    Reviews,
    Images,
    Product,
    Skus,
}

impl PayloadCategory {
    /// Bucket for a response URL, checked most specific first.
    ///
    /// Anything without a more specific marker is product data.
    #[must_use]
    pub fn classify(url: &str) -> Self {
        let url = url.to_ascii_lowercase();
        if ["review", "comment", "feedback", "evaluation"]
            .iter()
            .any(|marker| url.contains(marker))
        {
            Self::Reviews
        } else if url.contains("sku") {
            Self::Skus
        } else if url.contains("image") || url.contains("media") {
            Self::Images
        } else {
            Self::Product
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reviews => "reviews",
            Self::Images => "images",
            Self::Product => "product",
            Self::Skus => "skus",
        }
    }
}

/// A captured JSON response.
#[derive(Debug, Clone, PartialEq)]
pub struct InterceptedPayload {
    pub url: String,
    pub json: Value,
}

/// Per-extractor store of intercepted payloads.
#[derive(Debug, Default)]
pub struct InterceptedCache {
    keywords: Vec<String>,
    payloads: Mutex<HashMap<PayloadCategory, InterceptedPayload>>,
}

impl InterceptedCache {
    /// Cache accepting URLs that contain any of the default keywords,
    /// `site_keywords` or `extra`.
    #[must_use]
    pub fn new(site_keywords: &[&str], extra: &[String]) -> Self {
        let keywords = DEFAULT_RELEVANCE_KEYWORDS
            .iter()
            .chain(site_keywords)
            .map(|keyword| keyword.to_ascii_lowercase())
            .chain(extra.iter().map(|keyword| keyword.to_ascii_lowercase()))
            .collect();
        Self {
            keywords,
            payloads: Mutex::default(),
        }
    }

    /// Whether `url` is worth parsing.
    #[must_use]
    pub fn is_relevant(&self, url: &str) -> bool {
        let url = url.to_ascii_lowercase();
        self.keywords.iter().any(|keyword| url.contains(keyword.as_str()))
    }

    /// Store `json` under the category its URL implies, `Product` when it
    /// implies none. A later payload for the same category replaces the
    /// earlier one.
    pub fn process_intercepted_data(&self, url: &str, json: Value) {
        let category = PayloadCategory::classify(url);
        tracing::debug!(url, category = category.as_str(), "captured payload");
        self.lock().insert(
            category,
            InterceptedPayload {
                url: url.to_string(),
                json,
            },
        );
    }

    /// Latest payload for `category`.
    #[must_use]
    pub fn get(&self, category: PayloadCategory) -> Option<InterceptedPayload> {
        self.lock().get(&category).cloned()
    }

    /// JSON of the latest payload for `category`.
    #[must_use]
    pub fn json(&self, category: PayloadCategory) -> Option<Value> {
        self.get(category).map(|payload| payload.json)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PayloadCategory, InterceptedPayload>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.payloads
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl NetworkObserver for InterceptedCache {
    fn on_response(&self, url: &str, body: &str) {
        if !self.is_relevant(url) {
            return;
        }
        match serde_json::from_str::<Value>(body) {
            Ok(json) => self.process_intercepted_data(url, json),
            Err(err) => tracing::trace!(url, %err, "ignoring non-JSON response"),
        }
    }
}

/// In-memory [`NetworkHost`] that replays recorded responses.
///
/// Used to feed responses captured outside the page (a HAR export, a
/// crawler's response log) through the same path live traffic takes.
#[derive(Default)]
pub struct MemoryHost {
    fetch_hooks: Mutex<Vec<Arc<dyn NetworkObserver>>>,
    xhr_hooks: Mutex<Vec<Arc<dyn NetworkObserver>>>,
}

impl MemoryHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fetch and XHR hooks currently installed.
    #[must_use]
    pub fn hook_counts(&self) -> (usize, usize) {
        (lock_hooks(&self.fetch_hooks).len(), lock_hooks(&self.xhr_hooks).len())
    }

    /// Deliver a fetch response to every fetch hook.
    pub fn deliver_fetch(&self, url: &str, body: &str) {
        for observer in lock_hooks(&self.fetch_hooks).iter() {
            observer.on_response(url, body);
        }
    }

    /// Deliver a completed XHR to every XHR hook.
    pub fn deliver_xhr(&self, url: &str, body: &str) {
        for observer in lock_hooks(&self.xhr_hooks).iter() {
            observer.on_response(url, body);
        }
    }
}

impl NetworkHost for MemoryHost {
    fn hook_fetch(&self, observer: Arc<dyn NetworkObserver>) {
        lock_hooks(&self.fetch_hooks).push(observer);
    }

    fn hook_xhr(&self, observer: Arc<dyn NetworkObserver>) {
        lock_hooks(&self.xhr_hooks).push(observer);
    }
}

impl std::fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (fetch, xhr) = self.hook_counts();
        f.debug_struct("MemoryHost")
            .field("fetch_hooks", &fetch)
            .field("xhr_hooks", &xhr)
            .finish()
    }
}

fn lock_hooks(
    hooks: &Mutex<Vec<Arc<dyn NetworkObserver>>>,
) -> MutexGuard<'_, Vec<Arc<dyn NetworkObserver>>> {
    hooks.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(PayloadCategory::classify("https://x.com/api/reviews?page=2"), PayloadCategory::Reviews);
        assert_eq!(PayloadCategory::classify("https://x.com/feedback/list"), PayloadCategory::Reviews);
        assert_eq!(PayloadCategory::classify("https://x.com/api/bg/comment/list"), PayloadCategory::Reviews);
        assert_eq!(PayloadCategory::classify("https://x.com/api/sku/info"), PayloadCategory::Skus);
        assert_eq!(PayloadCategory::classify("https://x.com/image/list"), PayloadCategory::Images);
        assert_eq!(PayloadCategory::classify("https://x.com/goods/detail"), PayloadCategory::Product);
        assert_eq!(PayloadCategory::classify("https://x.com/api/pdp/detail"), PayloadCategory::Product);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = InterceptedCache::new(&[], &[]);
        cache.process_intercepted_data("https://x.com/api/reviews?page=1", serde_json::json!({"page": 1}));
        cache.process_intercepted_data("https://x.com/api/reviews?page=2", serde_json::json!({"page": 2}));

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.json(PayloadCategory::Reviews),
            Some(serde_json::json!({"page": 2}))
        );
    }

    #[test]
    fn test_observer_ignores_irrelevant_and_malformed() {
        let cache = InterceptedCache::new(&["sku"], &[]);
        cache.on_response("https://x.com/analytics/beacon", r#"{"a": 1}"#);
        cache.on_response("https://x.com/api/product", "<html>not json</html>");
        assert!(cache.is_empty());

        cache.on_response("https://x.com/api/product", r#"{"title": "Lamp"}"#);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_relevant_urls_without_category_are_kept() {
        let cache = InterceptedCache::new(&["comment"], &["graphql".to_string()]);
        cache.on_response("https://www.temu.com/api/bg/comment/list", r#"{"data": [{"comment": "ok"}]}"#);
        cache.on_response("https://shop.example/graphql?op=pdp", r#"{"title": "Lamp"}"#);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(PayloadCategory::Reviews).is_some_and(|payload| payload.url.contains("comment")));
        assert!(cache.get(PayloadCategory::Product).is_some_and(|payload| payload.url.contains("graphql")));

        cache.on_response("https://x.com/api/pdp/detail", r#"{"v": 3}"#);
        assert_eq!(cache.json(PayloadCategory::Product), Some(serde_json::json!({"v": 3})));
    }

    #[test]
    fn test_extra_keywords_extend_relevance() {
        let cache = InterceptedCache::new(&[], &["Catalog".to_string()]);
        assert!(cache.is_relevant("https://x.com/catalog/item"));
        assert!(!cache.is_relevant("https://x.com/static/app.js"));
    }

    #[test]
    fn test_install_is_idempotent() {
        let host = MemoryHost::new();
        let interceptor = Interceptor::new();
        let cache = Arc::new(InterceptedCache::new(&[], &[]));

        assert!(interceptor.install(&host, cache.clone()));
        assert!(!interceptor.install(&host, cache.clone()));
        assert!(interceptor.is_installed());
        assert_eq!(host.hook_counts(), (1, 1));

        host.deliver_xhr("https://x.com/api/reviews", r#"{"n": 1}"#);
        assert_eq!(cache.len(), 1);
    }
}
