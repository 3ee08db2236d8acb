//! Fallback-chain resolution.
//!
//! A field is resolved by an ordered list of probes, from the most
//! structured source (JSON-LD, embedded state) to the most brittle (DOM text).
//! The first probe whose result is [`Usable`] wins and the rest never run.
//! When every probe comes up empty the field takes its `Default` value.
//!
//! A probe that panics is treated like one that found nothing.

use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;

use crate::dom::{self, Document};

/// Where a probe reads its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    /// `application/ld+json` structured data.
    JsonLd,
    /// Object literals inside inline `<script>` tags.
    EmbeddedScript,
    /// Payloads captured by the network interceptor.
    Intercepted,
    /// CSS selector lookups against the rendered DOM.
    DomSelector,
    /// Anything derived from the URL or other page-level facts.
    Page,
}

impl ProbeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JsonLd => "jsonld",
            Self::EmbeddedScript => "embedded-script",
            Self::Intercepted => "intercepted",
            Self::DomSelector => "dom-selector",
            Self::Page => "page",
        }
    }
}

/// Whether a probe result is good enough to stop the chain.
pub trait Usable {
    fn is_usable(&self) -> bool;
}

impl Usable for String {
    fn is_usable(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Usable for f64 {
    fn is_usable(&self) -> bool {
        self.is_finite() && *self > 0.0
    }
}

impl<T> Usable for Vec<T> {
    fn is_usable(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V> Usable for BTreeMap<K, V> {
    fn is_usable(&self) -> bool {
        !self.is_empty()
    }
}

impl<K, V, S> Usable for HashMap<K, V, S> {
    fn is_usable(&self) -> bool {
        !self.is_empty()
    }
}

impl Usable for Value {
    fn is_usable(&self) -> bool {
        match self {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            Value::Bool(_) | Value::Number(_) => true,
        }
    }
}

/// One fallible strategy for one field.
pub struct Probe<'a, T> {
    pub kind: ProbeKind,
    pub label: &'static str,
    run: Box<dyn FnOnce() -> Option<T> + 'a>,
}

impl<'a, T> Probe<'a, T> {
    pub fn new(kind: ProbeKind, label: &'static str, run: impl FnOnce() -> Option<T> + 'a) -> Self {
        Self {
            kind,
            label,
            run: Box::new(run),
        }
    }

    /// Run the probe, consuming it.
    pub fn run(self) -> Option<T> {
        (self.run)()
    }
}

impl<T> std::fmt::Debug for Probe<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Probe")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Ordered probes for a single logical field.
///
/// ```rust
/// use product_extract::fallback::FallbackChain;
///
/// let title: String = FallbackChain::new("title")
///     .page("empty", || None)
///     .page("constant", || Some("Kettle".to_string()))
///     .resolve();
/// assert_eq!(title, "Kettle");
/// ```
#[derive(Debug)]
pub struct FallbackChain<'a, T> {
    field: &'static str,
    probes: Vec<Probe<'a, T>>,
}

impl<'a, T: Usable + Default + 'a> FallbackChain<'a, T> {
    #[must_use]
    pub fn new(field: &'static str) -> Self {
        Self {
            field,
            probes: Vec::new(),
        }
    }

    /// Append a probe.
    #[must_use]
    pub fn probe(mut self, probe: Probe<'a, T>) -> Self {
        self.probes.push(probe);
        self
    }

    #[must_use]
    pub fn json_ld(self, label: &'static str, run: impl FnOnce() -> Option<T> + 'a) -> Self {
        self.probe(Probe::new(ProbeKind::JsonLd, label, run))
    }

    #[must_use]
    pub fn script(self, label: &'static str, run: impl FnOnce() -> Option<T> + 'a) -> Self {
        self.probe(Probe::new(ProbeKind::EmbeddedScript, label, run))
    }

    #[must_use]
    pub fn intercepted(self, label: &'static str, run: impl FnOnce() -> Option<T> + 'a) -> Self {
        self.probe(Probe::new(ProbeKind::Intercepted, label, run))
    }

    #[must_use]
    pub fn dom(self, label: &'static str, run: impl FnOnce() -> Option<T> + 'a) -> Self {
        self.probe(Probe::new(ProbeKind::DomSelector, label, run))
    }

    #[must_use]
    pub fn page(self, label: &'static str, run: impl FnOnce() -> Option<T> + 'a) -> Self {
        self.probe(Probe::new(ProbeKind::Page, label, run))
    }

    /// One DOM probe per selector, each reading the first non-empty text
    /// match and converting it with `map`.
    #[must_use]
    pub fn selectors(
        mut self,
        doc: &'a Document,
        selectors: &'a [&'a str],
        map: fn(String) -> Option<T>,
    ) -> Self {
        for selector in selectors {
            self = self.dom("selector", move || dom::first_text(doc, selector).and_then(map));
        }
        self
    }

    /// Number of probes in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    /// Run probes in order and return the first usable result.
    pub fn resolve(self) -> T {
        self.resolve_where(|_| true)
    }

    /// Like [`resolve`](Self::resolve) with an extra acceptance check.
    pub fn resolve_where(self, accept: impl Fn(&T) -> bool) -> T {
        let field = self.field;
        for (index, probe) in self.probes.into_iter().enumerate() {
            let kind = probe.kind.as_str();
            let label = probe.label;
            match panic::catch_unwind(AssertUnwindSafe(|| probe.run())) {
                Ok(Some(value)) if value.is_usable() && accept(&value) => {
                    tracing::debug!(field, index, kind, label, "field resolved");
                    return value;
                }
                Ok(_) => tracing::trace!(field, index, kind, label, "probe empty"),
                Err(_) => tracing::debug!(field, index, kind, label, "probe panicked"),
            }
        }
        tracing::debug!(field, "no probe resolved field; using default");
        T::default()
    }
}
