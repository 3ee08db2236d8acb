//! The page being extracted: URL, hostname and parsed DOM.

use std::cell::OnceCell;

use url::Url;

use crate::dom::{self, Document};
use crate::embedded::EmbeddedState;
use crate::encoding;
use crate::error::Result;
use crate::metadata::StructuredData;

/// One rendered product page.
///
/// `Document` is not `Send`, so neither is `Page`; extraction runs on the
/// caller's thread. Structured data and inline scripts are parsed on first
/// use and shared by every category.
pub struct Page {
    url: Url,
    hostname: String,
    doc: Document,
    structured: OnceCell<StructuredData>,
    embedded: OnceCell<EmbeddedState>,
}

impl Page {
    /// Parse `html` served at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) when `url`
    /// is not absolute.
    pub fn new(url: &str, html: &str) -> Result<Self> {
        let url = Url::parse(url.trim())?;
        let hostname = url.host_str().unwrap_or_default().to_ascii_lowercase();
        Ok(Self {
            url,
            hostname,
            doc: Document::from(html),
            structured: OnceCell::new(),
            embedded: OnceCell::new(),
        })
    }

    /// Like [`new`](Self::new) for raw bytes in any charset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`](crate::Error::InvalidUrl) when `url`
    /// is not absolute.
    pub fn from_bytes(url: &str, html: &[u8], content_type: Option<&str>) -> Result<Self> {
        Self::new(url, &encoding::decode_html(html, content_type))
    }

    #[must_use]
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Lowercased host, empty for host-less URLs.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// URL path, used for product ID patterns.
    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Value of query parameter `name`.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// JSON-LD and meta-tag product data.
    pub fn structured(&self) -> &StructuredData {
        self.structured.get_or_init(|| StructuredData::extract(&self.doc))
    }

    /// Inline script bodies.
    pub fn embedded(&self) -> &EmbeddedState {
        self.embedded.get_or_init(|| EmbeddedState::from_document(&self.doc))
    }

    /// Visible body text, whitespace-collapsed. Used as the last currency
    /// signal before the hostname table.
    #[must_use]
    pub fn body_text(&self) -> String {
        dom::try_select(&self.doc, "body")
            .map(|body| dom::visible_text(&body))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("url", &self.url.as_str())
            .field("hostname", &self.hostname)
            .finish_non_exhaustive()
    }
}
