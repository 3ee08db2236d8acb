//! Error types for product-extract.
//!
//! Most failures in this crate are recovered locally and never reach the
//! caller: a missing field resolves to its empty default. The variants here
//! describe the failures that travel between internal layers (strategies,
//! probes, category extractors) before being absorbed, plus the few that the
//! public API does surface (registry lookup, URL parsing).

/// Error type for extraction operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A CSS selector could not be compiled.
    #[error("invalid CSS selector: {0}")]
    InvalidSelector(String),

    /// An embedded-script pattern matched but its payload could not be used.
    #[error("script pattern `{pattern}` failed: {reason}")]
    ScriptPattern {
        /// Name of the pattern that failed.
        pattern: &'static str,
        /// What went wrong.
        reason: String,
    },

    /// JSON decoding failed.
    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The page URL could not be parsed.
    #[error("invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// No extractor is registered for the page's platform.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// A whole category extractor failed.
    #[error("{category} extraction failed: {reason}")]
    Category {
        /// Category name (`images`, `variants`, ...).
        category: &'static str,
        /// What went wrong.
        reason: String,
    },
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;
