//! Platform key to extractor constructor mapping.

use crate::error::{Error, Result};
use crate::options::Options;
use crate::page::Page;

use super::{AliExpressExtractor, AmazonExtractor, SiteExtractor, TemuExtractor};

/// Builds a fresh extractor from shared options.
pub type Constructor = Box<dyn Fn(&Options) -> Box<dyn SiteExtractor>>;

/// Maps platform keys to extractor constructors.
///
/// Hostname detection is a case-insensitive substring match against the
/// keys, in registration order, so `"amazon"` matches `www.amazon.co.uk`.
/// Every call to [`create`](Self::create) returns a new instance with its
/// own intercepted-payload cache.
pub struct Registry {
    options: Options,
    constructors: Vec<(String, Constructor)>,
}

impl Registry {
    /// Empty registry.
    #[must_use]
    pub fn new(options: Options) -> Self {
        Self {
            options,
            constructors: Vec::new(),
        }
    }

    /// Registry with the built-in Amazon, Temu and AliExpress extractors.
    #[must_use]
    pub fn with_defaults(options: Options) -> Self {
        let mut registry = Self::new(options);
        registry.register(super::amazon::PLATFORM, |options| Box::new(AmazonExtractor::new(options.clone())));
        registry.register(super::temu::PLATFORM, |options| Box::new(TemuExtractor::new(options.clone())));
        registry.register(super::aliexpress::PLATFORM, |options| {
            Box::new(AliExpressExtractor::new(options.clone()))
        });
        registry
    }

    /// Add or replace the constructor for `key`.
    pub fn register<F>(&mut self, key: &str, constructor: F)
    where
        F: Fn(&Options) -> Box<dyn SiteExtractor> + 'static,
    {
        let key = key.to_ascii_lowercase();
        let constructor: Constructor = Box::new(constructor);
        match self.constructors.iter_mut().find(|(existing, _)| *existing == key) {
            Some(slot) => slot.1 = constructor,
            None => self.constructors.push((key, constructor)),
        }
    }

    /// Platform key whose name occurs in `hostname`.
    #[must_use]
    pub fn detect(&self, hostname: &str) -> Option<&str> {
        let hostname = hostname.to_ascii_lowercase();
        self.constructors
            .iter()
            .map(|(key, _)| key.as_str())
            .find(|key| hostname.contains(key))
    }

    /// New extractor for a platform key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] when `key` is not registered.
    pub fn create(&self, key: &str) -> Result<Box<dyn SiteExtractor>> {
        let key = key.to_ascii_lowercase();
        self.constructors
            .iter()
            .find(|(existing, _)| *existing == key)
            .map(|(_, constructor)| constructor(&self.options))
            .ok_or(Error::UnsupportedPlatform(key))
    }

    /// New extractor for the platform serving `page`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] when no key matches the hostname.
    pub fn create_for(&self, page: &Page) -> Result<Box<dyn SiteExtractor>> {
        match self.detect(page.hostname()) {
            Some(key) => {
                tracing::debug!(platform = key, hostname = page.hostname(), "platform detected");
                self.create(key)
            }
            None => Err(Error::UnsupportedPlatform(page.hostname().to_string())),
        }
    }

    /// Registered platform keys in registration order.
    #[must_use]
    pub fn platforms(&self) -> Vec<&str> {
        self.constructors.iter().map(|(key, _)| key.as_str()).collect()
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults(Options::default())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("options", &self.options)
            .field("platforms", &self.platforms())
            .finish()
    }
}
