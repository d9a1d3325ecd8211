//! Fetch providers: scheme-dispatched retrieval of import targets.
//!
//! A locator is either a plain path (handled by the built-in file provider)
//! or `scheme://rest`, dispatched to whichever provider registered that
//! scheme. Providers return raw bytes (parsed as YAML downstream) or an
//! already-built tree for stores that speak structured data natively.

use crate::error::{ConfigError, Result};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;
use strata_value::Value;

/// What a provider hands back for a locator.
#[derive(Debug)]
pub enum Fetched {
    /// Raw document bytes; the loader parses them.
    Bytes(Vec<u8>),

    /// A ready-made tree; the raw-document parsing step is skipped.
    Tree(Value),
}

/// Retrieves the content behind an import locator.
pub trait FetchProvider: Send + Sync {
    fn fetch(&self, locator: &str) -> Result<Fetched>;
}

/// Scheme to provider mapping, with local files as the schemeless default.
pub struct ProviderRegistry {
    schemes: IndexMap<String, Arc<dyn FetchProvider>>,
    file: Arc<dyn FetchProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        ProviderRegistry {
            schemes: IndexMap::new(),
            file: Arc::new(FileProvider),
        }
    }

    /// Register (or replace) the provider for a scheme, e.g. `"redis"`.
    pub fn register(&mut self, scheme: impl Into<String>, provider: Arc<dyn FetchProvider>) {
        self.schemes.insert(scheme.into(), provider);
    }

    /// Fetch the content behind `locator`.
    ///
    /// # Errors
    ///
    /// `UnsupportedProvider` for a scheme nobody registered; whatever the
    /// provider itself raises otherwise.
    pub fn fetch(&self, locator: &str) -> Result<Fetched> {
        match split_scheme(locator) {
            Some((scheme, _)) => match self.schemes.get(scheme) {
                Some(provider) => provider.fetch(locator),
                None => Err(ConfigError::UnsupportedProvider {
                    scheme: scheme.to_string(),
                    locator: locator.to_string(),
                }),
            },
            None => self.file.fetch(locator),
        }
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        ProviderRegistry::new()
    }
}

/// `scheme://rest` split; `None` for plain paths.
pub fn split_scheme(locator: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = locator.split_once("://")?;
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-') {
        return None;
    }
    Some((scheme, rest))
}

/// Default provider: the locator is a filesystem path.
struct FileProvider;

impl FetchProvider for FileProvider {
    fn fetch(&self, locator: &str) -> Result<Fetched> {
        std::fs::read(Path::new(locator))
            .map(Fetched::Bytes)
            .map_err(|e| ConfigError::Io {
                locator: locator.to_string(),
                message: e.to_string(),
            })
    }
}
