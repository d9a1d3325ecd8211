//! File loading: fetch, parse, overlay merge, placeholder compilation.
//!
//! Loaded files are cached by canonical locator, so a file imported from two
//! places loads once and both importers share the cached copy (each import
//! splices its own deep copy into the document). The in-progress stack
//! guards against a load that recursively triggers loading itself.

use crate::error::{ConfigError, Result};
use crate::merge::deep_merge;
use crate::provider::{Fetched, ProviderRegistry, split_scheme};
use crate::resolver::render_chain;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use strata_value::{Parsed, Scalar, Value, parse_scalar};
use tracing::{debug, warn};

/// A loaded document and where it came from.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Canonical locator this file is cached under.
    pub locator: String,

    /// The parsed tree, overlay already merged, placeholders compiled.
    pub tree: Value,
}

/// Loads and caches configuration files.
pub struct FileLoader {
    env: Option<String>,
    cache: HashMap<String, ConfigFile>,
    loading: Vec<String>,
    files_loaded: Vec<String>,
}

impl FileLoader {
    /// `env` selects the overlay variant: with `Some("dev")`, loading
    /// `config.yaml` also merges `config-dev.yaml` when that file exists.
    pub fn new(env: Option<String>) -> Self {
        FileLoader {
            env,
            cache: HashMap::new(),
            loading: Vec::new(),
            files_loaded: Vec::new(),
        }
    }

    /// Canonicalize a locator, resolving a relative path against `base_dir`.
    ///
    /// Scheme-qualified locators pass through untouched. The resolution is
    /// lexical (`.` and `..` folded); nothing touches the filesystem here.
    pub fn canonicalize(&self, locator: &str, base_dir: Option<&Path>) -> String {
        if split_scheme(locator).is_some() {
            return locator.to_string();
        }

        let path = Path::new(locator);
        if path.is_absolute() {
            // Usually a sign the config is not relocatable.
            warn!(locator, "import locator is an absolute path");
        }
        let joined = match base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        };
        normalize(&joined).to_string_lossy().into_owned()
    }

    /// Load (or return the cached) file for a canonical locator.
    pub fn load(&mut self, canonical: &str, providers: &ProviderRegistry) -> Result<ConfigFile> {
        if let Some(file) = self.cache.get(canonical) {
            debug!(locator = canonical, "config file cache hit");
            return Ok(file.clone());
        }
        if self.loading.iter().any(|l| l == canonical) {
            return Err(ConfigError::CircularImport {
                chain: render_chain(&self.loading, canonical),
            });
        }

        self.loading.push(canonical.to_string());
        let loaded = self.load_uncached(canonical, providers);
        self.loading.pop();

        let file = loaded?;
        self.cache.insert(canonical.to_string(), file.clone());
        self.files_loaded.push(canonical.to_string());
        Ok(file)
    }

    /// Locators in first-load order, overlays excluded.
    pub fn files_loaded(&self) -> &[String] {
        &self.files_loaded
    }

    /// Drop every cached file. The next import fetches again.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn load_uncached(&self, canonical: &str, providers: &ProviderRegistry) -> Result<ConfigFile> {
        debug!(locator = canonical, "loading config file");
        let mut tree = fetch_tree(canonical, providers)?;

        if let Some(overlay_locator) = self.overlay_locator(canonical) {
            if Path::new(&overlay_locator).exists() {
                debug!(locator = overlay_locator, "merging environment overlay");
                let overlay = fetch_tree(&overlay_locator, providers)?;
                deep_merge(&mut tree, overlay);
            }
        }

        compile_tree(&mut tree)?;
        Ok(ConfigFile {
            locator: canonical.to_string(),
            tree,
        })
    }

    /// `config.yaml` + env `dev` => `config-dev.yaml`. Only for plain
    /// file locators.
    fn overlay_locator(&self, canonical: &str) -> Option<String> {
        let env = self.env.as_deref()?;
        if split_scheme(canonical).is_some() {
            return None;
        }
        let path = Path::new(canonical);
        let stem = path.file_stem()?.to_str()?;
        let parent = path.parent().unwrap_or(Path::new(""));
        let name = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}-{}.{}", stem, env, ext),
            None => format!("{}-{}", stem, env),
        };
        Some(parent.join(name).to_string_lossy().into_owned())
    }
}

fn fetch_tree(locator: &str, providers: &ProviderRegistry) -> Result<Value> {
    match providers.fetch(locator)? {
        Fetched::Tree(tree) => Ok(tree),
        Fetched::Bytes(bytes) => {
            let text = String::from_utf8(bytes).map_err(|e| ConfigError::Io {
                locator: locator.to_string(),
                message: e.to_string(),
            })?;
            Ok(strata_yaml::parse_str(&text)?)
        }
    }
}

/// Compile every string scalar containing `{` into a compound value, in
/// place. Raw strings are left alone; so are plain strings (fast path).
pub(crate) fn compile_tree(value: &mut Value) -> Result<()> {
    match value {
        Value::Map(entries) => {
            for child in entries.values_mut() {
                compile_tree(child)?;
            }
        }
        Value::Sequence(items) => {
            for child in items {
                compile_tree(child)?;
            }
        }
        Value::Scalar(Scalar::Str(s)) if s.contains('{') => match parse_scalar(s)? {
            Parsed::Compound(compound) => *value = Value::Compound(compound),
            Parsed::Literal(text) => *value = Value::Scalar(Scalar::Str(text)),
        },
        _ => {}
    }
    Ok(())
}

/// Fold `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir);
                }
            }
            other => out.push(other),
        }
    }
    out
}
