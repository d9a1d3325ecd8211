//! The public configuration API.
//!
//! A [`Config`] owns one document: the raw tree, the resolution cache, the
//! import graph, the global table, and the operator and provider
//! registries. Instances are fully independent; two configs in one process
//! never share state. Mutation is synchronous and single-threaded; callers
//! that share a config across threads bring their own locking.

use crate::error::{ConfigError, Result};
use crate::loader::{FileLoader, compile_tree};
use crate::provider::{FetchProvider, ProviderRegistry};
use crate::registry::{Operator, OperatorRegistry};
use crate::resolver::{DocState, Mount, ResolutionContext};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_value::{ConfigPath, Value, ValueError, access};
use tracing::info;

/// Options for [`Config::load`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Environment name; selects `{stem}-{env}{ext}` overlay files.
    pub env: Option<String>,

    /// Base directory for the initial locator. Defaults to the process's
    /// working directory semantics of the locator itself.
    pub config_dir: Option<PathBuf>,
}

/// One loaded configuration document.
pub struct Config {
    state: DocState,
    operators: OperatorRegistry,
    providers: ProviderRegistry,
}

impl Config {
    /// Load the document behind `locator`, merging its environment overlay
    /// when one exists.
    pub fn load(locator: &str, options: LoadOptions) -> Result<Self> {
        let mut loader = FileLoader::new(options.env.clone());
        let providers = ProviderRegistry::new();
        let canonical = loader.canonicalize(locator, options.config_dir.as_deref());
        let file = loader.load(&canonical, &providers)?;
        let dir = Path::new(&canonical).parent().map(Path::to_path_buf);
        info!(locator = canonical.as_str(), "configuration loaded");

        let mount = Mount {
            path: ConfigPath::root(),
            locator: canonical,
            dir,
        };
        Ok(Config {
            state: DocState::new(file.tree, mount, loader),
            operators: OperatorRegistry::with_builtins(),
            providers,
        })
    }

    /// Build a config from an in-memory tree. Placeholder strings in the
    /// tree are compiled the same way loaded files are.
    pub fn from_value(mut root: Value) -> Result<Self> {
        compile_tree(&mut root)?;
        let mount = Mount {
            path: ConfigPath::root(),
            locator: "<memory>".to_string(),
            dir: None,
        };
        Ok(Config {
            state: DocState::new(root, mount, FileLoader::new(None)),
            operators: OperatorRegistry::with_builtins(),
            providers: ProviderRegistry::new(),
        })
    }

    /// Build a config from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Config::from_value(strata_yaml::parse_str(text)?)
    }

    fn context(&mut self) -> ResolutionContext<'_> {
        ResolutionContext::new(&mut self.state, &self.operators, &self.providers)
    }

    /// Resolved value at `path`.
    ///
    /// Containers come back as fully resolved deep copies. Pattern paths
    /// return a sequence of matches; a plain missing path is `NotFound`.
    pub fn get(&mut self, path: &str) -> Result<Value> {
        let path = ConfigPath::parse(path)?;
        self.context().lookup(&path)
    }

    /// Like [`Config::get`], with a fallback for a missing path.
    ///
    /// The default also satisfies a mandatory marker (`???`), since the
    /// caller is supplying the value the marker demands.
    pub fn get_or(&mut self, path: &str, default: Value) -> Result<Value> {
        match self.get(path) {
            Err(ConfigError::NotFound { .. } | ConfigError::MissingValue { .. }) => Ok(default),
            other => other,
        }
    }

    /// Write a raw value, returning the replaced raw value if any.
    ///
    /// Placeholder strings in `value` are compiled, so a set value behaves
    /// exactly like a loaded one. The written node and its subtree start a
    /// fresh resolution; nodes that referenced the old value keep their
    /// cached result until [`Config::refresh`].
    pub fn set(&mut self, path: &str, value: Value) -> Result<Option<Value>> {
        let path = ConfigPath::parse(path)?;
        self.check_writable(&path)?;
        let mut value = value;
        compile_tree(&mut value)?;
        let old = access::set(&mut self.state.root, &path, value)?;
        self.state.invalidate(&path);
        Ok(old)
    }

    /// Remove the node at `path`. `Ok(false)` when it was not there.
    pub fn delete(&mut self, path: &str) -> Result<bool> {
        let path = ConfigPath::parse(path)?;
        self.check_writable(&path)?;
        let removed = access::delete(&mut self.state.root, &path)?;
        if removed {
            self.state.invalidate(&path);
        }
        Ok(removed)
    }

    fn check_writable(&self, path: &ConfigPath) -> Result<()> {
        for protected in &self.state.protected {
            if protected.is_prefix_of(path) || path.is_prefix_of(protected) {
                return Err(ConfigError::ReadOnly {
                    path: path.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Protect a subtree against `set` and `delete`.
    pub fn mark_read_only(&mut self, path: &str) -> Result<()> {
        let path = ConfigPath::parse(path)?;
        if path.is_pattern() {
            return Err(ValueError::path(&path, "search patterns cannot be protected").into());
        }
        self.state.protected.push(path);
        Ok(())
    }

    /// Store a plain value in the per-config global table, addressed by the
    /// `{global:...}` operator.
    pub fn set_global(&mut self, path: &str, value: Value) -> Result<()> {
        let path = ConfigPath::parse(path)?;
        access::set(&mut self.state.globals, &path, value)?;
        Ok(())
    }

    /// Fully resolve the whole document and return the resolved copy.
    pub fn resolve_all(&mut self) -> Result<Value> {
        self.context().resolve_at(&ConfigPath::root())
    }

    /// Start a new resolution epoch: every node resolves afresh on next
    /// access. This is the escape hatch for stale references, since
    /// dependents are not invalidated automatically on `set`.
    ///
    /// The file cache is dropped too, so an import placeholder written
    /// after this point fetches fresh content.
    pub fn refresh(&mut self) {
        self.state.invalidate_all();
        self.state.loader.clear();
    }

    /// The fully resolved document as YAML text.
    pub fn to_yaml(&mut self) -> Result<String> {
        let resolved = self.resolve_all()?;
        Ok(strata_yaml::emit_str(&resolved)?)
    }

    /// The fully resolved document as a JSON value.
    pub fn to_json(&mut self) -> Result<serde_json::Value> {
        let resolved = self.resolve_all()?;
        crate::export::to_json(&resolved)
    }

    /// Register a custom placeholder operator.
    pub fn register_operator(&mut self, operator: Arc<dyn Operator>) {
        self.operators.register(operator);
    }

    /// Register a fetch provider for an import scheme.
    pub fn register_provider(&mut self, scheme: &str, provider: Arc<dyn FetchProvider>) {
        self.providers.register(scheme, provider);
    }

    /// Canonical locators loaded so far, in first-load order.
    pub fn files_loaded(&self) -> &[String] {
        self.state.loader.files_loaded()
    }

    /// The raw (unresolved) document tree.
    pub fn root(&self) -> &Value {
        &self.state.root
    }
}
