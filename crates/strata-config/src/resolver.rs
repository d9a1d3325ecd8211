//! Lazy, cached resolution of compound values.
//!
//! Each node resolves at most once per epoch: the first access walks the
//! placeholder graph, every later access returns the cached value (or
//! re-raises the cached error). A node's identity is its canonical
//! document-absolute path; the in-flight stack of identities turns reference
//! cycles into reported errors instead of unbounded recursion.
//!
//! Caching is per node, not per dependency edge: overwriting a value via
//! `set` invalidates that node and its descendants only. A `ref` that
//! resolved before its target changed keeps returning the old value until
//! the document is explicitly refreshed.

use crate::error::{ConfigError, Result};
use crate::loader::FileLoader;
use crate::merge::deep_merge;
use crate::provider::{ProviderRegistry, split_scheme};
use crate::registry::OperatorRegistry;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use strata_value::{
    Anchor, CompoundValue, ConfigPath, Fragment, Scalar, Segment, Value, ValueError, access,
};
use tracing::trace;

/// A file spliced into the document: the subtree at `path` came from
/// `locator`. Mounts give `./` and `../` anchors their meaning and carry the
/// base directory for relative imports underneath them.
#[derive(Debug, Clone)]
pub struct Mount {
    /// Document-absolute path of the spliced subtree; empty for the root
    /// document itself.
    pub path: ConfigPath,

    /// Canonical locator the subtree was loaded from.
    pub locator: String,

    /// Directory that relative import locators below this mount resolve
    /// against. `None` for non-file sources.
    pub dir: Option<PathBuf>,
}

#[derive(Clone)]
enum Cached {
    Resolved(Value),
    Failed(ConfigError),
}

/// Everything owned by one configuration document.
pub struct DocState {
    /// The raw tree: scalars, containers, unresolved compound values.
    pub root: Value,

    /// Mount table; `mounts[0]` is always the root document.
    pub mounts: Vec<Mount>,

    /// Table behind the `global` operator. Plain values only.
    pub globals: Value,

    /// Read-only subtree prefixes.
    pub protected: Vec<ConfigPath>,

    /// The import graph: file cache plus in-progress stack.
    pub loader: FileLoader,

    cache: HashMap<String, Cached>,
    stack: Vec<String>,
    epoch: u64,
}

impl DocState {
    pub fn new(root: Value, mount: Mount, loader: FileLoader) -> Self {
        DocState {
            root,
            mounts: vec![mount],
            globals: Value::map(),
            protected: Vec::new(),
            loader,
            cache: HashMap::new(),
            stack: Vec::new(),
            epoch: 0,
        }
    }

    /// Bumped whenever the whole cache is dropped; lets an in-flight
    /// container walk notice that a merge rewrote the tree under it.
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Drop cached results for `path`, everything below it, and the
    /// containers above it (their resolved copies embed the old value).
    /// Nodes that merely referenced the old value stay cached.
    pub fn invalidate(&mut self, path: &ConfigPath) {
        if path.is_empty() {
            self.cache.clear();
            return;
        }
        // Writing a sequence element can shift its later siblings, whose
        // cached entries still sit under the old indices. Drop the whole
        // sequence.
        if matches!(path.segments().last(), Some(Segment::Index(_))) {
            if let Some(parent) = path.parent() {
                return self.invalidate(&parent);
            }
        }
        let key = path.to_string();
        let child_dot = format!("{}.", key);
        let child_idx = format!("{}[", key);
        self.cache
            .retain(|k, _| *k != key && !k.starts_with(&child_dot) && !k.starts_with(&child_idx));

        let mut ancestor = path.parent();
        while let Some(p) = ancestor {
            self.cache.remove(&p.to_string());
            ancestor = p.parent();
        }
    }

    /// Start a new resolution epoch: every node resolves afresh.
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
        self.epoch += 1;
    }
}

/// Per-call resolution state threaded through operators.
///
/// `site` is the document-absolute path of the node currently being
/// resolved; relative path anchors and relative import locators are
/// interpreted against the mounts enclosing it.
pub struct ResolutionContext<'a> {
    pub state: &'a mut DocState,
    pub operators: &'a OperatorRegistry,
    pub providers: &'a ProviderRegistry,
    pub site: ConfigPath,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(
        state: &'a mut DocState,
        operators: &'a OperatorRegistry,
        providers: &'a ProviderRegistry,
    ) -> Self {
        ResolutionContext {
            state,
            operators,
            providers,
            site: ConfigPath::root(),
        }
    }

    /// Fully resolve the node at a document-absolute, plain path.
    pub fn resolve_at(&mut self, path: &ConfigPath) -> Result<Value> {
        let key = path.to_string();
        if let Some(cached) = self.state.cache.get(&key) {
            trace!(path = %key, "resolution cache hit");
            return match cached {
                Cached::Resolved(value) => Ok(value.clone()),
                Cached::Failed(err) => Err(err.clone()),
            };
        }

        if self.state.stack.iter().any(|s| *s == key) {
            let err = ConfigError::CircularReference {
                chain: render_chain(&self.state.stack, &key),
            };
            self.state.cache.insert(key, Cached::Failed(err.clone()));
            return Err(err);
        }

        self.state.stack.push(key.clone());
        let saved_site = std::mem::replace(&mut self.site, path.clone());
        let epoch = self.state.epoch();
        let result = self.resolve_here(path);
        self.site = saved_site;
        self.state.stack.pop();

        match &result {
            Ok(value) => {
                // A merge-mode import rewrites the tree under us: its own
                // node is gone, and sequence siblings may have shifted onto
                // this path. Cache only when neither happened.
                let still_there =
                    matches!(access::get(&self.state.root, path), Ok(Some(_)));
                if still_there && self.state.epoch() == epoch {
                    self.state
                        .cache
                        .insert(key, Cached::Resolved(value.clone()));
                }
            }
            Err(err) => {
                self.state.cache.insert(key, Cached::Failed(err.clone()));
            }
        }
        result
    }

    /// Resolve the raw node at `path` without touching cache or stack.
    /// `self.site` must already be `path`.
    fn resolve_here(&mut self, path: &ConfigPath) -> Result<Value> {
        enum Raw {
            Done(Value),
            Container,
            Compound(CompoundValue),
        }

        let raw = match access::get(&self.state.root, path)? {
            None => return Err(ConfigError::not_found(path)),
            Some(Value::Scalar(Scalar::Str(s))) if s.starts_with("???") => {
                return Err(ConfigError::MissingValue {
                    path: path.to_string(),
                });
            }
            Some(Value::Scalar(Scalar::RawStr(s))) => {
                Raw::Done(Value::Scalar(Scalar::Str(s.clone())))
            }
            Some(Value::Scalar(scalar)) => Raw::Done(Value::Scalar(scalar.clone())),
            Some(Value::Compound(compound)) => Raw::Compound(compound.clone()),
            Some(Value::Map(_)) | Some(Value::Sequence(_)) => Raw::Container,
        };

        match raw {
            Raw::Done(value) => Ok(value),
            Raw::Compound(compound) => self.resolve_compound(&compound),
            Raw::Container => self.resolve_container(path),
        }
    }

    /// Build a fully resolved copy of a container by resolving each child at
    /// its own path. The key set is re-read every step because a merge-mode
    /// import below can add or remove siblings mid-walk.
    fn resolve_container(&mut self, path: &ConfigPath) -> Result<Value> {
        let is_map = matches!(access::get(&self.state.root, path)?, Some(Value::Map(_)));
        if is_map {
            let mut out = IndexMap::new();
            let mut done: HashSet<String> = HashSet::new();
            loop {
                let next = match access::get(&self.state.root, path)? {
                    Some(Value::Map(entries)) => {
                        entries.keys().find(|k| !done.contains(*k)).cloned()
                    }
                    _ => None,
                };
                let Some(key) = next else { break };
                done.insert(key.clone());

                let child = path.child(Segment::Key(key.clone()));
                let epoch = self.state.epoch();
                let resolved = self.resolve_at(&child)?;
                if self.state.epoch() != epoch {
                    // A merge rewrote the tree; revisit earlier siblings.
                    done.clear();
                    done.insert(key.clone());
                }
                if matches!(access::get(&self.state.root, &child), Ok(Some(_))) {
                    out.insert(key, resolved);
                }
            }
            Ok(Value::Map(out))
        } else {
            let mut out = Vec::new();
            let mut next = 0;
            loop {
                let len = match access::get(&self.state.root, path)? {
                    Some(Value::Sequence(items)) => items.len(),
                    _ => 0,
                };
                if next >= len {
                    break;
                }
                let epoch = self.state.epoch();
                let resolved = self.resolve_at(&path.child(Segment::Index(next)))?;
                if self.state.epoch() != epoch {
                    // A merge rewrote the tree and shifted the indices;
                    // start the walk over.
                    out.clear();
                    next = 0;
                    continue;
                }
                out.push(resolved);
                next += 1;
            }
            Ok(Value::Sequence(out))
        }
    }

    /// Resolve a compound value at the current site.
    ///
    /// A value that is exactly one operator call keeps the call's native
    /// type; anything else concatenates to a string, and a container result
    /// inside a concatenation is an error.
    fn resolve_compound(&mut self, compound: &CompoundValue) -> Result<Value> {
        if let Some(call) = compound.single_call() {
            let call = call.clone();
            return self.dispatch_call(&call);
        }

        let mut out = String::new();
        for fragment in &compound.fragments {
            match fragment {
                Fragment::Literal(text) => out.push_str(text),
                Fragment::Call(call) => {
                    let call = call.clone();
                    match self.dispatch_call(&call)? {
                        Value::Scalar(scalar) => out.push_str(&scalar.to_display_string()),
                        _ => {
                            return Err(ValueError::syntax(
                                compound.to_string(),
                                "container value in string concatenation",
                            )
                            .into());
                        }
                    }
                }
            }
        }
        Ok(Value::Scalar(Scalar::Str(out)))
    }

    fn dispatch_call(&mut self, call: &strata_value::OperatorCall) -> Result<Value> {
        let operator =
            self.operators
                .get(&call.name)
                .ok_or_else(|| ConfigError::UnknownOperator {
                    name: call.name.clone(),
                    placeholder: call.to_string(),
                })?;
        operator.resolve(call, self)
    }

    /// Resolve an operator argument. A purely literal argument is coerced
    /// (`8080` becomes an integer); anything with nested calls resolves like
    /// a compound value.
    pub fn resolve_argument(&mut self, arg: &CompoundValue) -> Result<Value> {
        if let Some(text) = arg.literal_text() {
            return Ok(Value::Scalar(Scalar::from_literal(&text)));
        }
        self.resolve_compound(arg)
    }

    /// Resolve an argument that must come out as text (a path, a locator,
    /// an environment-variable name).
    pub fn argument_text(&mut self, arg: &CompoundValue) -> Result<String> {
        match self.resolve_argument(arg)? {
            Value::Scalar(scalar) => Ok(scalar.to_display_string()),
            _ => Err(ValueError::syntax(arg.to_string(), "expected a scalar argument").into()),
        }
    }

    /// Look up a path and return its fully resolved value.
    ///
    /// Relative anchors are interpreted against the current site's mount
    /// chain. Pattern paths return a sequence of matches (possibly empty);
    /// plain paths return the value or `NotFound`.
    pub fn lookup(&mut self, path: &ConfigPath) -> Result<Value> {
        let abs = self.absolutize(path)?;
        if abs.is_pattern() {
            self.lookup_pattern(&abs)
        } else {
            self.lookup_plain(&abs)
        }
    }

    fn absolutize(&self, path: &ConfigPath) -> Result<ConfigPath> {
        match path.anchor() {
            Anchor::Document => Ok(ConfigPath::from_segments(
                Anchor::Document,
                path.segments().to_vec(),
            )),
            Anchor::File { up } => {
                let chain = self.mount_chain();
                if up >= chain.len() {
                    return Err(ValueError::path(
                        path,
                        "more '../' levels than enclosing files",
                    )
                    .into());
                }
                let base = &self.state.mounts[chain[chain.len() - 1 - up]];
                Ok(base.path.join(path.segments()))
            }
        }
    }

    /// Indices of mounts enclosing the current site, outermost first.
    fn mount_chain(&self) -> Vec<usize> {
        let mut chain: Vec<usize> = self
            .state
            .mounts
            .iter()
            .enumerate()
            .filter(|(_, m)| m.path.is_prefix_of(&self.site))
            .map(|(i, _)| i)
            .collect();
        chain.sort_by_key(|&i| self.state.mounts[i].path.len());
        chain
    }

    /// Walk a plain path, resolving compound values encountered mid-walk.
    fn lookup_plain(&mut self, abs: &ConfigPath) -> Result<Value> {
        let segments = abs.segments().to_vec();
        let mut current = ConfigPath::root();

        for (i, segment) in segments.iter().enumerate() {
            let candidate = current.child(segment.clone());
            let is_compound = match access::get(&self.state.root, &candidate)? {
                None => return Err(ConfigError::not_found(abs)),
                Some(node) => node.is_compound(),
            };

            if !is_compound {
                current = candidate;
                continue;
            }

            let resolved = self.resolve_at(&candidate)?;
            let rest = &segments[i + 1..];

            // An import splices its subtree into the document; keep walking
            // the document so deeper nodes resolve at their own sites.
            let spliced = matches!(
                access::get(&self.state.root, &candidate)?,
                Some(node) if !node.is_compound()
            );
            if spliced {
                current = candidate;
                continue;
            }

            if rest.is_empty() {
                return Ok(resolved);
            }
            // A ref result is detached from the document and already fully
            // resolved; the remainder is a pure walk.
            let rest_path = ConfigPath::from_segments(Anchor::Document, rest.to_vec());
            return match access::get(&resolved, &rest_path)? {
                Some(node) => Ok(node.clone()),
                None => Err(ConfigError::not_found(abs)),
            };
        }

        self.resolve_at(&current)
    }

    /// Resolve the subtree above the first pattern segment, then run the
    /// pattern over the resolved copy. Zero matches is an empty sequence.
    fn lookup_pattern(&mut self, abs: &ConfigPath) -> Result<Value> {
        let split = abs
            .segments()
            .iter()
            .position(Segment::is_pattern)
            .unwrap_or(abs.len());
        let prefix = ConfigPath::from_segments(Anchor::Document, abs.segments()[..split].to_vec());
        let rest = ConfigPath::from_segments(Anchor::Document, abs.segments()[split..].to_vec());

        let base = match self.lookup_plain(&prefix) {
            Ok(value) => value,
            Err(ConfigError::NotFound { .. }) => return Ok(Value::Sequence(Vec::new())),
            Err(err) => return Err(err),
        };
        let matches = access::find(&base, &rest)?;
        Ok(Value::Sequence(matches.into_iter().cloned().collect()))
    }

    /// Execute an import at the current site.
    ///
    /// With `merge` false the imported tree replaces the placeholder node
    /// and a mount is registered there. With `merge` true the tree merges
    /// into the enclosing file's root and the placeholder node is deleted.
    pub fn import(&mut self, locator: &str, merge: bool) -> Result<Value> {
        let chain = self.mount_chain();
        let innermost = *chain.last().unwrap_or(&0);
        let base_dir = self.state.mounts[innermost].dir.clone();
        let canonical = self.state.loader.canonicalize(locator, base_dir.as_deref());

        // A file importing one of its own ancestors is a cycle, even though
        // the ancestor finished loading long ago.
        let chain_locators: Vec<String> = chain
            .iter()
            .map(|&i| self.state.mounts[i].locator.clone())
            .collect();
        if let Some(pos) = chain_locators.iter().position(|l| *l == canonical) {
            let mut parts = chain_locators[pos..].to_vec();
            parts.push(canonical);
            return Err(ConfigError::CircularImport {
                chain: parts.join(" -> "),
            });
        }

        let file = self.state.loader.load(&canonical, self.providers)?;
        let dir = if split_scheme(&canonical).is_none() {
            Path::new(&canonical).parent().map(Path::to_path_buf)
        } else {
            None
        };

        let site = self.site.clone();
        if merge {
            let target = self.state.mounts[innermost].path.clone();
            access::delete(&mut self.state.root, &site)?;
            if target.is_empty() {
                deep_merge(&mut self.state.root, file.tree);
            } else {
                let mut subtree = match access::get(&self.state.root, &target)? {
                    Some(node) => node.clone(),
                    None => Value::map(),
                };
                deep_merge(&mut subtree, file.tree);
                access::set(&mut self.state.root, &target, subtree)?;
            }
            self.state.invalidate_all();
            Ok(Value::null())
        } else {
            access::set(&mut self.state.root, &site, file.tree)?;
            match self.state.mounts.iter_mut().find(|m| m.path == site) {
                Some(mount) => {
                    mount.locator = canonical;
                    mount.dir = dir;
                }
                None => self.state.mounts.push(Mount {
                    path: site.clone(),
                    locator: canonical,
                    dir,
                }),
            }
            self.state.invalidate(&site);
            self.resolve_here(&site)
        }
    }
}

pub(crate) fn render_chain(stack: &[String], repeat: &str) -> String {
    let start = stack.iter().position(|s| s == repeat).unwrap_or(0);
    let mut parts: Vec<&str> = stack[start..].iter().map(String::as_str).collect();
    parts.push(repeat);
    parts.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::compile_tree;

    fn state_from_yaml(text: &str) -> DocState {
        let mut root = strata_yaml::parse_str(text).unwrap();
        compile_tree(&mut root).unwrap();
        DocState::new(
            root,
            Mount {
                path: ConfigPath::root(),
                locator: "<memory>".to_string(),
                dir: None,
            },
            FileLoader::new(None),
        )
    }

    fn lookup(state: &mut DocState, path: &str) -> Result<Value> {
        let operators = OperatorRegistry::with_builtins();
        let providers = ProviderRegistry::new();
        let mut ctx = ResolutionContext::new(state, &operators, &providers);
        ctx.lookup(&ConfigPath::parse(path).unwrap())
    }

    #[test]
    fn test_plain_scalar_resolves_to_itself() {
        let mut state = state_from_yaml("a: plain\n");
        assert_eq!(lookup(&mut state, "a").unwrap().as_str(), Some("plain"));
    }

    #[test]
    fn test_ref_resolves_and_composes() {
        let mut state = state_from_yaml("a: '{ref:b}'\nb: '{ref:c}'\nc: 42\n");
        assert_eq!(lookup(&mut state, "a").unwrap().as_int(), Some(42));
    }

    #[test]
    fn test_concatenation_coerces_scalars() {
        let mut state = state_from_yaml("url: 'db:{ref:port}/x'\nport: 3306\n");
        assert_eq!(
            lookup(&mut state, "url").unwrap().as_str(),
            Some("db:3306/x")
        );
    }

    #[test]
    fn test_container_in_concatenation_is_error() {
        let mut state = state_from_yaml("bad: 'x-{ref:db}'\ndb:\n  a: 1\n");
        let err = lookup(&mut state, "bad").unwrap_err();
        assert!(matches!(err, ConfigError::Value(_)), "{err:?}");
    }

    #[test]
    fn test_circular_reference_reports_chain() {
        let mut state = state_from_yaml("a: '{ref:b}'\nb: '{ref:a}'\n");
        let err = lookup(&mut state, "a").unwrap_err();
        match err {
            ConfigError::CircularReference { chain } => {
                assert_eq!(chain, "a -> b -> a");
            }
            other => panic!("expected circular reference, got {other:?}"),
        }
    }

    #[test]
    fn test_failure_is_cached() {
        let mut state = state_from_yaml("a: '{ref:b}'\nb: '{ref:a}'\n");
        let first = lookup(&mut state, "a").unwrap_err();
        let second = lookup(&mut state, "a").unwrap_err();
        assert_eq!(first, second);
    }

    #[test]
    fn test_mandatory_marker_raises() {
        let mut state = state_from_yaml("must: '???'\n");
        let err = lookup(&mut state, "must").unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue { .. }), "{err:?}");
    }

    #[test]
    fn test_raw_string_resolves_verbatim() {
        let mut state = state_from_yaml("a: r\"{ref:b}\"\n");
        assert_eq!(lookup(&mut state, "a").unwrap().as_str(), Some("{ref:b}"));
    }

    #[test]
    fn test_unknown_operator() {
        let mut state = state_from_yaml("a: '{nope:x}'\n");
        let err = lookup(&mut state, "a").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownOperator { .. }), "{err:?}");
    }

    #[test]
    fn test_container_lookup_resolves_descendants() {
        let mut state = state_from_yaml("db:\n  port: '{ref:defaults.port}'\ndefaults:\n  port: 5432\n");
        let db = lookup(&mut state, "db").unwrap();
        assert_eq!(db.as_map().unwrap()["port"].as_int(), Some(5432));
    }

    #[test]
    fn test_walk_through_ref_container() {
        let mut state = state_from_yaml("alias: '{ref:db}'\ndb:\n  port: 9\n");
        assert_eq!(lookup(&mut state, "alias.port").unwrap().as_int(), Some(9));
    }

    #[test]
    fn test_pattern_lookup_returns_matches() {
        let mut state = state_from_yaml("c:\n  x:\n    c32: 1\n  y:\n    z:\n      c32: 2\n");
        let found = lookup(&mut state, "c.**.c32").unwrap();
        let items = found.as_sequence().unwrap();
        let values: Vec<i64> = items.iter().map(|v| v.as_int().unwrap()).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_pattern_zero_matches_is_empty() {
        let mut state = state_from_yaml("a:\n  b: 1\n");
        let found = lookup(&mut state, "a.*.missing").unwrap();
        assert!(found.as_sequence().unwrap().is_empty());
    }

    #[test]
    fn test_ref_default_used_on_not_found() {
        let mut state = state_from_yaml("a: '{ref:nope, 8080}'\n");
        assert_eq!(lookup(&mut state, "a").unwrap().as_int(), Some(8080));
    }

    #[test]
    fn test_ref_default_does_not_mask_mandatory() {
        let mut state = state_from_yaml("a: '{ref:must, 1}'\nmust: '???'\n");
        let err = lookup(&mut state, "a").unwrap_err();
        assert!(matches!(err, ConfigError::MissingValue { .. }), "{err:?}");
    }

    #[test]
    fn test_quoted_default_still_coerces_type() {
        // Quoting protects separators in the argument text, not its type.
        let mut state = state_from_yaml("a: '{ref:nope, \"8080\"}'\n");
        assert_eq!(lookup(&mut state, "a").unwrap().as_int(), Some(8080));
    }
}
