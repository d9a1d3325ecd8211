//! Operator registry: open dispatch for placeholder operators.
//!
//! The resolution engine never matches on operator names; it looks the name
//! up here and calls through the [`Operator`] trait, so new placeholder kinds
//! plug in without touching the walker.

use crate::error::Result;
use crate::operators::{EnvOperator, GlobalOperator, ImportOperator, RefOperator};
use crate::resolver::ResolutionContext;
use indexmap::IndexMap;
use std::sync::Arc;
use strata_value::{OperatorCall, Value};

/// A placeholder operator, e.g. the `ref` in `{ref:db.port}`.
///
/// Handlers receive the raw call with unresolved argument fragments and are
/// responsible for resolving nested placeholders in their own arguments
/// (via [`ResolutionContext::resolve_argument`]). The returned value must be
/// fully resolved; the engine caches it as-is.
pub trait Operator: Send + Sync {
    /// The name this operator registers under.
    fn name(&self) -> &'static str;

    fn resolve(&self, call: &OperatorCall, ctx: &mut ResolutionContext<'_>) -> Result<Value>;
}

/// Name to handler mapping.
pub struct OperatorRegistry {
    handlers: IndexMap<String, Arc<dyn Operator>>,
}

impl OperatorRegistry {
    /// An empty registry, no operators at all.
    pub fn new() -> Self {
        OperatorRegistry {
            handlers: IndexMap::new(),
        }
    }

    /// The standard set: `ref`, `env`, `import`, `global`.
    pub fn with_builtins() -> Self {
        let mut registry = OperatorRegistry::new();
        registry.register(Arc::new(RefOperator));
        registry.register(Arc::new(EnvOperator));
        registry.register(Arc::new(ImportOperator));
        registry.register(Arc::new(GlobalOperator));
        registry
    }

    /// Register a handler under its own name, replacing any previous one.
    pub fn register(&mut self, operator: Arc<dyn Operator>) {
        self.handlers.insert(operator.name().to_string(), operator);
    }

    /// Handler for `name`, if registered. Returns an owned handle so the
    /// caller can invoke it while mutating the resolution state.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Operator>> {
        self.handlers.get(name).cloned()
    }
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        OperatorRegistry::with_builtins()
    }
}
