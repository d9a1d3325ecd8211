//! Error types for loading, importing, and resolving configuration.

use strata_value::ValueError;
use thiserror::Error;

/// Result type alias for strata-config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised by the configuration engine.
///
/// The type is `Clone` because resolution failures are cached per node and
/// re-raised on subsequent access instead of redoing the failing work.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Placeholder or path syntax error, or structural path misuse.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// A loaded or imported document was not valid YAML.
    #[error(transparent)]
    Yaml(#[from] strata_yaml::Error),

    /// Lookup failed and no default was supplied.
    #[error("Config value not found: '{path}'")]
    NotFound {
        /// The path (or `env:NAME`) that had no value
        path: String,
    },

    /// A value marked mandatory (`???`) was never supplied.
    #[error("Mandatory config value missing: '{path}'")]
    MissingValue {
        /// The node that carries the mandatory marker
        path: String,
    },

    /// References form a cycle. The chain lists every node involved.
    #[error("Circular reference: {chain}")]
    CircularReference {
        /// `a -> b -> a` style rendering of the cycle
        chain: String,
    },

    /// Imports form a cycle. The chain lists every locator involved.
    #[error("Circular import: {chain}")]
    CircularImport {
        /// `a.yaml -> b.yaml -> a.yaml` style rendering of the cycle
        chain: String,
    },

    /// Mutation attempted inside a protected subtree.
    #[error("Config path is read-only: '{path}'")]
    ReadOnly {
        /// The protected path
        path: String,
    },

    /// An import locator used a scheme with no registered provider.
    #[error("No provider registered for scheme '{scheme}' ('{locator}')")]
    UnsupportedProvider {
        /// The unknown scheme prefix
        scheme: String,
        /// The full locator
        locator: String,
    },

    /// A placeholder named an operator that is not registered.
    #[error("Unknown operator '{name}' in '{placeholder}'")]
    UnknownOperator {
        /// The operator name
        name: String,
        /// The placeholder text it appeared in
        placeholder: String,
    },

    /// Fetching an import target failed.
    #[error("Failed to read '{locator}': {message}")]
    Io {
        /// The locator being fetched
        locator: String,
        /// The underlying failure
        message: String,
    },
}

impl ConfigError {
    /// Shorthand for a not-found error at a path.
    pub fn not_found(path: impl ToString) -> Self {
        ConfigError::NotFound {
            path: path.to_string(),
        }
    }
}
