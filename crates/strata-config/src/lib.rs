//! # strata-config
//!
//! A hierarchical configuration engine. Documents load from YAML files
//! (plus optional environment overlays), and embedded placeholders such as
//! `{ref:db.port}`, `{env:HOME, /root}`, and `{import:./db.yaml}` resolve
//! lazily at read time, with per-node caching and cycle detection.
//!
//! The moving parts:
//!
//! - [`Config`]: the public API for load, get, set, delete, and dumps.
//! - [`resolver`]: the lazy resolution engine and its per-node cache.
//! - [`registry`] / [`operators`]: open operator dispatch; `ref`, `env`,
//!   `import`, and `global` ship built in, custom operators register through
//!   the same trait.
//! - [`loader`]: the import graph: file cache, overlay merge, circular
//!   import detection.
//! - [`provider`]: scheme-dispatched fetching for import locators.
//!
//! ```no_run
//! use strata_config::{Config, LoadOptions};
//!
//! # fn main() -> strata_config::Result<()> {
//! let mut config = Config::load("config.yaml", LoadOptions::default())?;
//! let port = config.get("db.port")?;
//! println!("{}", config.to_yaml()?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod merge;
pub mod operators;
pub mod provider;
pub mod registry;
pub mod resolver;

pub use config::{Config, LoadOptions};
pub use error::{ConfigError, Result};
pub use loader::{ConfigFile, FileLoader};
pub use provider::{FetchProvider, Fetched, ProviderRegistry};
pub use registry::{Operator, OperatorRegistry};
pub use resolver::{DocState, Mount, ResolutionContext};

pub use strata_value::{Anchor, ConfigPath, Scalar, Segment, Value};
