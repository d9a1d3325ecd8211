//! # strata-value
//!
//! The document model underneath the strata configuration engine, plus the
//! two small languages that operate on it:
//!
//! - [`Value`] / [`Scalar`]: ordered configuration trees. Maps keep insertion
//!   order, so walks and dumps are deterministic.
//! - [`compound`]: the placeholder grammar. Strings containing `{op:args}`
//!   syntax decompose into [`CompoundValue`] fragments at load time; nothing
//!   in this crate executes an operator.
//! - [`path`]: the query path language (`db.host`, `a/b/2/c`, `*`, `[*]`,
//!   `**`, and the `./` / `../` file anchors).
//! - [`access`]: pure structural get / find / set / delete over a tree.
//!
//! Resolution (executing operator calls, imports, caching) lives in
//! `strata-config`; this crate stays side-effect free.

pub mod access;
pub mod compound;
pub mod error;
pub mod path;
pub mod value;

pub use compound::{CompoundValue, Fragment, OperatorCall, Parsed, parse_scalar};
pub use error::{Result, ValueError};
pub use path::{Anchor, ConfigPath, Segment};
pub use value::{Scalar, Value};
