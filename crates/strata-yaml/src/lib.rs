//! # strata-yaml
//!
//! YAML front-end for strata configuration documents.
//!
//! [`parse_str`] turns YAML text into the ordered [`strata_value::Value`]
//! model; [`emit_str`] renders a tree back out. The `r"..."` string marker
//! survives both directions, so raw strings stay raw across a load / dump
//! cycle. Placeholder compilation is not this crate's business: strings come
//! out of the parser verbatim.

pub mod emitter;
pub mod error;
pub mod parser;

pub use emitter::emit_str;
pub use error::{Error, Result};
pub use parser::parse_str;
