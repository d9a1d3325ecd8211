//! Resolved trees to `serde_json` values.

use crate::error::Result;
use serde_json::{Map, Number};
use strata_value::{Scalar, Value, ValueError};

/// Convert a fully resolved tree into a JSON value.
pub fn to_json(value: &Value) -> Result<serde_json::Value> {
    Ok(match value {
        Value::Map(entries) => {
            let mut out = Map::new();
            for (key, child) in entries {
                out.insert(key.clone(), to_json(child)?);
            }
            serde_json::Value::Object(out)
        }
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_json(item)?);
            }
            serde_json::Value::Array(out)
        }
        Value::Scalar(scalar) => scalar_to_json(scalar)?,
        Value::Compound(compound) => {
            return Err(ValueError::syntax(
                compound.to_string(),
                "unresolved placeholder cannot be exported",
            )
            .into());
        }
    })
}

fn scalar_to_json(scalar: &Scalar) -> Result<serde_json::Value> {
    Ok(match scalar {
        Scalar::Str(s) | Scalar::RawStr(s) => serde_json::Value::String(s.clone()),
        Scalar::Int(i) => serde_json::Value::Number(Number::from(*i)),
        Scalar::Float(f) => match Number::from_f64(*f) {
            Some(n) => serde_json::Value::Number(n),
            None => {
                return Err(
                    ValueError::syntax(f.to_string(), "non-finite float cannot be exported").into(),
                );
            }
        },
        Scalar::Bool(b) => serde_json::Value::Bool(*b),
        Scalar::Null => serde_json::Value::Null,
    })
}
