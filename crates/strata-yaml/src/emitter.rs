//! [`Value`] trees to YAML text.

use crate::error::{Error, Result};
use strata_value::{Scalar, Value};
use yaml_rust2::{Yaml, YamlEmitter};

/// Render a [`Value`] tree as a YAML document.
///
/// Map keys come out in document order. Compound values cannot be emitted;
/// resolve the tree first. Raw strings are re-wrapped in the `r"..."` marker
/// so a dump parses back to the same tree.
pub fn emit_str(value: &Value) -> Result<String> {
    let yaml = to_yaml(value)?;
    let mut out = String::new();
    let mut emitter = YamlEmitter::new(&mut out);
    emitter
        .dump(&yaml)
        .map_err(|e| Error::emit(e.to_string()))?;

    // The emitter always prefixes the document marker.
    let body = out.strip_prefix("---\n").unwrap_or(&out);
    let mut body = body.to_string();
    if !body.ends_with('\n') {
        body.push('\n');
    }
    Ok(body)
}

fn to_yaml(value: &Value) -> Result<Yaml> {
    match value {
        Value::Map(entries) => {
            let mut hash = yaml_rust2::yaml::Hash::new();
            for (key, child) in entries {
                hash.insert(Yaml::String(key.clone()), to_yaml(child)?);
            }
            Ok(Yaml::Hash(hash))
        }
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(to_yaml(item)?);
            }
            Ok(Yaml::Array(out))
        }
        Value::Scalar(scalar) => Ok(scalar_to_yaml(scalar)),
        Value::Compound(compound) => Err(Error::emit(format!(
            "unresolved placeholder '{}' cannot be emitted",
            compound
        ))),
    }
}

fn scalar_to_yaml(scalar: &Scalar) -> Yaml {
    match scalar {
        Scalar::Str(s) => Yaml::String(s.clone()),
        Scalar::RawStr(s) => Yaml::String(format!("r\"{}\"", s)),
        Scalar::Int(i) => Yaml::Integer(*i),
        Scalar::Float(f) => Yaml::Real(format_float(*f)),
        Scalar::Bool(b) => Yaml::Boolean(*b),
        Scalar::Null => Yaml::Null,
    }
}

// Integral floats keep a fractional digit so they stay floats on re-parse.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}
