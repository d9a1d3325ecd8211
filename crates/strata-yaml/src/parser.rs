//! YAML text to [`Value`] trees.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use strata_value::{Scalar, Value};
use yaml_rust2::{Yaml, YamlLoader};

/// Parse a YAML document into a [`Value`] tree.
///
/// Only the first document of a multi-document stream is used. Empty input
/// parses as `Null`. Mapping keys must be scalars; they are stringified, so
/// `8080: x` and `"8080": x` produce the same key.
pub fn parse_str(text: &str) -> Result<Value> {
    let docs = YamlLoader::load_from_str(text)?;
    match docs.into_iter().next() {
        Some(doc) => convert(doc),
        None => Ok(Value::null()),
    }
}

fn convert(yaml: Yaml) -> Result<Value> {
    match yaml {
        Yaml::Hash(entries) => convert_hash(entries),
        Yaml::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(convert(item)?);
            }
            Ok(Value::Sequence(out))
        }
        Yaml::String(s) => Ok(Value::Scalar(string_scalar(s))),
        Yaml::Integer(i) => Ok(Value::Scalar(Scalar::Int(i))),
        Yaml::Real(text) => {
            let f = text
                .parse::<f64>()
                .map_err(|_| Error::parse(format!("invalid float literal '{}'", text)))?;
            Ok(Value::Scalar(Scalar::Float(f)))
        }
        Yaml::Boolean(b) => Ok(Value::Scalar(Scalar::Bool(b))),
        Yaml::Null => Ok(Value::null()),
        Yaml::Alias(_) => Err(Error::parse("YAML aliases are not supported")),
        Yaml::BadValue => Err(Error::parse("malformed YAML value")),
    }
}

/// Strings of the form `r"..."` are raw: the quotes and marker are stripped
/// and the content is never scanned for placeholder syntax.
fn string_scalar(s: String) -> Scalar {
    if s.len() >= 3 && s.starts_with("r\"") && s.ends_with('"') {
        Scalar::RawStr(s[2..s.len() - 1].to_string())
    } else {
        Scalar::Str(s)
    }
}

fn convert_hash(entries: yaml_rust2::yaml::Hash) -> Result<Value> {
    let mut map = IndexMap::with_capacity(entries.len());
    for (key, value) in entries {
        let key = key_string(&key)?;
        map.insert(key, convert(value)?);
    }
    Ok(Value::Map(map))
}

fn key_string(key: &Yaml) -> Result<String> {
    match key {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Integer(i) => Ok(i.to_string()),
        Yaml::Real(r) => Ok(r.clone()),
        Yaml::Boolean(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        _ => Err(Error::parse("mapping keys must be scalars")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_key_order() {
        let value = parse_str("zulu: 1\nalpha: 2\nmike: 3\n").unwrap();
        let keys: Vec<&str> = value.as_map().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn test_parse_scalar_kinds() {
        let value = parse_str("a: 1\nb: 2.5\nc: true\nd: ~\ne: text\n").unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map["a"].as_int(), Some(1));
        assert_eq!(map["b"], Value::from(2.5));
        assert_eq!(map["c"].as_bool(), Some(true));
        assert!(map["d"].as_scalar().unwrap() == &Scalar::Null);
        assert_eq!(map["e"].as_str(), Some("text"));
    }

    #[test]
    fn test_parse_nested_structures() {
        let value = parse_str("db:\n  hosts:\n    - alpha\n    - beta\n").unwrap();
        let hosts = value.as_map().unwrap()["db"].as_map().unwrap()["hosts"]
            .as_sequence()
            .unwrap();
        assert_eq!(hosts.len(), 2);
        assert_eq!(hosts[0].as_str(), Some("alpha"));
    }

    #[test]
    fn test_raw_string_marker() {
        let value = parse_str("a: r\"{ref:db}\"\nb: '{ref:db}'\n").unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(
            map["a"].as_scalar(),
            Some(&Scalar::RawStr("{ref:db}".to_string()))
        );
        assert_eq!(
            map["b"].as_scalar(),
            Some(&Scalar::Str("{ref:db}".to_string()))
        );
    }

    #[test]
    fn test_scalar_keys_are_stringified() {
        let value = parse_str("8080: a\ntrue: b\n").unwrap();
        let map = value.as_map().unwrap();
        assert!(map.contains_key("8080"));
        assert!(map.contains_key("true"));
    }

    #[test]
    fn test_empty_input_is_null() {
        assert_eq!(parse_str("").unwrap(), Value::null());
    }

    #[test]
    fn test_invalid_yaml_is_parse_error() {
        let err = parse_str("a: [unclosed\n").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "{err:?}");
    }
}
