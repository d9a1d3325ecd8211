//! Deep merge of one document onto another.
//!
//! Used for environment overlays (`config-dev.yaml` onto `config.yaml`) and
//! for merge-mode imports.

use strata_value::{Scalar, Value};

/// Merge `overlay` onto `base`, in place.
///
/// Maps merge key by key: keys present in both recurse, keys only in the
/// overlay are appended after the base's keys, so the base's document order
/// wins for everything it defines. Any other kind of node is replaced
/// wholesale, sequences included. An explicit null in the overlay keeps the
/// base value, so an overlay can list a key without overriding it.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Map(base_map), Value::Map(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (_, Value::Scalar(Scalar::Null)) => {}
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_yaml::parse_str;

    #[test]
    fn test_overlay_replaces_and_appends() {
        let mut base = parse_str("a: 1\nb: 2\n").unwrap();
        let overlay = parse_str("b: 20\nc: 30\n").unwrap();
        deep_merge(&mut base, overlay);

        let map = base.as_map().unwrap();
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(map["b"].as_int(), Some(20));
        assert_eq!(map["c"].as_int(), Some(30));
    }

    #[test]
    fn test_nested_maps_merge_recursively() {
        let mut base = parse_str("db:\n  host: alpha\n  port: 3306\n").unwrap();
        let overlay = parse_str("db:\n  host: beta\n").unwrap();
        deep_merge(&mut base, overlay);

        let db = base.as_map().unwrap()["db"].as_map().unwrap();
        assert_eq!(db["host"].as_str(), Some("beta"));
        assert_eq!(db["port"].as_int(), Some(3306));
    }

    #[test]
    fn test_sequences_replace_wholesale() {
        let mut base = parse_str("hosts: [a, b, c]\n").unwrap();
        let overlay = parse_str("hosts: [x]\n").unwrap();
        deep_merge(&mut base, overlay);
        assert_eq!(base.as_map().unwrap()["hosts"].as_sequence().unwrap().len(), 1);
    }

    #[test]
    fn test_overlay_null_keeps_base() {
        let mut base = parse_str("a: keep\n").unwrap();
        let overlay = parse_str("a: ~\n").unwrap();
        deep_merge(&mut base, overlay);
        assert_eq!(base.as_map().unwrap()["a"].as_str(), Some("keep"));
    }
}
