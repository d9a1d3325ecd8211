//! Deep get / find / set / delete over [`Value`] trees.
//!
//! These functions are pure structural accessors: they never resolve
//! placeholders (a [`Value::Compound`] node is an opaque leaf here) and they
//! only accept document-anchored paths. File-relative anchors and lazy
//! resolution are layered on top by the resolution engine.

use crate::error::{Result, ValueError};
use crate::path::{Anchor, ConfigPath, Segment};
use crate::value::Value;

/// Look up a plain (non-pattern) path.
///
/// Returns `Ok(None)` when the path does not exist; NotFound is a sentinel
/// so callers can apply defaults, not an error. Structural misuse (an index
/// into a map, a key into a sequence) is `ValueError::Path`.
pub fn get<'a>(root: &'a Value, path: &ConfigPath) -> Result<Option<&'a Value>> {
    require_absolute(path)?;
    if path.is_pattern() {
        return Err(ValueError::path(
            path,
            "search patterns require find(), not get()",
        ));
    }

    let mut node = root;
    for segment in path.segments() {
        match (node, segment) {
            (Value::Map(entries), Segment::Key(key)) => match entries.get(key) {
                Some(child) => node = child,
                None => return Ok(None),
            },
            (Value::Sequence(items), Segment::Index(i)) => match items.get(*i) {
                Some(child) => node = child,
                None => return Ok(None),
            },
            (Value::Map(_), Segment::Index(_)) => {
                return Err(ValueError::path(path, "sequence index into a map"));
            }
            (Value::Sequence(_), Segment::Key(_)) => {
                return Err(ValueError::path(path, "map key into a sequence"));
            }
            _ => return Ok(None),
        }
    }
    Ok(Some(node))
}

/// Evaluate a path that may contain `*`, `[*]` or `**`.
///
/// Matches are collected depth-first in document order; duplicates are
/// removed by identity. Zero matches is an empty vec, not an error.
pub fn find<'a>(root: &'a Value, path: &ConfigPath) -> Result<Vec<&'a Value>> {
    require_absolute(path)?;
    let mut out = Vec::new();
    collect(root, path.segments(), &mut out);
    Ok(out)
}

fn collect<'a>(node: &'a Value, segments: &[Segment], out: &mut Vec<&'a Value>) {
    let Some(segment) = segments.first() else {
        if !out.iter().any(|v| std::ptr::eq(*v, node)) {
            out.push(node);
        }
        return;
    };
    let rest = &segments[1..];

    match segment {
        Segment::Key(key) => {
            if let Value::Map(entries) = node {
                if let Some(child) = entries.get(key) {
                    collect(child, rest, out);
                }
            }
        }
        Segment::Index(i) => {
            if let Value::Sequence(items) = node {
                if let Some(child) = items.get(*i) {
                    collect(child, rest, out);
                }
            }
        }
        Segment::AnyKey => match node {
            Value::Map(entries) => {
                for child in entries.values() {
                    collect(child, rest, out);
                }
            }
            Value::Sequence(items) => {
                for child in items {
                    collect(child, rest, out);
                }
            }
            _ => {}
        },
        Segment::AnyIndex => {
            if let Value::Sequence(items) = node {
                for child in items {
                    collect(child, rest, out);
                }
            }
        }
        Segment::Deep => {
            // Zero levels: try the remainder right here...
            collect(node, rest, out);
            // ...then keep descending with the marker still active.
            match node {
                Value::Map(entries) => {
                    for child in entries.values() {
                        collect(child, segments, out);
                    }
                }
                Value::Sequence(items) => {
                    for child in items {
                        collect(child, segments, out);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Write `value` at `path`, returning the replaced value if any.
///
/// Missing intermediate levels are created as maps, never as sequences: a
/// missing sequence behind an explicit index segment is a path error. A
/// final index equal to the sequence length appends.
pub fn set(root: &mut Value, path: &ConfigPath, value: Value) -> Result<Option<Value>> {
    require_absolute(path)?;
    require_plain(path, "set")?;
    let Some((last, intermediate)) = path.segments().split_last() else {
        // Root path: replace the whole document.
        let old = std::mem::replace(root, value);
        return Ok(Some(old));
    };

    let mut node = root;

    for segment in intermediate {
        node = match (node, segment) {
            (Value::Map(entries), Segment::Key(key)) => {
                entries.entry(key.clone()).or_insert_with(Value::map)
            }
            (Value::Sequence(_), Segment::Key(_)) => {
                return Err(ValueError::path(path, "map key into a sequence"));
            }
            (Value::Sequence(items), Segment::Index(i)) => {
                let len = items.len();
                items
                    .get_mut(*i)
                    .ok_or_else(|| ValueError::path_index(path, *i, len))?
            }
            (_, Segment::Index(_)) => {
                // Missing sequences are never created implicitly.
                return Err(ValueError::path(path, "expected a sequence"));
            }
            // Replacing a scalar with an implicit map would lose data.
            (_, Segment::Key(_)) => {
                return Err(ValueError::path(path, "cannot descend through a scalar"));
            }
            _ => unreachable!("pattern segments rejected above"),
        };
    }

    match (node, last) {
        (Value::Map(entries), Segment::Key(key)) => Ok(entries.insert(key.clone(), value)),
        (Value::Sequence(_), Segment::Key(_)) => {
            Err(ValueError::path(path, "map key into a sequence"))
        }
        (Value::Sequence(items), Segment::Index(i)) => {
            if *i < items.len() {
                Ok(Some(std::mem::replace(&mut items[*i], value)))
            } else if *i == items.len() {
                items.push(value);
                Ok(None)
            } else {
                Err(ValueError::path_index(path, *i, items.len()))
            }
        }
        (_, Segment::Index(_)) => Err(ValueError::path(path, "expected a sequence")),
        (_, Segment::Key(_)) => Err(ValueError::path(path, "cannot descend through a scalar")),
        _ => unreachable!("pattern segments rejected above"),
    }
}

/// Delete the node at `path`. Returns `false` (not an error) when the path
/// does not exist or does not fit the structure.
pub fn delete(root: &mut Value, path: &ConfigPath) -> Result<bool> {
    require_absolute(path)?;
    require_plain(path, "delete")?;
    let Some(parent_path) = path.parent() else {
        return Err(ValueError::path(path, "cannot delete the document root"));
    };

    let mut node = root;
    for segment in parent_path.segments() {
        match (node, segment) {
            (Value::Map(entries), Segment::Key(key)) => match entries.get_mut(key) {
                Some(child) => node = child,
                None => return Ok(false),
            },
            (Value::Sequence(items), Segment::Index(i)) => match items.get_mut(*i) {
                Some(child) => node = child,
                None => return Ok(false),
            },
            _ => return Ok(false),
        }
    }

    let Some(last) = path.segments().last() else {
        return Ok(false);
    };
    match (node, last) {
        (Value::Map(entries), Segment::Key(key)) => {
            Ok(entries.shift_remove(key).is_some())
        }
        (Value::Sequence(items), Segment::Index(i)) => {
            if *i < items.len() {
                items.remove(*i);
                Ok(true)
            } else {
                Ok(false)
            }
        }
        _ => Ok(false),
    }
}

fn require_absolute(path: &ConfigPath) -> Result<()> {
    match path.anchor() {
        Anchor::Document => Ok(()),
        Anchor::File { .. } => Err(ValueError::path(
            path,
            "file-relative path requires document context",
        )),
    }
}

fn require_plain(path: &ConfigPath, operation: &str) -> Result<()> {
    if path.is_pattern() {
        return Err(ValueError::path(
            path,
            format!("search patterns are not allowed in {}", operation),
        ));
    }
    Ok(())
}

impl ValueError {
    fn path_index(path: &ConfigPath, index: usize, len: usize) -> ValueError {
        ValueError::path(
            path,
            format!("sequence index {} out of range (len {})", index, len),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scalar;

    fn sample() -> Value {
        let mut db = indexmap::IndexMap::new();
        db.insert("engine".to_string(), Value::from("innodb"));
        db.insert("port".to_string(), Value::from(3306));

        let hosts = Value::Sequence(vec![Value::from("alpha"), Value::from("beta")]);

        let mut root = indexmap::IndexMap::new();
        root.insert("db".to_string(), Value::Map(db));
        root.insert("hosts".to_string(), hosts);
        Value::Map(root)
    }

    fn p(text: &str) -> ConfigPath {
        ConfigPath::parse(text).unwrap()
    }

    #[test]
    fn test_get_plain_path() {
        let tree = sample();
        let v = get(&tree, &p("db.engine")).unwrap().unwrap();
        assert_eq!(v.as_str(), Some("innodb"));

        let v = get(&tree, &p("hosts[1]")).unwrap().unwrap();
        assert_eq!(v.as_str(), Some("beta"));
    }

    #[test]
    fn test_get_missing_is_none_not_error() {
        let tree = sample();
        assert!(get(&tree, &p("db.missing")).unwrap().is_none());
        assert!(get(&tree, &p("hosts[9]")).unwrap().is_none());
        assert!(get(&tree, &p("nope.deep.down")).unwrap().is_none());
    }

    #[test]
    fn test_get_structural_misuse_is_path_error() {
        let tree = sample();
        let err = get(&tree, &p("db[0]")).unwrap_err();
        assert!(matches!(err, ValueError::Path { .. }), "{err:?}");
        let err = get(&tree, &p("hosts.name")).unwrap_err();
        assert!(matches!(err, ValueError::Path { .. }), "{err:?}");
    }

    #[test]
    fn test_set_get_round_trip() {
        let mut tree = sample();
        set(&mut tree, &p("db.engine"), Value::from("postgres")).unwrap();
        assert_eq!(
            get(&tree, &p("db.engine")).unwrap().unwrap().as_str(),
            Some("postgres")
        );
    }

    #[test]
    fn test_set_creates_intermediate_maps() {
        let mut tree = sample();
        set(&mut tree, &p("a.b.c"), Value::from(1)).unwrap();
        assert_eq!(get(&tree, &p("a.b.c")).unwrap().unwrap().as_int(), Some(1));
        assert!(get(&tree, &p("a.b")).unwrap().unwrap().is_map());
    }

    #[test]
    fn test_set_never_creates_sequences() {
        let mut tree = sample();
        let err = set(&mut tree, &p("a.b[0]"), Value::from(1)).unwrap_err();
        assert!(matches!(err, ValueError::Path { .. }), "{err:?}");
    }

    #[test]
    fn test_set_sequence_append_and_replace() {
        let mut tree = sample();
        let old = set(&mut tree, &p("hosts[0]"), Value::from("gamma")).unwrap();
        assert_eq!(old.unwrap().as_str(), Some("alpha"));

        assert!(set(&mut tree, &p("hosts[2]"), Value::from("delta"))
            .unwrap()
            .is_none());
        assert_eq!(tree.as_map().unwrap()["hosts"].as_sequence().unwrap().len(), 3);

        assert!(set(&mut tree, &p("hosts[9]"), Value::from("x")).is_err());
    }

    #[test]
    fn test_set_rejects_patterns() {
        let mut tree = sample();
        assert!(set(&mut tree, &p("db.*.x"), Value::null()).is_err());
    }

    #[test]
    fn test_delete() {
        let mut tree = sample();
        assert!(delete(&mut tree, &p("db.engine")).unwrap());
        assert!(get(&tree, &p("db.engine")).unwrap().is_none());
        assert!(!delete(&mut tree, &p("db.engine")).unwrap());
        assert!(!delete(&mut tree, &p("no.such.path")).unwrap());

        assert!(delete(&mut tree, &p("hosts[0]")).unwrap());
        assert_eq!(
            get(&tree, &p("hosts[0]")).unwrap().unwrap().as_str(),
            Some("beta")
        );
    }

    #[test]
    fn test_find_any_key() {
        let tree = sample();
        let matches = find(&tree, &p("db.*")).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].as_str(), Some("innodb"));
        assert_eq!(matches[1].as_int(), Some(3306));
    }

    #[test]
    fn test_find_deep_document_order() {
        // {c: {x: {c32: 1}, y: {z: {c32: 2}}}}
        let mut x = indexmap::IndexMap::new();
        x.insert("c32".to_string(), Value::from(1));
        let mut z = indexmap::IndexMap::new();
        z.insert("c32".to_string(), Value::from(2));
        let mut y = indexmap::IndexMap::new();
        y.insert("z".to_string(), Value::Map(z));
        let mut c = indexmap::IndexMap::new();
        c.insert("x".to_string(), Value::Map(x));
        c.insert("y".to_string(), Value::Map(y));
        let mut root = indexmap::IndexMap::new();
        root.insert("c".to_string(), Value::Map(c));
        let tree = Value::Map(root);

        let matches = find(&tree, &p("c.**.c32")).unwrap();
        let values: Vec<i64> = matches.iter().map(|v| v.as_int().unwrap()).collect();
        assert_eq!(values, vec![1, 2]);
    }

    #[test]
    fn test_find_zero_matches_is_empty() {
        let tree = sample();
        assert!(find(&tree, &p("db.**.nothing")).unwrap().is_empty());
        assert!(find(&tree, &p("db.*.x")).unwrap().is_empty());
    }

    #[test]
    fn test_find_any_index() {
        let tree = sample();
        let matches = find(&tree, &p("hosts[*]")).unwrap();
        assert_eq!(matches.len(), 2);
        // [*] never matches map children.
        assert!(find(&tree, &p("db[*]")).unwrap().is_empty());
    }

    #[test]
    fn test_set_root_replaces_document() {
        let mut tree = sample();
        let old = set(&mut tree, &ConfigPath::root(), Value::from(42)).unwrap();
        assert!(old.unwrap().is_map());
        assert_eq!(tree.as_int(), Some(42));
    }

    #[test]
    fn test_scalar_leaf_blocks_set_descent() {
        let mut tree = sample();
        let err = set(&mut tree, &p("db.engine.sub"), Value::from(1)).unwrap_err();
        assert!(matches!(err, ValueError::Path { .. }), "{err:?}");
        // The tree is unchanged.
        assert_eq!(
            get(&tree, &p("db.engine")).unwrap().unwrap().as_str(),
            Some("innodb")
        );
    }

    #[test]
    fn test_raw_scalar_is_opaque() {
        let mut root = indexmap::IndexMap::new();
        root.insert(
            "raw".to_string(),
            Value::Scalar(Scalar::RawStr("{ref:a}".to_string())),
        );
        let tree = Value::Map(root);
        let v = get(&tree, &p("raw")).unwrap().unwrap();
        assert_eq!(v.as_str(), Some("{ref:a}"));
    }
}
