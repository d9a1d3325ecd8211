//! End-to-end resolution behavior through the public API.

use std::sync::Arc;
use strata_config::{Config, ConfigError, Operator, ResolutionContext, Scalar, Value};
use strata_value::OperatorCall;

fn config(yaml: &str) -> Config {
    Config::from_yaml(yaml).unwrap()
}

#[test]
fn test_get_resolves_references() {
    let mut cfg = config("db:\n  engine: innodb\nurl: 'test-{ref:db.engine}-url'\n");
    assert_eq!(
        cfg.get("url").unwrap().as_str(),
        Some("test-innodb-url")
    );
}

#[test]
fn test_set_get_round_trip() {
    let mut cfg = config("db:\n  port: 3306\n");
    cfg.set("db.port", Value::from(5432)).unwrap();
    assert_eq!(cfg.get("db.port").unwrap().as_int(), Some(5432));

    cfg.set("fresh.key", Value::from("made")).unwrap();
    assert_eq!(cfg.get("fresh.key").unwrap().as_str(), Some("made"));
}

#[test]
fn test_set_value_with_placeholder_behaves_like_loaded() {
    let mut cfg = config("target: 7\n");
    cfg.set("alias", Value::from("{ref:target}")).unwrap();
    assert_eq!(cfg.get("alias").unwrap().as_int(), Some(7));
}

#[test]
fn test_read_only_subtree_rejects_mutation() {
    let mut cfg = config("locked:\n  a: 1\nfree: 2\n");
    cfg.mark_read_only("locked").unwrap();

    let err = cfg.set("locked.a", Value::from(9)).unwrap_err();
    assert!(matches!(err, ConfigError::ReadOnly { .. }), "{err:?}");
    let err = cfg.delete("locked").unwrap_err();
    assert!(matches!(err, ConfigError::ReadOnly { .. }), "{err:?}");

    // Unchanged, and the rest of the tree stays writable.
    assert_eq!(cfg.get("locked.a").unwrap().as_int(), Some(1));
    cfg.set("free", Value::from(3)).unwrap();
}

#[test]
fn test_resolution_is_idempotent() {
    let mut cfg = config("a: '{ref:b}'\nb: plain\nc: 'x-{ref:b}-y'\n");
    let first = cfg.resolve_all().unwrap();
    let second = cfg.resolve_all().unwrap();
    assert_eq!(first, second);
    let map = first.as_map().unwrap();
    assert_eq!(map["c"].as_str(), Some("x-plain-y"));
}

#[test]
fn test_circular_reference_names_the_chain() {
    let mut cfg = config("a: '{ref:b}'\nb: '{ref:a}'\n");
    match cfg.get("a").unwrap_err() {
        ConfigError::CircularReference { chain } => {
            assert!(chain.contains("a -> b -> a"), "{chain}");
        }
        other => panic!("expected circular reference, got {other:?}"),
    }
}

#[test]
fn test_stale_reference_until_refresh() {
    let mut cfg = config("alias: '{ref:target}'\ntarget: 1\n");
    assert_eq!(cfg.get("alias").unwrap().as_int(), Some(1));

    cfg.set("target", Value::from(2)).unwrap();
    // The target itself re-resolves, the dependent keeps its cached value.
    assert_eq!(cfg.get("target").unwrap().as_int(), Some(2));
    assert_eq!(cfg.get("alias").unwrap().as_int(), Some(1));

    cfg.refresh();
    assert_eq!(cfg.get("alias").unwrap().as_int(), Some(2));
}

#[test]
fn test_env_fallback_and_injection_safety() {
    let mut cfg = config(
        "missing: '{env:STRATA_TEST_UNSET_93A1, fallback}'\ninjected: '{env:STRATA_TEST_INJ_93A1}'\na: secret\n",
    );
    assert_eq!(cfg.get("missing").unwrap().as_str(), Some("fallback"));

    unsafe { std::env::set_var("STRATA_TEST_INJ_93A1", "{ref:a}") };
    // The variable's text is final; it is never re-parsed as a placeholder.
    assert_eq!(cfg.get("injected").unwrap().as_str(), Some("{ref:a}"));
}

#[test]
fn test_env_missing_without_default_is_not_found() {
    let mut cfg = config("x: '{env:STRATA_TEST_UNSET_77F2}'\n");
    let err = cfg.get("x").unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "{err:?}");
}

#[test]
fn test_get_or_applies_default() {
    let mut cfg = config("a: 1\n");
    assert_eq!(
        cfg.get_or("nope", Value::from(42)).unwrap().as_int(),
        Some(42)
    );
    assert_eq!(cfg.get_or("a", Value::from(42)).unwrap().as_int(), Some(1));
}

#[test]
fn test_wildcard_get_returns_matches_in_document_order() {
    let mut cfg = config("c:\n  x:\n    c32: 1\n  y:\n    z:\n      c32: 2\n");
    let found = cfg.get("c.**.c32").unwrap();
    let values: Vec<i64> = found
        .as_sequence()
        .unwrap()
        .iter()
        .map(|v| v.as_int().unwrap())
        .collect();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn test_wildcard_matches_resolve_placeholders() {
    let mut cfg = config("svc:\n  a:\n    port: '{ref:base}'\n  b:\n    port: 9\nbase: 8\n");
    let found = cfg.get("svc.*.port").unwrap();
    let values: Vec<i64> = found
        .as_sequence()
        .unwrap()
        .iter()
        .map(|v| v.as_int().unwrap())
        .collect();
    assert_eq!(values, vec![8, 9]);
}

#[test]
fn test_mandatory_marker() {
    let mut cfg = config("must: '???'\n");
    let err = cfg.get("must").unwrap_err();
    assert!(matches!(err, ConfigError::MissingValue { .. }), "{err:?}");

    // Supplying the value clears the condition.
    cfg.set("must", Value::from("now set")).unwrap();
    assert_eq!(cfg.get("must").unwrap().as_str(), Some("now set"));
}

#[test]
fn test_global_operator() {
    let mut cfg = config("who: '{global:user.name, nobody}'\n");
    assert_eq!(cfg.get("who").unwrap().as_str(), Some("nobody"));

    cfg.set_global("user.name", Value::from("alice")).unwrap();
    cfg.refresh();
    assert_eq!(cfg.get("who").unwrap().as_str(), Some("alice"));
}

#[test]
fn test_to_yaml_dumps_resolved_tree() {
    let mut cfg = config("a: '{ref:b}'\nb: 2\n");
    let text = cfg.to_yaml().unwrap();
    assert_eq!(text, "a: 2\nb: 2\n");
}

#[test]
fn test_to_json() {
    let mut cfg = config("a: '{ref:b}'\nb: 2\nc: [x]\n");
    let json = cfg.to_json().unwrap();
    assert_eq!(json["a"], serde_json::json!(2));
    assert_eq!(json["c"], serde_json::json!(["x"]));
}

struct UpperOperator;

impl Operator for UpperOperator {
    fn name(&self) -> &'static str {
        "upper"
    }

    fn resolve(
        &self,
        call: &OperatorCall,
        ctx: &mut ResolutionContext<'_>,
    ) -> strata_config::Result<Value> {
        let text = ctx.argument_text(&call.args[0])?;
        Ok(Value::Scalar(Scalar::Str(text.to_uppercase())))
    }
}

#[test]
fn test_custom_operator_registration() {
    let mut cfg = config("shout: '{upper:{ref:word}}'\nword: quiet\n");
    let err = cfg.get("shout").unwrap_err();
    assert!(matches!(err, ConfigError::UnknownOperator { .. }), "{err:?}");

    cfg.refresh();
    cfg.register_operator(Arc::new(UpperOperator));
    assert_eq!(cfg.get("shout").unwrap().as_str(), Some("QUIET"));
}

#[test]
fn test_two_configs_are_independent() {
    let mut one = config("a: '{global:k, one}'\n");
    let mut two = config("a: '{global:k, two}'\n");
    one.set_global("k", Value::from("first")).unwrap();
    assert_eq!(one.get("a").unwrap().as_str(), Some("first"));
    assert_eq!(two.get("a").unwrap().as_str(), Some("two"));
}

#[test]
fn test_delete_of_sequence_element_shifts_later_reads() {
    let mut cfg = config("hosts:\n  - alpha\n  - beta\n  - gamma\n");
    assert_eq!(cfg.get("hosts[1]").unwrap().as_str(), Some("beta"));

    cfg.delete("hosts[0]").unwrap();
    // The delete shifted the later elements down one index; reads under
    // the old indices must see the shifted tree, not cached values.
    assert_eq!(cfg.get("hosts[0]").unwrap().as_str(), Some("beta"));
    assert_eq!(cfg.get("hosts[1]").unwrap().as_str(), Some("gamma"));
    assert_eq!(cfg.get("hosts").unwrap().as_sequence().unwrap().len(), 2);
}
