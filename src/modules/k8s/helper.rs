//! Definition pruning.

use serde_json::Value;

/// Remove everything from a definition that carries no data.
///
/// Nulls are dropped from maps and lists, and a map or list that ends up empty
/// becomes absent itself so that its parent drops the key in turn. Recursion is
/// depth-first, which lets absence propagate all the way up in a single call.
/// `false`, `0` and `""` are data and are kept.
///
/// Returns `None` when nothing survives.
pub fn clean_dict(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let cleaned: serde_json::Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| clean_dict(v).map(|v| (k, v)))
                .collect();
            (!cleaned.is_empty()).then_some(Value::Object(cleaned))
        }
        Value::Array(items) => {
            let cleaned: Vec<Value> = items.into_iter().filter_map(clean_dict).collect();
            (!cleaned.is_empty()).then_some(Value::Array(cleaned))
        }
        scalar => Some(scalar),
    }
}

/// [`clean_dict`] for a whole definition: an all-empty document becomes `{}`.
pub fn prune(definition: Value) -> Value {
    clean_dict(definition).unwrap_or_else(|| Value::Object(serde_json::Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_keeps_populated_values() {
        let definition = json!({
            "foo": "bar",
            "nested_foo": {"foo": "bar", "foo2": "bar2"},
            "very_nested_foo": {
                "layer_one_foo": {
                    "layer_two_foo": {"foo": "bar"},
                    "layer_two_foo_2": "bar"
                }
            }
        });
        assert_eq!(clean_dict(definition.clone()), Some(definition));
    }

    #[test]
    fn test_removes_nulls_and_empty_containers() {
        let definition = json!({
            "foo_empty1": null,
            "foo_empty2": {"foo": null, "foo2": {"foo": null}},
            "foo": 1,
            "foo2": {"foo_empty": {"foo": null}, "foo": "bar"},
            "list": [null, {"a": null}, []],
        });
        assert_eq!(
            clean_dict(definition),
            Some(json!({"foo": 1, "foo2": {"foo": "bar"}}))
        );
    }

    #[test]
    fn test_falsy_scalars_survive() {
        let definition = json!({"immutable": false, "replicas": 0, "prefix": ""});
        assert_eq!(clean_dict(definition.clone()), Some(definition));
    }

    #[test]
    fn test_list_order_is_preserved() {
        let definition = json!([{"name": "b"}, null, {"name": "a"}]);
        assert_eq!(
            clean_dict(definition),
            Some(json!([{"name": "b"}, {"name": "a"}]))
        );
    }

    #[test]
    fn test_prune_of_nothing() {
        assert_eq!(prune(json!({"a": {"b": null}})), json!({}));
        assert_eq!(clean_dict(Value::Null), None);
    }
}
