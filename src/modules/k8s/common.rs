//! Checks shared by several resource kinds.
//!
//! Both functions take an already built definition (or any object carrying a
//! `metadata` / `spec.selector` block) and never the raw parameters.

use super::validation::Validation;
use super::validators;
use serde_json::Value;

/// Operators allowed in `selector.match_expressions`.
pub const SELECTOR_OPERATORS: [&str; 4] = ["In", "NotIn", "Exists", "DoesNotExist"];

/// `metadata.annotations` and `metadata.labels` must be string maps.
pub fn validate_metadata(object: &Value) -> Validation {
    let mut validation = Validation::new();
    validation.check(
        validators::string_string_dict(object.pointer("/metadata/annotations")),
        "annotations",
        "Annotations should be map[string]string",
    );
    validation.check(
        validators::string_string_dict(object.pointer("/metadata/labels")),
        "labels",
        "Labels should be map[string]string",
    );
    validation
}

/// Data keys (ConfigMap, Secret) must be `alnum_ext`.
pub fn validate_keys(map: Option<&Value>, field: &str) -> Validation {
    let mut validation = Validation::new();
    let keys_valid = map
        .and_then(Value::as_object)
        .map_or(true, |m| m.keys().all(|k| validators::alnum_ext(k)));
    validation.check(
        keys_valid,
        field,
        format!(
            "Keys in {} must consist of alphanumeric characters, '-', '_' or '.'",
            field
        ),
    );
    validation
}

/// `spec.selector`: operator choices, values cardinality and label map shape.
pub fn validate_selector(object: &Value) -> Validation {
    let mut validation = Validation::new();
    let Some(selector) = object.pointer("/spec/selector") else {
        return validation;
    };

    let expressions = selector
        .get("matchExpressions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for (i, expression) in expressions.iter().enumerate() {
        let field = format!("selector.match_expressions[{}]", i);
        let operator = expression.get("operator").and_then(Value::as_str);
        if !operator.is_some_and(|op| SELECTOR_OPERATORS.contains(&op)) {
            validation.error(
                format!("{}.operator", field),
                format!(
                    "Every selector.match_expressions.operator should be chosen from {}",
                    SELECTOR_OPERATORS.join(", ")
                ),
            );
        }
        let needs_values = matches!(operator, Some("In") | Some("NotIn"));
        let has_values = expression
            .get("values")
            .and_then(Value::as_array)
            .is_some_and(|values| !values.is_empty());
        validation.check(
            needs_values == has_values,
            format!("{}.values", field),
            "If in any selector.match_expressions operator is 'In' or 'NotIn', the values array \
             must be non-empty. If operator is 'Exists' or 'DoesNotExist', the values array must \
             be empty.",
        );
    }

    validation.check(
        validators::string_string_dict(selector.get("matchLabels")),
        "selector.match_labels",
        "Selector.match_labels should be map[string]string",
    );
    validation
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn messages(validation: &Validation) -> String {
        validation
            .errors()
            .iter()
            .map(|e| e.message.to_lowercase())
            .collect::<Vec<_>>()
            .join("; ")
    }

    #[test]
    fn test_metadata_success() {
        let definition = json!({
            "metadata": {
                "annotations": {"foo": "bar", "foo2": "bar2"},
                "labels": {"foo": "bar", "foo2": "bar2"}
            }
        });
        assert!(validate_metadata(&definition).is_valid());
    }

    #[test]
    fn test_metadata_bad_annotations() {
        let definition = json!({
            "metadata": {
                "annotations": {"foo": 1, "foo2": "bar2"},
                "labels": {"foo": "bar"}
            }
        });
        let validation = validate_metadata(&definition);
        assert_eq!(validation.errors().len(), 1);
        assert!(messages(&validation).contains("annotations"));
    }

    #[test]
    fn test_metadata_bad_labels() {
        let definition = json!({"metadata": {"labels": {"foo": 1}}});
        let validation = validate_metadata(&definition);
        assert_eq!(validation.errors().len(), 1);
        assert!(messages(&validation).contains("labels"));
    }

    #[test]
    fn test_validate_keys() {
        assert!(validate_keys(None, "data").is_valid());
        assert!(validate_keys(Some(&json!({"a.b-c_d": "x"})), "data").is_valid());
        let validation = validate_keys(Some(&json!({"invalid&key": "x"})), "string_data");
        assert!(messages(&validation).contains("keys in string_data"));
    }

    #[test]
    fn test_selector_absent() {
        assert!(validate_selector(&json!({"spec": {}})).is_valid());
        assert!(validate_selector(&json!({"metadata": {}})).is_valid());
    }

    #[test]
    fn test_selector_operator_and_values() {
        let definition = json!({
            "spec": {
                "selector": {
                    "matchExpressions": [
                        {"key": "a", "operator": "In", "values": ["x"]},
                        {"key": "b", "operator": "Exists"},
                        {"key": "c", "operator": "Equals", "values": ["x"]},
                        {"key": "d", "operator": "NotIn", "values": []},
                        {"key": "e", "operator": "DoesNotExist", "values": ["x"]}
                    ]
                }
            }
        });
        let validation = validate_selector(&definition);
        let fields: Vec<&str> = validation.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "selector.match_expressions[2].operator",
                "selector.match_expressions[2].values",
                "selector.match_expressions[3].values",
                "selector.match_expressions[4].values",
            ]
        );
    }

    #[test]
    fn test_selector_match_labels() {
        let definition = json!({"spec": {"selector": {"matchLabels": {"app": 3}}}});
        assert!(messages(&validate_selector(&definition)).contains("match_labels"));
    }
}
