//! ConfigMap rendering and validation from YAML parameter records.

mod common;

use common::{messages, render};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_configmap() {
    let definition = render(
        "k8s_configmap",
        r#"
name: app-config
namespace: web
labels:
  app: web
data:
  log.level: INFO
binary_data:
  keystore: eWVrX2Vtb3M=
"#,
    )
    .unwrap();
    assert_eq!(
        definition,
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "app-config", "labels": {"app": "web"}},
            "immutable": false,
            "data": {"log.level": "INFO"},
            "binaryData": {"keystore": "eWVrX2Vtb3M="}
        })
    );
}

#[test]
fn test_configmap_overlapping_keys() {
    let errors = messages(
        "k8s_configmap",
        r#"
name: app-config
data:
  b: x
  a: y
binary_data:
  a: eWVrX2Vtb3M=
  b: eWVrX2Vtb3M=
"#,
    );
    assert_eq!(
        errors,
        vec!["Keys in data and binary_data should not overlap, found: a, b"]
    );
}

#[test]
fn test_configmap_minimal_keeps_immutable_false() {
    let definition = render("k8s_configmap", "name: foo\nimmutable: false\n").unwrap();
    assert_eq!(
        definition,
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "foo"},
            "immutable": false
        })
    );
}

#[test]
fn test_configmap_shape_errors() {
    let errors = messages(
        "k8s_configmap",
        r#"
name: app-config
labels:
  replicas: 3
data:
  "bad key": x
  count: 1
"#,
    );
    assert_eq!(
        errors,
        vec![
            "Labels should be map[string]string",
            "Keys in data must consist of alphanumeric characters, '-', '_' or '.'",
            "data should be map[string]string",
        ]
    );
}
