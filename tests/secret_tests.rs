//! Secret rendering and validation from YAML parameter records.

mod common;

use common::{messages, render};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_secret() {
    let definition = render(
        "k8s_secret",
        r#"
name: registry-secret
type: kubernetes.io/dockerconfigjson
data:
  .dockerconfigjson: eyJhdXRocyI6e319
string_data:
  db_ip: postgres-service
"#,
    )
    .unwrap();
    assert_eq!(definition["type"], json!("kubernetes.io/dockerconfigjson"));
    assert_eq!(definition["stringData"], json!({"db_ip": "postgres-service"}));
    assert_eq!(definition["data"], json!({".dockerconfigjson": "eyJhdXRocyI6e319"}));

    let errors = messages(
        "k8s_secret",
        r#"
name: Bad_Name
data:
  password: not-base64
"#,
    );
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("'name' should be a lowercase DNS-1123 subdomain"));
    assert_eq!(errors[1], "data should be map[string][]byte");
}

#[test]
fn test_secret_defaults() {
    let definition = render("k8s_secret", "name: token\n").unwrap();
    assert_eq!(
        definition,
        json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {"name": "token"},
            "immutable": false,
            "type": "Opaque"
        })
    );
}

#[test]
fn test_secret_string_data_must_be_strings() {
    let errors = messages("k8s_secret", "name: token\nstring_data:\n  port: 5432\n");
    assert_eq!(errors, vec!["string_data should be map[string]string"]);
}
