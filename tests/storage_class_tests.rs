//! StorageClass rendering and validation from YAML parameter records.

mod common;

use common::{messages, render};
use pretty_assertions::assert_eq;
use serde_json::json;
use sodalite_k8s::prelude::*;

#[test]
fn test_storage_class() {
    let definition = render(
        "k8s_storage_class",
        r#"
name: local-storage
provisioner: k8s.io/minikube-hostpath
reclaim_policy: Retain
mount_options: debug
allowed_topologies:
  - key: failure-domain.beta.kubernetes.io/zone
    values: [us-central1-a, us-central1-b]
"#,
    )
    .unwrap();
    assert_eq!(
        definition,
        json!({
            "apiVersion": "storage.k8s.io/v1",
            "kind": "StorageClass",
            "metadata": {"name": "local-storage"},
            "provisioner": "k8s.io/minikube-hostpath",
            "allowedTopologies": [{"matchLabelExpressions": [{
                "key": "failure-domain.beta.kubernetes.io/zone",
                "values": ["us-central1-a", "us-central1-b"]
            }]}],
            "mountOptions": ["debug"],
            "reclaimPolicy": "Retain",
            "volumeBindingMode": "Immediate"
        })
    );

    let err = render("k8s_storage_class", "name: local-storage\n").unwrap_err();
    assert!(matches!(err, ModuleError::MissingParameter(ref p) if p == "provisioner"));
}

#[test]
fn test_storage_class_choices() {
    let err = render(
        "k8s_storage_class",
        "name: fast\nprovisioner: kubernetes.io/gce-pd\nreclaim_policy: Keep\n",
    )
    .unwrap_err();
    assert!(matches!(err, ModuleError::InvalidParameter(_)));
    assert_eq!(
        err.to_string(),
        "Invalid parameter: value of reclaim_policy must be one of: Retain, Delete, Recycle, got: Keep"
    );
}

#[test]
fn test_storage_class_parameters_must_be_strings() {
    let errors = messages(
        "k8s_storage_class",
        "name: fast\nprovisioner: kubernetes.io/gce-pd\nparameters:\n  replication: 3\n",
    );
    assert_eq!(errors, vec!["parameters should be map[string]string"]);
}
