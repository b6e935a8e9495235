//! Kubernetes Namespace module - Namespace management
//!
//! Namespaces are cluster scoped; the `namespace` parameter is ignored.
//!
//! ## Parameters
//!
//! - `name`: Namespace name (required)
//! - `state`: Desired state (present, absent, patched) (default: "present")
//! - `labels`: Labels to apply to the namespace
//! - `annotations`: Annotations to apply to the namespace
//!
//! ## Example
//!
//! ```yaml
//! - name: Create namespace
//!   k8s_namespace:
//!     name: my-namespace
//!     labels:
//!       env: production
//! ```

use super::args::CommonArgs;
use super::validation::Validation;
use super::{common, validators, Resource};
use crate::modules::{Diff, Module, ModuleContext, ModuleOutput, ModuleParams, ModuleResult};
use serde::Deserialize;
use serde_json::{json, Value};

/// Namespaces carry nothing beyond the common arguments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamespaceParams {}

pub struct K8sNamespaceModule;

impl Resource for K8sNamespaceModule {
    const API_VERSION: &'static str = "v1";
    const KIND: &'static str = "Namespace";
    const NAMESPACED: bool = false;

    type Params = NamespaceParams;

    fn definition(common: &CommonArgs, _params: &NamespaceParams) -> Value {
        json!({
            "apiVersion": Self::API_VERSION,
            "kind": Self::KIND,
            "metadata": common.metadata(),
        })
    }

    fn validate(definition: &Value) -> Validation {
        let mut validation = common::validate_metadata(definition);
        validation.check(
            validators::dns_subdomain(definition.pointer("/metadata/name").and_then(Value::as_str)),
            "name",
            format!("'name' {}", validators::DNS_SUBDOMAIN_MSG),
        );
        validation
    }
}

impl Module for K8sNamespaceModule {
    fn name(&self) -> &'static str {
        "k8s_namespace"
    }

    fn description(&self) -> &'static str {
        "Manage Kubernetes Namespaces"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name"]
    }

    fn validate_params(&self, params: &ModuleParams) -> ModuleResult<()> {
        super::parse::<Self>(params).map(|_| ())
    }

    fn execute(
        &self,
        params: &ModuleParams,
        context: &ModuleContext,
    ) -> ModuleResult<ModuleOutput> {
        super::run::<Self>(params, context)
    }

    fn diff(&self, params: &ModuleParams, context: &ModuleContext) -> ModuleResult<Option<Diff>> {
        super::diff::<Self>(params, context).map(Some)
    }

    fn render(&self, params: &ModuleParams) -> ModuleResult<Value> {
        super::render::<Self>(params).map(|r| r.definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn params(value: Value) -> ModuleParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_full_definition() {
        let definition = K8sNamespaceModule
            .render(&params(json!({
                "name": "foo",
                "namespace": "ignored",
                "labels": {"foo": "bar", "foo2": "bar2"},
                "annotations": {"foo": "bar", "foo2": "bar2"}
            })))
            .unwrap();
        assert_eq!(
            definition,
            json!({
                "apiVersion": "v1",
                "kind": "Namespace",
                "metadata": {
                    "name": "foo",
                    "labels": {"foo": "bar", "foo2": "bar2"},
                    "annotations": {"foo": "bar", "foo2": "bar2"}
                }
            })
        );
    }

    #[test]
    fn test_invalid_name() {
        let err = K8sNamespaceModule
            .render(&params(json!({"name": "_foo_bar"})))
            .unwrap_err();
        assert!(err
            .to_string()
            .to_lowercase()
            .contains("lowercase dns-1123 subdomain"));
    }

    #[test]
    fn test_invalid_metadata() {
        let definition = json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": {"name": "foo", "labels": {"foo": 1}}
        });
        let validation = K8sNamespaceModule::validate(&definition);
        assert_eq!(validation.errors().len(), 1);
        assert!(validation.errors()[0].message.contains("map[string]string"));
    }
}
