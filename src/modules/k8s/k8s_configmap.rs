//! Kubernetes ConfigMap module - ConfigMap resource management
//!
//! ConfigMaps allow you to decouple configuration artifacts from image content
//! to keep containerized applications portable.
//!
//! ## Parameters
//!
//! - `name`: ConfigMap name (required)
//! - `namespace`: Kubernetes namespace (default: "default")
//! - `state`: Desired state (present, absent, patched) (default: "present")
//! - `labels`: Labels to apply to the ConfigMap
//! - `annotations`: Annotations to apply to the ConfigMap
//! - `data`: Key-value pairs for the ConfigMap data
//! - `binary_data`: Binary data as base64-encoded strings
//! - `immutable`: If true, the ConfigMap cannot be updated after creation (default: false)
//!
//! ## Example
//!
//! ```yaml
//! - name: Create application config
//!   k8s_configmap:
//!     name: app-config
//!     data:
//!       log.level: INFO
//!     binary_data:
//!       keystore: eWVrX2Vtb3M=
//!     labels:
//!       app: myapp
//! ```

use super::args::CommonArgs;
use super::validation::Validation;
use super::{common, validators, Resource};
use crate::modules::{
    Diff, Module, ModuleContext, ModuleOutput, ModuleParams, ModuleResult,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// ConfigMap-specific options
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigMapParams {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub binary_data: Option<Value>,
    #[serde(default)]
    pub immutable: bool,
}

pub struct K8sConfigMapModule;

impl Resource for K8sConfigMapModule {
    const API_VERSION: &'static str = "v1";
    const KIND: &'static str = "ConfigMap";

    type Params = ConfigMapParams;

    fn definition(common: &CommonArgs, params: &ConfigMapParams) -> Value {
        json!({
            "apiVersion": Self::API_VERSION,
            "kind": Self::KIND,
            "metadata": common.metadata(),
            "immutable": params.immutable,
            "data": params.data,
            "binaryData": params.binary_data,
        })
    }

    fn validate(definition: &Value) -> Validation {
        let mut validation = common::validate_metadata(definition);

        validation.check(
            validators::dns_subdomain(definition.pointer("/metadata/name").and_then(Value::as_str)),
            "name",
            format!("'name' {}", validators::DNS_SUBDOMAIN_MSG),
        );

        let data = definition.get("data");
        let binary_data = definition.get("binaryData");
        validation.merge(common::validate_keys(data, "data"));
        validation.merge(common::validate_keys(binary_data, "binary_data"));

        validation.check(
            validators::string_string_dict(data),
            "data",
            "data should be map[string]string",
        );
        validation.check(
            validators::string_byte_dict(binary_data),
            "binary_data",
            "binary_data should be map[string][]byte",
        );

        if let (Some(Value::Object(data)), Some(Value::Object(binary_data))) = (data, binary_data) {
            let mut overlap: Vec<&str> = data
                .keys()
                .filter(|k| binary_data.contains_key(*k))
                .map(String::as_str)
                .collect();
            overlap.sort_unstable();
            validation.check(
                overlap.is_empty(),
                "data",
                format!(
                    "Keys in data and binary_data should not overlap, found: {}",
                    overlap.join(", ")
                ),
            );
        }

        validation
    }
}

impl Module for K8sConfigMapModule {
    fn name(&self) -> &'static str {
        "k8s_configmap"
    }

    fn description(&self) -> &'static str {
        "Manage Kubernetes ConfigMaps"
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
