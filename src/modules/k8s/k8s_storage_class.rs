//! Kubernetes StorageClass module
//!
//! StorageClasses describe the classes of storage a cluster offers. They are
//! cluster scoped; the `namespace` parameter is ignored.
//!
//! ## Parameters
//!
//! - `name`: StorageClass name (required)
//! - `provisioner`: Volume plugin used for provisioning (required)
//! - `allow_volume_expansion`: Whether claims may be expanded
//! - `allowed_topologies`: List of `{key, values}` label requirements restricting where volumes are provisioned
//! - `mount_options`: Mount options for dynamically provisioned volumes
//! - `parameters`: Provisioner-specific parameters
//! - `reclaim_policy`: Retain, Delete or Recycle (default: "Delete")
//! - `volume_binding_mode`: Immediate or WaitForFirstConsumer (default: "Immediate")
//!
//! ## Example
//!
//! ```yaml
//! - name: Create local storage class
//!   k8s_storage_class:
//!     name: local-storage
//!     provisioner: k8s.io/minikube-hostpath
//!     reclaim_policy: Retain
//!     allowed_topologies:
//!       - key: failure-domain.beta.kubernetes.io/zone
//!         values: [us-central1-a, us-central1-b]
//! ```

use super::args::{self, de, CommonArgs};
use super::validation::Validation;
use super::{common, validators, Resource};
use crate::modules::{
    Diff, Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleResult,
};
use serde::Deserialize;
use serde_json::{json, Value};

pub const RECLAIM_POLICIES: [&str; 3] = ["Retain", "Delete", "Recycle"];
pub const VOLUME_BINDING_MODES: [&str; 2] = ["Immediate", "WaitForFirstConsumer"];

fn default_reclaim_policy() -> String {
    "Delete".to_string()
}

fn default_volume_binding_mode() -> String {
    "Immediate".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopologyParams {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string_list")]
    pub values: Option<Vec<String>>,
}

/// StorageClass-specific options
#[derive(Debug, Clone, Deserialize)]
pub struct StorageClassParams {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub provisioner: Option<String>,
    #[serde(default)]
    pub allow_volume_expansion: Option<bool>,
    #[serde(default)]
    pub allowed_topologies: Option<Vec<TopologyParams>>,
    #[serde(default, deserialize_with = "de::opt_string_list")]
    pub mount_options: Option<Vec<String>>,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default = "default_reclaim_policy")]
    pub reclaim_policy: String,
    #[serde(default = "default_volume_binding_mode")]
    pub volume_binding_mode: String,
}

pub struct K8sStorageClassModule;

impl Resource for K8sStorageClassModule {
    const API_VERSION: &'static str = "storage.k8s.io/v1";
    const KIND: &'static str = "StorageClass";
    const NAMESPACED: bool = false;

    type Params = StorageClassParams;

    fn check_params(params: &ModuleParams, _common: &CommonArgs) -> ModuleResult<()> {
        if params.get("provisioner").map_or(true, Value::is_null) {
            return Err(ModuleError::MissingParameter("provisioner".to_string()));
        }
        args::choice(params, "reclaim_policy", &RECLAIM_POLICIES)?;
        args::choice(params, "volume_binding_mode", &VOLUME_BINDING_MODES)
    }

    fn definition(common: &CommonArgs, params: &StorageClassParams) -> Value {
        let topologies = params.allowed_topologies.as_ref().map(|topologies| {
            topologies
                .iter()
                .map(|t| json!({"key": t.key, "values": t.values}))
                .collect::<Vec<_>>()
        });
        json!({
            "apiVersion": Self::API_VERSION,
            "kind": Self::KIND,
            "metadata": common.metadata(),
            "provisioner": params.provisioner,
            "allowVolumeExpansion": params.allow_volume_expansion,
            "allowedTopologies": [{"matchLabelExpressions": topologies}],
            "mountOptions": params.mount_options,
            "parameters": params.parameters,
            "reclaimPolicy": params.reclaim_policy,
            "volumeBindingMode": params.volume_binding_mode,
        })
    }

    fn validate(definition: &Value) -> Validation {
        let mut validation = common::validate_metadata(definition);
        validation.check(
            validators::dns_subdomain(definition.pointer("/metadata/name").and_then(Value::as_str)),
            "name",
            format!("'name' {}", validators::DNS_SUBDOMAIN_MSG),
        );
        validation.check(
            validators::string_string_dict(definition.get("parameters")),
            "parameters",
            "parameters should be map[string]string",
        );
        validation
    }
}

impl Module for K8sStorageClassModule {
    fn name(&self) -> &'static str {
        "k8s_storage_class"
    }

    fn description(&self) -> &'static str {
        "Manage Kubernetes StorageClasses"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name", "provisioner"]
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
