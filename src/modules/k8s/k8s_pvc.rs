//! Kubernetes PersistentVolumeClaim module
//!
//! A PersistentVolumeClaim is a request for storage by a user.
//!
//! ## Parameters
//!
//! - `name`: Claim name (required)
//! - `namespace`: Kubernetes namespace (default: "default")
//! - `state`: Desired state (present, absent, patched) (default: "present")
//! - `access_modes`: Desired access modes (required when state is present)
//! - `selector`: Label query over volumes (`match_labels`, `match_expressions`)
//! - `storage_request`: Minimum amount of storage, e.g. `4Gi` (required when state is present)
//! - `storage_limit`: Maximum amount of storage
//! - `volume_name`: Binding reference to the PersistentVolume backing this claim
//! - `storage_class_name`: Name of the StorageClass required by the claim
//! - `volume_mode`: Filesystem or Block (default: "Filesystem")
//!
//! ## Example
//!
//! ```yaml
//! - name: Claim storage for the database
//!   k8s_pvc:
//!     name: postgres-data
//!     access_modes:
//!       - ReadWriteOnce
//!     storage_request: 4Gi
//!     selector:
//!       match_labels:
//!         release: stable
//! ```

use super::args::{self, de, CommonArgs, SelectorParams, State};
use super::validation::Validation;
use super::{common, validators, Resource};
use crate::modules::{Diff, Module, ModuleContext, ModuleOutput, ModuleParams, ModuleResult};
use serde::Deserialize;
use serde_json::{json, Value};

pub const ACCESS_MODES: [&str; 3] = ["ReadWriteOnce", "ReadOnlyMany", "ReadWriteMany"];
pub const VOLUME_MODES: [&str; 2] = ["Filesystem", "Block"];

fn default_volume_mode() -> String {
    "Filesystem".to_string()
}

/// PersistentVolumeClaim-specific options
#[derive(Debug, Clone, Deserialize)]
pub struct PvcParams {
    #[serde(default, deserialize_with = "de::opt_string_list")]
    pub access_modes: Option<Vec<String>>,
    #[serde(default)]
    pub selector: Option<SelectorParams>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub storage_request: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub storage_limit: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub volume_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub storage_class_name: Option<String>,
    #[serde(default = "default_volume_mode")]
    pub volume_mode: String,
}

pub struct K8sPvcModule;

impl Resource for K8sPvcModule {
    const API_VERSION: &'static str = "v1";
    const KIND: &'static str = "PersistentVolumeClaim";

    type Params = PvcParams;

    fn check_params(params: &ModuleParams, common: &CommonArgs) -> ModuleResult<()> {
        args::required_if(
            params,
            common,
            State::Present,
            &["access_modes", "storage_request"],
        )?;
        args::choice(params, "volume_mode", &VOLUME_MODES)
    }

    fn definition(common: &CommonArgs, params: &PvcParams) -> Value {
        json!({
            "apiVersion": Self::API_VERSION,
            "kind": Self::KIND,
            "metadata": common.metadata(),
            "spec": {
                "accessModes": params.access_modes,
                "selector": SelectorParams::to_definition(params.selector.as_ref()),
                "resources": {
                    "requests": {"storage": params.storage_request},
                    "limits": {"storage": params.storage_limit},
                },
                "volumeName": params.volume_name,
                "storageClassName": params.storage_class_name,
                "volumeMode": params.volume_mode,
            }
        })
    }

    fn validate(definition: &Value) -> Validation {
        let mut validation = common::validate_metadata(definition);

        validation.check(
            validators::dns_subdomain(definition.pointer("/metadata/name").and_then(Value::as_str)),
            "name",
            format!("'name' {}", validators::DNS_SUBDOMAIN_MSG),
        );

        let access_modes = definition
            .pointer("/spec/accessModes")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        validation.check(
            !access_modes.is_empty(),
            "access_modes",
            "Access_modes should have at least 1 element",
        );
        validation.check(
            access_modes
                .iter()
                .all(|mode| mode.as_str().is_some_and(|m| ACCESS_MODES.contains(&m))),
            "access_modes",
            "Elements of access_modes should be chosen from \
             ('ReadWriteOnce', 'ReadOnlyMany', 'ReadWriteMany')",
        );

        validation.merge(common::validate_selector(definition));

        validation.check(
            validators::string_quantity_dict(definition.pointer("/spec/resources/limits")),
            "storage_limit",
            "Storage_limit should be map[string]Quantity",
        );
        validation.check(
            validators::string_quantity_dict(definition.pointer("/spec/resources/requests")),
            "storage_request",
            "Storage_request should be map[string]Quantity",
        );
        validation
    }
}

impl Module for K8sPvcModule {
    fn name(&self) -> &'static str {
        "k8s_pvc"
    }

    fn description(&self) -> &'static str {
        "Manage Kubernetes PersistentVolumeClaims"
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
