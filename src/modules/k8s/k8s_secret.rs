//! Kubernetes Secret module - Secret resource management
//!
//! Secrets hold sensitive data such as passwords, tokens or keys. Values in
//! `data` are base64 encoded; `string_data` takes plain strings that the API
//! server merges into `data` on write.
//!
//! ## Parameters
//!
//! - `name`: Secret name (required)
//! - `namespace`: Kubernetes namespace (default: "default")
//! - `state`: Desired state (present, absent, patched) (default: "present")
//! - `type`: Secret type (default: "Opaque")
//! - `data`: Key-value pairs with base64-encoded values
//! - `string_data`: Key-value pairs with plain string values
//! - `labels`: Labels to apply to the Secret
//! - `annotations`: Annotations to apply to the Secret
//! - `immutable`: If true, the Secret cannot be updated after creation (default: false)
//!
//! ## Example
//!
//! ```yaml
//! - name: Create database credentials
//!   k8s_secret:
//!     name: db-credentials
//!     string_data:
//!       db_ip: postgres-service
//!     data:
//!       password: cGFzc3dvcmQ=
//!
//! - name: Create docker registry secret
//!   k8s_secret:
//!     name: registry-secret
//!     type: kubernetes.io/dockerconfigjson
//!     data:
//!       .dockerconfigjson: eyJhdXRocyI6e319
//! ```

use super::args::{de, CommonArgs};
use super::validation::Validation;
use super::{common, validators, Resource};
use crate::modules::{Diff, Module, ModuleContext, ModuleOutput, ModuleParams, ModuleResult};
use serde::Deserialize;
use serde_json::{json, Value};

/// Secret type used when none is given
pub const DEFAULT_SECRET_TYPE: &str = "Opaque";

/// Secret-specific options
#[derive(Debug, Clone, Deserialize)]
pub struct SecretParams {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub string_data: Option<Value>,
    #[serde(rename = "type", default, deserialize_with = "de::opt_string")]
    pub secret_type: Option<String>,
    #[serde(default)]
    pub immutable: bool,
}

impl SecretParams {
    fn secret_type(&self) -> &str {
        self.secret_type.as_deref().unwrap_or(DEFAULT_SECRET_TYPE)
    }
}

pub struct K8sSecretModule;

impl Resource for K8sSecretModule {
    const API_VERSION: &'static str = "v1";
    const KIND: &'static str = "Secret";

    type Params = SecretParams;

    fn definition(common: &CommonArgs, params: &SecretParams) -> Value {
        json!({
            "apiVersion": Self::API_VERSION,
            "kind": Self::KIND,
            "metadata": common.metadata(),
            "immutable": params.immutable,
            "type": params.secret_type(),
            "stringData": params.string_data,
            "data": params.data,
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
        let string_data = definition.get("stringData");
        validation.merge(common::validate_keys(data, "data"));
        validation.merge(common::validate_keys(string_data, "string_data"));

        validation.check(
            validators::string_byte_dict(data),
            "data",
            "data should be map[string][]byte",
        );
        validation.check(
            validators::string_string_dict(string_data),
            "string_data",
            "string_data should be map[string]string",
        );
        validation
    }
}

impl Module for K8sSecretModule {
    fn name(&self) -> &'static str {
        "k8s_secret"
    }

    fn description(&self) -> &'static str {
        "Manage Kubernetes Secrets"
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
