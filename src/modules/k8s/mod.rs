//! Kubernetes resource modules
//!
//! Each module maps a flat, Ansible-style parameter record onto one Kubernetes
//! object kind. Every module follows the same pipeline:
//!
//! ```text
//! params ──► definition() ──► clean_dict() ──► validate() ──► execute_definition()
//!                                              (skipped when state=absent)
//! ```
//!
//! Builders never reject input. All rejection happens in the validators, which
//! inspect the built camelCase definition.
//!
//! ## Available Modules
//!
//! - `k8s_configmap` - ConfigMaps
//! - `k8s_secret` - Secrets
//! - `k8s_namespace` - Namespaces
//! - `k8s_pvc` - PersistentVolumeClaims
//! - `k8s_storage_class` - StorageClasses
//! - `k8s_service` - Services
//! - `k8s_deployment` - Deployments
//! - `k8s_ingress` - Ingresses
//!
//! ## Live clusters
//!
//! Building and validating needs no cluster. Applying goes through a
//! [`executor::ResourceClient`]; the kube-rs implementation requires the
//! `kubernetes` feature:
//!
//! ```toml
//! [dependencies]
//! sodalite-k8s = { version = "0.1", features = ["kubernetes"] }
//! ```

pub mod args;
pub mod common;
pub mod executor;
pub mod helper;
#[cfg(feature = "kubernetes")]
pub mod kube_client;
pub mod marshalling;
pub mod validation;
pub mod validators;

pub mod k8s_configmap;
pub mod k8s_deployment;
pub mod k8s_ingress;
pub mod k8s_namespace;
pub mod k8s_pvc;
pub mod k8s_secret;
pub mod k8s_service;
pub mod k8s_storage_class;

pub use k8s_configmap::K8sConfigMapModule;
pub use k8s_deployment::K8sDeploymentModule;
pub use k8s_ingress::K8sIngressModule;
pub use k8s_namespace::K8sNamespaceModule;
pub use k8s_pvc::K8sPvcModule;
pub use k8s_secret::K8sSecretModule;
pub use k8s_service::K8sServiceModule;
pub use k8s_storage_class::K8sStorageClassModule;

use crate::modules::{Diff, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleResult};
use args::{CommonArgs, State};
use executor::{ResourceClient, ResourceKey};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use validation::Validation;

/// One Kubernetes object kind: its parameter schema, builder and validator.
pub trait Resource {
    const API_VERSION: &'static str;
    const KIND: &'static str;
    /// Cluster-scoped kinds ignore `namespace`.
    const NAMESPACED: bool = true;

    /// Kind-specific options.
    type Params: DeserializeOwned;

    /// Parameter-level rules (required-if, mutually exclusive) checked before building.
    fn check_params(params: &ModuleParams, common: &CommonArgs) -> ModuleResult<()> {
        let _ = (params, common);
        Ok(())
    }

    /// Raw definition before pruning. Must not fail.
    fn definition(common: &CommonArgs, params: &Self::Params) -> Value;

    /// Rules over the pruned definition.
    fn validate(definition: &Value) -> Validation;
}

/// A pruned definition together with the common arguments it was built from
#[derive(Debug, Clone)]
pub struct Rendered {
    pub common: CommonArgs,
    pub definition: Value,
}

impl Rendered {
    /// Where the object lives in the cluster.
    pub fn key<R: Resource>(&self) -> ResourceKey {
        let namespace = R::NAMESPACED.then(|| self.common.namespace.clone());
        ResourceKey::new(R::API_VERSION, R::KIND, namespace, self.common.name.clone())
    }
}

/// Parse the parameters and run the parameter-level checks.
pub fn parse<R: Resource>(params: &ModuleParams) -> ModuleResult<(CommonArgs, R::Params)> {
    let common = CommonArgs::from_params(params)?;
    R::check_params(params, &common)?;
    let typed = args::parse_params::<R::Params>(params)?;
    if !R::NAMESPACED && common.namespace != args::DEFAULT_NAMESPACE {
        warn!(kind = R::KIND, "namespace is ignored for cluster-scoped resources");
    }
    Ok((common, typed))
}

/// Build and prune the definition without validating it.
pub fn build<R: Resource>(params: &ModuleParams) -> ModuleResult<Rendered> {
    let (common, typed) = parse::<R>(params)?;
    let definition = helper::prune(R::definition(&common, &typed));
    debug!(kind = R::KIND, name = %common.name, "built definition");
    Ok(Rendered { common, definition })
}

/// Validate a built definition, failing with every violated rule.
pub fn validate<R: Resource>(definition: &Value) -> ModuleResult<()> {
    R::validate(definition).into_result()
}

/// Build, prune and (unless deleting) validate.
pub fn render<R: Resource>(params: &ModuleParams) -> ModuleResult<Rendered> {
    let rendered = build::<R>(params)?;
    if rendered.common.state != State::Absent {
        validate::<R>(&rendered.definition)?;
    }
    Ok(rendered)
}

fn client(context: &ModuleContext) -> ModuleResult<&dyn ResourceClient> {
    context
        .client
        .as_deref()
        .ok_or_else(|| ModuleError::ExecutionFailed("No Kubernetes client available".to_string()))
}

/// Full module run: render then hand the definition to the execution layer.
pub fn run<R: Resource>(
    params: &ModuleParams,
    context: &ModuleContext,
) -> ModuleResult<ModuleOutput> {
    let rendered = render::<R>(params)?;
    let key = rendered.key::<R>();
    executor::execute_definition(
        client(context)?,
        &key,
        &rendered.definition,
        &rendered.common,
        context,
    )
}

/// Diff between the cluster object (if reachable) and the desired definition.
pub fn diff<R: Resource>(params: &ModuleParams, context: &ModuleContext) -> ModuleResult<Diff> {
    let rendered = render::<R>(params)?;
    let key = rendered.key::<R>();
    let existing = match context.client.as_deref() {
        Some(client) => client.get(&key)?,
        None => None,
    };
    let desired = (rendered.common.state != State::Absent).then_some(&rendered.definition);
    Ok(executor::object_diff(existing.as_ref(), desired))
}
