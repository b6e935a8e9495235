//! kube-rs backed [`ResourceClient`].
//!
//! Objects are exchanged as [`DynamicObject`]s so one client serves every
//! kind. The client owns a tokio runtime and blocks on each request; it must
//! not be used from inside another runtime.

use super::executor::{PatchType, ResourceClient, ResourceKey};
use crate::modules::{ModuleError, ModuleResult};
use kube::{
    api::{Api, DeleteParams, DynamicObject, Patch, PatchParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    core::GroupVersionKind,
    discovery::ApiResource,
    Client, Config,
};
use serde_json::Value;
use std::future::Future;
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::debug;

/// Field manager recorded for server-side apply.
pub const FIELD_MANAGER: &str = "sodalite-k8s";

pub struct KubeClient {
    runtime: Runtime,
    client: Client,
    cluster: String,
}

fn failed(action: &str, key: &ResourceKey, error: kube::Error) -> ModuleError {
    ModuleError::ExecutionFailed(format!("Failed to {} {}: {}", action, key, error))
}

impl KubeClient {
    /// Connect using an explicit kubeconfig, or the inferred configuration
    /// (`KUBECONFIG`, `~/.kube/config`, in-cluster) when `kubeconfig` is `None`.
    pub fn connect(kubeconfig: Option<&Path>, context: Option<&str>) -> ModuleResult<Self> {
        let runtime = Runtime::new().map_err(|e| {
            ModuleError::ExecutionFailed(format!("Failed to create runtime: {}", e))
        })?;

        let config = runtime.block_on(async {
            match kubeconfig {
                Some(path) => {
                    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                        ModuleError::ExecutionFailed(format!(
                            "Failed to read kubeconfig {}: {}",
                            path.display(),
                            e
                        ))
                    })?;
                    let options = KubeConfigOptions {
                        context: context.map(str::to_string),
                        cluster: None,
                        user: None,
                    };
                    Config::from_custom_kubeconfig(kubeconfig, &options)
                        .await
                        .map_err(|e| {
                            ModuleError::ExecutionFailed(format!(
                                "Failed to create config from kubeconfig: {}",
                                e
                            ))
                        })
                }
                None => Config::infer().await.map_err(|e| {
                    ModuleError::ExecutionFailed(format!("Failed to infer config: {}", e))
                }),
            }
        })?;

        let cluster = config.cluster_url.to_string();
        // Client construction spawns onto the current runtime.
        let client = {
            let _guard = runtime.enter();
            Client::try_from(config).map_err(|e| {
                ModuleError::ExecutionFailed(format!("Failed to create client: {}", e))
            })?
        };

        debug!(cluster = %cluster, "connected to Kubernetes API");
        Ok(Self {
            runtime,
            client,
            cluster,
        })
    }

    fn api(&self, key: &ResourceKey) -> Api<DynamicObject> {
        let (group, version) = match key.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", key.api_version.as_str()),
        };
        let resource =
            ApiResource::from_gvk(&GroupVersionKind::gvk(group, version, &key.kind));
        match &key.namespace {
            Some(namespace) => Api::namespaced_with(self.client.clone(), namespace, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

fn to_object(body: &Value) -> ModuleResult<DynamicObject> {
    serde_json::from_value(body.clone())
        .map_err(|e| ModuleError::ParseError(format!("Invalid object: {}", e)))
}

fn to_value(object: DynamicObject) -> ModuleResult<Value> {
    serde_json::to_value(object)
        .map_err(|e| ModuleError::ParseError(format!("Invalid object: {}", e)))
}

impl ResourceClient for KubeClient {
    fn identifier(&self) -> String {
        format!("kube({})", self.cluster)
    }

    fn get(&self, key: &ResourceKey) -> ModuleResult<Option<Value>> {
        let api = self.api(key);
        let object = self
            .block_on(api.get_opt(&key.name))
            .map_err(|e| failed("get", key, e))?;
        object.map(to_value).transpose()
    }

    fn create(&self, key: &ResourceKey, body: &Value) -> ModuleResult<Value> {
        let api = self.api(key);
        let object = to_object(body)?;
        let created = self
            .block_on(api.create(&PostParams::default(), &object))
            .map_err(|e| failed("create", key, e))?;
        to_value(created)
    }

    fn replace(&self, key: &ResourceKey, body: &Value) -> ModuleResult<Value> {
        let api = self.api(key);
        let object = to_object(body)?;
        let replaced = self
            .block_on(api.replace(&key.name, &PostParams::default(), &object))
            .map_err(|e| failed("replace", key, e))?;
        to_value(replaced)
    }

    fn patch(
        &self,
        key: &ResourceKey,
        body: &Value,
        patch_type: PatchType,
    ) -> ModuleResult<Value> {
        let (params, patch) = match patch_type {
            PatchType::Merge => (PatchParams::default(), Patch::Merge(body)),
            PatchType::StrategicMerge => (PatchParams::default(), Patch::Strategic(body)),
            PatchType::Apply => (PatchParams::apply(FIELD_MANAGER), Patch::Apply(body)),
            PatchType::Json => {
                return Err(ModuleError::Unsupported(
                    "json patches need an explicit operation list; use merge or strategic-merge"
                        .to_string(),
                ))
            }
        };
        let api = self.api(key);
        let patched = self
            .block_on(api.patch(&key.name, &params, &patch))
            .map_err(|e| failed("patch", key, e))?;
        to_value(patched)
    }

    fn delete(&self, key: &ResourceKey) -> ModuleResult<()> {
        let api = self.api(key);
        match self.block_on(api.delete(&key.name, &DeleteParams::default())) {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(failed("delete", key, e)),
        }
    }
}
