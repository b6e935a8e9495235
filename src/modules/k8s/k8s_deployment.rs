//! Kubernetes Deployment module - Deployment management
//!
//! A Deployment provides declarative updates for pods. The pod template is
//! built from the flat container, volume and image pull secret options; the
//! template metadata mirrors the deployment's `name`, `labels` and
//! `annotations` unless the `template_*` options override them.
//!
//! ## Parameters
//!
//! - `name`: Deployment name (required)
//! - `namespace`: Kubernetes namespace (default: "default")
//! - `state`: Desired state (present, absent, patched) (default: "present")
//! - `labels`: Labels of the deployment and its pods (required when state is present)
//! - `selector`: Label selector for pods (`match_labels`, `match_expressions`) (required)
//! - `template_name`, `template_labels`, `template_annotations`: Pod template
//!   metadata, each defaulting to the deployment's own
//! - `containers`: Container specs (required), each with `name`, `image`,
//!   `image_pull_policy`, `command`, `args`, `working_dir`, `ports`, `env`,
//!   `env_from`, `volume_mounts`, `volume_devices`, `resource_limits` and
//!   `resource_requests`
//! - `image_pull_secrets`: Names of secrets used to pull images
//! - `enable_service_links`: Inject service environment variables (default: true)
//! - `volumes`: Pod volumes, each with `name` and one of `pvc`, `config_map` or `secret`
//! - `replicas`: Number of desired pods (default: 1)
//! - `min_ready_seconds`: (default: 0)
//! - `strategy`: `type` (Recreate or RollingUpdate, default RollingUpdate), `max_surge`, `max_unavailable`
//! - `revision_history_limit`: (default: 10)
//! - `progress_deadline_seconds`: (default: 600)
//! - `paused`: (default: false)
//!
//! ## Example
//!
//! ```yaml
//! - name: Deploy nginx
//!   k8s_deployment:
//!     name: nginx
//!     labels:
//!       app: nginx
//!     selector:
//!       match_labels:
//!         app: nginx
//!     replicas: 3
//!     containers:
//!       - name: nginx
//!         image: nginx:1.25
//!         ports:
//!           - name: http
//!             container_port: 80
//!         env:
//!           - name: DB_HOST
//!             config_map:
//!               name: db-config
//!               key: host
//! ```

use super::args::{self, de, CommonArgs, Protocol, SelectorParams, State};
use super::marshalling::IntOrString;
use super::validation::Validation;
use super::{common, validators, Resource};
use crate::modules::{
    Diff, Module, ModuleContext, ModuleError, ModuleOutput, ModuleParams, ModuleResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

/// `defaultMode` of config map and secret volumes (0644).
pub const DEFAULT_VOLUME_MODE: i64 = 0o644;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImagePullPolicy {
    Always,
    Never,
    IfNotPresent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MountPropagation {
    #[default]
    None,
    HostToContainer,
    Bidirectional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrategyType {
    Recreate,
    #[default]
    RollingUpdate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerPortParams {
    #[serde(deserialize_with = "de::opt_i64")]
    pub container_port: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub host_ip: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub host_port: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub protocol: Protocol,
}

/// Selects one key of a config map or secret
#[derive(Debug, Clone, Deserialize)]
pub struct KeySelectorParams {
    #[serde(deserialize_with = "de::opt_string")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub optional: Option<bool>,
}

impl KeySelectorParams {
    fn to_definition(&self) -> Value {
        json!({"name": self.name, "key": self.key, "optional": self.optional})
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvVarParams {
    #[serde(deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub value: Option<String>,
    #[serde(default)]
    pub config_map: Option<KeySelectorParams>,
    #[serde(default)]
    pub secret: Option<KeySelectorParams>,
}

/// Whole config map or secret reference used by `env_from`
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRefParams {
    #[serde(deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub optional: Option<bool>,
}

impl SourceRefParams {
    fn to_definition(&self) -> Value {
        json!({"name": self.name, "optional": self.optional})
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvFromParams {
    #[serde(default)]
    pub config_map: Option<SourceRefParams>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub prefix: Option<String>,
    #[serde(default)]
    pub secret: Option<SourceRefParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeMountParams {
    #[serde(deserialize_with = "de::opt_string")]
    pub path: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub propagation: MountPropagation,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub sub_path: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub sub_path_expr: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeDeviceParams {
    #[serde(deserialize_with = "de::opt_string")]
    pub path: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub name: Option<String>,
}

/// `cpu` and `memory` quantities
#[derive(Debug, Clone, Deserialize)]
pub struct ComputeResourceParams {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub cpu: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub memory: Option<String>,
}

impl ComputeResourceParams {
    fn to_definition(resources: Option<&Self>) -> Value {
        resources.map_or(Value::Null, |r| json!({"cpu": r.cpu, "memory": r.memory}))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerParams {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub image: Option<String>,
    #[serde(default)]
    pub image_pull_policy: Option<ImagePullPolicy>,
    #[serde(default, deserialize_with = "de::opt_string_list")]
    pub command: Option<Vec<String>>,
    #[serde(default, deserialize_with = "de::opt_string_list")]
    pub args: Option<Vec<String>>,
    #[serde(default, alias = "workdir", deserialize_with = "de::opt_string")]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub ports: Option<Vec<ContainerPortParams>>,
    #[serde(default)]
    pub env: Option<Vec<EnvVarParams>>,
    #[serde(default)]
    pub env_from: Option<Vec<EnvFromParams>>,
    #[serde(default)]
    pub volume_mounts: Option<Vec<VolumeMountParams>>,
    #[serde(default)]
    pub volume_devices: Option<Vec<VolumeDeviceParams>>,
    #[serde(default)]
    pub resource_limits: Option<ComputeResourceParams>,
    #[serde(default)]
    pub resource_requests: Option<ComputeResourceParams>,
}

impl ContainerParams {
    fn to_definition(&self) -> Value {
        let ports = self.ports.as_ref().map(|ports| {
            ports
                .iter()
                .map(|port| {
                    json!({
                        "containerPort": port.container_port,
                        "hostIP": port.host_ip,
                        "hostPort": port.host_port,
                        "name": port.name,
                        "protocol": port.protocol,
                    })
                })
                .collect::<Vec<_>>()
        });
        let env = self.env.as_ref().map(|env| {
            env.iter()
                .map(|var| {
                    json!({
                        "name": var.name,
                        "valueFrom": {
                            "configMapKeyRef": var.config_map.as_ref().map(KeySelectorParams::to_definition),
                            "secretKeyRef": var.secret.as_ref().map(KeySelectorParams::to_definition),
                        },
                        "value": var.value,
                    })
                })
                .collect::<Vec<_>>()
        });
        let env_from = self.env_from.as_ref().map(|env_from| {
            env_from
                .iter()
                .map(|item| {
                    json!({
                        "configMapRef": item.config_map.as_ref().map(SourceRefParams::to_definition),
                        "prefix": item.prefix,
                        "secretRef": item.secret.as_ref().map(SourceRefParams::to_definition),
                    })
                })
                .collect::<Vec<_>>()
        });
        let volume_mounts = self.volume_mounts.as_ref().map(|mounts| {
            mounts
                .iter()
                .map(|mount| {
                    json!({
                        "mountPath": mount.path,
                        "name": mount.name,
                        "mountPropagation": mount.propagation,
                        "readOnly": mount.read_only,
                        "subPath": mount.sub_path,
                        "subPathExpr": mount.sub_path_expr,
                    })
                })
                .collect::<Vec<_>>()
        });
        let volume_devices = self.volume_devices.as_ref().map(|devices| {
            devices
                .iter()
                .map(|device| json!({"devicePath": device.path, "name": device.name}))
                .collect::<Vec<_>>()
        });

        json!({
            "name": self.name,
            "image": self.image,
            "imagePullPolicy": self.image_pull_policy,
            "command": self.command,
            "args": self.args,
            "workingDir": self.working_dir,
            "ports": ports,
            "env": env,
            "envFrom": env_from,
            "volumeMounts": volume_mounts,
            "volumeDevices": volume_devices,
            "resources": {
                "limits": ComputeResourceParams::to_definition(self.resource_limits.as_ref()),
                "requests": ComputeResourceParams::to_definition(self.resource_requests.as_ref()),
            },
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PvcSourceParams {
    #[serde(deserialize_with = "de::opt_string")]
    pub claim_name: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeyToPathParams {
    #[serde(deserialize_with = "de::opt_string")]
    pub key: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub path: Option<String>,
    #[serde(default)]
    pub mode: Option<Value>,
}

fn default_volume_mode() -> Option<Value> {
    Some(json!(DEFAULT_VOLUME_MODE))
}

/// Config map or secret projected as a volume
#[derive(Debug, Clone, Deserialize)]
pub struct ObjectSourceParams {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub optional: Option<bool>,
    #[serde(default = "default_volume_mode")]
    pub default_mode: Option<Value>,
    #[serde(default)]
    pub items: Option<Vec<KeyToPathParams>>,
}

impl ObjectSourceParams {
    fn to_definition(source: Option<&Self>, name_key: &str) -> Value {
        let Some(source) = source else {
            return Value::Null;
        };
        let items = source.items.as_ref().map(|items| {
            items
                .iter()
                .map(|item| json!({"key": item.key, "path": item.path, "mode": item.mode}))
                .collect::<Vec<_>>()
        });
        let mut definition = serde_json::Map::new();
        definition.insert(name_key.to_string(), json!(source.name));
        definition.insert("optional".to_string(), json!(source.optional));
        definition.insert("defaultMode".to_string(), json!(source.default_mode));
        definition.insert("items".to_string(), json!(items));
        Value::Object(definition)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeParams {
    #[serde(deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default)]
    pub pvc: Option<PvcSourceParams>,
    #[serde(default)]
    pub config_map: Option<ObjectSourceParams>,
    #[serde(default)]
    pub secret: Option<ObjectSourceParams>,
}

impl VolumeParams {
    fn to_definition(&self) -> Value {
        json!({
            "name": self.name,
            "persistentVolumeClaim": self.pvc.as_ref().map(|pvc| {
                json!({"claimName": pvc.claim_name, "readOnly": pvc.read_only})
            }),
            "configMap": ObjectSourceParams::to_definition(self.config_map.as_ref(), "name"),
            "secret": ObjectSourceParams::to_definition(self.secret.as_ref(), "secretName"),
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategyParams {
    #[serde(rename = "type", default)]
    pub strategy_type: StrategyType,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub max_surge: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub max_unavailable: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_replicas() -> Option<i64> {
    Some(1)
}

fn default_min_ready_seconds() -> Option<i64> {
    Some(0)
}

fn default_revision_history_limit() -> Option<i64> {
    Some(10)
}

fn default_progress_deadline_seconds() -> Option<i64> {
    Some(600)
}

/// Deployment-specific options
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentParams {
    #[serde(default)]
    pub selector: Option<SelectorParams>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub template_name: Option<String>,
    #[serde(default)]
    pub template_labels: Option<Value>,
    #[serde(default)]
    pub template_annotations: Option<Value>,
    #[serde(default)]
    pub containers: Option<Vec<ContainerParams>>,
    #[serde(default, deserialize_with = "de::opt_string_list")]
    pub image_pull_secrets: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub enable_service_links: bool,
    #[serde(default)]
    pub volumes: Option<Vec<VolumeParams>>,
    #[serde(default = "default_replicas", deserialize_with = "de::opt_i64")]
    pub replicas: Option<i64>,
    #[serde(default = "default_min_ready_seconds", deserialize_with = "de::opt_i64")]
    pub min_ready_seconds: Option<i64>,
    #[serde(default)]
    pub strategy: Option<StrategyParams>,
    #[serde(
        default = "default_revision_history_limit",
        deserialize_with = "de::opt_i64"
    )]
    pub revision_history_limit: Option<i64>,
    #[serde(
        default = "default_progress_deadline_seconds",
        deserialize_with = "de::opt_i64"
    )]
    pub progress_deadline_seconds: Option<i64>,
    #[serde(default)]
    pub paused: bool,
}

impl DeploymentParams {
    /// Pod template metadata. Each field falls back to the deployment's own.
    fn template_metadata(&self, common: &CommonArgs) -> Value {
        let given = |value: &Option<Value>| value.clone().filter(|v| !v.is_null());
        json!({
            "name": self.template_name.as_deref().unwrap_or(&common.name),
            "labels": given(&self.template_labels).or_else(|| common.labels.clone()),
            "annotations": given(&self.template_annotations).or_else(|| common.annotations.clone()),
        })
    }
}

/// Source of a pod volume, read back from a built definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VolumeSource {
    PersistentVolumeClaim,
    ConfigMap,
    Secret,
}

impl VolumeSource {
    const ALL: [(&'static str, VolumeSource); 3] = [
        ("persistentVolumeClaim", VolumeSource::PersistentVolumeClaim),
        ("configMap", VolumeSource::ConfigMap),
        ("secret", VolumeSource::Secret),
    ];

    /// Every source key present on the volume, in declaration order.
    fn of(volume: &Value) -> Vec<VolumeSource> {
        Self::ALL
            .iter()
            .filter(|(key, _)| volume.get(*key).is_some())
            .map(|(_, source)| *source)
            .collect()
    }
}

fn items<'a>(object: &'a Value, key: &str) -> &'a [Value] {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn str_at<'a>(object: &'a Value, pointer: &str) -> Option<&'a str> {
    object.pointer(pointer).and_then(Value::as_str)
}

fn validate_ports(
    validation: &mut Validation,
    container: &Value,
    i: usize,
    port_names: &mut HashSet<String>,
) {
    for (j, port) in items(container, "ports").iter().enumerate() {
        let field = format!("containers[{}].ports[{}]", i, j);
        validation.check_field(
            validators::port_value(port.get("containerPort")),
            format!("{}.container_port", field),
            validators::PORT_MSG,
        );
        validation.check_field(
            validators::port_value(port.get("hostPort")),
            format!("{}.host_port", field),
            validators::PORT_MSG,
        );
        let name = port.get("name").and_then(Value::as_str);
        validation.check_field(
            validators::iana_svc_name(name),
            format!("{}.name", field),
            validators::IANA_SVC_NAME_MSG,
        );
        if let Some(name) = name {
            validation.check(
                port_names.insert(name.to_string()),
                format!("{}.name", field),
                format!(
                    "Duplicate port name found ({}.name). Each named port in a pod must have a \
                     unique name",
                    field
                ),
            );
        }
    }
}

fn validate_env(validation: &mut Validation, container: &Value, i: usize) {
    for (j, var) in items(container, "env").iter().enumerate() {
        let field = format!("containers[{}].env[{}]", i, j);
        validation.check_field(
            validators::c_identifier(var.get("name").and_then(Value::as_str)),
            format!("{}.name", field),
            validators::C_IDENTIFIER_MSG,
        );
        let sources = [
            var.get("value").is_some(),
            var.pointer("/valueFrom/configMapKeyRef").is_some(),
            var.pointer("/valueFrom/secretKeyRef").is_some(),
        ];
        validation.check(
            sources.iter().filter(|s| **s).count() == 1,
            field.clone(),
            format!(
                "More then one value source in {}. Only one of (value, config_map, secret) can \
                 be present.",
                field
            ),
        );
        validation.check_field(
            validators::dns_subdomain(str_at(var, "/valueFrom/configMapKeyRef/name")),
            format!("{}.config_map.name", field),
            validators::DNS_SUBDOMAIN_MSG,
        );
        validation.check_field(
            validators::dns_subdomain(str_at(var, "/valueFrom/secretKeyRef/name")),
            format!("{}.secret.name", field),
            validators::DNS_SUBDOMAIN_MSG,
        );
    }

    for (j, item) in items(container, "envFrom").iter().enumerate() {
        let field = format!("containers[{}].env_from[{}]", i, j);
        let sources = [item.get("configMapRef").is_some(), item.get("secretRef").is_some()];
        validation.check(
            sources.iter().filter(|s| **s).count() == 1,
            field.clone(),
            format!(
                "More then one value source in {}. Only one of (config_map, secret) can be \
                 present.",
                field
            ),
        );
        validation.check_field(
            validators::dns_subdomain(str_at(item, "/configMapRef/name")),
            format!("{}.config_map.name", field),
            validators::DNS_SUBDOMAIN_MSG,
        );
        validation.check_field(
            validators::dns_subdomain(str_at(item, "/secretRef/name")),
            format!("{}.secret.name", field),
            validators::DNS_SUBDOMAIN_MSG,
        );
        validation.check_field(
            validators::c_identifier(item.get("prefix").and_then(Value::as_str)),
            format!("{}.prefix", field),
            validators::C_IDENTIFIER_MSG,
        );
    }
}

fn validate_volume_usage(
    validation: &mut Validation,
    container: &Value,
    i: usize,
    volumes: &HashMap<&str, Option<VolumeSource>>,
) {
    for (j, mount) in items(container, "volumeMounts").iter().enumerate() {
        let field = format!("containers[{}].volume_mounts[{}]", i, j);
        let name = mount.get("name").and_then(Value::as_str).unwrap_or_default();
        validation.check(
            volumes.contains_key(name),
            format!("{}.name", field),
            format!(
                "{}.name not found. Every name should match the Name of a Volume.",
                field
            ),
        );
        validation.check(
            !str_at(mount, "/mountPath").is_some_and(|path| path.contains(':')),
            format!("{}.path", field),
            format!("{}.path should not contain ':'", field),
        );
        validation.check(
            !(mount.get("subPath").is_some() && mount.get("subPathExpr").is_some()),
            field.clone(),
            format!(
                "sub_path and sub_path_expr in {} are mutually exclusive",
                field
            ),
        );
    }

    for (j, device) in items(container, "volumeDevices").iter().enumerate() {
        let field = format!("containers[{}].volume_devices[{}]", i, j);
        let name = device.get("name").and_then(Value::as_str).unwrap_or_default();
        match volumes.get(name) {
            None => validation.error(
                format!("{}.name", field),
                format!(
                    "{}.name not found. Every name should match the Name of a Volume.",
                    field
                ),
            ),
            Some(source) => validation.check(
                *source == Some(VolumeSource::PersistentVolumeClaim),
                format!("{}.name", field),
                format!(
                    "{}.name should match the name of a persistentVolumeClaim (pvc) in the pod",
                    field
                ),
            ),
        }
        validation.check(
            !str_at(device, "/devicePath").is_some_and(|path| path.contains(':')),
            format!("{}.path", field),
            format!("{}.path should not contain ':'", field),
        );
    }
}

fn validate_resources(validation: &mut Validation, container: &Value, i: usize) {
    for (key, param) in [("limits", "resource_limits"), ("requests", "resource_requests")] {
        let Some(resources) = container.pointer(&format!("/resources/{}", key)) else {
            continue;
        };
        let Some(resources) = resources.as_object() else {
            validation.error(
                format!("containers[{}].{}", i, param),
                format!(
                    "containers[{}].{} should be map[string]Quantity",
                    i, param
                ),
            );
            continue;
        };
        for (name, value) in resources {
            validation.check(
                value.as_str().is_some_and(validators::quantity),
                format!("containers[{}].{}.{}", i, param, name),
                format!(
                    "containers[{}].{}.{} should be a valid quantity. Quantities look like \
                     '100m', '0.5' or '4Gi'",
                    i, param, name
                ),
            );
        }
    }
}

pub struct K8sDeploymentModule;

impl Resource for K8sDeploymentModule {
    const API_VERSION: &'static str = "apps/v1";
    const KIND: &'static str = "Deployment";

    type Params = DeploymentParams;

    fn check_params(params: &ModuleParams, common: &CommonArgs) -> ModuleResult<()> {
        for required in ["selector", "containers"] {
            if params.get(required).map_or(true, Value::is_null) {
                return Err(ModuleError::MissingParameter(required.to_string()));
            }
        }
        args::required_if(params, common, State::Present, &["labels"])
    }

    fn definition(common: &CommonArgs, params: &DeploymentParams) -> Value {
        let containers = params
            .containers
            .as_ref()
            .map(|containers| containers.iter().map(ContainerParams::to_definition).collect::<Vec<_>>());
        let image_pull_secrets = params.image_pull_secrets.as_ref().map(|secrets| {
            secrets
                .iter()
                .map(|secret| json!({"name": secret}))
                .collect::<Vec<_>>()
        });
        let volumes = params
            .volumes
            .as_ref()
            .map(|volumes| volumes.iter().map(VolumeParams::to_definition).collect::<Vec<_>>());
        let strategy = params.strategy.as_ref().map(|strategy| {
            let to_int_or_string = |value: &Option<String>| {
                IntOrString::unmarshal(value.as_deref()).map(|v| v.to_value())
            };
            json!({
                "type": strategy.strategy_type,
                "rollingUpdate": {
                    "maxSurge": to_int_or_string(&strategy.max_surge),
                    "maxUnavailable": to_int_or_string(&strategy.max_unavailable),
                }
            })
        });

        json!({
            "apiVersion": Self::API_VERSION,
            "kind": Self::KIND,
            "metadata": common.metadata(),
            "spec": {
                "selector": SelectorParams::to_definition(params.selector.as_ref()),
                "template": {
                    "metadata": params.template_metadata(common),
                    "spec": {
                        "containers": containers,
                        "imagePullSecrets": image_pull_secrets,
                        "enableServiceLinks": params.enable_service_links,
                        "volumes": volumes,
                    }
                },
                "replicas": params.replicas,
                "minReadySeconds": params.min_ready_seconds,
                "strategy": strategy,
                "revisionHistoryLimit": params.revision_history_limit,
                "progressDeadlineSeconds": params.progress_deadline_seconds,
                "paused": params.paused,
            }
        })
    }

    fn validate(definition: &Value) -> Validation {
        let mut validation = common::validate_metadata(definition);
        validation.merge(common::validate_selector(definition));

        validation.check(
            validators::dns_subdomain(str_at(definition, "/metadata/name")),
            "name",
            format!("'name' {}", validators::DNS_SUBDOMAIN_MSG),
        );

        if let Some(strategy) = definition.pointer("/spec/strategy") {
            validation.check(
                !(strategy.get("type").and_then(Value::as_str) == Some("Recreate")
                    && strategy.get("rollingUpdate").is_some()),
                "strategy",
                "strategy.max_surge and strategy.max_unavailable can only be present if \
                 strategy.type==RollingUpdate",
            );
        }

        let empty = json!({});
        let template = definition.pointer("/spec/template").unwrap_or(&empty);
        validation.merge(common::validate_metadata(template));
        let pod = template.get("spec").unwrap_or(&empty);

        let pod_volumes = items(pod, "volumes");
        let volumes: HashMap<&str, Option<VolumeSource>> = pod_volumes
            .iter()
            .filter_map(|volume| {
                let name = volume.get("name").and_then(Value::as_str)?;
                Some((name, VolumeSource::of(volume).first().copied()))
            })
            .collect();

        let containers = items(pod, "containers");
        validation.check(
            !containers.is_empty(),
            "containers",
            "There must be at least one container in a Pod.",
        );

        let mut port_names = HashSet::new();
        for (i, container) in containers.iter().enumerate() {
            validation.check(
                container
                    .get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|name| !name.is_empty()),
                format!("containers[{}].name", i),
                format!("containers[{}].name is missing", i),
            );
            validation.check_field(
                validators::dns_label(container.get("name").and_then(Value::as_str)),
                format!("containers[{}].name", i),
                validators::DNS_LABEL_MSG,
            );
            validation.check(
                container.get("image").is_some(),
                format!("containers[{}].image", i),
                format!("containers[{}].image is missing", i),
            );
            validate_ports(&mut validation, container, i, &mut port_names);
            validate_env(&mut validation, container, i);
            validate_volume_usage(&mut validation, container, i, &volumes);
            validate_resources(&mut validation, container, i);
        }

        for (i, volume) in pod_volumes.iter().enumerate() {
            validation.check_field(
                validators::dns_label(volume.get("name").and_then(Value::as_str)),
                format!("volumes[{}].name", i),
                validators::DNS_LABEL_MSG,
            );
            validation.check(
                VolumeSource::of(volume).len() == 1,
                format!("volumes[{}]", i),
                format!(
                    "More then one volume source in volumes[{}]. Only one of (pvc, config_map, \
                     secret) can be present.",
                    i
                ),
            );
        }

        validation
    }
}

impl Module for K8sDeploymentModule {
    fn name(&self) -> &'static str {
        "k8s_deployment"
    }

    fn description(&self) -> &'static str {
        "Manage Kubernetes Deployments"
    }

    fn required_params(&self) -> &[&'static str] {
        &["name", "selector", "containers"]
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
