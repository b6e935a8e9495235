//! Kubernetes Ingress module
//!
//! An Ingress is a collection of rules that allow inbound connections to reach
//! services. It can give services externally reachable URLs, terminate TLS and
//! offer name based virtual hosting.
//!
//! ## Parameters
//!
//! - `name`: Ingress name (required)
//! - `namespace`: Kubernetes namespace (default: "default")
//! - `state`: Desired state (present, absent, patched) (default: "present")
//! - `ingress_class_name`: Name of the IngressClass cluster resource
//! - `default_backend_service`: `{name, port}` handling requests that match no rule
//! - `rules`: Host rules, each with `host` and `paths`
//!   (`backend_service`, `path` (default: "/"), `path_type` (Exact or Prefix, default: "Prefix"))
//! - `tls`: TLS configuration, each with `hosts` and `secret`
//!
//! A backend `port` made only of digits is sent as a port number, anything
//! else as a port name.
//!
//! ## Example
//!
//! ```yaml
//! - name: Ingress with TLS
//!   k8s_ingress:
//!     name: ingress-tls
//!     rules:
//!       - host: https-foo.bar.com
//!         paths:
//!           - path: /testpath
//!             backend_service:
//!               name: service1
//!               port: app-port
//!     tls:
//!       - hosts: [https-foo.bar.com]
//!         secret: secret-tls
//! ```

use super::args::{de, CommonArgs};
use super::marshalling::IntOrString;
use super::validation::Validation;
use super::{common, validators, Resource};
use crate::modules::{Diff, Module, ModuleContext, ModuleOutput, ModuleParams, ModuleResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PathType {
    Exact,
    #[default]
    Prefix,
}

/// Reference to a service port
#[derive(Debug, Clone, Deserialize)]
pub struct BackendServiceParams {
    #[serde(deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "de::opt_string")]
    pub port: Option<String>,
}

impl BackendServiceParams {
    fn to_definition(backend: Option<&Self>) -> Value {
        let Some(backend) = backend else {
            return Value::Null;
        };
        let port = IntOrString::unmarshal(backend.port.as_deref().filter(|p| !p.is_empty()));
        json!({
            "service": {
                "name": backend.name,
                "port": {
                    "name": port.as_ref().and_then(IntOrString::as_str),
                    "number": port.as_ref().and_then(IntOrString::as_int),
                }
            }
        })
    }
}

fn default_path() -> Option<String> {
    Some("/".to_string())
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathParams {
    pub backend_service: BackendServiceParams,
    #[serde(default = "default_path", deserialize_with = "de::opt_string")]
    pub path: Option<String>,
    #[serde(default)]
    pub path_type: PathType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuleParams {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub host: Option<String>,
    pub paths: Vec<PathParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsParams {
    #[serde(default, deserialize_with = "de::opt_string_list")]
    pub hosts: Option<Vec<String>>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub secret: Option<String>,
}

/// Ingress-specific options
#[derive(Debug, Clone, Deserialize)]
pub struct IngressParams {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub ingress_class_name: Option<String>,
    #[serde(default)]
    pub default_backend_service: Option<BackendServiceParams>,
    #[serde(default)]
    pub rules: Option<Vec<RuleParams>>,
    #[serde(default)]
    pub tls: Option<Vec<TlsParams>>,
}

fn backend_errors(validation: &mut Validation, backend: &Value, field: &str) {
    validation.check(
        backend.pointer("/service/port").is_some(),
        format!("{}.port", field),
        format!("{}.port can be a port name or number, got neither", field),
    );
    validation.check_field(
        validators::dns_label_1035(backend.pointer("/service/name").and_then(Value::as_str)),
        format!("{}.name", field),
        validators::DNS_LABEL_1035_MSG,
    );
    validation.check(
        validators::port_value(backend.pointer("/service/port/number")),
        format!("{}.port", field),
        format!(
            "{}.port can be a port name or number. If it is a port number, it {}",
            field,
            validators::PORT_MSG
        ),
    );
    validation.check(
        validators::iana_svc_name(backend.pointer("/service/port/name").and_then(Value::as_str)),
        format!("{}.port", field),
        format!(
            "{}.port can be a port name or number. If it is a port name, it {}",
            field,
            validators::IANA_SVC_NAME_MSG
        ),
    );
}

pub struct K8sIngressModule;

impl Resource for K8sIngressModule {
    const API_VERSION: &'static str = "networking.k8s.io/v1";
    const KIND: &'static str = "Ingress";

    type Params = IngressParams;

    fn definition(common: &CommonArgs, params: &IngressParams) -> Value {
        let rules = params.rules.as_ref().map(|rules| {
            rules
                .iter()
                .map(|rule| {
                    let paths = rule
                        .paths
                        .iter()
                        .map(|path| {
                            json!({
                                "backend": BackendServiceParams::to_definition(Some(&path.backend_service)),
                                "path": path.path,
                                "pathType": path.path_type,
                            })
                        })
                        .collect::<Vec<_>>();
                    json!({"host": rule.host, "http": {"paths": paths}})
                })
                .collect::<Vec<_>>()
        });
        let tls = params.tls.as_ref().map(|tls| {
            tls.iter()
                .map(|t| json!({"hosts": t.hosts, "secretName": t.secret}))
                .collect::<Vec<_>>()
        });

        json!({
            "apiVersion": Self::API_VERSION,
            "kind": Self::KIND,
            "metadata": common.metadata(),
            "spec": {
                "defaultBackend": BackendServiceParams::to_definition(params.default_backend_service.as_ref()),
                "ingressClassName": params.ingress_class_name,
                "rules": rules,
                "tls": tls,
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

        let default_backend = definition.pointer("/spec/defaultBackend");
        let rules = definition
            .pointer("/spec/rules")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        validation.check(
            default_backend.is_some() || !rules.is_empty(),
            "rules",
            "At least one of (default_backend_service, rules) must be present. If present, \
             'rules' must contain at least one element",
        );

        if let Some(backend) = default_backend {
            backend_errors(&mut validation, backend, "default_backend_service");
        }

        for (i, rule) in rules.iter().enumerate() {
            validation.check_field(
                validators::dns_subdomain_wildcard(rule.get("host").and_then(Value::as_str)),
                format!("rules[{}].host", i),
                validators::DNS_SUBDOMAIN_WILDCARD_MSG,
            );
            let paths = rule
                .pointer("/http/paths")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            validation.check(
                !paths.is_empty(),
                format!("rules[{}].paths", i),
                format!("rules[{}].paths must contain at least one parameter", i),
            );
            for (j, path) in paths.iter().enumerate() {
                if let Some(backend) = path.get("backend") {
                    backend_errors(
                        &mut validation,
                        backend,
                        &format!("rules[{}].paths[{}].backend_service", i, j),
                    );
                }
                validation.check_field(
                    validators::url_path(path.get("path").and_then(Value::as_str)),
                    format!("rules[{}].paths[{}].path", i, j),
                    validators::URL_PATH_MSG,
                );
            }
        }

        let tls = definition
            .pointer("/spec/tls")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for (i, entry) in tls.iter().enumerate() {
            validation.check_field(
                validators::dns_subdomain(entry.get("secretName").and_then(Value::as_str)),
                format!("tls[{}].secret", i),
                validators::DNS_SUBDOMAIN_MSG,
            );
        }

        validation
    }
}

impl Module for K8sIngressModule {
    fn name(&self) -> &'static str {
        "k8s_ingress"
    }

    fn description(&self) -> &'static str {
        "Manage Kubernetes Ingresses"
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
