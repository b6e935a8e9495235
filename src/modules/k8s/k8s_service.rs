//! Kubernetes Service module - Service resource management
//!
//! Services expose a set of pods as a network service.
//!
//! ## Parameters
//!
//! - `name`: Service name, a DNS-1035 label (required)
//! - `namespace`: Kubernetes namespace (default: "default")
//! - `state`: Desired state (present, absent, patched) (default: "present")
//! - `selector`: Pod label selector
//! - `ports`: List of `{port, target_port, protocol, name, node_port}` (required when state is present)
//! - `type`: ClusterIP, NodePort, LoadBalancer or ExternalName (default: "ClusterIP")
//! - `ip_families`: IPv4 and/or IPv6
//! - `ip_families_policy`: SingleStack, PreferDualStack or RequireDualStack
//! - `cluster_ip` / `cluster_ips`: Service IP address(es), mutually exclusive
//! - `external_ips`: IPs for which nodes accept traffic
//! - `load_balancer_ip`, `load_balancer_source_ranges`, `load_balancer_class`: LoadBalancer only
//! - `external_name`: CNAME target, ExternalName only
//! - `external_traffic_policy`: Local or Cluster
//! - `internal_traffic_policy`: Local or Cluster (default: "Cluster")
//! - `health_check_node_port`: LoadBalancer with Local external traffic policy only
//! - `publish_not_ready_addresses`: (default: false)
//! - `session_affinity`: ClientIP or None (default: "None")
//! - `session_affinity_timeout`: ClientIP affinity timeout in seconds (default: 10800)
//!
//! ## Example
//!
//! ```yaml
//! - name: Create web service
//!   k8s_service:
//!     name: web-service
//!     type: LoadBalancer
//!     selector:
//!       app: web
//!     ports:
//!       - name: http
//!         port: 80
//!         target_port: "8080"
//! ```

use super::args::{self, de, CommonArgs, Protocol, State};
use super::marshalling::IntOrString;
use super::validation::Validation;
use super::{common, validators, Resource};
use crate::modules::{Diff, Module, ModuleContext, ModuleOutput, ModuleParams, ModuleResult};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashSet;

pub const SERVICE_TYPES: [&str; 4] = ["ExternalName", "ClusterIP", "NodePort", "LoadBalancer"];
pub const IP_FAMILIES: [&str; 2] = ["IPv4", "IPv6"];
pub const IP_FAMILY_POLICIES: [&str; 3] = ["SingleStack", "PreferDualStack", "RequireDualStack"];
pub const TRAFFIC_POLICIES: [&str; 2] = ["Local", "Cluster"];
pub const SESSION_AFFINITIES: [&str; 2] = ["ClientIP", "None"];

/// Default `sessionAffinityConfig.clientIP.timeoutSeconds` (3 hours).
pub const DEFAULT_SESSION_AFFINITY_TIMEOUT: i64 = 10800;
/// Upper bound of the session affinity timeout (1 day).
pub const MAX_SESSION_AFFINITY_TIMEOUT: i64 = 86400;

fn default_type() -> String {
    "ClusterIP".to_string()
}

fn default_internal_traffic_policy() -> String {
    "Cluster".to_string()
}

fn default_session_affinity() -> String {
    "None".to_string()
}

fn default_session_affinity_timeout() -> Option<i64> {
    Some(DEFAULT_SESSION_AFFINITY_TIMEOUT)
}

/// One entry of `ports`
#[derive(Debug, Clone, Deserialize)]
pub struct ServicePortParams {
    #[serde(deserialize_with = "de::opt_i64")]
    pub port: Option<i64>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub target_port: Option<String>,
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub node_port: Option<i64>,
}

/// Service-specific options
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceParams {
    #[serde(default)]
    pub selector: Option<Value>,
    #[serde(default)]
    pub ports: Option<Vec<ServicePortParams>>,
    #[serde(rename = "type", default = "default_type")]
    pub service_type: String,
    #[serde(default, deserialize_with = "de::opt_string_list")]
    pub ip_families: Option<Vec<String>>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub ip_families_policy: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub cluster_ip: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string_list")]
    pub cluster_ips: Option<Vec<String>>,
    #[serde(default, deserialize_with = "de::opt_string_list")]
    pub external_ips: Option<Vec<String>>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub load_balancer_ip: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string_list")]
    pub load_balancer_source_ranges: Option<Vec<String>>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub load_balancer_class: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub external_name: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub external_traffic_policy: Option<String>,
    #[serde(default = "default_internal_traffic_policy")]
    pub internal_traffic_policy: String,
    #[serde(default, deserialize_with = "de::opt_i64")]
    pub health_check_node_port: Option<i64>,
    #[serde(default)]
    pub publish_not_ready_addresses: bool,
    #[serde(default = "default_session_affinity")]
    pub session_affinity: String,
    #[serde(
        default = "default_session_affinity_timeout",
        deserialize_with = "de::opt_i64"
    )]
    pub session_affinity_timeout: Option<i64>,
}

impl ServiceParams {
    /// `cluster_ip`, or the first of `cluster_ips` when it is not given.
    fn cluster_ip(&self) -> Option<&str> {
        self.cluster_ip.as_deref().or_else(|| {
            self.cluster_ips
                .as_ref()
                .and_then(|ips| ips.first())
                .map(String::as_str)
        })
    }
}

/// Render a list of strings the way users see it in messages: `['IPv4', 'IPv6']`.
fn quoted_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{}'", item)).collect();
    format!("[{}]", quoted.join(", "))
}

fn str_items(value: Option<&Value>) -> Vec<&str> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

fn validate_ports(validation: &mut Validation, spec: &Value) {
    let ports = spec
        .get("ports")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if ports.is_empty() {
        validation.error("ports", "ports must have at least one element");
        return;
    }

    let mut names = HashSet::new();
    for (i, port) in ports.iter().enumerate() {
        validation.check_field(
            validators::port_value(port.get("port")),
            format!("ports[{}].port", i),
            validators::PORT_MSG,
        );

        match port.get("targetPort") {
            Some(Value::String(name)) => validation.check(
                validators::iana_svc_name(Some(name)),
                format!("ports[{}].target_port", i),
                format!(
                    "ports[{}].target_port is a name and {}",
                    i,
                    validators::IANA_SVC_NAME_MSG
                ),
            ),
            Some(number) => validation.check(
                validators::port_value(Some(number)),
                format!("ports[{}].target_port", i),
                format!(
                    "ports[{}].target_port is a number and {}",
                    i,
                    validators::PORT_MSG
                ),
            ),
            None => {}
        }

        let name = port.get("name").and_then(Value::as_str);
        if let Some(name) = name {
            validation.check(
                names.insert(name),
                format!("ports[{}].name", i),
                format!(
                    "Duplicate port name found (ports[{}].name). Each named port in a service \
                     must have a unique name",
                    i
                ),
            );
        }
        validation.check_field(
            validators::dns_label(name),
            format!("ports[{}].name", i),
            validators::DNS_LABEL_MSG,
        );
        validation.check(
            ports.len() == 1 || name.is_some(),
            format!("ports[{}].name", i),
            format!(
                "ports[{}].name is not set, but should be, since service has more then one port",
                i
            ),
        );

        validation.check_field(
            validators::port_value(port.get("nodePort")),
            format!("ports[{}].node_port", i),
            validators::PORT_MSG,
        );
    }
}

fn validate_ip_families(validation: &mut Validation, spec: &Value, external_name: bool) {
    let ip_families = str_items(spec.get("ipFamilies"));
    let policy = spec.get("ipFamilyPolicy").and_then(Value::as_str);
    let dual_stack_msg = |what: &str| {
        format!(
            "ip_families_policy must be set to 'RequireDualStack' or 'PreferDualStack' when \
             multiple {} are specified",
            what
        )
    };

    if external_name {
        validation.check(
            ip_families.is_empty(),
            "ip_families",
            "ip_families is not allowed with type='ExternalName'",
        );
        validation.check(
            policy.is_none(),
            "ip_families_policy",
            "ip_families_policy is not allowed with type='ExternalName'",
        );
    }
    validation.check(
        ip_families.len() <= 2,
        "ip_families",
        "ip_families field may hold a maximum of two entries (dual-stack families, in either order)",
    );
    validation.check(
        !(ip_families.len() == 2 && ip_families[0] == ip_families[1]),
        "ip_families",
        "The same IP Family cannot be specified more than once",
    );
    validation.check(
        !(ip_families.len() == 2 && policy == Some("SingleStack")),
        "ip_families_policy",
        dual_stack_msg("ip_families"),
    );

    let cluster_ip = spec.get("clusterIP").and_then(Value::as_str);
    let cluster_ips = str_items(spec.get("clusterIPs"));
    if external_name {
        validation.check(
            cluster_ip.map_or(true, str::is_empty) && cluster_ips.is_empty(),
            "cluster_ip",
            "cluster_ip and cluster_ips are not allowed with type='ExternalName'",
        );
    }

    validation.check(
        cluster_ips.len() <= 2,
        "cluster_ips",
        "cluster_ips field may hold a maximum of two entries (dual-stack IPs, in either order. \
         First IP will also be copied to ClusterIP field)",
    );
    if let [first, second] = cluster_ips.as_slice() {
        validation.check(
            policy != Some("SingleStack"),
            "ip_families_policy",
            dual_stack_msg("cluster_ips"),
        );
        let parsed = [first, second].map(|ip| ip.parse::<std::net::IpAddr>().ok());
        if let [Some(a), Some(b)] = parsed {
            validation.check(
                a.is_ipv4() != b.is_ipv4(),
                "cluster_ips",
                "One IP in cluster_ips must be IPv4 and other IPv6",
            );
        }
    }

    // With exactly one family declared every cluster IP must belong to it.
    let (ip_valid, ip_msg): (fn(Option<&str>) -> bool, &str) = match ip_families.as_slice() {
        ["IPv4"] => (validators::ipv4_address, validators::IPV4_ADDRESS_MSG),
        [_] => (validators::ipv6_address, validators::IPV6_ADDRESS_MSG),
        _ => (validators::ip_address, validators::IP_ADDRESS_MSG),
    };
    let families = if ip_families.is_empty() {
        "not specified".to_string()
    } else {
        quoted_list(&ip_families)
    };
    let unset_or_valid = |ip: &str| matches!(ip, "None" | "") || ip_valid(Some(ip));

    for (i, ip) in cluster_ips.iter().enumerate() {
        validation.check(
            unset_or_valid(ip),
            format!("cluster_ips[{}]", i),
            format!(
                "cluster_ips[{}] {}, None or \"\" when \"ip_families\" is {}",
                i, ip_msg, families
            ),
        );
    }
    if let Some(ip) = cluster_ip {
        validation.check(
            unset_or_valid(ip),
            "cluster_ip",
            format!(
                "cluster_ip {}, None or \"\" when \"ip_families\" is {}",
                ip_msg, families
            ),
        );
    }
}

fn validate_addresses(validation: &mut Validation, spec: &Value, service_type: Option<&str>) {
    for (i, ip) in str_items(spec.get("externalIPs")).into_iter().enumerate() {
        validation.check_field(
            validators::ip_address(Some(ip)),
            format!("external_ips[{}]", i),
            validators::IP_ADDRESS_MSG,
        );
    }

    let load_balancer_ip = spec.get("loadBalancerIP").and_then(Value::as_str);
    let source_ranges = str_items(spec.get("loadBalancerSourceRanges"));
    let uses_load_balancer = load_balancer_ip.is_some()
        || !source_ranges.is_empty()
        || spec.get("loadBalancerClass").is_some();
    validation.check(
        service_type == Some("LoadBalancer") || !uses_load_balancer,
        "load_balancer_ip",
        "load_balancer_ip, load_balancer_source_ranges and load_balancer_class are only valid \
         with type='LoadBalancer'",
    );
    validation.check_field(
        validators::ip_address(load_balancer_ip),
        "load_balancer_ip",
        validators::IP_ADDRESS_MSG,
    );
    for (i, range) in source_ranges.into_iter().enumerate() {
        validation.check_field(
            validators::ip_range(Some(range)),
            format!("load_balancer_source_ranges[{}]", i),
            validators::IP_RANGE_MSG,
        );
    }

    if let Some(external_name) = spec.get("externalName").and_then(Value::as_str) {
        validation.check(
            service_type == Some("ExternalName"),
            "external_name",
            "external_name is only valid with type='ExternalName'",
        );
        validation.check_field(
            validators::dns_subdomain(Some(external_name)),
            "external_name",
            validators::DNS_SUBDOMAIN_MSG,
        );
    }

    let health_check_node_port = spec.get("healthCheckNodePort");
    if health_check_node_port.is_some_and(|port| port.as_i64() != Some(0)) {
        validation.check(
            service_type == Some("LoadBalancer")
                && spec.get("externalTrafficPolicy").and_then(Value::as_str) == Some("Local"),
            "health_check_node_port",
            "health_check_node_port is only valid with type='LoadBalancer' and \
             external_traffic_policy='Local'",
        );
        validation.check_field(
            validators::port_value(health_check_node_port),
            "health_check_node_port",
            validators::PORT_MSG,
        );
    }
}

fn validate_session_affinity(validation: &mut Validation, spec: &Value) {
    let timeout = spec.pointer("/sessionAffinityConfig/clientIP/timeoutSeconds");
    let timeout = match timeout {
        None => DEFAULT_SESSION_AFFINITY_TIMEOUT,
        Some(value) => match value.as_i64() {
            Some(timeout) => timeout,
            None => {
                validation.error(
                    "session_affinity_timeout",
                    "session_affinity_timeout must be 0 < x <= 86400",
                );
                return;
            }
        },
    };

    // A non-default timeout is taken as user supplied.
    validation.check(
        timeout == DEFAULT_SESSION_AFFINITY_TIMEOUT
            || spec.get("sessionAffinity").and_then(Value::as_str) == Some("ClientIP"),
        "session_affinity_timeout",
        "session_affinity_timeout can only be used with session_affinity='ClientIP'",
    );
    validation.check(
        0 < timeout && timeout <= MAX_SESSION_AFFINITY_TIMEOUT,
        "session_affinity_timeout",
        "session_affinity_timeout must be 0 < x <= 86400",
    );
}

pub struct K8sServiceModule;

impl Resource for K8sServiceModule {
    const API_VERSION: &'static str = "v1";
    const KIND: &'static str = "Service";

    type Params = ServiceParams;

    fn check_params(params: &ModuleParams, common: &CommonArgs) -> ModuleResult<()> {
        args::required_if(params, common, State::Present, &["ports"])?;
        args::mutually_exclusive(params, &["cluster_ip", "cluster_ips"])?;
        args::choice(params, "type", &SERVICE_TYPES)?;
        args::choice(params, "ip_families", &IP_FAMILIES)?;
        args::choice(params, "ip_families_policy", &IP_FAMILY_POLICIES)?;
        args::choice(params, "external_traffic_policy", &TRAFFIC_POLICIES)?;
        args::choice(params, "internal_traffic_policy", &TRAFFIC_POLICIES)?;
        args::choice(params, "session_affinity", &SESSION_AFFINITIES)
    }

    fn definition(common: &CommonArgs, params: &ServiceParams) -> Value {
        let ports = params.ports.as_ref().map(|ports| {
            ports
                .iter()
                .map(|port| {
                    json!({
                        "port": port.port,
                        "targetPort": IntOrString::unmarshal(port.target_port.as_deref())
                            .map(|target| target.to_value()),
                        "protocol": port.protocol,
                        "name": port.name,
                        "nodePort": port.node_port,
                    })
                })
                .collect::<Vec<_>>()
        });

        json!({
            "apiVersion": Self::API_VERSION,
            "kind": Self::KIND,
            "metadata": common.metadata(),
            "spec": {
                "selector": params.selector,
                "ports": ports,
                "type": params.service_type,
                "ipFamilies": params.ip_families,
                "ipFamilyPolicy": params.ip_families_policy,
                "clusterIP": params.cluster_ip(),
                "clusterIPs": params.cluster_ips,
                "externalIPs": params.external_ips,
                "loadBalancerIP": params.load_balancer_ip,
                "loadBalancerSourceRanges": params.load_balancer_source_ranges,
                "loadBalancerClass": params.load_balancer_class,
                "externalName": params.external_name,
                "externalTrafficPolicy": params.external_traffic_policy,
                "internalTrafficPolicy": params.internal_traffic_policy,
                "healthCheckNodePort": params.health_check_node_port,
                "publishNotReadyAddresses": params.publish_not_ready_addresses,
                "sessionAffinity": params.session_affinity,
                "sessionAffinityConfig": {
                    "clientIP": {"timeoutSeconds": params.session_affinity_timeout}
                },
            }
        })
    }

    fn validate(definition: &Value) -> Validation {
        let mut validation = common::validate_metadata(definition);

        validation.check_field(
            validators::dns_label_1035(definition.pointer("/metadata/name").and_then(Value::as_str)),
            "name",
            validators::DNS_LABEL_1035_MSG,
        );

        let empty = json!({});
        let spec = definition.get("spec").unwrap_or(&empty);
        let service_type = spec.get("type").and_then(Value::as_str);
        let external_name = service_type == Some("ExternalName");

        if let Some(selector) = spec.get("selector") {
            validation.check(
                !external_name,
                "selector",
                "selector is not allowed with type='ExternalName'",
            );
            validation.check(
                validators::string_string_dict(Some(selector)),
                "selector",
                "selector should be map[string]string",
            );
        }

        validate_ports(&mut validation, spec);
        validate_ip_families(&mut validation, spec, external_name);
        validate_addresses(&mut validation, spec, service_type);
        validate_session_affinity(&mut validation, spec);
        validation
    }
}

impl Module for K8sServiceModule {
    fn name(&self) -> &'static str {
        "k8s_service"
    }

    fn description(&self) -> &'static str {
        "Manage Kubernetes Services"
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
