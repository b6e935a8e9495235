//! Service rendering and validation from YAML parameter records.

mod common;

use common::{messages, render};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn test_service() {
    let definition = render(
        "k8s_service",
        r#"
name: web-service
type: LoadBalancer
selector:
  app: web
ports:
  - name: http
    port: 80
    target_port: "8080"
  - name: admin
    port: 9000
    target_port: admin-port
load_balancer_source_ranges: [10.0.0.0/8]
"#,
    )
    .unwrap();
    let spec = &definition["spec"];
    assert_eq!(spec["type"], json!("LoadBalancer"));
    assert_eq!(spec["ports"][0]["targetPort"], json!(8080));
    assert_eq!(spec["ports"][1]["targetPort"], json!("admin-port"));
    assert_eq!(spec["ports"][0]["protocol"], json!("TCP"));
    assert_eq!(
        spec["sessionAffinityConfig"]["clientIP"]["timeoutSeconds"],
        json!(10800)
    );
    assert_eq!(spec["internalTrafficPolicy"], json!("Cluster"));
}

#[test]
fn test_service_collects_all_errors() {
    let errors = messages(
        "k8s_service",
        r#"
name: 1-web
type: ClusterIP
load_balancer_ip: 10.0.0.1
ports:
  - port: 70000
  - port: 80
"#,
    );
    assert!(errors.iter().any(|m| m.starts_with("name should be a lowercase DNS-1135")));
    assert!(errors.contains(&"ports[0].port should be a valid port number, 0 < x < 65536".to_string()));
    assert!(errors.contains(
        &"ports[1].name is not set, but should be, since service has more then one port".to_string()
    ));
    assert!(errors.iter().any(|m| m.starts_with("load_balancer_ip, load_balancer_source_ranges")));
}

#[test]
fn test_service_dual_stack() {
    let definition = render(
        "k8s_service",
        r#"
name: dual
ports: [{port: 80}]
ip_families: [IPv4, IPv6]
ip_families_policy: RequireDualStack
cluster_ips: [10.96.0.10, "fd00::10"]
"#,
    )
    .unwrap();
    assert_eq!(definition["spec"]["clusterIP"], json!("10.96.0.10"));

    let errors = messages(
        "k8s_service",
        r#"
name: dual
ports: [{port: 80}]
ip_families: [IPv4]
cluster_ips: [10.96.0.10, 10.96.0.11]
"#,
    );
    assert!(errors.contains(&"One IP in cluster_ips must be IPv4 and other IPv6".to_string()));
}

#[test]
fn test_service_external_name() {
    let errors = messages(
        "k8s_service",
        r#"
name: db
type: ExternalName
external_name: db.example.com
selector:
  app: db
ports: [{port: 5432}]
"#,
    );
    assert_eq!(errors, vec!["selector is not allowed with type='ExternalName'"]);
}

#[test]
fn test_external_name_allows_empty_cluster_ip() {
    let yaml = "name: db\ntype: ExternalName\nexternal_name: db.example.com\nports: [{port: 5432}]\n";
    let definition = render("k8s_service", &format!("{}cluster_ip: \"\"\n", yaml)).unwrap();
    assert_eq!(definition["spec"]["type"], json!("ExternalName"));

    let errors = messages("k8s_service", &format!("{}cluster_ip: 10.0.0.10\n", yaml));
    assert_eq!(
        errors,
        vec!["cluster_ip and cluster_ips are not allowed with type='ExternalName'"]
    );
}
