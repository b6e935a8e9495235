//! Ingress rendering and validation from YAML parameter records.

mod common;

use common::{messages, render};
use pretty_assertions::assert_eq;
use serde_json::json;
use sodalite_k8s::modules::k8s::validators;

#[test]
fn test_ingress() {
    let definition = render(
        "k8s_ingress",
        r#"
name: ingress-tls
ingress_class_name: nginx
rules:
  - host: "*.foo.bar.com"
    paths:
      - path: /testpath
        path_type: Exact
        backend_service:
          name: service1
          port: app-port
      - backend_service:
          name: service2
          port: "80"
tls:
  - hosts: [https-foo.bar.com]
    secret: secret-tls
"#,
    )
    .unwrap();
    assert_eq!(
        definition["spec"],
        json!({
            "ingressClassName": "nginx",
            "rules": [{
                "host": "*.foo.bar.com",
                "http": {"paths": [
                    {
                        "backend": {"service": {"name": "service1", "port": {"name": "app-port"}}},
                        "path": "/testpath",
                        "pathType": "Exact"
                    },
                    {
                        "backend": {"service": {"name": "service2", "port": {"number": 80}}},
                        "path": "/",
                        "pathType": "Prefix"
                    }
                ]}
            }],
            "tls": [{"hosts": ["https-foo.bar.com"], "secretName": "secret-tls"}]
        })
    );
}

#[test]
fn test_ingress_requires_backend_or_rules() {
    let errors = messages("k8s_ingress", "name: empty\n");
    assert_eq!(
        errors,
        vec!["At least one of (default_backend_service, rules) must be present. If present, 'rules' must contain at least one element"]
    );
}

#[test]
fn test_ingress_backend_errors() {
    let errors = messages(
        "k8s_ingress",
        r#"
name: web
default_backend_service:
  name: 1st-service
  port: "70000"
rules:
  - host: "*"
    paths:
      - path: relative
        backend_service:
          name: web
          port: http--alt
"#,
    );
    assert_eq!(
        errors,
        vec![
            format!(
                "default_backend_service.name {}",
                validators::DNS_LABEL_1035_MSG
            ),
            format!(
                "default_backend_service.port can be a port name or number. If it is a port number, it {}",
                validators::PORT_MSG
            ),
            format!("rules[0].host {}", validators::DNS_SUBDOMAIN_WILDCARD_MSG),
            format!(
                "rules[0].paths[0].backend_service.port can be a port name or number. If it is a port name, it {}",
                validators::IANA_SVC_NAME_MSG
            ),
            format!("rules[0].paths[0].path {}", validators::URL_PATH_MSG),
        ]
    );
}

#[test]
fn test_ingress_backend_port_required() {
    for port in ["\"\"", "null"] {
        let errors = messages(
            "k8s_ingress",
            &format!(
                "name: web\nrules:\n  - paths:\n      - backend_service:\n          name: web\n          port: {}\n",
                port
            ),
        );
        assert_eq!(
            errors,
            vec!["rules[0].paths[0].backend_service.port can be a port name or number, got neither"],
            "port: {}",
            port
        );
    }
}
