//! Tests for the sodalite-k8s binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

/// Command running inside `dir`, isolated from user configuration.
fn sodalite(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sodalite-k8s").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("NO_COLOR", "1")
        .env_remove("SODALITE_CONFIG")
        .env_remove("SODALITE_NAMESPACE")
        .env_remove("SODALITE_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    sodalite(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("apply"));
}

#[test]
fn test_list() {
    let dir = TempDir::new().unwrap();
    sodalite(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("k8s_configmap"))
        .stdout(predicate::str::contains("k8s_storage_class"));
}

#[test]
fn test_render_yaml() {
    let dir = TempDir::new().unwrap();
    let params = write(&dir, "cm.yaml", "name: app-config\ndata:\n  LOG_LEVEL: debug\n");

    sodalite(dir.path())
        .args(["render", "k8s_configmap", "-p"])
        .arg(&params)
        .assert()
        .success()
        .stdout(predicate::str::contains("kind: ConfigMap"))
        .stdout(predicate::str::contains("LOG_LEVEL: debug"));
}

#[test]
fn test_render_json() {
    let dir = TempDir::new().unwrap();
    let params = write(&dir, "ns.yaml", "name: team-a\n");

    let output = sodalite(dir.path())
        .args(["-o", "json", "render", "k8s_namespace", "-p"])
        .arg(&params)
        .output()
        .unwrap();
    assert!(output.status.success());
    let definition: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(definition["metadata"]["name"], "team-a");
}

#[test]
fn test_validate_ok() {
    let dir = TempDir::new().unwrap();
    let params = write(&dir, "ns.yaml", "name: team-a\n");

    sodalite(dir.path())
        .args(["validate", "k8s_namespace", "-p"])
        .arg(&params)
        .assert()
        .success()
        .stdout("ok\n");
}

#[test]
fn test_validate_reports_every_error() {
    let dir = TempDir::new().unwrap();
    let params = write(
        &dir,
        "svc.yaml",
        "name: web\nports:\n  - port: 0\n  - port: 70000\n",
    );

    sodalite(dir.path())
        .args(["validate", "k8s_service", "-p"])
        .arg(&params)
        .assert()
        .code(2)
        .stdout(predicate::str::contains(
            "ERROR: ports[0].port should be a valid port number",
        ))
        .stdout(predicate::str::contains(
            "ERROR: ports[1].port should be a valid port number",
        ));
}

#[test]
fn test_validate_fail_fast_from_config() {
    let dir = TempDir::new().unwrap();
    write(&dir, "sodalite.toml", "[execution]\nfail_fast_validation = true\n");
    let params = write(
        &dir,
        "svc.yaml",
        "name: web\nports:\n  - port: 0\n  - port: 70000\n",
    );

    let output = sodalite(dir.path())
        .args(["validate", "k8s_service", "-p"])
        .arg(&params)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1);
}

#[test]
fn test_missing_parameter_exit_code() {
    let dir = TempDir::new().unwrap();
    let params = write(&dir, "pvc.yaml", "name: data\n");

    sodalite(dir.path())
        .args(["render", "k8s_pvc", "-p"])
        .arg(&params)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("access_modes"));
}

#[test]
fn test_unknown_module() {
    let dir = TempDir::new().unwrap();
    let params = write(&dir, "pod.yaml", "name: web\n");

    sodalite(dir.path())
        .args(["render", "k8s_pod", "-p"])
        .arg(&params)
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Module 'k8s_pod' not found"));
}

#[test]
fn test_apply_with_state_file() {
    let dir = TempDir::new().unwrap();
    let params = write(&dir, "cm.yaml", "name: app-config\ndata:\n  a: \"1\"\n");
    let state = dir.path().join("cluster.yaml");

    sodalite(dir.path())
        .args(["apply", "k8s_configmap", "-p"])
        .arg(&params)
        .arg("--state")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("changed: [k8s_configmap] Created"));

    let stored = std::fs::read_to_string(&state).unwrap();
    assert!(stored.contains("name: app-config"));
    assert!(stored.contains("namespace: default"));

    sodalite(dir.path())
        .args(["apply", "k8s_configmap", "-p"])
        .arg(&params)
        .arg("--state")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: [k8s_configmap]"));
}

#[test]
fn test_apply_check_mode_keeps_state() {
    let dir = TempDir::new().unwrap();
    let params = write(&dir, "ns.yaml", "name: team-a\n");
    let state = dir.path().join("cluster.yaml");

    sodalite(dir.path())
        .args(["apply", "k8s_namespace", "--check", "-p"])
        .arg(&params)
        .arg("--state")
        .arg(&state)
        .assert()
        .success()
        .stdout(predicate::str::contains("Would create"));

    assert!(!state.exists());
}

#[test]
fn test_namespace_from_environment() {
    let dir = TempDir::new().unwrap();
    let params = write(&dir, "cm.yaml", "name: app-config\n");
    let state = dir.path().join("cluster.yaml");

    sodalite(dir.path())
        .env("SODALITE_NAMESPACE", "staging")
        .args(["apply", "k8s_configmap", "-p"])
        .arg(&params)
        .arg("--state")
        .arg(&state)
        .assert()
        .success();

    let stored = std::fs::read_to_string(&state).unwrap();
    assert!(stored.contains("namespace: staging"));
}

#[test]
fn test_explicit_missing_config_fails() {
    let dir = TempDir::new().unwrap();
    sodalite(dir.path())
        .args(["-c", "missing.toml", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Config file not found"));
}
