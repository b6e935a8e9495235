//! Definition building and validation benchmarks
//!
//! 1. RENDERING: parameter parsing, definition building, pruning and
//!    validation for a small ConfigMap and for Deployments with growing
//!    container counts.
//! 2. PRUNING: `clean_dict` over wide and deep trees.
//! 3. EXECUTION: create and up-to-date runs against the in-memory cluster.
//!
//! Run with: cargo bench --bench definition_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};
use sodalite_k8s::modules::k8s::helper::clean_dict;
use sodalite_k8s::prelude::*;
use std::sync::Arc;

// ============================================================================
// TEST DATA GENERATORS
// ============================================================================

fn params(value: Value) -> ModuleParams {
    serde_json::from_value(value).unwrap()
}

fn configmap_params() -> ModuleParams {
    params(json!({
        "name": "app-config",
        "labels": {"app": "web"},
        "data": {"log.level": "INFO", "feature.flags": "a,b,c"},
        "binary_data": {"keystore": "eWVrX2Vtb3M="}
    }))
}

fn deployment_params(containers: usize) -> ModuleParams {
    let containers: Vec<Value> = (0..containers)
        .map(|i| {
            json!({
                "name": format!("container-{}", i),
                "image": "nginx:1.25",
                "ports": [{"name": format!("http-{}", i), "container_port": 8000 + i}],
                "env": [
                    {"name": "PLAIN", "value": "x"},
                    {"name": "FROM_MAP", "config_map": {"name": "cfg", "key": "k"}}
                ],
                "volume_mounts": [{"name": "config", "path": "/etc/app"}],
                "resource_requests": {"cpu": "100m", "memory": "64Mi"},
                "resource_limits": {"cpu": "1", "memory": "256Mi"}
            })
        })
        .collect();
    params(json!({
        "name": "web",
        "labels": {"app": "web"},
        "selector": {"match_labels": {"app": "web"}},
        "replicas": 3,
        "volumes": [{"name": "config", "config_map": {"name": "cfg"}}],
        "containers": containers
    }))
}

fn sparse_tree(width: usize, depth: usize) -> Value {
    if depth == 0 {
        return json!({"keep": "x", "drop": null, "empty": {}});
    }
    let children: serde_json::Map<String, Value> = (0..width)
        .map(|i| (format!("k{}", i), sparse_tree(width, depth - 1)))
        .collect();
    Value::Object(children)
}

// ============================================================================
// BENCHMARKS
// ============================================================================

fn bench_render(c: &mut Criterion) {
    let registry = ModuleRegistry::with_builtins();
    let mut group = c.benchmark_group("render");

    let configmap = registry.require("k8s_configmap").unwrap();
    let cm_params = configmap_params();
    group.bench_function("configmap", |b| {
        b.iter(|| configmap.render(black_box(&cm_params)).unwrap())
    });

    let deployment = registry.require("k8s_deployment").unwrap();
    for containers in [1usize, 10, 50] {
        let p = deployment_params(containers);
        group.throughput(Throughput::Elements(containers as u64));
        group.bench_with_input(
            BenchmarkId::new("deployment", containers),
            &p,
            |b, p| b.iter(|| deployment.render(black_box(p)).unwrap()),
        );
    }
    group.finish();
}

fn bench_prune(c: &mut Criterion) {
    let mut group = c.benchmark_group("clean_dict");
    for (width, depth) in [(4usize, 3usize), (8, 3), (3, 6)] {
        let tree = sparse_tree(width, depth);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, depth)),
            &tree,
            |b, tree| b.iter(|| clean_dict(black_box(tree.clone()))),
        );
    }
    group.finish();
}

fn bench_execute(c: &mut Criterion) {
    let registry = ModuleRegistry::with_builtins();
    let p = deployment_params(5);
    let mut group = c.benchmark_group("execute");

    group.bench_function("create", |b| {
        b.iter(|| {
            let client = Arc::new(InMemoryClient::new());
            let context = ModuleContext::new().with_client(client);
            registry.execute("k8s_deployment", &p, &context).unwrap()
        })
    });

    let client = Arc::new(InMemoryClient::new());
    let context = ModuleContext::new().with_client(client);
    registry.execute("k8s_deployment", &p, &context).unwrap();
    group.bench_function("up_to_date", |b| {
        b.iter(|| registry.execute("k8s_deployment", black_box(&p), &context).unwrap())
    });

    group.finish();
}

criterion_group!(render_benches, bench_render, bench_prune);
criterion_group!(execution_benches, bench_execute);
criterion_main!(render_benches, execution_benches);
