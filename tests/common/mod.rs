//! Shared helpers for the per-kind integration tests.
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use serde_json::Value;
use sodalite_k8s::prelude::*;

/// Parse a YAML parameter record.
pub fn params(yaml: &str) -> ModuleParams {
    serde_yaml::from_str(yaml).unwrap()
}

/// Render `yaml` through the registered module, the way the CLI does.
pub fn render(module: &str, yaml: &str) -> ModuleResult<Value> {
    ModuleRegistry::with_builtins()
        .require(module)?
        .render(&params(yaml))
}

/// Messages of a render that must fail validation.
pub fn messages(module: &str, yaml: &str) -> Vec<String> {
    let err = render(module, yaml).unwrap_err();
    assert!(
        matches!(err, ModuleError::Validation(_)),
        "expected validation errors, got {}",
        err
    );
    err.validation_errors()
        .iter()
        .map(|e| e.message.clone())
        .collect()
}
