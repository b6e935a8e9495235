//! Fuzz target for module rendering.
//!
//! Arbitrary JSON parameter records are fed to every module. Rendering may
//! fail with an error but must never panic, and a successful render must be
//! free of nulls and empty containers.

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use serde_json::Value;
use sodalite_k8s::modules::k8s::helper::clean_dict;
use sodalite_k8s::modules::{ModuleParams, ModuleRegistry};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    module: u8,
    params: String,
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);
    let Ok(input) = FuzzInput::arbitrary(&mut unstructured) else {
        return;
    };
    let Ok(params) = serde_json::from_str::<ModuleParams>(&input.params) else {
        return;
    };

    let registry = ModuleRegistry::with_builtins();
    let names = registry.names();
    let name = names[input.module as usize % names.len()];
    let Some(module) = registry.get(name) else {
        return;
    };

    if let Ok(definition) = module.render(&params) {
        let cleaned = clean_dict(definition.clone()).unwrap_or(Value::Object(Default::default()));
        assert_eq!(cleaned, definition);
    }
});
