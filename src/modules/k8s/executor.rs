//! Execution layer: applies a validated definition to a cluster.
//!
//! The cluster is reached through [`ResourceClient`]. [`InMemoryClient`] is a
//! complete implementation backed by a map of objects; a kube-rs backed client
//! lives in [`super::kube_client`] behind the `kubernetes` feature.

use super::args::{CommonArgs, MergeType, State};
use crate::modules::{Diff, ModuleContext, ModuleError, ModuleOutput, ModuleResult};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use similar::TextDiff;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace};

/// Identity of one object in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl ResourceKey {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        namespace: Option<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            namespace,
            name: name.into(),
        }
    }

    /// Read the key out of a full object.
    pub fn from_object(object: &Value) -> ModuleResult<Self> {
        let field = |pointer: &str| {
            object
                .pointer(pointer)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    ModuleError::ParseError(format!("object is missing '{}'", pointer))
                })
        };
        Ok(Self {
            api_version: field("/apiVersion")?,
            kind: field("/kind")?,
            namespace: field("/metadata/namespace").ok(),
            name: field("/metadata/name")?,
        })
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} '{}/{}'", self.kind, ns, self.name),
            None => write!(f, "{} '{}'", self.kind, self.name),
        }
    }
}

/// Patch flavour sent to the API server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchType {
    Json,
    Merge,
    StrategicMerge,
    /// Server-side apply
    Apply,
}

impl From<MergeType> for PatchType {
    fn from(merge_type: MergeType) -> Self {
        match merge_type {
            MergeType::Json => PatchType::Json,
            MergeType::Merge => PatchType::Merge,
            MergeType::StrategicMerge => PatchType::StrategicMerge,
        }
    }
}

impl fmt::Display for PatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchType::Json => write!(f, "json"),
            PatchType::Merge => write!(f, "merge"),
            PatchType::StrategicMerge => write!(f, "strategic-merge"),
            PatchType::Apply => write!(f, "apply"),
        }
    }
}

/// Access to a Kubernetes API
pub trait ResourceClient: Send + Sync {
    /// Short description used in logs
    fn identifier(&self) -> String;

    fn get(&self, key: &ResourceKey) -> ModuleResult<Option<Value>>;

    fn create(&self, key: &ResourceKey, body: &Value) -> ModuleResult<Value>;

    fn replace(&self, key: &ResourceKey, body: &Value) -> ModuleResult<Value>;

    fn patch(&self, key: &ResourceKey, body: &Value, patch_type: PatchType)
        -> ModuleResult<Value>;

    fn delete(&self, key: &ResourceKey) -> ModuleResult<()>;
}

/// True when `desired` asks for something `existing` does not have.
///
/// Maps are compared key by key, recursively. A key missing from `existing` or
/// any differing non-map value counts as a difference. Keys only present in
/// `existing` (status, defaults filled in by the server) are ignored.
pub fn definitions_differ(existing: &Value, desired: &Value) -> bool {
    match (existing, desired) {
        (Value::Object(existing), Value::Object(desired)) => {
            desired.iter().any(|(key, desired_value)| match existing.get(key) {
                None => {
                    trace!(key = %key, "key missing from existing object");
                    true
                }
                Some(existing_value) => {
                    let differs = definitions_differ(existing_value, desired_value);
                    if differs {
                        trace!(key = %key, "value differs");
                    }
                    differs
                }
            })
        }
        (existing, desired) => existing != desired,
    }
}

/// Apply a JSON merge patch (RFC 7386) to `target`.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(key);
            } else {
                merge_patch(target.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}

/// Before/after diff of two objects rendered as YAML.
pub fn object_diff(before: Option<&Value>, after: Option<&Value>) -> Diff {
    let render = |value: Option<&Value>| {
        value
            .map(|v| serde_yaml::to_string(v).unwrap_or_default())
            .unwrap_or_default()
    };
    let before = render(before);
    let after = render(after);
    let details = TextDiff::from_lines(&before, &after)
        .unified_diff()
        .context_radius(3)
        .header("before", "after")
        .to_string();
    Diff::new(before, after).with_details(details)
}

fn with_namespace(definition: &Value, key: &ResourceKey) -> Value {
    let mut body = definition.clone();
    if let (Some(ns), Some(metadata)) = (
        &key.namespace,
        body.get_mut("metadata").and_then(Value::as_object_mut),
    ) {
        metadata.insert("namespace".to_string(), Value::from(ns.as_str()));
    }
    body
}

fn finish(
    output: ModuleOutput,
    method: &str,
    result: Value,
    diff: Option<Diff>,
    context: &ModuleContext,
) -> ModuleOutput {
    let output = output
        .with_data("method", Value::from(method))
        .with_data("result", result);
    match diff {
        Some(diff) if context.diff_mode => output.with_diff(diff),
        _ => output,
    }
}

/// Drive one object towards `common.state`.
pub fn execute_definition(
    client: &dyn ResourceClient,
    key: &ResourceKey,
    definition: &Value,
    common: &CommonArgs,
    context: &ModuleContext,
) -> ModuleResult<ModuleOutput> {
    let body = with_namespace(definition, key);
    let existing = client.get(key)?;
    debug!(object = %key, exists = existing.is_some(), client = %client.identifier(), "fetched object");

    match (common.state, existing) {
        (State::Absent, None) => Ok(finish(
            ModuleOutput::ok(format!("{} already absent", key)),
            "none",
            json!({}),
            None,
            context,
        )),
        (State::Absent, Some(existing)) => {
            let diff = object_diff(Some(&existing), None);
            if context.check_mode {
                return Ok(finish(
                    ModuleOutput::changed(format!("Would delete {}", key)),
                    "delete",
                    json!({}),
                    Some(diff),
                    context,
                ));
            }
            client.delete(key)?;
            info!(object = %key, "deleted");
            Ok(finish(
                ModuleOutput::changed(format!("Deleted {}", key)),
                "delete",
                json!({}),
                Some(diff),
                context,
            ))
        }
        (State::Patched, None) => Ok(finish(
            ModuleOutput::ok(format!("{} not found, nothing to patch", key)),
            "none",
            json!({}),
            None,
            context,
        )),
        (State::Present, None) => {
            let diff = object_diff(None, Some(&body));
            if context.check_mode {
                return Ok(finish(
                    ModuleOutput::changed(format!("Would create {}", key)),
                    "create",
                    body,
                    Some(diff),
                    context,
                ));
            }
            let created = client.create(key, &body)?;
            info!(object = %key, "created");
            Ok(finish(
                ModuleOutput::changed(format!("Created {}", key)),
                "create",
                created,
                Some(diff),
                context,
            ))
        }
        (State::Present | State::Patched, Some(existing)) => {
            if !definitions_differ(&existing, &body) {
                return Ok(finish(
                    ModuleOutput::ok(format!("{} is up to date", key)),
                    "none",
                    existing,
                    None,
                    context,
                ));
            }
            update(client, key, body, existing, common, context)
        }
    }
}

fn update(
    client: &dyn ResourceClient,
    key: &ResourceKey,
    mut body: Value,
    existing: Value,
    common: &CommonArgs,
    context: &ModuleContext,
) -> ModuleResult<ModuleOutput> {
    let method = if common.force && common.state == State::Present {
        "replace"
    } else if common.apply {
        "apply"
    } else {
        "patch"
    };

    if context.check_mode {
        let mut preview = existing.clone();
        merge_patch(&mut preview, &body);
        let diff = object_diff(Some(&existing), Some(&preview));
        return Ok(finish(
            ModuleOutput::changed(format!("Would {} {}", method, key)),
            method,
            preview,
            Some(diff),
            context,
        ));
    }

    let result = match method {
        "replace" => {
            if let (Some(version), Some(metadata)) = (
                existing.pointer("/metadata/resourceVersion").cloned(),
                body.get_mut("metadata").and_then(Value::as_object_mut),
            ) {
                metadata.insert("resourceVersion".to_string(), version);
            }
            client.replace(key, &body)?
        }
        "apply" => client.patch(key, &body, PatchType::Apply)?,
        _ => patch_in_order(client, key, &body, &common.merge_types())?,
    };
    info!(object = %key, method, "updated");

    let diff = object_diff(Some(&existing), Some(&result));
    Ok(finish(
        ModuleOutput::changed(format!("Updated {} ({})", key, method)),
        method,
        result,
        Some(diff),
        context,
    ))
}

/// Try each merge type in order, the first one the server accepts wins.
fn patch_in_order(
    client: &dyn ResourceClient,
    key: &ResourceKey,
    body: &Value,
    merge_types: &[MergeType],
) -> ModuleResult<Value> {
    let mut failures = Vec::new();
    for merge_type in merge_types {
        let patch_type = PatchType::from(*merge_type);
        match client.patch(key, body, patch_type) {
            Ok(result) => return Ok(result),
            Err(e) => {
                debug!(object = %key, %patch_type, error = %e, "patch rejected");
                failures.push(format!("{}: {}", patch_type, e));
            }
        }
    }
    Err(ModuleError::ExecutionFailed(format!(
        "Failed to patch {}: {}",
        key,
        failures.join("; ")
    )))
}

/// Cluster kept in memory. Used by tests and by the CLI `apply` command.
#[derive(Debug, Default)]
pub struct InMemoryClient {
    objects: RwLock<IndexMap<ResourceKey, Value>>,
    revision: AtomicU64,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cluster with existing objects.
    pub fn with_objects(objects: impl IntoIterator<Item = Value>) -> ModuleResult<Self> {
        let client = Self::new();
        {
            let mut store = client.objects.write();
            for object in objects {
                let key = ResourceKey::from_object(&object)?;
                let object = client.stamp(object);
                store.insert(key, object);
            }
        }
        Ok(client)
    }

    /// Snapshot of all stored objects, in insertion order.
    pub fn objects(&self) -> Vec<Value> {
        self.objects.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    fn stamp(&self, mut object: Value) -> Value {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(metadata) = object.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.insert(
                "resourceVersion".to_string(),
                Value::from(revision.to_string()),
            );
        }
        object
    }

    fn not_found(key: &ResourceKey) -> ModuleError {
        ModuleError::ExecutionFailed(format!("{} not found", key))
    }
}

impl ResourceClient for InMemoryClient {
    fn identifier(&self) -> String {
        "in-memory".to_string()
    }

    fn get(&self, key: &ResourceKey) -> ModuleResult<Option<Value>> {
        Ok(self.objects.read().get(key).cloned())
    }

    fn create(&self, key: &ResourceKey, body: &Value) -> ModuleResult<Value> {
        let mut store = self.objects.write();
        if store.contains_key(key) {
            return Err(ModuleError::ExecutionFailed(format!(
                "{} already exists",
                key
            )));
        }
        let object = self.stamp(body.clone());
        store.insert(key.clone(), object.clone());
        Ok(object)
    }

    fn replace(&self, key: &ResourceKey, body: &Value) -> ModuleResult<Value> {
        let mut store = self.objects.write();
        let current = store.get(key).ok_or_else(|| Self::not_found(key))?;
        let expected = body.pointer("/metadata/resourceVersion");
        if expected.is_some() && expected != current.pointer("/metadata/resourceVersion") {
            return Err(ModuleError::ExecutionFailed(format!(
                "Conflict replacing {}: resourceVersion is stale",
                key
            )));
        }
        let object = self.stamp(body.clone());
        store.insert(key.clone(), object.clone());
        Ok(object)
    }

    fn patch(
        &self,
        key: &ResourceKey,
        body: &Value,
        patch_type: PatchType,
    ) -> ModuleResult<Value> {
        if patch_type == PatchType::Json {
            return Err(ModuleError::Unsupported(
                "json patch needs a list of operations, not an object".to_string(),
            ));
        }
        let mut store = self.objects.write();
        let mut object = store.get(key).cloned().ok_or_else(|| Self::not_found(key))?;
        merge_patch(&mut object, body);
        let object = self.stamp(object);
        store.insert(key.clone(), object.clone());
        Ok(object)
    }

    fn delete(&self, key: &ResourceKey) -> ModuleResult<()> {
        self.objects
            .write()
            .shift_remove(key)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(key))
    }
}
