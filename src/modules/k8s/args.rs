//! Parameters shared by every resource module.
//!
//! Common arguments (`name`, `namespace`, `state`, `force`, `apply`,
//! `merge_type`, `labels`, `annotations`) are read with [`ParamExt`] the same way
//! for every kind. Kind-specific options are deserialized into typed structs with
//! [`parse_params`].

use crate::modules::{ModuleError, ModuleParams, ModuleResult, ParamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Desired state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// Create the object, or patch it if it differs
    #[default]
    Present,
    /// Delete the object
    Absent,
    /// Patch an existing object, skip silently when it does not exist
    Patched,
}

impl State {
    pub fn from_str(s: &str) -> ModuleResult<Self> {
        match s.to_lowercase().as_str() {
            "present" => Ok(State::Present),
            "absent" => Ok(State::Absent),
            "patched" => Ok(State::Patched),
            _ => Err(ModuleError::InvalidParameter(format!(
                "Invalid state '{}'. Valid states: absent, patched, present",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Present => "present",
            State::Absent => "absent",
            State::Patched => "patched",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Patch strategy used when an existing object differs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeType {
    Json,
    Merge,
    StrategicMerge,
}

impl MergeType {
    pub fn from_str(s: &str) -> ModuleResult<Self> {
        match s {
            "json" => Ok(MergeType::Json),
            "merge" => Ok(MergeType::Merge),
            "strategic-merge" => Ok(MergeType::StrategicMerge),
            _ => Err(ModuleError::InvalidParameter(format!(
                "Invalid merge_type '{}'. Valid merge types: json, merge, strategic-merge",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MergeType::Json => "json",
            MergeType::Merge => "merge",
            MergeType::StrategicMerge => "strategic-merge",
        }
    }

    /// Order tried when the caller does not choose.
    pub fn defaults() -> Vec<MergeType> {
        vec![MergeType::StrategicMerge, MergeType::Merge]
    }
}

/// Arguments every resource module accepts
#[derive(Debug, Clone, PartialEq)]
pub struct CommonArgs {
    pub name: String,
    pub namespace: String,
    pub state: State,
    pub force: bool,
    pub apply: bool,
    pub merge_type: Option<Vec<MergeType>>,
    /// Kept as raw values so a wrongly typed map reaches validation.
    pub labels: Option<Value>,
    pub annotations: Option<Value>,
}

impl CommonArgs {
    pub fn from_params(params: &ModuleParams) -> ModuleResult<Self> {
        let name = params.get_string_required("name")?;
        let namespace = params
            .get_string("namespace")?
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        let state = match params.get_string("state")? {
            Some(s) => State::from_str(&s)?,
            None => State::default(),
        };
        let force = params.get_bool("force")?.unwrap_or(false);
        let apply = params.get_bool("apply")?.unwrap_or(false);
        let merge_type = params
            .get_vec_string("merge_type")?
            .map(|types| {
                types
                    .iter()
                    .map(|t| MergeType::from_str(t))
                    .collect::<ModuleResult<Vec<_>>>()
            })
            .transpose()?;

        if force && apply {
            return Err(ModuleError::InvalidParameter(
                "parameters are mutually exclusive: force|apply".to_string(),
            ));
        }
        if apply && merge_type.is_some() {
            return Err(ModuleError::InvalidParameter(
                "parameters are mutually exclusive: merge_type|apply".to_string(),
            ));
        }

        Ok(Self {
            name,
            namespace,
            state,
            force,
            apply,
            merge_type,
            labels: present(params.get("labels")),
            annotations: present(params.get("annotations")),
        })
    }

    /// `metadata` block of a definition. Namespace is not part of it; the
    /// execution layer scopes requests by [`CommonArgs::namespace`].
    pub fn metadata(&self) -> Value {
        json!({
            "name": self.name,
            "labels": self.labels,
            "annotations": self.annotations,
        })
    }

    /// Merge types to try in order when patching.
    pub fn merge_types(&self) -> Vec<MergeType> {
        match &self.merge_type {
            Some(types) if !types.is_empty() => types.clone(),
            _ => MergeType::defaults(),
        }
    }
}

fn present(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

/// Deserialize the kind-specific options out of a parameter record.
pub fn parse_params<T: DeserializeOwned>(params: &ModuleParams) -> ModuleResult<T> {
    let object: serde_json::Map<String, Value> = params
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    serde_json::from_value(Value::Object(object))
        .map_err(|e| ModuleError::InvalidParameter(e.to_string()))
}

/// Fail when `state` matches and any of `names` is missing.
pub fn required_if(
    params: &ModuleParams,
    common: &CommonArgs,
    state: State,
    names: &[&str],
) -> ModuleResult<()> {
    if common.state != state {
        return Ok(());
    }
    let missing: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| params.get(*name).map_or(true, Value::is_null))
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ModuleError::MissingParameter(format!(
            "state is {} but all of the following are missing: {}",
            state,
            missing.join(", ")
        )))
    }
}

/// Fail when more than one of `names` is given.
pub fn mutually_exclusive(params: &ModuleParams, names: &[&str]) -> ModuleResult<()> {
    let given: Vec<&str> = names
        .iter()
        .copied()
        .filter(|name| params.get(*name).is_some_and(|v| !v.is_null()))
        .collect();
    if given.len() > 1 {
        return Err(ModuleError::InvalidParameter(format!(
            "parameters are mutually exclusive: {}",
            given.join("|")
        )));
    }
    Ok(())
}

/// Fail when `name` is given but not one of `allowed`. Lists are checked per element.
pub fn choice(params: &ModuleParams, name: &str, allowed: &[&str]) -> ModuleResult<()> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Array(items)) => items
            .iter()
            .try_for_each(|item| check_choice(name, item, allowed)),
        Some(value) => check_choice(name, value, allowed),
    }
}

fn check_choice(name: &str, value: &Value, allowed: &[&str]) -> ModuleResult<()> {
    match value {
        Value::String(value) if allowed.contains(&value.as_str()) => Ok(()),
        other => Err(ModuleError::InvalidParameter(format!(
            "value of {} must be one of: {}, got: {}",
            name,
            allowed.join(", "),
            other.as_str().map_or_else(|| other.to_string(), str::to_string)
        ))),
    }
}

/// Transport protocol of a service or container port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

/// Label selector options (`selector.match_labels`, `selector.match_expressions`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SelectorParams {
    #[serde(default)]
    pub match_labels: Option<Value>,
    #[serde(default)]
    pub match_expressions: Option<Vec<MatchExpressionParams>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchExpressionParams {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub operator: Option<String>,
    #[serde(default)]
    pub values: Option<Vec<String>>,
}

impl SelectorParams {
    /// `{matchExpressions, matchLabels}` as used by PVCs and Deployments.
    pub fn to_definition(selector: Option<&SelectorParams>) -> Value {
        let Some(selector) = selector else {
            return json!({"matchExpressions": null, "matchLabels": null});
        };
        let expressions = selector.match_expressions.as_ref().map(|exprs| {
            exprs
                .iter()
                .map(|e| json!({"key": e.key, "operator": e.operator, "values": e.values}))
                .collect::<Vec<_>>()
        });
        json!({
            "matchExpressions": expressions,
            "matchLabels": selector.match_labels,
        })
    }
}

/// Lenient field deserializers matching Ansible's type coercion.
pub(crate) mod de {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn scalar_to_string(value: Value) -> Result<Option<String>, String> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            other => Err(format!("expected a string, found {}", other)),
        }
    }

    /// `type='str'`: numbers and booleans are converted to text.
    pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        scalar_to_string(Value::deserialize(deserializer)?).map_err(serde::de::Error::custom)
    }

    /// `type='int'`: integral strings are accepted.
    pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::Number(n) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("expected an integer, found {}", n))),
            Value::String(s) => s
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| serde::de::Error::custom(format!("expected an integer, found '{}'", s))),
            other => Err(serde::de::Error::custom(format!(
                "expected an integer, found {}",
                other
            ))),
        }
    }

    /// `type='list', elements='str'`: a single string becomes a one-element list.
    pub fn opt_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| scalar_to_string(item).transpose())
                .collect::<Result<Vec<_>, _>>()
                .map(Some)
                .map_err(serde::de::Error::custom),
            scalar => scalar_to_string(scalar)
                .map(|s| s.map(|s| vec![s]))
                .map_err(serde::de::Error::custom),
        }
    }
}
