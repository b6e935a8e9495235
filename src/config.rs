//! Configuration module for sodalite-k8s
//!
//! Handles loading and merging configuration from multiple sources:
//! - Default values
//! - System configuration (/etc/sodalite/sodalite.toml)
//! - User configuration (~/.sodalite.toml)
//! - Project configuration (./sodalite.toml)
//! - The file named by `SODALITE_CONFIG`
//! - An explicit `--config` path
//! - Environment variables
//!
//! Later sources win. Files are merged key by key, so a project file that
//! only sets `defaults.namespace` keeps everything else from the layers below.

use crate::modules::k8s::executor::merge_patch;
use crate::modules::ModuleParams;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Values injected into module parameters
    pub defaults: Defaults,

    /// How modules are run
    pub execution: ExecutionConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Output format for rendered objects and results
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output for scripting
    Json,
    /// YAML output
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Log line format
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Default parameter values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Namespace used when a task does not set one
    pub namespace: String,

    /// State used when a task does not set one
    pub state: String,

    /// Default output format
    pub output: OutputFormat,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            namespace: "default".to_string(),
            state: "present".to_string(),
            output: OutputFormat::Human,
        }
    }
}

/// Execution settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Never call mutating cluster operations
    pub check_mode: bool,

    /// Attach before/after diffs to results
    pub diff: bool,

    /// Report only the first validation error
    pub fail_fast_validation: bool,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when neither `-v` nor `RUST_LOG` is given
    pub level: String,

    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Load configuration from all sources
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let env_config = std::env::var_os("SODALITE_CONFIG").map(PathBuf::from);
        let mut merged = serde_json::to_value(Config::default())?;

        for path in Self::config_paths(env_config.as_deref()) {
            if path.exists() {
                merge_patch(&mut merged, &Self::read_layer(&path)?);
            }
        }

        if let Some(path) = config_path {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            merge_patch(&mut merged, &Self::read_layer(path)?);
        }

        let mut config: Config =
            serde_json::from_value(merged).context("Invalid configuration")?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Implicit configuration files, lowest precedence first
    fn config_paths(env_config: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/sodalite/sodalite.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".sodalite.toml"));
        }

        paths.push(PathBuf::from("sodalite.toml"));

        if let Some(path) = env_config {
            paths.push(path.to_path_buf());
        }

        paths
    }

    /// Read one file as a generic tree, choosing the parser by extension
    fn read_layer(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let layer: Value = match extension {
            "yml" | "yaml" => serde_yaml::from_str(&content)?,
            "json" => serde_json::from_str(&content)?,
            "toml" => toml::from_str(&content)?,
            _ => toml::from_str(&content)
                .or_else(|_| serde_yaml::from_str(&content))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        // Check the layer on its own so errors name the offending file.
        serde_json::from_value::<Config>(layer.clone())
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(layer)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // SODALITE_NAMESPACE
        if let Some(namespace) = var("SODALITE_NAMESPACE") {
            self.defaults.namespace = namespace;
        }

        // SODALITE_OUTPUT
        if let Some(output) = var("SODALITE_OUTPUT") {
            if let Ok(format) = output.parse() {
                self.defaults.output = format;
            }
        }

        // SODALITE_LOG_LEVEL
        if let Some(level) = var("SODALITE_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Fill in `namespace` and `state` for parameters that do not set them
    pub fn apply_defaults(&self, params: &mut ModuleParams) {
        params
            .entry("namespace".to_string())
            .or_insert_with(|| Value::from(self.defaults.namespace.clone()));
        params
            .entry("state".to_string())
            .or_insert_with(|| Value::from(self.defaults.state.clone()));
    }

    /// Load from a single file on top of the defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut merged = serde_json::to_value(Config::default())?;
        merge_patch(&mut merged, &Self::read_layer(path.as_ref())?);
        Ok(serde_json::from_value(merged)?)
    }
}
