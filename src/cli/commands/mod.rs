//! Subcommands module for the sodalite-k8s CLI
//!
//! This module contains all the subcommand implementations.

pub mod apply;
pub mod list;
pub mod render;

use crate::cli::output::OutputFormatter;
use anyhow::Result;
use clap::Parser;
use serde_json::Value;
use sodalite_k8s::config::Config;
use sodalite_k8s::error::Error;
use sodalite_k8s::modules::{ModuleParams, ModuleRegistry};
use std::path::{Path, PathBuf};

/// Module name and parameter file shared by the module subcommands
#[derive(Parser, Debug, Clone)]
pub struct ModuleArgs {
    /// Module to run (see `list`)
    pub module: String,

    /// YAML or JSON file holding the module parameters
    #[arg(short = 'p', long = "params")]
    pub params: PathBuf,
}

/// Common context shared between commands
pub struct CommandContext {
    /// Configuration
    pub config: Config,
    /// Output formatter
    pub output: OutputFormatter,
    /// Registered modules
    pub registry: ModuleRegistry,
}

impl CommandContext {
    /// Create a new command context from CLI arguments
    pub fn new(cli: &crate::cli::Cli, config: Config) -> Self {
        let format = cli.output.unwrap_or(config.defaults.output);
        Self {
            output: OutputFormatter::new(!cli.no_color, format),
            registry: ModuleRegistry::with_builtins(),
            config,
        }
    }

    /// Read a parameter file and fill in the configured defaults
    pub fn load_params(&self, path: &Path) -> Result<ModuleParams, Error> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_yaml::from_str(&content)?;
        let Value::Object(map) = value else {
            return Err(Error::InvalidFile {
                path: path.to_path_buf(),
                message: "module parameters must be a mapping".to_string(),
            });
        };
        let mut params: ModuleParams = map.into_iter().collect();
        self.config.apply_defaults(&mut params);
        Ok(params)
    }

    /// Print `error` and map it to an exit code
    pub fn fail(&self, error: &Error) -> i32 {
        self.output.error(&error.to_string());
        error.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use std::io::Write;

    fn context() -> CommandContext {
        let cli = Cli::try_parse_from(["sodalite-k8s", "list"]).unwrap();
        CommandContext::new(&cli, Config::default())
    }

    #[test]
    fn test_load_params_applies_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: foo\nlabels:\n  app: web").unwrap();

        let params = context().load_params(file.path()).unwrap();
        assert_eq!(params["name"], Value::from("foo"));
        assert_eq!(params["namespace"], Value::from("default"));
        assert_eq!(params["state"], Value::from("present"));
    }

    #[test]
    fn test_load_params_rejects_lists() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "- name: foo").unwrap();

        let err = context().load_params(file.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidFile { .. }));
    }
}
