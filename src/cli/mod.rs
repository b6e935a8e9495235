//! CLI module for sodalite-k8s
//!
//! This module provides the command-line interface, including argument
//! parsing and subcommand handling.

pub mod commands;
pub mod diff;
pub mod output;

use clap::{Parser, Subcommand};
use sodalite_k8s::config::{LogFormat, OutputFormat};
use std::path::PathBuf;

/// sodalite-k8s - Kubernetes resources from Ansible-style parameters
///
/// Builds, validates and applies Kubernetes objects described with flat,
/// snake_case module parameters.
#[derive(Parser, Debug, Clone)]
#[command(name = "sodalite-k8s")]
#[command(author = "Sodalite Contributors")]
#[command(version)]
#[command(about = "Kubernetes resources from Ansible-style parameters", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short = 'v', long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (defaults to the configured one)
    #[arg(short = 'o', long, global = true)]
    pub output: Option<OutputFormat>,

    /// Log line format (defaults to the configured one)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build, prune and validate a definition, then print it
    Render(commands::ModuleArgs),

    /// Build and validate a definition, printing `ok` or the violations
    Validate(commands::ModuleArgs),

    /// Run a module against a cluster
    Apply(commands::apply::ApplyArgs),

    /// List the available modules
    List,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Get the effective verbosity level (0-3)
    pub fn verbosity(&self) -> u8 {
        self.verbose.min(3)
    }
}
